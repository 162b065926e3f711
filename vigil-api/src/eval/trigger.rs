//! Trigger evaluation and fan-out

use super::objective::import_result;
use vigil_core::{ConditionStatus, LogEntry, Measurement, MeasurementState, Timestamp, Trigger};
use vigil_engine::EngineError;
use vigil_storage::Storage;

/// Evaluate a trigger's condition against a measurement.
///
/// The condition must compile regardless of measurement state. A
/// measurement that is not activated, or has no result, evaluates to
/// `false` without running the expression.
pub fn check_condition(
    trigger: &Trigger,
    measurement: &Measurement,
    debug_vm: bool,
) -> Result<bool, EngineError> {
    let mut machine = vigil_engine::compile(&trigger.condition)?;

    if measurement.state != MeasurementState::Activated {
        return Ok(false);
    }
    let Some(result) = &measurement.result else {
        tracing::error!(
            measurement = %measurement.id,
            "measurement is activated but carries no result"
        );
        return Ok(false);
    };

    machine.set_debug(debug_vm);
    import_result(&mut machine, result)?;
    let value = machine.execute()?;
    Ok(value.to_boolean())
}

/// Evaluate every trigger watching a measurement after a result update.
///
/// Triggers in `error` are skipped until an operator resets them. A
/// `true` trigger still inside its guard window is skipped. A failing
/// trigger records an error log entry and parks at `error`; it never
/// blocks evaluation of its siblings.
pub fn evaluate_triggers(store: &dyn Storage, measurement: &Measurement, debug_vm: bool) {
    let now = Timestamp::now();

    let triggers = match store.triggers_for_measurement(measurement.id) {
        Ok(triggers) => triggers,
        Err(e) => {
            tracing::error!(measurement = %measurement.id, error = %e, "trigger lookup failed");
            return;
        }
    };

    tracing::debug!(
        count = triggers.len(),
        measurement = %measurement.id,
        "evaluating triggers"
    );

    for trigger in triggers {
        match trigger.status {
            ConditionStatus::Error => continue,
            ConditionStatus::True
                if trigger.status_update_time.seconds_since() <= trigger.guard_time as i64 =>
            {
                continue;
            }
            _ => {}
        }

        let outcome = check_condition(&trigger, measurement, debug_vm);

        let update = match outcome {
            Err(e) => {
                tracing::error!(trigger = %trigger.id, error = %e, "trigger evaluation failed");
                if let Err(log_err) =
                    store.insert_log_entry(LogEntry::failure(&trigger, e.to_string()))
                {
                    tracing::error!(error = %log_err, "failed to record error log entry");
                }
                ConditionStatus::Error
            }
            Ok(true) => {
                tracing::debug!(trigger = %trigger.id, "trigger fired");
                if let Err(log_err) =
                    store.insert_log_entry(LogEntry::firing(&trigger, measurement.result.clone()))
                {
                    tracing::error!(error = %log_err, "failed to record log entry");
                }
                ConditionStatus::True
            }
            Ok(false) => ConditionStatus::False,
        };

        if let Err(e) = store.update_trigger_status(trigger.id, update, now) {
            tracing::error!(trigger = %trigger.id, error = %e, "failed to persist trigger status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::{MeasurementResult, ResourceId, ResultRow};

    fn score_result(score: f64) -> MeasurementResult {
        let row: ResultRow = match serde_json::json!({ "score": score }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        MeasurementResult {
            value: vec![row],
            update_time: Timestamp::now(),
            authority_id: None,
            signature: None,
        }
    }

    fn measurement(state: MeasurementState, result: Option<MeasurementResult>) -> Measurement {
        Measurement {
            id: ResourceId::new(),
            name: "m".into(),
            parent: ResourceId::new(),
            metric: ResourceId::new(),
            result,
            objective: None,
            state,
        }
    }

    fn trigger(measurement: ResourceId, condition: &str) -> Trigger {
        Trigger {
            id: ResourceId::new(),
            name: "t".into(),
            parent: ResourceId::new(),
            measurement,
            condition: condition.into(),
            notification: None,
            guard_time: 0,
            tags: Vec::new(),
            status: ConditionStatus::False,
            status_update_time: Timestamp::from_unix(1),
        }
    }

    #[test]
    fn condition_runs_against_imported_result() {
        let m = measurement(MeasurementState::Activated, Some(score_result(75.0)));
        let t = trigger(m.id, "value[0].score > 70");
        assert!(check_condition(&t, &m, false).unwrap());

        let t = trigger(m.id, "value[0].score > 80");
        assert!(!check_condition(&t, &m, false).unwrap());
    }

    #[test]
    fn inactive_or_empty_measurements_evaluate_false() {
        let m = measurement(MeasurementState::Pending, Some(score_result(75.0)));
        let t = trigger(m.id, "true");
        assert!(!check_condition(&t, &m, false).unwrap());

        let m = measurement(MeasurementState::Activated, None);
        assert!(!check_condition(&t, &m, false).unwrap());
    }

    #[test]
    fn compile_errors_surface_even_without_result() {
        let m = measurement(MeasurementState::Pending, None);
        let t = trigger(m.id, "value[0].");
        assert!(check_condition(&t, &m, false).is_err());
    }

    #[test]
    fn runtime_errors_surface() {
        let m = measurement(MeasurementState::Activated, Some(score_result(75.0)));
        let t = trigger(m.id, "value.score.missing");
        assert!(check_condition(&t, &m, false).is_err());
    }
}
