//! Measurement and trigger evaluation protocol
//!
//! The write paths of the measurement lifecycle: creating a measurement,
//! posting a result, replacing an objective, operator state changes, and
//! trigger creation. Posting a result is the interesting one - it
//! validates the result against the metric schema, re-runs the
//! objective, and fans out to every trigger watching the measurement.
//!
//! Parse and schema errors abort before anything is persisted; runtime
//! errors during trigger evaluation are confined to the failing trigger.

mod objective;
mod result_check;
mod trigger;

pub use objective::{evaluate_objective, import_result};
pub use result_check::check_result;
pub use trigger::{check_condition, evaluate_triggers};

use thiserror::Error;

use vigil_core::{
    LogEntry, Measurement, MeasurementResult, MeasurementState, Objective, ResourceId,
    StorageError, Timestamp, Trigger, ValidationError,
};
use vigil_engine::ParseError;
use vigil_storage::Storage;

/// Errors surfaced by the protocol write paths.
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("error in condition specification - {0}")]
    Condition(#[from] ParseError),

    #[error("measurement is not in activated state")]
    MeasurementDeactivated,

    #[error("{0}")]
    BadRequest(String),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Create a measurement: the metric link must resolve, an inline result
/// must match the metric schema, and an objective is evaluated up front.
pub fn create_measurement(
    store: &dyn Storage,
    mut measurement: Measurement,
    debug_vm: bool,
) -> ProtocolResult<Measurement> {
    let metric = store.metric(measurement.metric).map_err(|_| {
        ProtocolError::BadRequest(format!("metric {} does not exist", measurement.metric))
    })?;

    if let Some(result) = &measurement.result {
        check_result(&metric, result)?;
    }

    evaluate_objective(&mut measurement, debug_vm)?;

    store.insert_measurement(measurement.clone())?;
    Ok(measurement)
}

/// Post a result to a measurement.
///
/// Allowed while pending or activated; a pending measurement becomes
/// activated. The result is stamped with the current time when the
/// caller left it unset, validated against the metric schema, then the
/// objective re-runs and all watching triggers are evaluated.
pub fn post_result(
    store: &dyn Storage,
    measurement_id: ResourceId,
    mut result: MeasurementResult,
    debug_vm: bool,
) -> ProtocolResult<Measurement> {
    let mut measurement = store.measurement(measurement_id)?;

    match measurement.state {
        MeasurementState::Deactivated => return Err(ProtocolError::MeasurementDeactivated),
        MeasurementState::Pending => measurement.state = MeasurementState::Activated,
        MeasurementState::Activated => {}
    }

    if result.update_time.is_zero() {
        result.update_time = Timestamp::now();
    }

    let metric = store.metric(measurement.metric).map_err(|_| {
        ProtocolError::BadRequest(format!("metric {} does not exist", measurement.metric))
    })?;
    check_result(&metric, &result)?;

    measurement.result = Some(result);

    evaluate_objective(&mut measurement, debug_vm)?;
    evaluate_triggers(store, &measurement, debug_vm);

    store.update_measurement(&measurement)?;
    Ok(measurement)
}

/// Replace a measurement's objective and evaluate it immediately.
pub fn put_objective(
    store: &dyn Storage,
    measurement_id: ResourceId,
    objective: Objective,
    debug_vm: bool,
) -> ProtocolResult<Measurement> {
    let mut measurement = store.measurement(measurement_id)?;
    measurement.objective = Some(objective);

    evaluate_objective(&mut measurement, debug_vm)?;

    store.update_measurement(&measurement)?;
    Ok(measurement)
}

/// Operator-driven state change: re-activating a deactivated measurement
/// parks it at pending; deactivating clears the stored result.
pub fn set_user_activated(
    store: &dyn Storage,
    measurement_id: ResourceId,
    requested: MeasurementState,
) -> ProtocolResult<Measurement> {
    let mut measurement = store.measurement(measurement_id)?;

    match requested {
        MeasurementState::Activated => {
            if measurement.state == MeasurementState::Deactivated {
                measurement.state = MeasurementState::Pending;
            }
        }
        MeasurementState::Deactivated => {
            measurement.state = MeasurementState::Deactivated;
            measurement.result = None;
        }
        MeasurementState::Pending => {
            return Err(ProtocolError::BadRequest(
                "state can only be 'activated' or 'deactivated'".to_string(),
            ));
        }
    }

    store.update_measurement(&measurement)?;
    Ok(measurement)
}

/// Create a trigger, evaluating its condition once against the linked
/// measurement. Compile failures reject the create; an initially-true
/// condition fires immediately.
pub fn create_trigger(
    store: &dyn Storage,
    mut trigger: Trigger,
    debug_vm: bool,
) -> ProtocolResult<Trigger> {
    let measurement = store.measurement(trigger.measurement).map_err(|_| {
        ProtocolError::BadRequest(format!(
            "measurement {} does not exist",
            trigger.measurement
        ))
    })?;

    let fired = check_condition(&trigger, &measurement, debug_vm)
        .map_err(|e| ProtocolError::BadRequest(format!("error in condition specification - {}", e)))?;

    trigger.status_update_time = Timestamp::now();
    trigger.status = vigil_core::ConditionStatus::from_bool(fired);
    store.insert_trigger(trigger.clone())?;

    if fired {
        store.insert_log_entry(LogEntry::firing(&trigger, measurement.result.clone()))?;
    }

    Ok(trigger)
}
