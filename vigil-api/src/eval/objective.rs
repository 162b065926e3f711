//! Objective evaluation

use vigil_core::{ConditionStatus, Measurement, MeasurementResult};
use vigil_engine::{import_global, Machine, ParseError, RuntimeError};

/// Expose a measurement result to an expression as the four protocol
/// globals: `value`, `updateTime`, `authorityId` and `signature`.
pub fn import_result(
    machine: &mut Machine,
    result: &MeasurementResult,
) -> Result<(), RuntimeError> {
    import_global(machine, "value", &result.value)?;
    import_global(machine, "updateTime", &result.update_time.to_string())?;
    import_global(machine, "authorityId", &result.authority_id)?;
    import_global(machine, "signature", &result.signature)?;
    Ok(())
}

/// Evaluate a measurement's objective, if it has one.
///
/// The condition must compile; a compile failure rejects the whole
/// write. With no result posted yet the objective is optimistically
/// `true`. Runtime failures leave the status at `error` without
/// failing the write.
pub fn evaluate_objective(
    measurement: &mut Measurement,
    debug_vm: bool,
) -> Result<(), ParseError> {
    let Some(objective) = measurement.objective.as_mut() else {
        return Ok(());
    };

    objective.status = ConditionStatus::Error;

    tracing::debug!(condition = %objective.condition, "evaluating objective");

    let mut machine = vigil_engine::compile(&objective.condition)?;

    let Some(result) = &measurement.result else {
        objective.status = ConditionStatus::True;
        return Ok(());
    };

    machine.set_debug(debug_vm);

    if let Err(e) = import_result(&mut machine, result) {
        tracing::error!(error = %e, "objective result import failed");
        return Ok(());
    }

    match machine.execute() {
        Ok(value) => {
            objective.status = ConditionStatus::from_bool(value.to_boolean());
        }
        Err(e) => {
            tracing::error!(error = %e, "objective evaluation failed");
        }
    }
    Ok(())
}
