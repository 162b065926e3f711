//! Enum types for vigil resources

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CORE ENUMS
// ============================================================================

/// Lifecycle state of a measurement.
///
/// A result may only be posted while `Pending` or `Activated`; posting a
/// result moves a pending measurement to `Activated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementState {
    Pending,
    Activated,
    Deactivated,
}

impl fmt::Display for MeasurementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MeasurementState::Pending => "pending",
            MeasurementState::Activated => "activated",
            MeasurementState::Deactivated => "deactivated",
        };
        f.write_str(s)
    }
}

impl FromStr for MeasurementState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MeasurementState::Pending),
            "activated" => Ok(MeasurementState::Activated),
            "deactivated" => Ok(MeasurementState::Deactivated),
            other => Err(format!("invalid measurement state: {}", other)),
        }
    }
}

/// Tri-state outcome of a condition evaluation.
///
/// Serializes as the literal strings `"false"`, `"true"` and `"error"`;
/// external clients depend on this exact form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionStatus {
    False,
    True,
    Error,
}

impl ConditionStatus {
    pub fn from_bool(b: bool) -> Self {
        if b {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ConditionStatus::Error)
    }
}

impl Default for ConditionStatus {
    fn default() -> Self {
        ConditionStatus::False
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConditionStatus::False => "false",
            ConditionStatus::True => "true",
            ConditionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Scalar column types a metric can declare for its result rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    Boolean,
    String,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::String => "string",
        };
        f.write_str(s)
    }
}
