//! Core entity structures
//!
//! The monitoring hierarchy: service views own assets, assets own
//! attributes, attributes own measurements. Metrics are top-level result
//! schemas; triggers and log entries live under a service view.

use crate::{ColumnType, ConditionStatus, MeasurementState, ResourceId, Timestamp};
use serde::{Deserialize, Serialize};

/// One row of a posted result: column name to scalar cell value.
pub type ResultRow = serde_json::Map<String, serde_json::Value>;

/// Service view - top-level monitoring scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceView {
    #[serde(default)]
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub annotation: Option<String>,
}

/// Asset - a monitored component owned by a service view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(default)]
    pub id: ResourceId,
    pub name: String,
    /// Owning service view.
    pub parent: ResourceId,
    #[serde(default)]
    pub annotation: Option<String>,
}

/// Attribute - a measurable property of an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default)]
    pub id: ResourceId,
    pub name: String,
    /// Owning asset.
    pub parent: ResourceId,
    #[serde(default)]
    pub annotation: Option<String>,
}

/// Declared shape of one result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// Metric - reusable schema for measurement results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(default)]
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub annotation: Option<String>,
    #[serde(rename = "resultFormat")]
    pub result_format: Vec<ResultColumn>,
}

/// A posted measurement result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub value: Vec<ResultRow>,
    #[serde(rename = "updateTime", default)]
    pub update_time: Timestamp,
    #[serde(rename = "authorityId", default)]
    pub authority_id: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

/// Objective attached to a measurement: a condition and its last outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub condition: String,
    #[serde(default)]
    pub status: ConditionStatus,
}

/// Measurement - the leaf of the hierarchy, carrying time-stamped results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(default)]
    pub id: ResourceId,
    pub name: String,
    /// Owning attribute.
    pub parent: ResourceId,
    /// The metric describing the result schema.
    pub metric: ResourceId,
    #[serde(default)]
    pub result: Option<MeasurementResult>,
    #[serde(default)]
    pub objective: Option<Objective>,
    pub state: MeasurementState,
}

/// Trigger - a condition plus guard time watching one measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(default)]
    pub id: ResourceId,
    pub name: String,
    /// Owning service view.
    pub parent: ResourceId,
    pub measurement: ResourceId,
    pub condition: String,
    #[serde(default)]
    pub notification: Option<String>,
    /// Minimum seconds between consecutive firings.
    #[serde(rename = "guardTime", default)]
    pub guard_time: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: ConditionStatus,
    #[serde(rename = "statusUpdateTime", default)]
    pub status_update_time: Timestamp,
}

/// Log entry emitted when a trigger fires or fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub id: ResourceId,
    /// Scope of the owning trigger (its service view).
    pub parent: ResourceId,
    pub trigger: ResourceId,
    #[serde(rename = "creationTime")]
    pub creation_time: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<MeasurementResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tags: Vec<String>,
}

impl LogEntry {
    /// Entry recorded when a trigger condition fires.
    pub fn firing(trigger: &Trigger, result: Option<MeasurementResult>) -> Self {
        Self {
            id: ResourceId::new(),
            parent: trigger.parent,
            trigger: trigger.id,
            creation_time: Timestamp::now(),
            result,
            error: None,
            tags: trigger.tags.clone(),
        }
    }

    /// Entry recorded when a trigger evaluation fails.
    pub fn failure(trigger: &Trigger, message: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(),
            parent: trigger.parent,
            trigger: trigger.id,
            creation_time: Timestamp::now(),
            result: None,
            error: Some(message.into()),
            tags: vec!["error".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_serializes_result_format() {
        let metric = Metric {
            id: ResourceId::new(),
            name: "availability".into(),
            annotation: None,
            result_format: vec![ResultColumn {
                name: "score".into(),
                column_type: ColumnType::Number,
            }],
        };
        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(json["resultFormat"][0]["type"], "number");
        assert_eq!(json["resultFormat"][0]["name"], "score");
    }

    #[test]
    fn failure_log_entry_gets_error_tag() {
        let trigger = Trigger {
            id: ResourceId::new(),
            name: "t".into(),
            parent: ResourceId::new(),
            measurement: ResourceId::new(),
            condition: "true".into(),
            notification: None,
            guard_time: 0,
            tags: vec!["custom".into()],
            status: ConditionStatus::False,
            status_update_time: Timestamp::now(),
        };
        let entry = LogEntry::failure(&trigger, "boom");
        assert_eq!(entry.tags, vec!["error".to_string()]);
        assert_eq!(entry.error.as_deref(), Some("boom"));
        assert_eq!(entry.parent, trigger.parent);

        let firing = LogEntry::firing(&trigger, None);
        assert_eq!(firing.tags, vec!["custom".to_string()]);
        assert!(firing.error.is_none());
    }

    #[test]
    fn json_emission_does_not_escape_html_characters() {
        let view = ServiceView {
            id: ResourceId::new(),
            name: "a<b>&c".into(),
            annotation: None,
        };
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("a<b>&c"));
    }
}
