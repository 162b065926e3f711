//! Result validation against metric schemas

use vigil_core::{ColumnType, MeasurementResult, Metric, ValidationError};

/// Check every row of a posted result against the metric's declared
/// columns: row width must equal the column count, every cell must be
/// declared, and each cell's scalar kind must match the column type.
pub fn check_result(metric: &Metric, result: &MeasurementResult) -> Result<(), ValidationError> {
    for row in &result.value {
        if row.len() != metric.result_format.len() {
            return Err(ValidationError::ColumnCountMismatch {
                expected: metric.result_format.len(),
                got: row.len(),
            });
        }

        for (name, cell) in row {
            let column = metric
                .result_format
                .iter()
                .find(|column| &column.name == name)
                .ok_or_else(|| ValidationError::UnknownColumn {
                    column: name.clone(),
                })?;

            let matches = match column.column_type {
                ColumnType::Number => cell.is_number(),
                ColumnType::Boolean => cell.is_boolean(),
                ColumnType::String => cell.is_string(),
            };
            if !matches {
                return Err(ValidationError::ColumnTypeMismatch {
                    column: name.clone(),
                    expected: match column.column_type {
                        ColumnType::Number => "number",
                        ColumnType::Boolean => "boolean",
                        ColumnType::String => "string",
                    },
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::{ResourceId, ResultColumn, ResultRow, Timestamp};

    fn metric() -> Metric {
        Metric {
            id: ResourceId::new(),
            name: "quality".into(),
            annotation: None,
            result_format: vec![
                ResultColumn {
                    name: "score".into(),
                    column_type: ColumnType::Number,
                },
                ResultColumn {
                    name: "passing".into(),
                    column_type: ColumnType::Boolean,
                },
            ],
        }
    }

    fn result(rows: Vec<serde_json::Value>) -> MeasurementResult {
        MeasurementResult {
            value: rows
                .into_iter()
                .map(|row| match row {
                    serde_json::Value::Object(map) => map as ResultRow,
                    _ => unreachable!("rows are objects"),
                })
                .collect(),
            update_time: Timestamp::now(),
            authority_id: None,
            signature: None,
        }
    }

    #[test]
    fn matching_rows_pass() {
        let r = result(vec![serde_json::json!({"score": 75, "passing": true})]);
        assert!(check_result(&metric(), &r).is_ok());
    }

    #[test]
    fn short_rows_are_rejected() {
        let r = result(vec![serde_json::json!({"score": 75})]);
        assert!(matches!(
            check_result(&metric(), &r).unwrap_err(),
            ValidationError::ColumnCountMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn undeclared_columns_are_rejected() {
        let r = result(vec![serde_json::json!({"score": 75, "extra": 1})]);
        assert!(matches!(
            check_result(&metric(), &r).unwrap_err(),
            ValidationError::UnknownColumn { .. }
        ));
    }

    #[test]
    fn type_mismatches_are_rejected() {
        let r = result(vec![serde_json::json!({"score": "75", "passing": true})]);
        assert!(matches!(
            check_result(&metric(), &r).unwrap_err(),
            ValidationError::ColumnTypeMismatch { .. }
        ));
    }

    #[test]
    fn empty_results_pass() {
        assert!(check_result(&metric(), &result(vec![])).is_ok());
    }
}
