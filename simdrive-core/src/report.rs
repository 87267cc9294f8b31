//! Batch run reports.

use chrono::{DateTime, Utc};

use crate::error::{ErrorKind, Result};
use crate::experiment::{ExperimentResult, Status};
use crate::value::Value;

/// Summary of a finished batch, serializable to toml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: i64,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub entries: Vec<ReportEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub outputs: Vec<OutputEntry>,
}

/// Output value; null values are left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl BatchReport {
    pub fn new(
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        results: &[ExperimentResult],
    ) -> Self {
        let entries: Vec<ReportEntry> = results
            .iter()
            .enumerate()
            .map(|(index, result)| {
                let (error_kind, message) = match &result.status {
                    Status::Success => (None, None),
                    Status::Failed { kind, message } => (Some(*kind), Some(message.clone())),
                };
                ReportEntry {
                    index,
                    success: result.is_success(),
                    error_kind,
                    message,
                    outputs: result
                        .outputs
                        .iter()
                        .map(|(name, value)| OutputEntry {
                            name: name.clone(),
                            value: match value {
                                Value::Null => None,
                                v => Some(v.clone()),
                            },
                        })
                        .collect(),
                }
            })
            .collect();
        let cancelled = entries
            .iter()
            .filter(|e| e.error_kind == Some(ErrorKind::Cancelled))
            .count();
        let succeeded = entries.iter().filter(|e| e.success).count();
        BatchReport {
            started_at,
            finished_at,
            elapsed_ms: (finished_at - started_at).num_milliseconds(),
            total: entries.len(),
            succeeded,
            failed: entries.len() - succeeded - cancelled,
            cancelled,
            entries,
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// One line summary of the counts.
    pub fn summary(&self) -> String {
        format!(
            "{} experiments: {} succeeded, {} failed, {} cancelled ({} ms)",
            self.total, self.succeeded, self.failed, self.cancelled, self.elapsed_ms
        )
    }
}

#[test]
fn report_counts_and_serializes() {
    use crate::error::Error;

    let results = vec![
        ExperimentResult::success(vec![
            ("simulation".to_string(), Value::Int(17)),
            ("note".to_string(), Value::Null),
        ]),
        ExperimentResult::failed(&Error::VariableNotFound(".Models.Frame.x".to_string())),
        ExperimentResult::cancelled(),
    ];
    let now = Utc::now();
    let report = BatchReport::new(now, now + chrono::Duration::milliseconds(250), &results);
    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.cancelled, 1);
    assert_eq!(report.elapsed_ms, 250);

    let text = report.to_toml_string().unwrap();
    assert!(text.contains("VariableNotFound"));
    let back: BatchReport = toml::from_str(&text).unwrap();
    assert_eq!(back.entries[0].outputs[1].value, None);
    assert_eq!(back.entries[0].outputs[0].value, Some(Value::Int(17)));
}
