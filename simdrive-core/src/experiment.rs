//! Experiment definitions and results.

use std::convert::TryFrom;

use crate::error::{Error, ErrorKind, Result};
use crate::value::Value;
use crate::VarName;

/// Single parametrization of a simulation run.
///
/// Input variables are paired positionally with values and written in
/// order, so a variable listed twice ends up with the later value. Output
/// variables are read in order after the run and may repeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SpecEntry")]
pub struct ExperimentSpec {
    input_variables: Vec<VarName>,
    values: Vec<Value>,
    output_variables: Vec<VarName>,
}

/// Unvalidated form of the spec as found in batch files.
#[derive(Deserialize)]
struct SpecEntry {
    #[serde(default, alias = "inputs")]
    input_variables: Vec<VarName>,
    #[serde(default)]
    values: Vec<Value>,
    #[serde(default, alias = "outputs")]
    output_variables: Vec<VarName>,
}

impl TryFrom<SpecEntry> for ExperimentSpec {
    type Error = Error;
    fn try_from(entry: SpecEntry) -> Result<Self> {
        ExperimentSpec::new(entry.input_variables, entry.values, entry.output_variables)
    }
}

impl ExperimentSpec {
    /// Creates a new spec, checking that every input variable has a value.
    pub fn new(
        input_variables: Vec<VarName>,
        values: Vec<Value>,
        output_variables: Vec<VarName>,
    ) -> Result<Self> {
        if input_variables.len() != values.len() {
            return Err(Error::MalformedSpec(format!(
                "{} input variables but {} values",
                input_variables.len(),
                values.len()
            )));
        }
        if output_variables.is_empty() {
            warn!("experiment spec without output variables");
        }
        Ok(ExperimentSpec {
            input_variables,
            values,
            output_variables,
        })
    }

    /// Spec with one input and one output.
    pub fn single(input: &str, value: impl Into<Value>, output: &str) -> Self {
        ExperimentSpec {
            input_variables: vec![input.to_string()],
            values: vec![value.into()],
            output_variables: vec![output.to_string()],
        }
    }

    pub fn input_variables(&self) -> &[VarName] {
        &self.input_variables
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn output_variables(&self) -> &[VarName] {
        &self.output_variables
    }

    /// Input assignments in write order.
    pub fn inputs(&self) -> impl Iterator<Item = (&VarName, &Value)> {
        self.input_variables.iter().zip(self.values.iter())
    }
}

/// Outcome of a single experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Status {
    Success,
    Failed { kind: ErrorKind, message: String },
}

impl Status {
    pub fn from_error(error: &Error) -> Self {
        Status::Failed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Values read after a run, aligned with the spec's output variables.
///
/// Failed experiments carry no outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub outputs: Vec<(VarName, Value)>,
    pub status: Status,
}

impl ExperimentResult {
    pub fn success(outputs: Vec<(VarName, Value)>) -> Self {
        ExperimentResult {
            outputs,
            status: Status::Success,
        }
    }

    pub fn failed(error: &Error) -> Self {
        ExperimentResult {
            outputs: Vec::new(),
            status: Status::from_error(error),
        }
    }

    /// Result for an experiment that was never dispatched.
    pub fn cancelled() -> Self {
        ExperimentResult::failed(&Error::Cancelled)
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Returns the first output bound to the given name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.outputs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.status {
            Status::Success => None,
            Status::Failed { kind, .. } => Some(*kind),
        }
    }
}

#[test]
fn length_mismatch_is_malformed() {
    let result = ExperimentSpec::new(
        vec!["a".to_string(), "b".to_string()],
        vec![Value::Int(1)],
        vec!["c".to_string()],
    );
    match result {
        Err(Error::MalformedSpec(_)) => (),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn empty_outputs_are_accepted() {
    let spec = ExperimentSpec::new(vec![], vec![], vec![]).unwrap();
    assert!(spec.output_variables().is_empty());
}

#[test]
fn deser_runs_validation() {
    #[derive(Deserialize)]
    struct Doc {
        experiments: Vec<ExperimentSpec>,
    }
    let doc: Doc = toml::from_str(
        r#"
        [[experiments]]
        inputs = ["inspection"]
        values = [true]
        outputs = ["simulation", "simulation"]
        "#,
    )
    .unwrap();
    assert_eq!(
        doc.experiments[0].inputs().collect::<Vec<_>>(),
        vec![(&"inspection".to_string(), &Value::Bool(true))]
    );
    assert_eq!(doc.experiments[0].output_variables().len(), 2);

    let bad: std::result::Result<Doc, _> = toml::from_str(
        r#"
        [[experiments]]
        inputs = ["a", "b"]
        values = [1]
        "#,
    );
    assert!(bad.is_err());
}

#[test]
fn result_lookup_returns_first_binding() {
    let result = ExperimentResult::success(vec![
        ("x".to_string(), Value::Int(1)),
        ("x".to_string(), Value::Int(2)),
    ]);
    assert_eq!(result.get("x"), Some(&Value::Int(1)));
    assert_eq!(result.get("y"), None);
    assert!(result.is_success());
    assert_eq!(
        ExperimentResult::cancelled().error_kind(),
        Some(ErrorKind::Cancelled)
    );
}
