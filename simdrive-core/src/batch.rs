//! Batch files describing a config together with a list of experiments.
//!
//! # Example
//!
//! ```toml
//! [config]
//! model_path = "line.toml"
//! path_context = ".Models.Frame"
//! event_controller = "EventController"
//! max_concurrency = 4
//!
//! [[experiments]]
//! inputs = ["inspection"]
//! values = [false]
//! outputs = ["simulation"]
//! ```

use std::path::Path;

use crate::config::SimConfig;
use crate::error::Result;
use crate::experiment::ExperimentSpec;
use crate::util;

/// Config plus experiments, as read from a batch file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(default)]
    pub config: SimConfig,
    #[serde(default)]
    pub experiments: Vec<ExperimentSpec>,
}

impl Batch {
    /// Reads a batch from a toml file, or a yaml file if the extension says
    /// so. A relative model path is taken relative to the batch file.
    pub fn from_path(path: &Path) -> Result<Batch> {
        let mut batch: Batch = util::deser_struct_from_path(path)?;
        batch.config.model_path = util::resolve_against(path.parent(), &batch.config.model_path);
        batch.config.validate()?;
        debug!(
            "read batch with {} experiments from {}",
            batch.experiments.len(),
            path.to_string_lossy()
        );
        Ok(batch)
    }

    pub fn from_str(s: &str) -> Result<Batch> {
        let batch: Batch = toml::from_str(s)?;
        batch.config.validate()?;
        Ok(batch)
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }
}

#[test]
fn batch_from_toml() {
    let batch = Batch::from_str(
        r#"
        [config]
        model_path = "line.toml"
        path_context = ".Models.Frame"
        event_controller = "EventController"
        max_concurrency = 4

        [[experiments]]
        inputs = ["inspection"]
        values = [false]
        outputs = ["simulation"]

        [[experiments]]
        inputs = ["inspection"]
        values = [true]
        outputs = ["simulation"]
        "#,
    )
    .unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch.config.max_concurrency, 4);
    assert_eq!(
        batch.config.event_controller_path().unwrap(),
        ".Models.Frame.EventController"
    );
}

#[test]
fn malformed_experiment_fails_whole_batch() {
    let result = Batch::from_str(
        r#"
        [config]
        model_path = "line.toml"

        [[experiments]]
        inputs = ["a", "b"]
        values = [1]
        "#,
    );
    assert!(result.is_err());
}
