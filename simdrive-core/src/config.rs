//! Session configuration.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::host::LicenseType;
use crate::{join_path, util, DEFAULT_POLL_INTERVAL_MS};

/// Configuration applied to every session opened for a simulator or a
/// runner pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Host product version, empty for any installed version
    pub version: String,
    pub license_type: LicenseType,
    /// Upper bound on the number of sessions open at once
    pub max_concurrency: usize,
    pub model_path: PathBuf,
    /// Frame that relative variable names resolve against
    pub path_context: Option<String>,
    /// Event controller name, relative to the path context unless absolute
    pub event_controller: Option<String>,
    pub visible: bool,
    pub trust_models: bool,
    /// Period for polling the host for run completion
    pub poll_interval_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            version: String::new(),
            license_type: LicenseType::default(),
            max_concurrency: 1,
            model_path: PathBuf::new(),
            path_context: None,
            event_controller: None,
            visible: false,
            trust_models: false,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl SimConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        SimConfig {
            model_path: model_path.into(),
            ..SimConfig::default()
        }
    }

    /// Reads the config from a toml (or yaml) file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut config: SimConfig = util::deser_struct_from_path(path)?;
        config.model_path = util::resolve_against(path.parent(), &config.model_path);
        config.validate()?;
        Ok(config)
    }

    pub fn with_path_context(mut self, path: &str) -> Self {
        self.path_context = Some(path.to_string());
        self
    }

    pub fn with_event_controller(mut self, name: &str) -> Self {
        self.event_controller = Some(name.to_string());
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    pub fn with_license(mut self, license: LicenseType) -> Self {
        self.license_type = license;
        self
    }

    /// Checks the config for values no session could be configured with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::InvalidConfig(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.model_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("model_path is not set".to_string()));
        }
        if self.event_controller.is_some() && self.path_context.is_none() {
            return Err(Error::CommandOrder {
                command: "set_event_controller",
                prerequisite: "set_path_context",
            });
        }
        Ok(())
    }

    /// Absolute path of the configured event controller.
    pub fn event_controller_path(&self) -> Option<String> {
        self.event_controller
            .as_ref()
            .map(|ec| join_path(self.path_context.as_deref(), ec))
    }
}

#[test]
fn validation() {
    let config = SimConfig::new("line.spp");
    assert!(config.validate().is_ok());

    match config.clone().with_max_concurrency(0).validate() {
        Err(Error::InvalidConfig(_)) => (),
        other => panic!("unexpected: {:?}", other),
    }
    match config.clone().with_event_controller("EventController").validate() {
        Err(Error::CommandOrder { .. }) => (),
        other => panic!("unexpected: {:?}", other),
    }
    match SimConfig::default().validate() {
        Err(Error::InvalidConfig(_)) => (),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn event_controller_path_joins_context() {
    let config = SimConfig::new("line.spp")
        .with_path_context(".Models.Frame")
        .with_event_controller("EventController");
    assert_eq!(
        config.event_controller_path().unwrap(),
        ".Models.Frame.EventController"
    );
    let config = config.with_event_controller(".Models.Other.EventController");
    assert_eq!(
        config.event_controller_path().unwrap(),
        ".Models.Other.EventController"
    );
}

#[test]
fn deser_with_defaults() {
    let config: SimConfig = toml::from_str(
        r#"
        model_path = "line.spp"
        license_type = "Student"
        path_context = ".Models.Frame"
        event_controller = "EventController"
        "#,
    )
    .unwrap();
    assert_eq!(config.license_type, LicenseType::Student);
    assert_eq!(config.max_concurrency, 1);
    assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    assert!(!config.visible);
}
