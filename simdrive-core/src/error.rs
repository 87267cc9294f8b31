//! Error types.

use std::fmt;
use std::io;

use crate::host::LicenseType;
use crate::value::ValueType;

pub type Result<T> = core::result::Result<T, Error>;

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

/// Crate-wide error type.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no license seat available for license type: {0}")]
    LicenseUnavailable(LicenseType),
    #[error("simulation host unavailable: {0}")]
    HostUnavailable(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),
    #[error("failed loading model {path}: {reason}")]
    ModelLoadFailed { path: String, reason: String },
    #[error("path not found in host object tree: {0}")]
    PathNotFound(String),

    #[error("variable not found: {0}")]
    VariableNotFound(String),
    #[error("type mismatch for {name}: expected {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: ValueType,
        found: String,
    },

    #[error("table not found: {0}")]
    TableNotFound(String),
    #[error("table dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("run failed: {0}")]
    RunFailed(String),
    #[error("script execution failed: {0}")]
    ScriptFailed(String),

    #[error("malformed experiment spec: {0}")]
    MalformedSpec(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("command run out of order: '{command}' should be run after '{prerequisite}'")]
    CommandOrder {
        command: &'static str,
        prerequisite: &'static str,
    },
    #[error("operation '{op}' not valid while handle is {state}")]
    InvalidState { op: &'static str, state: String },

    #[error("pool initialization failed ({opened} of {requested} sessions opened): {reason}")]
    PoolInitializationFailed {
        requested: usize,
        opened: usize,
        reason: String,
    },
    #[error("all pool sessions lost with {remaining} experiments left")]
    PoolExhausted { remaining: usize },
    #[error("cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    IoError(String),
    #[error("toml deserialization error: {0}")]
    TomlDeserError(#[from] toml::de::Error),
    #[error("toml serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),
    #[cfg(feature = "yaml")]
    #[error("yaml deserialization error: {0}")]
    YamlDeserError(#[from] serde_yaml::Error),

    #[error("other error: {0}")]
    Other(String),
}

/// Data-less mirror of [`Error`], stored inside experiment results.
///
/// [`Error`]: enum.Error.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    LicenseUnavailable,
    HostUnavailable,
    ModelNotFound,
    ModelLoadFailed,
    PathNotFound,
    VariableNotFound,
    TypeMismatch,
    TableNotFound,
    DimensionMismatch,
    RunFailed,
    ScriptFailed,
    MalformedSpec,
    InvalidConfig,
    CommandOrder,
    InvalidState,
    PoolInitializationFailed,
    PoolExhausted,
    Cancelled,
    Io,
    Parse,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Error {
    /// Returns the kind tag of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::LicenseUnavailable(_) => ErrorKind::LicenseUnavailable,
            Error::HostUnavailable(_) => ErrorKind::HostUnavailable,
            Error::ModelNotFound(_) => ErrorKind::ModelNotFound,
            Error::ModelLoadFailed { .. } => ErrorKind::ModelLoadFailed,
            Error::PathNotFound(_) => ErrorKind::PathNotFound,
            Error::VariableNotFound(_) => ErrorKind::VariableNotFound,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::TableNotFound(_) => ErrorKind::TableNotFound,
            Error::DimensionMismatch(_) => ErrorKind::DimensionMismatch,
            Error::RunFailed(_) => ErrorKind::RunFailed,
            Error::ScriptFailed(_) => ErrorKind::ScriptFailed,
            Error::MalformedSpec(_) => ErrorKind::MalformedSpec,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::CommandOrder { .. } => ErrorKind::CommandOrder,
            Error::InvalidState { .. } => ErrorKind::InvalidState,
            Error::PoolInitializationFailed { .. } => ErrorKind::PoolInitializationFailed,
            Error::PoolExhausted { .. } => ErrorKind::PoolExhausted,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::IoError(_) => ErrorKind::Io,
            Error::TomlDeserError(_) | Error::TomlSerError(_) => ErrorKind::Parse,
            #[cfg(feature = "yaml")]
            Error::YamlDeserError(_) => ErrorKind::Parse,
            Error::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether the error concerns the whole batch rather than a single
    /// experiment.
    pub fn is_batch_level(&self) -> bool {
        match self.kind() {
            ErrorKind::MalformedSpec
            | ErrorKind::InvalidConfig
            | ErrorKind::PoolInitializationFailed
            | ErrorKind::PoolExhausted => true,
            _ => false,
        }
    }
}

#[test]
fn kind_mirrors_variant() {
    let err = Error::VariableNotFound(".Models.Frame.nope".to_string());
    assert_eq!(err.kind(), ErrorKind::VariableNotFound);
    assert!(!err.is_batch_level());

    let err = Error::PoolExhausted { remaining: 3 };
    assert_eq!(err.kind(), ErrorKind::PoolExhausted);
    assert!(err.is_batch_level());
}
