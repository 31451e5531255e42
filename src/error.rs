//! Error taxonomy for configuration, resolution and startup.

use crate::config::Shape;
use crate::startup::StartupState;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Configuration errors
    InvalidConfig,
    ConfigParse,
    ConfigIo,

    // Resolution errors
    UnknownModule,
    CyclicDependency,
    DuplicateModule,

    // Startup errors
    StageFailed,
    Aborted,
    NotCancellable,
    InvalidState,
}

/// Errors raised while building the resolved configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An override supplied a value whose shape conflicts with the default.
    #[error("invalid configuration at '{path}': expected {expected}, found {found}")]
    InvalidConfig {
        path: String,
        expected: Shape,
        found: Shape,
    },

    #[error("failed to parse configuration from {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("failed to read configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn invalid(path: &str, expected: Shape, found: Shape) -> Self {
        Self::InvalidConfig {
            path: path.to_string(),
            expected,
            found,
        }
    }

    pub fn parse(origin: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            origin: origin.into(),
            message: err.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            ConfigError::Parse { .. } => ErrorCode::ConfigParse,
            ConfigError::Io { .. } => ErrorCode::ConfigIo,
        }
    }
}

/// Errors raised while turning module names into a load plan.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{}", unknown_module_message(name, required_by.as_deref()))]
    UnknownModule {
        name: String,
        required_by: Option<String>,
    },

    #[error("cyclic module dependency: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("module '{name}' is already registered")]
    DuplicateModule { name: String },
}

fn unknown_module_message(name: &str, required_by: Option<&str>) -> String {
    match required_by {
        Some(dependent) => format!("unknown module '{}' (required by '{}')", name, dependent),
        None => format!("unknown module '{}'", name),
    }
}

impl ResolveError {
    pub fn unknown(name: &str) -> Self {
        Self::UnknownModule {
            name: name.to_string(),
            required_by: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ResolveError::UnknownModule { .. } => ErrorCode::UnknownModule,
            ResolveError::CyclicDependency { .. } => ErrorCode::CyclicDependency,
            ResolveError::DuplicateModule { .. } => ErrorCode::DuplicateModule,
        }
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the startup sequencer.
#[derive(Debug, Error)]
pub enum StartupError {
    /// A stage failed; the sequencer stays parked in `stage`.
    #[error("startup stage {stage} failed: {source}")]
    Stage {
        stage: StartupState,
        #[source]
        source: BoxError,
    },

    #[error("startup aborted during {stage}")]
    Aborted { stage: StartupState },

    #[error("startup cannot be aborted once {state} has begun")]
    NotCancellable { state: StartupState },

    #[error("operation requires state {expected}, sequencer is in {actual}")]
    InvalidState {
        expected: StartupState,
        actual: StartupState,
    },
}

impl StartupError {
    pub fn stage(stage: StartupState, source: impl Into<BoxError>) -> Self {
        Self::Stage {
            stage,
            source: source.into(),
        }
    }

    /// The stage the failure is attributed to, if any.
    pub fn failed_stage(&self) -> Option<StartupState> {
        match self {
            StartupError::Stage { stage, .. } | StartupError::Aborted { stage } => Some(*stage),
            _ => None,
        }
    }

    /// Downcast the wrapped cause of a stage failure.
    pub fn cause<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            StartupError::Stage { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            StartupError::Stage { .. } => ErrorCode::StageFailed,
            StartupError::Aborted { .. } => ErrorCode::Aborted,
            StartupError::NotCancellable { .. } => ErrorCode::NotCancellable,
            StartupError::InvalidState { .. } => ErrorCode::InvalidState,
        }
    }
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Startup(#[from] StartupError),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Config(err) => err.code(),
            Error::Resolve(err) => err.code(),
            Error::Startup(err) => err.code(),
        }
    }
}

/// Structured error payload for machine-readable output.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<StartupState>,
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        let stage = match err {
            Error::Startup(err) => err.failed_stage(),
            _ => None,
        };
        Self {
            code: err.code(),
            message: err.to_string(),
            stage,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
