use std::path::PathBuf;

use crate::{builder::BuilderError, exec::ExecuteError, hardware::DriverError};

/// Every failure the provisioning pipeline can surface. All of them are
/// terminal at the CLI boundary.
#[derive(thiserror::Error, Debug)]
pub enum BoxError {
    #[error("invalid configuration: {0}")]
    Validation(#[from] BuilderError),
    #[error("cannot load configuration {path}: {reason}")]
    ConfigFile { path: PathBuf, reason: String },
    #[error("filesystem error at {path}: {reason}")]
    Filesystem { path: PathBuf, reason: String },
    #[error("could not generate keypair: {0}")]
    KeyGeneration(String),
    #[error("could not render cloud-init document: {0}")]
    CloudInit(#[from] serde_yaml::Error),
    #[error("cannot connect to {host}: {reason}")]
    Connection { host: String, reason: String },
    #[error("failed copying {src} to {dest}: {reason}")]
    Transfer {
        src: PathBuf,
        dest: String,
        reason: String,
    },
    #[error("cannot copy {0}, as directory copies are not implemented")]
    DirectoryCopy(PathBuf),
    #[error("cannot access instance {name}, no IP found after {attempts} check(s)")]
    IpAssignment { name: String, attempts: u32 },
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("hypervisor unavailable: {0}")]
    BinaryNotFound(String),
    #[error("{kind} backend \"{name}\" not supported")]
    UnsupportedBackend { kind: &'static str, name: String },
    #[error("`{command}` exited with status {code:?} on {host}")]
    Apply {
        host: String,
        command: String,
        code: Option<i32>,
    },
    #[error(transparent)]
    Execute(#[from] ExecuteError),
}

impl BoxError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, reason: impl ToString) -> BoxError {
        BoxError::Filesystem {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = BoxError> = std::result::Result<T, E>;
