//! # Hardware backends
//!
//! A hardware backend drives a VM through its lifecycle (create, start,
//! stop, delete, inspect). The orchestrator only talks to the
//! [HardwareDriver] trait; concrete backends are selected by name through
//! [HardwareBackend].
//!
//! Driver failures are never retried: retrying a launch without operator
//! intervention risks creating the VM twice. Known infrastructure failures
//! are classified into actionable messages instead.
use std::{fmt, str::FromStr};

use mystery_box_models::models::VmRecord;

use crate::{
    builder::{multipass::MultipassBuilder, Builder, BuilderError},
    error::BoxError,
    exec::ExecuteError,
};

pub mod multipass;

pub use self::multipass::Multipass;

/// Parameters of a launch, the cloud-init document is already rendered
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchRequest {
    pub name: String,
    pub cloud_init: String,
    pub memory: String,
    pub disk: String,
    pub image: String,
}

/// Operations the orchestrator consumes from a VM hypervisor
pub trait HardwareDriver: fmt::Debug {
    fn list(&self) -> Result<Vec<VmRecord>, DriverError>;
    /// `None` when the VM does not exist
    fn info(&self, name: &str) -> Result<Option<VmRecord>, DriverError>;
    fn launch(&self, request: &LaunchRequest) -> Result<(), DriverError>;
    fn stop(&self, name: &str) -> Result<(), DriverError>;
    fn start(&self, name: &str) -> Result<(), DriverError>;
    fn delete(&self, name: &str) -> Result<(), DriverError>;
}

#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error("Cannot launch due to known issue with Multipass. Try running: sudo snap restart multipass")]
    RemoteUnreachable,
    #[error("Cannot connect to multipass. Try running: sudo snap restart multipass")]
    SocketUnavailable,
    #[error("vm {0} does not exist")]
    NotFound(String),
    #[error("multipass reported an error: {0}")]
    Reported(String),
    #[error("`{command}` failed: {output}")]
    CommandFailed { command: String, output: String },
    #[error("could not parse multipass output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Execute(#[from] ExecuteError),
}

impl DriverError {
    /// Turn the output of a failed driver command into the most actionable
    /// error available
    pub fn classify(command: &str, output: &str) -> DriverError {
        if output.contains("Remote \"\" is unknown or unreachable.") {
            DriverError::RemoteUnreachable
        } else if output.contains("cannot connect to the multipass socket") {
            DriverError::SocketUnavailable
        } else {
            DriverError::CommandFailed {
                command: command.to_string(),
                output: output.trim().to_string(),
            }
        }
    }
}

/// Registry of the available hardware backends
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HardwareBackend {
    Multipass,
}

impl HardwareBackend {
    /// Instantiate the driver, locating its binary on the host
    pub fn driver(&self) -> Result<Box<dyn HardwareDriver>, BoxError> {
        match self {
            HardwareBackend::Multipass => {
                let multipass = MultipassBuilder::auto()
                    .map_err(|e| match e {
                        BuilderError::BinaryNotFound(reason) => BoxError::BinaryNotFound(reason),
                        other => BoxError::Validation(other),
                    })?
                    .try_build()?;
                Ok(Box::new(multipass))
            }
        }
    }
}

impl FromStr for HardwareBackend {
    type Err = BoxError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "multipass" => Ok(HardwareBackend::Multipass),
            other => Err(BoxError::UnsupportedBackend {
                kind: "hardware",
                name: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use serial_test::serial;
    use tempfile::tempdir;

    use super::{DriverError, HardwareBackend};
    use crate::error::BoxError;

    #[test]
    #[serial]
    fn missing_binary_is_not_a_configuration_error() {
        let empty = tempdir().unwrap();
        let previous_path = env::var_os("PATH");
        let previous_location = env::var_os("MULTIPASS_LOCATION");
        let previous_dir = env::current_dir().unwrap();
        env::remove_var("MULTIPASS_LOCATION");
        env::set_var("PATH", empty.path());
        env::set_current_dir(empty.path()).unwrap();

        let result = HardwareBackend::Multipass.driver();

        env::set_current_dir(previous_dir).unwrap();
        if let Some(path) = previous_path {
            env::set_var("PATH", path);
        }
        if let Some(location) = previous_location {
            env::set_var("MULTIPASS_LOCATION", location);
        }
        let err = result.err().unwrap();
        assert!(matches!(err, BoxError::BinaryNotFound(_)));
        assert!(!err.to_string().contains("invalid configuration"));
        assert!(err.to_string().contains("MULTIPASS_LOCATION"));
    }

    #[test]
    fn known_failures_are_actionable() {
        let err = DriverError::classify(
            "multipass launch",
            "launch failed: Remote \"\" is unknown or unreachable.",
        );
        assert!(matches!(err, DriverError::RemoteUnreachable));
        assert!(err.to_string().contains("sudo snap restart multipass"));

        let err = DriverError::classify(
            "multipass list",
            "list failed: cannot connect to the multipass socket",
        );
        assert!(matches!(err, DriverError::SocketUnavailable));
    }

    #[test]
    fn unknown_failures_are_verbatim() {
        let err = DriverError::classify("multipass launch", "  launch failed: disk too small\n");
        assert_eq!(
            err.to_string(),
            "`multipass launch` failed: launch failed: disk too small"
        );
    }

    #[test]
    fn backend_registry() {
        assert_eq!(
            "multipass".parse::<HardwareBackend>().unwrap(),
            HardwareBackend::Multipass
        );
        let err = "virtualbox".parse::<HardwareBackend>().unwrap_err();
        assert!(matches!(
            err,
            BoxError::UnsupportedBackend {
                kind: "hardware",
                ..
            }
        ));
        assert_eq!(err.to_string(), "hardware backend \"virtualbox\" not supported");
    }
}
