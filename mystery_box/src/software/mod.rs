//! # Software configurators
//!
//! A software configurator applies configuration management to a running
//! VM. It follows a small state machine:
//!
//! ```text
//! Idle --configure--> Configuring --run--> Done
//!                                    \---> Failed
//! ```
//!
//! Calling [SoftwareConfigurator::run] without a prior
//! [SoftwareConfigurator::configure] leaves the configurator `Idle` and does
//! not contact the VM.
use std::{fmt, str::FromStr, sync::Arc};

use crate::{
    builder::box_config::BoxConfig,
    error::BoxError,
    observer::Observer,
    remote::{RemoteConnector, RemoteTarget},
};

pub mod ansible;

pub use self::ansible::AnsibleConfigurator;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfiguratorState {
    Idle,
    Configuring,
    Done,
    Failed,
}

pub trait SoftwareConfigurator: fmt::Debug {
    /// Store the configuration to apply
    fn configure(&mut self, cfg: &BoxConfig);
    /// Apply the stored configuration to the VM
    fn run(&mut self) -> Result<(), BoxError>;
    fn state(&self) -> ConfiguratorState;
}

/// Registry of the available software configurators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoftwareBackend {
    Ansible,
}

impl SoftwareBackend {
    pub fn create(
        &self,
        target: RemoteTarget,
        connector: Arc<dyn RemoteConnector>,
        observer: Arc<dyn Observer>,
    ) -> Box<dyn SoftwareConfigurator> {
        match self {
            SoftwareBackend::Ansible => {
                Box::new(AnsibleConfigurator::new(target, connector, observer))
            }
        }
    }
}

impl FromStr for SoftwareBackend {
    type Err = BoxError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "ansible" => Ok(SoftwareBackend::Ansible),
            other => Err(BoxError::UnsupportedBackend {
                kind: "software-configuration",
                name: other.to_string(),
            }),
        }
    }
}
