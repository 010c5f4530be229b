//! # Builder Pattern
//!
//! Every object the orchestrator consumes is created through a builder. All
//! fields of a builder are optional and are validated once you run the
//! [`Builder::try_build`] method. Once the build is successful, the resulting
//! object is considered valid and is never mutated afterwards.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mystery_box::builder::{Builder, box_config::BoxConfigBuilder};
//! use mystery_box::builder::cloud_init::CloudInitBuilder;
//!
//! let config = BoxConfigBuilder::new()
//!     .with_user("dev".to_string())
//!     .with_memory("3G".to_string())
//!     .with_disk("30G".to_string())
//!     .with_playbook("playbooks/devbox.yaml")
//!     .with_key_folder("/home/dev/.mystery_box")
//!     .try_build()
//!     .unwrap();
//!
//! let cloud_init = CloudInitBuilder::bootstrap(config.user(), "ssh-rsa AAAA... mystery_box")
//!     .try_build()
//!     .unwrap();
//! ```
use std::path::PathBuf;

pub mod box_config;
pub mod cloud_init;
pub mod devbox;
pub mod multipass;

fn assert_not_none<T>(key: &str, value: &Option<T>) -> Result<(), BuilderError> {
    match value {
        Some(_) => Ok(()),
        None => Err(BuilderError::MissingRequiredField(key.to_string())),
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BuilderError {
    /// The field is required but was not provided in the builder object
    #[error("{0} is required")]
    MissingRequiredField(String),
    /// The field was provided but holds nothing usable
    #[error("{0} must not be empty")]
    EmptyField(String),
    /// A local path referenced by the configuration does not exist
    #[error("file {0} does not exist")]
    PathNotFound(PathBuf),
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("copy entry #{index} is missing \"{field}\" entry")]
    IncompleteCopyEntry { index: usize, field: &'static str },
    /// The remote path would be reinterpreted by the shell on the VM
    #[error("copy entry #{index} has destination {dest:?} holding whitespace or shell characters")]
    UnsafeRemotePath { index: usize, dest: String },
    /// `~` was used but the home directory of the current user is unknown
    #[error("cannot expand {0}: home directory is unknown")]
    HomeNotFound(PathBuf),
    /// Happens when using auto methods to detect the hypervisor binary
    #[error("binary not found: {0}")]
    BinaryNotFound(String),
}

/// Generic trait which all builder components must implement
pub trait Builder<T> {
    /// Validate all the fields from the builder object and apply it to the
    /// final object
    fn try_build(self) -> Result<T, BuilderError>;
}
