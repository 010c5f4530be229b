//! Command-line front end of the `box` binary.
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::{
    builder::{devbox::DevBoxBuilder, Builder},
    devbox::{DevBox, DevBoxError, IntoOptions, DEFAULT_IMAGE, DEFAULT_NAME},
    hardware::HardwareBackend,
    software::SoftwareBackend,
};

/// box provisions a disposable development VM and keeps it configured
#[derive(Debug, Parser)]
#[command(name = "box", author, version)]
pub struct BoxArgs {
    /// The subcommand to run
    #[command(subcommand)]
    pub subcommand: BoxSubcommand,

    /// Name of the VM
    #[arg(long, global = true, default_value = DEFAULT_NAME)]
    pub name: String,

    /// Hardware backend driving the VM lifecycle
    #[arg(long, global = true, default_value = "multipass")]
    pub backend: String,

    /// Software configurator applying the playbooks
    #[arg(long, global = true, default_value = "ansible")]
    pub configurator: String,

    /// Image the VM is launched from
    #[arg(long, global = true, default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum BoxSubcommand {
    /// Launch the VM if needed, wait for its address and configure it
    #[command(name = "up")]
    Up {
        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Open a shell on the VM, starting it if stopped
    #[command(name = "in")]
    In {
        /// Remote user, the configured user by default
        #[arg(short, long)]
        user: Option<String>,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Apply the playbooks to the running VM
    #[command(name = "configure")]
    Configure {
        /// Apply this playbook instead of the configured ones
        #[arg(short, long)]
        playbook: Option<PathBuf>,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Start the VM
    #[command(name = "start")]
    Start,

    /// Stop the VM
    #[command(name = "stop")]
    Stop,

    /// Delete and purge the VM
    #[command(name = "delete")]
    Delete,
}

impl BoxArgs {
    /// Resolve the backends by name, failing before any side effect on an
    /// unknown one
    pub fn devbox(&self) -> Result<DevBox, DevBoxError> {
        let hardware: HardwareBackend = self.backend.parse().map_err(DevBoxError::startup)?;
        let software: SoftwareBackend = self.configurator.parse().map_err(DevBoxError::startup)?;
        let driver = hardware.driver().map_err(DevBoxError::startup)?;

        DevBoxBuilder::new()
            .with_name(self.name.clone())
            .with_image(self.image.clone())
            .with_driver(driver)
            .with_configurator(software)
            .try_build()
            .map_err(DevBoxError::startup)
    }
}

/// Run the requested subcommand to completion
pub fn run(args: BoxArgs) -> Result<(), DevBoxError> {
    let devbox = args.devbox()?;
    match args.subcommand {
        BoxSubcommand::Up { config } => {
            let ip = devbox.up(config.as_deref())?;
            info!("{} is up at {}", devbox.name(), ip);
        }
        BoxSubcommand::In { user, config } => devbox.enter(&IntoOptions { user, config })?,
        BoxSubcommand::Configure { playbook, config } => {
            devbox.configure_from(config.as_deref(), playbook.as_deref())?
        }
        BoxSubcommand::Start => devbox.start()?,
        BoxSubcommand::Stop => devbox.stop()?,
        BoxSubcommand::Delete => devbox.delete()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::{BoxArgs, BoxSubcommand};
    use crate::error::BoxError;

    #[test]
    fn global_defaults() {
        let args = BoxArgs::try_parse_from(["box", "up"]).unwrap();
        assert_eq!(args.subcommand, BoxSubcommand::Up { config: None });
        assert_eq!(args.name, "devbox");
        assert_eq!(args.backend, "multipass");
        assert_eq!(args.configurator, "ansible");
        assert_eq!(args.image, "ubuntu");
        assert!(!args.verbose);
    }

    #[test]
    fn in_with_user_and_config() {
        let args = BoxArgs::try_parse_from([
            "box", "in", "--user", "root", "--config", "other.yaml", "--name", "lab",
        ])
        .unwrap();
        assert_eq!(
            args.subcommand,
            BoxSubcommand::In {
                user: Some("root".to_string()),
                config: Some(PathBuf::from("other.yaml")),
            }
        );
        assert_eq!(args.name, "lab");
    }

    #[test]
    fn configure_with_playbook() {
        let args = BoxArgs::try_parse_from(["box", "configure", "-p", "site.yaml"]).unwrap();
        assert_eq!(
            args.subcommand,
            BoxSubcommand::Configure {
                playbook: Some(PathBuf::from("site.yaml")),
                config: None,
            }
        );
    }

    #[test]
    fn lifecycle_subcommands() {
        for (name, expected) in [
            ("start", BoxSubcommand::Start),
            ("stop", BoxSubcommand::Stop),
            ("delete", BoxSubcommand::Delete),
        ] {
            let args = BoxArgs::try_parse_from(["box", name, "--verbose"]).unwrap();
            assert_eq!(args.subcommand, expected);
            assert!(args.verbose);
        }
    }

    #[test]
    fn subcommand_is_required() {
        assert!(BoxArgs::try_parse_from(["box"]).is_err());
    }

    #[test]
    fn unknown_backend_fails_before_side_effects() {
        let args = BoxArgs::try_parse_from(["box", "--backend", "virtualbox", "up"]).unwrap();
        let err = args.devbox().unwrap_err();
        assert!(matches!(
            err.source,
            BoxError::UnsupportedBackend {
                kind: "hardware",
                ..
            }
        ));

        let args = BoxArgs::try_parse_from(["box", "--configurator", "chef", "stop"]).unwrap();
        let err = args.devbox().unwrap_err();
        assert!(matches!(err.source, BoxError::UnsupportedBackend { .. }));
    }
}
