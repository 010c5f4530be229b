//! Ansible configurator.
//!
//! Ansible is not required on the operator's machine: the VM installs it on
//! first boot, playbooks are uploaded to the VM and applied there against
//! `localhost`.
use std::{sync::Arc, time::Instant};

use tracing::{debug, error, info, instrument};

use crate::{
    builder::box_config::BoxConfig,
    error::BoxError,
    observer::{Event, Observer},
    remote::{RemoteConnector, RemoteShell, RemoteTarget},
    software::{ConfiguratorState, SoftwareConfigurator},
};

/// Remote directory, relative to the home of the remote user, holding the
/// uploaded playbooks
pub const PLAYBOOK_DIR: &str = "mystery_box";

/// Command applying an uploaded playbook on the VM itself
pub fn apply_command(remote_playbook: &str) -> String {
    format!(
        "ansible-playbook -i \"localhost, \" -c local {}",
        shell_quote(remote_playbook)
    )
}

/// Remote path of the `index`-th playbook. Generated rather than derived from
/// the local file name, so two playbooks never share a path and no operator
/// supplied name reaches the remote shell.
pub fn remote_playbook(index: usize) -> String {
    format!("{}/{:02}-playbook.yaml", PLAYBOOK_DIR, index + 1)
}

/// Single-quote `s` for a POSIX shell
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[derive(Debug)]
pub struct AnsibleConfigurator {
    target: RemoteTarget,
    connector: Arc<dyn RemoteConnector>,
    observer: Arc<dyn Observer>,
    cfg: Option<BoxConfig>,
    state: ConfiguratorState,
}

impl AnsibleConfigurator {
    pub fn new(
        target: RemoteTarget,
        connector: Arc<dyn RemoteConnector>,
        observer: Arc<dyn Observer>,
    ) -> AnsibleConfigurator {
        AnsibleConfigurator {
            target,
            connector,
            observer,
            cfg: None,
            state: ConfiguratorState::Idle,
        }
    }

    /// Upload every payload, then apply each playbook. Stops at the first
    /// failure, nothing is applied if any copy fails.
    fn apply(&self, cfg: &BoxConfig) -> Result<(), BoxError> {
        let transfer = self.connector.transfer(&self.target);

        for entry in cfg.copy_manifest() {
            info!("Copying {} to {}", entry.src.display(), entry.dest);
            transfer.copy(&entry.src, &entry.dest)?;
        }

        let shell = self.connector.shell(&self.target);
        self.run_remote(shell.as_ref(), format!("mkdir -p {}", shell_quote(PLAYBOOK_DIR)))?;

        let mut uploaded = Vec::with_capacity(cfg.playbooks().len());
        for (index, playbook) in cfg.playbooks().iter().enumerate() {
            let remote = remote_playbook(index);
            info!("Uploading playbook {} as {}", playbook.display(), remote);
            transfer.copy(playbook, &remote)?;
            uploaded.push(remote);
        }

        for remote in &uploaded {
            self.run_remote(shell.as_ref(), apply_command(remote))?;
        }
        Ok(())
    }

    /// Run `command` on the VM, a non-zero exit status is a failure
    fn run_remote(&self, shell: &dyn RemoteShell, command: String) -> Result<(), BoxError> {
        let exit = shell.run(&command)?;
        if !exit.success() {
            return Err(BoxError::Apply {
                host: self.target.ip.clone(),
                command,
                code: exit.code,
            });
        }
        Ok(())
    }
}

impl SoftwareConfigurator for AnsibleConfigurator {
    fn configure(&mut self, cfg: &BoxConfig) {
        self.cfg = Some(cfg.clone());
        self.state = ConfiguratorState::Configuring;
    }

    #[instrument(skip(self), fields(host = %self.target.ip))]
    fn run(&mut self) -> Result<(), BoxError> {
        let Some(cfg) = self.cfg.clone() else {
            debug!("Nothing to configure");
            return Ok(());
        };

        self.state = ConfiguratorState::Configuring;
        let started = Instant::now();
        match self.apply(&cfg) {
            Ok(()) => {
                self.state = ConfiguratorState::Done;
                self.observer.on_event(&Event::Configured {
                    ip: self.target.ip.clone(),
                    elapsed: started.elapsed(),
                });
                Ok(())
            }
            Err(e) => {
                self.state = ConfiguratorState::Failed;
                error!("Configuration of {} failed: {}", self.target.ip, e);
                Err(e)
            }
        }
    }

    fn state(&self) -> ConfiguratorState {
        self.state
    }
}
