//! # DevBox orchestrator
//!
//! [DevBox] composes the hardware driver, the keypair store, the remote
//! sessions and the software configurator into the `up`, `enter`,
//! `configure`, `start`, `stop` and `delete` lifecycle operations.
//!
//! ```text
//! Absent --launch--> Launching --ipv4--> Running(IP) --configure--> Configured
//! ```
//!
//! VM state is never cached: every decision point asks the driver again,
//! since the VM may be stopped or deleted behind our back. Failures are not
//! retried, they are wrapped in a [DevBoxError] naming the phase that failed
//! and how long the operation had been running.
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use mystery_box_models::models::{VmRecord, VmState};
use tracing::{debug, info, instrument, trace};

use crate::{
    builder::{
        box_config::BoxConfig,
        cloud_init::{to_yaml, CloudInitBuilder, ROOT_USER},
        Builder,
    },
    config::load_config,
    error::BoxError,
    hardware::{DriverError, HardwareDriver, LaunchRequest},
    keys::KeyStore,
    observer::{Event, Observer},
    remote::{RemoteConnector, RemoteTarget},
    software::SoftwareBackend,
};

pub const DEFAULT_NAME: &str = "devbox";
pub const DEFAULT_IMAGE: &str = "ubuntu";

/// Bounded polling of the driver while waiting for the VM's address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadinessPolicy {
    /// Number of `info` calls, at least one is always made
    pub attempts: u32,
    /// Pause between two calls
    pub delay: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        ReadinessPolicy {
            attempts: 30,
            delay: Duration::from_secs(2),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    LoadConfig,
    Launch,
    WaitForIp,
    Configure,
    Connect,
    Lifecycle,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Phase::LoadConfig => "load-config",
            Phase::Launch => "launch",
            Phase::WaitForIp => "wait-for-ip",
            Phase::Configure => "configure",
            Phase::Connect => "connect",
            Phase::Lifecycle => "lifecycle",
        };
        write!(f, "{}", phase)
    }
}

#[derive(thiserror::Error, Debug)]
#[error("{phase} failed after {}s: {source}", .elapsed.as_secs())]
pub struct DevBoxError {
    pub phase: Phase,
    pub elapsed: Duration,
    #[source]
    pub source: BoxError,
}

impl DevBoxError {
    /// Failure happening before any operation started, such as an unknown
    /// backend name
    pub fn startup(source: impl Into<BoxError>) -> DevBoxError {
        DevBoxError {
            phase: Phase::LoadConfig,
            elapsed: Duration::ZERO,
            source: source.into(),
        }
    }

    fn at<E: Into<BoxError>>(phase: Phase, started: Instant) -> impl FnOnce(E) -> DevBoxError {
        move |e| DevBoxError {
            phase,
            elapsed: started.elapsed(),
            source: e.into(),
        }
    }
}

/// Options of [DevBox::enter]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntoOptions {
    /// Remote user to log in as, the configured user when absent
    pub user: Option<String>,
    /// Configuration file, `./box.yaml` when absent
    pub config: Option<PathBuf>,
}

#[derive(Debug)]
pub struct DevBox {
    pub(crate) name: String,
    pub(crate) image: String,
    pub(crate) driver: Box<dyn HardwareDriver>,
    pub(crate) connector: Arc<dyn RemoteConnector>,
    pub(crate) key_store: KeyStore,
    pub(crate) observer: Arc<dyn Observer>,
    pub(crate) readiness: ReadinessPolicy,
    pub(crate) configurator: SoftwareBackend,
}

impl DevBox {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Load the configuration then bring the VM up, see [DevBox::up_with]
    pub fn up(&self, config_path: Option<&Path>) -> Result<String, DevBoxError> {
        let started = Instant::now();
        let config = load_config(config_path).map_err(DevBoxError::at(Phase::LoadConfig, started))?;
        self.provision(&config, started)
    }

    /// Launch the VM unless it already runs, wait for its address and
    /// configure it. Returns the VM's address.
    pub fn up_with(&self, config: &BoxConfig) -> Result<String, DevBoxError> {
        self.provision(config, Instant::now())
    }

    #[instrument(skip(self, config), fields(name = %self.name))]
    fn provision(&self, config: &BoxConfig, started: Instant) -> Result<String, DevBoxError> {
        let current = self
            .driver
            .info(&self.name)
            .map_err(DevBoxError::at(Phase::Launch, started))?
            .unwrap_or_else(|| VmRecord::absent(&self.name));

        match current.state {
            VmState::Running => info!("{} is already running, skipping launch", self.name),
            state if state.is_resumable() => {
                info!("{} is {}, starting it", self.name, state);
                self.driver
                    .start(&self.name)
                    .map_err(DevBoxError::at(Phase::Launch, started))?;
            }
            _ => self
                .launch(config)
                .map_err(DevBoxError::at(Phase::Launch, started))?,
        }

        let ip = self
            .wait_for_ip()
            .map_err(DevBoxError::at(Phase::WaitForIp, started))?;
        self.observer.on_event(&Event::HardwareUp {
            name: self.name.clone(),
            ip: ip.clone(),
            elapsed: started.elapsed(),
        });

        self.apply(config, &ip)
            .map_err(DevBoxError::at(Phase::Configure, started))?;
        self.observer.on_event(&Event::Ready {
            name: self.name.clone(),
            elapsed: started.elapsed(),
        });
        Ok(ip)
    }

    fn launch(&self, config: &BoxConfig) -> Result<(), BoxError> {
        let pair = self.key_store.ensure_key_pair(config.key_folder())?;
        let document = CloudInitBuilder::bootstrap(config.user(), pair.read_public()?).try_build()?;
        let cloud_init = to_yaml(&document)?;
        trace!("cloud-init document:\n{}", cloud_init);

        self.observer.on_event(&Event::Launching {
            name: self.name.clone(),
            image: self.image.clone(),
        });
        self.driver.launch(&LaunchRequest {
            name: self.name.clone(),
            cloud_init,
            memory: config.memory().to_string(),
            disk: config.disk().to_string(),
            image: self.image.clone(),
        })?;
        Ok(())
    }

    /// Poll the driver until the VM reports an ipv4 address, giving up after
    /// the attempts of the readiness policy
    fn wait_for_ip(&self) -> Result<String, BoxError> {
        let attempts = self.readiness.attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(ip) = self.driver.info(&self.name)?.and_then(|r| r.ipv4) {
                debug!("{} got {} after {} check(s)", self.name, ip, attempt);
                return Ok(ip);
            }
            self.observer.on_event(&Event::WaitingForIp {
                name: self.name.clone(),
                attempt,
                attempts,
            });
            if attempt < attempts {
                thread::sleep(self.readiness.delay);
            }
        }
        Err(BoxError::IpAssignment {
            name: self.name.clone(),
            attempts,
        })
    }

    /// Run the software configurator as root against the running VM.
    /// Nothing happens, the VM is not even contacted, without playbooks.
    #[instrument(skip(self, config), fields(name = %self.name))]
    pub fn configure(&self, config: &BoxConfig) -> Result<(), DevBoxError> {
        let started = Instant::now();
        if config.playbooks().is_empty() {
            info!("No playbooks configured, skipping configuration");
            return Ok(());
        }
        let ip = self
            .current_ip()
            .map_err(DevBoxError::at(Phase::Connect, started))?;
        self.apply(config, &ip)
            .map_err(DevBoxError::at(Phase::Configure, started))
    }

    /// `configure` from a configuration file, `playbook` replacing the
    /// configured playbooks when given
    pub fn configure_from(
        &self,
        config_path: Option<&Path>,
        playbook: Option<&Path>,
    ) -> Result<(), DevBoxError> {
        let started = Instant::now();
        let mut config =
            load_config(config_path).map_err(DevBoxError::at(Phase::LoadConfig, started))?;
        if let Some(playbook) = playbook {
            config = config
                .with_playbooks(vec![playbook.to_path_buf()])
                .map_err(DevBoxError::at(Phase::LoadConfig, started))?;
        }
        self.configure(&config)
    }

    fn apply(&self, config: &BoxConfig, ip: &str) -> Result<(), BoxError> {
        if config.playbooks().is_empty() {
            info!("No playbooks configured, skipping configuration");
            return Ok(());
        }
        let pair = self.key_store.ensure_key_pair(config.key_folder())?;
        self.observer.on_event(&Event::Configuring {
            name: self.name.clone(),
        });

        let target = RemoteTarget::new(ROOT_USER, ip, pair.private);
        let mut configurator =
            self.configurator
                .create(target, self.connector.clone(), self.observer.clone());
        configurator.configure(config);
        configurator.run()
    }

    fn current_ip(&self) -> Result<String, BoxError> {
        match self.driver.info(&self.name)? {
            Some(VmRecord { ipv4: Some(ip), .. }) => Ok(ip),
            Some(_) => Err(BoxError::IpAssignment {
                name: self.name.clone(),
                attempts: 1,
            }),
            None => Err(DriverError::NotFound(self.name.clone()).into()),
        }
    }

    /// Open an interactive shell on the VM, starting it first if stopped
    pub fn enter(&self, options: &IntoOptions) -> Result<(), DevBoxError> {
        let started = Instant::now();
        let config = load_config(options.config.as_deref())
            .map_err(DevBoxError::at(Phase::LoadConfig, started))?;
        self.enter_with(&config, options.user.as_deref())
    }

    #[instrument(skip(self, config), fields(name = %self.name))]
    pub fn enter_with(&self, config: &BoxConfig, user: Option<&str>) -> Result<(), DevBoxError> {
        let started = Instant::now();
        self.ensure_running()
            .map_err(DevBoxError::at(Phase::Lifecycle, started))?;
        let ip = self
            .wait_for_ip()
            .map_err(DevBoxError::at(Phase::WaitForIp, started))?;
        let pair = self
            .key_store
            .ensure_key_pair(config.key_folder())
            .map_err(DevBoxError::at(Phase::Connect, started))?;

        let user = user.unwrap_or(config.user());
        info!("Connecting to {} as {}", ip, user);
        self.connector
            .shell(&RemoteTarget::new(user, ip, pair.private))
            .open()
            .map_err(DevBoxError::at(Phase::Connect, started))
    }

    /// The VM must be listed; a stopped or suspended one is started, any
    /// other state is left alone
    fn ensure_running(&self) -> Result<(), BoxError> {
        let record = self
            .driver
            .list()?
            .into_iter()
            .find(|r| r.name == self.name)
            .ok_or_else(|| DriverError::NotFound(self.name.clone()))?;
        if record.state.is_resumable() {
            info!("Starting {} ({})", self.name, record.state);
            self.driver.start(&self.name)?;
        }
        Ok(())
    }

    pub fn start(&self) -> Result<(), DevBoxError> {
        self.lifecycle("started", |driver, name| driver.start(name))
    }

    pub fn stop(&self) -> Result<(), DevBoxError> {
        self.lifecycle("stopped", |driver, name| driver.stop(name))
    }

    pub fn delete(&self) -> Result<(), DevBoxError> {
        self.lifecycle("deleted", |driver, name| driver.delete(name))
    }

    fn lifecycle<F>(&self, action: &'static str, op: F) -> Result<(), DevBoxError>
    where
        F: FnOnce(&dyn HardwareDriver, &str) -> Result<(), DriverError>,
    {
        let started = Instant::now();
        op(self.driver.as_ref(), &self.name).map_err(DevBoxError::at(Phase::Lifecycle, started))?;
        self.observer.on_event(&Event::Lifecycle {
            name: self.name.clone(),
            action,
            elapsed: started.elapsed(),
        });
        Ok(())
    }
}
