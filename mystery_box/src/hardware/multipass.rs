//! Multipass backend, driven through its command-line interface.
use std::{path::PathBuf, sync::Arc};

use mystery_box_models::models::{InfoReport, ListEntry, ListReport, VmRecord};
use tracing::{debug, error, info, instrument, trace};

use crate::{
    exec::Execute,
    hardware::{DriverError, HardwareDriver, LaunchRequest},
};

#[derive(Debug)]
pub struct Multipass {
    /// Path to the multipass binary
    binary: PathBuf,
    executor: Arc<dyn Execute>,
}

impl Multipass {
    pub fn new(binary: PathBuf, executor: Arc<dyn Execute>) -> Multipass {
        Multipass { binary, executor }
    }

    /// Run a multipass subcommand and return its stdout, classifying any
    /// failure
    fn command(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<String, DriverError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let output = self.executor.output(&self.binary, &args, stdin)?;

        if !output.success() {
            let command = format!("multipass {}", args.first().map(String::as_str).unwrap_or(""));
            let combined = output.combined();
            error!("{} failed: {}", command, combined);
            return Err(DriverError::classify(&command, &combined));
        }

        trace!("multipass output: {}", output.stdout);
        Ok(output.stdout)
    }
}

impl HardwareDriver for Multipass {
    #[instrument(skip(self))]
    fn list(&self) -> Result<Vec<VmRecord>, DriverError> {
        let stdout = self.command(&["list", "--format", "json"], None)?;
        let report: ListReport = serde_json::from_str(&stdout)?;
        Ok(report.list.iter().map(ListEntry::to_record).collect())
    }

    #[instrument(skip(self))]
    fn info(&self, name: &str) -> Result<Option<VmRecord>, DriverError> {
        let Some(listed) = self.list()?.into_iter().find(|r| r.name == name) else {
            debug!("{} is not listed", name);
            return Ok(None);
        };

        let stdout = self.command(&["info", name, "--format", "json"], None)?;
        let report: InfoReport = serde_json::from_str(&stdout)?;

        if let Some(reported) = report.errors.first() {
            let message = match reported {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Err(DriverError::Reported(message));
        }

        let record = report
            .info
            .get(name)
            .map(|instance| instance.to_record(name))
            .unwrap_or(listed);
        debug!("{} is {} at {:?}", name, record.state, record.ipv4);
        Ok(Some(record))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    fn launch(&self, request: &LaunchRequest) -> Result<(), DriverError> {
        info!(
            "Launching {} ({} memory, {} disk, image {})",
            request.name, request.memory, request.disk, request.image
        );
        self.command(
            &[
                "launch",
                "-n",
                &request.name,
                "--cloud-init",
                "-",
                "-d",
                &request.disk,
                "-m",
                &request.memory,
                &request.image,
            ],
            Some(request.cloud_init.as_bytes()),
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn stop(&self, name: &str) -> Result<(), DriverError> {
        self.command(&["stop", name], None)?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn start(&self, name: &str) -> Result<(), DriverError> {
        self.command(&["start", name], None)?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn delete(&self, name: &str) -> Result<(), DriverError> {
        self.command(&["delete", "--purge", name], None)?;
        Ok(())
    }
}
