use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, instrument};

use crate::{
    error::BoxError,
    exec::{Args, Execute},
    remote::{FileTransfer, RemoteTarget},
};

/// Fragments of scp's stderr meaning the VM could not be reached at all
const CONNECTION_FAILURES: &[&str] = &[
    "Connection refused",
    "Connection timed out",
    "No route to host",
    "Could not resolve hostname",
    "Permission denied (publickey",
    "Host key verification failed",
];

#[derive(Debug)]
pub struct ScpSession {
    target: RemoteTarget,
    binary: PathBuf,
    executor: Arc<dyn Execute>,
}

impl ScpSession {
    pub fn new(target: RemoteTarget, executor: Arc<dyn Execute>) -> ScpSession {
        ScpSession {
            target,
            binary: PathBuf::from("scp"),
            executor,
        }
    }
}

impl FileTransfer for ScpSession {
    #[instrument(skip(self), fields(host = %self.target.ip))]
    fn copy(&self, src: &Path, dest: &str) -> Result<(), BoxError> {
        if src.is_dir() {
            return Err(BoxError::DirectoryCopy(src.to_path_buf()));
        }
        if !src.is_file() {
            return Err(BoxError::Transfer {
                src: src.to_path_buf(),
                dest: dest.to_string(),
                reason: "source does not exist".to_string(),
            });
        }

        debug!("Copying {} to {}", src.display(), dest);
        let args = self.target.concat_args(&[
            "-q".to_string(),
            src.display().to_string(),
            format!("{}:{}", self.target.destination(), dest),
        ]);
        let output = self.executor.output(&self.binary, &args, None)?;
        if output.success() {
            return Ok(());
        }

        let reason = output.combined();
        if CONNECTION_FAILURES.iter().any(|f| reason.contains(f)) {
            return Err(BoxError::Connection {
                host: self.target.ip.clone(),
                reason,
            });
        }
        Err(BoxError::Transfer {
            src: src.to_path_buf(),
            dest: dest.to_string(),
            reason,
        })
    }
}
