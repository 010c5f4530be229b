use std::{path::PathBuf, sync::Arc};

use tracing::{debug, instrument};

use crate::{
    error::BoxError,
    exec::{Args, Execute},
    remote::{RemoteExit, RemoteShell, RemoteTarget},
};

/// Status `ssh` reserves for its own failures (unreachable host, refused
/// authentication...), as opposed to the remote command's status
const SSH_FAILURE: i32 = 255;

#[derive(Debug)]
pub struct SshSession {
    target: RemoteTarget,
    binary: PathBuf,
    executor: Arc<dyn Execute>,
}

impl SshSession {
    pub fn new(target: RemoteTarget, executor: Arc<dyn Execute>) -> SshSession {
        SshSession {
            target,
            binary: PathBuf::from("ssh"),
            executor,
        }
    }

    fn check(&self, code: Option<i32>) -> Result<RemoteExit, BoxError> {
        if code == Some(SSH_FAILURE) {
            return Err(BoxError::Connection {
                host: self.target.ip.clone(),
                reason: format!("ssh as {} exited with status {}", self.target.user, SSH_FAILURE),
            });
        }
        Ok(RemoteExit { code })
    }
}

impl RemoteShell for SshSession {
    #[instrument(skip(self), fields(host = %self.target.ip, user = %self.target.user))]
    fn open(&self) -> Result<(), BoxError> {
        let args = self.target.concat_args(&[self.target.destination()]);
        let code = self.executor.interactive(&self.binary, &args)?;
        let exit = self.check(code)?;
        debug!("Interactive session closed with {:?}", exit.code);
        Ok(())
    }

    #[instrument(skip(self), fields(host = %self.target.ip, user = %self.target.user))]
    fn run(&self, command: &str) -> Result<RemoteExit, BoxError> {
        // `-t -t` forces a tty even though stdin may not be one
        let args = self.target.concat_args(&[
            "-t".to_string(),
            "-t".to_string(),
            self.target.destination(),
            command.to_string(),
        ]);
        let code = self.executor.interactive(&self.binary, &args)?;
        self.check(code)
    }
}
