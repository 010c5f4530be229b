//! # Remote sessions
//!
//! Sessions against the VM are opened through a [RemoteConnector], which
//! hands out a [RemoteShell] (interactive shell, remote commands) or a
//! [FileTransfer] for a given [RemoteTarget]. All of them authenticate with
//! the keypair managed by [crate::keys::KeyStore].
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    error::BoxError,
    exec::{Args, Execute, ProcessExecutor},
    scp::ScpSession,
    ssh::SshSession,
};

/// Seconds before an unreachable VM is reported as a connection failure
const CONNECT_TIMEOUT: u32 = 10;

/// Who to connect as, where, and with which private key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteTarget {
    pub user: String,
    pub ip: String,
    pub identity: PathBuf,
}

impl RemoteTarget {
    pub fn new(user: impl Into<String>, ip: impl Into<String>, identity: impl Into<PathBuf>) -> Self {
        RemoteTarget {
            user: user.into(),
            ip: ip.into(),
            identity: identity.into(),
        }
    }

    /// `user@ip`
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.ip)
    }
}

impl Args for RemoteTarget {
    /// Options shared by `ssh` and `scp`. New host keys are accepted and
    /// remembered, changed ones are still refused.
    fn args(&self) -> Vec<String> {
        vec![
            "-i".to_string(),
            self.identity.display().to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", CONNECT_TIMEOUT),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
        ]
    }
}

/// Exit status of a remote command. A non-zero status is not an error of
/// the session itself; callers decide what it means.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemoteExit {
    pub code: Option<i32>,
}

impl RemoteExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait RemoteShell: fmt::Debug {
    /// Interactive login shell, returns once the operator exits
    fn open(&self) -> Result<(), BoxError>;
    /// Run `command` with a pseudo-terminal, streaming its output
    fn run(&self, command: &str) -> Result<RemoteExit, BoxError>;
}

pub trait FileTransfer: fmt::Debug {
    /// Copy a single local file to `dest` on the VM. Directories are refused.
    fn copy(&self, src: &Path, dest: &str) -> Result<(), BoxError>;
}

pub trait RemoteConnector: fmt::Debug {
    fn shell(&self, target: &RemoteTarget) -> Box<dyn RemoteShell>;
    fn transfer(&self, target: &RemoteTarget) -> Box<dyn FileTransfer>;
}

/// Connector using the local OpenSSH client binaries
#[derive(Debug, Clone)]
pub struct SshConnector {
    executor: Arc<dyn Execute>,
}

impl SshConnector {
    pub fn new(executor: Arc<dyn Execute>) -> SshConnector {
        SshConnector { executor }
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        SshConnector::new(Arc::new(ProcessExecutor))
    }
}

impl RemoteConnector for SshConnector {
    fn shell(&self, target: &RemoteTarget) -> Box<dyn RemoteShell> {
        Box::new(SshSession::new(target.clone(), self.executor.clone()))
    }

    fn transfer(&self, target: &RemoteTarget) -> Box<dyn FileTransfer> {
        Box::new(ScpSession::new(target.clone(), self.executor.clone()))
    }
}
