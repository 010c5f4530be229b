//! # Subprocess execution
//!
//! Every external collaborator (the hypervisor CLI, `ssh`, `scp`,
//! `ssh-keygen`) is driven as a child process. The [Execute] trait is the
//! single seam through which those processes are spawned, so that higher
//! level components can be exercised against a scripted implementation.
//!
//! Two flavours of execution exist:
//!
//! - [Execute::output] captures stdout/stderr and optionally feeds a payload
//!   through stdin (used for `multipass launch --cloud-init -`).
//! - [Execute::interactive] inherits the terminal so output is streamed to the
//!   operator as it is produced (used for `ssh`).
use std::{
    fmt,
    io::Write,
    path::Path,
    process::{Command, Stdio},
};

use tracing::{debug, trace};

#[derive(thiserror::Error, Debug)]
pub enum ExecuteError {
    #[error("Could not spawn {0}, reason: {1}")]
    Spawn(String, String),
    #[error("Could not write to stdin of {0}, reason: {1}")]
    Stdin(String, String),
    #[error("Could not wait for {0} to terminate, reason: {1}")]
    Wait(String, String),
}

/// Captured result of a finished process
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout and stderr joined, the way an operator would have seen them
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (true, _) => self.stderr.trim().to_string(),
            (false, true) => self.stdout.trim().to_string(),
            (false, false) => format!("{}\n{}", self.stdout.trim(), self.stderr.trim()),
        }
    }
}

/// Interface to spawn a binary and collect what it did
pub trait Execute: fmt::Debug {
    /// Run `program` to completion with piped output, optionally writing
    /// `stdin` to it first
    fn output(
        &self,
        program: &Path,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput, ExecuteError>;

    /// Run `program` attached to the current terminal and return its exit
    /// code once it terminates
    fn interactive(&self, program: &Path, args: &[String]) -> Result<Option<i32>, ExecuteError>;
}

/// Arguments every invocation of a given tool starts with
pub trait Args {
    fn args(&self) -> Vec<String>;

    fn concat_args(&self, args: &[String]) -> Vec<String> {
        let mut combined = self.args();
        combined.extend(args.iter().cloned());
        combined
    }
}

/// [Execute] implementation backed by [std::process::Command]
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl Execute for ProcessExecutor {
    fn output(
        &self,
        program: &Path,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput, ExecuteError> {
        let name = program.display().to_string();
        debug!("{} {}", name, args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecuteError::Spawn(name.clone(), e.to_string()))?;

        if let Some(payload) = stdin {
            trace!("Writing {} bytes to stdin of {}", payload.len(), name);
            // Dropping the handle closes the pipe so the child sees EOF
            let mut pipe = child
                .stdin
                .take()
                .ok_or_else(|| ExecuteError::Stdin(name.clone(), "stdin not piped".to_string()))?;
            pipe.write_all(payload)
                .map_err(|e| ExecuteError::Stdin(name.clone(), e.to_string()))?;
        }

        let result = child
            .wait_with_output()
            .map_err(|e| ExecuteError::Wait(name.clone(), e.to_string()))?;

        let output = CommandOutput {
            code: result.status.code(),
            stdout: String::from_utf8_lossy(&result.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
        };
        trace!("{} exited with {:?}", name, output.code);
        Ok(output)
    }

    fn interactive(&self, program: &Path, args: &[String]) -> Result<Option<i32>, ExecuteError> {
        let name = program.display().to_string();
        debug!("{} {}", name, args.join(" "));

        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| ExecuteError::Spawn(name.clone(), e.to_string()))?;

        trace!("{} exited with {:?}", name, status.code());
        Ok(status.code())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{Args, CommandOutput, Execute, ProcessExecutor};

    struct Fixed;

    impl Args for Fixed {
        fn args(&self) -> Vec<String> {
            vec!["-q".to_string()]
        }
    }

    #[test]
    fn concat_args_keeps_base_first() {
        let args = Fixed.concat_args(&["a".to_string(), "b".to_string()]);
        assert_eq!(args, vec!["-q", "a", "b"]);
    }

    #[test]
    fn combined_output_prefers_non_empty_streams() {
        let output = CommandOutput {
            code: Some(1),
            stdout: String::new(),
            stderr: "boom\n".to_string(),
        };
        assert_eq!(output.combined(), "boom");
        assert!(!output.success());

        let output = CommandOutput {
            code: Some(0),
            stdout: "out".to_string(),
            stderr: "err".to_string(),
        };
        assert_eq!(output.combined(), "out\nerr");
    }

    #[cfg(unix)]
    #[test]
    fn process_executor_pipes_stdin() {
        let output = ProcessExecutor
            .output(Path::new("/bin/cat"), &[], Some(b"hello"))
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "hello");
    }

    #[test]
    fn process_executor_reports_missing_binary() {
        let result = ProcessExecutor.output(Path::new("/randomdir/not-a-binary"), &[], None);
        assert!(result.is_err());
    }
}
