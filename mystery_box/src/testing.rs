//! Scripted stand-ins for the process boundary
use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::exec::{CommandOutput, Execute, ExecuteError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Call {
    pub(crate) program: PathBuf,
    pub(crate) args: Vec<String>,
    pub(crate) stdin: Option<String>,
    pub(crate) interactive: bool,
}

impl Call {
    pub(crate) fn line(&self) -> String {
        self.args.join(" ")
    }
}

/// Replays queued outputs in order; an exhausted queue answers with a
/// successful, empty output
#[derive(Debug, Default)]
pub(crate) struct ScriptedExecutor {
    outputs: Mutex<VecDeque<CommandOutput>>,
    codes: Mutex<VecDeque<Option<i32>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedExecutor {
    pub(crate) fn new() -> ScriptedExecutor {
        ScriptedExecutor::default()
    }

    pub(crate) fn respond(self, code: i32, stdout: &str, stderr: &str) -> ScriptedExecutor {
        self.outputs.lock().unwrap().push_back(CommandOutput {
            code: Some(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        });
        self
    }

    pub(crate) fn exit(self, code: i32) -> ScriptedExecutor {
        self.codes.lock().unwrap().push_back(Some(code));
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl Execute for ScriptedExecutor {
    fn output(
        &self,
        program: &Path,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput, ExecuteError> {
        self.calls.lock().unwrap().push(Call {
            program: program.to_path_buf(),
            args: args.to_vec(),
            stdin: stdin.map(|s| String::from_utf8_lossy(s).into_owned()),
            interactive: false,
        });
        let next = self.outputs.lock().unwrap().pop_front();
        Ok(next.unwrap_or(CommandOutput {
            code: Some(0),
            ..CommandOutput::default()
        }))
    }

    fn interactive(&self, program: &Path, args: &[String]) -> Result<Option<i32>, ExecuteError> {
        self.calls.lock().unwrap().push(Call {
            program: program.to_path_buf(),
            args: args.to_vec(),
            stdin: None,
            interactive: true,
        });
        let next = self.codes.lock().unwrap().pop_front();
        Ok(next.unwrap_or(Some(0)))
    }
}
