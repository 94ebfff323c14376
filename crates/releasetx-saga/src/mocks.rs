use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::engine::{CommandRunner, ExecutionResult};
use crate::error::{Result, TransactionError};

/// Records every command it is asked to run and answers from a script.
///
/// Commands without a scripted exit code succeed with empty output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    exit_codes: HashMap<String, i32>,
    stdout: HashMap<String, String>,
    spawn_failures: HashSet<String>,
    invoked: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn exit_code(mut self, command: &str, code: i32) -> Self {
        self.exit_codes.insert(command.to_string(), code);
        self
    }

    #[must_use]
    pub fn stdout(mut self, command: &str, output: &str) -> Self {
        self.stdout.insert(command.to_string(), output.to_string());
        self
    }

    #[must_use]
    pub fn spawn_failure(mut self, command: &str) -> Self {
        self.spawn_failures.insert(command.to_string());
        self
    }

    /// # Panics
    ///
    /// Panics if the invocation log mutex is poisoned.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.invoked.lock().expect("invocation log poisoned").clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &str, check: bool) -> Result<ExecutionResult> {
        self.invoked
            .lock()
            .expect("invocation log poisoned")
            .push(command.to_string());

        if self.spawn_failures.contains(command) {
            return Err(TransactionError::Spawn {
                command: command.to_string(),
                source: std::io::Error::other("scripted spawn failure"),
            });
        }

        let stdout = self.stdout.get(command).cloned().unwrap_or_default();
        let result = ExecutionResult {
            code: Some(self.exit_codes.get(command).copied().unwrap_or(0)),
            output: stdout.clone(),
            stdout,
            stderr: String::new(),
        };

        if check && !result.success() {
            return Err(TransactionError::CommandFailed {
                command: command.to_string(),
                code: result.code,
                output: result.output,
            });
        }

        Ok(result)
    }
}
