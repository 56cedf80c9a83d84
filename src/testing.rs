//! Test doubles for command execution.
//!
//! Provides:
//! - [`RecordingRunner`]: a [`CommandRunner`] that records every dispatch
//!   instead of spawning processes
//! - [`RecordedCall`]: one recorded dispatch
//!
//! # Usage
//!
//! ```rust
//! use berth::testing::{RecordedCall, RecordingRunner};
//! use berth::runner::CommandRunner;
//! use berth::commands::Command;
//!
//! # tokio_test::block_on(async {
//! let runner = RecordingRunner::new();
//! runner.execute(&Command::docker().arg("ps").into()).await.unwrap();
//! assert_eq!(runner.calls(), vec![RecordedCall::Direct("docker ps".into())]);
//! # });
//! ```

use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::commands::Pipeline;
use crate::error::ExecutionError;
use crate::runner::{CommandRunner, ExecOutput};

/// One dispatch seen by [`RecordingRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    /// Rendered pipeline sent through `execute`.
    Direct(String),
    /// Rendered pipeline sent through `execute_over_remote_shell`.
    RemoteShell { host: String, command: String },
}

/// Records calls and answers with a configurable exit code.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<RecordedCall>>,
    exit_code: AtomicI32,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every later call with `code`.
    pub fn set_exit_code(&self, code: i32) {
        self.exit_code.store(code, Ordering::Relaxed);
    }

    /// Calls recorded so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, call: RecordedCall) -> ExecOutput {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
        ExecOutput {
            exit_code: self.exit_code.load(Ordering::Relaxed),
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
        }
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn execute(&self, command: &Pipeline) -> Result<ExecOutput, ExecutionError> {
        Ok(self.record(RecordedCall::Direct(command.to_string())))
    }

    async fn execute_over_remote_shell(
        &self,
        command: &Pipeline,
        host: &str,
    ) -> Result<ExecOutput, ExecutionError> {
        Ok(self.record(RecordedCall::RemoteShell {
            host: host.to_string(),
            command: command.to_string(),
        }))
    }
}
