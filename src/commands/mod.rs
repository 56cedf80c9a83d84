//! Typed command lines for the container runtime and the remote host.
//!
//! A [`Command`] is an ordered token sequence whose first token is the
//! program. Tokens are emitted exactly as the runtime's CLI grammar expects
//! them, including shell syntax such as `2>&1` or `$PWD` that must reach the
//! shell unquoted. User-supplied text that must stay literal (log filter
//! terms, option values) is quoted by the builders before it becomes a token.
//!
//! A [`Pipeline`] chains one or more commands with `|`.
//!
//! ```rust
//! use berth::commands::Command;
//!
//! let logs = Command::docker().args(["logs", "redis", "2>&1"]);
//! let pipeline = logs.piped(Command::new("grep").arg("'ERROR'"));
//! assert_eq!(pipeline.to_string(), "docker logs redis 2>&1 | grep 'ERROR'");
//! ```

pub mod accessory;
pub mod proxy;
pub mod shell;

use std::fmt;

pub use accessory::{AccessoryCommands, LogsOptions};
pub use proxy::ProxyCommands;
pub use shell::{shell_escape, shell_quote};

/// Ordered token sequence for a single program invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    tokens: Vec<String>,
}

impl Command {
    /// Start a command for `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            tokens: vec![program.into()],
        }
    }

    /// Start a container runtime command.
    pub fn docker() -> Self {
        Self::new("docker")
    }

    /// Append one token.
    pub fn arg(mut self, token: impl Into<String>) -> Self {
        self.tokens.push(token.into());
        self
    }

    /// Append tokens in order.
    pub fn args<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Append `token` only when `condition` holds.
    pub fn arg_if(self, condition: bool, token: impl Into<String>) -> Self {
        if condition { self.arg(token) } else { self }
    }

    /// Append `flag value` when `value` is present, nothing otherwise.
    pub fn flag_value<V: fmt::Display>(self, flag: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.arg(flag).arg(value.to_string()),
            None => self,
        }
    }

    /// The program (first token).
    pub fn program(&self) -> &str {
        &self.tokens[0]
    }

    /// All tokens, program included.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Whether any token equals `token`.
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Pipe this command's output into `next`.
    pub fn piped(self, next: Command) -> Pipeline {
        Pipeline {
            stages: vec![self, next],
        }
    }

    /// Pipe into `next` when present, otherwise a single-stage pipeline.
    pub fn pipe_opt(self, next: Option<Command>) -> Pipeline {
        match next {
            Some(next) => self.piped(next),
            None => Pipeline::from(self),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

/// One or more commands joined by pipes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pipeline {
    stages: Vec<Command>,
}

impl Pipeline {
    /// All stages in order; never empty.
    pub fn stages(&self) -> &[Command] {
        &self.stages
    }

    /// The stage producing the output.
    pub fn head(&self) -> &Command {
        &self.stages[0]
    }

    /// The filter stage, when the pipeline has one.
    pub fn filter(&self) -> Option<&Command> {
        self.stages.get(1)
    }

    /// Append another stage.
    pub fn piped(mut self, next: Command) -> Pipeline {
        self.stages.push(next);
        self
    }

    /// Whether this pipeline is a single command.
    pub fn is_single(&self) -> bool {
        self.stages.len() == 1
    }
}

impl From<Command> for Pipeline {
    fn from(command: Command) -> Self {
        Self {
            stages: vec![command],
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}
