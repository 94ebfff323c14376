use std::fmt;

use thiserror::Error;

/// Error raised while executing a step inside a transaction.
///
/// Every variant is recoverable at the transaction boundary: when it escapes
/// the body of [`Transaction::run`](crate::Transaction::run) it triggers a
/// rollback and is returned as part of the outcome instead of propagating.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransactionError {
    /// The step declared a rollback even though it is marked pure.
    #[error("invalid step '{commit}': a pure step cannot declare a rollback")]
    Configuration {
        /// The command the caller tried to run.
        commit: String,
    },

    /// The command exited unsuccessfully while its status was being checked.
    #[error("command '{command}' exited with {}", DisplayCode(*.code))]
    CommandFailed {
        /// The command text as executed.
        command: String,
        /// Exit code, or `None` when the process was killed by a signal.
        code: Option<i32>,
        /// Interleaved stdout/stderr captured before the process exited.
        output: String,
    },

    /// The caller decided the transaction must not proceed.
    #[error("transaction aborted: {reason}")]
    Aborted {
        /// Human-readable reason for the abort.
        reason: String,
    },

    /// The command could not be started or waited on.
    #[error("failed to execute command '{command}'")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Any other failure raised by the caller inside the transaction body.
    #[error(transparent)]
    Unexpected(Box<dyn std::error::Error + Send + Sync>),
}

impl TransactionError {
    /// Build an abort signal carrying `reason`.
    #[must_use]
    pub fn abort(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    /// Wrap an arbitrary error as an unexpected failure.
    #[must_use]
    pub fn unexpected<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Unexpected(error.into())
    }
}

/// Why a transaction was rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FailureCause {
    /// A checked step exited unsuccessfully.
    CommandFailed { command: String, code: Option<i32> },
    /// The caller requested an abort.
    Aborted { reason: String },
    /// Anything else: configuration mistakes, spawn failures, caller errors,
    /// panics, or a transaction dropped while still open.
    Unexpected { message: String },
}

impl FailureCause {
    pub(crate) fn from_error(error: &TransactionError) -> Self {
        match error {
            TransactionError::CommandFailed { command, code, .. } => Self::CommandFailed {
                command: command.clone(),
                code: *code,
            },
            TransactionError::Aborted { reason } => Self::Aborted {
                reason: reason.clone(),
            },
            other => Self::Unexpected {
                message: error_chain(other),
            },
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandFailed { command, code } => {
                write!(f, "command '{command}' exited with {}", DisplayCode(*code))
            }
            Self::Aborted { reason } => write!(f, "aborted: {reason}"),
            Self::Unexpected { message } => write!(f, "unexpected failure: {message}"),
        }
    }
}

/// Render an error followed by its `caused by` chain on one line.
pub(crate) fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

pub(crate) struct DisplayCode(pub(crate) Option<i32>);

impl fmt::Display for DisplayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "status {code}"),
            None => f.write_str("no status (terminated by signal)"),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransactionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_message_includes_command_and_code() {
        let err = TransactionError::CommandFailed {
            command: "git push".to_string(),
            code: Some(128),
            output: String::new(),
        };

        let msg = err.to_string();

        assert!(msg.contains("git push"));
        assert!(msg.contains("status 128"));
    }

    #[test]
    fn command_failed_without_code_mentions_signal() {
        let err = TransactionError::CommandFailed {
            command: "sleep 100".to_string(),
            code: None,
            output: String::new(),
        };

        assert!(err.to_string().contains("signal"));
    }

    #[test]
    fn abort_helper_builds_aborted_variant() {
        let err = TransactionError::abort("user declined");

        assert!(matches!(err, TransactionError::Aborted { ref reason } if reason == "user declined"));
        assert_eq!(err.to_string(), "transaction aborted: user declined");
    }

    #[test]
    fn cause_classifies_command_failure() {
        let err = TransactionError::CommandFailed {
            command: "false".to_string(),
            code: Some(1),
            output: String::new(),
        };

        let cause = FailureCause::from_error(&err);

        assert_eq!(
            cause,
            FailureCause::CommandFailed {
                command: "false".to_string(),
                code: Some(1),
            }
        );
    }

    #[test]
    fn cause_flattens_source_chain_for_unexpected_errors() {
        let err = TransactionError::Spawn {
            command: "missing-binary".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };

        let cause = FailureCause::from_error(&err);

        match cause {
            FailureCause::Unexpected { message } => {
                assert!(message.contains("missing-binary"));
                assert!(message.contains("no such file"));
            }
            other => panic!("expected Unexpected, got {other:?}"),
        }
    }

    #[test]
    fn configuration_error_is_unexpected_when_it_reaches_the_scope() {
        let err = TransactionError::Configuration {
            commit: "x".to_string(),
        };

        assert!(matches!(
            FailureCause::from_error(&err),
            FailureCause::Unexpected { .. }
        ));
    }
}
