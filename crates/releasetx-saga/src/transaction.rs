use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, info, warn};

use crate::audit::AuditLog;
use crate::engine::{CommandRunner, ExecutionResult};
use crate::error::{DisplayCode, FailureCause, Result, TransactionError, error_chain};
use crate::ledger::Ledger;
use crate::rollback::{RollbackReport, roll_back};
use crate::step::Step;

/// Lifecycle of a transaction. Leaves `Open` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

/// Terminal result of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every step ran and the side effects stand.
    Committed,
    /// Something went wrong and the executed steps were compensated.
    RolledBack {
        /// What triggered the rollback.
        cause: FailureCause,
        /// What the rollback pass managed to undo.
        report: RollbackReport,
    },
}

impl Outcome {
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }

    #[must_use]
    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            Self::Committed => None,
            Self::RolledBack { cause, .. } => Some(cause),
        }
    }

    #[must_use]
    pub fn rollback_report(&self) -> Option<&RollbackReport> {
        match self {
            Self::Committed => None,
            Self::RolledBack { report, .. } => Some(report),
        }
    }
}

/// Outcome of a finished transaction together with its audit trail.
#[derive(Debug)]
pub struct TransactionReport {
    pub outcome: Outcome,
    pub audit: AuditLog,
}

impl TransactionReport {
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.outcome.is_committed()
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        if self.outcome.is_committed() {
            TransactionState::Committed
        } else {
            TransactionState::RolledBack
        }
    }
}

/// A unit of work over external commands.
///
/// Each successful [`execute`](Self::execute) appends the step to the ledger.
/// When the transaction ends with a failure, every ledger entry is
/// compensated in reverse order. A transaction dropped while still open rolls
/// back.
///
/// # Example
///
/// ```no_run
/// use releasetx_saga::{ShellRunner, Step, Transaction, TransactionError};
///
/// let report = Transaction::run(ShellRunner::new(), |tx| {
///     tx.execute(Step::pure("git diff --quiet"))?;
///     tx.execute(Step::compensable("git tag v1.0.0", "git tag -d v1.0.0"))?;
///     let status = tx.execute(Step::pure("./smoke-test").unchecked())?;
///     if status.code != Some(0) {
///         return Err(TransactionError::abort("smoke test failed"));
///     }
///     tx.execute(Step::irreversible("git push --follow-tags"))?;
///     Ok(())
/// });
///
/// std::process::exit(i32::from(!report.is_committed()));
/// ```
pub struct Transaction<R: CommandRunner> {
    runner: R,
    ledger: Ledger,
    audit: AuditLog,
    state: TransactionState,
}

impl<R: CommandRunner> Transaction<R> {
    /// Open a new transaction with an empty ledger.
    #[must_use]
    pub fn begin(runner: R) -> Self {
        Self {
            runner,
            ledger: Ledger::new(),
            audit: AuditLog::new(),
            state: TransactionState::Open,
        }
    }

    /// Open a transaction, run `body` in it and finalize it exactly once.
    ///
    /// Returning `Ok(())` commits. Returning an error or panicking rolls
    /// back; the error or panic is logged and reported in the outcome, never
    /// propagated.
    pub fn run<F>(runner: R, body: F) -> TransactionReport
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let mut tx = Self::begin(runner);
        let result = panic::catch_unwind(AssertUnwindSafe(|| body(&mut tx)));

        match result {
            Ok(Ok(())) => tx.commit(),
            Ok(Err(e)) => tx.fail(e),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("transaction body panicked: {message}");
                tx.finish_rolled_back(FailureCause::Unexpected {
                    message: format!("panic: {message}"),
                })
            }
        }
    }

    /// Run a step now and record it for compensation.
    ///
    /// # Errors
    ///
    /// Returns the engine's error when the step cannot be run or, if the step
    /// is checked, exits unsuccessfully. A failed step is never recorded in
    /// the ledger.
    pub fn execute(&mut self, step: Step) -> Result<ExecutionResult> {
        let sequence = self.audit.record_start(step.commit());

        match self.runner.run(step.commit(), step.check()) {
            Ok(result) => {
                let record = step.into_record(sequence);
                debug!(
                    sequence,
                    compensation = ?record.compensation(),
                    "recorded step for compensation"
                );
                self.audit.record_success(sequence, record.rollback());
                self.ledger.push(record);
                Ok(result)
            }
            Err(e) => {
                self.audit.record_failure(sequence);
                Err(e)
            }
        }
    }

    /// Run a step described by a loose `(commit, rollback, pure)` triple.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::Configuration`] without running anything
    /// if `pure` is combined with a rollback, otherwise as [`execute`](Self::execute).
    pub fn execute_with(
        &mut self,
        commit: &str,
        rollback: Option<&str>,
        pure: bool,
        check: bool,
    ) -> Result<ExecutionResult> {
        let step = Step::from_parts(commit, rollback, pure)?;
        let step = if check { step } else { step.unchecked() };
        self.execute(step)
    }

    /// Finish successfully, keeping every side effect.
    pub fn commit(mut self) -> TransactionReport {
        debug!("committing with {} step(s) in the ledger", self.ledger.len());
        self.ledger.clear();
        self.state = TransactionState::Committed;
        info!("transaction committed");
        self.into_report(Outcome::Committed)
    }

    /// Finish because of `error`, compensating every executed step.
    pub fn fail(self, error: TransactionError) -> TransactionReport {
        let cause = FailureCause::from_error(&error);
        log_trigger(&error);
        self.finish_rolled_back(cause)
    }

    fn finish_rolled_back(mut self, cause: FailureCause) -> TransactionReport {
        let report = self.roll_back_open();
        self.into_report(Outcome::RolledBack { cause, report })
    }

    fn roll_back_open(&mut self) -> RollbackReport {
        let report = roll_back(&self.runner, &mut self.ledger, &mut self.audit);
        self.state = TransactionState::RolledBack;
        report
    }

    fn into_report(mut self, outcome: Outcome) -> TransactionReport {
        TransactionReport {
            outcome,
            audit: std::mem::take(&mut self.audit),
        }
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// `None` while open, then whether the transaction committed.
    #[must_use]
    pub fn committed(&self) -> Option<bool> {
        match self.state {
            TransactionState::Open => None,
            TransactionState::Committed => Some(true),
            TransactionState::RolledBack => Some(false),
        }
    }

    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    #[must_use]
    pub fn runner(&self) -> &R {
        &self.runner
    }
}

impl<R: CommandRunner> Drop for Transaction<R> {
    fn drop(&mut self) {
        if self.state == TransactionState::Open {
            warn!("transaction dropped while open");
            self.roll_back_open();
        }
    }
}

fn log_trigger(error: &TransactionError) {
    match error {
        TransactionError::CommandFailed { command, code, .. } => {
            warn!("command '{command}' exited with {}", DisplayCode(*code));
        }
        TransactionError::Aborted { reason } => {
            warn!("rollback requested: {reason}");
        }
        other => {
            error!(detail = ?other, "unexpected failure: {}", error_chain(other));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("non-string panic payload")
    }
}
