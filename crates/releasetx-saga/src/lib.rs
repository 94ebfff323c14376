//! Compensating transactions over external commands.
//!
//! A [`Transaction`] runs shell commands one at a time and remembers each
//! successful step together with the command that undoes it. If the
//! transaction fails or is aborted, the recorded steps are compensated in
//! reverse order; a failing compensation is reported and the unwind carries
//! on with the older steps.

mod audit;
mod engine;
mod error;
mod ledger;
mod rollback;
mod step;
mod transaction;

#[cfg(test)]
mod mocks;

pub use audit::{AuditLog, AuditRecord, StepStatus};
pub use engine::{CommandRunner, ExecutionResult, OUTPUT_TARGET, OutputEcho, ShellRunner};
pub use error::{FailureCause, Result, TransactionError};
pub use ledger::Ledger;
pub use rollback::RollbackReport;
pub use step::{Compensation, Step, StepRecord};
pub use transaction::{Outcome, Transaction, TransactionReport, TransactionState};
