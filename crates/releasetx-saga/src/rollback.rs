use tracing::{debug, error, info, warn};

use crate::audit::AuditLog;
use crate::engine::CommandRunner;
use crate::error::{DisplayCode, error_chain};
use crate::ledger::Ledger;
use crate::step::Compensation;

/// Tally of one rollback pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    /// Compensation commands that were run.
    pub attempted: usize,
    /// Compensation commands that succeeded.
    pub compensated: usize,
    /// Compensation commands that exited non-zero or could not be run.
    pub failed: usize,
    /// Pure steps that needed nothing.
    pub skipped_pure: usize,
    /// Side-effecting steps that had no compensation, most recent first.
    pub missing: Vec<String>,
}

impl RollbackReport {
    /// Whether every side effect was undone.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.missing.is_empty()
    }
}

/// Drain `ledger` from the most recent step back, running every compensation.
///
/// A failing compensation never stops the pass: older steps are often the
/// ones whose side effects matter most.
pub(crate) fn roll_back<R>(runner: &R, ledger: &mut Ledger, audit: &mut AuditLog) -> RollbackReport
where
    R: CommandRunner + ?Sized,
{
    info!("rolling back transaction...");
    debug!("{} step(s) in the ledger", ledger.len());
    let mut report = RollbackReport::default();

    while let Some(record) = ledger.pop() {
        let sequence = record.sequence();
        let commit = record.commit();

        match record.compensation() {
            Compensation::Pure => {
                info!("command '{commit}' is pure, no rollback needed");
                report.skipped_pure += 1;
                audit.record_skipped(sequence);
            }
            Compensation::Missing => {
                error!("command '{commit}' has no rollback");
                report.missing.push(commit.to_string());
                audit.record_missing_compensation(sequence);
            }
            Compensation::Command(rollback) => {
                report.attempted += 1;
                info!("rolling back command '{commit}'...");

                match runner.run(rollback, false) {
                    Ok(result) if result.success() => {
                        info!("rollback of command '{commit}' succeeded");
                        report.compensated += 1;
                        audit.record_compensated(sequence);
                    }
                    Ok(result) => {
                        error!(
                            "rollback of command '{commit}' failed: '{rollback}' exited with {}",
                            DisplayCode(result.code)
                        );
                        report.failed += 1;
                        audit.record_compensation_failed(sequence);
                    }
                    Err(e) => {
                        error!(
                            error = %error_chain(&e),
                            "rollback of command '{commit}' failed: could not run '{rollback}'"
                        );
                        report.failed += 1;
                        audit.record_compensation_failed(sequence);
                    }
                }
            }
        }
    }

    info!(
        attempted = report.attempted,
        failed = report.failed,
        "transaction rolled back"
    );
    if report.failed > 0 {
        error!("but failed to roll back {} command(s)", report.failed);
    }
    if !report.missing.is_empty() {
        warn!(
            "{} command(s) had no rollback and may need manual cleanup",
            report.missing.len()
        );
    }

    report
}
