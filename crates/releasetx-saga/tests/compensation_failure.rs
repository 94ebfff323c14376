//! Integration tests for compensation failure scenarios.

use std::fs;
use std::path::Path;

use releasetx_saga::{OutputEcho, ShellRunner, Step, StepStatus, Transaction, TransactionError};
use tempfile::TempDir;

fn runner_in(dir: &TempDir) -> ShellRunner {
    ShellRunner::new()
        .with_working_dir(dir.path())
        .with_echo(OutputEcho::Silent)
}

fn record(name: &str) -> String {
    format!("echo {name} >> journal.txt")
}

fn journal(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("journal.txt"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn failing_compensations_do_not_stop_the_unwind() {
    let dir = TempDir::new().expect("create temp dir");

    let report = Transaction::run(runner_in(&dir), |tx| {
        for i in 1..=5 {
            let undo = if i == 3 || i == 5 {
                format!("{}; exit 1", record(&format!("undo-{i}")))
            } else {
                record(&format!("undo-{i}"))
            };
            tx.execute(Step::compensable(record(&format!("do-{i}")), undo))?;
        }
        Err(TransactionError::abort("trigger rollback"))
    });

    assert!(!report.is_committed());
    assert_eq!(
        journal(dir.path()),
        [
            "do-1", "do-2", "do-3", "do-4", "do-5", "undo-5", "undo-4", "undo-3", "undo-2",
            "undo-1"
        ]
    );

    let rollback = report.outcome.rollback_report().expect("rolled back");
    assert_eq!(rollback.attempted, 5);
    assert_eq!(rollback.failed, 2);
    assert_eq!(rollback.compensated, 3);
    assert!(!rollback.is_complete());
}

#[test]
fn missing_compensation_is_not_a_compensation_failure() {
    let dir = TempDir::new().expect("create temp dir");

    let report = Transaction::run(runner_in(&dir), |tx| {
        tx.execute(Step::compensable(record("commit"), record("reset")))?;
        tx.execute(Step::irreversible(record("publish")))?;
        tx.execute(Step::irreversible("exit 2"))?;
        Ok(())
    });

    let rollback = report.outcome.rollback_report().expect("rolled back");
    assert_eq!(rollback.failed, 0);
    assert_eq!(rollback.missing.len(), 1);
    assert_eq!(rollback.missing[0], record("publish"));
    assert_eq!(journal(dir.path()), ["commit", "publish", "reset"]);

    let statuses: Vec<StepStatus> = report.audit.records().iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        [
            StepStatus::Compensated,
            StepStatus::MissingCompensation,
            StepStatus::Failed
        ]
    );
}

#[test]
fn compensation_that_cannot_start_counts_as_failure() {
    let dir = TempDir::new().expect("create temp dir");
    let missing_dir = dir.path().join("gone");
    fs::create_dir(&missing_dir).expect("create dir");

    // The working directory disappears after the first step, so every later
    // spawn (including the compensation) fails.
    let runner = ShellRunner::new()
        .with_working_dir(&missing_dir)
        .with_echo(OutputEcho::Silent);

    let report = Transaction::run(runner, |tx| {
        tx.execute(Step::compensable("rmdir ../gone", "true"))?;
        tx.execute(Step::pure("true"))?;
        Ok(())
    });

    assert!(!report.is_committed());
    let rollback = report.outcome.rollback_report().expect("rolled back");
    assert_eq!(rollback.attempted, 1);
    assert_eq!(rollback.failed, 1);
}
