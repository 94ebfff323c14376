//! Integration tests for rollback behavior over real shell commands.

use std::fs;
use std::path::Path;

use releasetx_saga::{
    FailureCause, OutputEcho, ShellRunner, Step, Transaction, TransactionError,
};
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
fn successful_steps_commit_without_running_compensations() {
    let dir = TempDir::new().expect("create temp dir");

    let report = Transaction::run(runner_in(&dir), |tx| {
        for i in 1..=4 {
            tx.execute(Step::compensable(
                record(&format!("do-{i}")),
                record(&format!("undo-{i}")),
            ))?;
        }
        Ok(())
    });

    assert!(report.is_committed());
    assert_eq!(journal(dir.path()), ["do-1", "do-2", "do-3", "do-4"]);
}

#[test]
fn failing_step_compensates_earlier_steps_in_reverse() {
    let dir = TempDir::new().expect("create temp dir");

    let report = Transaction::run(runner_in(&dir), |tx| {
        tx.execute(Step::compensable(record("do-1"), record("undo-1")))?;
        tx.execute(Step::compensable(record("do-2"), record("undo-2")))?;
        tx.execute(Step::compensable(
            format!("{}; exit 4", record("do-3")),
            record("undo-3"),
        ))?;
        tx.execute(Step::compensable(record("do-4"), record("undo-4")))?;
        Ok(())
    });

    assert!(!report.is_committed());
    assert_eq!(
        journal(dir.path()),
        ["do-1", "do-2", "do-3", "undo-2", "undo-1"]
    );
    match report.outcome.cause() {
        Some(FailureCause::CommandFailed { code, .. }) => assert_eq!(*code, Some(4)),
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}

#[test]
fn pure_steps_are_never_compensated() {
    let dir = TempDir::new().expect("create temp dir");

    let report = Transaction::run(runner_in(&dir), |tx| {
        tx.execute(Step::pure(record("check-1")))?;
        tx.execute(Step::compensable(record("do-1"), record("undo-1")))?;
        tx.execute(Step::pure(record("check-2")))?;
        tx.execute(Step::irreversible("exit 1"))?;
        Ok(())
    });

    assert!(!report.is_committed());
    assert_eq!(
        journal(dir.path()),
        ["check-1", "do-1", "check-2", "undo-1"]
    );
    let rollback = report.outcome.rollback_report().expect("rolled back");
    assert_eq!(rollback.skipped_pure, 2);
}

#[test]
fn abort_compensates_in_reverse_skipping_pure_step() {
    let dir = TempDir::new().expect("create temp dir");

    let report = Transaction::run(runner_in(&dir), |tx| {
        tx.execute(Step::compensable(record("A"), record("a")))?;
        tx.execute(Step::pure(record("B")))?;
        tx.execute(Step::compensable(record("C"), record("c")))?;
        Err(TransactionError::abort("version not confirmed"))
    });

    assert!(!report.is_committed());
    assert_eq!(journal(dir.path()), ["A", "B", "C", "c", "a"]);
}

#[test]
fn invalid_step_is_rejected_before_running() {
    let dir = TempDir::new().expect("create temp dir");

    let report = Transaction::run(runner_in(&dir), |tx| {
        tx.execute(Step::compensable(record("do-1"), record("undo-1")))?;
        tx.execute_with(&record("x"), Some(&record("y")), true, true)?;
        Ok(())
    });

    assert!(!report.is_committed());
    assert_eq!(journal(dir.path()), ["do-1", "undo-1"]);
}

#[test]
fn unchecked_step_lets_the_caller_inspect_the_status() {
    let dir = TempDir::new().expect("create temp dir");

    let report = Transaction::run(runner_in(&dir), |tx| {
        tx.execute(Step::compensable(record("build"), record("clean")))?;
        let smoke = tx.execute(Step::pure("exit 77").unchecked())?;
        if smoke.code != Some(77) {
            return Err(TransactionError::abort("unexpected smoke test status"));
        }
        Ok(())
    });

    assert!(report.is_committed());
    assert_eq!(journal(dir.path()), ["build"]);
}

#[test]
fn captured_stdout_is_available_to_later_steps() {
    let dir = TempDir::new().expect("create temp dir");

    let report = Transaction::run(runner_in(&dir), |tx| {
        let bump = tx.execute(Step::compensable(
            "echo Bumping version from 1.2.2 to 1.2.3",
            "true",
        ))?;
        let version = bump
            .stdout
            .split_whitespace()
            .last()
            .ok_or_else(|| TransactionError::abort("no version printed"))?
            .to_string();
        tx.execute(Step::compensable(
            record(&format!("tag-v{version}")),
            record(&format!("untag-v{version}")),
        ))?;
        Ok(())
    });

    assert!(report.is_committed());
    assert_eq!(journal(dir.path()), ["tag-v1.2.3"]);
}
