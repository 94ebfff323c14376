use std::fmt::Write as _;

use releasetx_plan::DryRunStep;
use releasetx_saga::{Compensation, Outcome, TransactionReport};

pub(crate) fn plan_listing(steps: &[DryRunStep]) -> String {
    let mut out = String::new();
    for (index, step) in steps.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", index + 1, step.label);
        if step.label != step.run {
            let _ = writeln!(out, "   run:      {}", step.run);
        }
        let _ = writeln!(out, "   rollback: {}", compensation(&step.compensation));
        if let Some(prompt) = &step.confirm {
            let _ = writeln!(out, "   confirm:  {prompt}");
        }
    }
    out
}

fn compensation(compensation: &Compensation) -> &str {
    match compensation {
        Compensation::Command(command) => command,
        Compensation::Pure => "(pure, nothing to undo)",
        Compensation::Missing => "(none, cannot be undone)",
    }
}

pub(crate) fn outcome_message(report: &TransactionReport) -> String {
    match &report.outcome {
        Outcome::Committed => "release committed".to_string(),
        Outcome::RolledBack { cause, report: rollback } => {
            let mut out = format!("release rolled back: {cause}");
            if rollback.failed > 0 {
                let _ = write!(out, "\n{} compensation(s) failed", rollback.failed);
            }
            for command in &rollback.missing {
                let _ = write!(out, "\nnot undone (no rollback): {command}");
            }
            out
        }
    }
}
