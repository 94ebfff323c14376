//! Running a [`Plan`] as one compensating transaction.

use releasetx_saga::{
    CommandRunner, Compensation, ExecutionResult, Transaction, TransactionError,
    TransactionReport,
};
use tracing::{debug, info, warn};

use crate::error::PlanError;
use crate::interaction::InteractionProvider;
use crate::plan::{Plan, PlannedStep};
use crate::template::{Mode, Vars, expand, render_text};
use crate::validate::captured_token;

/// A step with its commands rendered as far as they can be before running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRunStep {
    pub label: String,
    pub run: String,
    pub compensation: Compensation,
    pub confirm: Option<String>,
}

pub struct ReleaseOperation<'a, I> {
    plan: &'a Plan,
    interaction: I,
}

impl<'a, I: InteractionProvider> ReleaseOperation<'a, I> {
    #[must_use]
    pub fn new(plan: &'a Plan, interaction: I) -> Self {
        Self { plan, interaction }
    }

    /// Run every step of the plan, rolling back on the first failure.
    ///
    /// `overrides` take precedence over the plan's `[vars]`; values captured
    /// while running take precedence over both. Prompts must already be
    /// answered in `overrides` (see [`ask_prompts`](crate::ask_prompts)), and
    /// `runner` must export its secrets (see [`Plan::runner`]).
    #[must_use]
    pub fn execute<R: CommandRunner>(&self, runner: R, overrides: &Vars) -> TransactionReport {
        let mut vars = self.plan.vars().clone();
        vars.extend(overrides);
        let total = self.plan.steps().len();

        info!(
            "running {total} step(s) from '{}'",
            self.plan.path().display()
        );

        Transaction::run(runner, |tx| {
            for (index, planned) in self.plan.steps().iter().enumerate() {
                info!("step {}/{total}: {}", index + 1, planned.label());
                self.run_step(tx, planned, &mut vars)?;
            }
            Ok(())
        })
    }

    fn run_step<R: CommandRunner>(
        &self,
        tx: &mut Transaction<R>,
        planned: &PlannedStep,
        vars: &mut Vars,
    ) -> releasetx_saga::Result<()> {
        let step = planned.to_step(vars).map_err(TransactionError::unexpected)?;
        debug!("rendered '{}' as '{}'", planned.run, step.commit());
        let result = tx.execute(step)?;

        if let Some(expected) = planned.expect_status {
            check_status(planned, &result, expected)?;
        }

        if let Some(name) = &planned.capture {
            let value = captured_token(&result.stdout)
                .ok_or_else(|| {
                    TransactionError::unexpected(PlanError::NothingCaptured {
                        step: planned.label().to_string(),
                        variable: name.clone(),
                    })
                })?
                .to_string();
            if let Some(validator) = planned.validate {
                validator
                    .check(&value)
                    .map_err(|e| TransactionError::abort(e.to_string()))?;
            }
            info!("captured {name} = {value}");
            vars.insert(name.clone(), value)
                .map_err(TransactionError::unexpected)?;
        }

        if let Some(prompt) = &planned.confirm {
            let prompt = render_text(prompt, vars).map_err(TransactionError::unexpected)?;
            match self.interaction.confirm(&prompt) {
                Ok(true) => info!("confirmed: {prompt}"),
                Ok(false) => {
                    warn!("declined: {prompt}");
                    return Err(TransactionError::abort(format!("user declined: {prompt}")));
                }
                Err(e) => return Err(TransactionError::unexpected(e)),
            }
        }

        Ok(())
    }
}

fn check_status(
    planned: &PlannedStep,
    result: &ExecutionResult,
    expected: i32,
) -> releasetx_saga::Result<()> {
    if result.code == Some(expected) {
        return Ok(());
    }
    let got = result
        .code
        .map_or_else(|| "no status".to_string(), |code| format!("status {code}"));
    Err(TransactionError::abort(format!(
        "step '{}' exited with {got} instead of {expected}",
        planned.label()
    )))
}

/// Render the plan for display without running anything.
///
/// Values that would only be known after a step captures them, or after a
/// prompt is answered, are shown as their `{name}` placeholder.
///
/// # Errors
///
/// Returns [`PlanError::UnknownVariable`] if a placeholder could never be
/// resolved.
pub fn dry_run(plan: &Plan, overrides: &Vars) -> crate::Result<Vec<DryRunStep>> {
    let mut known = plan.vars().clone();
    known.extend(overrides);
    for prompt in plan.prompts().iter().filter(|prompt| prompt.secret) {
        if let Some(value) = overrides.get(&prompt.name) {
            known.insert_secret(prompt.name.clone(), value)?;
        }
    }
    let mut pending: Vec<String> = plan
        .prompts()
        .iter()
        .filter(|prompt| !known.contains(&prompt.name))
        .map(|prompt| prompt.name.clone())
        .collect();

    let mut steps = Vec::with_capacity(plan.steps().len());
    for planned in plan.steps() {
        let run = expand(&planned.run, &known, Mode::Command, &pending)?;
        let compensation = match planned.compensation() {
            Compensation::Command(rollback) => {
                Compensation::Command(expand(&rollback, &known, Mode::Command, &pending)?)
            }
            other => other,
        };
        if let Some(name) = &planned.capture {
            pending.push(name.clone());
        }
        let confirm = planned
            .confirm
            .as_deref()
            .map(|prompt| expand(prompt, &known, Mode::Display, &pending))
            .transpose()?;

        steps.push(DryRunStep {
            label: planned.label().to_string(),
            run,
            compensation,
            confirm,
        });
    }
    Ok(steps)
}
