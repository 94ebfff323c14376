use std::path::PathBuf;

use clap::Args;
use releasetx_plan::{DryRunStep, Plan};

use super::{Completion, collect_vars, parse_var};
use crate::error::Result;
use crate::output::plan_listing;

#[derive(Args)]
pub(crate) struct CheckArgs {
    /// Path to the release plan
    plan: PathBuf,

    /// Variable the plan will be run with (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    vars: Vec<(String, String)>,
}

pub(super) fn run(args: CheckArgs) -> Result<Completion> {
    let plan = Plan::load(&args.plan)?;
    plan.check_placeholders(&collect_vars(args.vars)?)?;

    let steps: Vec<DryRunStep> = plan
        .steps()
        .iter()
        .map(|step| DryRunStep {
            label: step.label().to_string(),
            run: step.run.clone(),
            compensation: step.compensation(),
            confirm: step.confirm.clone(),
        })
        .collect();

    print!("{}", plan_listing(&steps));
    println!(
        "plan '{}' is valid: {} step(s)",
        plan.path().display(),
        steps.len()
    );
    Ok(Completion::Success)
}
