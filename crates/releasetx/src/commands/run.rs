use std::path::PathBuf;

use clap::{Args, ValueEnum};
use releasetx_plan::{Plan, ReleaseOperation, ask_prompts, dry_run};
use releasetx_saga::OutputEcho;

use super::{Completion, collect_vars, parse_var};
use crate::error::Result;
use crate::interaction::TerminalInteraction;
use crate::logging;
use crate::output::{outcome_message, plan_listing};

#[derive(Args)]
pub(crate) struct RunArgs {
    /// Path to the release plan
    plan: PathBuf,

    /// Set a plan variable, overriding `[vars]` (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// Answer yes to every confirmation (prompted variables still need --var)
    #[arg(long, short = 'y')]
    yes: bool,

    /// Print the rendered steps without running them
    #[arg(long)]
    dry_run: bool,

    /// Append the log to this file instead of the plan's log file
    #[arg(long, conflicts_with = "no_log_file")]
    log_file: Option<PathBuf>,

    /// Do not write a log file
    #[arg(long)]
    no_log_file: bool,

    /// Where command output goes while it is captured
    #[arg(long, value_enum, default_value_t = EchoMode::Log)]
    echo: EchoMode,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum EchoMode {
    /// Pass output straight through to the terminal
    Inherit,
    /// Pass output through and also append it to the log file
    Log,
    /// Keep output captured only
    Silent,
}

impl From<EchoMode> for OutputEcho {
    fn from(mode: EchoMode) -> Self {
        match mode {
            EchoMode::Inherit => Self::Inherit,
            EchoMode::Log => Self::Log,
            EchoMode::Silent => Self::Silent,
        }
    }
}

pub(super) fn run(args: RunArgs, verbose: bool) -> Result<Completion> {
    let plan = Plan::load(&args.plan)?;
    let overrides = collect_vars(args.vars)?;
    plan.check_placeholders(&overrides)?;

    if args.dry_run {
        print!("{}", plan_listing(&dry_run(&plan, &overrides)?));
        return Ok(Completion::Success);
    }

    let log_file = if args.no_log_file {
        None
    } else {
        Some(args.log_file.unwrap_or_else(|| plan.log_file().to_path_buf()))
    };
    logging::init(verbose, log_file.as_deref())?;

    let interaction = TerminalInteraction::new(args.yes);
    let vars = ask_prompts(&plan, &overrides, &interaction)?;
    let runner = plan.runner(&vars).with_echo(args.echo.into());

    let report = ReleaseOperation::new(&plan, &interaction).execute(runner, &vars);

    eprintln!("{}", report.audit.summary());
    eprintln!("{}", outcome_message(&report));

    Ok(if report.is_committed() {
        Completion::Success
    } else {
        Completion::RolledBack
    })
}
