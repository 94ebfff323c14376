mod check;
mod run;

use clap::Subcommand;
use releasetx_plan::Vars;

use crate::error::Result;

pub(crate) use check::CheckArgs;
pub(crate) use run::RunArgs;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run a release plan, rolling back every completed step if one fails
    Run(RunArgs),
    /// Validate a release plan and list its steps without running them
    Check(CheckArgs),
}

/// How a successfully dispatched command ended.
pub(crate) enum Completion {
    Success,
    RolledBack,
}

impl Commands {
    pub(crate) fn execute(self, verbose: bool) -> Result<Completion> {
        match self {
            Self::Run(args) => run::run(args, verbose),
            Self::Check(args) => check::run(args),
        }
    }
}

fn parse_var(arg: &str) -> std::result::Result<(String, String), String> {
    arg.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{arg}'"))
}

fn collect_vars(pairs: Vec<(String, String)>) -> Result<Vars> {
    let mut vars = Vars::new();
    for (name, value) in pairs {
        vars.insert(name, value)?;
    }
    Ok(vars)
}
