//! Release plans: TOML files describing the steps of a release, executed as
//! a single compensating transaction.

mod error;
mod interaction;
mod model;
mod plan;
mod prompt;
mod release;
mod template;
mod validate;

pub use error::{PlanError, Result};
pub use interaction::{AssumeYes, InteractionProvider};
pub use plan::{DEFAULT_LOG_FILE, DEFAULT_SHELL, Plan, PlannedStep};
pub use prompt::{Prompt, ask_prompts};
pub use release::{DryRunStep, ReleaseOperation, dry_run};
pub use template::{Vars, placeholders, render, render_text, secret_env_name};
pub use validate::{Validator, captured_token};
