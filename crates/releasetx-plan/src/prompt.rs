//! Variables asked from the operator before the transaction opens.

use tracing::{debug, info};

use crate::error::Result;
use crate::interaction::InteractionProvider;
use crate::plan::Plan;
use crate::template::Vars;

/// An entry of the plan's `[prompts]` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub name: String,
    pub message: String,
    /// Input is hidden and the value never reaches a command line or a log.
    pub secret: bool,
}

/// Ask every prompt of `plan` that `overrides` does not already answer.
///
/// Returns `overrides` extended with the answers. A secret prompt answered
/// by an override still has its value treated as secret.
///
/// # Errors
///
/// Returns the provider's error for the first prompt that cannot be asked.
pub fn ask_prompts<I: InteractionProvider>(
    plan: &Plan,
    overrides: &Vars,
    interaction: &I,
) -> Result<Vars> {
    let mut vars = overrides.clone();

    for prompt in plan.prompts() {
        if let Some(value) = overrides.get(&prompt.name) {
            debug!("'{}' given on the command line, not prompting", prompt.name);
            if prompt.secret {
                vars.insert_secret(prompt.name.clone(), value)?;
            }
            continue;
        }

        let value = interaction.ask(prompt)?;
        if prompt.secret {
            info!("read secret '{}'", prompt.name);
            vars.insert_secret(prompt.name.clone(), value)?;
        } else {
            info!("read {} = {value}", prompt.name);
            vars.insert(prompt.name.clone(), value)?;
        }
    }
    Ok(vars)
}
