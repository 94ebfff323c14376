use std::io::IsTerminal;

use dialoguer::{Confirm, Input, Password};
use releasetx_plan::{InteractionProvider, PlanError, Prompt, Result};
use tracing::info;

/// Asks on the terminal. `--yes` answers confirmations, never prompts.
pub struct TerminalInteraction {
    assume_yes: bool,
}

impl TerminalInteraction {
    #[must_use]
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl InteractionProvider for TerminalInteraction {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        if self.assume_yes {
            info!("assuming yes: {prompt}");
            return Ok(true);
        }
        if !is_interactive() {
            return Err(PlanError::NotInteractive);
        }

        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(dialoguer_to_plan_error)
    }

    fn ask(&self, prompt: &Prompt) -> Result<String> {
        if !is_interactive() {
            return Err(PlanError::PromptRequiresTerminal {
                name: prompt.name.clone(),
            });
        }

        if prompt.secret {
            Password::new()
                .with_prompt(&prompt.message)
                .interact()
                .map_err(dialoguer_to_plan_error)
        } else {
            Input::<String>::new()
                .with_prompt(&prompt.message)
                .interact_text()
                .map_err(dialoguer_to_plan_error)
        }
    }
}

fn dialoguer_to_plan_error(error: dialoguer::Error) -> PlanError {
    match error {
        dialoguer::Error::IO(io_err) => PlanError::Interaction(io_err),
    }
}

fn is_interactive() -> bool {
    std::io::stdin().is_terminal()
}
