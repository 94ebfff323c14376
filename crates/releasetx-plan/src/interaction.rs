use crate::Result;
use crate::error::PlanError;
use crate::prompt::Prompt;

/// Questions the release may ask the operator.
pub trait InteractionProvider {
    /// Returns `true` to continue and `false` to abort the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the question cannot be asked.
    fn confirm(&self, prompt: &str) -> Result<bool>;

    /// Ask for the value of a plan variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the question cannot be asked.
    fn ask(&self, prompt: &Prompt) -> Result<String>;
}

/// Approves every confirmation without asking. Cannot answer prompts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl InteractionProvider for AssumeYes {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }

    fn ask(&self, prompt: &Prompt) -> Result<String> {
        Err(PlanError::PromptRequiresTerminal {
            name: prompt.name.clone(),
        })
    }
}

impl<I: InteractionProvider + ?Sized> InteractionProvider for &I {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        (**self).confirm(prompt)
    }

    fn ask(&self, prompt: &Prompt) -> Result<String> {
        (**self).ask(prompt)
    }
}
