use crate::error::{Result, TransactionError};

/// How a step is undone if the transaction rolls back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Run this command to undo the step.
    Command(String),
    /// The step has side effects but nothing can undo them automatically.
    Missing,
    /// The step has no observable side effect.
    Pure,
}

/// A command to execute inside a transaction, together with its compensation.
///
/// The typed constructors make a pure step with a rollback unrepresentable.
/// [`Step::from_parts`] accepts the loose form and rejects that combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    commit: String,
    compensation: Compensation,
    check: bool,
}

impl Step {
    /// A side-effecting step undone by running `rollback`.
    #[must_use]
    pub fn compensable(commit: impl Into<String>, rollback: impl Into<String>) -> Self {
        Self::new(commit, Compensation::Command(rollback.into()))
    }

    /// A side-effecting step with no automatic compensation.
    #[must_use]
    pub fn irreversible(commit: impl Into<String>) -> Self {
        Self::new(commit, Compensation::Missing)
    }

    /// A read-only step that never needs compensation.
    #[must_use]
    pub fn pure(commit: impl Into<String>) -> Self {
        Self::new(commit, Compensation::Pure)
    }

    /// Build a step from a `(commit, rollback, pure)` triple.
    ///
    /// An empty rollback string counts as no rollback.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::Configuration`] if `pure` is set together
    /// with a rollback command.
    pub fn from_parts(
        commit: impl Into<String>,
        rollback: Option<&str>,
        pure: bool,
    ) -> Result<Self> {
        let commit = commit.into();
        let rollback = rollback.filter(|r| !r.is_empty());

        let compensation = match (pure, rollback) {
            (true, Some(_)) => return Err(TransactionError::Configuration { commit }),
            (true, None) => Compensation::Pure,
            (false, Some(rollback)) => Compensation::Command(rollback.to_string()),
            (false, None) => Compensation::Missing,
        };

        Ok(Self::new(commit, compensation))
    }

    fn new(commit: impl Into<String>, compensation: Compensation) -> Self {
        Self {
            commit: commit.into(),
            compensation,
            check: true,
        }
    }

    /// Return the execution result even when the command exits non-zero.
    #[must_use]
    pub fn unchecked(mut self) -> Self {
        self.check = false;
        self
    }

    #[must_use]
    pub fn commit(&self) -> &str {
        &self.commit
    }

    #[must_use]
    pub fn compensation(&self) -> &Compensation {
        &self.compensation
    }

    #[must_use]
    pub fn check(&self) -> bool {
        self.check
    }

    pub(crate) fn into_record(self, sequence: usize) -> StepRecord {
        StepRecord {
            sequence,
            commit: self.commit,
            compensation: self.compensation,
        }
    }
}

/// An executed step, as kept in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    sequence: usize,
    commit: String,
    compensation: Compensation,
}

impl StepRecord {
    /// Zero-based position of the step among all `execute` calls of its
    /// transaction, failed attempts included.
    #[must_use]
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    /// The command that was run.
    #[must_use]
    pub fn commit(&self) -> &str {
        &self.commit
    }

    /// The command that undoes this step, if any.
    #[must_use]
    pub fn rollback(&self) -> Option<&str> {
        match &self.compensation {
            Compensation::Command(command) => Some(command),
            Compensation::Missing | Compensation::Pure => None,
        }
    }

    #[must_use]
    pub fn is_pure(&self) -> bool {
        self.compensation == Compensation::Pure
    }

    #[must_use]
    pub fn compensation(&self) -> &Compensation {
        &self.compensation
    }
}
