use semver::Version;
use serde::Deserialize;

use crate::error::{PlanError, Result};

/// Check applied to a value captured from a step's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Validator {
    /// A semantic version such as `1.4.0-rc.1+build.5`, without a `v` prefix.
    Semver,
}

impl Validator {
    /// # Errors
    ///
    /// Returns an error describing why `value` is rejected.
    pub fn check(self, value: &str) -> Result<()> {
        match self {
            Self::Semver => Version::parse(value)
                .map(|_| ())
                .map_err(|source| PlanError::InvalidSemver {
                    value: value.to_string(),
                    source,
                }),
        }
    }
}

/// The value a `capture` stores: the last whitespace-separated token of stdout.
#[must_use]
pub fn captured_token(stdout: &str) -> Option<&str> {
    stdout.split_whitespace().last()
}
