use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read plan at '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse plan at '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("plan at '{path}' has no steps")]
    Empty { path: PathBuf },

    #[error("step '{step}' is pure and cannot declare a rollback")]
    PureWithRollback { step: String },

    #[error(transparent)]
    Step(#[from] releasetx_saga::TransactionError),

    #[error("step '{step}' sets both 'expect-status' and 'check = true'")]
    ConflictingCheck { step: String },

    #[error("step '{step}' sets 'validate' without 'capture'")]
    ValidateWithoutCapture { step: String },

    #[error("invalid variable name '{name}'")]
    InvalidVariableName { name: String },

    #[error("variable '{name}' is defined more than once")]
    DuplicateVariable { name: String },

    #[error("value of '{name}' cannot be passed to the shell")]
    Unquotable { name: String },

    #[error("unknown variable '{name}' in '{template}'")]
    UnknownVariable { name: String, template: String },

    #[error("step '{step}' printed nothing to capture into '{variable}'")]
    NothingCaptured { step: String, variable: String },

    #[error("not a valid semver: {value}")]
    InvalidSemver {
        value: String,
        #[source]
        source: semver::Error,
    },

    #[error("confirmation requires an interactive terminal (pass --yes to skip prompts)")]
    NotInteractive,

    #[error("'{name}' must be entered in a terminal (or pass --var {name}=VALUE)")]
    PromptRequiresTerminal { name: String },

    #[error("failed to read answer from the terminal")]
    Interaction(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PlanError>;
