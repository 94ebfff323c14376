use indexmap::IndexMap;
use serde::Deserialize;

use crate::validate::Validator;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlanFile {
    #[serde(default)]
    pub(crate) settings: SettingsSection,
    #[serde(default)]
    pub(crate) vars: IndexMap<String, String>,
    #[serde(default)]
    pub(crate) prompts: IndexMap<String, PromptSection>,
    #[serde(default, rename = "step")]
    pub(crate) steps: Vec<StepSection>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub(crate) struct SettingsSection {
    pub(crate) shell: Option<String>,
    pub(crate) log_file: Option<String>,
    pub(crate) working_dir: Option<String>,
}

/// A variable asked from the operator before any step runs.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub(crate) struct PromptSection {
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) secret: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub(crate) struct StepSection {
    pub(crate) name: Option<String>,
    pub(crate) run: String,
    pub(crate) rollback: Option<String>,
    #[serde(default)]
    pub(crate) pure: bool,
    pub(crate) check: Option<bool>,
    pub(crate) expect_status: Option<i32>,
    pub(crate) capture: Option<String>,
    pub(crate) validate: Option<Validator>,
    pub(crate) confirm: Option<String>,
}
