use std::fs;
use std::path::{Path, PathBuf};

use releasetx_saga::{Compensation, ShellRunner, Step};
use tracing::debug;

use crate::error::{PlanError, Result};
use crate::model::{PlanFile, StepSection};
use crate::prompt::Prompt;
use crate::template::{Vars, placeholders, render};
use crate::validate::Validator;

pub const DEFAULT_LOG_FILE: &str = ".release.log";
pub const DEFAULT_SHELL: &str = "sh";

/// A validated release plan.
#[derive(Debug, Clone)]
pub struct Plan {
    path: PathBuf,
    shell: String,
    log_file: PathBuf,
    working_dir: PathBuf,
    vars: Vars,
    prompts: Vec<Prompt>,
    steps: Vec<PlannedStep>,
}

/// One step of a plan, with its command templates still unrendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub name: Option<String>,
    pub run: String,
    pub rollback: Option<String>,
    pub pure: bool,
    pub check: bool,
    pub expect_status: Option<i32>,
    pub capture: Option<String>,
    pub validate: Option<Validator>,
    pub confirm: Option<String>,
}

impl PlannedStep {
    /// The step's name, or its command when unnamed.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.run)
    }

    /// Render the command templates and build the executable step.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::UnknownVariable`] when a template references a
    /// variable that has no value yet, and [`PlanError::Step`] for a pure
    /// step carrying a rollback.
    pub fn to_step(&self, vars: &Vars) -> Result<Step> {
        let run = render(&self.run, vars)?;
        let rollback = self
            .rollback
            .as_deref()
            .map(|r| render(r, vars))
            .transpose()?;
        let step = Step::from_parts(run, rollback.as_deref(), self.pure)?;
        Ok(if self.check { step } else { step.unchecked() })
    }

    /// How the step is undone, for display.
    #[must_use]
    pub fn compensation(&self) -> Compensation {
        match (&self.rollback, self.pure) {
            (Some(rollback), _) => Compensation::Command(rollback.clone()),
            (None, true) => Compensation::Pure,
            (None, false) => Compensation::Missing,
        }
    }

    fn from_section(section: StepSection) -> Result<Self> {
        let label = section.name.clone().unwrap_or_else(|| section.run.clone());
        let rollback = section.rollback.filter(|r| !r.is_empty());

        if section.pure && rollback.is_some() {
            return Err(PlanError::PureWithRollback { step: label });
        }
        if section.expect_status.is_some() && section.check == Some(true) {
            return Err(PlanError::ConflictingCheck { step: label });
        }
        if section.validate.is_some() && section.capture.is_none() {
            return Err(PlanError::ValidateWithoutCapture { step: label });
        }
        if let Some(name) = &section.capture {
            if !crate::template::is_variable_name(name) {
                return Err(PlanError::InvalidVariableName { name: name.clone() });
            }
        }

        let check = section
            .check
            .unwrap_or(section.expect_status.is_none());

        Ok(Self {
            name: section.name,
            run: section.run,
            rollback,
            pure: section.pure,
            check,
            expect_status: section.expect_status,
            capture: section.capture,
            validate: section.validate,
            confirm: section.confirm,
        })
    }
}

impl Plan {
    /// Read and validate the plan at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a valid plan, or
    /// declares an invalid step.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| PlanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse plan `content` as if it was read from `path`.
    ///
    /// Relative paths in `[settings]` resolve against the directory of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not a valid plan.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let file: PlanFile = toml::from_str(content).map_err(|source| PlanError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if file.steps.is_empty() {
            return Err(PlanError::Empty {
                path: path.to_path_buf(),
            });
        }

        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        let mut vars = Vars::new();
        for (name, value) in file.vars {
            vars.insert(name, value)?;
        }

        let mut prompts = Vec::with_capacity(file.prompts.len());
        for (name, section) in file.prompts {
            if !crate::template::is_variable_name(&name) {
                return Err(PlanError::InvalidVariableName { name });
            }
            if vars.contains(&name) {
                return Err(PlanError::DuplicateVariable { name });
            }
            prompts.push(Prompt {
                name,
                message: section.message,
                secret: section.secret,
            });
        }

        let steps = file
            .steps
            .into_iter()
            .map(PlannedStep::from_section)
            .collect::<Result<Vec<_>>>()?;

        if let Some(name) = steps
            .iter()
            .filter_map(|step| step.capture.as_ref())
            .find(|name| prompts.iter().any(|p| &p.name == *name))
        {
            return Err(PlanError::DuplicateVariable { name: name.clone() });
        }

        let working_dir = file
            .settings
            .working_dir
            .map_or_else(|| base_dir.clone(), |dir| base_dir.join(dir));
        let log_file = base_dir.join(
            file.settings
                .log_file
                .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
        );

        debug!(
            "loaded plan '{}': {} step(s), {} prompt(s)",
            path.display(),
            steps.len(),
            prompts.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            shell: file
                .settings
                .shell
                .unwrap_or_else(|| DEFAULT_SHELL.to_string()),
            log_file,
            working_dir,
            vars,
            prompts,
            steps,
        })
    }

    /// Check that every placeholder can be resolved when the plan runs with
    /// `overrides` and the values captured along the way.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::UnknownVariable`] for the first placeholder that
    /// would have no value.
    pub fn check_placeholders(&self, overrides: &Vars) -> Result<()> {
        let mut known = self.vars.clone();
        known.extend(overrides);
        for prompt in &self.prompts {
            if !known.contains(&prompt.name) {
                known.insert(prompt.name.clone(), String::new())?;
            }
        }

        for step in &self.steps {
            let commands = std::iter::once(step.run.as_str()).chain(step.rollback.as_deref());
            ensure_known(commands, &known)?;
            if let Some(name) = &step.capture {
                known.insert(name.clone(), String::new())?;
            }
            // The prompt is shown after the capture, so it may use the new value.
            ensure_known(step.confirm.as_deref(), &known)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn shell(&self) -> &str {
        &self.shell
    }

    #[must_use]
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Variables declared in the plan's `[vars]` table.
    #[must_use]
    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    #[must_use]
    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    #[must_use]
    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    /// A runner using the plan's shell and working directory that exports
    /// every secret in `vars`.
    #[must_use]
    pub fn runner(&self, vars: &Vars) -> ShellRunner {
        vars.secret_env().fold(
            ShellRunner::new()
                .with_shell(&self.shell)
                .with_working_dir(&self.working_dir),
            |runner, (key, value)| runner.with_env(key, value),
        )
    }
}

fn ensure_known<'a>(templates: impl IntoIterator<Item = &'a str>, known: &Vars) -> Result<()> {
    for template in templates {
        if let Some(name) = placeholders(template)
            .into_iter()
            .find(|name| !known.contains(name))
        {
            return Err(PlanError::UnknownVariable {
                name: name.to_string(),
                template: template.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Plan> {
        Plan::parse(content, Path::new("/repo/release.toml"))
    }

    #[test]
    fn parses_steps_in_order_with_defaults() -> anyhow::Result<()> {
        let plan = parse(
            r#"
[[step]]
run = "git diff --quiet"
pure = true

[[step]]
name = "tag"
run = "git tag v1"
rollback = "git tag -d v1"

[[step]]
run = "git push"
"#,
        )?;

        assert_eq!(plan.steps().len(), 3);
        assert_eq!(plan.shell(), "sh");
        assert_eq!(plan.log_file(), Path::new("/repo/.release.log"));
        assert_eq!(plan.working_dir(), Path::new("/repo"));
        assert_eq!(plan.steps()[0].compensation(), Compensation::Pure);
        assert_eq!(plan.steps()[1].label(), "tag");
        assert_eq!(
            plan.steps()[1].compensation(),
            Compensation::Command("git tag -d v1".to_string())
        );
        assert_eq!(plan.steps()[2].label(), "git push");
        assert_eq!(plan.steps()[2].compensation(), Compensation::Missing);
        assert!(plan.steps().iter().all(|s| s.check));
        Ok(())
    }

    #[test]
    fn settings_resolve_relative_to_plan_directory() -> anyhow::Result<()> {
        let plan = parse(
            r#"
[settings]
shell = "bash"
log-file = "logs/release.log"
working-dir = "app"

[[step]]
run = "true"
"#,
        )?;

        assert_eq!(plan.shell(), "bash");
        assert_eq!(plan.log_file(), Path::new("/repo/logs/release.log"));
        assert_eq!(plan.working_dir(), Path::new("/repo/app"));
        Ok(())
    }

    #[test]
    fn plan_without_steps_is_rejected() {
        let err = parse("[vars]\nx = \"1\"\n").expect_err("should fail");

        assert!(matches!(err, PlanError::Empty { .. }));
    }

    #[test]
    fn pure_step_with_rollback_is_rejected() {
        let err = parse(
            r#"
[[step]]
name = "check"
run = "x"
rollback = "y"
pure = true
"#,
        )
        .expect_err("should fail");

        assert!(matches!(err, PlanError::PureWithRollback { step } if step == "check"));
    }

    #[test]
    fn expect_status_implies_unchecked() -> anyhow::Result<()> {
        let plan = parse(
            r#"
[[step]]
run = "./smoke"
pure = true
expect-status = 77
"#,
        )?;

        assert!(!plan.steps()[0].check);
        assert_eq!(plan.steps()[0].expect_status, Some(77));
        Ok(())
    }

    #[test]
    fn expect_status_with_explicit_check_is_rejected() {
        let err = parse(
            r#"
[[step]]
run = "./smoke"
check = true
expect-status = 77
"#,
        )
        .expect_err("should fail");

        assert!(matches!(err, PlanError::ConflictingCheck { .. }));
    }

    #[test]
    fn validate_requires_capture() {
        let err = parse(
            r#"
[[step]]
run = "poetry version patch"
validate = "semver"
"#,
        )
        .expect_err("should fail");

        assert!(matches!(err, PlanError::ValidateWithoutCapture { .. }));
    }

    #[test]
    fn to_step_renders_commands() -> anyhow::Result<()> {
        let plan = parse(
            r#"
[vars]
tag = "v1.0.0"

[[step]]
run = "git tag -a {tag} -m release"
rollback = "git tag -d {tag}"
"#,
        )?;

        let step = plan.steps()[0].to_step(plan.vars())?;

        assert_eq!(step.commit(), "git tag -a v1.0.0 -m release");
        assert_eq!(
            step.compensation(),
            &Compensation::Command("git tag -d v1.0.0".to_string())
        );
        Ok(())
    }

    #[test]
    fn placeholders_may_use_values_captured_by_earlier_steps() -> anyhow::Result<()> {
        let plan = parse(
            r#"
[[step]]
run = "poetry version {bump}"
rollback = "git checkout HEAD -- pyproject.toml"
capture = "version"
confirm = "Release {version}?"

[[step]]
run = "git tag v{version}"
rollback = "git tag -d v{version}"
"#,
        )?;

        let mut overrides = Vars::new();
        overrides.insert("bump", "minor")?;

        plan.check_placeholders(&overrides)?;
        let err = plan
            .check_placeholders(&Vars::new())
            .expect_err("bump is missing");
        assert!(matches!(err, PlanError::UnknownVariable { name, .. } if name == "bump"));
        Ok(())
    }

    #[test]
    fn placeholder_used_before_its_capture_is_reported() -> anyhow::Result<()> {
        let plan = parse(
            r#"
[[step]]
run = "git tag v{version}"

[[step]]
run = "cat VERSION"
pure = true
capture = "version"
"#,
        )?;

        let err = plan
            .check_placeholders(&Vars::new())
            .expect_err("version is captured too late");

        assert!(matches!(err, PlanError::UnknownVariable { name, .. } if name == "version"));
        Ok(())
    }

    #[test]
    fn prompts_count_as_known_variables() -> anyhow::Result<()> {
        let plan = parse(
            r#"
[prompts.token]
message = "API token"
secret = true

[[step]]
run = "publish --token {token}"
"#,
        )?;

        assert_eq!(plan.prompts()[0].name, "token");
        assert!(plan.prompts()[0].secret);
        plan.check_placeholders(&Vars::new())?;
        Ok(())
    }

    #[test]
    fn prompt_may_not_shadow_a_var_or_a_capture() {
        let shadows_var = parse(
            r#"
[vars]
user = "ci"

[prompts.user]
message = "User"

[[step]]
run = "true"
"#,
        )
        .expect_err("should fail");
        let shadows_capture = parse(
            r#"
[prompts.version]
message = "Version"

[[step]]
run = "cat VERSION"
pure = true
capture = "version"
"#,
        )
        .expect_err("should fail");

        assert!(matches!(shadows_var, PlanError::DuplicateVariable { name } if name == "user"));
        assert!(
            matches!(shadows_capture, PlanError::DuplicateVariable { name } if name == "version")
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Plan::load(Path::new("/nonexistent/release.toml")).expect_err("should fail");

        assert!(matches!(err, PlanError::Read { .. }));
    }
}
