//! Directory actions: create and delete.

use super::{require, Action, ActionConfig, ActionContext, ActionOutcome, ConfigIssue};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreateConfig {
    path: String,
    /// Octal permission bits, e.g. `"755"` or `"0o700"`
    mode: Option<String>,
}

impl CreateConfig {
    fn mode_bits(&self) -> Result<Option<u32>, ConfigIssue> {
        let Some(mode) = self.mode.as_deref() else {
            return Ok(None);
        };
        let digits = mode.trim_start_matches("0o");
        u32::from_str_radix(digits, 8)
            .map(Some)
            .map_err(|_| ConfigIssue::Invalid(format!("mode '{}' is not an octal number", mode)))
    }
}

impl ActionConfig for CreateConfig {
    fn check(&self) -> Result<(), ConfigIssue> {
        require("path", &self.path)?;
        self.mode_bits().map(|_| ())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeleteConfig {
    path: String,
}

impl ActionConfig for DeleteConfig {
    fn check(&self) -> Result<(), ConfigIssue> {
        require("path", &self.path)
    }
}

/// `directory-create {path, mode?}`; creates parents, fails if it exists
pub struct DirectoryCreate;

impl Action for DirectoryCreate {
    fn kind(&self) -> &'static str {
        "directory-create"
    }

    fn validate(&self, config: &serde_json::Value) -> Result<(), ConfigIssue> {
        super::load::<CreateConfig>(config).map(|_| ())
    }

    fn run(&self, config: &serde_json::Value, ctx: &mut ActionContext<'_>) -> ActionOutcome {
        let config: CreateConfig = match super::load(config) {
            Ok(config) => config,
            Err(issue) => return issue.into(),
        };
        let path = ctx.render_path(&config.path);

        if path.exists() {
            return ActionOutcome::failed(format!("Directory at {} already exists.", path.display()));
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        if let Ok(Some(mode)) = config.mode_bits() {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }

        match builder.create(&path) {
            Ok(()) => ActionOutcome::ok(),
            Err(e) => ActionOutcome::failed(format!(
                "Error creating directory at {}:\n{}.",
                path.display(),
                e
            )),
        }
    }
}

/// `directory-delete {path}`; removes recursively
pub struct DirectoryDelete;

impl Action for DirectoryDelete {
    fn kind(&self) -> &'static str {
        "directory-delete"
    }

    fn validate(&self, config: &serde_json::Value) -> Result<(), ConfigIssue> {
        super::load::<DeleteConfig>(config).map(|_| ())
    }

    fn run(&self, config: &serde_json::Value, ctx: &mut ActionContext<'_>) -> ActionOutcome {
        let config: DeleteConfig = match super::load(config) {
            Ok(config) => config,
            Err(issue) => return issue.into(),
        };
        let path = ctx.render_path(&config.path);

        if !path.is_dir() {
            return ActionOutcome::failed(format!("Directory at {} does not exist.", path.display()));
        }
        match fs::remove_dir_all(&path) {
            Ok(()) => ActionOutcome::ok(),
            Err(e) => ActionOutcome::failed(format!(
                "Error deleting directory at {}:\n{}.",
                path.display(),
                e
            )),
        }
    }
}
