//! File actions: create, read, update, delete, move.
//!
//! Paths and content are rendered against the value store, and paths are
//! normalized lexically before use.

use super::{require, Action, ActionConfig, ActionContext, ActionOutcome, ConfigIssue};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PathConfig {
    path: String,
}

impl ActionConfig for PathConfig {
    fn check(&self) -> Result<(), ConfigIssue> {
        require("path", &self.path)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreateConfig {
    path: String,
    content: Option<String>,
}

impl ActionConfig for CreateConfig {
    fn check(&self) -> Result<(), ConfigIssue> {
        require("path", &self.path)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpdateConfig {
    path: String,
    content: String,
    /// Replace the file instead of appending
    overwrite: bool,
}

impl ActionConfig for UpdateConfig {
    fn check(&self) -> Result<(), ConfigIssue> {
        require("path", &self.path)?;
        require("content", &self.content)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MoveConfig {
    path: String,
    destination: String,
}

impl ActionConfig for MoveConfig {
    fn check(&self) -> Result<(), ConfigIssue> {
        require("path", &self.path)?;
        require("destination", &self.destination)
    }
}

macro_rules! load_or_fail {
    ($config:expr) => {
        match super::load($config) {
            Ok(config) => config,
            Err(issue) => return issue.into(),
        }
    };
}

/// `file-create {path, content?}`; fails if the file exists
pub struct FileCreate;

impl Action for FileCreate {
    fn kind(&self) -> &'static str {
        "file-create"
    }

    fn validate(&self, config: &serde_json::Value) -> Result<(), ConfigIssue> {
        super::load::<CreateConfig>(config).map(|_| ())
    }

    fn run(&self, config: &serde_json::Value, ctx: &mut ActionContext<'_>) -> ActionOutcome {
        let config: CreateConfig = load_or_fail!(config);
        let path = ctx.render_path(&config.path);
        let content = config
            .content
            .as_deref()
            .map(|content| ctx.render(content))
            .unwrap_or_default();

        if path.exists() {
            return ActionOutcome::failed(format!("File at {} already exists.", path.display()));
        }
        match fs::write(&path, content) {
            Ok(()) => ActionOutcome::ok(),
            Err(e) => ActionOutcome::failed(format!(
                "Error creating file at {}:\n{}.",
                path.display(),
                e
            )),
        }
    }
}

/// `file-read {path}`; the content becomes the value
pub struct FileRead;

impl Action for FileRead {
    fn kind(&self) -> &'static str {
        "file-read"
    }

    fn validate(&self, config: &serde_json::Value) -> Result<(), ConfigIssue> {
        super::load::<PathConfig>(config).map(|_| ())
    }

    fn run(&self, config: &serde_json::Value, ctx: &mut ActionContext<'_>) -> ActionOutcome {
        let config: PathConfig = load_or_fail!(config);
        let path = ctx.render_path(&config.path);

        if !path.is_file() {
            return ActionOutcome::failed(format!("File at {} does not exist.", path.display()));
        }
        match fs::read_to_string(&path) {
            Ok(content) => ActionOutcome::with_value(content),
            Err(e) => ActionOutcome::failed(format!(
                "Error reading file at {}:\n{}.",
                path.display(),
                e
            )),
        }
    }
}

/// `file-update {path, content, overwrite?}`; appends on a new line unless `overwrite`
pub struct FileUpdate;

impl Action for FileUpdate {
    fn kind(&self) -> &'static str {
        "file-update"
    }

    fn validate(&self, config: &serde_json::Value) -> Result<(), ConfigIssue> {
        super::load::<UpdateConfig>(config).map(|_| ())
    }

    fn run(&self, config: &serde_json::Value, ctx: &mut ActionContext<'_>) -> ActionOutcome {
        let config: UpdateConfig = load_or_fail!(config);
        let path = ctx.render_path(&config.path);
        let content = ctx.render(&config.content);

        if !path.is_file() {
            return ActionOutcome::failed(format!("File at {} does not exist.", path.display()));
        }

        let updated = if config.overwrite {
            Ok(content)
        } else {
            fs::read_to_string(&path).map(|existing| format!("{}\n{}", existing, content))
        };
        match updated.and_then(|updated| fs::write(&path, updated)) {
            Ok(()) => ActionOutcome::ok(),
            Err(e) => ActionOutcome::failed(format!(
                "Error updating file at {}:\n{}.",
                path.display(),
                e
            )),
        }
    }
}

/// `file-delete {path}`
pub struct FileDelete;

impl Action for FileDelete {
    fn kind(&self) -> &'static str {
        "file-delete"
    }

    fn validate(&self, config: &serde_json::Value) -> Result<(), ConfigIssue> {
        super::load::<PathConfig>(config).map(|_| ())
    }

    fn run(&self, config: &serde_json::Value, ctx: &mut ActionContext<'_>) -> ActionOutcome {
        let config: PathConfig = load_or_fail!(config);
        let path = ctx.render_path(&config.path);

        if !path.is_file() {
            return ActionOutcome::failed(format!("File at {} does not exist.", path.display()));
        }
        match fs::remove_file(&path) {
            Ok(()) => ActionOutcome::ok(),
            Err(e) => ActionOutcome::failed(format!(
                "Error deleting file at {}:\n{}.",
                path.display(),
                e
            )),
        }
    }
}

/// `file-move {path, destination}`
pub struct FileMove;

impl Action for FileMove {
    fn kind(&self) -> &'static str {
        "file-move"
    }

    fn validate(&self, config: &serde_json::Value) -> Result<(), ConfigIssue> {
        super::load::<MoveConfig>(config).map(|_| ())
    }

    fn run(&self, config: &serde_json::Value, ctx: &mut ActionContext<'_>) -> ActionOutcome {
        let config: MoveConfig = load_or_fail!(config);
        let path = ctx.render_path(&config.path);
        let destination = ctx.render_path(&config.destination);

        if !path.exists() {
            return ActionOutcome::failed(format!("File at {} does not exist.", path.display()));
        }
        match fs::rename(&path, &destination) {
            Ok(()) => ActionOutcome::ok(),
            Err(e) => ActionOutcome::failed(format!(
                "Error moving file at {}:\n{}.",
                path.display(),
                e
            )),
        }
    }
}
