//! Action kinds and their registry.
//!
//! An action kind is anything implementing [`Action`]. The engine only knows
//! an action's `id` and `type`; the registry maps the type to an
//! implementation, which owns its `config`: it validates it, renders its
//! strings against the value store and performs the work.
//!
//! # Contract
//!
//! - `validate` reports the first missing required field without side effects.
//! - `run` re-validates before doing anything and never panics or errors for
//!   recoverable problems: bad config and I/O failures come back as
//!   [`ActionOutcome::failed`] with a readable message.
//! - Each run is attempted at most once; the engine does not retry.

mod directory;
mod file;
mod input;
mod message;
mod shell;

pub use directory::{DirectoryCreate, DirectoryDelete};
pub use file::{FileCreate, FileDelete, FileMove, FileRead, FileUpdate};
pub use input::{InputChoice, InputConfirm, InputText};
pub use message::Message;
pub use shell::Bash;

use crate::console::Console;
use crate::error::EngineError;
use crate::script::ActionDef;
use crate::store::{Value, ValueStore};
use crate::template;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Result of one action invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    /// Produced value on success, diagnostic on failure
    pub message: Option<Value>,
}

impl ActionOutcome {
    /// Success without a produced value
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn with_value(value: impl Into<Value>) -> Self {
        Self {
            success: true,
            message: Some(value.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(Value::Text(message.into())),
        }
    }

    /// The value to store for a successful run: the message, or `true` when there is none.
    pub fn stored_value(&self) -> Value {
        self.message.clone().unwrap_or(Value::Flag(true))
    }
}

/// Problems with an action's `config`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    #[error("Property \"{0}\" is missing from the action config.")]
    Missing(&'static str),

    #[error("Invalid action config: {0}")]
    Invalid(String),
}

impl From<ConfigIssue> for ActionOutcome {
    fn from(issue: ConfigIssue) -> Self {
        ActionOutcome::failed(issue.to_string())
    }
}

/// Typed view of an action config
pub(crate) trait ActionConfig: DeserializeOwned + Default {
    /// First missing or invalid field, if any
    fn check(&self) -> Result<(), ConfigIssue>;
}

/// Deserialize and check a config. An absent config is the default value.
pub(crate) fn load<T: ActionConfig>(config: &serde_json::Value) -> Result<T, ConfigIssue> {
    let parsed: T = if config.is_null() {
        T::default()
    } else {
        serde_json::from_value(config.clone()).map_err(|e| ConfigIssue::Invalid(e.to_string()))?
    };
    parsed.check()?;
    Ok(parsed)
}

/// Empty strings count as missing
pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ConfigIssue> {
    if value.is_empty() {
        Err(ConfigIssue::Missing(field))
    } else {
        Ok(())
    }
}

/// What an action sees while it runs
pub struct ActionContext<'a> {
    pub values: &'a ValueStore,
    pub console: &'a mut dyn Console,
}

impl<'a> ActionContext<'a> {
    pub fn new(values: &'a ValueStore, console: &'a mut dyn Console) -> Self {
        Self { values, console }
    }

    /// Render a config string against the current values
    pub fn render(&self, text: &str) -> String {
        template::render(text, self.values)
    }

    /// Render a config path and normalize it
    pub fn render_path(&self, text: &str) -> PathBuf {
        normalize_path(&self.render(text))
    }
}

/// A kind of action
pub trait Action: Send + Sync {
    /// The `type` string scripts use for this kind
    fn kind(&self) -> &'static str;

    /// Check `config` without side effects
    fn validate(&self, config: &serde_json::Value) -> Result<(), ConfigIssue>;

    fn run(&self, config: &serde_json::Value, ctx: &mut ActionContext<'_>) -> ActionOutcome;
}

/// Maps action kinds to implementations
pub struct ActionRegistry {
    actions: HashMap<&'static str, Box<dyn Action>>,
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ActionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// A registry with every built-in kind
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(Message));
        registry.register(Box::new(Bash));
        registry.register(Box::new(InputText));
        registry.register(Box::new(InputChoice));
        registry.register(Box::new(InputConfirm));
        registry.register(Box::new(FileCreate));
        registry.register(Box::new(FileRead));
        registry.register(Box::new(FileUpdate));
        registry.register(Box::new(FileDelete));
        registry.register(Box::new(FileMove));
        registry.register(Box::new(DirectoryCreate));
        registry.register(Box::new(DirectoryDelete));
        registry
    }

    /// Register an implementation, returning the one it replaces
    pub fn register(&mut self, action: Box<dyn Action>) -> Option<Box<dyn Action>> {
        self.actions.insert(action.kind(), action)
    }

    pub fn get(&self, kind: &str) -> Option<&dyn Action> {
        self.actions.get(kind).map(|action| action.as_ref())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.actions.contains_key(kind)
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.actions.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// Run `action` with its registered implementation.
    ///
    /// An unregistered kind is fatal; anything the implementation reports is not.
    pub fn dispatch(
        &self,
        action: &ActionDef,
        ctx: &mut ActionContext<'_>,
    ) -> Result<ActionOutcome, EngineError> {
        let implementation = self.get(&action.kind).ok_or_else(|| EngineError::UnknownKind {
            action: action.id.clone(),
            kind: action.kind.clone(),
        })?;

        info!("Running action {} ({})", action.id, action.kind);
        let outcome = implementation.run(&action.config, ctx);
        debug!("Action {} finished: success={}", action.id, outcome.success);
        Ok(outcome)
    }
}

/// Lexically collapse `.` and `..` components.
pub fn normalize_path(raw: &str) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in Path::new(raw).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    if normalized.as_os_str().is_empty() {
        normalized.push(".");
    }
    normalized
}
