//! Script document model and loader.
//!
//! A script is a JSON document:
//! ```json
//! {
//!   "name": "Release",
//!   "description": "Tag and publish",
//!   "args": [{ "id": "version", "required": true }],
//!   "variables": { "branch": "main" },
//!   "actions": [
//!     { "id": "hello", "type": "message", "config": { "message": "Releasing {{version}}" } }
//!   ],
//!   "steps": [
//!     "hello",
//!     { "if": ["{{version}}", "is-not-empty", ""], "then": "hello", "else": "__end" }
//!   ]
//! }
//! ```
//!
//! Steps are resolved into [`Step`] variants when the document is parsed, so
//! the engine never re-inspects raw JSON shapes. The document is immutable once
//! loaded.

use crate::error::ScriptError;
use crate::predicate::Condition;
use crate::store::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::Path;

/// Pseudo-target that skips the rest of the current step
pub const CONTINUE: &str = "__continue";
/// Pseudo-target that ends the run successfully
pub const END: &str = "__end";

/// A declared external input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

/// A named, typed unit of work. `config` belongs to the action kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    pub id: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub config: serde_json::Value,
}

/// A resolved step target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// `__continue`
    Continue,
    /// `__end`
    End,
    Action(String),
}

impl Target {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Continue => CONTINUE,
            Self::End => END,
            Self::Action(id) => id,
        }
    }
}

impl From<String> for Target {
    fn from(id: String) -> Self {
        match id.as_str() {
            CONTINUE => Self::Continue,
            END => Self::End,
            _ => Self::Action(id),
        }
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Target::from)
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// `"id"` or `["id", ...]`, normalized to a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets(pub Vec<Target>);

impl<'de> Deserialize<'de> for Targets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(Target),
            Many(Vec<Target>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(target) => Targets(vec![target]),
            OneOrMany::Many(targets) => Targets(targets),
        })
    }
}

impl Serialize for Targets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.as_slice() {
            [single] => single.serialize(serializer),
            many => many.serialize(serializer),
        }
    }
}

/// A conditional step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(rename = "if")]
    pub condition: Condition,
    pub then: Targets,
    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub otherwise: Option<Targets>,
}

/// One entry of the step list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Direct(Target),
    Branch(Branch),
}

/// A loaded script document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Argument>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub variables: serde_json::Map<String, serde_json::Value>,
    pub actions: Vec<ActionDef>,
    pub steps: Vec<Step>,
}

impl Script {
    /// Create an empty script skeleton
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            args: Vec::new(),
            variables: serde_json::Map::new(),
            actions: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Parse a script from a JSON string. `name` is only used in error messages.
    pub fn from_json(name: &str, json: &str) -> Result<Self, ScriptError> {
        serde_json::from_str(json).map_err(|e| ScriptError::InvalidFormat {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Load a script from a JSON file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScriptError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| ScriptError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_json(&name, &content)
    }

    /// Save the script as pretty-printed JSON
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ScriptError> {
        let path = path.as_ref();
        let io_err = |reason: String| ScriptError::Io {
            path: path.to_path_buf(),
            reason,
        };

        let json = serde_json::to_string_pretty(self).map_err(|e| io_err(e.to_string()))?;
        fs::write(path, json).map_err(|e| io_err(e.to_string()))
    }

    /// Find a declared action by id
    pub fn action(&self, id: &str) -> Option<&ActionDef> {
        self.actions.iter().find(|action| action.id == id)
    }

    /// Script variables as store values, in declaration order.
    ///
    /// Non-string JSON values are kept in their JSON text form.
    pub fn variable_values(&self) -> impl Iterator<Item = (String, Value)> + '_ {
        self.variables.iter().map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            (key.clone(), Value::Text(text))
        })
    }

    /// Ids of required args that `supplied` does not contain
    pub fn missing_arguments<'a>(&'a self, supplied: &[(String, Value)]) -> Vec<&'a str> {
        self.args
            .iter()
            .filter(|arg| arg.required)
            .filter(|arg| !supplied.iter().any(|(id, _)| id == &arg.id))
            .map(|arg| arg.id.as_str())
            .collect()
    }

    /// Fail with [`ScriptError::MissingArguments`] when required args are absent.
    pub fn check_arguments(&self, supplied: &[(String, Value)]) -> Result<(), ScriptError> {
        let missing = self.missing_arguments(supplied);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ScriptError::MissingArguments {
                ids: missing.into_iter().map(str::to_string).collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{Operator, Predicate};

    const SAMPLE: &str = r#"{
        "name": "Sample",
        "args": [{ "id": "count", "required": true }, { "id": "tag" }],
        "variables": { "zeta": "z", "alpha": "a" },
        "actions": [
            { "id": "big", "type": "message", "config": { "message": "big" } },
            { "id": "small", "kind": "message", "config": { "message": "small" } }
        ],
        "steps": [
            "big",
            "__end",
            { "if": ["{{count}}", ">", 5], "then": "big", "else": ["small", "__continue"] },
            { "if": [["a", "==", "a"], ["b", "in", "a,b"]], "then": ["big"] }
        ]
    }"#;

    #[test]
    fn test_parse_steps_into_variants() {
        let script = Script::from_json("sample", SAMPLE).unwrap();

        assert_eq!(script.steps[0], Step::Direct(Target::Action("big".into())));
        assert_eq!(script.steps[1], Step::Direct(Target::End));

        let Step::Branch(branch) = &script.steps[2] else {
            panic!("Expected branch step");
        };
        assert_eq!(
            branch.condition,
            Condition::Single(Predicate::new("{{count}}", Operator::Gt, "5"))
        );
        assert_eq!(branch.then, Targets(vec![Target::Action("big".into())]));
        assert_eq!(
            branch.otherwise,
            Some(Targets(vec![Target::Action("small".into()), Target::Continue]))
        );

        let Step::Branch(compound) = &script.steps[3] else {
            panic!("Expected branch step");
        };
        assert!(matches!(&compound.condition, Condition::All(list) if list.len() == 2));
        assert!(compound.otherwise.is_none());
    }

    #[test]
    fn test_kind_reads_type_and_alias() {
        let script = Script::from_json("sample", SAMPLE).unwrap();
        assert_eq!(script.actions[0].kind, "message");
        assert_eq!(script.actions[1].kind, "message");
        assert_eq!(script.action("small").map(|a| a.id.as_str()), Some("small"));
        assert!(script.action("huge").is_none());
    }

    #[test]
    fn test_variables_keep_declaration_order() {
        let script = Script::from_json("sample", SAMPLE).unwrap();
        let ids: Vec<String> = script.variable_values().map(|(id, _)| id).collect();
        assert_eq!(ids, ["zeta", "alpha"]);
    }

    #[test]
    fn test_missing_arguments() {
        let script = Script::from_json("sample", SAMPLE).unwrap();
        assert_eq!(script.missing_arguments(&[]), ["count"]);

        let supplied = vec![("count".to_string(), Value::from("3"))];
        assert!(script.check_arguments(&supplied).is_ok());
    }

    #[test]
    fn test_missing_steps_is_invalid_format() {
        let result = Script::from_json("broken", r#"{ "name": "x", "actions": [] }"#);
        assert!(matches!(result, Err(ScriptError::InvalidFormat { .. })));
    }

    #[test]
    fn test_malformed_json_is_invalid_format() {
        let result = Script::from_json("broken", "{ not json");
        assert!(matches!(result, Err(ScriptError::InvalidFormat { name, .. }) if name == "broken"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");

        let script = Script::from_json("sample", SAMPLE).unwrap();
        script.save_to_file(&path).unwrap();

        let reloaded = Script::load_from_file(&path).unwrap();
        assert_eq!(reloaded, script);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Script::load_from_file("/definitely/not/here.json");
        assert!(matches!(result, Err(ScriptError::NotFound { .. })));
    }
}
