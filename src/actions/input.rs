//! Interactive prompts: free text, confirmation, choice lists.

use super::{require, Action, ActionConfig, ActionContext, ActionOutcome, ConfigIssue};
use crate::console::Choice;
use serde::Deserialize;
use std::io;

fn prompt_failed(e: io::Error) -> ActionOutcome {
    ActionOutcome::failed(format!("Prompt failed: {}", e))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TextConfig {
    message: String,
    default: Option<String>,
    required: bool,
    /// Hide the typed answer
    mask: bool,
}

impl ActionConfig for TextConfig {
    fn check(&self) -> Result<(), ConfigIssue> {
        require("message", &self.message)
    }
}

/// `input-text {message, default?, required?, mask?}`
pub struct InputText;

impl Action for InputText {
    fn kind(&self) -> &'static str {
        "input-text"
    }

    fn validate(&self, config: &serde_json::Value) -> Result<(), ConfigIssue> {
        super::load::<TextConfig>(config).map(|_| ())
    }

    fn run(&self, config: &serde_json::Value, ctx: &mut ActionContext<'_>) -> ActionOutcome {
        let config: TextConfig = match super::load(config) {
            Ok(config) => config,
            Err(issue) => return issue.into(),
        };
        let message = ctx.render(&config.message);

        let answer = if config.mask {
            ctx.console.password(&message)
        } else {
            let default = config.default.as_deref().map(|d| ctx.render(d));
            ctx.console.text(&message, default.as_deref(), config.required)
        };
        answer.map_or_else(prompt_failed, ActionOutcome::with_value)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfirmConfig {
    message: String,
}

impl ActionConfig for ConfirmConfig {
    fn check(&self) -> Result<(), ConfigIssue> {
        require("message", &self.message)
    }
}

/// `input-confirm {message}`; the answer is stored as a boolean
pub struct InputConfirm;

impl Action for InputConfirm {
    fn kind(&self) -> &'static str {
        "input-confirm"
    }

    fn validate(&self, config: &serde_json::Value) -> Result<(), ConfigIssue> {
        super::load::<ConfirmConfig>(config).map(|_| ())
    }

    fn run(&self, config: &serde_json::Value, ctx: &mut ActionContext<'_>) -> ActionOutcome {
        let config: ConfirmConfig = match super::load(config) {
            Ok(config) => config,
            Err(issue) => return issue.into(),
        };
        let message = ctx.render(&config.message);
        ctx.console
            .confirm(&message)
            .map_or_else(prompt_failed, ActionOutcome::with_value)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChoiceConfig {
    message: String,
    /// value → label, in declaration order
    choices: serde_json::Map<String, serde_json::Value>,
    multiple: bool,
}

impl ActionConfig for ChoiceConfig {
    fn check(&self) -> Result<(), ConfigIssue> {
        if self.choices.is_empty() {
            return Err(ConfigIssue::Missing("choices"));
        }
        require("message", &self.message)
    }
}

/// `input-choice {message, choices, multiple?}`.
///
/// Multiple picks are stored as one comma-joined string.
pub struct InputChoice;

impl Action for InputChoice {
    fn kind(&self) -> &'static str {
        "input-choice"
    }

    fn validate(&self, config: &serde_json::Value) -> Result<(), ConfigIssue> {
        super::load::<ChoiceConfig>(config).map(|_| ())
    }

    fn run(&self, config: &serde_json::Value, ctx: &mut ActionContext<'_>) -> ActionOutcome {
        let config: ChoiceConfig = match super::load(config) {
            Ok(config) => config,
            Err(issue) => return issue.into(),
        };

        let choices: Vec<Choice> = config
            .choices
            .iter()
            .map(|(value, label)| {
                let label = match label {
                    serde_json::Value::String(text) => ctx.render(text),
                    other => other.to_string(),
                };
                Choice::new(value.clone(), label)
            })
            .collect();
        let message = ctx.render(&config.message);

        let answer = if config.multiple {
            ctx.console
                .multi_select(&message, &choices)
                .map(|picked| picked.join(","))
        } else {
            ctx.console.select(&message, &choices)
        };
        answer.map_or_else(prompt_failed, ActionOutcome::with_value)
    }
}
