//! `bash`: run a shell command.
//!
//! The rendered command runs through `bash -c` in its own process group and
//! is tracked by the process guard until it exits. Exit status 0 is success;
//! stdout (trailing newlines trimmed) becomes the action's value unless
//! `silent` is set.

use super::{require, Action, ActionConfig, ActionContext, ActionOutcome, ConfigIssue};
use crate::process_guard;
use serde::Deserialize;
use std::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BashConfig {
    command: String,
    silent: bool,
}

impl ActionConfig for BashConfig {
    fn check(&self) -> Result<(), ConfigIssue> {
        require("command", &self.command)
    }
}

pub struct Bash;

impl Action for Bash {
    fn kind(&self) -> &'static str {
        "bash"
    }

    fn validate(&self, config: &serde_json::Value) -> Result<(), ConfigIssue> {
        super::load::<BashConfig>(config).map(|_| ())
    }

    fn run(&self, config: &serde_json::Value, ctx: &mut ActionContext<'_>) -> ActionOutcome {
        let config: BashConfig = match super::load(config) {
            Ok(config) => config,
            Err(issue) => return issue.into(),
        };

        let command = ctx.render(&config.command);
        debug!("bash -c {:?}", command);

        let output = match process_guard::run_tracked(Command::new("bash").arg("-c").arg(&command)) {
            Ok(output) => output,
            Err(e) => {
                return ActionOutcome::failed(format!("Error executing bash command:\n{}.", e));
            }
        };

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Command exited with {}: {}", code, command);
            return ActionOutcome::failed(format!(
                "Error executing bash command (exit {}):\n{}",
                code,
                stderr.trim_end()
            ));
        }

        if config.silent {
            return ActionOutcome::ok();
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        ActionOutcome::with_value(stdout.trim_end_matches(['\r', '\n']).to_string())
    }
}
