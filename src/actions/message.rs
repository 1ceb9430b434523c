//! `message`: print a rendered line.

use super::{require, Action, ActionConfig, ActionContext, ActionOutcome, ConfigIssue};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessageConfig {
    message: String,
}

impl ActionConfig for MessageConfig {
    fn check(&self) -> Result<(), ConfigIssue> {
        require("message", &self.message)
    }
}

pub struct Message;

impl Action for Message {
    fn kind(&self) -> &'static str {
        "message"
    }

    fn validate(&self, config: &serde_json::Value) -> Result<(), ConfigIssue> {
        super::load::<MessageConfig>(config).map(|_| ())
    }

    fn run(&self, config: &serde_json::Value, ctx: &mut ActionContext<'_>) -> ActionOutcome {
        let config: MessageConfig = match super::load(config) {
            Ok(config) => config,
            Err(issue) => return issue.into(),
        };

        let text = ctx.render(&config.message);
        ctx.console.print(&text);
        ActionOutcome::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;
    use crate::store::ValueStore;
    use serde_json::json;

    #[test]
    fn test_message_prints_rendered_text() {
        let store = ValueStore::seed([("name", "Bob")]);
        let mut console = ScriptedConsole::new();
        let mut ctx = ActionContext::new(&store, &mut console);

        let outcome = Message.run(&json!({ "message": "hi {{name}}" }), &mut ctx);
        assert_eq!(outcome, ActionOutcome::ok());
        assert_eq!(console.lines, ["hi Bob"]);
    }

    #[test]
    fn test_message_missing_field() {
        let store = ValueStore::new();
        let mut console = ScriptedConsole::new();
        let mut ctx = ActionContext::new(&store, &mut console);

        let outcome = Message.run(&json!({}), &mut ctx);
        assert_eq!(
            outcome,
            ActionOutcome::failed("Property \"message\" is missing from the action config.")
        );
        assert!(console.lines.is_empty());
    }
}
