//! Step engine tests
//!
//! These tests verify:
//! - End-to-end runs of small scripts through the built-in kinds
//! - Sentinel handling (`__continue`, `__end`)
//! - Fatal vs. non-fatal failures
//! - Seed/variable precedence

use orchestr::{
    Action, ActionContext, ActionOutcome, ActionRegistry, ConfigIssue, EngineError, Engine,
    RunOutcome, Script, ScriptedConsole, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn script(json: &str) -> Script {
    Script::from_json("test", json).expect("test script should parse")
}

fn seeds(pairs: &[(&str, &str)]) -> Vec<(String, Value)> {
    pairs
        .iter()
        .map(|(id, value)| (id.to_string(), Value::from(*value)))
        .collect()
}

fn run(script: &Script, seeds: Vec<(String, Value)>) -> (RunOutcome, ScriptedConsole) {
    let registry = ActionRegistry::with_builtins();
    let mut console = ScriptedConsole::new();
    let outcome = Engine::new(script, &registry, seeds).run(&mut console);
    (outcome, console)
}

/// Counts its invocations; succeeds with no value
struct Counter {
    calls: Arc<AtomicUsize>,
}

impl Action for Counter {
    fn kind(&self) -> &'static str {
        "counter"
    }

    fn validate(&self, _config: &serde_json::Value) -> Result<(), ConfigIssue> {
        Ok(())
    }

    fn run(&self, _config: &serde_json::Value, _ctx: &mut ActionContext<'_>) -> ActionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ActionOutcome::ok()
    }
}

fn registry_with_counter() -> (ActionRegistry, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ActionRegistry::with_builtins();
    registry.register(Box::new(Counter {
        calls: Arc::clone(&calls),
    }));
    (registry, calls)
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

#[test]
fn test_message_renders_seed_value() {
    let script = script(
        r#"{
            "name": "greet",
            "actions": [{ "id": "a", "type": "message", "config": { "message": "hi {{name}}" } }],
            "steps": ["a"]
        }"#,
    );

    let (outcome, console) = run(&script, seeds(&[("name", "Bob")]));

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(console.lines, ["hi Bob"]);
}

#[test]
fn test_branch_picks_then_over_else() {
    let script = script(
        r#"{
            "name": "size",
            "actions": [
                { "id": "big", "type": "message", "config": { "message": "big" } },
                { "id": "small", "type": "message", "config": { "message": "small" } }
            ],
            "steps": [{ "if": ["{{count}}", ">", "5"], "then": "big", "else": "small" }]
        }"#,
    );

    let (outcome, console) = run(&script, seeds(&[("count", "10")]));

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(console.lines, ["big"]);
}

#[test]
fn test_bare_left_operand_is_literal_text() {
    let script = script(
        r#"{
            "name": "size",
            "actions": [
                { "id": "big", "type": "message", "config": { "message": "big" } },
                { "id": "small", "type": "message", "config": { "message": "small" } }
            ],
            "steps": [{ "if": ["count", ">", "5"], "then": "big", "else": "small" }]
        }"#,
    );

    let (outcome, console) = run(&script, seeds(&[("count", "10")]));

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(console.lines, ["small"], "\"count\" is not a number, so > is false");
}

#[test]
fn test_finished_engine_returns_same_outcome() {
    let script = script(
        r#"{
            "name": "twice",
            "actions": [{ "id": "a", "type": "message", "config": { "message": "once" } }],
            "steps": ["a"]
        }"#,
    );
    let registry = ActionRegistry::with_builtins();
    let mut console = ScriptedConsole::new();
    let mut engine = Engine::new(&script, &registry, Vec::new());

    assert_eq!(engine.run(&mut console), RunOutcome::Completed);
    assert_eq!(engine.run(&mut console), RunOutcome::Completed);
    assert_eq!(console.lines, ["once"], "a finished run does not execute again");
}

#[test]
fn test_false_branch_without_else_skips_step() {
    let script = script(
        r#"{
            "name": "skip",
            "actions": [
                { "id": "never", "type": "message", "config": { "message": "never" } },
                { "id": "after", "type": "message", "config": { "message": "after" } }
            ],
            "steps": [
                { "if": ["{{flag}}", "is-true", ""], "then": "never" },
                "after"
            ]
        }"#,
    );
    let registry = ActionRegistry::with_builtins();
    let mut console = ScriptedConsole::new();
    let mut engine = Engine::new(&script, &registry, seeds(&[("flag", "false")]));

    assert_eq!(engine.run(&mut console), RunOutcome::Completed);
    assert_eq!(console.lines, ["after"]);
    assert!(engine.store().resolve("never").is_none());
    assert_eq!(engine.store().len(), 2, "only the seed and 'after'");
}

#[test]
fn test_action_values_feed_later_steps() {
    let script = script(
        r#"{
            "name": "chain",
            "actions": [
                { "id": "who", "type": "bash", "config": { "command": "echo world" } },
                { "id": "say", "type": "message", "config": { "message": "hello {{who}}" } }
            ],
            "steps": [
                "who",
                { "if": ["{{who}}", "is-not-empty", ""], "then": "say" }
            ]
        }"#,
    );

    let (outcome, console) = run(&script, Vec::new());

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(console.lines, ["hello world"]);
}

// =============================================================================
// Sentinels
// =============================================================================

#[test]
fn test_continue_skips_remaining_targets() {
    let (registry, calls) = registry_with_counter();
    let script = script(
        r#"{
            "name": "sentinel",
            "actions": [{ "id": "real", "type": "counter" }],
            "steps": [
                { "if": ["x", "==", "x"], "then": ["__continue", "real"] },
                { "if": ["x", "==", "x"], "then": ["real", "__continue", "real"] }
            ]
        }"#,
    );
    let mut console = ScriptedConsole::new();

    let outcome = Engine::new(&script, &registry, Vec::new()).run(&mut console);

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_end_stops_the_run_successfully() {
    let (registry, calls) = registry_with_counter();
    let script = script(
        r#"{
            "name": "end",
            "actions": [{ "id": "real", "type": "counter" }],
            "steps": ["real", { "if": ["a", "==", "a"], "then": ["__end", "real"] }, "real"]
        }"#,
    );
    let mut console = ScriptedConsole::new();

    let outcome = Engine::new(&script, &registry, Vec::new()).run(&mut console);

    assert_eq!(outcome, RunOutcome::Ended { step: 1 });
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_missing_target_is_fatal() {
    let (registry, calls) = registry_with_counter();
    let script = script(
        r#"{
            "name": "broken",
            "actions": [{ "id": "real", "type": "counter" }],
            "steps": ["real", "ghost", "real"]
        }"#,
    );
    let mut console = ScriptedConsole::new();

    let outcome = Engine::new(&script, &registry, Vec::new()).run(&mut console);

    assert_eq!(
        outcome,
        RunOutcome::Fatal(EngineError::MissingAction {
            step: 1,
            id: "ghost".to_string()
        })
    );
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "later steps never run");
}

#[test]
fn test_unknown_kind_is_fatal() {
    let script = script(
        r#"{
            "name": "broken",
            "actions": [{ "id": "warp", "type": "teleport" }],
            "steps": ["warp"]
        }"#,
    );

    let (outcome, _) = run(&script, Vec::new());

    assert!(matches!(outcome, RunOutcome::Fatal(EngineError::UnknownKind { .. })));
    assert_eq!(outcome.exit_code(), 1);
}

#[test]
fn test_failed_action_skips_rest_of_step_only() {
    let script = script(
        r#"{
            "name": "failing",
            "actions": [
                { "id": "boom", "type": "bash", "config": { "command": "echo oops >&2; exit 3" } },
                { "id": "same-step", "type": "message", "config": { "message": "same step" } },
                { "id": "next-step", "type": "message", "config": { "message": "next step" } }
            ],
            "steps": [
                { "if": ["1", "==", "1"], "then": ["boom", "same-step"] },
                "next-step"
            ]
        }"#,
    );
    let registry = ActionRegistry::with_builtins();
    let mut console = ScriptedConsole::new();
    let mut engine = Engine::new(&script, &registry, Vec::new());

    assert_eq!(engine.run(&mut console), RunOutcome::Completed);
    assert!(engine.store().resolve("boom").is_none(), "failures are not stored");
    assert!(!console.output().contains("same step"));
    assert!(console.output().contains("oops"));
    assert_eq!(console.lines.last().map(String::as_str), Some("next step"));
}

#[test]
fn test_invalid_config_is_not_fatal() {
    let script = script(
        r#"{
            "name": "config",
            "actions": [
                { "id": "empty", "type": "message", "config": {} },
                { "id": "ok", "type": "message", "config": { "message": "still here" } }
            ],
            "steps": ["empty", "ok"]
        }"#,
    );

    let (outcome, console) = run(&script, Vec::new());

    assert_eq!(outcome, RunOutcome::Completed);
    assert!(console.output().contains("Property \"message\" is missing from the action config."));
    assert_eq!(console.lines.last().map(String::as_str), Some("still here"));
}

// =============================================================================
// Precedence
// =============================================================================

#[test]
fn test_script_variable_overrides_cli_value() {
    let script = script(
        r#"{
            "name": "precedence",
            "variables": { "env": "staging" },
            "actions": [{ "id": "show", "type": "message", "config": { "message": "env={{env}}" } }],
            "steps": ["show"]
        }"#,
    );

    let (_, console) = run(&script, seeds(&[("env", "prod")]));

    assert_eq!(console.lines, ["env=staging"]);
}

#[test]
fn test_rerun_action_shadows_earlier_value() {
    let script = script(
        r#"{
            "name": "shadow",
            "actions": [
                { "id": "pick", "type": "input-text", "config": { "message": "Pick" } },
                { "id": "show", "type": "message", "config": { "message": "{{pick}}" } }
            ],
            "steps": ["pick", "pick", "show"]
        }"#,
    );
    let registry = ActionRegistry::with_builtins();
    let mut console = ScriptedConsole::with_answers(["first", "second"]);

    let outcome = Engine::new(&script, &registry, Vec::new()).run(&mut console);

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(console.lines, ["second"]);
}
