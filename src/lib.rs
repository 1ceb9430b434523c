//! Orchestr Library
//!
//! Loads declarative JSON scripts and runs them: a step engine walks the step
//! list, evaluates branch predicates against a value store and dispatches
//! actions by kind, folding each result back into the store.

pub mod actions;
pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod predicate;
pub mod process_guard;
pub mod script;
pub mod store;
pub mod template;
pub mod validate;

// Re-export main types for convenience
pub use actions::{Action, ActionContext, ActionOutcome, ActionRegistry, ConfigIssue};
pub use config::Settings;
pub use console::{Choice, Console, ScriptedConsole, TerminalConsole};
pub use engine::{Engine, RunOutcome, RunState};
pub use error::{EngineError, OrchestrError, ScriptError};
pub use predicate::{Condition, Operator, Predicate};
pub use process_guard::{ChildRegistry, CommandProcessGroup, ProcessGuard};
pub use script::{ActionDef, Argument, Script, Step, Target};
pub use store::{Lookup, Value, ValueStore};
pub use validate::{validate, ValidationReport};
