//! Step engine.
//!
//! Walks a script's steps in document order and folds every successful
//! action's value back into the run's [`ValueStore`].
//!
//! # States
//!
//! ```text
//! Running(0) → Running(1) → … → Running(n) → Finished(Completed)
//!      │             │
//!      └─ __end ─────┴──────────────────────→ Finished(Ended)
//!      └─ missing action / unknown kind ────→ Finished(Fatal)
//! ```
//!
//! Per step, the target list is the bare id, or the branch's `then`/`else`
//! list. A false branch without `else` is skipped. Targets run in order:
//! `__continue` moves to the next step, `__end` finishes the run, anything
//! else must be a declared action. A failed action stops the remaining targets
//! of its step but not the run.

use crate::actions::{ActionContext, ActionRegistry};
use crate::console::Console;
use crate::error::EngineError;
use crate::script::{Script, Step, Target};
use crate::store::{Value, ValueStore};
use std::fmt;
use tracing::{debug, error, info, warn};

/// How a run finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step was processed
    Completed,
    /// `__end` was reached at the given step index
    Ended { step: usize },
    /// The run aborted
    Fatal(EngineError),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Fatal(_))
    }

    /// Process exit code: 0 for success, 1 for fatal errors
    pub fn exit_code(&self) -> u8 {
        if self.is_success() { 0 } else { 1 }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Ended { step } => write!(f, "ended at step {}", step),
            Self::Fatal(e) => write!(f, "aborted: {}", e),
        }
    }
}

/// Engine state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// About to process the step at this index
    Running(usize),
    Finished(RunOutcome),
}

/// What the engine does after a step
enum StepFlow {
    Next,
    End,
}

/// One run of one script
pub struct Engine<'a> {
    script: &'a Script,
    registry: &'a ActionRegistry,
    store: ValueStore,
    state: RunState,
}

impl<'a> Engine<'a> {
    /// Prepare a run. The store is seeded with `seeds` first and the script's
    /// variables after them, so a variable shadows a same-named seed.
    pub fn new(
        script: &'a Script,
        registry: &'a ActionRegistry,
        seeds: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        let mut store = ValueStore::seed(seeds);
        for (id, value) in script.variable_values() {
            store.append(id, value);
        }

        Self {
            script,
            registry,
            store,
            state: RunState::Running(0),
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    /// Give up the store, e.g. to inspect it after the run
    pub fn into_store(self) -> ValueStore {
        self.store
    }

    /// Drive the run to completion. Calling it again returns the same outcome.
    pub fn run(&mut self, console: &mut dyn Console) -> RunOutcome {
        loop {
            match &self.state {
                RunState::Running(index) => {
                    let index = *index;
                    self.state = self.advance(index, console);
                }
                RunState::Finished(outcome) => {
                    info!("Script '{}' {}", self.script.name, outcome);
                    return outcome.clone();
                }
            }
        }
    }

    fn advance(&mut self, index: usize, console: &mut dyn Console) -> RunState {
        let Some(step) = self.script.steps.get(index) else {
            return RunState::Finished(RunOutcome::Completed);
        };

        debug!("Step {}: {:?}", index, step);
        match self.execute(index, step, console) {
            Ok(StepFlow::Next) => RunState::Running(index + 1),
            Ok(StepFlow::End) => RunState::Finished(RunOutcome::Ended { step: index }),
            Err(e) => {
                error!("{}", e);
                RunState::Finished(RunOutcome::Fatal(e))
            }
        }
    }

    fn execute(
        &mut self,
        index: usize,
        step: &'a Step,
        console: &mut dyn Console,
    ) -> Result<StepFlow, EngineError> {
        let targets: &[Target] = match step {
            Step::Direct(target) => std::slice::from_ref(target),
            Step::Branch(branch) => {
                if branch.condition.evaluate(&self.store) {
                    &branch.then.0
                } else if let Some(otherwise) = &branch.otherwise {
                    &otherwise.0
                } else {
                    debug!("Step {}: condition false, no else", index);
                    return Ok(StepFlow::Next);
                }
            }
        };

        for target in targets {
            let id = match target {
                Target::Continue => return Ok(StepFlow::Next),
                Target::End => return Ok(StepFlow::End),
                Target::Action(id) => id,
            };

            let action = self.script.action(id).ok_or_else(|| EngineError::MissingAction {
                step: index,
                id: id.clone(),
            })?;

            let outcome = {
                let mut ctx = ActionContext::new(&self.store, console);
                self.registry.dispatch(action, &mut ctx)?
            };

            if !outcome.success {
                let reason = outcome
                    .message
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                warn!("Action {} failed at step {}: {}", action.id, index, reason);
                console.failure(&format!("Action \"{}\" failed: {}", action.id, reason));
                return Ok(StepFlow::Next);
            }

            self.store.append(action.id.clone(), outcome.stored_value());
        }

        Ok(StepFlow::Next)
    }
}
