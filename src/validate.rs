//! Static checks for script documents.
//!
//! Validation never runs anything. It walks the loaded [`Script`] once and
//! collects findings per section; errors make the report invalid, warnings do
//! not.

use crate::actions::ActionRegistry;
use crate::predicate::Operator;
use crate::script::{Script, Step, Target};
use crate::template;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Part of the document a finding belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Structure,
    Args,
    Variables,
    Actions,
    Steps,
    Ids,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Structure => "structure",
            Self::Args => "args",
            Self::Variables => "variables",
            Self::Actions => "actions",
            Self::Steps => "steps",
            Self::Ids => "ids",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One validation finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub section: Section,
    pub severity: Severity,
    pub message: String,
}

/// Everything validation found, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    fn error(&mut self, section: Section, message: impl Into<String>) {
        self.findings.push(Finding {
            section,
            severity: Severity::Error,
            message: message.into(),
        });
    }

    fn warning(&mut self, section: Section, message: impl Into<String>) {
        self.findings.push(Finding {
            section,
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Findings of one section
    pub fn section(&self, section: Section) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.section == section)
    }
}

/// Check `script` against the kinds known to `registry`.
pub fn validate(script: &Script, registry: &ActionRegistry) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_structure(script, &mut report);
    check_args(script, &mut report);
    check_variables(script, &mut report);
    check_actions(script, registry, &mut report);
    check_steps(script, &mut report);
    check_ids(script, &mut report);

    report
}

fn check_structure(script: &Script, report: &mut ValidationReport) {
    if script.name.trim().is_empty() {
        report.error(Section::Structure, "Script name is empty");
    }
    if script.description.as_deref().is_none_or(|d| d.trim().is_empty()) {
        report.warning(Section::Structure, "Script has no description");
    }
}

fn check_args(script: &Script, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for (index, arg) in script.args.iter().enumerate() {
        if arg.id.is_empty() {
            report.error(Section::Args, format!("Argument at index {} has an empty id", index));
        } else if !seen.insert(arg.id.as_str()) {
            report.error(Section::Args, format!("Argument \"{}\" is declared twice", arg.id));
        }
    }
}

fn check_variables(script: &Script, report: &mut ValidationReport) {
    if script.variables.keys().any(|name| name.is_empty()) {
        report.error(Section::Variables, "A variable has an empty name");
    }
}

fn check_actions(script: &Script, registry: &ActionRegistry, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for action in &script.actions {
        if action.id.is_empty() {
            report.error(Section::Actions, "An action has an empty id");
        } else if !seen.insert(action.id.as_str()) {
            report.error(
                Section::Actions,
                format!("Action \"{}\" is declared twice", action.id),
            );
        }

        match registry.get(&action.kind) {
            None => report.error(
                Section::Actions,
                format!("Action \"{}\" has unknown type \"{}\"", action.id, action.kind),
            ),
            Some(kind) => {
                if let Err(issue) = kind.validate(&action.config) {
                    report.error(Section::Actions, format!("Action \"{}\": {}", action.id, issue));
                }
            }
        }
    }
}

fn check_steps(script: &Script, report: &mut ValidationReport) {
    let known: HashSet<&str> = script
        .args
        .iter()
        .map(|a| a.id.as_str())
        .chain(script.variables.keys().map(String::as_str))
        .chain(script.actions.iter().map(|a| a.id.as_str()))
        .collect();

    for (index, step) in script.steps.iter().enumerate() {
        match step {
            Step::Direct(target) => check_target(script, index, target, report),
            Step::Branch(branch) => {
                for predicate in branch.condition.predicates() {
                    if let Operator::Unknown(text) = &predicate.operator {
                        report.warning(
                            Section::Steps,
                            format!(
                                "Step {}: unknown operator \"{}\" always evaluates to false",
                                index, text
                            ),
                        );
                    }
                    for name in template::placeholders(&predicate.left) {
                        if !known.contains(name) {
                            report.warning(
                                Section::Steps,
                                format!("Step {}: \"{{{{{}}}}}\" is never set", index, name),
                            );
                        }
                    }
                }

                if branch.condition.predicates().is_empty() {
                    report.error(Section::Steps, format!("Step {}: \"if\" is empty", index));
                }
                if branch.then.0.is_empty() {
                    report.error(Section::Steps, format!("Step {}: \"then\" is empty", index));
                }
                match &branch.otherwise {
                    Some(otherwise) if otherwise.0.is_empty() => {
                        report.warning(Section::Steps, format!("Step {}: \"else\" is empty", index));
                    }
                    _ => {}
                }

                let targets = branch
                    .then
                    .0
                    .iter()
                    .chain(branch.otherwise.iter().flat_map(|t| t.0.iter()));
                for target in targets {
                    check_target(script, index, target, report);
                }
            }
        }
    }
}

fn check_target(script: &Script, index: usize, target: &Target, report: &mut ValidationReport) {
    if let Target::Action(id) = target {
        if id.is_empty() {
            report.error(Section::Steps, format!("Step {}: empty target", index));
        } else if script.action(id).is_none() {
            report.error(
                Section::Steps,
                format!("Step {}: action \"{}\" is not declared", index, id),
            );
        }
    }
}

/// Ids shared between args, variables and actions shadow each other at run time.
fn check_ids(script: &Script, report: &mut ValidationReport) {
    let mut owners: HashMap<&str, Vec<&'static str>> = HashMap::new();
    let declared = script
        .args
        .iter()
        .map(|a| (a.id.as_str(), "args"))
        .chain(script.variables.keys().map(|k| (k.as_str(), "variables")))
        .chain(script.actions.iter().map(|a| (a.id.as_str(), "actions")));

    for (id, kind) in declared.filter(|(id, _)| !id.is_empty()) {
        let kinds = owners.entry(id).or_default();
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }

    let mut shared: Vec<_> = owners.into_iter().filter(|(_, kinds)| kinds.len() > 1).collect();
    shared.sort_unstable();
    for (id, kinds) in shared {
        report.error(
            Section::Ids,
            format!("\"{}\" is declared in {}", id, kinds.join(" and ")),
        );
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for finding in &self.findings {
            let tag = match finding.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            writeln!(f, "[{}] {}: {}", finding.section, tag, finding.message)?;
        }
        Ok(())
    }
}
