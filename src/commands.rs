//! Command flows behind the CLI.
//!
//! Each function does the work of one subcommand against a [`Console`] and
//! returns what `main` needs to pick an exit code. Nothing here exits the
//! process.

use crate::actions::ActionRegistry;
use crate::config::Settings;
use crate::console::Console;
use crate::engine::{Engine, RunOutcome};
use crate::error::{OrchestrError, Result, ScriptError};
use crate::script::{Argument, Script};
use crate::store::Value;
use crate::validate::{self, Section, Severity, ValidationReport};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub const TITLE: &str = "🎭 Orchestr";
pub const SEPARATOR: &str = "----------------------------------------";

/// Turn `--id=value` tokens into seed values, in order.
///
/// `--flag` without `=` seeds `true`. The value is everything after the first
/// `=`, so it may itself contain `=`. Tokens not starting with `--` are
/// ignored.
pub fn parse_cli_values(tokens: &[String]) -> Result<Vec<(String, Value)>> {
    let mut values = Vec::new();
    for token in tokens {
        let Some(body) = token.strip_prefix("--") else {
            warn!("Ignoring argument without a leading --: {}", token);
            continue;
        };

        let (id, value) = match body.split_once('=') {
            Some((id, value)) => (id, Value::from(value)),
            None => (body, Value::Flag(true)),
        };
        if id.is_empty() {
            return Err(OrchestrError::config(format!(
                "Argument '{}' has no id, expected --id=value",
                token
            )));
        }
        values.push((id.to_string(), value));
    }
    Ok(values)
}

/// Lower-case `name` and replace every non-alphanumeric character with `_`.
pub fn slugify(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                '_'
            }
        })
        .collect()
}

fn load_script(settings: &Settings, name: &str) -> Result<Script> {
    settings.ensure_scripts_dir()?;
    let path = settings.script_path(name);
    debug!("Loading script from {}", path.display());
    Ok(Script::load_from_file(path)?)
}

fn greet(console: &mut dyn Console, heading: &str, script: &Script) {
    console.print(TITLE);
    console.success(&format!("{}: {}", heading, script.name));
    if let Some(description) = &script.description {
        console.note(description);
    }
    console.note(SEPARATOR);
}

/// `run <script> [--id=value ...]`
///
/// Missing required arguments are an error before anything runs. Fatal run
/// errors come back inside the outcome.
pub fn run(
    settings: &Settings,
    registry: &ActionRegistry,
    console: &mut dyn Console,
    name: &str,
    tokens: &[String],
) -> Result<RunOutcome> {
    let seeds = parse_cli_values(tokens)?;
    let script = load_script(settings, name)?;
    script.check_arguments(&seeds)?;

    greet(console, "Running", &script);
    info!("Running script '{}' with {} value(s)", script.name, seeds.len());

    let mut engine = Engine::new(&script, registry, seeds);
    let outcome = engine.run(console);
    match &outcome {
        RunOutcome::Fatal(e) => console.failure(&e.to_string()),
        _ => console.success("🎉 Script completed successfully!"),
    }
    Ok(outcome)
}

/// `validate <script>`: print the report section by section.
pub fn validate(
    settings: &Settings,
    registry: &ActionRegistry,
    console: &mut dyn Console,
    name: &str,
) -> Result<ValidationReport> {
    let script = load_script(settings, name)?;
    greet(console, "Validating", &script);

    let report = validate::validate(&script, registry);
    let sections = [
        (Section::Structure, "Validating script structure"),
        (Section::Args, "Validating script args"),
        (Section::Variables, "Validating script variables"),
        (Section::Actions, "Validating script actions"),
        (Section::Steps, "Validating script steps"),
        (Section::Ids, "Validating saved value ids"),
    ];
    for (section, title) in sections {
        console.print(title);
        let mut clean = true;
        for finding in report.section(section) {
            clean = false;
            match finding.severity {
                Severity::Error => console.failure(&format!("❌ {}", finding.message)),
                Severity::Warning => console.warning(&format!("⚠️ {}", finding.message)),
            }
        }
        if clean {
            console.note("✓ No issues");
        }
        console.note(SEPARATOR);
    }

    if report.is_valid() {
        console.success("🎉 Script validated successfully!");
    } else {
        console.failure("❌ Script finished validating with errors.");
    }
    Ok(report)
}

/// `list`: print every script's name and description. Returns how many were listed.
pub fn list(settings: &Settings, console: &mut dyn Console) -> Result<usize> {
    let scripts = settings.list_scripts()?;

    console.print(TITLE);
    console.note(SEPARATOR);
    if scripts.is_empty() {
        console.note(&format!("No scripts in {}", settings.scripts_dir.display()));
    }
    for (slug, script) in &scripts {
        console.success(&format!("{} ({})", script.name, slug));
        if let Some(description) = &script.description {
            console.note(description);
        }
    }
    Ok(scripts.len())
}

/// Inputs of `init`
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub name: String,
    pub description: Option<String>,
    /// `id` or `id:optional`
    pub args: Vec<String>,
    /// `key=value`
    pub vars: Vec<String>,
}

fn check_identifier(kind: &str, id: &str) -> Result<()> {
    if id.is_empty() || slugify(id) != id {
        return Err(OrchestrError::config(format!(
            "{} name '{}' must be in snake_case and cannot contain special characters.",
            kind, id
        )));
    }
    Ok(())
}

fn build_skeleton(options: &InitOptions) -> Result<Script> {
    if options.name.trim().is_empty() {
        return Err(OrchestrError::config("Script name is required"));
    }

    let mut script = Script::new(options.name.trim());
    script.description = options
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    for spec in &options.args {
        let (id, required) = match spec.split_once(':') {
            Some((id, "optional")) => (id, false),
            Some((id, "required")) => (id, true),
            Some((_, other)) => {
                return Err(OrchestrError::config(format!(
                    "Unknown argument flag '{}' in '{}', expected 'optional'",
                    other, spec
                )));
            }
            None => (spec.as_str(), true),
        };
        check_identifier("Argument", id)?;
        if script.args.iter().any(|arg| arg.id == id) {
            return Err(OrchestrError::config(format!(
                "Argument name '{}' must be unique.",
                id
            )));
        }
        script.args.push(Argument {
            id: id.to_string(),
            required,
        });
    }

    for spec in &options.vars {
        let (key, value) = spec.split_once('=').ok_or_else(|| {
            OrchestrError::config(format!("Variable '{}' must look like key=value", spec))
        })?;
        check_identifier("Variable", key)?;
        if script.variables.contains_key(key) {
            return Err(OrchestrError::config(format!(
                "Variable name '{}' must be unique.",
                key
            )));
        }
        script
            .variables
            .insert(key.to_string(), serde_json::Value::String(value.to_string()));
    }

    Ok(script)
}

/// `init <name>`: write an empty script to `<dir>/<slug>.json`, creating the
/// directory when needed. Never overwrites.
pub fn init(settings: &Settings, console: &mut dyn Console, options: &InitOptions) -> Result<PathBuf> {
    let script = build_skeleton(options)?;
    let path = settings.script_path(&slugify(&script.name));
    if path.exists() {
        return Err(ScriptError::AlreadyExists { path }.into());
    }

    fs::create_dir_all(&settings.scripts_dir)?;
    script.save_to_file(&path)?;
    info!("Created script '{}' at {}", script.name, path.display());

    console.success("Script created successfully!");
    console.note(&format!("Script created at {}", path.display()));
    Ok(path)
}
