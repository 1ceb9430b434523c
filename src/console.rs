//! Console presentation and interactive prompts.
//!
//! Everything user-facing goes through the [`Console`] trait so the engine and
//! the actions never touch stdin/stdout directly. [`TerminalConsole`] is the
//! real terminal; [`ScriptedConsole`] answers prompts from a preset queue and
//! records output, for non-interactive runs and tests.

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::Stylize;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// One selectable option of a choice prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Value returned when picked
    pub value: String,
    /// Text shown to the user
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Output and prompting surface used by commands and actions.
pub trait Console {
    /// Plain output line
    fn print(&mut self, text: &str);
    /// Secondary (dimmed) output line
    fn note(&mut self, text: &str);
    fn success(&mut self, text: &str);
    fn warning(&mut self, text: &str);
    fn failure(&mut self, text: &str);

    /// Free-text answer. Empty answers fall back to `default`; with `required`
    /// an empty answer and no default asks again.
    fn text(&mut self, message: &str, default: Option<&str>, required: bool) -> io::Result<String>;
    /// Free-text answer without echo
    fn password(&mut self, message: &str) -> io::Result<String>;
    fn confirm(&mut self, message: &str) -> io::Result<bool>;
    /// Pick one choice; returns its value
    fn select(&mut self, message: &str, choices: &[Choice]) -> io::Result<String>;
    /// Pick any number of choices; returns their values in choice order
    fn multi_select(&mut self, message: &str, choices: &[Choice]) -> io::Result<Vec<String>>;
}

/// Interactive terminal console
#[derive(Debug, Default)]
pub struct TerminalConsole;

impl TerminalConsole {
    pub fn new() -> Self {
        Self
    }

    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{} {} ", "?".green().bold(), prompt.bold())?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed while waiting for an answer",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn list_choices(&mut self, choices: &[Choice]) {
        for (index, choice) in choices.iter().enumerate() {
            println!("  {} {}", format!("{})", index + 1).dark_grey(), choice.label);
        }
    }
}

/// Read one masked line in raw mode. Esc or Ctrl+C aborts.
fn read_masked() -> io::Result<String> {
    let mut secret = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Enter => return Ok(secret),
                KeyCode::Backspace => {
                    secret.pop();
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Err(io::Error::new(io::ErrorKind::Interrupted, "input cancelled"));
                }
                KeyCode::Esc => {
                    return Err(io::Error::new(io::ErrorKind::Interrupted, "input cancelled"));
                }
                KeyCode::Char(c) => secret.push(c),
                _ => {}
            }
        }
    }
}

/// Parse `"1,3"` style picks against `count` choices.
fn parse_picks(answer: &str, count: usize) -> Option<Vec<usize>> {
    let mut picks = Vec::new();
    for part in answer.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let pick: usize = part.parse().ok()?;
        if pick == 0 || pick > count {
            return None;
        }
        if !picks.contains(&(pick - 1)) {
            picks.push(pick - 1);
        }
    }
    picks.sort_unstable();
    Some(picks)
}

impl Console for TerminalConsole {
    fn print(&mut self, text: &str) {
        println!("{}", text);
    }

    fn note(&mut self, text: &str) {
        println!("{}", text.dark_grey());
    }

    fn success(&mut self, text: &str) {
        println!("{}", text.green().bold());
    }

    fn warning(&mut self, text: &str) {
        println!("{}", text.yellow().bold());
    }

    fn failure(&mut self, text: &str) {
        println!("{}", text.red().bold());
    }

    fn text(&mut self, message: &str, default: Option<&str>, required: bool) -> io::Result<String> {
        let prompt = match default {
            Some(default) => format!("{} ({})", message, default),
            None => message.to_string(),
        };
        loop {
            let answer = self.ask(&prompt)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            if let Some(default) = default {
                return Ok(default.to_string());
            }
            if !required {
                return Ok(answer);
            }
            self.failure("> This value is required");
        }
    }

    fn password(&mut self, message: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{} {} ", "?".green().bold(), message.bold())?;
        stdout.flush()?;

        enable_raw_mode()?;
        let secret = read_masked();
        // Always leave raw mode, even if reading failed
        let _ = disable_raw_mode();
        println!();
        secret
    }

    fn confirm(&mut self, message: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("{} (Y/n)", message))?;
        Ok(!matches!(answer.trim().to_lowercase().as_str(), "n" | "no"))
    }

    fn select(&mut self, message: &str, choices: &[Choice]) -> io::Result<String> {
        println!("{} {}", "?".green().bold(), message.bold());
        self.list_choices(choices);
        loop {
            let answer = self.ask("Choose one")?;
            match parse_picks(&answer, choices.len()).as_deref() {
                Some([pick]) => return Ok(choices[*pick].value.clone()),
                _ => self.failure("> Enter a single number from the list"),
            }
        }
    }

    fn multi_select(&mut self, message: &str, choices: &[Choice]) -> io::Result<Vec<String>> {
        println!("{} {}", "?".green().bold(), message.bold());
        self.list_choices(choices);
        loop {
            let answer = self.ask("Choose any (comma separated)")?;
            match parse_picks(&answer, choices.len()) {
                Some(picks) => {
                    return Ok(picks.into_iter().map(|i| choices[i].value.clone()).collect());
                }
                None => self.failure("> Enter numbers from the list, separated by commas"),
            }
        }
    }
}

/// Non-interactive console with preset answers.
///
/// Each prompt consumes the next queued answer: text and password prompts use
/// it as-is, confirm accepts `y`/`yes`/`true`, select expects a choice value
/// and multi-select a comma-separated list of values. Running out of answers
/// is an `UnexpectedEof` error.
#[derive(Debug, Default, Clone)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    /// Every line written, in order, without styling
    pub lines: Vec<String>,
    /// Every prompt message asked, in order
    pub prompts: Vec<String>,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// All output joined with newlines
    pub fn output(&self) -> String {
        self.lines.join("\n")
    }

    fn next_answer(&mut self, message: &str) -> io::Result<String> {
        self.prompts.push(message.to_string());
        self.answers.pop_front().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("no scripted answer for prompt: {}", message),
            )
        })
    }
}

fn unknown_choice(value: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("'{}' is not one of the choices", value),
    )
}

impl Console for ScriptedConsole {
    fn print(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    fn note(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    fn success(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    fn warning(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    fn failure(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    fn text(&mut self, message: &str, default: Option<&str>, _required: bool) -> io::Result<String> {
        let answer = self.next_answer(message)?;
        match default {
            Some(default) if answer.is_empty() => Ok(default.to_string()),
            _ => Ok(answer),
        }
    }

    fn password(&mut self, message: &str) -> io::Result<String> {
        self.next_answer(message)
    }

    fn confirm(&mut self, message: &str) -> io::Result<bool> {
        let answer = self.next_answer(message)?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "true"))
    }

    fn select(&mut self, message: &str, choices: &[Choice]) -> io::Result<String> {
        let answer = self.next_answer(message)?;
        if choices.iter().any(|c| c.value == answer) {
            Ok(answer)
        } else {
            Err(unknown_choice(&answer))
        }
    }

    fn multi_select(&mut self, message: &str, choices: &[Choice]) -> io::Result<Vec<String>> {
        let answer = self.next_answer(message)?;
        let wanted: Vec<&str> = answer
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        if let Some(bad) = wanted.iter().find(|v| !choices.iter().any(|c| c.value == **v)) {
            return Err(unknown_choice(bad));
        }
        Ok(choices
            .iter()
            .filter(|c| wanted.contains(&c.value.as_str()))
            .map(|c| c.value.clone())
            .collect())
    }
}
