//! Runner settings.
//!
//! The scripts directory is resolved as: `--dir` flag, then the
//! `ORCHESTR_DIR` environment variable, then `.orchestr` in the working
//! directory.

use crate::error::ScriptError;
use crate::script::Script;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default scripts directory, relative to the working directory
pub const DEFAULT_SCRIPTS_DIR: &str = ".orchestr";

/// Environment variable overriding the scripts directory
pub const SCRIPTS_DIR_ENV: &str = "ORCHESTR_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub scripts_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scripts_dir: PathBuf::from(DEFAULT_SCRIPTS_DIR),
        }
    }
}

impl Settings {
    /// Resolve settings from the CLI flag and the process environment
    pub fn resolve(dir_flag: Option<PathBuf>) -> Self {
        Self::resolve_with(dir_flag, std::env::var_os(SCRIPTS_DIR_ENV).map(PathBuf::from))
    }

    /// Resolve settings from explicit sources. An empty env value is ignored.
    pub fn resolve_with(dir_flag: Option<PathBuf>, env_dir: Option<PathBuf>) -> Self {
        let scripts_dir = dir_flag
            .or_else(|| env_dir.filter(|dir| !dir.as_os_str().is_empty()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRIPTS_DIR));
        debug!("Scripts directory: {}", scripts_dir.display());
        Self { scripts_dir }
    }

    pub fn with_scripts_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: dir.into(),
        }
    }

    /// Fail when the scripts directory does not exist
    pub fn ensure_scripts_dir(&self) -> Result<&Path, ScriptError> {
        if self.scripts_dir.is_dir() {
            Ok(&self.scripts_dir)
        } else {
            Err(ScriptError::MissingScriptsDir {
                path: self.scripts_dir.clone(),
            })
        }
    }

    /// `<scripts_dir>/<name>.json`
    pub fn script_path(&self, name: &str) -> PathBuf {
        self.scripts_dir.join(format!("{}.json", name))
    }

    /// Every parsable script in the directory as `(file stem, script)`, sorted
    /// by file name. Files that fail to parse are skipped.
    pub fn list_scripts(&self) -> Result<Vec<(String, Script)>, ScriptError> {
        let dir = self.ensure_scripts_dir()?;
        let io_err = |e: std::io::Error| ScriptError::Io {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut scripts = Vec::new();
        for path in paths {
            match Script::load_from_file(&path) {
                Ok(script) => {
                    let stem = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    scripts.push((stem, script));
                }
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
        Ok(scripts)
    }
}
