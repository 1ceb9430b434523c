use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Orchestr - run declarative JSON scripts
#[derive(Parser, Debug)]
#[command(name = "orchestr")]
#[command(about = "Run declarative JSON scripts made of actions and conditional steps")]
#[command(version)]
pub struct Cli {
    /// Scripts directory (default: .orchestr, or $ORCHESTR_DIR)
    #[arg(long, global = true, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a script
    Run {
        /// Script name followed by --id=value pairs
        #[arg(
            required = true,
            trailing_var_arg = true,
            allow_hyphen_values = true,
            value_name = "SCRIPT [--ID=VALUE]..."
        )]
        args: Vec<String>,
    },
    /// Check a script without running it
    Validate {
        /// Script name
        script: String,
    },
    /// List available scripts
    List,
    /// Create an empty script
    Init {
        /// Script name
        name: String,
        /// Script description
        #[arg(short, long)]
        description: Option<String>,
        /// Declare an argument: id or id:optional
        #[arg(short, long = "arg", value_name = "ID[:optional]")]
        args: Vec<String>,
        /// Declare a variable
        #[arg(short, long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["orchestr"]).is_err());
    }

    #[test]
    fn test_cli_run_collects_values() {
        let cli = Cli::try_parse_from(["orchestr", "run", "deploy", "--env=prod", "--force"]).unwrap();
        match cli.command {
            Commands::Run { args } => assert_eq!(args, ["deploy", "--env=prod", "--force"]),
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_global_dir() {
        let cli = Cli::try_parse_from(["orchestr", "--dir", "/tmp/s", "validate", "deploy"]).unwrap();
        assert_eq!(cli.dir, Some(PathBuf::from("/tmp/s")));
        match cli.command {
            Commands::Validate { script } => assert_eq!(script, "deploy"),
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_cli_init() {
        let cli = Cli::try_parse_from([
            "orchestr", "init", "Deploy App", "-d", "Ship it", "--arg", "env", "--arg",
            "tag:optional", "--var", "region=eu",
        ])
        .unwrap();
        match cli.command {
            Commands::Init {
                name,
                description,
                args,
                vars,
            } => {
                assert_eq!(name, "Deploy App");
                assert_eq!(description.as_deref(), Some("Ship it"));
                assert_eq!(args, ["env", "tag:optional"]);
                assert_eq!(vars, ["region=eu"]);
            }
            _ => panic!("Expected Init command"),
        }
    }
}
