//! Command-line argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// autocrea - multi-role AI project generation
#[derive(Parser, Debug)]
#[command(name = "autocrea")]
#[command(about = "Generate a project through architect, backend, frontend, devops and security steps")]
#[command(long_about = r#"
autocrea runs a project description through five generation roles in order
and assembles their outputs into a single artifact.

EXAMPLES:
  # Create .autocrea/ with the default configuration and role prompts
  autocrea init

  # Generate against the configured backends
  autocrea generate --name todo-app --description "A todo list with authentication"

  # Generate without network access, printing the JSON response
  autocrea generate --name todo-app --description "A todo list" --offline --json

  # List finished runs
  autocrea history

CONFIGURATION:
  Settings are read from .autocrea/config.toml under --root.
  Backend API keys are read from the environment variables it names.
  Log verbosity follows AUTOCREA_LOG or RUST_LOG.
"#)]
#[command(version)]
pub struct Cli {
    /// Project root holding the .autocrea directory
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create .autocrea/ from the built-in templates
    Init {
        /// Overwrite the template files of an existing .autocrea directory
        #[arg(long)]
        force: bool,
    },

    /// Run every generation role for a project
    Generate {
        /// Project name
        #[arg(long)]
        name: String,

        /// Free-text project description
        #[arg(long)]
        description: String,

        /// Use local stand-in backends instead of the configured services
        #[arg(long)]
        offline: bool,

        /// Print the response as JSON instead of the generated code
        #[arg(long)]
        json: bool,

        /// Account the run is charged to
        #[arg(long, env = "AUTOCREA_OWNER", default_value = "local")]
        owner: String,
    },

    /// List persisted runs, newest first
    History {
        /// Print the summaries as JSON
        #[arg(long)]
        json: bool,
    },
}
