//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Single-host deployment orchestrator: fetch secrets, install systemd units, restart the fleet
#[derive(Parser, Debug)]
#[command(name = "drones-deploy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d debug, -dd trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub debug: u8,

    /// Config file layered over the global config
    #[arg(
        short,
        long,
        global = true,
        env = "DRONES_DEPLOY_CONFIG",
        value_hint = ValueHint::FilePath
    )]
    pub config: Option<PathBuf>,

    /// Parameter store region (overrides config)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Parameter store path (overrides config, "" disables the path source)
    #[arg(long, global = true)]
    pub parameter_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full deployment pipeline
    Deploy,

    /// Show the deployment steps without running them
    Plan,

    /// Show the current state of every fleet unit
    Status,

    /// Install and restart a single fleet service
    Converge {
        /// Service name, e.g. "drones-statistics"
        service: String,
    },

    /// Work with parameter store secrets
    Params {
        #[command(subcommand)]
        command: ParamsCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ParamsCommands {
    /// Fetch parameters and write them as an env file (stdout by default)
    Extract {
        /// Output file (written atomically, mode 0600)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        outfile: Option<PathBuf>,
        /// Prefix lines with "export "
        #[arg(long)]
        export: bool,
    },

    /// Print the named parameter mapping as JSON
    Print,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print a commented config template
    Template,

    /// Show the global config file location
    Path,
}
