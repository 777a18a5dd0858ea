//! Clap derive structures for the `lytko` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// lytko -- link and automation daemon for Lytko thermostats
#[derive(Debug, Parser)]
#[command(
    name = "lytko",
    version,
    about = "Keep Lytko network thermostats connected and automated",
    long_about = "Maintains a resilient websocket link to each configured Lytko thermostat,\n\
        follows it across address changes, drives heating from an external sensor\n\
        and applies weekly schedules.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Thermostat profile to use
    #[arg(long, short = 'p', env = "LYTKO_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "LYTKO_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the link daemon until interrupted
    Run(RunArgs),

    /// Print decoded device events as JSON lines
    Watch(WatchArgs),

    /// Send a single command to the thermostat
    Send(SendArgs),

    /// Pair the thermostat with the voice assistant account
    PairAlice(PairArgs),

    /// Manage configuration
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Run every configured profile instead of only the selected one
    #[arg(long)]
    pub all: bool,

    /// Do not listen for mDNS announcements
    #[arg(long)]
    pub no_discovery: bool,

    /// Also write logs to daily-rolling files in this directory
    #[arg(long, env = "LYTKO_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this many seconds
    #[arg(long)]
    pub duration: Option<u64>,
}

// ── Send ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SendArgs {
    #[command(subcommand)]
    pub command: SendCommand,
}

#[derive(Debug, Subcommand)]
pub enum SendCommand {
    /// Set the target temperature (°C)
    Target {
        #[arg(allow_negative_numbers = true)]
        temperature: f64,
    },

    /// Switch heating regulation on or off
    Heat { state: Switch },

    /// Select the floor thermistor rating (kΩ, e.g. 10 or 6.8)
    Sensor { resistance: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

// ── Pairing ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PairArgs {
    /// Voice assistant account login (defaults to the profile's `alice_login`)
    #[arg(long)]
    pub login: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current resolved configuration
    Show {
        /// Render as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },

    /// List configured profiles
    Profiles,

    /// Store the selected profile's voice assistant password in the system keyring
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
