//! Clap derive structures for the `carehub` CLI.
//!
//! Every resource shares one subcommand shape (list, get, create, update,
//! delete); only the table columns differ.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use carehub_core::AssetCondition;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// carehub -- administer a care facility backend from the command line
#[derive(Debug, Parser)]
#[command(
    name = "carehub",
    version,
    about = "Manage care facility records from the command line",
    long_about = "Lists, inspects and edits residents, guardians, employees, assets,\n\
        inventory and appointments through the facility's REST backend.",
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
    /// Backend profile to use
    #[arg(long, short = 'p', env = "CAREHUB_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API base URL (overrides profile)
    #[arg(long, short = 'u', env = "CAREHUB_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Bearer token (overrides profile, env and keyring)
    #[arg(long, env = "CAREHUB_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CAREHUB_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "CAREHUB_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CAREHUB_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one identifier per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage residents
    #[command(alias = "res")]
    Residents(ResourceArgs),

    /// Manage guardians
    Guardians(ResourceArgs),

    /// Manage employees
    #[command(alias = "staff")]
    Employees(ResourceArgs),

    /// Manage assets (filterable by category, condition and text)
    #[command(alias = "a")]
    Assets(ResourceArgs),

    /// Manage asset categories
    Categories(ResourceArgs),

    /// Manage inventory items
    #[command(alias = "inv")]
    Inventory(ResourceArgs),

    /// Manage appointments
    #[command(alias = "appt")]
    Appointments(ResourceArgs),

    /// Manage user accounts
    Users(ResourceArgs),

    /// Manage roles
    Roles(ResourceArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RESOURCES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ResourceArgs {
    #[command(subcommand)]
    pub command: ResourceCommand,
}

#[derive(Debug, Subcommand)]
pub enum ResourceCommand {
    /// List one page of records
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show one record
    Get {
        /// Record ID
        id: String,
    },

    /// Create a record from a JSON body
    Create(BodyArgs),

    /// Update a record from a JSON body
    Update {
        /// Record ID
        id: String,

        #[command(flatten)]
        body: BodyArgs,

        /// Replace the whole record (PUT) instead of patching it
        #[arg(long)]
        replace: bool,
    },

    /// Delete a record
    #[command(alias = "rm")]
    Delete {
        /// Record ID
        id: String,
    },
}

/// Paging and the mutually exclusive filters for list commands.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Page number (1-based, clamped to the last page)
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Rows per page (defaults to the configured page size)
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(1..=500))]
    pub page_size: Option<u32>,

    /// Only records in this category
    #[arg(long, group = "filter")]
    pub category: Option<String>,

    /// Only records in this condition
    #[arg(long, group = "filter")]
    pub condition: Option<AssetCondition>,

    /// Free-text search
    #[arg(long, short = 's', group = "filter")]
    pub search: Option<String>,
}

/// JSON request body, inline or from a file.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct BodyArgs {
    /// Inline JSON body
    #[arg(long, short = 'd')]
    pub data: Option<String>,

    /// Read the JSON body from a file
    #[arg(long, short = 'F')]
    pub from_file: Option<PathBuf>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a profile value
    Set {
        /// Profile key (api_url, token_env, ca_cert, insecure, timeout)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a bearer token in the system keyring
    SetToken {
        /// Profile name (defaults to the active profile)
        name: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
