//! Command-line surface.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use sc_core::processing::ProcessingType;
use sc_core::WinnerPeriod;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Sweepstakes contest operator console.
#[derive(Debug, Parser)]
#[command(name = "sweep-console", version, about = "Sweepstakes contest operator console")]
pub struct Cli {
    /// TOML configuration file (defaults to SWEEP_CONSOLE_* environment variables)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    pub output: OutputFormat,

    /// Debug-level logging for the console crates
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// The (client, project) pair a command works on.
#[derive(Debug, Clone, Args)]
pub struct Target {
    /// Client (bucket) name
    #[arg(long)]
    pub client: String,
    /// Project handle, e.g. 0007
    #[arg(long)]
    pub project: String,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check backend health
    Health,

    /// List clients
    Clients,

    /// List the projects of a client
    Projects {
        #[arg(long)]
        client: String,
    },

    /// Show, submit or delete contest rules
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Trigger data processing
    Process {
        #[command(flatten)]
        target: Target,
        #[arg(long, value_enum, default_value = "final")]
        kind: ProcessingKind,
    },

    /// Show processing status
    Status {
        #[command(flatten)]
        target: Target,
        /// Keep polling until processing completes or fails
        #[arg(long)]
        watch: bool,
    },

    /// List validated entry files
    Files {
        #[command(flatten)]
        target: Target,
    },

    /// Winner listing, selection and export
    Winners {
        #[command(subcommand)]
        action: WinnersAction,
    },

    /// Receipt keyword used for OCR matching
    Keyword {
        #[command(subcommand)]
        action: KeywordAction,
    },

    /// Receipt batch uploads
    Receipts {
        #[command(subcommand)]
        action: ReceiptsAction,
    },

    /// Create a client and/or project
    Provision(ProvisionArgs),

    /// Show scan analytics
    Analytics {
        #[command(flatten)]
        target: Target,
        /// Ask the backend to recompute before showing
        #[arg(long)]
        refresh: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum RulesAction {
    /// Show the saved rules, or the template that would be used
    Show {
        #[command(flatten)]
        target: Target,
    },
    /// Create or update the rules
    Submit {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        edits: RulesEdits,
    },
    /// Delete the saved rules
    Delete {
        #[command(flatten)]
        target: Target,
    },
}

/// Field overrides applied on top of the saved rules or the template.
#[derive(Debug, Clone, Default, Args)]
pub struct RulesEdits {
    #[arg(long)]
    pub age_min: Option<u32>,
    #[arg(long)]
    pub age_max: Option<u32>,
    /// Comma-separated region codes, e.g. CA,NY
    #[arg(long, value_delimiter = ',')]
    pub regions: Option<Vec<String>>,
    #[arg(long)]
    pub entry_start: Option<NaiveDate>,
    #[arg(long)]
    pub entry_end: Option<NaiveDate>,
    #[arg(long)]
    pub max_entries: Option<i64>,
    #[arg(long)]
    pub total_winners: Option<i64>,
    /// Winner rule as COUNT:PERIOD (repeatable), e.g. 2:day
    #[arg(long = "winner-rule", value_parser = parse_winner_rule)]
    pub winner_rules: Vec<(i64, WinnerPeriod)>,
    #[arg(long)]
    pub grand_prize: Option<String>,
    /// Runner-up prize (repeatable)
    #[arg(long = "runner-up")]
    pub runner_ups: Vec<String>,
}

impl RulesEdits {
    pub fn is_empty(&self) -> bool {
        self.age_min.is_none()
            && self.age_max.is_none()
            && self.regions.is_none()
            && self.entry_start.is_none()
            && self.entry_end.is_none()
            && self.max_entries.is_none()
            && self.total_winners.is_none()
            && self.winner_rules.is_empty()
            && self.grand_prize.is_none()
            && self.runner_ups.is_empty()
    }
}

fn parse_winner_rule(value: &str) -> Result<(i64, WinnerPeriod), String> {
    let (count, period) = value
        .split_once(':')
        .ok_or_else(|| format!("expected COUNT:PERIOD, got `{value}`"))?;
    let count = count
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid count `{count}`: {e}"))?;
    let period = WinnerPeriod::parse(period)
        .ok_or_else(|| format!("unknown period `{period}` (hour, day, week, month, year, state)"))?;
    Ok((count, period))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProcessingKind {
    Final,
    Temp,
}

impl From<ProcessingKind> for ProcessingType {
    fn from(kind: ProcessingKind) -> Self {
        match kind {
            ProcessingKind::Final => ProcessingType::Final,
            ProcessingKind::Temp => ProcessingType::Temp,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum WinnersAction {
    List {
        #[command(flatten)]
        target: Target,
    },
    /// Select winners (requires completed processing with eligible contestants)
    Select {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        count: u32,
    },
    /// Print a download link for the winners export
    Export {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Debug, Subcommand)]
pub enum KeywordAction {
    Get {
        #[command(flatten)]
        target: Target,
    },
    Set {
        #[command(flatten)]
        target: Target,
        keyword: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ReceiptsAction {
    /// Upload a .zip receipt archive and wait for its summary
    Upload {
        #[command(flatten)]
        target: Target,
        file: PathBuf,
        /// Use the partner upload channel
        #[arg(long)]
        partner: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ProvisionArgs {
    /// Name of a new client to create
    #[arg(long, conflicts_with = "client", required_unless_present = "client")]
    pub new_client: Option<String>,
    /// Existing client to add the project to
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub project: String,
    #[arg(long)]
    pub flight_start: NaiveDate,
    #[arg(long)]
    pub flight_end: NaiveDate,
}
