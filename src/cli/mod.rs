//! CLI argument definitions and command dispatch.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::export::ExportFormat;
use crate::notify::{RetryPolicy, RobotFormat};

/// FlashPost - export carousel slides to PNG, JPEG or PDF.
///
/// Robot Mode: Use --robot or --format=json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "flashpost", version, about, long_about = None)]
#[command(propagate_version = true)]
#[allow(clippy::struct_excessive_bools)] // CLI flags naturally use multiple bools
pub struct Cli {
    /// Output format (text for humans, json for agents/scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "FLASHPOST_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json, events as JSON lines on stderr
    #[arg(long, global = true)]
    pub robot: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output (any non-empty NO_COLOR other than 0/false/no/off)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Settings file (default: $CONFIG_DIR/flashpost/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts and agents
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }

    /// JSON flavor for command results and robot events.
    pub const fn robot_format(&self) -> RobotFormat {
        if self.use_compact_json() {
            RobotFormat::JsonCompact
        } else {
            RobotFormat::Json
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Export ===
    /// Export one slide of a deck
    Export(ExportArgs),

    /// Export every slide of a deck
    #[command(visible_alias = "batch")]
    ExportAll(ExportAllArgs),

    // === Checks ===
    /// Check whether a deck can be exported
    Check(CheckArgs),

    /// Run the export diagnosis, including a test render
    Diagnose(DiagnoseArgs),

    // === Dev server ===
    /// Serve a directory over HTTP for local development
    Serve(ServeArgs),

    // === Utilities ===
    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// === Argument Structs ===

/// Output options shared by `export` and `export-all`.
///
/// Unset values fall back to the settings file, then to the deck size.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// File type to write
    #[arg(long = "type", short = 't', value_name = "FORMAT")]
    pub file_type: Option<ExportFormat>,

    /// Output width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Pixel ratio (capped at 3)
    #[arg(long)]
    pub scale: Option<f32>,

    /// Directory to write files into
    #[arg(long, short = 'o', value_name = "DIR")]
    pub out: Option<PathBuf>,
}

/// Arguments for a single-slide export.
///
/// # Examples
///
/// ```bash
/// # Export the first slide as PNG
/// flashpost export deck.yaml
///
/// # Slide 3 as a JPEG into ./out
/// flashpost export deck.yaml --slide 3 --type jpeg --out out/
///
/// # Never prompt for the degraded retry
/// flashpost export deck.yaml --retry never
/// ```
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Deck file (.json, .yaml, .yml, .toml)
    #[arg(value_name = "DECK")]
    pub deck: PathBuf,

    /// Slide number (1-based)
    #[arg(long, short = 's', default_value = "1")]
    pub slide: usize,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Answer for the lower-quality retry prompt after a failure
    #[arg(long, value_name = "POLICY")]
    pub retry: Option<RetryPolicy>,
}

#[derive(Parser, Debug)]
pub struct ExportAllArgs {
    /// Deck file (.json, .yaml, .yml, .toml)
    #[arg(value_name = "DECK")]
    pub deck: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Deck file
    #[arg(value_name = "DECK")]
    pub deck: PathBuf,

    /// File type to check readiness for
    #[arg(long = "type", short = 't', value_name = "FORMAT")]
    pub file_type: Option<ExportFormat>,
}

#[derive(Parser, Debug)]
pub struct DiagnoseArgs {
    /// Deck file
    #[arg(value_name = "DECK")]
    pub deck: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, short = 'p', env = "PORT")]
    pub port: Option<u16>,

    /// Bind address
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Directory to serve
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
