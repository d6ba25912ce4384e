//! FlashPost CLI - export carousel slides to PNG, JPEG or PDF.
//!
//! Provides both human-friendly and agent-friendly (robot mode) interfaces.
#![forbid(unsafe_code)]

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn};

use flashpost::cli::{self, Cli, Commands, OutputArgs};
use flashpost::config::{Settings, load_deck, resolve_path};
use flashpost::download::FileDownloader;
use flashpost::error::{FpError, Result, ResultExt};
use flashpost::export::{ExportRequest, Exporter, SmokeTest};
use flashpost::logging::init_logging;
use flashpost::notify::{HumanNotifier, Notifier, RetryPolicy, RobotNotifier};
use flashpost::pdf::PdfWriter;
use flashpost::raster::BoxRasterizer;
use flashpost::server::{self, ServerConfig};
use flashpost::slides::{Deck, DeckStore, SlideStore};
use flashpost::theme::FpTheme;

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> &'static str {
        option_env!("VERGEN_GIT_DIRTY").unwrap_or("false")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Handle no-color flag or non-TTY
    if cli.no_color || !io::stdout().is_terminal() {
        console::set_colors_enabled(false);
    }
    if cli.no_color || !io::stderr().is_terminal() {
        console::set_colors_enabled_stderr(false);
    }

    init_logging(cli.robot, cli.verbose, cli.quiet);

    if let Err(e) = run(&cli).await {
        output_error(&cli, &e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        None => print_quick_start(cli),
        Some(Commands::Export(args)) => cmd_export(cli, args).await,
        Some(Commands::ExportAll(args)) => cmd_export_all(cli, args).await,
        Some(Commands::Check(args)) => cmd_check(cli, args),
        Some(Commands::Diagnose(args)) => cmd_diagnose(cli, args),
        Some(Commands::Serve(args)) => cmd_serve(cli, args).await,
        Some(Commands::Version) => cmd_version(cli),
        Some(Commands::Completions(args)) => cmd_completions(cli, args),
    }
}

// === Quick Start (Robot Mode Optimized) ===

/// Prints quick-start help optimized for both humans and AI agents.
#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn print_quick_start(cli: &Cli) -> Result<()> {
    if cli.use_json() {
        print_robot_quick_start(cli);
    } else {
        print_human_quick_start(cli);
    }
    Ok(())
}

fn print_robot_quick_start(cli: &Cli) {
    let help = RobotQuickStart {
        tool: "flashpost",
        version: build_info::VERSION,
        description: "Carousel slide exporter (PNG, JPEG, PDF) with robot mode for AI agents",
        export: RobotExport {
            single: "flashpost export <DECK> --slide <N> --type png|jpeg|pdf",
            all: "flashpost export-all <DECK> --type pdf --out <DIR>",
            no_prompt: "flashpost export <DECK> --retry always|never",
        },
        checks: RobotChecks {
            readiness: "flashpost check <DECK> --type pdf --robot",
            diagnose: "flashpost diagnose <DECK> --robot",
        },
        deck_formats: ".json, .yaml, .yml, .toml",
        output_modes: OutputModes {
            human: "--format=text (default)",
            robot: "--robot or --format=json (events on stderr, results on stdout)",
            compact: "--format=json-compact",
        },
        dev_server: "flashpost serve --port 8080 --root <DIR>",
    };

    output_json(cli, &help);
}

fn print_human_quick_start(cli: &Cli) {
    let theme = theme_for(cli);
    println!(
        "{} {} - carousel slide exporter\n",
        theme.header.apply_to("flashpost"),
        build_info::VERSION
    );

    println!("{}", theme.value.apply_to("QUICK START").underlined());
    println!();
    println!("  {}  Export slide 1 as PNG", theme.success.apply_to("flashpost export deck.yaml"));
    println!(
        "  {}  Export slide 3 as JPEG",
        theme.success.apply_to("flashpost export deck.yaml -s 3 -t jpeg")
    );
    println!(
        "  {}  Export every slide as PDF",
        theme.success.apply_to("flashpost export-all deck.yaml -t pdf")
    );
    println!("  {}  Check export readiness", theme.success.apply_to("flashpost check deck.yaml"));
    println!("  {}  Diagnose export problems", theme.success.apply_to("flashpost diagnose deck.yaml"));
    println!("  {}  Serve a directory locally", theme.success.apply_to("flashpost serve --open"));
    println!();

    println!("{}", theme.value.apply_to("ROBOT MODE (for AI agents)").underlined());
    println!();
    println!("  {}  JSON output", theme.info.apply_to("flashpost --robot <command>"));
    println!("  {}  Quick-start JSON", theme.info.apply_to("flashpost --robot"));
    println!();

    println!("Run {} for full help", theme.warning.apply_to("flashpost --help"));
}

// === Robot Mode JSON Structures ===

#[derive(Serialize)]
struct RobotQuickStart {
    tool: &'static str,
    version: &'static str,
    description: &'static str,
    export: RobotExport,
    checks: RobotChecks,
    deck_formats: &'static str,
    output_modes: OutputModes,
    dev_server: &'static str,
}

#[derive(Serialize)]
struct RobotExport {
    single: &'static str,
    all: &'static str,
    no_prompt: &'static str,
}

#[derive(Serialize)]
struct RobotChecks {
    readiness: &'static str,
    diagnose: &'static str,
}

#[derive(Serialize)]
struct OutputModes {
    human: &'static str,
    robot: &'static str,
    compact: &'static str,
}

#[derive(Serialize)]
struct ExportResult<'a, T: Serialize> {
    ok: bool,
    output_dir: &'a Path,
    #[serde(flatten)]
    result: &'a T,
}

// === Command Implementations ===

async fn cmd_export(cli: &Cli, args: &cli::ExportArgs) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    let deck = load_deck(&args.deck)?;
    let request = build_request(&settings, &args.output, &deck);
    let retry = args.retry.unwrap_or(settings.export.retry);
    let out_dir = output_dir(&settings, &args.output)?;

    let mut store = DeckStore::new(deck)?;
    let count = store.slides().len();
    if count == 0 {
        return Err(FpError::NoSlides);
    }
    if args.slide == 0 || args.slide > count {
        return Err(FpError::SlideIndexOutOfRange {
            index: args.slide,
            count,
        });
    }
    store.set_active(args.slide - 1)?;
    store.render()?;

    let exporter = build_exporter(cli, &settings, &out_dir, retry);
    let outcome = exporter.export_single_slide(&mut store, &request).await?;

    if cli.use_json() {
        output_json(
            cli,
            &ExportResult {
                ok: true,
                output_dir: &out_dir,
                result: &outcome,
            },
        );
    } else if !cli.quiet {
        println!("{}", out_dir.join(&outcome.filename).display());
    }
    Ok(())
}

async fn cmd_export_all(cli: &Cli, args: &cli::ExportAllArgs) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    let deck = load_deck(&args.deck)?;
    let request = build_request(&settings, &args.output, &deck);
    let out_dir = output_dir(&settings, &args.output)?;

    let mut store = DeckStore::new(deck)?;
    // Batch exports never prompt.
    let exporter = build_exporter(cli, &settings, &out_dir, RetryPolicy::Never);
    let report = exporter.export_all_slides(&mut store, &request).await?;

    if cli.use_json() {
        output_json(
            cli,
            &ExportResult {
                ok: report.is_success(),
                output_dir: &out_dir,
                result: &report,
            },
        );
    } else if !cli.quiet {
        for outcome in &report.exported {
            println!("{}", out_dir.join(&outcome.filename).display());
        }
    }

    if report.succeeded == 0 {
        return Err(FpError::Other(format!(
            "No slides were exported ({})",
            report.summary()
        )));
    }
    Ok(())
}

fn cmd_check(cli: &Cli, args: &cli::CheckArgs) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    let format = args.file_type.unwrap_or(settings.export.format);
    let store = DeckStore::new(load_deck(&args.deck)?)?;

    let exporter = build_exporter(cli, &settings, Path::new("."), RetryPolicy::Never);
    let report = exporter.check_export_readiness(&store, format);

    if cli.use_json() {
        output_json(cli, &report);
    } else if !cli.quiet {
        let theme = theme_for(cli);
        if report.ready {
            println!("{} Ready to export as {format}", theme.success.apply_to("[OK]"));
        } else {
            println!("{} Not ready to export as {format}", theme.error.apply_to("[ERR]"));
            for issue in &report.issues {
                println!("  - {issue}");
            }
        }
    }

    if report.ready {
        Ok(())
    } else {
        Err(FpError::Other(format!(
            "Export not ready: {}",
            report.issues.join("; ")
        )))
    }
}

fn cmd_diagnose(cli: &Cli, args: &cli::DiagnoseArgs) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    let store = DeckStore::new(load_deck(&args.deck)?)?;

    let exporter = build_exporter(cli, &settings, Path::new("."), RetryPolicy::Never);
    let diagnosis = exporter.diagnose_export_issues(&store);

    if cli.use_json() {
        output_json(cli, &diagnosis);
    } else if !cli.quiet {
        let theme = theme_for(cli);
        let row = |label: &str, value: &str| {
            println!("  {:<12} {}", theme.label.apply_to(label), theme.value.apply_to(value));
        };
        println!("{}", theme.header.apply_to("Export diagnosis"));
        row("rasterizer", diagnosis.rasterizer.as_deref().unwrap_or("missing"));
        row("pdf engine", diagnosis.pdf_backend.as_deref().unwrap_or("missing"));
        row("slides", &diagnosis.slide_count.to_string());
        let smoke = match &diagnosis.smoke_test {
            SmokeTest::Passed { width, height } => {
                format!("passed ({width}x{height})")
            }
            SmokeTest::Failed { error } => format!("failed: {error}"),
            SmokeTest::Skipped => "skipped".to_string(),
        };
        row("test render", &smoke);
        for issue in &diagnosis.readiness.issues {
            println!("  {} {issue}", theme.warning.apply_to("[WARN]"));
        }
    }

    if diagnosis.is_healthy() {
        Ok(())
    } else {
        Err(FpError::Other("Export diagnosis found problems".to_string()))
    }
}

async fn cmd_serve(cli: &Cli, args: &cli::ServeArgs) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    let mut config = ServerConfig::from(&settings.server);
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    let root = args.root.clone().unwrap_or(config.root);
    config.root = resolve_path(&root, &std::env::current_dir().with_context(|| "reading current directory")?)?;

    let url = config.url();
    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "url": url,
                "root": config.root.display().to_string(),
                "listening": true,
            }),
        );
    } else if !cli.quiet {
        let theme = theme_for(cli);
        println!(
            "Serving {} at {}",
            theme.filename.apply_to(config.root.display()),
            theme.info.apply_to(&url)
        );
        println!("{}", theme.muted.apply_to("Press Ctrl+C to stop"));
    }

    if args.open {
        if let Err(e) = open::that(&url) {
            warn!(error = %e, url = %url, "Failed to open browser");
        }
    }

    server::serve(&config, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_version(cli: &Cli) -> Result<()> {
    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "version": build_info::VERSION,
                "git_sha": build_info::git_sha(),
                "git_dirty": build_info::git_dirty() == "true",
                "build_timestamp": build_info::build_timestamp(),
                "rustc_version": build_info::rustc_semver(),
                "target": build_info::target(),
            }),
        );
    } else {
        println!("flashpost {}", build_info::VERSION);
        println!(
            "git: {}{}",
            build_info::git_sha(),
            if build_info::git_dirty() == "true" {
                " (dirty)"
            } else {
                ""
            }
        );
        println!("built: {}", build_info::build_timestamp());
        println!("rustc: {}", build_info::rustc_semver());
        println!("target: {}", build_info::target());
    }
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_completions(_cli: &Cli, args: &cli::CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "flashpost", &mut io::stdout());
    Ok(())
}

// === Utility Functions ===

/// Flags first, then settings, then the deck's own slide size.
fn build_request(settings: &Settings, output: &OutputArgs, deck: &Deck) -> ExportRequest {
    let defaults = &settings.export;
    ExportRequest::new(
        output.file_type.unwrap_or(defaults.format),
        output.width.or(defaults.width).unwrap_or(deck.theme.width),
        output.height.or(defaults.height).unwrap_or(deck.theme.height),
        output.scale.unwrap_or(defaults.scale),
    )
}

fn output_dir(settings: &Settings, output: &OutputArgs) -> Result<PathBuf> {
    let dir = output
        .out
        .clone()
        .or_else(|| settings.export.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    resolve_path(&dir, &std::env::current_dir().with_context(|| "reading current directory")?)
}

fn build_notifier(cli: &Cli, retry: RetryPolicy) -> Arc<dyn Notifier> {
    if cli.use_json() {
        Arc::new(RobotNotifier::new(retry))
    } else {
        let use_color = !cli.no_color && io::stderr().is_terminal();
        Arc::new(HumanNotifier::new(use_color, cli.quiet, retry))
    }
}

fn build_exporter(cli: &Cli, settings: &Settings, out_dir: &Path, retry: RetryPolicy) -> Exporter {
    Exporter::new(
        build_notifier(cli, retry),
        Arc::new(FileDownloader::new(out_dir)),
    )
    .with_rasterizer(Arc::new(BoxRasterizer::new()))
    .with_pdf_backend(Arc::new(PdfWriter::new()))
    .with_timings(settings.timings.to_timings())
}

fn theme_for(cli: &Cli) -> FpTheme {
    if cli.no_color {
        FpTheme::plain()
    } else {
        FpTheme::default()
    }
}

fn output_json<T: Serialize>(cli: &Cli, data: &T) {
    match cli.robot_format().render(data) {
        Ok(json) => println!("{json}"),
        Err(e) => error!(error = %e, "Failed to serialize output"),
    }
}

fn output_error(cli: &Cli, error: &FpError) {
    if cli.use_json() {
        let json = serde_json::json!({
            "error": true,
            "kind": error.kind(),
            "message": error.to_string(),
            "suggestion": error.suggestion(),
            "recoverable": error.is_user_recoverable(),
        });
        match cli.robot_format().render(&json) {
            Ok(rendered) => eprintln!("{rendered}"),
            Err(_) => eprintln!("{error}"),
        }
    } else {
        let theme = theme_for(cli);
        eprintln!("{}: {}", theme.error.apply_to("Error").for_stderr(), error);
        if let Some(suggestion) = error.suggestion() {
            eprintln!("{}: {}", theme.warning.apply_to("Hint").for_stderr(), suggestion);
        }
    }
}
