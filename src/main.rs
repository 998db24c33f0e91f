use std::{str::FromStr, sync::Arc};

use clap::{Parser, Subcommand};
use tracing_subscriber::{
    EnvFilter, Layer as _, filter::Directive, fmt::format::FmtSpan, layer::SubscriberExt,
    util::SubscriberInitExt as _,
};

use self::{config::Config, patterns::PatternRegistry, prelude::*, ui::Ui};

mod acquire;
mod async_utils;
mod cmd;
mod config;
mod format;
mod ocr;
mod patterns;
mod pipeline;
mod prelude;
mod rows;
mod ui;

/// Recognize text in photos, and reshape it into lines, positions, or rows.
#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    after_help = r#"
Environment Variables:
  - OCR_SHAPER_CONFIG (optional): Path to a TOML or JSON config file.
  - RUST_LOG (optional): Logging filter, e.g. `debug`.

  These variables may be set in a standard `.env` file.
"#
)]
struct Opts {
    /// Path to a TOML or JSON config file.
    #[clap(long, global = true, env = "OCR_SHAPER_CONFIG")]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    subcmd: Cmd,
}

/// The subcommands we support.
#[derive(Debug, Subcommand)]
enum Cmd {
    /// List the available output patterns.
    Patterns(cmd::patterns::PatternsOpts),
    /// Format a saved OCR result using a pattern.
    Format(cmd::format::FormatOpts),
    /// Recognize one image and print the formatted result.
    Scan(cmd::scan::ScanOpts),
    /// Read commands from standard input, like the app's main screen.
    Session(cmd::session::SessionOpts),
    /// Print schemas for input and config formats.
    Schema(cmd::schema::SchemaOpts),
}

impl Cmd {
    /// Are we using stdout for output?
    fn using_stdout_for_output(&self) -> bool {
        match self {
            Cmd::Patterns(opts) => opts.output_path.is_none(),
            Cmd::Format(opts) => opts.output_path.is_none(),
            Cmd::Scan(opts) => opts.output_path.is_none(),
            Cmd::Session(_) => true,
            Cmd::Schema(opts) => opts.output_path.is_none(),
        }
    }
}

/// Our entry point, which can return an error. [`anyhow::Result`] will
/// automatically print a nice error message with optional backtrace.
#[tokio::main]
async fn main() -> Result<()> {
    let ui = Ui::init();

    // Load environment variables from a `.env` file, if it exists. This
    // happens before tracing setup so `.env` can set `RUST_LOG`.
    dotenvy::dotenv().ok();

    // Initialize tracing.
    let directive =
        Directive::from_str("info").expect("built-in directive should be valid");
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_writer(ui.get_stderr_writer())
        .with_filter(env_filter);

    // We can stack multiple layers here if we need to.
    tracing_subscriber::registry().with(subscriber).init();

    // Call our real `main` function now that logging is set up.
    real_main(ui).await
}

/// Our real entry point.
#[instrument(level = "debug", name = "main", skip_all)]
async fn real_main(ui: Ui) -> Result<()> {
    // Parse command-line arguments.
    let opts = Opts::parse();
    debug!("Parsed options: {:?}", opts);

    // Hide the spinner if we're using stdout for output.
    if opts.subcmd.using_stdout_for_output() {
        ui.hide_progress_bars();
    }

    // Load our config, and build the pattern rules everything shares.
    let config = Config::load(opts.config.as_deref()).await?;
    let registry = Arc::new(PatternRegistry::new(&config.patterns)?);

    // Run the appropriate subcommand.
    match &opts.subcmd {
        Cmd::Patterns(patterns_opts) => {
            cmd::patterns::cmd_patterns(patterns_opts).await?;
        }
        Cmd::Format(format_opts) => {
            cmd::format::cmd_format(&registry, format_opts).await?;
        }
        Cmd::Scan(scan_opts) => {
            cmd::scan::cmd_scan(ui, &config, registry.clone(), scan_opts).await?;
        }
        Cmd::Session(session_opts) => {
            cmd::session::cmd_session(&config, registry.clone(), session_opts).await?;
        }
        Cmd::Schema(schema_opts) => {
            cmd::schema::cmd_schema(schema_opts).await?;
        }
    }
    Ok(())
}
