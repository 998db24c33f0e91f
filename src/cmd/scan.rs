//! The `scan` subcommand.

use std::sync::Arc;

use clap::Args;

use crate::{
    acquire::path::PathImageSource,
    async_utils::io::write_text_output,
    config::Config,
    patterns::{Pattern, PatternRegistry},
    pipeline::{Acquisition, PipelineError, ScanRequest},
    prelude::*,
    ui::{ProgressConfig, Ui},
};

use super::{EngineOpts, cancel_on_ctrl_c};

/// Scan command line arguments.
#[derive(Debug, Args)]
pub struct ScanOpts {
    /// The image to recognize, or `-` for standard input.
    #[clap(required_unless_present = "camera")]
    pub image_path: Option<PathBuf>,

    /// Capture a new photo using the configured capture command.
    #[clap(long, conflicts_with = "image_path")]
    pub camera: bool,

    /// How to render the result: a pattern name or its index.
    #[clap(short = 'p', long, default_value = "none")]
    pub pattern: Pattern,

    /// Recognize faster, but possibly miss text. Overrides the config file.
    #[clap(long)]
    pub no_try_hard: bool,

    #[clap(flatten)]
    pub engine_opts: EngineOpts,

    /// The output path to write the formatted text to.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `scan` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_scan(
    ui: Ui,
    config: &Config,
    registry: Arc<PatternRegistry>,
    opts: &ScanOpts,
) -> Result<()> {
    let pipeline = opts.engine_opts.build_pipeline(config, registry);
    let source = PathImageSource::new(
        opts.image_path.clone(),
        config.acquisition.capture_command.clone(),
    );
    let request = ScanRequest {
        acquisition: if opts.camera {
            Acquisition::Camera
        } else {
            Acquisition::File
        },
        pattern: opts.pattern,
        try_hard: config.recognition.try_hard && !opts.no_try_hard,
    };

    let cancel = cancel_on_ctrl_c();
    let outcome = ui
        .spin_while(
            &ProgressConfig {
                emoji: "🔎",
                msg: "Recognizing text",
                done_msg: "Recognized text",
            },
            pipeline.run(&source, &request, &cancel),
        )
        .await;

    match outcome {
        Ok(text) => write_text_output(opts.output_path.as_deref(), &text).await,
        // Backing out of the picker isn't an error.
        Err(PipelineError::AcquisitionCancelled) => Ok(()),
        Err(err) => Err(err.into()),
    }
}
