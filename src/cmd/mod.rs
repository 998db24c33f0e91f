//! Command-line entry points.

use std::sync::Arc;

use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::{
    config::{Config, timeout_from_secs},
    ocr::{Engine, recognizer_for_engine},
    patterns::PatternRegistry,
    pipeline::Pipeline,
    prelude::*,
};

pub mod format;
pub mod patterns;
pub mod scan;
pub mod schema;
pub mod session;

/// Common options for subcommands that recognize images.
#[derive(Debug, Clone, Args)]
pub struct EngineOpts {
    /// The OCR engine to use.
    #[clap(long, value_enum, default_value = "tesseract")]
    engine: Engine,

    /// Give up reading an image after this many seconds (0 waits forever).
    /// Overrides the config file.
    #[clap(long, value_name = "SECS")]
    read_timeout: Option<u64>,
}

impl EngineOpts {
    /// Build a pipeline from these options and our config.
    pub fn build_pipeline(
        &self,
        config: &Config,
        registry: Arc<PatternRegistry>,
    ) -> Pipeline {
        let recognizer =
            recognizer_for_engine(self.engine, &config.recognition.tesseract_command);
        let read_timeout = match self.read_timeout {
            Some(secs) => timeout_from_secs(secs),
            None => config.acquisition.read_timeout(),
        };
        Pipeline::new(
            recognizer,
            registry,
            config.recognition.language.clone(),
            read_timeout,
        )
    }
}

/// Create a [`CancellationToken`] that fires when the user presses Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let child = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Received Ctrl-C, cancelling");
            child.cancel();
        }
    });
    cancel
}
