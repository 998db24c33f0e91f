//! One user action: acquire an image, recognize it, and format the result.
//!
//! All failures are returned as a [`PipelineError`] after being logged here,
//! so callers only need to decide how to present them. Only one run may be
//! in flight at a time; overlapping runs are rejected with
//! [`PipelineError::Busy`].

use std::{sync::Arc, time::Duration};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::{
    acquire::{ImageSource, ReadError, read_image_bytes},
    format::format_result,
    ocr::{RecognizeOptions, Recognizer},
    patterns::{Pattern, PatternRegistry},
    prelude::*,
};

/// Where the image comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acquisition {
    /// Take a new photo.
    Camera,
    /// Pick an existing photo.
    File,
}

/// What the user asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanRequest {
    /// Where the image comes from.
    pub acquisition: Acquisition,
    /// How to render the result.
    pub pattern: Pattern,
    /// Ask the recognizer to try harder.
    pub try_hard: bool,
}

/// Why a pipeline run produced no result.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Another run is still in flight.
    #[error("a scan is already in progress")]
    Busy,

    /// The user backed out of the camera or picker, or the run was cancelled.
    #[error("no image was chosen")]
    AcquisitionCancelled,

    /// This device can't take photos.
    #[error("image capture is not supported on this device")]
    CaptureUnsupported,

    /// The camera or picker failed.
    #[error("could not acquire image: {0:#}")]
    AcquisitionFailed(anyhow::Error),

    /// The image source stalled.
    #[error("reading the image took longer than {0:?}")]
    ReadTimeout(Duration),

    /// The OCR engine failed.
    #[error("text recognition failed: {0:#}")]
    RecognitionFailure(anyhow::Error),
}

impl From<ReadError> for PipelineError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::TimedOut(limit) => PipelineError::ReadTimeout(limit),
            ReadError::Io(err) => PipelineError::AcquisitionFailed(err.into()),
        }
    }
}

/// Acquisition, recognition, and formatting, wired together.
pub struct Pipeline {
    /// Our OCR engine.
    recognizer: Arc<dyn Recognizer>,

    /// Shared, read-only pattern rules.
    registry: Arc<PatternRegistry>,

    /// Locale passed to the recognizer.
    language: String,

    /// Limit on how long reading image bytes may take.
    read_timeout: Option<Duration>,

    /// Permits one run at a time.
    in_flight: Semaphore,
}

impl Pipeline {
    /// Create a new pipeline.
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        registry: Arc<PatternRegistry>,
        language: impl Into<String>,
        read_timeout: Option<Duration>,
    ) -> Self {
        Self {
            recognizer,
            registry,
            language: language.into(),
            read_timeout,
            in_flight: Semaphore::new(1),
        }
    }

    /// Run the whole pipeline once, returning the text to display.
    #[instrument(level = "debug", skip_all, fields(acquisition = ?request.acquisition, pattern = %request.pattern))]
    pub async fn run(
        &self,
        source: &dyn ImageSource,
        request: &ScanRequest,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        let Ok(_permit) = self.in_flight.try_acquire() else {
            warn!("Ignoring scan request while another scan is running");
            return Err(PipelineError::Busy);
        };

        let result = self.run_inner(source, request, cancel).await;
        match &result {
            Ok(text) => debug!(len = text.len(), "Scan produced a result"),
            Err(PipelineError::AcquisitionCancelled) => info!("No image chosen"),
            Err(err @ PipelineError::CaptureUnsupported) => warn!("{}", err),
            Err(err) => error!("Scan failed: {}", err),
        }
        result
    }

    /// Perform actual work for `run`.
    async fn run_inner(
        &self,
        source: &dyn ImageSource,
        request: &ScanRequest,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        let byte_source = match request.acquisition {
            Acquisition::Camera => {
                if !source.capture_supported() {
                    return Err(PipelineError::CaptureUnsupported);
                }
                until_cancelled(cancel, source.capture_photo()).await?
            }
            Acquisition::File => until_cancelled(cancel, source.pick_photo()).await?,
        }
        .map_err(PipelineError::AcquisitionFailed)?
        .ok_or(PipelineError::AcquisitionCancelled)?;

        let image =
            until_cancelled(cancel, read_image_bytes(byte_source, self.read_timeout))
                .await??;
        if image.is_empty() {
            return Err(PipelineError::AcquisitionCancelled);
        }

        let options = RecognizeOptions {
            try_hard: request.try_hard,
            language: self.language.clone(),
        };
        let ocr_result = until_cancelled(cancel, self.recognizer.recognize(&image, &options))
            .await?
            .map_err(PipelineError::RecognitionFailure)?;
        debug!(
            lines = ocr_result.lines.len(),
            elements = ocr_result.elements.len(),
            "Recognized text"
        );

        Ok(format_result(&ocr_result, request.pattern, &self.registry))
    }
}

/// Await `fut`, unless `cancel` fires first.
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, PipelineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::AcquisitionCancelled),
        output = fut => Ok(output),
    }
}
