//! A "recognizer" that replays a saved OCR result.

use super::{OcrResult, RecognizeOptions, Recognizer};
use crate::prelude::*;

/// Decodes the image bytes as an [`OcrResult`] JSON document.
///
/// Useful for re-running the formatter over results captured on another
/// device, and for testing the pipeline without an OCR engine installed.
#[non_exhaustive]
pub struct ReplayRecognizer;

#[async_trait]
impl Recognizer for ReplayRecognizer {
    #[instrument(level = "debug", skip_all, fields(len = image.len()))]
    async fn recognize(
        &self,
        image: &[u8],
        _options: &RecognizeOptions,
    ) -> Result<OcrResult> {
        serde_json::from_slice(image).context("cannot parse saved OCR result")
    }
}
