//! OCR results and the recognizer interface.
//!
//! We never recognize text ourselves. A [`Recognizer`] takes raw image bytes
//! and returns an [`OcrResult`], which the rest of the program treats as an
//! immutable snapshot of one recognition pass.

use std::sync::Arc;

use clap::ValueEnum;
use schemars::JsonSchema;

use crate::prelude::*;

pub mod replay;
pub mod tesseract;

/// The locale we pass to recognizers unless configured otherwise.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// One recognized text fragment, positioned in the source image's pixel grid.
#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct OcrElement {
    /// The text of this fragment.
    pub text: String,

    /// Horizontal position, in pixels.
    pub x: i32,

    /// Vertical position, in pixels.
    pub y: i32,
}

impl OcrElement {
    /// Create a new element.
    pub fn new(text: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
        }
    }
}

/// The output of one recognition pass.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct OcrResult {
    /// All recognized text as a single string.
    pub full_text: String,

    /// Recognized lines, top to bottom, in the order the recognizer produced
    /// them.
    #[serde(default)]
    pub lines: Vec<String>,

    /// Positioned text fragments, in recognizer order.
    #[serde(default)]
    pub elements: Vec<OcrElement>,
}

/// Options passed through to the recognizer unmodified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecognizeOptions {
    /// Trade latency for accuracy.
    pub try_hard: bool,

    /// Locale of the text, e.g. `en-US`.
    pub language: String,
}

impl Default for RecognizeOptions {
    fn default() -> Self {
        Self {
            try_hard: true,
            language: DEFAULT_LANGUAGE.to_owned(),
        }
    }
}

/// Interface to an OCR engine.
#[async_trait]
pub trait Recognizer: Send + Sync + 'static {
    /// Recognize the text in an encoded image.
    async fn recognize(
        &self,
        image: &[u8],
        options: &RecognizeOptions,
    ) -> Result<OcrResult>;
}

/// The recognizers we know how to build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Engine {
    /// Run the `tesseract` command-line tool.
    #[default]
    Tesseract,
    /// Treat the "image" as a saved OCR result in JSON format.
    Replay,
}

/// Build the recognizer for `engine`.
pub fn recognizer_for_engine(
    engine: Engine,
    tesseract_command: &str,
) -> Arc<dyn Recognizer> {
    match engine {
        Engine::Tesseract => {
            Arc::new(tesseract::TesseractRecognizer::new(tesseract_command))
        }
        Engine::Replay => Arc::new(replay::ReplayRecognizer),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn ocr_result_defaults_missing_collections() {
        let result: OcrResult =
            serde_json::from_value(json!({ "full_text": "hello" })).unwrap();
        assert_eq!(result.full_text, "hello");
        assert!(result.lines.is_empty());
        assert!(result.elements.is_empty());
    }

    #[test]
    fn ocr_result_rejects_unknown_fields() {
        let err = serde_json::from_value::<OcrResult>(json!({
            "full_text": "hello",
            "words": [],
        }))
        .unwrap_err();
        assert!(err.to_string().contains("words"));
    }
}
