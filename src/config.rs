//! Configuration file support.
//!
//! Every field is optional. A missing config file means "use the defaults",
//! and the file may be written in either TOML or JSON.

use std::time::Duration;

use schemars::JsonSchema;

use crate::{
    acquire::DEFAULT_READ_TIMEOUT,
    async_utils::io::read_json_or_toml,
    ocr::DEFAULT_LANGUAGE,
    patterns::PatternOverrides,
    prelude::*,
};

/// Top-level configuration.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct Config {
    /// Settings passed to the OCR engine.
    #[serde(default)]
    pub recognition: RecognitionConfig,

    /// Where images come from.
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Replacements for the built-in pattern rules.
    #[serde(default)]
    pub patterns: PatternOverrides,
}

impl Config {
    /// Load our config from `path`, or return the defaults if there's no path.
    #[instrument(level = "debug")]
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => read_json_or_toml(Some(path))
                .await
                .with_context(|| format!("Failed to load config from {:?}", path)),
            None => Ok(Self::default()),
        }
    }
}

/// Settings passed to the OCR engine.
#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case", deny_unknown_fields)]
pub struct RecognitionConfig {
    /// Locale of the text to recognize.
    pub language: String,

    /// Spend more time to recognize more text.
    pub try_hard: bool,

    /// How to invoke tesseract.
    pub tesseract_command: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_owned(),
            try_hard: true,
            tesseract_command: "tesseract".to_owned(),
        }
    }
}

/// Where images come from.
#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case", deny_unknown_fields)]
pub struct AcquisitionConfig {
    /// Give up reading an image after this many seconds. 0 waits forever.
    pub read_timeout_secs: u64,

    /// Program and arguments that capture a photo and write it to stdout.
    /// Capturing is unsupported if this is not set.
    pub capture_command: Option<Vec<String>>,
}

impl AcquisitionConfig {
    /// The read timeout as a [`Duration`], if there is one.
    pub fn read_timeout(&self) -> Option<Duration> {
        timeout_from_secs(self.read_timeout_secs)
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            read_timeout_secs: DEFAULT_READ_TIMEOUT.as_secs(),
            capture_command: None,
        }
    }
}

/// Convert seconds to a timeout, where 0 means "no timeout".
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
