//! The `format` subcommand.

use clap::Args;

use crate::{
    async_utils::io::{read_json_or_toml, write_text_output},
    format::format_result,
    ocr::OcrResult,
    patterns::{Pattern, PatternRegistry},
    prelude::*,
};

/// Format command line arguments.
#[derive(Debug, Args)]
pub struct FormatOpts {
    /// A saved OCR result, in JSON or TOML. Reads standard input if omitted.
    pub input_path: Option<PathBuf>,

    /// How to render the result: a pattern name or its index.
    #[clap(short = 'p', long, default_value = "none")]
    pub pattern: Pattern,

    /// The output path to write the formatted text to.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `format` subcommand.
#[instrument(level = "debug", skip_all, fields(pattern = %opts.pattern))]
pub async fn cmd_format(registry: &PatternRegistry, opts: &FormatOpts) -> Result<()> {
    let result: OcrResult = read_json_or_toml(opts.input_path.as_deref()).await?;
    debug!(
        lines = result.lines.len(),
        elements = result.elements.len(),
        "Loaded OCR result"
    );
    let text = format_result(&result, opts.pattern, registry);
    write_text_output(opts.output_path.as_deref(), &text).await
}
