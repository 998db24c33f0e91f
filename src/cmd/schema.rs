//! The `schema` subcommand.

use clap::{Args, ValueEnum};
use schemars::schema_for;

use crate::{
    async_utils::io::write_text_output, config::Config, ocr::OcrResult, prelude::*,
};

/// The different schema types we support.
///
/// We parse these as PascalCase, because they represent type names.
#[derive(Debug, Clone, Copy, ValueEnum)]
#[clap(rename_all = "PascalCase")]
pub enum SchemaType {
    /// A saved OCR result, as read by `format` and the replay engine.
    OcrResult,
    /// The config file.
    Config,
}

/// Schema command line arguments.
#[derive(Debug, Args)]
pub struct SchemaOpts {
    /// The schema type to generate.
    #[clap(value_enum, value_name = "TYPE")]
    pub schema_type: SchemaType,

    /// The output path to write the schema to.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `schema` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_schema(schema_opts: &SchemaOpts) -> Result<()> {
    // Get our schema.
    let schema = match schema_opts.schema_type {
        SchemaType::OcrResult => schema_for!(OcrResult),
        SchemaType::Config => schema_for!(Config),
    };

    // Write out our schema.
    let mut schema_str =
        serde_json::to_string_pretty(&schema).context("failed to serialize schema")?;
    schema_str.push('\n');
    write_text_output(schema_opts.output_path.as_deref(), &schema_str).await
}
