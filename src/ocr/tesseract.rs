//! Tesseract OCR engine.

use std::{fs::File, io::Write as _};

use tokio::process::Command;

use super::{OcrElement, OcrResult, RecognizeOptions, Recognizer};
use crate::{async_utils::check_for_command_failure, prelude::*};

/// Tesseract's TSV `level` value for individual words.
const WORD_LEVEL: &str = "5";

/// Page segmentation mode for ordinary documents.
const PSM_AUTO: &str = "3";

/// Page segmentation mode that finds as much text as possible, in no
/// particular order. Slower, but better for photos.
const PSM_SPARSE_TEXT: &str = "11";

/// Recognizer wrapping the `tesseract` CLI tool.
pub struct TesseractRecognizer {
    /// The command used to invoke tesseract.
    command: String,
}

impl TesseractRecognizer {
    /// Create a new `tesseract` recognizer.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl Recognizer for TesseractRecognizer {
    #[instrument(level = "debug", skip_all, fields(len = image.len(), try_hard = options.try_hard))]
    async fn recognize(
        &self,
        image: &[u8],
        options: &RecognizeOptions,
    ) -> Result<OcrResult> {
        let extension = infer::get(image)
            .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
            .map(|kind| kind.extension())
            .ok_or_else(|| anyhow!("input does not look like a supported image"))?;
        let language = tesseract_language(&options.language)?;

        // Write our input to a temporary file.
        let tmpdir = tempfile::TempDir::with_prefix("tesseract")?;
        let input_path = tmpdir.path().join(format!("input.{}", extension));
        let mut input_file =
            File::create(&input_path).context("cannot create tesseract input file")?;
        input_file
            .write_all(image)
            .context("cannot write tesseract input file")?;
        input_file
            .flush()
            .context("cannot flush tesseract input file")?;

        let psm = if options.try_hard {
            PSM_SPARSE_TEXT
        } else {
            PSM_AUTO
        };
        let output = Command::new(&self.command)
            .arg(&input_path)
            .arg("stdout")
            .args(["-l", language, "--psm", psm, "tsv"])
            .output()
            .await
            .with_context(|| format!("cannot run {}", self.command))?;
        check_for_command_failure(&self.command, &output, None)?;

        let tsv = String::from_utf8_lossy(&output.stdout);
        parse_tsv(&tsv)
    }
}

/// Map a locale like `en-US` to a tesseract language code.
fn tesseract_language(locale: &str) -> Result<&'static str> {
    let primary = locale
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match primary.as_str() {
        "en" => Ok("eng"),
        "de" => Ok("deu"),
        "es" => Ok("spa"),
        "fr" => Ok("fra"),
        "it" => Ok("ita"),
        "nl" => Ok("nld"),
        "pt" => Ok("por"),
        _ => Err(anyhow!("no tesseract language for locale {:?}", locale)),
    }
}

/// Identifies the line a word belongs to: page, block, paragraph, line.
type LineKey<'a> = (&'a str, &'a str, &'a str, &'a str);

/// Build an [`OcrResult`] from tesseract's TSV output.
fn parse_tsv(tsv: &str) -> Result<OcrResult> {
    let mut elements = vec![];
    let mut lines: Vec<String> = vec![];
    let mut current_line: Option<LineKey<'_>> = None;

    // Skip the header row.
    for (row_idx, row) in tsv.lines().enumerate().skip(1) {
        if row.trim().is_empty() {
            continue;
        }
        let fields = row.splitn(12, '\t').collect::<Vec<_>>();
        if fields.len() < 11 {
            return Err(anyhow!(
                "tesseract TSV row {} has {} fields: {:?}",
                row_idx + 1,
                fields.len(),
                row
            ));
        }
        if fields[0] != WORD_LEVEL {
            continue;
        }
        let text = fields.get(11).map(|t| t.trim()).unwrap_or_default();
        if text.is_empty() {
            continue;
        }
        let x = fields[6]
            .parse::<i32>()
            .with_context(|| format!("bad left value in TSV row {}", row_idx + 1))?;
        let y = fields[7]
            .parse::<i32>()
            .with_context(|| format!("bad top value in TSV row {}", row_idx + 1))?;

        let key = (fields[1], fields[2], fields[3], fields[4]);
        if current_line == Some(key) {
            if let Some(line) = lines.last_mut() {
                line.push(' ');
                line.push_str(text);
            }
        } else {
            lines.push(text.to_owned());
            current_line = Some(key);
        }
        elements.push(OcrElement::new(text, x, y));
    }

    Ok(OcrResult {
        full_text: lines.join("\n"),
        lines,
        elements,
    })
}
