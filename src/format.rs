//! Rendering an [`OcrResult`] as a single display string.

use crate::{
    ocr::{OcrElement, OcrResult},
    patterns::{Pattern, PatternRegistry, PatternRule},
    rows::{cluster_rows_by_y, group_rows_by_exact_y},
};

/// Render `result` according to `pattern`.
///
/// Every pattern except [`Pattern::None`] emits zero or more lines, each
/// followed by `\n`, including the last one. [`Pattern::None`] returns the
/// full text exactly as recognized.
pub fn format_result(
    result: &OcrResult,
    pattern: Pattern,
    registry: &PatternRegistry,
) -> String {
    match registry.rule(pattern) {
        PatternRule::Verbatim => result.full_text.clone(),
        PatternRule::KeepLines(re) => append_lines(
            result
                .lines
                .iter()
                .filter(|line| re.is_match(line))
                .map(String::as_str),
        ),
        PatternRule::Positions => append_lines(
            result
                .elements
                .iter()
                .map(|e| format!("{} ({};{})", e.text, e.x, e.y)),
        ),
        PatternRule::GroupByY => append_lines(
            group_rows_by_exact_y(&result.elements)
                .iter()
                .map(|row| join_texts(row)),
        ),
        PatternRule::ClusterByY { threshold } => {
            if result.elements.is_empty() {
                return String::new();
            }
            append_lines(
                cluster_rows_by_y(&result.elements, *threshold)
                    .iter()
                    .map(|row| join_texts(row)),
            )
        }
    }
}

/// Join the text of a row's elements with single spaces.
fn join_texts(row: &[&OcrElement]) -> String {
    row.iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Concatenate lines, terminating each one with `\n`.
fn append_lines<S: AsRef<str>>(lines: impl Iterator<Item = S>) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}
