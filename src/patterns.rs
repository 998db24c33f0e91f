//! Output patterns, and the registry mapping each one to its rule.
//!
//! A [`Pattern`] is what the user picks. Its label is fixed by
//! [`Pattern::label`], and its behavior is looked up in a [`PatternRegistry`].
//! Filter regexes are compiled when the registry is built, so a bad regex in
//! the config file fails at startup instead of on the first scan. We build
//! one registry per process and share it.

use std::{fmt, str::FromStr};

use regex::Regex;
use schemars::JsonSchema;

use crate::{prelude::*, rows::DEFAULT_ROW_THRESHOLD};

/// Keep lines containing at least one digit.
pub const CONTAINS_DIGITS_RE: &str = r"\d+";

/// Keep lines containing no digits at all.
///
/// `regex` has no look-around, so this is the negated-class form of
/// `^(?!.*\d).*`. The two agree on single-line input, which is all we ever
/// match against. On text containing newlines they differ: `\D` also matches
/// `\n`, so a digit on any later line fails the whole match.
pub const TEXT_ONLY_RE: &str = r"^\D*$";

/// How to render an OCR result.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, JsonSchema, PartialEq, Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Pattern {
    /// The full recognized text, unchanged.
    None,
    /// Only lines containing digits.
    ContainsDigits,
    /// Only lines without any digits.
    TextOnly,
    /// Every element with its coordinates.
    ElementsPositions,
    /// Elements sharing the exact same Y coordinate, one row per line.
    ElementsGroupY,
    /// Elements clustered into rows by vertical proximity.
    ElementsGroupYClustering,
}

impl Pattern {
    /// All patterns, in display order.
    pub const ALL: [Pattern; 6] = [
        Pattern::None,
        Pattern::ContainsDigits,
        Pattern::TextOnly,
        Pattern::ElementsPositions,
        Pattern::ElementsGroupY,
        Pattern::ElementsGroupYClustering,
    ];

    /// Position of this pattern in [`Pattern::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a pattern by its position in [`Pattern::ALL`].
    pub fn from_index(index: usize) -> Option<Pattern> {
        Self::ALL.get(index).copied()
    }

    /// The kebab-case name used on the command line and in config files.
    pub fn name(self) -> &'static str {
        match self {
            Pattern::None => "none",
            Pattern::ContainsDigits => "contains-digits",
            Pattern::TextOnly => "text-only",
            Pattern::ElementsPositions => "elements-positions",
            Pattern::ElementsGroupY => "elements-group-y",
            Pattern::ElementsGroupYClustering => "elements-group-y-clustering",
        }
    }

    /// Human-readable label for pickers and listings.
    pub fn label(self) -> &'static str {
        match self {
            Pattern::None => "No pattern",
            Pattern::ContainsDigits => "With digits",
            Pattern::TextOnly => "Text only",
            Pattern::ElementsPositions => "Elements with position",
            Pattern::ElementsGroupY => "Elements grouped by Y",
            Pattern::ElementsGroupYClustering => "Elements grouped by Y Clustering",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string names no [`Pattern`].
#[derive(Debug, thiserror::Error)]
#[error("unknown pattern {0:?} (expected a name like `text-only` or an index from 0 to 5)")]
pub struct UnknownPattern(String);

impl FromStr for Pattern {
    type Err = UnknownPattern;

    /// Parse either a pattern name or its index.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(index) = s.parse::<usize>() {
            return Pattern::from_index(index).ok_or_else(|| UnknownPattern(s.to_owned()));
        }
        Pattern::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownPattern(s.to_owned()))
    }
}

/// What a pattern does to an OCR result.
#[derive(Clone, Debug)]
pub enum PatternRule {
    /// Return the full text as-is.
    Verbatim,
    /// Keep the lines matching this regex.
    KeepLines(Regex),
    /// Annotate each element with its position.
    Positions,
    /// Group elements by exact Y coordinate.
    GroupByY,
    /// Cluster elements into rows whose neighbors are at most `threshold`
    /// pixels apart vertically.
    ClusterByY { threshold: u32 },
}

/// User-supplied replacements for the built-in rules.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct PatternOverrides {
    /// Regex used by `contains-digits`.
    #[serde(default)]
    pub contains_digits: Option<String>,

    /// Regex used by `text-only`.
    #[serde(default)]
    pub text_only: Option<String>,

    /// Maximum vertical gap, in pixels, between neighbors in one row.
    #[serde(default)]
    pub row_threshold: Option<u32>,
}

/// A complete, read-only mapping from every [`Pattern`] to its rule.
#[derive(Clone, Debug)]
pub struct PatternRegistry {
    /// Indexed by [`Pattern::index`].
    rules: [PatternRule; Pattern::ALL.len()],
}

impl PatternRegistry {
    /// Build a registry, applying any overrides.
    pub fn new(overrides: &PatternOverrides) -> Result<Self> {
        let contains_digits = compile_filter(
            Pattern::ContainsDigits,
            overrides.contains_digits.as_deref().unwrap_or(CONTAINS_DIGITS_RE),
        )?;
        let text_only = compile_filter(
            Pattern::TextOnly,
            overrides.text_only.as_deref().unwrap_or(TEXT_ONLY_RE),
        )?;
        let threshold = overrides.row_threshold.unwrap_or(DEFAULT_ROW_THRESHOLD);

        let rules = Pattern::ALL.map(|pattern| match pattern {
            Pattern::None => PatternRule::Verbatim,
            Pattern::ContainsDigits => PatternRule::KeepLines(contains_digits.clone()),
            Pattern::TextOnly => PatternRule::KeepLines(text_only.clone()),
            Pattern::ElementsPositions => PatternRule::Positions,
            Pattern::ElementsGroupY => PatternRule::GroupByY,
            Pattern::ElementsGroupYClustering => PatternRule::ClusterByY { threshold },
        });
        Ok(Self { rules })
    }

    /// The registry with no overrides applied, for unit tests.
    #[cfg(test)]
    pub fn builtin() -> &'static PatternRegistry {
        static BUILTIN: std::sync::LazyLock<PatternRegistry> =
            std::sync::LazyLock::new(|| {
                PatternRegistry::new(&PatternOverrides::default())
                    .expect("built-in pattern regexes should be valid")
            });
        &BUILTIN
    }

    /// Look up the rule for `pattern`.
    pub fn rule(&self, pattern: Pattern) -> &PatternRule {
        &self.rules[pattern.index()]
    }
}

/// Compile a line filter, naming the pattern on failure.
fn compile_filter(pattern: Pattern, re: &str) -> Result<Regex> {
    Regex::new(re).with_context(|| format!("invalid regex for pattern {}: {:?}", pattern, re))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_and_variant_selection_agree() {
        for (idx, pattern) in Pattern::ALL.into_iter().enumerate() {
            assert_eq!(pattern.index(), idx);
            assert_eq!(Pattern::from_index(idx), Some(pattern));
            assert_eq!(idx.to_string().parse::<Pattern>().unwrap(), pattern);
            assert_eq!(pattern.name().parse::<Pattern>().unwrap(), pattern);
        }
        assert_eq!(Pattern::from_index(6), None);
    }

    #[test]
    fn parse_rejects_unknown_patterns() {
        assert!("6".parse::<Pattern>().is_err());
        let err = "digits".parse::<Pattern>().unwrap_err();
        assert!(err.to_string().contains("digits"));
    }

    #[test]
    fn labels_are_distinct() {
        let mut labels = Pattern::ALL.map(Pattern::label).to_vec();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), Pattern::ALL.len());
        assert_eq!(Pattern::ContainsDigits.label(), "With digits");
    }

    #[test]
    fn serde_names_match_display_names() {
        for pattern in Pattern::ALL {
            let json = serde_json::to_value(pattern).unwrap();
            assert_eq!(json, serde_json::Value::String(pattern.name().to_owned()));
        }
    }

    #[test]
    fn builtin_filters_split_lines_by_digits() {
        let registry = PatternRegistry::builtin();
        let PatternRule::KeepLines(digits) = registry.rule(Pattern::ContainsDigits) else {
            panic!("contains-digits should filter lines");
        };
        let PatternRule::KeepLines(text) = registry.rule(Pattern::TextOnly) else {
            panic!("text-only should filter lines");
        };
        for line in ["Total 12.50", "4 eggs", "abc9"] {
            assert!(digits.is_match(line), "{line}");
            assert!(!text.is_match(line), "{line}");
        }
        for line in ["Thank you", "", "---"] {
            assert!(!digits.is_match(line), "{line}");
            assert!(text.is_match(line), "{line}");
        }
    }

    #[test]
    fn text_only_filter_spans_embedded_newlines() {
        let text = Regex::new(TEXT_ONLY_RE).unwrap();
        assert!(text.is_match("Thank you\nCome again"));
        assert!(!text.is_match("Thank you\nTotal 9.99"));
    }

    #[test]
    fn builtin_clusters_with_default_threshold() {
        assert!(matches!(
            PatternRegistry::builtin().rule(Pattern::ElementsGroupYClustering),
            PatternRule::ClusterByY { threshold: DEFAULT_ROW_THRESHOLD }
        ));
    }

    #[test]
    fn overrides_replace_rules() -> Result<()> {
        let registry = PatternRegistry::new(&PatternOverrides {
            contains_digits: Some(r"^\d{4}$".to_owned()),
            text_only: None,
            row_threshold: Some(12),
        })?;
        let PatternRule::KeepLines(digits) = registry.rule(Pattern::ContainsDigits) else {
            panic!("contains-digits should filter lines");
        };
        assert!(digits.is_match("2024"));
        assert!(!digits.is_match("Total 12.50"));
        assert!(matches!(
            registry.rule(Pattern::ElementsGroupYClustering),
            PatternRule::ClusterByY { threshold: 12 }
        ));
        Ok(())
    }

    #[test]
    fn invalid_override_fails_at_construction() {
        let err = PatternRegistry::new(&PatternOverrides {
            text_only: Some("(unclosed".to_owned()),
            ..PatternOverrides::default()
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("text-only"));
    }
}
