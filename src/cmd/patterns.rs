//! The `patterns` subcommand.

use clap::Args;

use crate::{async_utils::io::write_text_output, patterns::Pattern, prelude::*};

/// Patterns command line arguments.
#[derive(Debug, Args)]
pub struct PatternsOpts {
    /// The output path to write the listing to.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// List the available patterns as `index<TAB>name<TAB>label` lines.
pub fn pattern_listing() -> String {
    Pattern::ALL
        .into_iter()
        .map(|p| format!("{}\t{}\t{}\n", p.index(), p.name(), p.label()))
        .collect()
}

/// The `patterns` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_patterns(opts: &PatternsOpts) -> Result<()> {
    write_text_output(opts.output_path.as_deref(), &pattern_listing()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_pattern_in_order() {
        let listing = pattern_listing();
        let lines = listing.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "0\tnone\tNo pattern");
        assert_eq!(
            lines[5],
            "5\telements-group-y-clustering\tElements grouped by Y Clustering"
        );
    }
}
