//! Asynchronous utilities for use with Tokio.

use regex::Regex;

use crate::prelude::*;

pub mod io;

/// Report any command failures, and include any error output.
///
/// The output of standard error will be logged. Standard error may be
/// optionally checked against a regex to determine if the command failed.
/// Standard output is not logged, because it is usually binary image data or
/// a large TSV table.
pub fn check_for_command_failure(
    command_name: &str,
    output: &std::process::Output,
    error_regex: Option<&Regex>,
) -> Result<()> {
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(
        command_name = command_name,
        stdout_len = output.stdout.len(),
        "Command finished"
    );
    if !stderr.trim().is_empty() {
        warn!(
            command_name = command_name,
            output = %stderr,
            "Standard error from command",
        );
    }

    if output.status.success() {
        if let Some(regex) = error_regex {
            if regex.is_match(&stderr) {
                return Err(anyhow!(
                    "{} printed error output:\n{}",
                    command_name,
                    stderr,
                ));
            }
        }
        Ok(())
    } else if let Some(exit_code) = output.status.code() {
        Err(anyhow!(
            "{} failed with exit code {} and error output:\n{}",
            command_name,
            exit_code,
            stderr,
        ))
    } else {
        Err(anyhow!(
            "{} failed with error output:\n{}",
            command_name,
            stderr,
        ))
    }
}
