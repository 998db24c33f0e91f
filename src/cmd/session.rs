//! The `session` subcommand: a line-oriented stand-in for the app's main
//! screen.
//!
//! Each line on standard input is one command:
//!
//! ```text
//! pattern <name-or-index>   choose how results are rendered
//! try-hard on|off           toggle the recognizer's try-hard flag
//! camera                    capture a photo and scan it
//! file <path>               pick a photo and scan it
//! clear                     reset the displayed result
//! show                      print the displayed result
//! patterns                  list the available patterns
//! quit                      leave the session
//! ```
//!
//! After every scan or `clear`, the displayed result is printed to standard
//! output. Failed scans leave the displayed result unchanged. `file -` is
//! rejected, because standard input is the command stream. Ctrl-C ends the
//! session.

use std::{
    io::{self, BufRead as _},
    sync::Arc,
};

use clap::Args;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt as _},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;

use crate::{
    acquire::path::PathImageSource,
    config::Config,
    patterns::{Pattern, PatternRegistry},
    pipeline::{Acquisition, Pipeline, PipelineError, ScanRequest},
    prelude::*,
};

use super::{EngineOpts, cancel_on_ctrl_c, patterns::pattern_listing};

/// What we display before the first scan, and after `clear`.
pub const PLACEHOLDER: &str = "Waiting for results ..";

/// Shown when the user asks for the camera on a device without one.
const CAPTURE_UNSUPPORTED_NOTICE: &str =
    "Sorry: Image capture is not supported on this device.";

/// Session command line arguments.
#[derive(Debug, Args)]
pub struct SessionOpts {
    /// The initial pattern: a pattern name or its index.
    #[clap(short = 'p', long, default_value = "none")]
    pub pattern: Pattern,

    #[clap(flatten)]
    pub engine_opts: EngineOpts,
}

/// The result text the user is currently looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    text: String,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            text: PLACEHOLDER.to_owned(),
        }
    }
}

impl DisplayState {
    /// The current text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Go back to the placeholder.
    pub fn clear(&mut self) {
        self.text = PLACEHOLDER.to_owned();
    }

    /// Show the outcome of a scan. Successful scans replace the text, and
    /// failures leave it alone. Returns a notice for the user, if any.
    pub fn apply(&mut self, outcome: Result<String, PipelineError>) -> Option<&'static str> {
        match outcome {
            Ok(text) => {
                self.text = text;
                None
            }
            Err(PipelineError::CaptureUnsupported) => Some(CAPTURE_UNSUPPORTED_NOTICE),
            Err(_) => None,
        }
    }
}

/// One line of session input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Choose how results are rendered.
    Pattern(Pattern),
    /// Toggle the try-hard flag.
    TryHard(bool),
    /// Capture a photo and scan it.
    Camera,
    /// Pick a photo and scan it.
    File(PathBuf),
    /// Reset the displayed result.
    Clear,
    /// Print the displayed result.
    Show,
    /// List the available patterns.
    Patterns,
    /// Leave the session.
    Quit,
}

impl SessionCommand {
    /// Parse a line of input. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };
        let cmd = match (verb, arg) {
            ("pattern", arg) if !arg.is_empty() => Self::Pattern(arg.parse()?),
            ("try-hard", "on") => Self::TryHard(true),
            ("try-hard", "off") => Self::TryHard(false),
            ("camera", "") => Self::Camera,
            // Standard input already carries our commands.
            ("file", "-") => {
                return Err(anyhow!("cannot pick an image from stdin in a session"));
            }
            ("file", arg) if !arg.is_empty() => Self::File(PathBuf::from(arg)),
            ("clear", "") => Self::Clear,
            ("show", "") => Self::Show,
            ("patterns", "") => Self::Patterns,
            ("quit" | "exit", "") => Self::Quit,
            _ => return Err(anyhow!("unrecognized command: {:?}", line)),
        };
        Ok(Some(cmd))
    }
}

/// The `session` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_session(
    config: &Config,
    registry: Arc<PatternRegistry>,
    opts: &SessionOpts,
) -> Result<()> {
    let session = Session {
        pipeline: opts.engine_opts.build_pipeline(config, registry),
        capture_command: config.acquisition.capture_command.clone(),
        pattern: opts.pattern,
        try_hard: config.recognition.try_hard,
        display: DisplayState::default(),
    };
    session
        .run(
            spawn_stdin_reader(),
            &mut tokio::io::stdout(),
            &cancel_on_ctrl_c(),
        )
        .await
}

/// Read standard input on a dedicated thread, one line per message.
///
/// A blocked read on `tokio::io::stdin` would keep the runtime from shutting
/// down after an interrupt, so we keep it off the runtime entirely.
fn spawn_stdin_reader() -> mpsc::Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// The state of one interactive session.
struct Session {
    /// Runs our scans.
    pipeline: Pipeline,
    /// Passed to each scan's image source.
    capture_command: Option<Vec<String>>,
    /// How scan results are rendered.
    pattern: Pattern,
    /// Passed to the recognizer.
    try_hard: bool,
    /// What the user is looking at.
    display: DisplayState,
}

impl Session {
    /// Process commands until `quit`, end of input, or `interrupt` fires.
    ///
    /// An interrupt while waiting for a command ends the session at once. An
    /// interrupt during a scan cancels that scan, and then ends the session.
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<io::Result<String>>,
        out: &mut (impl AsyncWrite + Unpin),
        interrupt: &CancellationToken,
    ) -> Result<()> {
        loop {
            let line = tokio::select! {
                biased;
                _ = interrupt.cancelled() => {
                    info!("Interrupted, leaving session");
                    break;
                }
                line = commands.recv() => line,
            };
            let Some(line) = line else {
                break;
            };
            let line = line.context("Failed to read command")?;

            let cmd = match SessionCommand::parse(&line) {
                Ok(Some(cmd)) => cmd,
                Ok(None) => continue,
                Err(err) => {
                    warn!("{:#}", err);
                    continue;
                }
            };
            debug!(?cmd, "Session command");

            let (acquisition, pick_path) = match cmd {
                SessionCommand::Pattern(p) => {
                    self.pattern = p;
                    info!("Pattern set to {} ({})", p, p.label());
                    continue;
                }
                SessionCommand::TryHard(on) => {
                    self.try_hard = on;
                    continue;
                }
                SessionCommand::Patterns => {
                    write_display(out, &pattern_listing()).await?;
                    continue;
                }
                SessionCommand::Show => {
                    write_display(out, self.display.text()).await?;
                    continue;
                }
                SessionCommand::Clear => {
                    self.display.clear();
                    write_display(out, self.display.text()).await?;
                    continue;
                }
                SessionCommand::Quit => break,
                SessionCommand::Camera => (Acquisition::Camera, None),
                SessionCommand::File(path) => (Acquisition::File, Some(path)),
            };

            let source = PathImageSource::new(pick_path, self.capture_command.clone());
            let request = ScanRequest {
                acquisition,
                pattern: self.pattern,
                try_hard: self.try_hard,
            };
            let outcome = self.pipeline.run(&source, &request, interrupt).await;
            if let Some(notice) = self.display.apply(outcome) {
                eprintln!("{}", notice);
            }
            write_display(out, self.display.text()).await?;
        }
        Ok(())
    }
}

/// Write `text`, making sure it ends with a newline.
async fn write_display(out: &mut (impl AsyncWrite + Unpin), text: &str) -> Result<()> {
    out.write_all(text.as_bytes())
        .await
        .context("Failed to write output")?;
    if !text.ends_with('\n') {
        out.write_all(b"\n").await.context("Failed to write output")?;
    }
    out.flush().await.context("Failed to flush output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::ocr::{Engine, recognizer_for_engine};

    #[test]
    fn parses_commands() -> Result<()> {
        let cases = [
            ("pattern 2", SessionCommand::Pattern(Pattern::TextOnly)),
            (
                "pattern  elements-group-y ",
                SessionCommand::Pattern(Pattern::ElementsGroupY),
            ),
            ("try-hard off", SessionCommand::TryHard(false)),
            ("camera", SessionCommand::Camera),
            (
                "file photos/receipt one.jpg",
                SessionCommand::File(PathBuf::from("photos/receipt one.jpg")),
            ),
            ("  clear", SessionCommand::Clear),
            ("exit", SessionCommand::Quit),
        ];
        for (line, expected) in cases {
            assert_eq!(SessionCommand::parse(line)?, Some(expected), "{line}");
        }
        assert_eq!(SessionCommand::parse("")?, None);
        assert_eq!(SessionCommand::parse("# comment")?, None);
        Ok(())
    }

    #[test]
    fn rejects_bad_commands() {
        for line in [
            "pattern",
            "pattern 9",
            "try-hard maybe",
            "camera now",
            "file",
            "file -",
            "dance",
        ] {
            assert!(SessionCommand::parse(line).is_err(), "{line}");
        }
    }

    #[test]
    fn display_keeps_text_on_failure() {
        let mut display = DisplayState::default();
        assert_eq!(display.text(), PLACEHOLDER);

        assert_eq!(display.apply(Ok("Total 9.99\n".to_owned())), None);
        assert_eq!(display.text(), "Total 9.99\n");

        assert_eq!(display.apply(Err(PipelineError::AcquisitionCancelled)), None);
        assert_eq!(
            display.apply(Err(PipelineError::RecognitionFailure(anyhow!("boom")))),
            None
        );
        assert_eq!(
            display.apply(Err(PipelineError::CaptureUnsupported)),
            Some(CAPTURE_UNSUPPORTED_NOTICE)
        );
        assert_eq!(display.text(), "Total 9.99\n");

        display.clear();
        assert_eq!(display.text(), PLACEHOLDER);
    }

    fn replay_session() -> Session {
        Session {
            pipeline: Pipeline::new(
                recognizer_for_engine(Engine::Replay, "tesseract"),
                Arc::new(PatternRegistry::builtin().clone()),
                "en-US",
                None,
            ),
            capture_command: None,
            pattern: Pattern::None,
            try_hard: false,
            display: DisplayState::default(),
        }
    }

    #[tokio::test]
    async fn runs_commands_until_end_of_input() -> Result<()> {
        let (tx, rx) = mpsc::channel(8);
        for line in ["pattern 1", "file tests/fixtures/receipt.json", "camera"] {
            tx.send(Ok(line.to_owned())).await?;
        }
        drop(tx);

        let mut out = vec![];
        replay_session()
            .run(rx, &mut out, &CancellationToken::new())
            .await?;
        assert_eq!(
            String::from_utf8(out)?,
            "Milk 1.20\nBread 2.35\nMilk 1.20\nBread 2.35\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn interrupt_while_idle_ends_session() -> Result<()> {
        // Keep the sender alive, so only the interrupt can end the session.
        let (_tx, rx) = mpsc::channel::<io::Result<String>>(8);
        let interrupt = CancellationToken::new();
        let trigger = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let mut out = vec![];
        tokio::time::timeout(
            Duration::from_secs(5),
            replay_session().run(rx, &mut out, &interrupt),
        )
        .await
        .context("session ignored the interrupt")??;
        assert!(out.is_empty());
        Ok(())
    }
}
