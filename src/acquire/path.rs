//! An image source for the command line: files, stdin, and capture commands.

use std::io::Cursor;

use tokio::{fs::File, process::Command};

use super::{ByteSource, ImageSource};
use crate::{async_utils::check_for_command_failure, prelude::*};

/// Picks a file (or `-` for standard input), and captures photos by running
/// an external command that writes an image to stdout.
#[derive(Clone, Debug, Default)]
pub struct PathImageSource {
    /// What the "picker" chooses. `None` behaves like a cancelled picker.
    pick_path: Option<PathBuf>,

    /// Program and arguments used to capture a photo.
    capture_command: Option<Vec<String>>,
}

impl PathImageSource {
    /// Create a new source.
    pub fn new(pick_path: Option<PathBuf>, capture_command: Option<Vec<String>>) -> Self {
        Self {
            pick_path,
            // An empty command line can't capture anything.
            capture_command: capture_command.filter(|cmd| !cmd.is_empty()),
        }
    }
}

#[async_trait]
impl ImageSource for PathImageSource {
    fn capture_supported(&self) -> bool {
        self.capture_command.is_some()
    }

    #[instrument(level = "debug", skip_all)]
    async fn capture_photo(&self) -> Result<Option<ByteSource>> {
        let Some((program, args)) = self
            .capture_command
            .as_ref()
            .and_then(|cmd| cmd.split_first())
        else {
            return Err(anyhow!("no capture command is configured"));
        };
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .with_context(|| format!("cannot run capture command {:?}", program))?;
        check_for_command_failure(program, &output, None)?;

        // A capture tool that exits cleanly without an image was cancelled.
        if output.stdout.is_empty() {
            debug!("Capture command produced no image");
            return Ok(None);
        }
        Ok(Some(Box::pin(Cursor::new(output.stdout))))
    }

    #[instrument(level = "debug", skip_all, fields(path = ?self.pick_path))]
    async fn pick_photo(&self) -> Result<Option<ByteSource>> {
        match self.pick_path.as_deref() {
            None => Ok(None),
            Some(path) if path == Path::new("-") => Ok(Some(Box::pin(tokio::io::stdin()))),
            Some(path) => {
                let file = File::open(path)
                    .await
                    .with_context(|| format!("Failed to open image at path: {:?}", path))?;
                Ok(Some(Box::pin(file)))
            }
        }
    }
}
