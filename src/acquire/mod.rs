//! Getting image bytes from a camera or a picker.
//!
//! An [`ImageSource`] hands us a [`ByteSource`] (or nothing, if the user backed
//! out), and [`read_image_bytes`] drains it with an optional time limit so a
//! stalled source can't hang the pipeline.

use std::{pin::Pin, time::Duration};

use tokio::io::{AsyncRead, AsyncReadExt as _};

use crate::prelude::*;

pub mod path;

/// How long to wait for an image source to deliver its bytes.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A stream of encoded image bytes.
pub type ByteSource = Pin<Box<dyn AsyncRead + Send + 'static>>;

/// Interface to the device's camera and photo picker.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Can this source take new photos?
    fn capture_supported(&self) -> bool;

    /// Take a photo. Returns `None` if the user cancelled.
    async fn capture_photo(&self) -> Result<Option<ByteSource>>;

    /// Pick an existing photo. Returns `None` if the user cancelled.
    async fn pick_photo(&self) -> Result<Option<ByteSource>>;
}

/// Why [`read_image_bytes`] failed.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The source didn't finish within the time limit.
    #[error("image read did not finish within {0:?}")]
    TimedOut(Duration),

    /// The source reported an I/O error.
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// Read all bytes from `source`, giving up after `timeout` if one is set.
#[instrument(level = "debug", skip(source))]
pub async fn read_image_bytes(
    mut source: ByteSource,
    timeout: Option<Duration>,
) -> Result<Vec<u8>, ReadError> {
    let mut data = vec![];
    match timeout {
        Some(limit) => tokio::time::timeout(limit, source.read_to_end(&mut data))
            .await
            .map_err(|_| ReadError::TimedOut(limit))??,
        None => source.read_to_end(&mut data).await?,
    };
    debug!(len = data.len(), "Read image bytes");
    Ok(data)
}
