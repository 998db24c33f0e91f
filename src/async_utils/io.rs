//! I/O utilities.
//!
//! This module is responsible for reading JSON and TOML documents from files
//! or standard input, and for writing formatted text to a file or standard
//! output. Input format is detected from the file extension, or from the first
//! byte when reading standard input.

use std::{pin::Pin, task::Context};

use peekable::tokio::AsyncPeekable;
use tokio::{
    fs::File,
    io::{
        AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _, BufReader,
        BufWriter, ReadBuf,
    },
};

use crate::prelude::*;

/// A smart async reader that uses [`AsyncPeekable`] to detect whether the input is JSON
/// or something else.
pub struct SmartReader {
    /// Do we expect our input to be JSON?
    is_json_like: bool,

    /// A human-readable description of the input source, for error messages.
    description: String,

    /// Our reader. There's some [`Pin`] stuff going on here because we're
    /// defining an async reader, and we don't want the value to get moved while
    /// an async function holds pointers into it.
    reader: Pin<Box<dyn AsyncRead + Unpin + Send + Sync + 'static>>,
}

impl SmartReader {
    /// Create a new `SmartReader` from an existing reader.
    pub async fn new_from_reader(
        description: String,
        reader: impl AsyncRead + Unpin + Send + Sync + 'static,
    ) -> Result<Self> {
        let reader = BufReader::new(reader);
        let mut peekable = AsyncPeekable::new(Box::new(reader));
        let mut buffer = vec![0; 1];
        peekable
            .peek_exact(&mut buffer)
            .await
            .with_context(|| format!("Failed to read from {}", description))?;
        let is_json_like = buffer[0] == b'{';
        Ok(Self {
            is_json_like,
            description,
            reader: Box::pin(peekable),
        })
    }

    /// Create a new `SmartReader` from a [`Path`].
    pub async fn new_from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().unwrap_or_default();
        let is_json_like = ext == "json";
        let file = File::open(path)
            .await
            .with_context(|| format!("Failed to open file at path: {:?}", path))?;
        Ok(Self {
            is_json_like,
            description: path.to_string_lossy().into_owned(),
            reader: Box::pin(file),
        })
    }

    /// Create a new `SmartReader` from either a [`Path`] or standard input.
    pub async fn new_from_path_or_stdin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::new_from_path(path).await,
            None => {
                let stdin = tokio::io::stdin();
                Self::new_from_reader("stdin".to_owned(), stdin).await
            }
        }
    }

    /// Is our input JSON-like?
    pub fn is_json_like(&self) -> bool {
        self.is_json_like
    }
}

impl AsyncRead for SmartReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        // `Pin` is the most mysterious of arts in Rust.
        //
        // See https://stackoverflow.com/a/75728106 and
        // https://users.rust-lang.org/t/impl-future-around-a-poll-method-that-returns-a-ref/39202/4
        Pin::get_mut(self).reader.as_mut().poll_read(cx, buf)
    }
}

/// Read TOML or JSON from a file, or from standard input if `path` is `None`.
pub async fn read_json_or_toml<T>(path: Option<&Path>) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let mut reader = SmartReader::new_from_path_or_stdin(path).await?;
    let mut data = String::new();
    // Read all at once because our parsing libraries don't do async I/O.
    reader
        .read_to_string(&mut data)
        .await
        .with_context(|| format!("Failed to read {}", reader.description))?;
    if reader.is_json_like() {
        serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse JSON from {}", reader.description))
    } else {
        toml::from_str(&data)
            .with_context(|| format!("Failed to parse TOML from {}", reader.description))
    }
}

/// Create an [`AsyncWrite`] for a file or stdout.
pub async fn create_writer(
    path: Option<&Path>,
) -> Result<Box<dyn AsyncWrite + Unpin + Send + Sync + 'static>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .await
                .with_context(|| format!("Failed to create file at path: {:?}", path))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

/// Write a string to either standard output or a file.
pub async fn write_text_output(path: Option<&Path>, text: &str) -> Result<()> {
    let mut writer = BufWriter::new(create_writer(path).await?);
    writer
        .write_all(text.as_bytes())
        .await
        .context("Failed to write output")?;
    writer.flush().await.context("Failed to flush output")?;
    Ok(())
}
