//! Application UI. For now, this is a progress spinner and a stderr writer
//! that doesn't fight with it.
//!
//! This is adapted from `substudy` by Eric Kidd, which is licensed under
//! Apache-2.0 OR MIT. Used with permission.

use std::{borrow::Cow, io, sync::Arc, time::Duration};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Application UI state.
#[derive(Clone)]
pub struct Ui {
    /// Our progress bars.
    multi_progress: Arc<MultiProgress>,
}

impl Ui {
    /// Create a new UI.
    pub fn init() -> Ui {
        let multi_progress = Arc::new(MultiProgress::new());
        Ui { multi_progress }
    }

    /// Hide all our progress bars completely, for when we're writing actual
    /// output to `stdout`.
    pub fn hide_progress_bars(&self) {
        self.multi_progress
            .set_draw_target(ProgressDrawTarget::hidden());
    }

    /// Get a writer than can be used to write to stderr, for use with `tracing`
    /// and other output code.
    pub fn get_stderr_writer(&self) -> SafeStderrWriter {
        SafeStderrWriter { ui: self.clone() }
    }

    /// Get a reference to our progress bars.
    pub fn multi_progress(&self) -> &MultiProgress {
        &self.multi_progress
    }

    /// Create a new spinner with default settings.
    pub fn new_spinner(&self, config: &ProgressConfig<'_>) -> ProgressBar {
        let sp = ProgressBar::new_spinner().with_style(default_spinner_style());
        let sp = self.multi_progress.add(sp);
        #[cfg(test)]
        sp.set_draw_target(ProgressDrawTarget::hidden());
        sp.set_prefix(config.emoji.to_owned());
        sp.set_message(config.msg.to_owned());
        sp.enable_steady_tick(Duration::from_millis(250));
        sp.with_finish(indicatif::ProgressFinish::WithMessage(Cow::Owned(
            config.done_msg.to_owned(),
        )))
    }

    /// Show a spinner until `fut` completes.
    pub async fn spin_while<F: Future>(&self, config: &ProgressConfig<'_>, fut: F) -> F::Output {
        let sp = self.new_spinner(config);
        let output = fut.await;
        sp.finish_using_style();
        output
    }
}

/// Configuration for a spinner.
pub struct ProgressConfig<'a> {
    /// Emoji to display in the spinner.
    pub emoji: &'a str,
    /// Message to display while running.
    pub msg: &'a str,
    /// Message to display when done.
    pub done_msg: &'a str,
}

fn default_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner} {prefix:3}{msg}")
        .expect("bad progress bar template")
}

/// A writer which can used to write to `stderr`. It will hide and show progress
/// bars as needed, so that they don't interfere with the output.
#[derive(Clone)]
pub struct SafeStderrWriter {
    ui: Ui,
}

// The `tracing-indicatif` crate suggests that we should implement the following
// methods.
impl io::Write for SafeStderrWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ui.multi_progress().suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.ui.multi_progress().suspend(|| io::stderr().flush())
    }

    fn write_vectored(&mut self, bufs: &[io::IoSlice<'_>]) -> io::Result<usize> {
        self.ui
            .multi_progress()
            .suspend(|| io::stderr().write_vectored(bufs))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.ui
            .multi_progress()
            .suspend(|| io::stderr().write_all(buf))
    }

    fn write_fmt(&mut self, fmt: std::fmt::Arguments<'_>) -> io::Result<()> {
        self.ui
            .multi_progress()
            .suspend(|| io::stderr().write_fmt(fmt))
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SafeStderrWriter {
    type Writer = SafeStderrWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
