//! Audio/visual alert backends.

use thiserror::Error;
use tracing::warn;

/// Backend error types.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Playback failed: {0}")]
    Playback(String),
}

/// An audio/visual indication that can loop until stopped.
///
/// The dispatcher works with any backend or with none. A failing
/// `start_loop` makes the playback thread fall through to the textual
/// tier; it never reaches the caller of `trigger`.
pub trait AlertBackend: Send + 'static {
    /// Begin the looping indication.
    fn start_loop(&mut self) -> Result<(), BackendError>;

    /// End the looping indication. Must be safe when not looping.
    fn stop_loop(&mut self);
}

/// Last-resort textual indication: a console bell per heartbeat.
///
/// Used as the bottom degradation tier; it cannot fail.
#[derive(Debug, Default)]
pub struct ConsoleBackend;

impl ConsoleBackend {
    /// Emit one audible/textual heartbeat.
    pub fn beep(kind: &str) {
        // ASCII bell; visible even without a terminal bell via the log line.
        eprint!("\x07");
        warn!(kind, "ALERT");
    }
}
