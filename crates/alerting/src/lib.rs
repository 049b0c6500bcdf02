//! Alerting System
//!
//! Cooldown-gated alert dispatch. Playback runs on a background thread
//! decoupled from the frame-processing loop, with tiered degradation when
//! the audio backend is unavailable.

mod backend;
mod dispatcher;

pub use backend::{AlertBackend, BackendError, ConsoleBackend};
pub use dispatcher::{AlertConfig, AlertDispatcher, AlertKind};
