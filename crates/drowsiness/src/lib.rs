//! Drowsiness Monitoring Orchestrator
//!
//! Fuses per-frame eye, mouth, and head-pose signals into a single
//! drowsiness assessment and drives the cooldown-gated alert dispatcher.
//! The face/landmark detector is an external collaborator behind the
//! [`LandmarkProvider`] trait; frame acquisition is decoupled via
//! `camera_stream::FrameSource`.

pub mod config;
pub mod monitor;
pub mod result;

pub use config::MonitorConfig;
pub use monitor::{DrowsinessMonitor, LandmarkProvider, MonitorStats};
pub use result::DetectionResult;
