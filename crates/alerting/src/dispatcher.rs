//! Alert dispatcher state machine.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{AlertBackend, ConsoleBackend};

/// Interval at which the playback loop polls the stop signal.
const PLAYBACK_POLL: Duration = Duration::from_millis(100);
/// Cadence of the textual-tier heartbeat.
const TEXTUAL_HEARTBEAT: Duration = Duration::from_secs(1);
/// Bounded wait for the playback thread to observe the stop signal.
const JOIN_TIMEOUT: Duration = Duration::from_secs(1);
const JOIN_POLL: Duration = Duration::from_millis(10);

/// What the alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    /// Sustained eye closure or head droop.
    Drowsiness,
    /// Repeated yawning in a short window.
    Fatigue,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Drowsiness => write!(f, "drowsiness"),
            AlertKind::Fatigue => write!(f, "fatigue"),
        }
    }
}

/// Alert configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Minimum time between two consecutive alert activations (seconds).
    pub cooldown_seconds: f64,
    /// Enable the audio backend tier.
    pub sound_enabled: bool,
    /// Enable the visual indication flag.
    pub visual_enabled: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 3.0,
            sound_enabled: true,
            visual_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchState {
    Idle,
    Alerting,
}

type SharedBackend = Arc<Mutex<Option<Box<dyn AlertBackend>>>>;

/// Cooldown-gated alert trigger with background playback.
///
/// Two states: Idle and Alerting. `trigger` refuses while Alerting or
/// within the cooldown of the previous alert; otherwise it starts a
/// playback thread that loops the indication until `stop`. Backend
/// failure degrades tier by tier and never reaches the trigger caller.
pub struct AlertDispatcher {
    config: AlertConfig,
    backend: SharedBackend,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    state: DispatchState,
    last_alert: Option<Instant>,
    alert_count: u64,
}

impl AlertDispatcher {
    /// Dispatcher without an audio backend: playback degrades straight to
    /// the textual tier.
    pub fn new(config: AlertConfig) -> Self {
        Self::build(config, None)
    }

    pub fn with_backend(config: AlertConfig, backend: Box<dyn AlertBackend>) -> Self {
        Self::build(config, Some(backend))
    }

    fn build(config: AlertConfig, backend: Option<Box<dyn AlertBackend>>) -> Self {
        info!(?config, "alert dispatcher initialized");
        Self {
            config,
            backend: Arc::new(Mutex::new(backend)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
            state: DispatchState::Idle,
            last_alert: None,
            alert_count: 0,
        }
    }

    /// Try to start an alert. Returns false, with no state change, while
    /// already alerting or still inside the cooldown window.
    pub fn trigger(&mut self, kind: AlertKind) -> bool {
        if self.state == DispatchState::Alerting {
            return false;
        }

        let cooldown = Duration::from_secs_f64(self.config.cooldown_seconds);
        if let Some(last) = self.last_alert {
            if last.elapsed() < cooldown {
                debug!(%kind, "alert suppressed: in cooldown period");
                return false;
            }
        }

        warn!(%kind, "alert triggered");
        self.state = DispatchState::Alerting;
        self.last_alert = Some(Instant::now());
        self.alert_count += 1;

        // Fresh flag per playback: a worker detached by a timed-out stop
        // keeps its own signalled flag instead of being revived here.
        let stop = Arc::new(AtomicBool::new(false));
        self.stop_flag = Arc::clone(&stop);
        let backend = Arc::clone(&self.backend);
        let sound_enabled = self.config.sound_enabled;
        self.worker = Some(thread::spawn(move || {
            playback_loop(kind, backend, stop, sound_enabled);
        }));

        true
    }

    /// Signal the playback thread to end and join it with a bounded
    /// timeout. Idempotent when already idle.
    pub fn stop(&mut self) {
        if self.state == DispatchState::Idle && self.worker.is_none() {
            return;
        }

        info!("stopping alert");
        self.stop_flag.store(true, Ordering::Release);

        if let Some(worker) = self.worker.take() {
            let deadline = Instant::now() + JOIN_TIMEOUT;
            while !worker.is_finished() && Instant::now() < deadline {
                thread::sleep(JOIN_POLL);
            }
            if worker.is_finished() {
                if worker.join().is_err() {
                    warn!("playback thread panicked");
                }
            } else {
                warn!("playback thread did not stop in time, detaching");
            }
        }

        self.state = DispatchState::Idle;
    }

    pub fn is_alerting(&self) -> bool {
        self.state == DispatchState::Alerting
    }

    /// Whether the caller should render a visual indication this frame.
    pub fn should_show_visual(&self) -> bool {
        self.config.visual_enabled && self.is_alerting()
    }

    pub fn alert_count(&self) -> u64 {
        self.alert_count
    }

    /// Stop any active alert and zero the counters.
    pub fn reset(&mut self) {
        self.stop();
        self.alert_count = 0;
        self.last_alert = None;
        info!("alert dispatcher reset");
    }

    /// Stop any active alert and release the backend.
    pub fn cleanup(&mut self) {
        self.stop();
        self.backend
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        info!("alert dispatcher cleaned up");
    }
}

impl Drop for AlertDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Loops the best available indication until the stop flag is set.
///
/// Tiers: audio backend, then textual console heartbeat. A backend that
/// fails to start is logged and skipped, never propagated.
fn playback_loop(kind: AlertKind, backend: SharedBackend, stop: Arc<AtomicBool>, sound_enabled: bool) {
    let audio_started = sound_enabled && {
        let mut guard = backend.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(b) => match b.start_loop() {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "audio backend failed, degrading");
                    false
                }
            },
            None => false,
        }
    };

    if audio_started {
        while !stop.load(Ordering::Acquire) {
            thread::sleep(PLAYBACK_POLL);
        }
        let mut guard = backend.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(b) = guard.as_mut() {
            b.stop_loop();
        }
    } else {
        // Textual tier: heartbeat once a second, polling stop more often.
        let kind = kind.to_string();
        let polls_per_beat = (TEXTUAL_HEARTBEAT.as_millis() / PLAYBACK_POLL.as_millis()).max(1);
        let mut polls = 0;
        while !stop.load(Ordering::Acquire) {
            if polls % polls_per_beat == 0 {
                ConsoleBackend::beep(&kind);
            }
            polls += 1;
            thread::sleep(PLAYBACK_POLL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct RecordingBackend {
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
        fail: bool,
    }

    impl AlertBackend for RecordingBackend {
        fn start_loop(&mut self) -> Result<(), BackendError> {
            if self.fail {
                return Err(BackendError::DeviceUnavailable("test".into()));
            }
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn stop_loop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn dispatcher_with_recording(
        cooldown_seconds: f64,
        fail: bool,
    ) -> (AlertDispatcher, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let backend = RecordingBackend {
            fail,
            ..Default::default()
        };
        let starts = Arc::clone(&backend.starts);
        let stops = Arc::clone(&backend.stops);
        let config = AlertConfig {
            cooldown_seconds,
            ..Default::default()
        };
        (
            AlertDispatcher::with_backend(config, Box::new(backend)),
            starts,
            stops,
        )
    }

    #[test]
    fn test_trigger_starts_and_stop_ends_playback() {
        let (mut dispatcher, starts, stops) = dispatcher_with_recording(0.0, false);

        assert!(dispatcher.trigger(AlertKind::Drowsiness));
        assert!(dispatcher.is_alerting());
        assert!(dispatcher.should_show_visual());

        thread::sleep(Duration::from_millis(50));
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        dispatcher.stop();
        assert!(!dispatcher.is_alerting());
        assert!(!dispatcher.should_show_visual());
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_trigger_refused_while_alerting() {
        let (mut dispatcher, _, _) = dispatcher_with_recording(0.0, false);

        assert!(dispatcher.trigger(AlertKind::Drowsiness));
        assert!(!dispatcher.trigger(AlertKind::Fatigue));
        assert_eq!(dispatcher.alert_count(), 1);

        dispatcher.stop();
    }

    #[test]
    fn test_cooldown_suppresses_second_trigger() {
        let (mut dispatcher, _, _) = dispatcher_with_recording(60.0, false);

        assert!(dispatcher.trigger(AlertKind::Drowsiness));
        dispatcher.stop();

        // Within cooldown: refused, count unchanged.
        assert!(!dispatcher.trigger(AlertKind::Drowsiness));
        assert_eq!(dispatcher.alert_count(), 1);
    }

    #[test]
    fn test_zero_cooldown_allows_retrigger() {
        let (mut dispatcher, _, _) = dispatcher_with_recording(0.0, false);

        assert!(dispatcher.trigger(AlertKind::Drowsiness));
        dispatcher.stop();
        assert!(dispatcher.trigger(AlertKind::Fatigue));
        assert_eq!(dispatcher.alert_count(), 2);

        dispatcher.stop();
    }

    #[test]
    fn test_backend_failure_degrades_not_propagates() {
        let (mut dispatcher, starts, stops) = dispatcher_with_recording(0.0, true);

        // Trigger still succeeds; playback runs on the textual tier.
        assert!(dispatcher.trigger(AlertKind::Drowsiness));
        thread::sleep(Duration::from_millis(50));
        assert!(dispatcher.is_alerting());
        assert_eq!(starts.load(Ordering::SeqCst), 0);

        dispatcher.stop();
        assert_eq!(stops.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut dispatcher, _, _) = dispatcher_with_recording(0.0, false);

        dispatcher.stop(); // idle: no-op
        assert!(dispatcher.trigger(AlertKind::Drowsiness));
        dispatcher.stop();
        dispatcher.stop();
        assert!(!dispatcher.is_alerting());
    }

    #[test]
    fn test_reset_clears_counters_and_cooldown() {
        let (mut dispatcher, _, _) = dispatcher_with_recording(60.0, false);

        assert!(dispatcher.trigger(AlertKind::Drowsiness));
        dispatcher.reset();

        assert_eq!(dispatcher.alert_count(), 0);
        // Cooldown cleared: immediate retrigger allowed.
        assert!(dispatcher.trigger(AlertKind::Fatigue));
        dispatcher.stop();
    }

    #[test]
    fn test_detached_worker_is_not_revived_by_retrigger() {
        // First start_loop blocks past the join timeout, forcing stop() to
        // detach the worker. The retrigger must leave that worker winding
        // down on its own signalled flag instead of restarting it.
        struct SlowStartBackend {
            starts: Arc<AtomicUsize>,
            stops: Arc<AtomicUsize>,
        }

        impl AlertBackend for SlowStartBackend {
            fn start_loop(&mut self) -> Result<(), BackendError> {
                if self.starts.fetch_add(1, Ordering::SeqCst) == 0 {
                    thread::sleep(JOIN_TIMEOUT + Duration::from_millis(100));
                }
                Ok(())
            }

            fn stop_loop(&mut self) {
                self.stops.fetch_add(1, Ordering::SeqCst);
            }
        }

        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));
        let backend = SlowStartBackend {
            starts: Arc::clone(&starts),
            stops: Arc::clone(&stops),
        };
        let config = AlertConfig {
            cooldown_seconds: 0.0,
            ..Default::default()
        };
        let mut dispatcher = AlertDispatcher::with_backend(config, Box::new(backend));

        assert!(dispatcher.trigger(AlertKind::Drowsiness));
        dispatcher.stop(); // join times out, worker detaches

        assert!(dispatcher.trigger(AlertKind::Fatigue));
        thread::sleep(JOIN_TIMEOUT + Duration::from_millis(300));

        // The detached worker saw its own flag and wound down; only the
        // second playback is still running.
        assert_eq!(starts.load(Ordering::SeqCst), 2);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(dispatcher.is_alerting());

        dispatcher.stop();
        assert_eq!(stops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cleanup_releases_backend() {
        let (mut dispatcher, starts, _) = dispatcher_with_recording(0.0, false);
        dispatcher.cleanup();

        // Backend gone: subsequent alerts run the textual tier only.
        assert!(dispatcher.trigger(AlertKind::Drowsiness));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(starts.load(Ordering::SeqCst), 0);
        dispatcher.stop();
    }
}
