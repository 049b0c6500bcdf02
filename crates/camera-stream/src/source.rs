//! Threaded frame source with a shared latest-frame slot.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, trace, warn};

use crate::{CameraConfig, CameraError, VideoFrame};

/// Frames discarded while the camera settles after opening.
const WARMUP_READS: usize = 10;
/// Attempts to obtain the first real frame before startup is declared failed.
const FIRST_FRAME_ATTEMPTS: usize = 30;
/// Capture loop yield, keeps the thread from monopolizing a core.
const CAPTURE_YIELD: Duration = Duration::from_millis(1);
/// Bounded wait for the capture thread to observe the stop signal.
const JOIN_TIMEOUT: Duration = Duration::from_secs(1);
const JOIN_POLL: Duration = Duration::from_millis(10);

/// Camera device abstraction.
///
/// `read` returning `Ok(None)` is a transient no-frame outcome; the capture
/// loop retries forever on both that and `Err`. Only `open` failures and a
/// camera that never yields a first frame are fatal.
pub trait CameraBackend: Send + 'static {
    fn open(&mut self, config: &CameraConfig) -> Result<(), CameraError>;
    fn read(&mut self) -> Result<Option<VideoFrame>, CameraError>;
    fn release(&mut self);
}

struct Shared {
    /// Latest-value cell: swapped whole by the writer, cloned by readers.
    latest: Mutex<Option<Arc<VideoFrame>>>,
    stopped: AtomicBool,
    frames_captured: AtomicU64,
}

impl Shared {
    fn store(&self, frame: VideoFrame) {
        let mut slot = self
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(frame));
    }
}

/// Background-threaded camera acquisition.
///
/// The capture thread overwrites the latest-frame slot as fast as the
/// backend allows; consumers read whatever is newest. Frame duplication
/// under slow consumption and frame skipping under fast capture are both
/// expected.
pub struct FrameSource {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    started_at: Instant,
}

impl FrameSource {
    /// Open the camera, warm it up, and start the capture thread.
    ///
    /// Open failure and a camera that never produces a first frame are
    /// fatal to session startup and surface as `Err`; everything after
    /// this point is absorbed by the capture loop.
    pub fn start(
        mut backend: Box<dyn CameraBackend>,
        config: &CameraConfig,
    ) -> Result<Self, CameraError> {
        info!(device = config.device_id, "starting frame source");
        backend.open(config)?;

        // The first few frames after opening are often dark or torn.
        for _ in 0..WARMUP_READS {
            let _ = backend.read();
        }

        let mut first = None;
        for _ in 0..FIRST_FRAME_ATTEMPTS {
            match backend.read() {
                Ok(Some(frame)) => {
                    first = Some(frame);
                    break;
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "read failed during startup"),
            }
            thread::sleep(CAPTURE_YIELD);
        }
        let Some(first) = first else {
            backend.release();
            return Err(CameraError::Startup);
        };

        info!(
            width = first.width,
            height = first.height,
            "camera initialized"
        );

        let shared = Arc::new(Shared {
            latest: Mutex::new(Some(Arc::new(first))),
            stopped: AtomicBool::new(false),
            frames_captured: AtomicU64::new(1),
        });

        let worker = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || capture_loop(backend, shared))
        };

        Ok(Self {
            shared,
            worker: Some(worker),
            started_at: Instant::now(),
        })
    }

    /// The most recently captured frame. Never blocks waiting for a new one.
    pub fn latest(&self) -> Option<Arc<VideoFrame>> {
        self.shared
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Total frames captured since start.
    pub fn frames_captured(&self) -> u64 {
        self.shared.frames_captured.load(Ordering::Relaxed)
    }

    /// Measured capture rate since start.
    pub fn measured_fps(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.frames_captured() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Signal the capture loop to end and join it with a bounded timeout.
    /// The camera handle is released by the capture thread on exit.
    /// Safe to call multiple times.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        info!("stopping frame source");
        self.shared.stopped.store(true, Ordering::Release);

        let deadline = Instant::now() + JOIN_TIMEOUT;
        while !worker.is_finished() && Instant::now() < deadline {
            thread::sleep(JOIN_POLL);
        }

        if worker.is_finished() {
            if worker.join().is_err() {
                warn!("capture thread panicked");
            }
        } else {
            // Cancellation is cooperative; an unresponsive backend read is
            // left to finish detached rather than blocking shutdown.
            warn!("capture thread did not stop in time, detaching");
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_loop(mut backend: Box<dyn CameraBackend>, shared: Arc<Shared>) {
    while !shared.stopped.load(Ordering::Acquire) {
        match backend.read() {
            Ok(Some(frame)) => {
                shared.store(frame);
                shared.frames_captured.fetch_add(1, Ordering::Relaxed);
            }
            Ok(None) => trace!("transient empty read"),
            Err(e) => warn!(error = %e, "camera read failed"),
        }
        thread::sleep(CAPTURE_YIELD);
    }
    backend.release();
    info!("capture loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct ScriptedCamera {
        fail_open: bool,
        never_produces: bool,
        sequence: Arc<AtomicU64>,
        released: Arc<AtomicBool>,
    }

    impl CameraBackend for ScriptedCamera {
        fn open(&mut self, config: &CameraConfig) -> Result<(), CameraError> {
            if self.fail_open {
                return Err(CameraError::Open(config.device_id));
            }
            Ok(())
        }

        fn read(&mut self) -> Result<Option<VideoFrame>, CameraError> {
            if self.never_produces {
                return Ok(None);
            }
            let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
            Ok(Some(VideoFrame::new(vec![0; 12], 2, 2, seq)))
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::Release);
        }
    }

    #[test]
    fn test_open_failure_is_fatal() {
        let backend = ScriptedCamera {
            fail_open: true,
            ..Default::default()
        };
        let result = FrameSource::start(Box::new(backend), &CameraConfig::default());
        assert!(matches!(result, Err(CameraError::Open(0))));
    }

    #[test]
    fn test_no_first_frame_is_fatal_and_releases() {
        let backend = ScriptedCamera {
            never_produces: true,
            ..Default::default()
        };
        let released = Arc::clone(&backend.released);

        let result = FrameSource::start(Box::new(backend), &CameraConfig::default());
        assert!(matches!(result, Err(CameraError::Startup)));
        assert!(released.load(Ordering::Acquire));
    }

    #[test]
    fn test_latest_tracks_newest_frame() {
        let backend = ScriptedCamera::default();
        let mut source =
            FrameSource::start(Box::new(backend), &CameraConfig::default()).unwrap();

        let first = source.latest().expect("first frame available at startup");
        thread::sleep(Duration::from_millis(50));
        let later = source.latest().expect("capture thread keeps producing");

        assert!(later.sequence > first.sequence);
        assert!(source.frames_captured() > 1);

        // Reads never consume: two consecutive reads may see the same frame.
        let a = source.latest().unwrap();
        let b = source.latest().unwrap();
        assert!(b.sequence >= a.sequence);

        source.stop();
    }

    #[test]
    fn test_stop_is_idempotent_and_releases_camera() {
        let backend = ScriptedCamera::default();
        let released = Arc::clone(&backend.released);

        let mut source =
            FrameSource::start(Box::new(backend), &CameraConfig::default()).unwrap();
        source.stop();
        assert!(released.load(Ordering::Acquire));

        let captured = source.frames_captured();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(source.frames_captured(), captured, "loop stopped producing");

        source.stop(); // second stop is a no-op
    }
}
