//! Capture loop.
//!
//! Drives frame acquisition -> detection -> threshold gate -> best-detection
//! selection -> persistence, repeatedly, until the source is exhausted or a
//! cancellation is signalled. All collaborators are injected at construction
//! and the loop owns them for its lifetime; restarting means building a new
//! `CaptureLoop`.
//!
//! Failure policy: only a source that cannot be opened is fatal. Everything
//! that goes wrong inside one iteration (detector error, artifact write,
//! record append) is logged and the loop moves on to the next frame. No frame
//! is buffered across iterations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::detect::{best_detection, DetectorBackend};
use crate::ingest::FrameSource;
use crate::store::DetectionLog;
use crate::threshold::ThresholdPolicy;

/// Capture loop states. `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Capturing,
    Detecting,
    Persisting,
    Stopped,
}

/// Counters reported when the loop stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames read from the source.
    pub frames: u64,
    /// Frames that produced a stored record.
    pub persisted: u64,
    /// Frames with a representative detection whose persistence failed.
    pub dropped: u64,
}

pub struct CaptureLoop {
    source: Box<dyn FrameSource>,
    detector: Box<dyn DetectorBackend>,
    policy: ThresholdPolicy,
    log: DetectionLog,
    cancel: Arc<AtomicBool>,
    pace: Option<Duration>,
    state: LoopState,
    stats: PipelineStats,
}

impl CaptureLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn DetectorBackend>,
        policy: ThresholdPolicy,
        log: DetectionLog,
    ) -> Self {
        Self {
            source,
            detector,
            policy,
            log,
            cancel: Arc::new(AtomicBool::new(false)),
            pace: None,
            state: LoopState::Idle,
            stats: PipelineStats::default(),
        }
    }

    /// Sleep this long between iterations. Useful for free-running synthetic
    /// sources; device sources already block on the hardware.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    /// Shared flag that stops the loop at the next iteration boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Access to the detection log after the loop has stopped.
    pub fn log(&self) -> &DetectionLog {
        &self.log
    }

    /// Run until the source is exhausted or cancellation is requested.
    ///
    /// Returns an error only when the source cannot be opened; in that case
    /// the loop never processed a frame. All other failures are contained to
    /// the iteration that raised them.
    pub fn run(&mut self) -> Result<PipelineStats> {
        if let Err(err) = self.source.connect() {
            self.state = LoopState::Stopped;
            return Err(err.context(format!("video source unavailable: {}", self.source.describe())));
        }
        log::info!("capture loop started on {}", self.source.describe());

        loop {
            // Cancellation is cooperative: checked once per iteration, never
            // mid-inference.
            if self.cancel.load(Ordering::Relaxed) {
                log::info!("capture loop cancelled");
                break;
            }

            self.state = LoopState::Capturing;
            let mut frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::info!("video source exhausted");
                    break;
                }
                Err(err) => {
                    if self.source.is_healthy() {
                        log::error!("frame read failed: {:#}", err);
                    } else {
                        log::error!(
                            "frame read failed and {} reports unhealthy: {:#}",
                            self.source.describe(),
                            err
                        );
                    }
                    break;
                }
            };
            self.stats.frames += 1;

            self.state = LoopState::Detecting;
            let detections =
                match self
                    .detector
                    .detect(frame.pixels(), frame.width(), frame.height())
                {
                    Ok(detections) => detections,
                    Err(err) => {
                        log::warn!("detector failed on frame {}: {:#}", self.stats.frames, err);
                        self.pace_if_configured();
                        continue;
                    }
                };

            let passing: Vec<_> = detections
                .into_iter()
                .filter(|d| self.policy.passes(&d.label, d.confidence))
                .collect();

            let Some(representative) = best_detection(&passing).cloned() else {
                self.pace_if_configured();
                continue;
            };

            self.state = LoopState::Persisting;
            frame.annotate(&representative);
            match self.log.record_frame(
                &representative.label,
                representative.confidence,
                &frame,
            ) {
                Ok(id) => {
                    self.stats.persisted += 1;
                    log::info!(
                        "record #{}: {} ({:.1}%)",
                        id,
                        representative.label,
                        representative.confidence * 100.0
                    );
                }
                Err(err) => {
                    // Frame loss on a write error is acceptable; keep going.
                    self.stats.dropped += 1;
                    log::error!(
                        "failed to persist detection '{}': {:#}",
                        representative.label,
                        err
                    );
                }
            }

            self.pace_if_configured();
        }

        self.state = LoopState::Stopped;
        log::info!(
            "capture loop stopped: {} frames, {} records, {} dropped",
            self.stats.frames,
            self.stats.persisted,
            self.stats.dropped
        );
        Ok(self.stats)
    }

    fn pace_if_configured(&self) {
        if let Some(pace) = self.pace {
            std::thread::sleep(pace);
        }
    }
}
