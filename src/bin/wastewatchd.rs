//! wastewatchd - waste detection capture daemon
//!
//! This daemon:
//! 1. Ingests frames from the configured source (synthetic, directory, V4L2)
//! 2. Runs the detector backend on each frame
//! 3. Gates detections through the per-label threshold policy
//! 4. Persists the best detection per frame (record + annotated JPEG)
//! 5. Stops on SIGINT/SIGTERM or when the source is exhausted

use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Result;

use wastewatch::{
    build_source, CaptureLoop, DetectorBackend, DirArtifactStore, DetectionLog, SqliteRecordStore,
    StubBackend, WatchConfig,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = WatchConfig::load()?;
    log::info!(
        "wastewatchd {} starting: db={} artifacts={} source={}",
        env!("CARGO_PKG_VERSION"),
        cfg.db_path,
        cfg.artifact_dir,
        cfg.source.uri
    );

    let store = SqliteRecordStore::open(&cfg.db_path)?;
    let artifacts = DirArtifactStore::open(&cfg.artifact_dir)?;
    let detection_log = DetectionLog::new(Box::new(store), Box::new(artifacts));

    let source = build_source(&cfg.source)?;
    let mut detector = build_detector(&cfg)?;
    detector.warm_up()?;

    let policy = cfg.threshold_policy()?;
    log::info!(
        "threshold policy: default {:.2}, {} override(s)",
        policy.default_min(),
        cfg.thresholds.overrides.len()
    );

    let mut capture = CaptureLoop::new(source, detector, policy, detection_log);
    if cfg.source.uri.starts_with("stub://") {
        let pace = Duration::from_millis(1000 / u64::from(cfg.source.target_fps.max(1)));
        capture = capture.with_pace(pace);
    }

    let cancel = capture.cancel_flag();
    ctrlc::set_handler(move || {
        log::info!("stop requested");
        cancel.store(true, Ordering::Relaxed);
    })?;

    let stats = capture.run()?;
    log::info!(
        "done: {} frames seen, {} detections stored, {} dropped",
        stats.frames,
        stats.persisted,
        stats.dropped
    );
    Ok(())
}

fn build_detector(cfg: &WatchConfig) -> Result<Box<dyn DetectorBackend>> {
    match cfg.detector.backend.as_str() {
        "stub" => Ok(Box::new(StubBackend::new(cfg.detector.labels.clone()))),
        "tract" => {
            #[cfg(feature = "backend-tract")]
            {
                let model_path = cfg
                    .detector
                    .model_path
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("tract backend requires model_path"))?;
                Ok(Box::new(wastewatch::TractBackend::new(
                    model_path,
                    cfg.source.width,
                    cfg.source.height,
                    cfg.detector.labels.clone(),
                )?))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                anyhow::bail!("detector backend 'tract' requires the backend-tract feature")
            }
        }
        other => anyhow::bail!("unknown detector backend '{}'", other),
    }
}
