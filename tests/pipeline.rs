use anyhow::{anyhow, Result};
use tempfile::TempDir;

use wastewatch::{
    ArtifactStore, BoundingBox, CaptureLoop, Detection, DetectionLog, DirArtifactStore, Frame,
    ImageDirSource, InMemoryRecordStore, LoopState, SourceSettings, StubBackend, SyntheticSource,
    ThresholdPolicy,
};

fn det(label: &str, confidence: f64) -> Detection {
    Detection {
        label: label.to_string(),
        confidence,
        bbox: BoundingBox {
            x1: 10.0,
            y1: 10.0,
            x2: 40.0,
            y2: 40.0,
        },
    }
}

fn synthetic_source(frame_limit: u64) -> Box<SyntheticSource> {
    Box::new(SyntheticSource::new(SourceSettings {
        uri: "stub://test".to_string(),
        width: 64,
        height: 48,
        frame_limit: Some(frame_limit),
        ..SourceSettings::default()
    }))
}

fn detection_log(dir: &TempDir) -> Result<DetectionLog> {
    Ok(DetectionLog::new(
        Box::new(InMemoryRecordStore::new()),
        Box::new(DirArtifactStore::open(dir.path())?),
    ))
}

#[test]
fn override_label_passes_while_default_label_fails() -> Result<()> {
    let artifacts = TempDir::new()?;
    let policy = ThresholdPolicy::new(0.5)?.with_override("botol kaca", 0.3)?;
    let backend = StubBackend::scripted(vec![vec![det("botol kaca", 0.35), det("plastik", 0.4)]]);

    let mut capture = CaptureLoop::new(
        synthetic_source(1),
        Box::new(backend),
        policy,
        detection_log(&artifacts)?,
    );
    let stats = capture.run()?;

    assert_eq!(stats.frames, 1);
    assert_eq!(stats.persisted, 1);

    let records = capture.log().list_all()?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].label, "botol kaca");
    assert_eq!(records[0].confidence, 0.35);
    assert!(capture.log().artifacts().contains(&records[0].artifact));
    Ok(())
}

#[test]
fn duplicate_equal_confidence_detections_store_one_record() -> Result<()> {
    let artifacts = TempDir::new()?;
    let policy = ThresholdPolicy::new(0.5)?;
    let backend = StubBackend::scripted(vec![vec![det("kardus", 0.9), det("kardus", 0.9)]]);

    let mut capture = CaptureLoop::new(
        synthetic_source(1),
        Box::new(backend),
        policy,
        detection_log(&artifacts)?,
    );
    let stats = capture.run()?;

    assert_eq!(stats.persisted, 1);
    let records = capture.log().list_all()?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].label, "kardus");
    Ok(())
}

#[test]
fn frames_without_passing_detections_store_nothing() -> Result<()> {
    let artifacts = TempDir::new()?;
    let policy = ThresholdPolicy::new(0.5)?;
    // All below threshold.
    let backend = StubBackend::scripted(vec![vec![det("plastik", 0.2)], vec![det("kaleng", 0.4)]]);

    let mut capture = CaptureLoop::new(
        synthetic_source(2),
        Box::new(backend),
        policy,
        detection_log(&artifacts)?,
    );
    let stats = capture.run()?;

    assert_eq!(stats.frames, 2);
    assert_eq!(stats.persisted, 0);
    assert!(capture.log().list_all()?.is_empty());
    Ok(())
}

struct FailingArtifactStore;

impl ArtifactStore for FailingArtifactStore {
    fn write(&self, _frame: &Frame) -> Result<String> {
        Err(anyhow!("disk full"))
    }
    fn read(&self, _reference: &str) -> Result<Vec<u8>> {
        Err(anyhow!("disk full"))
    }
    fn delete(&self, _reference: &str) -> Result<()> {
        Err(anyhow!("disk full"))
    }
    fn contains(&self, _reference: &str) -> bool {
        false
    }
}

#[test]
fn artifact_write_failure_drops_frame_and_continues() -> Result<()> {
    let policy = ThresholdPolicy::new(0.5)?;
    let backend = StubBackend::scripted(vec![vec![det("plastik", 0.9)], vec![det("kardus", 0.8)]]);
    let log = DetectionLog::new(
        Box::new(InMemoryRecordStore::new()),
        Box::new(FailingArtifactStore),
    );

    let mut capture = CaptureLoop::new(synthetic_source(2), Box::new(backend), policy, log);
    let stats = capture.run()?;

    // Both frames were processed; neither produced a record; the loop never
    // raised.
    assert_eq!(stats.frames, 2);
    assert_eq!(stats.persisted, 0);
    assert_eq!(stats.dropped, 2);
    assert_eq!(capture.state(), LoopState::Stopped);
    assert!(capture.log().list_all()?.is_empty());
    Ok(())
}

#[test]
fn source_exhaustion_stops_the_loop() -> Result<()> {
    let artifacts = TempDir::new()?;
    let mut capture = CaptureLoop::new(
        synthetic_source(3),
        Box::new(StubBackend::scripted(vec![])),
        ThresholdPolicy::new(0.5)?,
        detection_log(&artifacts)?,
    );
    let stats = capture.run()?;

    assert_eq!(stats.frames, 3);
    assert_eq!(capture.state(), LoopState::Stopped);
    Ok(())
}

#[test]
fn cancellation_stops_before_the_next_frame() -> Result<()> {
    let artifacts = TempDir::new()?;
    // Unbounded source; only the cancel flag can stop the loop.
    let source = Box::new(SyntheticSource::new(SourceSettings {
        uri: "stub://test".to_string(),
        width: 64,
        height: 48,
        frame_limit: None,
        ..SourceSettings::default()
    }));
    let mut capture = CaptureLoop::new(
        source,
        Box::new(StubBackend::scripted(vec![])),
        ThresholdPolicy::new(0.5)?,
        detection_log(&artifacts)?,
    );

    capture.cancel_flag().store(true, std::sync::atomic::Ordering::Relaxed);
    let stats = capture.run()?;

    assert_eq!(stats.frames, 0);
    assert_eq!(capture.state(), LoopState::Stopped);
    Ok(())
}

#[test]
fn unopenable_source_is_fatal() -> Result<()> {
    let artifacts = TempDir::new()?;
    let mut capture = CaptureLoop::new(
        Box::new(ImageDirSource::new("/nonexistent/frames")),
        Box::new(StubBackend::scripted(vec![])),
        ThresholdPolicy::new(0.5)?,
        detection_log(&artifacts)?,
    );

    assert!(capture.run().is_err());
    assert_eq!(capture.state(), LoopState::Stopped);
    Ok(())
}

#[test]
fn stored_artifact_is_annotated_jpeg() -> Result<()> {
    let artifacts = TempDir::new()?;
    let policy = ThresholdPolicy::new(0.5)?;
    let backend = StubBackend::scripted(vec![vec![det("plastik", 0.95)]]);

    let mut capture = CaptureLoop::new(
        synthetic_source(1),
        Box::new(backend),
        policy,
        detection_log(&artifacts)?,
    );
    capture.run()?;

    let records = capture.log().list_all()?;
    let bytes = capture.log().artifacts().read(&records[0].artifact)?;
    assert_eq!(&bytes[..2], &[0xFF, 0xD8], "artifact must be a JPEG");
    Ok(())
}
