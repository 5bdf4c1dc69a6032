//! WasteWatch
//!
//! This crate implements a single-camera waste-detection pipeline:
//! frames are captured from a video source, scored by an object-detection
//! backend, gated through a per-label confidence policy, and the single best
//! detection per frame is persisted as an immutable record with an annotated
//! JPEG artifact.
//!
//! # Module Structure
//!
//! - `ingest`: frame sources (synthetic, image directory, V4L2)
//! - `detect`: detector backend trait, detection types, best-detection selector
//! - `threshold`: per-label minimum-confidence policy
//! - `frame`: RGB frame buffer, annotation drawing, JPEG encoding
//! - `artifact`: image blob storage with collision-resistant names
//! - `store`: detection record store (SQLite / in-memory) and `DetectionLog`
//! - `pipeline`: the capture loop state machine
//!
//! The dashboard is an external collaborator; `wastectl` exposes the store
//! operations it needs (list, summary, delete, delete-all).

pub mod artifact;
pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod store;
pub mod threshold;

pub use artifact::{ArtifactStore, DirArtifactStore};
pub use config::WatchConfig;
pub use detect::{best_detection, BoundingBox, Detection, DetectorBackend, StubBackend};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use frame::Frame;
pub use ingest::{build_source, FrameSource, ImageDirSource, SourceSettings, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use ingest::V4l2Source;
pub use pipeline::{CaptureLoop, LoopState, PipelineStats};
pub use store::{
    DeleteOutcome, DetectionLog, DetectionRecord, DetectionSummary, InMemoryRecordStore,
    RecordStore, SqliteRecordStore,
};
pub use threshold::ThresholdPolicy;
