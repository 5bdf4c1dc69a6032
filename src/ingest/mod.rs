//! Frame ingestion sources.
//!
//! This module provides different sources for video frames:
//! - Synthetic frames (`stub://`, testing and model-free demos)
//! - Image directories (`dir://` or a plain directory path)
//! - USB/V4L2 devices (feature: ingest-v4l2)
//!
//! A source is a lazy, finite-until-cancelled sequence of frames:
//! `next_frame` returns `Ok(None)` when the source is exhausted, which the
//! capture loop treats as a normal stop. Reads are blocking; no timeout is
//! modeled on a device read.

mod dir;
mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Result};

pub use dir::ImageDirSource;
pub use synthetic::SyntheticSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Source;

use crate::frame::Frame;

/// Settings shared by all frame sources.
#[derive(Clone, Debug)]
pub struct SourceSettings {
    /// Source URI: `stub://name`, `dir://path`, a directory path, or a
    /// `/dev/video*` device node (feature: ingest-v4l2).
    pub uri: String,
    /// Target frame rate. Device sources negotiate it; synthetic sources
    /// ignore it (pacing happens in the capture loop).
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
    /// Stop after this many frames (synthetic sources only).
    pub frame_limit: Option<u64>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            uri: "stub://camera".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
            frame_limit: None,
        }
    }
}

/// A source of decoded RGB frames.
pub trait FrameSource: Send {
    /// Open the underlying device/stream. A failure here is fatal to the
    /// capture loop; the loop never starts.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame. `Ok(None)` signals end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Check if the source is healthy.
    fn is_healthy(&self) -> bool {
        true
    }

    /// Human-readable source description for logs.
    fn describe(&self) -> String;
}

/// Build a frame source from the configured URI.
pub fn build_source(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    let uri = settings.uri.trim();
    if uri.is_empty() {
        return Err(anyhow!("source uri must not be empty"));
    }
    if uri.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(settings.clone())));
    }
    if let Some(path) = uri.strip_prefix("dir://") {
        return Ok(Box::new(ImageDirSource::new(path)));
    }
    if uri.starts_with("/dev/") {
        #[cfg(feature = "ingest-v4l2")]
        {
            return Ok(Box::new(V4l2Source::new(settings.clone())?));
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            return Err(anyhow!(
                "device capture requires the ingest-v4l2 feature (uri: {})",
                uri
            ));
        }
    }
    if std::path::Path::new(uri).is_dir() {
        return Ok(Box::new(ImageDirSource::new(uri)));
    }
    Err(anyhow!("unsupported source uri: {}", uri))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_synthetic_source_for_stub_uri() -> Result<()> {
        let settings = SourceSettings::default();
        let source = build_source(&settings)?;
        assert!(source.describe().contains("stub://camera"));
        Ok(())
    }

    #[test]
    fn rejects_unknown_uri() {
        let settings = SourceSettings {
            uri: "rtsp://camera-1".to_string(),
            ..SourceSettings::default()
        };
        assert!(build_source(&settings).is_err());
    }
}
