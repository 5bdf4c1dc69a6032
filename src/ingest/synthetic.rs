use anyhow::Result;

use super::{FrameSource, SourceSettings};
use crate::frame::Frame;

/// Synthetic frame source (`stub://` URIs) for tests and model-free runs.
///
/// Generates a deterministic gradient pattern that shifts every few frames,
/// simulating a mostly-static scene with occasional changes. With a
/// `frame_limit` the source is finite and reports end-of-stream, which makes
/// pipeline shutdown testable without a cancellation signal.
pub struct SyntheticSource {
    settings: SourceSettings,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticSource {
    pub fn new(settings: SourceSettings) -> Self {
        Self {
            settings,
            frame_count: 0,
            scene_state: 0,
        }
    }

    fn generate_pixels(&mut self) -> Vec<u8> {
        let pixel_count = (self.settings.width * self.settings.height * 3) as usize;

        // Change scene state occasionally to simulate an object entering.
        if self.frame_count % 5 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.scene_state as u64) % 256) as u8;
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        log::info!("SyntheticSource: connected to {}", self.settings.uri);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if let Some(limit) = self.settings.frame_limit {
            if self.frame_count >= limit {
                return Ok(None);
            }
        }
        self.frame_count += 1;

        let pixels = self.generate_pixels();
        let frame = Frame::new(pixels, self.settings.width, self.settings.height)?;
        Ok(Some(frame))
    }

    fn describe(&self) -> String {
        format!("{} (synthetic)", self.settings.uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_settings(frame_limit: Option<u64>) -> SourceSettings {
        SourceSettings {
            uri: "stub://test".to_string(),
            width: 64,
            height: 48,
            frame_limit,
            ..SourceSettings::default()
        }
    }

    #[test]
    fn produces_frames_with_configured_dimensions() -> Result<()> {
        let mut source = SyntheticSource::new(stub_settings(None));
        source.connect()?;

        let frame = source.next_frame()?.expect("frame");
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
        Ok(())
    }

    #[test]
    fn honors_frame_limit() -> Result<()> {
        let mut source = SyntheticSource::new(stub_settings(Some(2)));
        source.connect()?;

        assert!(source.next_frame()?.is_some());
        assert!(source.next_frame()?.is_some());
        assert!(source.next_frame()?.is_none());
        // Stays exhausted.
        assert!(source.next_frame()?.is_none());
        Ok(())
    }

    #[test]
    fn scene_changes_over_time() -> Result<()> {
        let mut source = SyntheticSource::new(stub_settings(None));
        source.connect()?;

        let first = source.next_frame()?.expect("frame");
        let mut changed = false;
        for _ in 0..10 {
            let frame = source.next_frame()?.expect("frame");
            if frame.pixels() != first.pixels() {
                changed = true;
                break;
            }
        }
        assert!(changed, "synthetic scene must eventually change");
        Ok(())
    }
}
