use anyhow::Result;

use crate::detect::result::Detection;

/// Detector backend trait.
///
/// A backend wraps an external classifier: given one decoded RGB frame it
/// returns the raw detections for that frame. Confidence gating and
/// representative selection happen outside the backend, so implementations
/// report everything they find.
///
/// Box coordinates must be consistent within one backend instance (pixel
/// coordinates for the built-in backends).
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// Implementations must treat the pixel slice as read-only and ephemeral;
    /// frames are not retained across calls.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
