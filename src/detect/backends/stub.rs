use std::collections::VecDeque;

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};

/// Stub backend for testing and model-free runs.
///
/// In scripted mode each `detect` call pops the next prepared detection list,
/// returning empty lists once the script runs out. Without a script it falls
/// back to pixel hashing: a frame that differs from its predecessor yields one
/// synthetic detection with a label cycled from the configured list.
pub struct StubBackend {
    script: Option<VecDeque<Vec<Detection>>>,
    labels: Vec<String>,
    last_hash: Option<[u8; 32]>,
    frame_count: u64,
}

impl StubBackend {
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            script: None,
            labels,
            last_hash: None,
            frame_count: 0,
        }
    }

    /// Replay exactly the given per-frame detection lists.
    pub fn scripted(frames: Vec<Vec<Detection>>) -> Self {
        Self {
            script: Some(frames.into()),
            labels: Vec::new(),
            last_hash: None,
            frame_count: 0,
        }
    }

    fn synthetic_detection(&self, hash: &[u8; 32], width: u32, height: u32) -> Detection {
        let label = if self.labels.is_empty() {
            "unknown".to_string()
        } else {
            self.labels[(self.frame_count % self.labels.len() as u64) as usize].clone()
        };
        // Confidence in [0.50, 0.89], derived from the frame hash so runs are
        // repeatable for identical input.
        let confidence = 0.5 + f64::from(hash[0] % 40) / 100.0;
        Detection {
            label,
            confidence,
            bbox: BoundingBox {
                x1: width as f32 * 0.25,
                y1: height as f32 * 0.25,
                x2: width as f32 * 0.75,
                y2: height as f32 * 0.75,
            },
        }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        self.frame_count += 1;

        if let Some(script) = &mut self.script {
            return Ok(script.pop_front().unwrap_or_default());
        }

        let current_hash: [u8; 32] = Sha256::digest(pixels).into();
        let changed = match self.last_hash {
            Some(prev) => prev != current_hash,
            None => false,
        };
        self.last_hash = Some(current_hash);

        if changed {
            Ok(vec![self.synthetic_detection(&current_hash, width, height)])
        } else {
            Ok(vec![])
        }
    }
}
