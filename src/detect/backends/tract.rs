#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};

/// Tract-based backend for ONNX inference.
///
/// Loads a local YOLO-style model and decodes its output rows
/// (cx, cy, w, h, objectness, per-class scores) into detections. The model
/// input size must match the frame size; no network I/O happens after model
/// loading.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>,
    width: u32,
    height: u32,
    labels: Vec<String>,
    /// Floor below which a row is not worth decoding. The threshold policy
    /// applies the real per-label gate afterwards.
    raw_floor: f64,
}

impl TractBackend {
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        width: u32,
        height: u32,
        labels: Vec<String>,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        if labels.is_empty() {
            return Err(anyhow!("tract backend requires at least one class label"));
        }
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
            labels,
            raw_floor: 0.05,
        })
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        if width != self.width || height != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match model input {}x{}",
                width,
                height,
                self.width,
                self.height
            ));
        }

        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let width = width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn decode_rows(&self, outputs: TVec<TValue>) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let shape = view.shape();
        // Expect [1, rows, 5 + classes].
        if shape.len() != 3 || shape[0] != 1 {
            return Err(anyhow!("unexpected model output shape {:?}", shape));
        }
        let row_len = shape[2];
        if row_len != 5 + self.labels.len() {
            return Err(anyhow!(
                "model output row length {} does not match {} labels",
                row_len,
                self.labels.len()
            ));
        }

        let mut detections = Vec::new();
        for row in view.index_axis(tract_ndarray::Axis(0), 0).rows() {
            let objectness = f64::from(row[4]);
            if objectness < self.raw_floor {
                continue;
            }

            let (class_idx, class_score) = row
                .iter()
                .skip(5)
                .enumerate()
                .fold((0usize, f32::NEG_INFINITY), |best, (idx, &score)| {
                    if score > best.1 {
                        (idx, score)
                    } else {
                        best
                    }
                });
            let confidence = objectness * f64::from(class_score);
            if confidence < self.raw_floor {
                continue;
            }

            let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
            detections.push(Detection {
                label: self.labels[class_idx].clone(),
                confidence: confidence.clamp(0.0, 1.0),
                bbox: BoundingBox {
                    x1: cx - w / 2.0,
                    y1: cy - h / 2.0,
                    x2: cx + w / 2.0,
                    y2: cy + h / 2.0,
                },
            });
        }
        Ok(detections)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode_rows(outputs)
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = vec![0u8; (self.width * self.height * 3) as usize];
        let input = self.build_input(&blank, self.width, self.height)?;
        self.model
            .run(tvec!(input.into()))
            .context("ONNX warm-up inference failed")?;
        Ok(())
    }
}
