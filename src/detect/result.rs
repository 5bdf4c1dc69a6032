/// One classifier output for one object instance in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub label: String,
    /// Confidence in [0, 1].
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Select the single representative detection for one frame: the detection
/// with maximum confidence, or `None` for an empty list.
///
/// Ties break toward the first detection in scan order (strict `>`), so the
/// result is deterministic for a given input order. The storage layer records
/// one representative per frame; all other passing detections are dropped on
/// purpose.
pub fn best_detection(detections: &[Detection]) -> Option<&Detection> {
    let mut best: Option<&Detection> = None;
    for detection in detections {
        match best {
            None => best = Some(detection),
            Some(current) if detection.confidence > current.confidence => best = Some(detection),
            Some(_) => {}
        }
    }
    best
}
