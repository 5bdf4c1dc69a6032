//! Per-label minimum-confidence policy.
//!
//! Some classes (translucent or reflective materials such as glass bottles)
//! score systematically lower than opaque ones, so a single global threshold
//! under-detects them. The policy keeps a default minimum plus per-label
//! overrides. Label matching is case-insensitive.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

/// Confidence gate for raw detections.
///
/// Pure: `passes` is a function of (label, confidence, policy table) only.
#[derive(Clone, Debug)]
pub struct ThresholdPolicy {
    default_min: f64,
    overrides: BTreeMap<String, f64>,
}

impl ThresholdPolicy {
    pub fn new(default_min: f64) -> Result<Self> {
        validate_threshold(default_min)?;
        Ok(Self {
            default_min,
            overrides: BTreeMap::new(),
        })
    }

    /// Add a per-label override. The label key is normalized to lowercase.
    pub fn with_override(mut self, label: &str, min_confidence: f64) -> Result<Self> {
        validate_threshold(min_confidence)?;
        self.overrides
            .insert(label.to_lowercase(), min_confidence);
        Ok(self)
    }

    pub fn from_table(default_min: f64, overrides: &BTreeMap<String, f64>) -> Result<Self> {
        let mut policy = Self::new(default_min)?;
        for (label, min) in overrides {
            policy = policy.with_override(label, *min)?;
        }
        Ok(policy)
    }

    /// Minimum confidence required for `label`: the override if present,
    /// otherwise the default.
    pub fn threshold(&self, label: &str) -> f64 {
        self.overrides
            .get(&label.to_lowercase())
            .copied()
            .unwrap_or(self.default_min)
    }

    pub fn passes(&self, label: &str, confidence: f64) -> bool {
        confidence >= self.threshold(label)
    }

    pub fn default_min(&self) -> f64 {
        self.default_min
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            default_min: 0.5,
            overrides: BTreeMap::new(),
        }
    }
}

fn validate_threshold(value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("confidence threshold {} out of [0, 1]", value));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_applies_to_unknown_labels() -> Result<()> {
        let policy = ThresholdPolicy::new(0.5)?;
        assert!(policy.passes("plastik", 0.5));
        assert!(!policy.passes("plastik", 0.49));
        Ok(())
    }

    #[test]
    fn override_replaces_default_for_its_label_only() -> Result<()> {
        let policy = ThresholdPolicy::new(0.5)?.with_override("botol kaca", 0.3)?;
        assert!(policy.passes("botol kaca", 0.35));
        assert!(!policy.passes("botol kaca", 0.29));
        assert!(!policy.passes("plastik", 0.4));
        Ok(())
    }

    #[test]
    fn label_lookup_is_case_insensitive() -> Result<()> {
        let policy = ThresholdPolicy::new(0.5)?.with_override("Botol Kaca", 0.3)?;
        assert_eq!(policy.threshold("BOTOL KACA"), 0.3);
        assert!(policy.passes("botol kaca", 0.3));
        Ok(())
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        assert!(ThresholdPolicy::new(1.2).is_err());
        assert!(ThresholdPolicy::new(-0.1).is_err());
        assert!(ThresholdPolicy::new(0.5)
            .unwrap()
            .with_override("kardus", 7.0)
            .is_err());
    }
}
