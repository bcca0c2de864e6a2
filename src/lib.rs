//! RFox Audit Engine
//!
//! Audits a rendered web page for two families of WCAG violations:
//!
//! - **Non-text contrast (1.4.11)**: interactive components (buttons,
//!   inputs) that do not stand out from their surroundings by at least 3:1.
//! - **Language of page / parts (3.1.1, 3.1.2)**: text whose declared `lang`
//!   disagrees with the language a classifier detects.
//!
//! The engine consumes an already captured [`RenderedPage`] (screenshots,
//! element geometry, DOM text tree) and produces a deterministic
//! [`Report`]. Capturing is delegated to a [`rendering::Renderer`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rfaudit::audit::language::RecordedClassifier;
//! use rfaudit::{AuditConfig, Auditor, BoundingBox, DomNode, ElementGeometry, ElementKind};
//! use rfaudit::{RenderState, RenderedPage, Rgb, Screenshot};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut shot = Screenshot::filled(100, 60, Rgb::WHITE);
//! shot.fill_rect(20, 20, 40, 16, Rgb(0x1a, 0x73, 0xe8));
//!
//! let page = RenderedPage::new("https://example.com", DomNode::element("html"))
//!     .with_screenshot(RenderState::Default, shot)
//!     .with_element(ElementGeometry::new("send", ElementKind::Submit, BoundingBox::new(20, 20, 40, 16)));
//!
//! let auditor = Auditor::new(AuditConfig::default())?
//!     .with_classifier(Arc::new(RecordedClassifier::new()));
//! let report = auditor.analyze(&page);
//! assert!(!report.has_failures());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod error;
pub use error::{Error, GeometryError, Result};

pub mod dom;
pub mod page;
pub mod report;

// Analysis engine: geometry, color, contrast, text, language, rules
pub mod audit;

// Capture boundary towards the headless renderer
pub mod rendering;

pub use audit::{analyze, Auditor};
pub use dom::DomNode;
pub use page::{BoundingBox, ElementGeometry, ElementKind, RenderState, RenderedPage, Rgb, Screenshot};
pub use report::{Finding, Report};

/// Thresholds and tuning for one analysis run
///
/// All numeric defaults are starting points and meant to be calibrated;
/// load overrides from JSON with [`AuditConfig::from_json_file`].
///
/// # Examples
///
/// ```
/// let cfg = rfaudit::AuditConfig::default();
/// assert_eq!(cfg.min_component_contrast, 3.0);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Buckets per color channel for dominant-color histograms
    pub quantization_buckets: u32,
    /// Dominant colors covering this share of a region or less are uncertain
    pub min_coverage: f64,
    /// Pixels around an element sampled as its background
    pub background_margin: u32,
    /// Required contrast for interactive components (WCAG 1.4.11)
    pub min_component_contrast: f64,
    /// Top detection confidence that confirms a declared language
    pub high_confidence: f64,
    /// Top detection confidence at or above which a declared language that
    /// is absent from the detections is an error (inclusive)
    pub reliable_mismatch: f64,
    /// Minimum characters of cleaned text before classifying a run
    pub min_text_chars: usize,
    /// Minimum words before classifying a run
    pub min_words: usize,
    /// Minimum words before classifying a hidden attribute value
    pub min_attribute_words: usize,
    /// Also classify `alt`, `aria-label`, `title` and `value` attributes
    pub check_hidden_attributes: bool,
    /// Restrict detections to these languages (`None` keeps all)
    pub languages: Option<Vec<String>>,
    /// Text nodes per classifier call (0 classifies one node at a time)
    pub classifier_batch_size: usize,
    /// Worker threads for per-element and per-node evaluation
    pub workers: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            quantization_buckets: 16,
            min_coverage: 0.4,
            background_margin: 20,
            min_component_contrast: 3.0,
            high_confidence: 0.8,
            reliable_mismatch: 0.5,
            min_text_chars: 20,
            min_words: 5,
            min_attribute_words: 3,
            check_hidden_attributes: true,
            languages: None,
            classifier_batch_size: 0,
            workers: num_cpus::get().max(1),
        }
    }
}

impl AuditConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=256).contains(&self.quantization_buckets) {
            return Err(Error::ConfigError(format!(
                "quantization_buckets must be in 1..=256, got {}",
                self.quantization_buckets
            )));
        }
        if !(0.0..1.0).contains(&self.min_coverage) {
            return Err(Error::ConfigError(format!(
                "min_coverage must be in [0, 1), got {}",
                self.min_coverage
            )));
        }
        if !(1.0..=21.0).contains(&self.min_component_contrast) {
            return Err(Error::ConfigError(format!(
                "min_component_contrast must be in [1, 21], got {}",
                self.min_component_contrast
            )));
        }
        if !(0.0..=1.0).contains(&self.reliable_mismatch)
            || !(0.0..=1.0).contains(&self.high_confidence)
            || self.reliable_mismatch > self.high_confidence
        {
            return Err(Error::ConfigError(format!(
                "need 0 <= reliable_mismatch ({}) <= high_confidence ({}) <= 1",
                self.reliable_mismatch, self.high_confidence
            )));
        }
        if self.workers == 0 {
            return Err(Error::ConfigError("workers must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Read a (partial) JSON config; missing fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let cfg: AuditConfig = serde_json::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Settings for the capture boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Viewport dimensions handed to the renderer
    pub viewport: Viewport,
    /// Deadline for each render in milliseconds, including the wait for a
    /// free render slot
    pub timeout_ms: u64,
    /// Renders allowed to run at the same time
    pub max_concurrent_renders: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            timeout_ms: 30000,
            max_concurrent_renders: 2,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuditConfig::default();
        assert_eq!(config.quantization_buckets, 16);
        assert_eq!(config.high_confidence, 0.8);
        assert!(config.workers >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let config = AuditConfig {
            high_confidence: 0.4,
            reliable_mismatch: 0.6,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        let config = AuditConfig {
            quantization_buckets: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: AuditConfig = serde_json::from_str(r#"{"min_coverage": 0.25, "languages": ["nl", "fr"]}"#).unwrap();
        assert_eq!(cfg.min_coverage, 0.25);
        assert_eq!(cfg.background_margin, 20);
        assert_eq!(cfg.languages.as_deref(), Some(&["nl".to_string(), "fr".to_string()][..]));
    }

    #[test]
    fn test_viewport() {
        let viewport = Viewport::default();
        assert_eq!(viewport.width, 1920);
        assert_eq!(CaptureConfig::default().max_concurrent_renders, 2);
    }
}
