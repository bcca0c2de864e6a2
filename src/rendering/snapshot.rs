//! Replay renderer for captures stored on disk.
//!
//! A bundle is a JSON manifest next to its PNG screenshots:
//!
//! ```json
//! {
//!   "url": "https://example.com/",
//!   "html": "page.html",
//!   "captures": [
//!     { "state": "default", "screenshot": "default.png", "scale": 2,
//!       "elements": [ { "id": "send", "kind": "submit",
//!                       "box": { "x": 10, "y": 10, "width": 80, "height": 24 } } ] }
//!   ]
//! }
//! ```
//!
//! `screenshot` is a path relative to the manifest or an inline
//! `data:image/png;base64,...` URI. The page DOM is either inline (`dom`) or
//! parsed from the captured `html` file.

use super::{Capture, Renderer};
use crate::dom::DomNode;
use crate::page::{ElementGeometry, RenderState, Screenshot};
use crate::{Error, Result, Viewport};
use base64::Engine as Base64Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    pub url: String,
    /// Captured HTML, relative to the manifest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dom: Option<DomNode>,
    pub captures: Vec<CaptureManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureManifest {
    pub state: RenderState,
    pub screenshot: String,
    #[serde(default = "default_scale")]
    pub scale: u32,
    #[serde(default)]
    pub elements: Vec<ElementGeometry>,
}

fn default_scale() -> u32 {
    1
}

/// Device pixel ratios a bundle may declare
const SCALES: std::ops::RangeInclusive<u32> = 1..=16;

/// Serves captures from a bundle as if it were a live renderer
#[derive(Debug, Clone)]
pub struct SnapshotRenderer {
    manifest: BundleManifest,
    base_dir: PathBuf,
    dom: Option<DomNode>,
}

impl SnapshotRenderer {
    /// Load a bundle manifest from disk
    pub fn open(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let manifest: BundleManifest = serde_json::from_str(&raw)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_manifest(manifest, &base_dir)
    }

    /// Relative paths in `manifest` resolve against `base_dir`
    pub fn from_manifest(manifest: BundleManifest, base_dir: &Path) -> Result<Self> {
        if let Some(bad) = manifest.captures.iter().find(|c| !SCALES.contains(&c.scale)) {
            return Err(Error::InvalidPage(format!(
                "{} capture has scale {}, expected {}..={}",
                bad.state,
                bad.scale,
                SCALES.start(),
                SCALES.end()
            )));
        }
        let dom = match (&manifest.dom, &manifest.html) {
            (Some(dom), _) => Some(dom.clone()),
            (None, Some(html)) => {
                let source = std::fs::read_to_string(base_dir.join(html))?;
                Some(DomNode::from_html(&source))
            }
            (None, None) => None,
        };
        Ok(Self {
            manifest,
            base_dir: base_dir.to_path_buf(),
            dom,
        })
    }

    pub fn url(&self) -> &str {
        &self.manifest.url
    }

    /// States the bundle has captures for, in manifest order
    pub fn states(&self) -> Vec<RenderState> {
        self.manifest.captures.iter().map(|c| c.state).collect()
    }

    fn load_screenshot(&self, capture: &CaptureManifest) -> Result<Screenshot> {
        let bytes = match capture.screenshot.strip_prefix("data:") {
            Some(uri) => {
                let (_, data) = uri
                    .split_once(";base64,")
                    .ok_or_else(|| Error::ImageError("inline screenshot is not base64".to_string()))?;
                base64::engine::general_purpose::STANDARD
                    .decode(data.trim())
                    .map_err(|e| Error::ImageError(format!("bad base64 screenshot: {}", e)))?
            }
            None => std::fs::read(self.base_dir.join(&capture.screenshot))?,
        };
        Ok(Screenshot::decode(&bytes)?.with_scale(capture.scale))
    }
}

impl Renderer for SnapshotRenderer {
    fn render(&self, url: &Url, state: RenderState, _viewport: Viewport) -> Result<Capture> {
        if url.as_str().trim_end_matches('/') != self.manifest.url.trim_end_matches('/') {
            log::warn!("bundle was captured from {}, replaying it for {}", self.manifest.url, url);
        }
        let capture = self
            .manifest
            .captures
            .iter()
            .find(|c| c.state == state)
            .ok_or_else(|| Error::RenderFailure(format!("bundle has no {} capture", state)))?;
        let screenshot = self
            .load_screenshot(capture)
            .map_err(|e| Error::RenderFailure(format!("{} screenshot: {}", state, e)))?;
        Ok(Capture {
            screenshot,
            elements: capture.elements.clone(),
            dom: self.dom.clone(),
        })
    }
}
