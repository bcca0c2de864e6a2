//! Rendered page model consumed by the audit engine
//!
//! A `RenderedPage` is produced once per check by a renderer (see
//! [`crate::rendering`]) and is never mutated by the engine.

use crate::dom::DomNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Render state a screenshot was captured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderState {
    /// Page as loaded, nothing focused
    Default,
    /// Interactive components in their focused appearance
    Focused,
}

impl RenderState {
    pub const ALL: [RenderState; 2] = [RenderState::Default, RenderState::Focused];

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderState::Default => "default",
            RenderState::Focused => "focused",
        }
    }
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RenderState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(RenderState::Default),
            "focused" | "focus" => Ok(RenderState::Focused),
            other => Err(format!("Unknown render state: {}", other)),
        }
    }
}

/// An RGB triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    /// Parse `#rgb` or `#rrggbb` (leading `#` optional)
    pub fn from_hex(hex: &str) -> Option<Rgb> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?;
                let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?;
                let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?;
                Some(Rgb(r, g, b))
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Rgb(r, g, b))
            }
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A decoded screenshot: row-major RGB pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Screenshot {
    pub width: u32,
    pub height: u32,
    /// Device pixels per CSS pixel. Element boxes are multiplied by this.
    pub scale: u32,
    pixels: Vec<Rgb>,
}

impl Screenshot {
    /// Build a screenshot from row-major pixels. Fails when the buffer
    /// length does not match `width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgb>) -> crate::Result<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(crate::Error::InvalidPage(format!(
                "screenshot buffer has {} pixels, expected {}x{}={}",
                pixels.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self { width, height, scale: 1, pixels })
    }

    /// A screenshot filled with one color
    pub fn filled(width: u32, height: u32, color: Rgb) -> Self {
        Self {
            width,
            height,
            scale: 1,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.max(1);
        self
    }

    /// Decode a PNG (or any format the `image` crate was built with)
    #[cfg(feature = "snapshot")]
    pub fn decode(bytes: &[u8]) -> crate::Result<Self> {
        let img = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = img.dimensions();
        let pixels = img.pixels().map(|p| Rgb(p[0], p[1], p[2])).collect();
        Self::from_pixels(width, height, pixels)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Paint a solid rectangle, clipped to the screenshot. Used to build
    /// synthetic captures.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgb) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        for row in y.min(self.height)..y_end {
            let start = row as usize * self.width as usize;
            for col in x.min(self.width)..x_end {
                self.pixels[start + col as usize] = color;
            }
        }
    }
}

/// Interactive component kinds the contrast branch inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// Buttons: `<button>`, `input[type=submit|reset|button]`
    Submit,
    /// Form fields: text inputs, checkboxes, selects, textareas
    Input,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Submit => "submit",
            ElementKind::Input => "input",
        }
    }
}

/// Element box in CSS pixels. Width and height are signed so malformed
/// geometry from the renderer survives deserialization and can be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }
}

/// One interactive component instance located in a screenshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementGeometry {
    pub id: String,
    pub kind: ElementKind,
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
    /// Screenshot the box was measured in
    #[serde(rename = "screenshot", default = "default_state")]
    pub screenshot_ref: RenderState,
}

fn default_state() -> RenderState {
    RenderState::Default
}

impl ElementGeometry {
    pub fn new(id: &str, kind: ElementKind, bounding_box: BoundingBox) -> Self {
        Self {
            id: id.to_string(),
            kind,
            bounding_box,
            screenshot_ref: RenderState::Default,
        }
    }

    pub fn in_state(mut self, state: RenderState) -> Self {
        self.screenshot_ref = state;
        self
    }
}

/// Everything the engine needs about one page
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub url: String,
    pub screenshots: BTreeMap<RenderState, Screenshot>,
    pub elements: Vec<ElementGeometry>,
    pub dom: DomNode,
}

impl RenderedPage {
    pub fn new(url: &str, dom: DomNode) -> Self {
        Self {
            url: url.to_string(),
            screenshots: BTreeMap::new(),
            elements: Vec::new(),
            dom,
        }
    }

    pub fn with_screenshot(mut self, state: RenderState, screenshot: Screenshot) -> Self {
        self.screenshots.insert(state, screenshot);
        self
    }

    pub fn with_element(mut self, element: ElementGeometry) -> Self {
        self.elements.push(element);
        self
    }

    pub fn screenshot(&self, state: RenderState) -> Option<&Screenshot> {
        self.screenshots.get(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_hex() {
        assert_eq!(Rgb::from_hex("#fff"), Some(Rgb::WHITE));
        assert_eq!(Rgb::from_hex("777777"), Some(Rgb(0x77, 0x77, 0x77)));
        assert_eq!(Rgb::from_hex("#12345"), None);
        assert_eq!(Rgb(1, 2, 255).to_hex(), "#0102ff");
    }

    #[test]
    fn from_pixels_rejects_wrong_length() {
        assert!(Screenshot::from_pixels(2, 2, vec![Rgb::BLACK; 3]).is_err());
        assert!(Screenshot::from_pixels(2, 2, vec![Rgb::BLACK; 4]).is_ok());
    }

    #[test]
    fn fill_rect_clips_to_bounds() {
        let mut s = Screenshot::filled(4, 4, Rgb::WHITE);
        s.fill_rect(2, 2, 10, 10, Rgb::BLACK);
        assert_eq!(s.pixel(3, 3), Rgb::BLACK);
        assert_eq!(s.pixel(1, 1), Rgb::WHITE);
    }

    #[test]
    fn render_state_parses_and_displays() {
        assert_eq!("Focused".parse::<RenderState>(), Ok(RenderState::Focused));
        assert_eq!(RenderState::Default.to_string(), "default");
        assert!("hover".parse::<RenderState>().is_err());
    }

    #[test]
    fn element_geometry_defaults_to_default_screenshot() {
        let json = r#"{"id":"b1","kind":"submit","box":{"x":1,"y":2,"width":3,"height":4}}"#;
        let el: ElementGeometry = serde_json::from_str(json).unwrap();
        assert_eq!(el.screenshot_ref, RenderState::Default);
        assert_eq!(el.bounding_box, BoundingBox::new(1, 2, 3, 4));
    }
}
