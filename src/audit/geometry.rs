//! Region extraction: element boxes to pixel rectangles

use crate::error::GeometryError;
use crate::page::{ElementGeometry, ElementKind, RenderState, Rgb, Screenshot};

/// Pixel rectangle inside a screenshot (already clamped)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// The two rectangles sampled for one element
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRegion {
    pub element_id: String,
    pub kind: ElementKind,
    pub state: RenderState,
    pub element: Rect,
    /// Element box grown by the margin; sampling skips `element` pixels
    pub background: Rect,
}

impl ElementRegion {
    pub fn element_pixels(&self, shot: &Screenshot) -> Vec<Rgb> {
        let r = self.element;
        let mut out = Vec::with_capacity(r.area() as usize);
        for y in r.y..r.y + r.height {
            for x in r.x..r.x + r.width {
                out.push(shot.pixel(x, y));
            }
        }
        out
    }

    pub fn background_pixels(&self, shot: &Screenshot) -> Vec<Rgb> {
        let r = self.background;
        let capacity = r.area().saturating_sub(self.element.area());
        let mut out = Vec::with_capacity(capacity as usize);
        for y in r.y..r.y + r.height {
            for x in r.x..r.x + r.width {
                if !self.element.contains(x, y) {
                    out.push(shot.pixel(x, y));
                }
            }
        }
        out
    }
}

/// Map one element to its element and background rectangles.
///
/// Partially visible boxes are clamped to the screenshot; boxes with a
/// non-positive size or lying completely outside are rejected.
pub fn extract_region(
    element: &ElementGeometry,
    shot: &Screenshot,
    margin: u32,
) -> Result<ElementRegion, GeometryError> {
    let b = element.bounding_box;
    if b.width <= 0 || b.height <= 0 {
        return Err(GeometryError::EmptyBox {
            id: element.id.clone(),
            width: b.width,
            height: b.height,
        });
    }

    // Saturating so absurd scales clamp away instead of wrapping
    let scale = shot.scale.max(1) as i64;
    let x0 = (b.x as i64).saturating_mul(scale);
    let y0 = (b.y as i64).saturating_mul(scale);
    let x1 = x0.saturating_add((b.width as i64).saturating_mul(scale));
    let y1 = y0.saturating_add((b.height as i64).saturating_mul(scale));
    let (w, h) = (shot.width as i64, shot.height as i64);

    let element_rect = clamp(x0, y0, x1, y1, w, h).ok_or_else(|| GeometryError::OutOfBounds {
        id: element.id.clone(),
        state: element.screenshot_ref,
    })?;

    let m = margin as i64;
    let background = clamp(
        x0.saturating_sub(m),
        y0.saturating_sub(m),
        x1.saturating_add(m),
        y1.saturating_add(m),
        w,
        h,
    ).ok_or_else(|| {
        GeometryError::NoBackground { id: element.id.clone() }
    })?;
    if background.area() <= element_rect.area() {
        return Err(GeometryError::NoBackground { id: element.id.clone() });
    }

    Ok(ElementRegion {
        element_id: element.id.clone(),
        kind: element.kind,
        state: element.screenshot_ref,
        element: element_rect,
        background,
    })
}

fn clamp(x0: i64, y0: i64, x1: i64, y1: i64, w: i64, h: i64) -> Option<Rect> {
    let cx0 = x0.clamp(0, w);
    let cy0 = y0.clamp(0, h);
    let cx1 = x1.clamp(0, w);
    let cy1 = y1.clamp(0, h);
    if cx1 <= cx0 || cy1 <= cy0 {
        return None;
    }
    Some(Rect {
        x: cx0 as u32,
        y: cy0 as u32,
        width: (cx1 - cx0) as u32,
        height: (cy1 - cy0) as u32,
    })
}
