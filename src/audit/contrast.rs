//! Contrast evaluation - WCAG 1.4.11 Non-text Contrast (Level AA)
//!
//! Relative luminance and contrast ratio follow the WCAG 2.x definitions:
//! <https://www.w3.org/TR/WCAG21/#dfn-relative-luminance>

use crate::audit::color::ColorSample;
use crate::page::{ElementKind, RenderState, Rgb};
use serde::Serialize;

pub const WCAG_NON_TEXT_CONTRAST: &str = "1.4.11";

/// Calculate relative luminance of an sRGB color
pub fn relative_luminance(c: Rgb) -> f64 {
    let lin = [c.0, c.1, c.2].map(|v| {
        let v = v as f64 / 255.0;
        if v <= 0.04045 {
            v / 12.92
        } else {
            ((v + 0.055) / 1.055).powf(2.4)
        }
    });
    0.2126 * lin[0] + 0.7152 * lin[1] + 0.0722 * lin[2]
}

/// Contrast ratio between two colors, in [1, 21]. Order of arguments does
/// not matter.
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let la = relative_luminance(a);
    let lb = relative_luminance(b);
    let (lighter, darker) = if la >= lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContrastVerdict {
    Pass,
    Warning,
    Fail,
}

/// Outcome for one element in one render state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContrastFinding {
    pub element_id: String,
    #[serde(rename = "element_kind")]
    pub kind: ElementKind,
    pub state: RenderState,
    pub criterion: &'static str,
    pub foreground: ColorSample,
    pub background: ColorSample,
    pub ratio: f64,
    pub required_ratio: f64,
    pub verdict: ContrastVerdict,
}

/// Required ratios per element kind
#[derive(Debug, Clone, Copy)]
pub struct ContrastEvaluator {
    pub submit_ratio: f64,
    pub input_ratio: f64,
}

impl ContrastEvaluator {
    /// Both kinds are non-text UI components and share one threshold
    pub fn new(min_component_contrast: f64) -> Self {
        Self {
            submit_ratio: min_component_contrast,
            input_ratio: min_component_contrast,
        }
    }

    pub fn required_ratio(&self, kind: ElementKind) -> f64 {
        match kind {
            ElementKind::Submit => self.submit_ratio,
            ElementKind::Input => self.input_ratio,
        }
    }

    /// An uncertain color measurement is never reported as a hard failure.
    pub fn evaluate(
        &self,
        element_id: &str,
        kind: ElementKind,
        state: RenderState,
        foreground: ColorSample,
        background: ColorSample,
    ) -> ContrastFinding {
        let ratio = contrast_ratio(foreground.rgb, background.rgb);
        let required_ratio = self.required_ratio(kind);
        let verdict = if foreground.low_confidence || background.low_confidence {
            ContrastVerdict::Warning
        } else if ratio >= required_ratio {
            ContrastVerdict::Pass
        } else {
            ContrastVerdict::Fail
        };
        ContrastFinding {
            element_id: element_id.to_string(),
            kind,
            state,
            criterion: WCAG_NON_TEXT_CONTRAST,
            foreground,
            background,
            ratio,
            required_ratio,
            verdict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::color::SampleRegion;

    fn sample(rgb: Rgb, low_confidence: bool) -> ColorSample {
        ColorSample {
            rgb,
            region: SampleRegion::Element,
            coverage: 1.0,
            low_confidence,
        }
    }

    #[test]
    fn white_on_black_is_maximum() {
        assert!((contrast_ratio(Rgb::WHITE, Rgb::BLACK) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn same_color_is_one() {
        let c = Rgb(12, 200, 99);
        assert_eq!(contrast_ratio(c, c), 1.0);
    }

    #[test]
    fn ratio_is_symmetric() {
        let a = Rgb(0x33, 0x66, 0x99);
        let b = Rgb(0xee, 0xdd, 0x00);
        assert_eq!(contrast_ratio(a, b), contrast_ratio(b, a));
    }

    #[test]
    fn darker_background_never_lowers_ratio() {
        let fg = Rgb(230, 230, 230);
        let mut prev = contrast_ratio(fg, Rgb(200, 200, 200));
        for v in (0..200u8).rev() {
            let r = contrast_ratio(fg, Rgb(v, v, v));
            assert!(r >= prev, "ratio dropped at {}", v);
            prev = r;
        }
    }

    #[test]
    fn low_confidence_downgrades_to_warning() {
        let ev = ContrastEvaluator::new(3.0);
        let f = ev.evaluate(
            "b",
            ElementKind::Submit,
            RenderState::Default,
            sample(Rgb(0x77, 0x77, 0x77), false),
            sample(Rgb(0x88, 0x88, 0x88), true),
        );
        assert_eq!(f.verdict, ContrastVerdict::Warning);
        assert!(f.ratio < 3.0);
    }

    #[test]
    fn threshold_is_inclusive() {
        let ev = ContrastEvaluator::new(1.0);
        let c = Rgb(5, 5, 5);
        let f = ev.evaluate("b", ElementKind::Input, RenderState::Focused, sample(c, false), sample(c, false));
        assert_eq!(f.verdict, ContrastVerdict::Pass);
        assert_eq!(f.criterion, "1.4.11");
    }
}
