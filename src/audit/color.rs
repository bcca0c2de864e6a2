//! Dominant color extraction via a quantized histogram

use crate::page::Rgb;
use serde::Serialize;
use std::collections::BTreeMap;

/// Dominant color of a region and how much of it that color covers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorSample {
    pub rgb: Rgb,
    /// Which rectangle the sample came from
    pub region: SampleRegion,
    /// Share of the region's pixels in the winning bucket, in (0, 1]
    pub coverage: f64,
    /// Coverage at or below the configured minimum
    pub low_confidence: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleRegion {
    Element,
    Background,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bin {
    count: u64,
    sums: [u64; 3],
}

/// Quantizes each channel into `buckets` levels and picks the fullest bin.
#[derive(Debug, Clone, Copy)]
pub struct ColorProfiler {
    buckets: u32,
    min_coverage: f64,
}

impl ColorProfiler {
    /// `buckets` is clamped into 1..=256.
    pub fn new(buckets: u32, min_coverage: f64) -> Self {
        Self {
            buckets: buckets.clamp(1, 256),
            min_coverage,
        }
    }

    fn bucket_of(&self, channel: u8) -> usize {
        (channel as u32 * self.buckets / 256) as usize
    }

    fn bin_of(&self, c: Rgb) -> usize {
        let b = self.buckets as usize;
        (self.bucket_of(c.0) * b + self.bucket_of(c.1)) * b + self.bucket_of(c.2)
    }

    /// Returns `None` for an empty region.
    ///
    /// The representative color is the rounded mean of the pixels that fell
    /// into the winning bin, so uniform regions come back exactly. Ties go to
    /// the lowest bin index.
    pub fn profile(&self, pixels: &[Rgb], region: SampleRegion) -> Option<ColorSample> {
        if pixels.is_empty() {
            return None;
        }
        // Only occupied bins are stored
        let mut bins: BTreeMap<usize, Bin> = BTreeMap::new();
        for p in pixels {
            let bin = bins.entry(self.bin_of(*p)).or_default();
            bin.count += 1;
            bin.sums[0] += p.0 as u64;
            bin.sums[1] += p.1 as u64;
            bin.sums[2] += p.2 as u64;
        }

        // Ascending key order with a strict `>` keeps the lowest bin on ties
        let mut best = Bin::default();
        for bin in bins.values() {
            if bin.count > best.count {
                best = *bin;
            }
        }
        let n = best.count;
        let mean = |s: u64| ((s as f64 / n as f64).round()).clamp(0.0, 255.0) as u8;
        let rgb = Rgb(mean(best.sums[0]), mean(best.sums[1]), mean(best.sums[2]));
        let coverage = n as f64 / pixels.len() as f64;

        Some(ColorSample {
            rgb,
            region,
            coverage,
            low_confidence: coverage <= self.min_coverage,
        })
    }
}
