//! Image content analysis used to pick an encoding strategy.
//!
//! Two passes: a full pass for the luminance histogram, alpha, color buckets
//! and channel moments, then a stride-sampled pass over interior pixels for
//! Sobel edges and 3x3 local variance.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_EDGE_THRESHOLD, DEFAULT_MAX_EDGE_SAMPLES, DEFAULT_MAX_TRACKED_COLORS,
    DEFAULT_PHOTO_VARIANCE_THRESHOLD,
};
use crate::error::CodecResult;
use crate::pixel_buffer::PixelBuffer;

/// Coarse content class driving the codec choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentClass {
    /// Continuous tone, noisy texture.
    Photograph,
    /// Flat regions, few colors, hard edges.
    Graphic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentStatistics {
    /// Shannon entropy of the luminance histogram, in bits (0..=8).
    pub entropy: f64,
    /// Fraction of sampled pixels whose Sobel magnitude exceeds the threshold.
    pub edge_density: f64,
    /// Mean of the R, G and B channel variances.
    pub color_variance: f64,
    /// Mean 3x3 luminance variance over the sampled pixels.
    pub local_variance: f64,
    /// Distinct colors after bucketing each channel to 32 levels.
    pub unique_colors: usize,
    /// Set when `unique_colors` stopped at the tracking limit.
    pub unique_colors_capped: bool,
    pub has_alpha: bool,
    pub classification: ContentClass,
    pub pixel_count: u64,
}

/// Analyzer thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub edge_threshold: f32,
    pub photo_variance_threshold: f64,
    pub max_tracked_colors: usize,
    /// Approximate upper bound on pixels visited by the edge pass.
    pub max_edge_samples: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
            photo_variance_threshold: DEFAULT_PHOTO_VARIANCE_THRESHOLD,
            max_tracked_colors: DEFAULT_MAX_TRACKED_COLORS,
            max_edge_samples: DEFAULT_MAX_EDGE_SAMPLES,
        }
    }
}

#[inline]
fn luminance(px: &[u8]) -> f32 {
    0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32
}

/// RGBA quantized to 5 bits per channel.
#[inline]
fn color_bucket(px: &[u8]) -> u32 {
    ((px[0] as u32 >> 3) << 15) | ((px[1] as u32 >> 3) << 10) | ((px[2] as u32 >> 3) << 5) | (px[3] as u32 >> 3)
}

fn histogram_entropy(histogram: &[u64; 256], total: u64) -> f64 {
    let total = total as f64;
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Sobel edge density and mean local variance over a sampled interior grid.
fn sample_structure(luma: &[f32], width: usize, height: usize, config: &AnalyzerConfig) -> (f64, f64) {
    if width < 3 || height < 3 {
        return (0.0, 0.0);
    }
    let interior = (width - 2) * (height - 2);
    let budget = config.max_edge_samples.max(1);
    let stride = ((interior as f64 / budget as f64).sqrt().ceil() as usize).max(1);

    let at = |x: usize, y: usize| luma[y * width + x];
    let mut samples = 0u64;
    let mut edges = 0u64;
    let mut variance_sum = 0.0f64;

    for y in (1..height - 1).step_by(stride) {
        for x in (1..width - 1).step_by(stride) {
            let gx = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
            let gy = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));
            if (gx * gx + gy * gy).sqrt() > config.edge_threshold {
                edges += 1;
            }

            let mut sum = 0.0f64;
            let mut sum_sq = 0.0f64;
            for ny in y - 1..=y + 1 {
                for nx in x - 1..=x + 1 {
                    let v = at(nx, ny) as f64;
                    sum += v;
                    sum_sq += v * v;
                }
            }
            let mean = sum / 9.0;
            variance_sum += (sum_sq / 9.0 - mean * mean).max(0.0);
            samples += 1;
        }
    }

    (edges as f64 / samples as f64, variance_sum / samples as f64)
}

/// Analyzes `buffer` with explicit thresholds.
pub fn analyze_with(buffer: &PixelBuffer, config: &AnalyzerConfig) -> ContentStatistics {
    let width = buffer.width() as usize;
    let height = buffer.height() as usize;
    let pixel_count = buffer.pixel_count();

    let mut histogram = [0u64; 256];
    let mut luma = Vec::with_capacity(width * height);
    let mut has_alpha = false;
    let mut buckets = HashSet::new();
    let mut capped = false;
    let mut sums = [0.0f64; 3];
    let mut squares = [0.0f64; 3];

    for px in buffer.data().chunks_exact(4) {
        let y = luminance(px);
        histogram[y.round() as usize] += 1;
        luma.push(y);
        has_alpha |= px[3] < 255;

        if !capped {
            let bucket = color_bucket(px);
            if buckets.len() < config.max_tracked_colors {
                buckets.insert(bucket);
            } else if !buckets.contains(&bucket) {
                capped = true;
            }
        }

        for c in 0..3 {
            let v = px[c] as f64;
            sums[c] += v;
            squares[c] += v * v;
        }
    }

    let n = pixel_count as f64;
    let color_variance = (0..3)
        .map(|c| {
            let mean = sums[c] / n;
            (squares[c] / n - mean * mean).max(0.0)
        })
        .sum::<f64>()
        / 3.0;

    let (edge_density, local_variance) = sample_structure(&luma, width, height, config);
    let classification = if local_variance > config.photo_variance_threshold {
        ContentClass::Photograph
    } else {
        ContentClass::Graphic
    };

    ContentStatistics {
        entropy: histogram_entropy(&histogram, pixel_count),
        edge_density,
        color_variance,
        local_variance,
        unique_colors: buckets.len(),
        unique_colors_capped: capped,
        has_alpha,
        classification,
        pixel_count,
    }
}

/// Analyzes `buffer` with the default thresholds.
pub fn analyze(buffer: &PixelBuffer) -> ContentStatistics {
    analyze_with(buffer, &AnalyzerConfig::default())
}

/// Validates raw RGBA samples and analyzes them.
pub fn analyze_rgba(width: u32, height: u32, rgba: &[u8]) -> CodecResult<ContentStatistics> {
    let buffer = PixelBuffer::new(width, height, rgba.to_vec())?;
    Ok(analyze(&buffer))
}
