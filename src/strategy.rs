//! Encoding strategy selection
//!
//! Maps content statistics and caller preferences to an [`EncodePlan`]. Pure:
//! the same inputs always give the same plan.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::analysis::{ContentClass, ContentStatistics};
use crate::constants::{
    DEFAULT_QUALITY, HIGH_QUALITY_THRESHOLD, MAXIMUM_PALETTE_SIZE, PROGRESSIVE_PIXEL_THRESHOLD,
    TIER_QUALITY_DELTA,
};
use crate::lossless::filter::FilterType;
use crate::plan::{EncodePlan, FilterMode};

/// Output family requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetFormat {
    /// Let the content decide.
    #[default]
    Auto,
    Lossy,
    Lossless,
}

/// Speed / size trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompressionTier {
    Fast,
    #[default]
    Balanced,
    Maximum,
}

impl CompressionTier {
    fn quality_delta(self) -> f32 {
        match self {
            CompressionTier::Fast => TIER_QUALITY_DELTA,
            CompressionTier::Balanced => 0.0,
            CompressionTier::Maximum => -TIER_QUALITY_DELTA,
        }
    }

    pub fn quant_scale(self) -> f32 {
        match self {
            CompressionTier::Fast => 0.9,
            CompressionTier::Balanced => 1.0,
            CompressionTier::Maximum => 1.1,
        }
    }

    pub fn filter_mode(self) -> FilterMode {
        match self {
            CompressionTier::Fast => FilterMode::Fixed(FilterType::Paeth),
            CompressionTier::Balanced | CompressionTier::Maximum => FilterMode::Adaptive,
        }
    }

    pub fn compression_level(self) -> u8 {
        match self {
            CompressionTier::Fast => 1,
            CompressionTier::Balanced => 6,
            CompressionTier::Maximum => 9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub format: TargetFormat,
    /// Requested quality in [0, 1]; `None` or NaN means the default.
    pub quality: Option<f32>,
    pub tier: CompressionTier,
}

/// Quality after defaulting, clamping and the tier nudge.
pub fn effective_quality(preferences: &Preferences) -> f32 {
    let base = preferences
        .quality
        .filter(|q| !q.is_nan())
        .unwrap_or(DEFAULT_QUALITY)
        .clamp(0.0, 1.0);
    (base + preferences.tier.quality_delta()).clamp(0.0, 1.0)
}

fn palette_worthwhile(stats: &ContentStatistics) -> bool {
    !stats.unique_colors_capped && stats.unique_colors <= MAXIMUM_PALETTE_SIZE
}

fn lossy_plan(quality: f32, subsampling: bool, tier: CompressionTier) -> EncodePlan {
    EncodePlan::transform_quantize(quality)
        .with_quant_scale(tier.quant_scale())
        .with_chroma_subsampling(subsampling)
}

fn lossless_plan(quality: f32, palette: bool, tier: CompressionTier) -> EncodePlan {
    EncodePlan::filter_entropy(quality)
        .with_filter(tier.filter_mode())
        .with_palette(palette)
        .with_compression_level(tier.compression_level())
}

/// Chooses a codec and its parameters for an analyzed image.
pub fn select_strategy(stats: &ContentStatistics, preferences: &Preferences) -> EncodePlan {
    let quality = effective_quality(preferences);
    let tier = preferences.tier;
    let photograph = stats.classification == ContentClass::Photograph;

    let plan = match preferences.format {
        TargetFormat::Lossy => lossy_plan(quality, photograph, tier),
        TargetFormat::Lossless => lossless_plan(quality, palette_worthwhile(stats), tier),
        TargetFormat::Auto => {
            if stats.has_alpha {
                lossless_plan(quality, palette_worthwhile(stats), tier)
            } else if photograph && quality > HIGH_QUALITY_THRESHOLD {
                lossy_plan(quality, true, tier)
            } else if !photograph {
                lossless_plan(quality, true, tier)
            } else {
                lossy_plan(quality, false, tier)
            }
        }
    };
    let plan = plan.with_progressive(stats.pixel_count > PROGRESSIVE_PIXEL_THRESHOLD);

    trace!(
        family = plan.family().name(),
        quality,
        progressive = plan.progressive,
        "strategy selected"
    );
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{CodecFamily, CodecParams};

    fn stats(classification: ContentClass, has_alpha: bool, unique_colors: usize) -> ContentStatistics {
        ContentStatistics {
            entropy: 5.0,
            edge_density: 0.1,
            color_variance: 100.0,
            local_variance: if classification == ContentClass::Photograph { 300.0 } else { 2.0 },
            unique_colors,
            unique_colors_capped: false,
            has_alpha,
            classification,
            pixel_count: 10_000,
        }
    }

    fn prefs(format: TargetFormat, quality: Option<f32>, tier: CompressionTier) -> Preferences {
        Preferences {
            format,
            quality,
            tier,
        }
    }

    #[test]
    fn test_quality_defaults_and_clamps() {
        let p = |q| prefs(TargetFormat::Auto, q, CompressionTier::Balanced);
        assert_eq!(effective_quality(&p(None)), 0.8);
        assert_eq!(effective_quality(&p(Some(f32::NAN))), 0.8);
        assert_eq!(effective_quality(&p(Some(3.0))), 1.0);
        assert_eq!(effective_quality(&p(Some(-1.0))), 0.0);
        let fast = prefs(TargetFormat::Auto, Some(1.0), CompressionTier::Fast);
        assert_eq!(effective_quality(&fast), 1.0);
        let maximum = prefs(TargetFormat::Auto, Some(0.0), CompressionTier::Maximum);
        assert_eq!(effective_quality(&maximum), 0.0);
    }

    #[test]
    fn test_alpha_goes_lossless() {
        let plan = select_strategy(
            &stats(ContentClass::Photograph, true, 4000),
            &Preferences::default(),
        );
        assert_eq!(plan.family(), CodecFamily::FilterEntropy);
        assert!(matches!(plan.params, CodecParams::FilterEntropy { palette: false, .. }));

        let plan = select_strategy(&stats(ContentClass::Graphic, true, 12), &Preferences::default());
        assert!(matches!(plan.params, CodecParams::FilterEntropy { palette: true, .. }));
    }

    #[test]
    fn test_photograph_rules_use_nudged_quality() {
        let photo = stats(ContentClass::Photograph, false, 4000);

        // Balanced at 0.8 is not above the threshold.
        let plan = select_strategy(&photo, &Preferences::default());
        assert_eq!(
            plan.params,
            CodecParams::TransformQuantize {
                quant_scale: 1.0,
                chroma_subsampling: false
            }
        );

        // Fast nudges 0.8 up to 0.85.
        let plan = select_strategy(&photo, &prefs(TargetFormat::Auto, None, CompressionTier::Fast));
        assert_eq!(
            plan.params,
            CodecParams::TransformQuantize {
                quant_scale: 0.9,
                chroma_subsampling: true
            }
        );
        assert!((plan.quality - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_graphic_goes_lossless_with_palette() {
        let plan = select_strategy(
            &stats(ContentClass::Graphic, false, 4000),
            &prefs(TargetFormat::Auto, Some(0.5), CompressionTier::Maximum),
        );
        assert_eq!(
            plan.params,
            CodecParams::FilterEntropy {
                filter: FilterMode::Adaptive,
                palette: true,
                compression_level: 9
            }
        );
        assert!((plan.quality - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_pinned_formats() {
        let photo = stats(ContentClass::Photograph, true, 100);
        let plan = select_strategy(&photo, &prefs(TargetFormat::Lossy, Some(0.3), CompressionTier::Balanced));
        assert!(matches!(
            plan.params,
            CodecParams::TransformQuantize { chroma_subsampling: true, .. }
        ));

        let graphic = stats(ContentClass::Graphic, false, 100);
        let plan = select_strategy(&graphic, &prefs(TargetFormat::Lossy, None, CompressionTier::Balanced));
        assert!(matches!(
            plan.params,
            CodecParams::TransformQuantize { chroma_subsampling: false, .. }
        ));

        let plan = select_strategy(&photo, &prefs(TargetFormat::Lossless, None, CompressionTier::Fast));
        assert_eq!(
            plan.params,
            CodecParams::FilterEntropy {
                filter: FilterMode::Fixed(FilterType::Paeth),
                palette: true,
                compression_level: 1
            }
        );
    }

    #[test]
    fn test_progressive_only_for_large_images() {
        let mut large = stats(ContentClass::Photograph, false, 4000);
        large.pixel_count = 1_000_001;
        assert!(select_strategy(&large, &Preferences::default()).progressive);
        large.pixel_count = 1_000_000;
        assert!(!select_strategy(&large, &Preferences::default()).progressive);
    }

    #[test]
    fn test_selection_is_pure() {
        let s = stats(ContentClass::Graphic, false, 300);
        let p = prefs(TargetFormat::Auto, Some(0.6), CompressionTier::Fast);
        assert_eq!(select_strategy(&s, &p), select_strategy(&s, &p));
    }
}
