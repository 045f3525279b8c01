//! Encode plans: what the selector decides and what a codec consumes.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::constants::MAXIMUM_COMPRESSION_LEVEL;
use crate::error::EncodeFailure;
use crate::lossless::filter::FilterType;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum CodecFamily {
    /// Block DCT, quantization and run-length coding. Lossy.
    TransformQuantize = 1,
    /// Palette, scanline prediction and deflate. Lossless.
    FilterEntropy = 2,
}

impl CodecFamily {
    pub fn name(self) -> &'static str {
        match self {
            CodecFamily::TransformQuantize => "transform-quantize",
            CodecFamily::FilterEntropy => "filter-entropy",
        }
    }

    pub fn is_lossless(self) -> bool {
        matches!(self, CodecFamily::FilterEntropy)
    }
}

/// How the lossless codec picks a scanline filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    None,
    /// Per-row minimum sum of absolute residuals.
    Adaptive,
    Fixed(FilterType),
}

impl FilterMode {
    pub(crate) fn tag(self) -> u8 {
        match self {
            FilterMode::None => 0,
            FilterMode::Adaptive => 0x80,
            FilterMode::Fixed(filter) => 0x40 | u8::from(filter),
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(FilterMode::None),
            0x80 => Some(FilterMode::Adaptive),
            t if t & 0xC0 == 0x40 => FilterType::try_from(t & 0x3F).ok().map(FilterMode::Fixed),
            _ => None,
        }
    }
}

/// Family-specific parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CodecParams {
    TransformQuantize {
        quant_scale: f32,
        chroma_subsampling: bool,
    },
    FilterEntropy {
        filter: FilterMode,
        palette: bool,
        compression_level: u8,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncodePlan {
    pub quality: f32,
    pub progressive: bool,
    pub params: CodecParams,
}

impl EncodePlan {
    pub fn transform_quantize(quality: f32) -> Self {
        Self {
            quality,
            progressive: false,
            params: CodecParams::TransformQuantize {
                quant_scale: 1.0,
                chroma_subsampling: false,
            },
        }
    }

    pub fn filter_entropy(quality: f32) -> Self {
        Self {
            quality,
            progressive: false,
            params: CodecParams::FilterEntropy {
                filter: FilterMode::Adaptive,
                palette: false,
                compression_level: 6,
            },
        }
    }

    pub fn with_chroma_subsampling(mut self, enabled: bool) -> Self {
        if let CodecParams::TransformQuantize {
            chroma_subsampling, ..
        } = &mut self.params
        {
            *chroma_subsampling = enabled;
        }
        self
    }

    pub fn with_quant_scale(mut self, scale: f32) -> Self {
        if let CodecParams::TransformQuantize { quant_scale, .. } = &mut self.params {
            *quant_scale = scale;
        }
        self
    }

    pub fn with_palette(mut self, enabled: bool) -> Self {
        if let CodecParams::FilterEntropy { palette, .. } = &mut self.params {
            *palette = enabled;
        }
        self
    }

    pub fn with_filter(mut self, mode: FilterMode) -> Self {
        if let CodecParams::FilterEntropy { filter, .. } = &mut self.params {
            *filter = mode;
        }
        self
    }

    pub fn with_compression_level(mut self, level: u8) -> Self {
        if let CodecParams::FilterEntropy {
            compression_level, ..
        } = &mut self.params
        {
            *compression_level = level;
        }
        self
    }

    pub fn with_progressive(mut self, progressive: bool) -> Self {
        self.progressive = progressive;
        self
    }

    pub fn family(&self) -> CodecFamily {
        match self.params {
            CodecParams::TransformQuantize { .. } => CodecFamily::TransformQuantize,
            CodecParams::FilterEntropy { .. } => CodecFamily::FilterEntropy,
        }
    }

    /// Checks the contract shared by both codecs plus the family's own fields.
    pub fn validate(&self) -> Result<(), EncodeFailure> {
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(EncodeFailure::QualityOutOfRange(self.quality));
        }
        match self.params {
            CodecParams::TransformQuantize { quant_scale, .. } => {
                if !quant_scale.is_finite() || quant_scale <= 0.0 {
                    return Err(EncodeFailure::QuantScaleOutOfRange(quant_scale));
                }
            }
            CodecParams::FilterEntropy {
                compression_level, ..
            } => {
                if compression_level > MAXIMUM_COMPRESSION_LEVEL {
                    return Err(EncodeFailure::CompressionLevelOutOfRange(compression_level));
                }
            }
        }
        Ok(())
    }

    /// The plan to try when this one fails. Only the lossy family has one.
    pub fn fallback(&self) -> Option<EncodePlan> {
        match self.params {
            CodecParams::TransformQuantize { .. } => Some(EncodePlan {
                quality: self.quality,
                progressive: self.progressive,
                params: CodecParams::FilterEntropy {
                    filter: FilterMode::Adaptive,
                    palette: true,
                    compression_level: 6,
                },
            }),
            CodecParams::FilterEntropy { .. } => None,
        }
    }

    /// Stable byte encoding used for cache fingerprints.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        out.push(u8::from(self.family()));
        out.extend_from_slice(&self.quality.to_bits().to_be_bytes());
        out.push(self.progressive as u8);
        match self.params {
            CodecParams::TransformQuantize {
                quant_scale,
                chroma_subsampling,
            } => {
                out.extend_from_slice(&quant_scale.to_bits().to_be_bytes());
                out.push(chroma_subsampling as u8);
            }
            CodecParams::FilterEntropy {
                filter,
                palette,
                compression_level,
            } => {
                out.push(filter.tag());
                out.push(palette as u8);
                out.push(compression_level);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_out_of_range_quality() {
        assert_eq!(
            EncodePlan::transform_quantize(2.0).validate(),
            Err(EncodeFailure::QualityOutOfRange(2.0))
        );
        assert!(EncodePlan::filter_entropy(f32::NAN).validate().is_err());
        assert!(EncodePlan::filter_entropy(0.0).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_family_parameters() {
        let plan = EncodePlan::transform_quantize(0.5).with_quant_scale(0.0);
        assert_eq!(plan.validate(), Err(EncodeFailure::QuantScaleOutOfRange(0.0)));
        let plan = EncodePlan::filter_entropy(0.5).with_compression_level(12);
        assert_eq!(
            plan.validate(),
            Err(EncodeFailure::CompressionLevelOutOfRange(12))
        );
    }

    #[test]
    fn test_fallback_table() {
        let lossy = EncodePlan::transform_quantize(0.7).with_progressive(true);
        let fallback = lossy.fallback().unwrap();
        assert_eq!(fallback.family(), CodecFamily::FilterEntropy);
        assert_eq!(fallback.quality, 0.7);
        assert!(fallback.progressive);
        assert!(fallback.fallback().is_none());
    }

    #[test]
    fn test_filter_mode_tags() {
        for mode in [
            FilterMode::None,
            FilterMode::Adaptive,
            FilterMode::Fixed(FilterType::Sub),
            FilterMode::Fixed(FilterType::Paeth),
        ] {
            assert_eq!(FilterMode::from_tag(mode.tag()), Some(mode));
        }
        assert_eq!(FilterMode::from_tag(0x4F), None);
        assert_eq!(FilterMode::from_tag(0x81), None);
    }

    #[test]
    fn test_canonical_bytes_distinguish_plans() {
        let a = EncodePlan::transform_quantize(0.5);
        let b = a.with_chroma_subsampling(true);
        let c = EncodePlan::filter_entropy(0.5);
        assert_ne!(a.canonical_bytes(), b.canonical_bytes());
        assert_ne!(a.canonical_bytes(), c.canonical_bytes());
        assert_eq!(a.canonical_bytes(), EncodePlan::transform_quantize(0.5).canonical_bytes());
    }
}
