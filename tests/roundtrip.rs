//! End-to-end codec tests through the public API.

use proptest::prelude::*;
use rasterpress::{
    CodecFamily, CompressionTier, EncodePlan, FilterMode, Optimization, PixelBuffer, Preferences,
    TargetFormat,
};

fn indexed_image(width: u32, height: u32, colors: u32) -> PixelBuffer {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let i = ((x / 3 + y * 7) % colors) as u8;
            data.extend_from_slice(&[i, i.wrapping_mul(7), 255 - i, 255]);
        }
    }
    PixelBuffer::new(width, height, data).unwrap()
}

#[test]
fn test_palette_image_roundtrips_exactly() {
    let buffer = indexed_image(300, 200, 180);
    let stats = rasterpress::analyze(&buffer);
    assert!(!stats.unique_colors_capped);

    let preferences = Preferences {
        format: TargetFormat::Lossless,
        ..Preferences::default()
    };
    let plan = rasterpress::select_strategy(&stats, &preferences);
    assert_eq!(plan.family(), CodecFamily::FilterEntropy);

    let result = rasterpress::encode(&buffer, &plan).unwrap();
    assert!(result
        .optimizations
        .contains(&Optimization::PaletteReduction { colors: 180 }));
    assert!(result.len() < buffer.data().len() / 4);
    assert_eq!(rasterpress::decode(&result.data).unwrap(), buffer);
}

#[test]
fn test_solid_red_lossy_is_smaller_than_raw() {
    let buffer = PixelBuffer::filled(16, 16, [255, 0, 0, 255]).unwrap();
    let result = rasterpress::encode(&buffer, &EncodePlan::transform_quantize(0.9)).unwrap();
    assert_eq!(result.family, CodecFamily::TransformQuantize);
    assert!(result.len() < buffer.data().len(), "encoded {} bytes", result.len());
}

#[test]
fn test_solid_image_encodes_small() {
    let buffer = PixelBuffer::filled(16, 16, [255, 0, 0, 255]).unwrap();
    let preferences = Preferences {
        quality: Some(0.9),
        ..Preferences::default()
    };
    let plan = rasterpress::select_strategy(&rasterpress::analyze(&buffer), &preferences);
    let result = rasterpress::encode(&buffer, &plan).unwrap();
    assert!(result.len() < 1024, "encoded {} bytes", result.len());
    assert_eq!(rasterpress::decode(&result.data).unwrap(), buffer);
}

#[test]
fn test_photo_pipeline_keeps_dimensions() {
    let (width, height) = (70u32, 45u32);
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    let mut seed = 0x2545_F491u32;
    for y in 0..height {
        for x in 0..width {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let noise = (seed >> 24) as u8 / 2;
            data.extend_from_slice(&[
                (x * 3) as u8 ^ noise,
                (y * 5) as u8 ^ noise,
                noise.wrapping_mul(3),
                255,
            ]);
        }
    }
    let buffer = PixelBuffer::new(width, height, data).unwrap();
    let stats = rasterpress::analyze(&buffer);

    for tier in [CompressionTier::Fast, CompressionTier::Balanced, CompressionTier::Maximum] {
        let preferences = Preferences {
            format: TargetFormat::Lossy,
            quality: Some(0.75),
            tier,
        };
        let plan = rasterpress::select_strategy(&stats, &preferences);
        let result = rasterpress::encode(&buffer, &plan).unwrap();
        assert_eq!(result.family, CodecFamily::TransformQuantize);
        let decoded = rasterpress::decode(&result.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (width, height));
    }
}

#[test]
fn test_header_matches_result() {
    let buffer = indexed_image(33, 17, 12);
    let plan = EncodePlan::transform_quantize(0.5).with_progressive(true);
    let result = rasterpress::encode(&buffer, &plan).unwrap();
    let header = rasterpress::stream_reader::peek_header(&result.data).unwrap();
    assert_eq!(header.family, CodecFamily::TransformQuantize);
    assert_eq!((header.width, header.height), (33, 17));
    assert!(header.has_flag(rasterpress::constants::FLAG_PROGRESSIVE));
}

fn pixels_strategy() -> impl Strategy<Value = PixelBuffer> {
    (1u32..24, 1u32..24).prop_flat_map(|(w, h)| {
        prop::collection::vec(any::<u8>(), (w * h * 4) as usize)
            .prop_map(move |data| PixelBuffer::new(w, h, data).unwrap())
    })
}

fn filter_strategy() -> impl Strategy<Value = FilterMode> {
    prop_oneof![
        Just(FilterMode::None),
        Just(FilterMode::Adaptive),
        (0u8..5).prop_map(|t| FilterMode::Fixed(t.try_into().unwrap())),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_lossless_is_exact(
        buffer in pixels_strategy(),
        filter in filter_strategy(),
        palette in any::<bool>(),
        level in 0u8..=9,
    ) {
        let plan = EncodePlan::filter_entropy(1.0)
            .with_filter(filter)
            .with_palette(palette)
            .with_compression_level(level);
        let result = rasterpress::encode(&buffer, &plan).unwrap();
        prop_assert_eq!(rasterpress::decode(&result.data).unwrap(), buffer);
    }

    #[test]
    fn prop_lossy_size_follows_quality(
        buffer in pixels_strategy(),
        a in 0.0f32..=1.0,
        b in 0.0f32..=1.0,
        subsampling in any::<bool>(),
        progressive in any::<bool>(),
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let plan = |q| {
            EncodePlan::transform_quantize(q)
                .with_chroma_subsampling(subsampling)
                .with_progressive(progressive)
        };
        let small = rasterpress::encode(&buffer, &plan(low)).unwrap();
        let large = rasterpress::encode(&buffer, &plan(high)).unwrap();
        prop_assert!(
            small.len() <= large.len(),
            "quality {} gave {} bytes, quality {} gave {}",
            low, small.len(), high, large.len()
        );
    }

    #[test]
    fn prop_selected_plan_is_valid(buffer in pixels_strategy(), quality in proptest::option::of(0.0f32..=1.0)) {
        let preferences = Preferences { quality, ..Preferences::default() };
        let plan = rasterpress::select_strategy(&rasterpress::analyze(&buffer), &preferences);
        prop_assert!(plan.validate().is_ok());
        let result = rasterpress::encode(&buffer, &plan).unwrap();
        let decoded = rasterpress::decode(&result.data).unwrap();
        prop_assert_eq!(decoded.width(), buffer.width());
        if buffer.has_alpha() {
            prop_assert_eq!(result.family, CodecFamily::FilterEntropy);
        }
    }
}
