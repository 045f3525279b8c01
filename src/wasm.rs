//! WebAssembly bindings for rasterpress.
//!
//! This module provides JavaScript-compatible functions via wasm-bindgen
//! for use in browsers and Node.js. Pixels cross the boundary as flat RGBA.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use crate::{CompressionTier, PixelBuffer, Preferences, TargetFormat};

/// Stream information returned from WASM API.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// 1 = transform-quantize, 2 = filter-entropy.
    pub family: u8,
    pub flags: u8,
}

#[cfg(target_arch = "wasm32")]
fn to_js<E: std::fmt::Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[cfg(target_arch = "wasm32")]
fn parse_format(format: &str) -> Result<TargetFormat, JsValue> {
    match format {
        "auto" => Ok(TargetFormat::Auto),
        "lossy" => Ok(TargetFormat::Lossy),
        "lossless" => Ok(TargetFormat::Lossless),
        other => Err(JsValue::from_str(&format!("unknown format '{}'", other))),
    }
}

#[cfg(target_arch = "wasm32")]
fn parse_tier(tier: &str) -> Result<CompressionTier, JsValue> {
    match tier {
        "fast" => Ok(CompressionTier::Fast),
        "balanced" => Ok(CompressionTier::Balanced),
        "maximum" => Ok(CompressionTier::Maximum),
        other => Err(JsValue::from_str(&format!("unknown tier '{}'", other))),
    }
}

/// Analyze RGBA pixels and return the statistics as a JSON string.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn analyze_image(pixels: &[u8], width: u32, height: u32) -> Result<String, JsValue> {
    let stats = crate::analyze_rgba(width, height, pixels).map_err(to_js)?;
    serde_json::to_string(&stats).map_err(to_js)
}

/// Analyze, pick a strategy and encode.
///
/// # Arguments
/// * `format` - "auto", "lossy" or "lossless"
/// * `quality` - 0.0 to 1.0; NaN selects the default
/// * `tier` - "fast", "balanced" or "maximum"
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn encode_image(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: &str,
    quality: f32,
    tier: &str,
) -> Result<Vec<u8>, JsValue> {
    let buffer = PixelBuffer::new(width, height, pixels.to_vec()).map_err(to_js)?;
    let preferences = Preferences {
        format: parse_format(format)?,
        quality: Some(quality),
        tier: parse_tier(tier)?,
    };
    let plan = crate::select_strategy(&crate::analyze(&buffer), &preferences);
    let result = crate::encode(&buffer, &plan).map_err(to_js)?;
    Ok(result.data)
}

/// Decode a stream back to RGBA pixels.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn decode_image(data: &[u8]) -> Result<Vec<u8>, JsValue> {
    let buffer = crate::decode(data).map_err(to_js)?;
    Ok(buffer.into_data())
}

/// Get stream information without full decode.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn get_image_info(data: &[u8]) -> Result<ImageInfo, JsValue> {
    let header = crate::stream_reader::peek_header(data).map_err(to_js)?;
    Ok(ImageInfo {
        width: header.width,
        height: header.height,
        family: header.family.into(),
        flags: header.flags,
    })
}
