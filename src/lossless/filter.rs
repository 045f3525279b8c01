//! Scanline prediction filters.
//!
//! Each row is replaced by its residual against a predictor built from the
//! neighbouring bytes. `a` is the byte one pixel to the left, `b` the byte
//! directly above and `c` the byte above-left; positions outside the image
//! read as zero.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};
use crate::plan::FilterMode;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
pub enum FilterType {
    None = 0,
    /// Left delta.
    Sub = 1,
    /// Up delta.
    Up = 2,
    /// Mean of left and up.
    Average = 3,
    Paeth = 4,
}

impl FilterType {
    /// Candidate order for the adaptive search; earlier entries win ties.
    pub const ALL: [FilterType; 5] = [
        FilterType::None,
        FilterType::Sub,
        FilterType::Up,
        FilterType::Average,
        FilterType::Paeth,
    ];

    pub fn predict(self, a: u8, b: u8, c: u8) -> u8 {
        match self {
            FilterType::None => 0,
            FilterType::Sub => a,
            FilterType::Up => b,
            FilterType::Average => ((a as u16 + b as u16) >> 1) as u8,
            FilterType::Paeth => paeth(a, b, c),
        }
    }
}

/// Picks whichever of a, b, c is closest to `a + b - c`, preferring a then b.
pub fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Writes the residuals of `row` into `out` using `prev` as the row above.
pub fn filter_row(filter: FilterType, row: &[u8], prev: &[u8], bpp: usize, out: &mut [u8]) {
    for i in 0..row.len() {
        let a = if i >= bpp { row[i - bpp] } else { 0 };
        let b = prev[i];
        let c = if i >= bpp { prev[i - bpp] } else { 0 };
        out[i] = row[i].wrapping_sub(filter.predict(a, b, c));
    }
}

/// Reverses [`filter_row`] in place. `prev` must already be reconstructed.
pub fn unfilter_row(filter: FilterType, row: &mut [u8], prev: &[u8], bpp: usize) {
    for i in 0..row.len() {
        let a = if i >= bpp { row[i - bpp] } else { 0 };
        let b = prev[i];
        let c = if i >= bpp { prev[i - bpp] } else { 0 };
        row[i] = row[i].wrapping_add(filter.predict(a, b, c));
    }
}

/// Sum of residual magnitudes with bytes read as signed deltas.
pub fn residual_cost(filtered: &[u8]) -> u64 {
    filtered
        .iter()
        .map(|&v| (v as i8).unsigned_abs() as u64)
        .sum()
}

/// Tries every filter on a row and keeps the cheapest; ties go to the
/// earlier filter in [`FilterType::ALL`].
pub fn choose_filter(row: &[u8], prev: &[u8], bpp: usize, scratch: &mut Vec<u8>) -> FilterType {
    scratch.resize(row.len(), 0);
    let mut best = FilterType::None;
    let mut best_cost = u64::MAX;
    for filter in FilterType::ALL {
        filter_row(filter, row, prev, bpp, scratch);
        let cost = residual_cost(scratch);
        if cost < best_cost {
            best_cost = cost;
            best = filter;
        }
    }
    best
}

/// Filters `rows` scanlines of `stride` bytes. Every output row starts with
/// its filter byte.
pub fn filter_image(raw: &[u8], stride: usize, rows: usize, bpp: usize, mode: FilterMode) -> Vec<u8> {
    let mut out = vec![0u8; rows * (stride + 1)];
    let zero_row = vec![0u8; stride];
    let mut scratch = Vec::with_capacity(stride);

    for y in 0..rows {
        let row = &raw[y * stride..(y + 1) * stride];
        let prev = if y > 0 {
            &raw[(y - 1) * stride..y * stride]
        } else {
            &zero_row[..]
        };
        let filter = match mode {
            FilterMode::None => FilterType::None,
            FilterMode::Fixed(filter) => filter,
            FilterMode::Adaptive => choose_filter(row, prev, bpp, &mut scratch),
        };
        let dest = &mut out[y * (stride + 1)..(y + 1) * (stride + 1)];
        dest[0] = filter.into();
        filter_row(filter, row, prev, bpp, &mut dest[1..]);
    }
    out
}

/// Inverse of [`filter_image`].
pub fn unfilter_image(filtered: &[u8], stride: usize, rows: usize, bpp: usize) -> CodecResult<Vec<u8>> {
    if filtered.len() != rows * (stride + 1) {
        return Err(CodecError::InvalidData("filtered stream has the wrong length"));
    }
    let mut out = vec![0u8; rows * stride];
    let zero_row = vec![0u8; stride];

    for y in 0..rows {
        let src = &filtered[y * (stride + 1)..(y + 1) * (stride + 1)];
        let filter = FilterType::try_from(src[0])
            .map_err(|_| CodecError::InvalidData("unknown scanline filter"))?;
        let (done, rest) = out.split_at_mut(y * stride);
        let row = &mut rest[..stride];
        row.copy_from_slice(&src[1..]);
        let prev = if y > 0 {
            &done[(y - 1) * stride..]
        } else {
            &zero_row[..]
        };
        unfilter_row(filter, row, prev, bpp);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predictors() {
        assert_eq!(FilterType::None.predict(100, 200, 50), 0);
        assert_eq!(FilterType::Sub.predict(100, 200, 50), 100);
        assert_eq!(FilterType::Up.predict(100, 200, 50), 200);
        assert_eq!(FilterType::Average.predict(100, 201, 50), 150);
        assert_eq!(FilterType::Average.predict(255, 255, 0), 255);
        // p = 250, closest to b
        assert_eq!(FilterType::Paeth.predict(100, 200, 50), 200);
        assert_eq!(paeth(10, 10, 10), 10);
        assert_eq!(paeth(0, 0, 255), 0);
    }

    #[test]
    fn test_flat_row_prefers_sub_over_up_when_first_row() {
        // First row: the row above is zero so Up equals None; Sub removes the ramp.
        let row = [10u8, 10, 10, 10, 10, 10];
        let prev = [0u8; 6];
        let mut scratch = Vec::new();
        assert_eq!(choose_filter(&row, &prev, 1, &mut scratch), FilterType::Sub);
    }

    #[test]
    fn test_ties_resolve_to_none_first() {
        let row = [0u8; 8];
        let prev = [0u8; 8];
        let mut scratch = Vec::new();
        assert_eq!(choose_filter(&row, &prev, 4, &mut scratch), FilterType::None);
    }

    #[test]
    fn test_repeated_row_picks_up() {
        let prev = [7u8, 200, 13, 99, 1, 250];
        let row = prev;
        let mut scratch = Vec::new();
        assert_eq!(choose_filter(&row, &prev, 3, &mut scratch), FilterType::Up);
    }

    #[test]
    fn test_filter_unfilter_every_mode() {
        let stride = 12;
        let rows = 5;
        let raw: Vec<u8> = (0..stride * rows).map(|i| ((i * 37) ^ (i >> 2)) as u8).collect();
        let mut modes = vec![FilterMode::None, FilterMode::Adaptive];
        modes.extend(FilterType::ALL.iter().map(|f| FilterMode::Fixed(*f)));
        for mode in modes {
            let filtered = filter_image(&raw, stride, rows, 3, mode);
            assert_eq!(filtered.len(), rows * (stride + 1));
            let restored = unfilter_image(&filtered, stride, rows, 3).unwrap();
            assert_eq!(restored, raw, "mode {:?}", mode);
        }
    }

    #[test]
    fn test_unfilter_rejects_unknown_filter_byte() {
        let filtered = [9u8, 1, 2, 3];
        assert!(unfilter_image(&filtered, 3, 1, 1).is_err());
    }
}
