//! Palette reduction via median cut.

use std::collections::{HashMap, HashSet};

use crate::constants::MAXIMUM_PALETTE_SIZE;
use crate::pixel_buffer::PixelBuffer;

/// Returns the distinct RGBA colors of `buffer` in sorted order, or `None`
/// as soon as more than `limit` are seen.
pub fn distinct_colors(buffer: &PixelBuffer, limit: usize) -> Option<Vec<[u8; 4]>> {
    let mut seen: HashSet<[u8; 4]> = HashSet::with_capacity(limit + 1);
    for px in buffer.pixels() {
        if seen.insert(px) && seen.len() > limit {
            return None;
        }
    }
    let mut colors: Vec<[u8; 4]> = seen.into_iter().collect();
    colors.sort_unstable();
    Some(colors)
}

fn channel_range(bucket: &[[u8; 4]], channel: usize) -> u8 {
    let (min, max) = bucket.iter().fold((u8::MAX, u8::MIN), |(lo, hi), c| {
        (lo.min(c[channel]), hi.max(c[channel]))
    });
    max.saturating_sub(min)
}

/// Widest RGB channel of a bucket as `(channel, range)`; R wins ties, then G.
fn widest_channel(bucket: &[[u8; 4]]) -> (usize, u8) {
    let mut best = (0, channel_range(bucket, 0));
    for channel in 1..3 {
        let range = channel_range(bucket, channel);
        if range > best.1 {
            best = (channel, range);
        }
    }
    best
}

fn mean_color(bucket: &[[u8; 4]]) -> [u8; 4] {
    let mut sums = [0u64; 4];
    for c in bucket {
        for i in 0..4 {
            sums[i] += c[i] as u64;
        }
    }
    let n = bucket.len() as u64;
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = ((sums[i] + n / 2) / n) as u8;
    }
    out
}

/// Reduces `colors` to at most `target` representatives.
///
/// The bucket with the widest R, G or B range is split at its median along
/// that channel until `target` buckets exist or nothing is splittable. Each
/// bucket is represented by its mean. A set no larger than `target` is
/// returned unchanged.
pub fn median_cut(colors: &[[u8; 4]], target: usize) -> Vec<[u8; 4]> {
    if colors.is_empty() || target == 0 {
        return Vec::new();
    }
    if colors.len() <= target {
        return colors.to_vec();
    }

    let mut buckets: Vec<Vec<[u8; 4]>> = vec![colors.to_vec()];
    while buckets.len() < target {
        let candidate = buckets
            .iter()
            .enumerate()
            .filter(|(_, b)| b.len() > 1)
            .map(|(i, b)| (i, widest_channel(b)))
            .filter(|(_, (_, range))| *range > 0)
            .fold(None, |best: Option<(usize, (usize, u8))>, item| match best {
                Some(b) if b.1.1 >= item.1.1 => Some(b),
                _ => Some(item),
            });
        let Some((index, (channel, _))) = candidate else {
            break;
        };

        let mut bucket = buckets.swap_remove(index);
        bucket.sort_by_key(|c| (c[channel], *c));
        let upper = bucket.split_off(bucket.len() / 2);
        buckets.push(bucket);
        buckets.push(upper);
    }

    buckets.iter().map(|b| mean_color(b)).collect()
}

/// Index of the palette entry closest to `color` in RGB space; ties go to the
/// lowest index.
pub fn nearest_palette_index(palette: &[[u8; 4]], color: [u8; 4]) -> usize {
    let mut best = 0;
    let mut best_distance = u32::MAX;
    for (i, entry) in palette.iter().enumerate() {
        let distance: u32 = (0..3)
            .map(|ch| {
                let d = entry[ch] as i32 - color[ch] as i32;
                (d * d) as u32
            })
            .sum();
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }
    best
}

/// An indexed rendition of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    pub palette: Vec<[u8; 4]>,
    pub indices: Vec<u8>,
}

impl IndexedImage {
    /// Builds a palette when the image has at most 256 distinct colors.
    /// Returns `None` otherwise, in which case the caller skips the step.
    pub fn from_buffer(buffer: &PixelBuffer) -> Option<Self> {
        let colors = distinct_colors(buffer, MAXIMUM_PALETTE_SIZE)?;
        let palette = median_cut(&colors, MAXIMUM_PALETTE_SIZE);
        let exact: HashMap<[u8; 4], u8> = palette
            .iter()
            .enumerate()
            .map(|(i, c)| (*c, i as u8))
            .collect();
        let indices = buffer
            .pixels()
            .map(|px| match exact.get(&px) {
                Some(&i) => i,
                None => nearest_palette_index(&palette, px) as u8,
            })
            .collect();
        Some(Self { palette, indices })
    }
}
