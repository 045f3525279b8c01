//! Byte-budgeted LRU cache of encode results.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::codec::EncodedResult;
use crate::pixel_buffer::PixelBuffer;
use crate::plan::EncodePlan;

/// BLAKE3 digest of the dimensions, pixels and canonical plan bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(buffer: &PixelBuffer, plan: &EncodePlan) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&buffer.width().to_be_bytes());
        hasher.update(&buffer.height().to_be_bytes());
        hasher.update(buffer.data());
        hasher.update(&plan.canonical_bytes());
        Self(*hasher.finalize().as_bytes())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..6] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

struct CacheEntry {
    result: EncodedResult,
    last_used: u64,
}

pub struct ResultCache {
    budget: usize,
    used: usize,
    tick: u64,
    entries: HashMap<Fingerprint, CacheEntry>,
    recency: BTreeMap<u64, Fingerprint>,
}

impl ResultCache {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            used: 0,
            tick: 0,
            entries: HashMap::new(),
            recency: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Summed size of the cached payloads.
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Returns a copy of the entry and marks it most recently used.
    pub fn get(&mut self, key: &Fingerprint) -> Option<EncodedResult> {
        let tick = self.next_tick();
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.last_used);
        entry.last_used = tick;
        self.recency.insert(tick, *key);
        Some(entry.result.clone())
    }

    /// Stores `result`, evicting least recently used entries to stay within
    /// budget. Returns `false` when the result alone exceeds the budget.
    pub fn insert(&mut self, key: Fingerprint, result: EncodedResult) -> bool {
        let size = result.len();
        if size > self.budget {
            return false;
        }
        self.remove(&key);
        while self.used + size > self.budget {
            let Some((_, oldest)) = self.recency.pop_first() else {
                break;
            };
            if let Some(evicted) = self.entries.remove(&oldest) {
                self.used -= evicted.result.len();
            }
        }
        let tick = self.next_tick();
        self.recency.insert(tick, key);
        self.entries.insert(
            key,
            CacheEntry {
                result,
                last_used: tick,
            },
        );
        self.used += size;
        true
    }

    fn remove(&mut self, key: &Fingerprint) {
        if let Some(entry) = self.entries.remove(key) {
            self.recency.remove(&entry.last_used);
            self.used -= entry.result.len();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::CodecFamily;

    fn key(n: u8) -> Fingerprint {
        Fingerprint([n; 32])
    }

    fn result(len: usize) -> EncodedResult {
        EncodedResult {
            data: vec![0; len],
            width: 1,
            height: 1,
            family: CodecFamily::FilterEntropy,
            quality: 1.0,
            optimizations: Vec::new(),
        }
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = ResultCache::new(100);
        assert!(cache.insert(key(1), result(40)));
        assert!(cache.insert(key(2), result(40)));
        assert!(cache.get(&key(1)).is_some());
        assert!(cache.insert(key(3), result(40)));

        assert!(cache.get(&key(2)).is_none());
        assert!(cache.get(&key(1)).is_some());
        assert!(cache.get(&key(3)).is_some());
        assert_eq!(cache.used_bytes(), 80);
    }

    #[test]
    fn test_oversized_entry_is_never_stored() {
        let mut cache = ResultCache::new(10);
        assert!(cache.insert(key(1), result(10)));
        assert!(!cache.insert(key(2), result(11)));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key(1)).is_some());
    }

    #[test]
    fn test_reinsert_replaces() {
        let mut cache = ResultCache::new(100);
        cache.insert(key(1), result(30));
        cache.insert(key(1), result(50));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.used_bytes(), 50);
    }

    #[test]
    fn test_fingerprint_covers_plan_and_pixels() {
        let a = PixelBuffer::filled(2, 2, [1, 2, 3, 255]).unwrap();
        let b = PixelBuffer::filled(2, 2, [1, 2, 4, 255]).unwrap();
        let plan = EncodePlan::filter_entropy(1.0);
        assert_eq!(Fingerprint::of(&a, &plan), Fingerprint::of(&a.clone(), &plan));
        assert_ne!(Fingerprint::of(&a, &plan), Fingerprint::of(&b, &plan));
        assert_ne!(
            Fingerprint::of(&a, &plan),
            Fingerprint::of(&a, &plan.with_palette(true))
        );
        // Same bytes, different shape.
        let wide = PixelBuffer::filled(4, 1, [1, 2, 3, 255]).unwrap();
        assert_ne!(Fingerprint::of(&a, &plan), Fingerprint::of(&wide, &plan));
    }
}
