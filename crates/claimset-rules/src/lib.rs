//! Reference claim-validity rules for the claimset engine.
//!
//! [`FeatureRules`] implements [`Combinatorics`] for feature-vector
//! items: each item carries `feature_count` features, each taking one of
//! `feature_size` values, and a tuple of `feature_size` items is a valid
//! claim iff, feature by feature, the values are either all equal or all
//! distinct. The classic configuration (4 features of 3 values, 81
//! items, claims of 3) is [`FeatureRules::classic`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

use claimset_core::{Combinatorics, ItemId, Tuple};
use smallvec::SmallVec;

/// Feature values of one item, lowest feature first.
pub type Features = SmallVec<[u32; 8]>;

/// Feature-vector rules.
///
/// Item `i` in `0..feature_size.pow(feature_count)` encodes its features
/// as the base-`feature_size` digits of `i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureRules {
    feature_count: u32,
    feature_size: u32,
    pool_size: u32,
}

impl FeatureRules {
    /// Create rules for `feature_count` features of `feature_size` values.
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    /// - `feature_count` is zero
    /// - `feature_size` is below 2
    /// - the resulting pool size overflows `u32`
    pub fn new(feature_count: u32, feature_size: u32) -> Result<Self, String> {
        if feature_count == 0 {
            return Err("feature_count must be at least 1".to_string());
        }
        if feature_size < 2 {
            return Err(format!("feature_size must be at least 2, got {feature_size}"));
        }
        let pool_size = feature_size.checked_pow(feature_count).ok_or_else(|| {
            format!("{feature_size}^{feature_count} items overflows u32")
        })?;
        Ok(Self {
            feature_count,
            feature_size,
            pool_size,
        })
    }

    /// Four features of three values: 81 items, claims of three.
    pub fn classic() -> Self {
        Self {
            feature_count: 4,
            feature_size: 3,
            pool_size: 81,
        }
    }

    /// Number of distinct items these rules describe.
    pub fn pool_size(&self) -> u32 {
        self.pool_size
    }

    /// Number of features per item.
    pub fn feature_count(&self) -> u32 {
        self.feature_count
    }

    /// Decode the feature values of `item`, or `None` if it is out of range.
    pub fn item_features(&self, item: ItemId) -> Option<Features> {
        if item.0 >= self.pool_size {
            return None;
        }
        let mut rest = item.0;
        let mut features = Features::new();
        for _ in 0..self.feature_count {
            features.push(rest % self.feature_size);
            rest /= self.feature_size;
        }
        Some(features)
    }

    fn feature(&self, item: ItemId, index: u32) -> u32 {
        (item.0 / self.feature_size.pow(index)) % self.feature_size
    }
}

impl Combinatorics for FeatureRules {
    fn claim_size(&self) -> usize {
        self.feature_size as usize
    }

    fn item_limit(&self) -> Option<u32> {
        Some(self.pool_size)
    }

    fn is_valid(&self, items: &[ItemId]) -> bool {
        if items.len() != self.claim_size() || items.iter().any(|i| i.0 >= self.pool_size) {
            return false;
        }
        let mut distinct: Tuple = items.iter().copied().collect();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() != items.len() {
            return false;
        }
        (0..self.feature_count).all(|f| {
            let mut seen: SmallVec<[u32; 8]> = items.iter().map(|&i| self.feature(i, f)).collect();
            seen.sort_unstable();
            seen.dedup();
            seen.len() == 1 || seen.len() == items.len()
        })
    }

    fn find_claims(&self, candidates: &[ItemId], limit: usize) -> Vec<Tuple> {
        let k = self.claim_size();
        let n = candidates.len();
        let mut found = Vec::new();
        if limit == 0 || n < k {
            return found;
        }

        // Lexicographic k-combinations of candidate positions.
        let mut idx: SmallVec<[usize; 8]> = (0..k).collect();
        loop {
            let tuple: Tuple = idx.iter().map(|&p| candidates[p]).collect();
            if self.is_valid(&tuple) {
                found.push(tuple);
                if found.len() >= limit {
                    return found;
                }
            }

            let mut pos = k;
            while pos > 0 && idx[pos - 1] == n - k + (pos - 1) {
                pos -= 1;
            }
            if pos == 0 {
                return found;
            }
            idx[pos - 1] += 1;
            for j in pos..k {
                idx[j] = idx[j - 1] + 1;
            }
        }
    }
}
