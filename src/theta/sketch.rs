// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::hash::Hash;

use crate::common::{binomial_bounds, canonical_double, ResizeFactor};
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::theta::compact::CompactThetaSketch;
use crate::theta::hash_table::{ThetaHashTable, DEFAULT_LG_K, MAX_LG_K, MIN_LG_K};
use crate::theta::ThetaSketchView;

/// A growable theta sketch, accumulating an approximate distinct count of
/// the updated items through an open-addressed hash table of screened hash
/// values.
#[derive(Debug)]
pub struct ThetaSketch {
    table: ThetaHashTable,
}

impl ThetaSketch {
    /// Returns a builder for constructing a sketch with non-default
    /// parameters.
    pub fn builder() -> ThetaSketchBuilder {
        ThetaSketchBuilder::default()
    }

    /// Updates the sketch with a hashable value.
    pub fn update<T: Hash>(&mut self, value: T) {
        self.table.try_insert(value);
    }

    /// Updates the sketch with a hashable value, surfacing why an update was
    /// a no-op instead of silently swallowing it.
    ///
    /// Returns `Err(ScreeningReject)` if the hash is zero or falls at or
    /// above the current `theta` (i.e. it would never have been retained),
    /// and `Err(DuplicateKey)` if the value is already present in the table.
    pub fn try_update<T: Hash>(&mut self, value: T) -> Result<(), Error> {
        let hash = self.table.hash(value);
        let theta = self.table.theta();
        if hash == 0 || hash >= theta {
            return Err(Error::screening_reject(format!(
                "hash {hash} was screened out at theta {theta}"
            )));
        }
        if self.table.contains_hash(hash) {
            return Err(Error::duplicate_key(format!(
                "hash {hash} is already retained"
            )));
        }
        self.table.try_insert_hash(hash);
        Ok(())
    }

    /// Updates the sketch with a 64-bit float, canonicalizing `-0.0` and
    /// every NaN payload first so that platform-dependent float bit patterns
    /// never cause the same logical value to hash differently.
    pub fn update_f64(&mut self, value: f64) {
        self.update(canonical_double(value).to_bits());
    }

    /// Updates the sketch with a 32-bit float, via the 64-bit canonicalization
    /// path.
    pub fn update_f32(&mut self, value: f32) {
        self.update_f64(value as f64);
    }

    /// Updates the sketch with a string, rejecting empty strings since they
    /// hash no differently than "absent" in the reference implementation.
    pub fn try_update_str(&mut self, value: &str) -> Result<(), Error> {
        if value.is_empty() {
            return Err(Error::empty_string_reject(
                "cannot update a theta sketch with an empty string",
            ));
        }
        self.update(value);
        Ok(())
    }

    /// Best-effort estimate of the number of distinct items updated into the
    /// sketch so far.
    pub fn estimate(&self) -> f64 {
        if self.table.is_empty() {
            return 0.0;
        }
        self.table.num_retained() as f64 / self.theta()
    }

    /// Returns `theta` as a fraction of the full hash range, i.e. the
    /// effective sampling probability currently in force.
    pub fn theta(&self) -> f64 {
        self.theta64() as f64 / crate::theta::hash_table::MAX_THETA as f64
    }

    /// Returns `theta` as a raw 64-bit hash threshold.
    pub fn theta64(&self) -> u64 {
        self.table.theta()
    }

    /// Returns whether the sketch has never been updated.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns whether the sketch's estimate involves a theta strictly below
    /// the maximum, i.e. whether sampling (rather than exact counting) is in
    /// effect.
    pub fn is_estimation_mode(&self) -> bool {
        self.theta64() < crate::theta::hash_table::MAX_THETA && !self.is_empty()
    }

    /// Number of retained hash entries backing the current estimate.
    pub fn num_retained(&self) -> usize {
        self.table.num_retained()
    }

    /// Configured `lg_k` (log2 of the nominal entry count).
    pub fn lg_k(&self) -> u8 {
        self.table.lg_nom_size()
    }

    /// Approximate lower confidence bound on the true distinct count, at
    /// `stddevs` standard deviations (must be 1, 2, or 3).
    pub fn lower_bound(&self, stddevs: u8) -> Result<f64, Error> {
        if self.is_empty() {
            return binomial_bounds::lower_bound(0, 1.0, stddevs);
        }
        binomial_bounds::lower_bound(self.num_retained() as u64, self.theta(), stddevs)
    }

    /// Approximate upper confidence bound on the true distinct count, at
    /// `stddevs` standard deviations (must be 1, 2, or 3).
    pub fn upper_bound(&self, stddevs: u8) -> Result<f64, Error> {
        binomial_bounds::upper_bound(
            self.num_retained() as u64,
            self.theta(),
            stddevs,
            self.is_empty(),
        )
    }

    /// Discards any entries above the nominal size, raising `theta` to
    /// compensate, without waiting for an update to trigger a rebuild.
    pub fn trim(&mut self) {
        self.table.trim();
    }

    /// Restores the sketch to its just-constructed, empty state.
    pub fn reset(&mut self) {
        self.table.reset();
    }

    /// Iterates over the currently retained hash values, in no particular
    /// order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.table.iter()
    }

    /// Returns an immutable, compact snapshot of the sketch, suitable for
    /// serialization or as an operand to a set operation.
    ///
    /// When `ordered` is true the entries are sorted ascending, which both
    /// other sketches and set operators can exploit (e.g. to stop an
    /// intersection scan early).
    pub fn compact(&self, ordered: bool) -> CompactThetaSketch {
        let mut entries: Vec<u64> = self.table.iter().collect();
        if ordered {
            entries.sort_unstable();
        }
        CompactThetaSketch::new(
            self.theta64(),
            entries,
            self.table.seed_hash(),
            self.is_empty(),
            ordered,
        )
    }
}

impl ThetaSketchView for ThetaSketch {
    fn theta64(&self) -> u64 {
        ThetaSketch::theta64(self)
    }

    fn is_empty(&self) -> bool {
        ThetaSketch::is_empty(self)
    }

    fn is_ordered(&self) -> bool {
        false
    }

    fn num_retained(&self) -> usize {
        ThetaSketch::num_retained(self)
    }

    fn seed_hash(&self) -> u16 {
        self.table.seed_hash()
    }

    fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        ThetaSketch::iter(self)
    }
}

/// Builder for [`ThetaSketch`], validating configuration eagerly so that a
/// misconfigured builder panics at the call site rather than producing a
/// sketch that silently behaves unexpectedly.
#[derive(Debug, Clone)]
pub struct ThetaSketchBuilder {
    lg_k: u8,
    resize_factor: ResizeFactor,
    sampling_probability: f32,
    seed: u64,
}

impl Default for ThetaSketchBuilder {
    fn default() -> Self {
        Self {
            lg_k: DEFAULT_LG_K,
            resize_factor: ResizeFactor::default(),
            sampling_probability: 1.0,
            seed: DEFAULT_UPDATE_SEED,
        }
    }
}

impl ThetaSketchBuilder {
    /// Sets `lg_k`, the log2 of the nominal entry count.
    ///
    /// # Panics
    ///
    /// Panics if `lg_k` is outside `[MIN_LG_K, MAX_LG_K]`.
    pub fn lg_k(mut self, lg_k: u8) -> Self {
        assert!(
            (MIN_LG_K..=MAX_LG_K).contains(&lg_k),
            "lg_k must be in [{MIN_LG_K}, {MAX_LG_K}], got {lg_k}"
        );
        self.lg_k = lg_k;
        self
    }

    /// Sets the hash table's growth factor.
    pub fn resize_factor(mut self, resize_factor: ResizeFactor) -> Self {
        self.resize_factor = resize_factor;
        self
    }

    /// Sets the sampling probability, i.e. the initial theta as a fraction of
    /// the full hash range.
    ///
    /// # Panics
    ///
    /// Panics if `p` is outside `(0.0, 1.0]`.
    pub fn sampling_probability(mut self, p: f32) -> Self {
        assert!(
            p > 0.0 && p <= 1.0,
            "sampling_probability must be in (0.0, 1.0], got {p}"
        );
        self.sampling_probability = p;
        self
    }

    /// Sets the hash seed. Two sketches can only be combined by a set
    /// operator if they share the same seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builds the sketch with the configured parameters.
    pub fn build(self) -> ThetaSketch {
        ThetaSketch {
            table: ThetaHashTable::new(
                self.lg_k,
                self.resize_factor,
                self.sampling_probability,
                self.seed,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sketch_estimates_zero() {
        let sketch = ThetaSketch::builder().build();
        assert!(sketch.is_empty());
        assert_eq!(sketch.estimate(), 0.0);
        assert_eq!(sketch.num_retained(), 0);
    }

    #[test]
    fn exact_mode_estimate_matches_distinct_count() {
        let mut sketch = ThetaSketch::builder().lg_k(12).build();
        for i in 0..100 {
            sketch.update(i);
        }
        assert!(!sketch.is_empty());
        assert!(!sketch.is_estimation_mode());
        assert_eq!(sketch.estimate(), 100.0);
        assert_eq!(sketch.num_retained(), 100);
    }

    #[test]
    fn duplicate_updates_do_not_inflate_the_estimate() {
        let mut sketch = ThetaSketch::builder().build();
        for _ in 0..10 {
            sketch.update("same-value");
        }
        assert_eq!(sketch.estimate(), 1.0);
    }

    #[test]
    fn large_cardinality_triggers_estimation_mode() {
        let mut sketch = ThetaSketch::builder().lg_k(10).build();
        for i in 0..100_000 {
            sketch.update(i);
        }
        assert!(sketch.is_estimation_mode());
        let estimate = sketch.estimate();
        assert!((estimate - 100_000.0).abs() / 100_000.0 < 0.1);
    }

    #[test]
    fn bounds_reject_out_of_range_stddevs() {
        let mut sketch = ThetaSketch::builder().build();
        sketch.update(1);
        assert!(sketch.lower_bound(1).is_ok());
        assert!(sketch.lower_bound(0).is_err());
        assert!(sketch.lower_bound(4).is_err());
    }

    #[test]
    fn bounds_widen_with_more_stddevs() {
        let mut sketch = ThetaSketch::builder().lg_k(8).build();
        for i in 0..5000 {
            sketch.update(i);
        }
        let lb1 = sketch.lower_bound(1).unwrap();
        let lb2 = sketch.lower_bound(2).unwrap();
        let lb3 = sketch.lower_bound(3).unwrap();
        assert!(lb3 < lb2 && lb2 < lb1);

        let ub1 = sketch.upper_bound(1).unwrap();
        let ub2 = sketch.upper_bound(2).unwrap();
        let ub3 = sketch.upper_bound(3).unwrap();
        assert!(ub1 < ub2 && ub2 < ub3);
    }

    #[test]
    fn empty_sketch_in_estimation_mode_bounds_to_zero() {
        let sketch = ThetaSketch::builder().sampling_probability(0.01).build();
        assert!(sketch.is_empty());
        assert_eq!(sketch.lower_bound(1).unwrap(), 0.0);
        assert_eq!(sketch.upper_bound(1).unwrap(), 0.0);
    }

    #[test]
    fn try_update_reports_duplicates_and_screening_rejects() {
        let mut sketch = ThetaSketch::builder().sampling_probability(0.000001).build();
        assert!(sketch.try_update(1).is_err());

        let mut sketch = ThetaSketch::builder().build();
        assert!(sketch.try_update(1).is_ok());
        assert_eq!(
            sketch.try_update(1).unwrap_err().kind(),
            crate::error::ErrorKind::DuplicateKey
        );
    }

    #[test]
    fn rejects_empty_string_updates() {
        let mut sketch = ThetaSketch::builder().build();
        assert!(sketch.try_update_str("").is_err());
        assert!(sketch.try_update_str("ok").is_ok());
    }

    #[test]
    fn canonicalizes_float_updates() {
        let mut a = ThetaSketch::builder().build();
        let mut b = ThetaSketch::builder().build();
        a.update_f64(0.0);
        b.update_f64(-0.0);
        assert_eq!(a.estimate(), b.estimate());
    }

    #[test]
    fn compact_preserves_ordering_request() {
        let mut sketch = ThetaSketch::builder().build();
        for i in (0..20).rev() {
            sketch.update(i);
        }
        let ordered = sketch.compact(true);
        let hashes: Vec<u64> = ordered.iter().collect();
        let mut sorted = hashes.clone();
        sorted.sort_unstable();
        assert_eq!(hashes, sorted);
    }

    #[test]
    #[should_panic]
    fn builder_panics_on_invalid_lg_k() {
        let _ = ThetaSketch::builder().lg_k(2);
    }

    #[test]
    #[should_panic]
    fn builder_panics_on_invalid_sampling_probability() {
        let _ = ThetaSketch::builder().sampling_probability(1.5);
    }
}
