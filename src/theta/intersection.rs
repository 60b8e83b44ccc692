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

use crate::common::ResizeFactor;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::theta::compact::CompactThetaSketch;
use crate::theta::hash_table::{lg_size_from_count_for_rebuild, ThetaHashTable, MAX_THETA, REBUILD_THRESHOLD};
use crate::theta::ThetaSketchView;

/// Computes the intersection of a sequence of theta sketches.
///
/// The first `update` seeds the running state wholesale from its operand
/// (clone, not alias — the operand keeps its own independent lifetime).
/// Every subsequent `update` narrows the running state down to entries
/// present in both it and the new operand; `theta` only ever shrinks.
pub struct ThetaIntersection {
    table: ThetaHashTable,
    num_updates: u32,
}

impl ThetaIntersection {
    /// Creates an intersection with the default seed, awaiting its first
    /// operand.
    pub fn new_with_default_seed() -> Self {
        Self::new(DEFAULT_UPDATE_SEED)
    }

    /// Creates an intersection with the given seed, awaiting its first
    /// operand.
    pub fn new(seed: u64) -> Self {
        Self {
            table: ThetaHashTable::from_raw_parts(0, 0, ResizeFactor::X1, 1.0, MAX_THETA, seed, false),
            num_updates: 0,
        }
    }

    /// Folds `sketch` into the running intersection.
    pub fn update<S: ThetaSketchView>(&mut self, sketch: &S) -> Result<(), Error> {
        if sketch.seed_hash() != self.table.seed_hash() {
            return Err(Error::seed_mismatch(format!(
                "seed hash mismatch: intersection seed hash {}, operand seed hash {}",
                self.table.seed_hash(),
                sketch.seed_hash()
            )));
        }

        if self.num_updates == 0 {
            self.seed_from_first_operand(sketch);
            self.num_updates += 1;
            return Ok(());
        }

        let new_theta = self.table.theta().min(sketch.theta64());
        let new_is_empty = self.table.is_empty() || sketch.is_empty();

        let matched_entries = self.matched_entries(sketch, new_theta);

        let lg_size = lg_size_from_count_for_rebuild(matched_entries.len().max(1), REBUILD_THRESHOLD);
        let mut rebuilt = ThetaHashTable::from_raw_parts(
            lg_size,
            lg_size.saturating_sub(1),
            ResizeFactor::X1,
            1.0,
            new_theta,
            self.table.hash_seed(),
            new_is_empty,
        );
        for hash in matched_entries {
            rebuilt.try_insert_hash(hash);
        }
        rebuilt.set_theta(new_theta);
        rebuilt.set_empty(new_is_empty);

        self.table = rebuilt;
        self.num_updates += 1;
        Ok(())
    }

    fn seed_from_first_operand<S: ThetaSketchView>(&mut self, sketch: &S) {
        let theta = sketch.theta64();
        let lg_size = lg_size_from_count_for_rebuild(sketch.num_retained().max(1), REBUILD_THRESHOLD);
        let mut table = ThetaHashTable::from_raw_parts(
            lg_size,
            lg_size.saturating_sub(1),
            ResizeFactor::X1,
            1.0,
            theta,
            self.table.hash_seed(),
            sketch.is_empty(),
        );
        for hash in sketch.iter() {
            table.try_insert_hash(hash);
        }
        table.set_theta(theta);
        table.set_empty(sketch.is_empty());
        self.table = table;
    }

    /// Returns the hashes retained by the running state that are also
    /// present in `sketch`, honoring `new_theta` and breaking early once an
    /// ordered operand's entries exceed it (its entries only grow from
    /// there).
    fn matched_entries<S: ThetaSketchView>(&self, sketch: &S, new_theta: u64) -> Vec<u64> {
        let mut matched = Vec::new();
        if sketch.is_ordered() {
            for hash in sketch.iter() {
                if hash >= new_theta {
                    break;
                }
                if self.table.contains_hash(hash) {
                    matched.push(hash);
                }
            }
        } else {
            for hash in sketch.iter() {
                if hash < new_theta && self.table.contains_hash(hash) {
                    matched.push(hash);
                }
            }
        }
        matched
    }

    /// Returns whether at least one operand has been folded in.
    pub fn has_result(&self) -> bool {
        self.num_updates > 0
    }

    /// Materializes the intersection as an ordered compact sketch.
    ///
    /// # Panics
    ///
    /// Panics if no operand has been folded in yet.
    pub fn result(&self) -> CompactThetaSketch {
        self.result_with_ordered(true)
    }

    /// Materializes the intersection, choosing whether the entries are
    /// sorted.
    ///
    /// # Panics
    ///
    /// Panics if no operand has been folded in yet.
    pub fn result_with_ordered(&self, ordered: bool) -> CompactThetaSketch {
        assert!(
            self.has_result(),
            "Intersection::result called before any update"
        );

        let mut entries: Vec<u64> = self.table.iter().collect();
        if ordered {
            entries.sort_unstable();
        }

        CompactThetaSketch::from_parts(
            self.table.theta(),
            entries,
            self.table.seed_hash(),
            self.table.is_empty(),
            ordered,
        )
    }
}
