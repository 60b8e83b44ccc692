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

use crate::common::quickselect::quickselect;
use crate::common::ResizeFactor;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::theta::compact::CompactThetaSketch;
use crate::theta::hash_table::{ThetaHashTable, DEFAULT_LG_K, MAX_THETA};
use crate::theta::ThetaSketchView;

/// Computes the union of any number of theta sketches.
///
/// Each operand may carry its own theta (from sampling or prior trimming);
/// the union keeps a "running" theta separate from the internal hash
/// table's own rebuild-driven theta, since the two floors are reconciled
/// only once, when [`result`](Self::result) is called.
pub struct ThetaUnion {
    table: ThetaHashTable,
    running_theta: u64,
    lg_max_k: u8,
    is_empty: bool,
}

impl ThetaUnion {
    /// Creates a union with the given nominal size and the default seed.
    pub fn new_with_default_seed(lg_k: u8) -> Self {
        Self::new(lg_k, DEFAULT_UPDATE_SEED)
    }

    /// Creates a union with the given nominal size and seed.
    pub fn new(lg_k: u8, seed: u64) -> Self {
        Self {
            table: ThetaHashTable::new(lg_k, ResizeFactor::X8, 1.0, seed),
            running_theta: MAX_THETA,
            lg_max_k: lg_k,
            is_empty: true,
        }
    }

    /// Creates a union at the default nominal size.
    pub fn new_default() -> Self {
        Self::new_with_default_seed(DEFAULT_LG_K)
    }

    /// Folds `sketch` into the running union.
    pub fn update<S: ThetaSketchView>(&mut self, sketch: &S) -> Result<(), Error> {
        if sketch.is_empty() {
            return Ok(());
        }

        if sketch.seed_hash() != self.table.seed_hash() {
            return Err(Error::seed_mismatch(format!(
                "seed hash mismatch: union seed hash {}, operand seed hash {}",
                self.table.seed_hash(),
                sketch.seed_hash()
            )));
        }

        self.is_empty = false;
        self.running_theta = self.running_theta.min(sketch.theta64());

        for hash in sketch.iter() {
            if hash < self.running_theta {
                self.table.try_insert_hash(hash);
            }
        }

        Ok(())
    }

    /// Returns whether any non-empty operand has been folded in yet.
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    /// Materializes the union as an ordered compact sketch, trimming to
    /// nominal size if needed.
    pub fn result(&self) -> CompactThetaSketch {
        self.result_with_ordered(true)
    }

    /// Materializes the union, choosing whether the entries are sorted.
    pub fn result_with_ordered(&self, ordered: bool) -> CompactThetaSketch {
        let mut theta = self.running_theta.min(self.table.theta());
        let mut entries: Vec<u64> = self.table.iter().filter(|&h| h < theta).collect();

        let nominal_k = 1usize << self.lg_max_k;
        if entries.len() > nominal_k {
            let kth = quickselect(&mut entries, nominal_k);
            entries.truncate(nominal_k);
            theta = theta.min(kth);
        }

        if ordered {
            entries.sort_unstable();
        }

        CompactThetaSketch::from_parts(
            theta,
            entries,
            self.table.seed_hash(),
            self.is_empty,
            ordered,
        )
    }

    /// Resets the union to its just-constructed, empty state.
    pub fn reset(&mut self) {
        self.table.reset();
        self.running_theta = MAX_THETA;
        self.is_empty = true;
    }
}
