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

//! Theta sketch: an approximate distinct-count sketch supporting set
//! operations (union, intersection, difference) and similarity estimation.

mod a_not_b;
mod bitpack;
mod compact;
pub(crate) mod hash_table;
mod intersection;
mod jaccard;
mod serialization;
mod sketch;
mod union;
mod wrapped;

pub use a_not_b::ThetaANotB;
pub use compact::CompactThetaSketch;
pub use intersection::ThetaIntersection;
pub use jaccard::{jaccard_similarity, JaccardBounds};
pub use sketch::{ThetaSketch, ThetaSketchBuilder};
pub use union::ThetaUnion;
pub use wrapped::WrappedThetaSketch;

pub use hash_table::{DEFAULT_LG_K, MAX_LG_K, MAX_THETA, MIN_LG_K};

/// A read-only view over any form of theta sketch (growable, compact, or
/// wrapped), sufficient for set operators and bounds computations to operate
/// generically over whichever representation a caller holds.
pub trait ThetaSketchView {
    /// Returns `theta` as a raw 64-bit hash threshold.
    fn theta64(&self) -> u64;

    /// Returns whether the sketch has never been updated.
    fn is_empty(&self) -> bool;

    /// Returns whether entries are known to be stored in ascending order,
    /// allowing consumers (e.g. intersection) to terminate scans early.
    fn is_ordered(&self) -> bool;

    /// Number of retained hash entries.
    fn num_retained(&self) -> usize;

    /// Seed-hash digest recorded alongside the sketch, used to detect
    /// attempts to combine sketches built with incompatible seeds.
    fn seed_hash(&self) -> u16;

    /// Iterates over the retained hash values.
    fn iter(&self) -> impl Iterator<Item = u64> + '_;
}
