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

use std::collections::HashSet;

use crate::error::Error;
use crate::theta::compact::CompactThetaSketch;
use crate::theta::hash_table::MAX_THETA;
use crate::theta::ThetaSketchView;

/// Computes the set difference of two theta sketches (entries in `a` that
/// are not in `b`).
///
/// Unlike [`ThetaUnion`](crate::theta::ThetaUnion) and
/// [`ThetaIntersection`](crate::theta::ThetaIntersection), set difference
/// isn't commutative or associative, so there is no running state to
/// accumulate across operands — each call computes one pairwise difference.
pub struct ThetaANotB;

impl ThetaANotB {
    /// Computes `a \ b`.
    pub fn compute<A, B>(sketch_a: &A, sketch_b: &B) -> Result<CompactThetaSketch, Error>
    where
        A: ThetaSketchView,
        B: ThetaSketchView,
    {
        if sketch_a.seed_hash() != sketch_b.seed_hash() {
            return Err(Error::seed_mismatch(format!(
                "seed hash mismatch: operand A seed hash {}, operand B seed hash {}",
                sketch_a.seed_hash(),
                sketch_b.seed_hash()
            )));
        }

        let theta = sketch_a.theta64().min(sketch_b.theta64());

        if sketch_a.is_empty() {
            return Ok(CompactThetaSketch::empty(sketch_a.seed_hash()));
        }

        let exclude: HashSet<u64> = sketch_b.iter().filter(|&h| h < theta).collect();

        let mut entries: Vec<u64> = Vec::new();
        for hash in sketch_a.iter() {
            if hash >= theta {
                if sketch_a.is_ordered() {
                    break;
                }
                continue;
            }
            if !exclude.contains(&hash) {
                entries.push(hash);
            }
        }
        entries.sort_unstable();

        let is_empty = entries.is_empty() && theta == MAX_THETA;
        Ok(CompactThetaSketch::from_parts(
            theta,
            entries,
            sketch_a.seed_hash(),
            is_empty,
            true,
        ))
    }
}
