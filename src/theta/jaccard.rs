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

use crate::common::binomial_bounds;
use crate::error::Error;
use crate::theta::hash_table::MAX_THETA;
use crate::theta::ThetaSketchView;

/// Lower bound, point estimate, and upper bound for the Jaccard similarity
/// (`|A ∩ B| / |A ∪ B|`) of two theta sketches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JaccardBounds {
    pub lower_bound: f64,
    pub estimate: f64,
    pub upper_bound: f64,
}

impl JaccardBounds {
    const IDENTICAL: Self = Self {
        lower_bound: 1.0,
        estimate: 1.0,
        upper_bound: 1.0,
    };

    const DISJOINT: Self = Self {
        lower_bound: 0.0,
        estimate: 0.0,
        upper_bound: 0.0,
    };
}

/// Scales the width of the confidence interval based on how similar the two
/// sketches already look: near-identical sketches (`f` close to 1) get a
/// tight interval, near-disjoint ones a wide one.
fn hacky_adjuster(f: f64) -> f64 {
    (1.0 - f).sqrt() + (0.01 * (f - 0.5)).max(0.0)
}

/// Estimates the Jaccard similarity of `a` and `b`, along with a confidence
/// interval around that estimate.
///
/// Two sketches built with different seeds cannot be compared, since their
/// hash values would have no relationship to each other.
pub fn jaccard_similarity<A, B>(a: &A, b: &B) -> Result<JaccardBounds, Error>
where
    A: ThetaSketchView,
    B: ThetaSketchView,
{
    if a.seed_hash() != b.seed_hash() {
        return Err(Error::seed_mismatch(format!(
            "seed hash mismatch: operand A seed hash {}, operand B seed hash {}",
            a.seed_hash(),
            b.seed_hash()
        )));
    }

    if a.is_empty() && b.is_empty() {
        return Ok(JaccardBounds::IDENTICAL);
    }
    if a.is_empty() || b.is_empty() {
        return Ok(JaccardBounds::DISJOINT);
    }

    let theta = a.theta64().min(b.theta64());
    let theta_fraction = theta as f64 / MAX_THETA as f64;

    let a_entries: HashSet<u64> = a.iter().filter(|&h| h < theta).collect();
    let mut union_count = a_entries.len();
    let mut intersection_count = 0usize;
    for hash in b.iter().filter(|&h| h < theta) {
        if a_entries.contains(&hash) {
            intersection_count += 1;
        } else {
            union_count += 1;
        }
    }

    if union_count == 0 {
        return Ok(JaccardBounds::IDENTICAL);
    }

    let estimate = intersection_count as f64 / union_count as f64;

    let intersection_lb = binomial_bounds::lower_bound(intersection_count as u64, theta_fraction, 1)?;
    let intersection_ub = binomial_bounds::upper_bound(
        intersection_count as u64,
        theta_fraction,
        1,
        intersection_count == 0,
    )?;
    let union_lb = binomial_bounds::lower_bound(union_count as u64, theta_fraction, 1)?;
    let union_ub = binomial_bounds::upper_bound(union_count as u64, theta_fraction, 1, false)?;

    let adjuster = hacky_adjuster(estimate);
    let lower_bound = (intersection_lb / union_ub * adjuster).clamp(0.0, 1.0);
    let upper_bound = (intersection_ub / union_lb / adjuster).clamp(0.0, 1.0);

    Ok(JaccardBounds {
        lower_bound,
        estimate,
        upper_bound,
    })
}
