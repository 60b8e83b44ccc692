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

//! Binomial confidence bounds for theta-sketch cardinality estimates.
//!
//! The sketch's retained count, under Bernoulli sampling at rate `theta`, is
//! modeled as a binomial count; the bounds below use the usual normal
//! approximation scaled by a caller-chosen number of standard deviations.

use crate::error::Error;

fn validate_stddevs(stddevs: u8) -> Result<(), Error> {
    if stddevs == 0 || stddevs > 3 {
        return Err(Error::config_error(format!(
            "num_std_dev must be in [1, 3], got {stddevs}"
        )));
    }
    Ok(())
}

/// Approximate lower error bound for `numRetained` observed at sampling
/// rate `theta` (a fraction in `(0, 1]`), at `stddevs` standard deviations.
///
/// `stddevs` must be in `{1, 2, 3}`.
pub fn lower_bound(num_retained: u64, theta: f64, stddevs: u8) -> Result<f64, Error> {
    validate_stddevs(stddevs)?;
    let n = num_retained as f64;
    if theta <= 0.0 {
        return Ok(n);
    }
    let estimate = n / theta;
    let variance = n * (1.0 - theta) / (theta * theta);
    let lb = estimate - (stddevs as f64) * variance.sqrt();
    Ok(lb.max(n))
}

/// Approximate upper error bound for `numRetained` observed at sampling
/// rate `theta` (a fraction in `(0, 1]`), at `stddevs` standard deviations.
///
/// `stddevs` must be in `{1, 2, 3}`. An empty sketch always bounds to `0.0`.
pub fn upper_bound(num_retained: u64, theta: f64, stddevs: u8, is_empty: bool) -> Result<f64, Error> {
    validate_stddevs(stddevs)?;
    if is_empty {
        return Ok(0.0);
    }
    let n = num_retained as f64;
    if theta <= 0.0 {
        return Ok(n);
    }
    let estimate = n / theta;
    let variance = n * (1.0 - theta) / (theta * theta);
    Ok(estimate + (stddevs as f64) * variance.sqrt())
}
