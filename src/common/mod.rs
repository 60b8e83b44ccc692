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

//! Small primitives shared across the theta sketch implementation.

pub mod binomial_bounds;
pub mod quickselect;

/// Growth factor applied to a hash table's current size when it resizes
/// below nominal capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeFactor {
    X1,
    X2,
    X4,
    #[default]
    X8,
}

impl ResizeFactor {
    /// Returns `log2` of the growth factor (0 for `X1`, 3 for `X8`, ...).
    pub fn lg_value(self) -> u8 {
        match self {
            ResizeFactor::X1 => 0,
            ResizeFactor::X2 => 1,
            ResizeFactor::X4 => 2,
            ResizeFactor::X8 => 3,
        }
    }
}

/// The fixed bit pattern used to canonicalize every NaN payload before
/// hashing, so `Update(NaN)` always maps to the same hash regardless of the
/// producing platform's NaN representation.
const CANONICAL_NAN_BITS: u64 = 0x7FF8000000000000;

/// Canonicalizes a float for hashing: `-0.0` collapses to `0.0`, and any NaN
/// payload collapses to a single fixed bit pattern.
pub fn canonical_double(value: f64) -> f64 {
    if value.is_nan() {
        f64::from_bits(CANONICAL_NAN_BITS)
    } else if value == 0.0 {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_zero_canonicalizes_to_positive_zero() {
        let canonical = canonical_double(-0.0);
        assert_eq!(canonical.to_bits(), 0.0_f64.to_bits());
    }

    #[test]
    fn every_nan_canonicalizes_to_one_bit_pattern() {
        let a = canonical_double(f64::NAN);
        let b = canonical_double(f64::from_bits(0xFFF8000000000001));
        assert_eq!(a.to_bits(), CANONICAL_NAN_BITS);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn ordinary_values_pass_through() {
        assert_eq!(canonical_double(1.5), 1.5);
        assert_eq!(canonical_double(-1.5), -1.5);
    }

    #[test]
    fn resize_factor_lg_values() {
        assert_eq!(ResizeFactor::X1.lg_value(), 0);
        assert_eq!(ResizeFactor::X2.lg_value(), 1);
        assert_eq!(ResizeFactor::X4.lg_value(), 2);
        assert_eq!(ResizeFactor::X8.lg_value(), 3);
    }
}
