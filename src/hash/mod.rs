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

//! Hash primitives shared by the sketch implementation.

use std::hash::Hasher;

/// Default seed used when building a sketch without an explicit seed,
/// matching the Java/C++ DataSketches default.
pub const DEFAULT_UPDATE_SEED: u64 = 9001;

/// A [`Hasher`] that buffers every written byte and, on `finish`, runs
/// MurmurHash3's `x64_128` variant over the buffer with a fixed seed.
///
/// `std::hash::Hash::hash` feeds a value's bytes through many small `write*`
/// calls, so the digest can only be produced once all of them have landed;
/// buffering is the straightforward way to bridge that streaming API onto
/// `mur3`'s one-shot function.
#[derive(Debug, Default)]
pub struct MurmurHash3X64128 {
    seed: u64,
    buf: Vec<u8>,
}

impl MurmurHash3X64128 {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            buf: Vec::new(),
        }
    }

    /// Returns the full 128-bit digest as `(h1, h2)`.
    pub fn finish128(&self) -> (u64, u64) {
        mur3::murmurhash3_x64_128(&self.buf, self.seed)
    }
}

impl Hasher for MurmurHash3X64128 {
    fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn finish(&self) -> u64 {
        self.finish128().0
    }
}

/// Computes the 16-bit seed-hash digest stored alongside serialized sketches
/// and checked for compatibility across set operations.
///
/// A digest of exactly `0` is reserved to mean "absent" in the v1 wire
/// format, so it is remapped to `1`.
pub fn compute_seed_hash(seed: u64) -> u16 {
    let (h1, _) = mur3::murmurhash3_x64_128(&seed.to_le_bytes(), 0);
    let digest = (h1 & 0xFFFF) as u16;
    if digest == 0 { 1 } else { digest }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_hash_is_deterministic() {
        assert_eq!(compute_seed_hash(9001), compute_seed_hash(9001));
        assert_ne!(compute_seed_hash(9001), compute_seed_hash(9002));
    }

    #[test]
    fn seed_hash_never_zero() {
        for seed in 0..2000u64 {
            assert_ne!(compute_seed_hash(seed), 0);
        }
    }

    #[test]
    fn hasher_matches_direct_call() {
        let mut hasher = MurmurHash3X64128::with_seed(7);
        hasher.write(b"hello");
        let (h1, h2) = hasher.finish128();
        let (e1, e2) = mur3::murmurhash3_x64_128(b"hello", 7);
        assert_eq!((h1, h2), (e1, e2));
    }
}
