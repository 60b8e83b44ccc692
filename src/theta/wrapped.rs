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

use crate::codec::SketchSlice;
use crate::error::Error;
use crate::hash::compute_seed_hash;
use crate::theta::bitpack;
use crate::theta::hash_table::MAX_THETA;
use crate::theta::serialization::*;
use crate::theta::ThetaSketchView;

/// A read-only view over a serialized theta sketch that borrows its input
/// buffer rather than copying entries out of it.
///
/// The header (preamble, flags, theta, seed hash) is decoded eagerly on
/// construction, since every accessor needs it; retained hashes are decoded
/// from the borrowed buffer on demand in [`iter`](Self::iter), since the v4
/// format requires unpacking before any hash can be produced at all.
#[derive(Debug, Clone)]
pub struct WrappedThetaSketch<'a> {
    theta: u64,
    seed_hash: u16,
    is_empty: bool,
    is_ordered: bool,
    num_entries: usize,
    entries: EntriesSource<'a>,
}

#[derive(Debug, Clone)]
enum EntriesSource<'a> {
    /// v1-v3: `num_entries` raw little-endian `u64` hashes back-to-back.
    Raw(&'a [u8]),
    /// v4: first hash plus a bit-packed delta tail.
    Packed {
        first_hash: u64,
        entry_bits: u8,
        tail: &'a [u8],
    },
    /// Single-item (v3 `FLAG_HAS_SINGLE_ITEM`) or empty sketch.
    Inline(Option<u64>),
}

impl<'a> WrappedThetaSketch<'a> {
    /// Wraps `bytes`, validating the header against the default seed.
    pub fn new(bytes: &'a [u8]) -> Result<Self, Error> {
        Self::new_with_seed(bytes, crate::hash::DEFAULT_UPDATE_SEED)
    }

    /// Wraps `bytes`, validating the header against `seed`.
    pub fn new_with_seed(bytes: &'a [u8], seed: u64) -> Result<Self, Error> {
        let mut slice = SketchSlice::new(bytes);

        let preamble_longs = slice.read_u8()?;
        let serial_version = slice.read_u8()?;
        let family_id = slice.read_u8()?;
        let entry_bits = slice.read_u8()?;
        let _ = slice.read_u8()?; // reserved (numEntriesBytes, v4 only)
        let flags = slice.read_u8()?;
        let stored_seed_hash = slice.read_u16_le()?;

        if family_id != THETA_FAMILY_ID {
            return Err(Error::invalid_family(format!(
                "expected family id {THETA_FAMILY_ID}, got {family_id}"
            )));
        }
        if !is_known_serial_version(serial_version) {
            return Err(Error::unsupported_serial_version(format!(
                "unsupported serial version {serial_version}"
            )));
        }

        let expected_seed_hash = compute_seed_hash(seed);
        if stored_seed_hash != 0 && stored_seed_hash != expected_seed_hash {
            return Err(Error::seed_mismatch(format!(
                "expected seed hash {expected_seed_hash}, got {stored_seed_hash}"
            )));
        }
        let seed_hash = if stored_seed_hash == 0 {
            expected_seed_hash
        } else {
            stored_seed_hash
        };

        let is_empty = flags & FLAG_IS_EMPTY != 0;
        let is_ordered = flags & FLAG_IS_ORDERED != 0;
        let has_single_item = flags & FLAG_HAS_SINGLE_ITEM != 0;

        if is_empty {
            return Ok(Self {
                theta: MAX_THETA,
                seed_hash,
                is_empty: true,
                is_ordered: true,
                num_entries: 0,
                entries: EntriesSource::Inline(None),
            });
        }

        if has_single_item {
            let hash = slice.read_u64_le()?;
            return Ok(Self {
                theta: MAX_THETA,
                seed_hash,
                is_empty: false,
                is_ordered: true,
                num_entries: 1,
                entries: EntriesSource::Inline(Some(hash)),
            });
        }

        match serial_version {
            1 | 2 | 3 => {
                let is_estimation = preamble_longs == PREAMBLE_LONGS_ESTIMATION;
                let num_entries = if preamble_longs >= PREAMBLE_LONGS_EXACT {
                    slice.read_u64_le()? as usize
                } else {
                    0
                };
                let theta = if is_estimation {
                    slice.read_u64_le()?
                } else {
                    MAX_THETA
                };
                let start = slice.position();
                let end = start + num_entries * HASH_SIZE_BYTES;
                let raw = bytes.get(start..end).ok_or_else(|| {
                    Error::insufficient_data("buffer too short for declared entry count")
                })?;
                Ok(Self {
                    theta,
                    seed_hash,
                    is_empty: false,
                    is_ordered,
                    num_entries,
                    entries: EntriesSource::Raw(raw),
                })
            }
            4 => {
                let num_entries = slice.read_u32_le()? as usize;
                let theta = slice.read_u64_le()?;
                let first_hash = if num_entries > 0 {
                    slice.read_u64_le()?
                } else {
                    0
                };
                let tail = slice.remaining_bytes()?;
                Ok(Self {
                    theta,
                    seed_hash,
                    is_empty: false,
                    is_ordered: true,
                    num_entries,
                    entries: EntriesSource::Packed {
                        first_hash,
                        entry_bits,
                        tail,
                    },
                })
            }
            _ => unreachable!("checked by is_known_serial_version above"),
        }
    }

    /// Best-effort estimate of the number of distinct items represented.
    pub fn estimate(&self) -> f64 {
        if self.is_empty {
            return 0.0;
        }
        self.num_entries as f64 / (self.theta as f64 / MAX_THETA as f64)
    }

    /// Materializes the borrowed hashes into an owned vector, decoding the
    /// v4 delta tail if needed.
    fn materialize(&self) -> Vec<u64> {
        match &self.entries {
            EntriesSource::Inline(None) => Vec::new(),
            EntriesSource::Inline(Some(hash)) => vec![*hash],
            EntriesSource::Raw(raw) => raw
                .chunks_exact(HASH_SIZE_BYTES)
                .map(|chunk| u64::from_le_bytes(chunk.try_into().unwrap()))
                .collect(),
            EntriesSource::Packed {
                first_hash,
                entry_bits,
                tail,
            } => {
                let remaining = self.num_entries.saturating_sub(1);
                let deltas = bitpack::unpack_deltas(tail, *entry_bits, remaining);
                let mut entries = Vec::with_capacity(self.num_entries);
                entries.push(*first_hash);
                let mut running = *first_hash;
                for delta in deltas {
                    running += delta;
                    entries.push(running);
                }
                entries
            }
        }
    }
}

impl ThetaSketchView for WrappedThetaSketch<'_> {
    fn theta64(&self) -> u64 {
        self.theta
    }

    fn is_empty(&self) -> bool {
        self.is_empty
    }

    fn is_ordered(&self) -> bool {
        self.is_ordered
    }

    fn num_retained(&self) -> usize {
        self.num_entries
    }

    fn seed_hash(&self) -> u16 {
        self.seed_hash
    }

    fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.materialize().into_iter()
    }
}
