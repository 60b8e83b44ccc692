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

//! Bit-packed delta encoding for the v4 compact wire format.
//!
//! Sorted entry hashes are stored as deltas from the previous entry. Deltas
//! are grouped into blocks of 8 and transposed: byte `b` of a block holds bit
//! `b` of each of the block's 8 deltas, one delta per bit position within the
//! byte. A trailing group of fewer than 8 deltas falls back to a plain
//! contiguous bitstream instead of the transposed layout, since transposition
//! has no benefit (and no well-defined shape) below a full block.

/// Returns the number of bits needed to hold the largest value in `deltas`,
/// which becomes the per-entry width used by both the transposed blocks and
/// the bitstream tail. Returns 0 if every delta is 0.
pub fn entry_bits_for(deltas: &[u64]) -> u8 {
    let combined = deltas.iter().fold(0u64, |acc, &d| acc | d);
    64 - combined.leading_zeros() as u8
}

/// Packs one block of exactly 8 deltas into `entry_bits` bytes appended to
/// `out`, transposed so that byte `b` holds bit `b` of every delta in the
/// block (bit `i` of that byte is delta `i`'s bit `b`).
fn pack_block8(values: &[u64; 8], entry_bits: u8, out: &mut Vec<u8>) {
    for b in 0..entry_bits {
        let mut byte = 0u8;
        for (i, &value) in values.iter().enumerate() {
            let bit = (value >> b) & 1;
            byte |= (bit as u8) << i;
        }
        out.push(byte);
    }
}

/// Inverse of [`pack_block8`]: reads `entry_bits` bytes from `bytes` and
/// reconstructs the 8 original delta values.
fn unpack_block8(bytes: &[u8], entry_bits: u8) -> [u64; 8] {
    let mut values = [0u64; 8];
    for (b, &byte) in bytes.iter().enumerate().take(entry_bits as usize) {
        for (i, value) in values.iter_mut().enumerate() {
            let bit = (byte >> i) & 1;
            *value |= (bit as u64) << b;
        }
    }
    values
}

/// A little-endian, LSB-first bit sink used for the bitstream tail.
#[derive(Debug, Default)]
struct BitWriter {
    bytes: Vec<u8>,
    bit_pos: u8,
}

impl BitWriter {
    fn write_bits(&mut self, value: u64, num_bits: u8) {
        for i in 0..num_bits {
            if self.bit_pos == 0 {
                self.bytes.push(0);
            }
            let bit = (value >> i) & 1;
            if bit != 0 {
                let last = self.bytes.last_mut().unwrap();
                *last |= 1 << self.bit_pos;
            }
            self.bit_pos = (self.bit_pos + 1) % 8;
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Reader counterpart to [`BitWriter`].
struct BitReader<'a> {
    bytes: &'a [u8],
    byte_pos: usize,
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    fn read_bits(&mut self, num_bits: u8) -> u64 {
        let mut value = 0u64;
        for i in 0..num_bits {
            let byte = self.bytes[self.byte_pos];
            let bit = (byte >> self.bit_pos) & 1;
            value |= (bit as u64) << i;
            self.bit_pos += 1;
            if self.bit_pos == 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
        }
        value
    }
}

/// Encodes `deltas` (already computed as successive differences of sorted
/// hashes) using `entry_bits`-wide transposed blocks of 8, with any
/// remaining `< 8` deltas written as a plain bitstream tail.
pub fn pack_deltas(deltas: &[u64], entry_bits: u8) -> Vec<u8> {
    let mut out = Vec::new();
    if entry_bits == 0 {
        return out;
    }

    let mut chunks = deltas.chunks_exact(8);
    for chunk in &mut chunks {
        let block: [u64; 8] = chunk.try_into().unwrap();
        pack_block8(&block, entry_bits, &mut out);
    }

    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let mut writer = BitWriter::default();
        for &delta in remainder {
            writer.write_bits(delta, entry_bits);
        }
        out.extend(writer.into_bytes());
    }

    out
}

/// Decodes `num_entries` deltas from `bytes`, which must have been produced
/// by [`pack_deltas`] with the same `entry_bits`.
///
/// Guards every block-of-8 read against running past the end of `bytes`:
/// if fewer than `entry_bits` bytes remain for what would be a full
/// transposed block, decoding falls back to the bitstream reader for the
/// rest, exactly mirroring the encoder's tail behavior.
pub fn unpack_deltas(bytes: &[u8], entry_bits: u8, num_entries: usize) -> Vec<u64> {
    let mut deltas = Vec::with_capacity(num_entries);
    if entry_bits == 0 {
        deltas.resize(num_entries, 0);
        return deltas;
    }

    let mut offset = 0usize;
    let mut remaining = num_entries;
    while remaining >= 8 && offset + entry_bits as usize <= bytes.len() {
        let block = unpack_block8(&bytes[offset..offset + entry_bits as usize], entry_bits);
        deltas.extend_from_slice(&block);
        offset += entry_bits as usize;
        remaining -= 8;
    }

    if remaining > 0 {
        let mut reader = BitReader::new(&bytes[offset..]);
        for _ in 0..remaining {
            deltas.push(reader.read_bits(entry_bits));
        }
    }

    deltas
}
