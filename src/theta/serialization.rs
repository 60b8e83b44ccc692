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

//! Constants and version-compatibility helpers for the theta sketch wire
//! format, shared by `compact` and `wrapped`.

/// Family ID for theta sketches.
pub const THETA_FAMILY_ID: u8 = 3;

/// Current (highest) serial version this crate writes.
pub const SERIAL_VERSION: u8 = 3;

/// Serial version for the bit-packed delta-compressed compact format.
pub const SERIAL_VERSION_V4: u8 = 4;

pub const PREAMBLE_LONGS_EMPTY: u8 = 1;
pub const PREAMBLE_LONGS_EXACT: u8 = 2;
pub const PREAMBLE_LONGS_ESTIMATION: u8 = 3;

pub const FLAG_IS_BIG_ENDIAN: u8 = 1;
pub const FLAG_IS_READ_ONLY: u8 = 2;
pub const FLAG_IS_EMPTY: u8 = 4;
pub const FLAG_IS_COMPACT: u8 = 8;
pub const FLAG_IS_ORDERED: u8 = 16;
pub const FLAG_HAS_SINGLE_ITEM: u8 = 32;

pub const HASH_SIZE_BYTES: usize = 8;

/// Returns whether `serial_version` is a version this crate knows how to
/// decode. Versions 1-4 are all historical theta sketch wire formats;
/// anything else is rejected up front.
pub fn is_known_serial_version(serial_version: u8) -> bool {
    matches!(serial_version, 1..=4)
}
