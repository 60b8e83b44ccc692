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

use theta_sketch::theta::CompactThetaSketch;

#[test]
fn v4_round_trips_a_single_entry() {
    let mut sketch = theta_sketch::theta::ThetaSketch::builder().build();
    sketch.update(42);
    let compact = sketch.compact(true);
    let bytes = compact.serialize_v4();

    let roundtrip = CompactThetaSketch::deserialize(&bytes).unwrap();
    assert_eq!(roundtrip.iter().collect::<Vec<_>>(), vec![compact.iter().next().unwrap()]);
}

#[test]
fn v4_round_trips_an_empty_sketch() {
    let sketch = theta_sketch::theta::ThetaSketch::builder().build();
    let bytes = sketch.compact(true).serialize_v4();
    let roundtrip = CompactThetaSketch::deserialize(&bytes).unwrap();
    assert!(roundtrip.is_empty());
}

#[test]
fn v4_handles_widely_spread_deltas_without_losing_precision() {
    let mut sketch = theta_sketch::theta::ThetaSketch::builder().lg_k(16).build();
    for i in 0..20_000u64 {
        sketch.update(i * 97);
    }
    let compact = sketch.compact(true);
    let bytes = compact.serialize_v4();
    let roundtrip = CompactThetaSketch::deserialize(&bytes).unwrap();

    assert_eq!(roundtrip.num_retained(), compact.num_retained());
    assert_eq!(
        roundtrip.iter().collect::<Vec<_>>(),
        compact.iter().collect::<Vec<_>>()
    );
    assert_eq!(roundtrip.theta64(), compact.theta64());
}

#[test]
fn legacy_serial_version_one_header_is_still_readable() {
    let mut sketch = theta_sketch::theta::ThetaSketch::builder().build();
    for i in 0..10 {
        sketch.update(i);
    }
    let mut bytes = sketch.compact(true).serialize();
    // Byte 1 holds the serial version; versions 1-3 share the same exact
    // and estimation-mode layouts for a compact sketch.
    bytes[1] = 1;

    let roundtrip = CompactThetaSketch::deserialize(&bytes).unwrap();
    assert_eq!(roundtrip.num_retained(), 10);
}

#[test]
fn unknown_serial_version_is_rejected() {
    let mut sketch = theta_sketch::theta::ThetaSketch::builder().build();
    sketch.update(1);
    let mut bytes = sketch.compact(true).serialize();
    bytes[1] = 9;
    assert!(CompactThetaSketch::deserialize(&bytes).is_err());
}
