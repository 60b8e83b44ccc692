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

use theta_sketch::theta::ThetaSketch;

#[test]
fn estimate_is_exact_below_nominal_size() {
    let mut sketch = ThetaSketch::builder().lg_k(12).build();
    for i in 0..500 {
        sketch.update(i);
    }
    assert_eq!(sketch.estimate(), 500.0);
    assert!(!sketch.is_estimation_mode());
}

#[test]
fn estimate_stays_close_in_estimation_mode() {
    let mut sketch = ThetaSketch::builder().lg_k(12).build();
    for i in 0..200_000 {
        sketch.update(i);
    }
    assert!(sketch.is_estimation_mode());
    let relative_error = (sketch.estimate() - 200_000.0).abs() / 200_000.0;
    assert!(relative_error < 0.05, "relative error {relative_error}");
}

#[test]
fn bounds_contain_the_true_count_with_high_confidence() {
    let mut sketch = ThetaSketch::builder().lg_k(11).build();
    for i in 0..50_000 {
        sketch.update(i);
    }
    let lower = sketch.lower_bound(2).unwrap();
    let upper = sketch.upper_bound(2).unwrap();
    assert!(lower <= 50_000.0);
    assert!(upper >= 50_000.0);
}

#[test]
fn lower_bound_rejects_invalid_stddevs() {
    let mut sketch = ThetaSketch::builder().build();
    sketch.update(1);
    assert!(sketch.lower_bound(0).is_err());
    assert!(sketch.lower_bound(4).is_err());
    assert!(sketch.upper_bound(0).is_err());
    assert!(sketch.upper_bound(4).is_err());
}

#[test]
fn trim_reduces_to_nominal_size() {
    let mut sketch = ThetaSketch::builder().lg_k(8).build();
    for i in 0..5000 {
        sketch.update(i);
    }
    sketch.trim();
    assert!(sketch.num_retained() <= 256);
}

#[test]
fn reset_restores_the_just_built_state() {
    let mut fresh = ThetaSketch::builder().lg_k(10).build();
    let mut used = ThetaSketch::builder().lg_k(10).build();
    for i in 0..1000 {
        used.update(i);
    }
    used.reset();
    assert_eq!(used.estimate(), fresh.estimate());
    assert_eq!(used.num_retained(), fresh.num_retained());
    fresh.update(1);
    used.update(1);
    assert_eq!(used.estimate(), fresh.estimate());
}
