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

//! Partial in-place k-th-smallest reordering, used to lower `theta` during a
//! hash table rebuild or when trimming a set-operator result to nominal size.

/// Partitions `slice` so that `slice[k]` holds the `(k+1)`-th smallest
/// element (0-indexed), with lesser elements before it and greater elements
/// after, in unspecified order on either side.
pub fn quickselect(slice: &mut [u64], k: usize) -> u64 {
    let (_, kth, _) = slice.select_nth_unstable(k);
    *kth
}
