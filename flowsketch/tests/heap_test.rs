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

use flowsketch::heap::ApproxBoundedSet;
use flowsketch::heap::BoundedHeap;
use flowsketch::heap::Thresholds;
use flowsketch::wavelet::Coefficient;
use googletest::prelude::*;

const LEVELS: u8 = 8;

fn level_one(index: u16, value: i64) -> Coefficient {
    Coefficient::new(4 * index + 2, value, LEVELS)
}

#[test]
fn test_heap_keeps_largest_magnitudes() {
    let mut heap = BoundedHeap::new(5);
    for (index, value) in (-20..=20).enumerate() {
        heap.insert(level_one(index as u16, value));
    }

    let mut kept: Vec<i64> = heap.iter().map(Coefficient::value).collect();
    kept.sort_unstable();
    assert_eq!(kept, vec![-20, -19, 18, 19, 20]);
    assert_that!(heap.serialize(), eq(22usize));
}

#[test]
fn test_finer_levels_outrank_coarser_ones() {
    let mut heap = BoundedHeap::new(1);
    let coarse = Coefficient::new(128, 100, LEVELS);
    heap.insert(coarse);

    // a level-zero detail is scaled by 2^3 * sqrt(2), the top level is not scaled
    let fine = Coefficient::new(1, 10, LEVELS);
    assert!(!fine.is_exact());
    assert_eq!(heap.insert(fine), Some(coarse));
    assert_eq!(heap.min().copied(), Some(fine));
}

#[test]
fn test_approximate_set_respects_thresholds() {
    let thresholds = Thresholds::new(level_one(0, 50), level_one(0, 5));
    let mut set = ApproxBoundedSet::new(4, thresholds, 11);

    let small = level_one(1, 2);
    assert_eq!(set.insert(small), Some(small));

    for index in 2..6 {
        assert_eq!(set.insert(level_one(index, 10)), None);
    }
    assert!(set.is_full());

    let mid = level_one(6, 20);
    assert_eq!(set.insert(mid).map(|c| c.value()), Some(10));

    let large = level_one(7, 80);
    assert!(set.insert(large).is_some());
    assert!(set.iter().any(|c| *c == large));
    assert!(set.iter().all(|c| c.value() >= 10));
    assert_that!(set.len(), eq(4usize));
}
