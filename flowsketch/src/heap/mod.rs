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

//! Fixed-capacity retention structures for compressed coefficients.
//!
//! Two policies are provided:
//!
//! * [`BoundedHeap`] keeps exactly the largest items inserted so far.
//! * [`ApproxBoundedSet`] classifies items against two thresholds and keeps a random subset of
//!   the mid-range ones, trading exact top-K selection for constant insert cost.
//!
//! # Usage
//!
//! ```rust
//! # use flowsketch::heap::BoundedHeap;
//! let mut heap = BoundedHeap::new(2);
//! assert_eq!(heap.insert(5), None);
//! assert_eq!(heap.insert(1), None);
//! assert_eq!(heap.insert(3), Some(1));
//! assert_eq!(heap.insert(0), Some(0));
//!
//! let mut kept: Vec<_> = heap.iter().copied().collect();
//! kept.sort();
//! assert_eq!(kept, vec![3, 5]);
//! ```

mod approx;
mod bounded;

pub use self::approx::ApproxBoundedSet;
pub use self::approx::Thresholds;
pub use self::bounded::BoundedHeap;

/// Byte footprint of a retained item, used for memory accounting only.
pub trait Footprint {
    /// Returns the number of bytes needed to store this item.
    fn footprint(&self) -> usize;
}

macro_rules! impl_native_footprint {
    ($($t:ty),*) => {
        $(
            impl Footprint for $t {
                fn footprint(&self) -> usize {
                    size_of::<$t>()
                }
            }
        )*
    };
}

impl_native_footprint!(u8, u16, u32, u64, i8, i16, i32, i64);
