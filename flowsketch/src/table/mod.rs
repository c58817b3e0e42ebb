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

//! Multi-row hashed tables of counters.
//!
//! A table hashes every flow once per row with an independent seed. The hash is split into a
//! column index and a residual that is handed to the counter. Each cell owns one active
//! [`Counter`](crate::counter::Counter) and an append-only history of archived ones, ordered by
//! window start.
//!
//! * [`SketchTable`] merges the rows on read with a [`Selector`].
//! * [`HeavyTable`] labels every slot with an owning flow and admits flows with a
//!   Space-Saving policy.

mod heavy;
mod sketch;

pub use self::heavy::HeavyTable;
pub use self::sketch::SketchTable;

use std::hash::Hash;

use crate::Amount;
use crate::hash::hash_with_seed;

/// How per-row estimates of one tick are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// The smallest estimate. Collisions only inflate non-negative counters, so the minimum is
    /// the tightest.
    Min,
    /// The median estimate, robust against rows that may also undercount.
    Median,
}

impl Selector {
    /// Combines the per-row estimates, clamping the result at zero.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty.
    pub fn select(self, values: &mut [Amount]) -> Amount {
        assert!(!values.is_empty(), "no row estimate to select from");
        let selected = match self {
            Selector::Min => values.iter().copied().min().unwrap_or_default(),
            Selector::Median => {
                values.sort_unstable();
                let mid = values.len() / 2;
                if values.len() % 2 == 1 {
                    values[mid]
                } else {
                    (values[mid - 1] + values[mid]) / 2
                }
            }
        };
        selected.max(0)
    }
}

/// Splits the row hash of `flow` into its column and residual.
#[inline]
pub(crate) fn locate<K: Hash + ?Sized>(flow: &K, seed: u64, width: usize) -> (usize, u64) {
    let hash = hash_with_seed(flow, seed);
    ((hash % width as u64) as usize, hash / width as u64)
}
