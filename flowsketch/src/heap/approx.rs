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

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::Footprint;

/// Classification thresholds of an [`ApproxBoundedSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thresholds<T> {
    /// Items at or above this bound are definitely large.
    pub hi: T,
    /// Items below this bound are never retained.
    pub lo: T,
}

impl<T: Ord> Thresholds<T> {
    /// Creates thresholds, swapping the bounds if given in reverse.
    pub fn new(hi: T, lo: T) -> Self {
        if hi < lo {
            Self { hi: lo, lo: hi }
        } else {
            Self { hi, lo }
        }
    }
}

/// A fixed-capacity set that keeps large items and a random subset of mid-range items.
///
/// Items below [`Thresholds::lo`] are rejected outright. Items at or above [`Thresholds::hi`]
/// form the high partition and always displace a mid-range item when the set is full. The
/// remaining items form the low partition, where a full set evicts a uniformly random member.
/// Every insert runs in constant time.
#[derive(Debug, Clone)]
pub struct ApproxBoundedSet<T> {
    capacity: usize,
    thresholds: Thresholds<T>,
    high: Vec<T>,
    low: Vec<T>,
    rng: StdRng,
}

impl<T: Ord> ApproxBoundedSet<T> {
    /// Creates an empty set.
    ///
    /// `seed` drives the eviction sampler, so two sets built with the same arguments behave
    /// identically.
    pub fn new(capacity: usize, thresholds: Thresholds<T>, seed: u64) -> Self {
        Self {
            capacity,
            thresholds,
            high: Vec::with_capacity(capacity),
            low: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Inserts `item`, returning whatever is no longer retained.
    ///
    /// Items below the lower threshold are rejected. When the set is full, an item at or above
    /// the upper threshold evicts a random low item first, and replaces a random high item only
    /// once no low item is left. Any other item replaces a random low item, or is rejected when
    /// every retained item is high.
    pub fn insert(&mut self, item: T) -> Option<T> {
        if item < self.thresholds.lo {
            return Some(item);
        }

        let has_room = self.len() < self.capacity;
        if item >= self.thresholds.hi {
            if has_room {
                self.high.push(item);
                None
            } else if !self.low.is_empty() {
                let victim = self.rng.random_range(0..self.low.len());
                self.high.push(item);
                Some(self.low.swap_remove(victim))
            } else if !self.high.is_empty() {
                let victim = self.rng.random_range(0..self.high.len());
                Some(std::mem::replace(&mut self.high[victim], item))
            } else {
                Some(item)
            }
        } else if has_room {
            self.low.push(item);
            None
        } else if !self.low.is_empty() {
            let victim = self.rng.random_range(0..self.low.len());
            Some(std::mem::replace(&mut self.low[victim], item))
        } else {
            Some(item)
        }
    }

    /// Returns the smallest retained item.
    pub fn min(&self) -> Option<&T> {
        self.iter().min()
    }

    /// Iterates over a snapshot of the retained items in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.high.iter().chain(self.low.iter())
    }

    /// Removes every retained item. The sampler state is kept.
    pub fn reset(&mut self) {
        self.high.clear();
        self.low.clear();
    }

    /// Returns the number of retained items.
    pub fn len(&self) -> usize {
        self.high.len() + self.low.len()
    }

    /// Returns true if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the set holds `capacity` items.
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Returns the maximum number of retained items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the classification thresholds.
    pub fn thresholds(&self) -> &Thresholds<T> {
        &self.thresholds
    }
}

impl<T: Ord + Footprint> ApproxBoundedSet<T> {
    /// Returns the bytes needed to store both partition sizes and every retained item.
    pub fn serialize(&self) -> usize {
        size_of::<u16>() * 2 + self.iter().map(Footprint::footprint).sum::<usize>()
    }
}
