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

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::Footprint;

/// A fixed-capacity heap retaining the largest items inserted so far.
///
/// While below capacity every item is kept. Once full, an incoming item replaces the current
/// minimum only if it compares strictly greater; otherwise it is handed back to the caller.
#[derive(Debug, Clone)]
pub struct BoundedHeap<T> {
    capacity: usize,
    items: BinaryHeap<Reverse<T>>,
}

impl<T: Ord> BoundedHeap<T> {
    /// Creates an empty heap retaining at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: BinaryHeap::with_capacity(capacity),
        }
    }

    /// Inserts `item`, returning whatever is no longer retained.
    ///
    /// Returns `None` while the heap has room, the evicted minimum when `item` displaces it, or
    /// `item` itself when it does not qualify.
    pub fn insert(&mut self, item: T) -> Option<T> {
        if self.items.len() < self.capacity {
            self.items.push(Reverse(item));
            return None;
        }

        match self.items.peek_mut() {
            Some(mut min) if item > min.0 => Some(std::mem::replace(&mut min.0, item)),
            _ => Some(item),
        }
    }

    /// Returns the smallest retained item.
    pub fn min(&self) -> Option<&T> {
        self.items.peek().map(|item| &item.0)
    }

    /// Iterates over the retained items in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().map(|item| &item.0)
    }

    /// Removes every retained item.
    pub fn reset(&mut self) {
        self.items.clear();
    }

    /// Returns the number of retained items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if the heap holds `capacity` items.
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Returns the maximum number of retained items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Ord + Footprint> BoundedHeap<T> {
    /// Returns the bytes needed to store the item count and every retained item.
    pub fn serialize(&self) -> usize {
        size_of::<u16>() + self.iter().map(Footprint::footprint).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_retains_exact_top_k() {
        let mut rng = StdRng::seed_from_u64(7);
        let values: Vec<i64> = (0..1000).map(|_| rng.random_range(-500..500)).collect();

        let mut heap = BoundedHeap::new(37);
        for v in &values {
            heap.insert(*v);
        }

        let mut kept: Vec<i64> = heap.iter().copied().collect();
        kept.sort_unstable();
        let mut expected = values.clone();
        expected.sort_unstable();
        let expected = expected.split_off(values.len() - 37);
        assert_eq!(kept, expected);
        assert_eq!(heap.min(), expected.first());
    }

    #[test]
    fn test_equal_item_does_not_replace_minimum() {
        let mut heap = BoundedHeap::new(1);
        assert_eq!(heap.insert(4u32), None);
        assert_eq!(heap.insert(4), Some(4));
        assert!(heap.is_full());
        assert_eq!(heap.serialize(), 2 + 4);

        heap.reset();
        assert!(heap.is_empty());
        assert_eq!(heap.serialize(), 2);
    }
}
