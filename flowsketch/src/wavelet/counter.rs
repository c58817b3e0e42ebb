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

use std::cell::OnceCell;

use crate::Amount;
use crate::Series;
use crate::Tick;
use crate::config::SketchConfig;
use crate::counter::Counter;
use crate::heap::ApproxBoundedSet;
use crate::heap::BoundedHeap;
use crate::wavelet::Coefficient;
use crate::wavelet::Interval;

/// Retention policy for the detail coefficients of one level partition.
#[derive(Debug, Clone)]
enum DetailStore {
    Exact(BoundedHeap<Coefficient>),
    Approx(ApproxBoundedSet<Coefficient>),
}

impl DetailStore {
    fn insert(&mut self, coefficient: Coefficient) {
        match self {
            DetailStore::Exact(heap) => heap.insert(coefficient),
            DetailStore::Approx(set) => set.insert(coefficient),
        };
    }

    fn for_each(&self, mut f: impl FnMut(&Coefficient)) {
        match self {
            DetailStore::Exact(heap) => heap.iter().for_each(&mut f),
            DetailStore::Approx(set) => set.iter().for_each(&mut f),
        }
    }

    fn min(&self) -> Option<&Coefficient> {
        match self {
            DetailStore::Exact(heap) => heap.min(),
            DetailStore::Approx(set) => set.min(),
        }
    }

    fn is_full(&self) -> bool {
        match self {
            DetailStore::Exact(heap) => heap.is_full(),
            DetailStore::Approx(set) => set.is_full(),
        }
    }

    fn serialize(&self) -> usize {
        match self {
            DetailStore::Exact(heap) => heap.serialize(),
            DetailStore::Approx(set) => set.serialize(),
        }
    }
}

/// Online Haar wavelet counter.
///
/// Amounts of the current tick accumulate exactly. When a later tick arrives, the finished tick
/// is pushed through the in-place Haar butterfly: the number of trailing one bits of the
/// finalized-tick count gives how many levels close at this position. Each closed level emits a
/// detail coefficient into the bounded detail store of its partition and carries the sum
/// upward. Sums that reach [`SketchConfig::level`] levels are kept exactly in a small reserved
/// array.
///
/// With [`SketchConfig::thresholds`] set, detail stores are [`ApproxBoundedSet`]s; otherwise they
/// are exact [`BoundedHeap`]s.
#[derive(Debug, Clone)]
pub struct WaveletCounter {
    levels: u8,
    index_mask: u32,
    read_count: u32,
    value: Amount,
    pending: bool,
    last_coef: Vec<Amount>,
    top_level: Vec<Amount>,
    details: Vec<DetailStore>,
    time: Interval,
    cache: OnceCell<Series>,
}

impl WaveletCounter {
    /// Returns the smallest retained detail coefficient across all partitions.
    pub fn min_retained(&self) -> Option<Coefficient> {
        self.details.iter().filter_map(DetailStore::min).min().copied()
    }

    /// Returns true if every detail store is at capacity.
    pub fn is_saturated(&self) -> bool {
        self.details.iter().all(DetailStore::is_full)
    }

    fn insert_detail(&mut self, level: u8, value: Amount) {
        let pos = (self.read_count >> level) << level;
        let coefficient = Coefficient::new(pos as u16, value, self.levels);
        let partition = level as usize % self.details.len();
        self.details[partition].insert(coefficient);
    }

    /// Inverts the transform without clamping, pairing every value with its tick.
    pub(crate) fn reconstruct(&self) -> Series {
        let n = self.read_count as usize;
        let levels = self.levels as usize;
        let mut temp: Vec<Amount> = vec![0; n];

        for store in &self.details {
            store.for_each(|c| temp[c.pos() as usize] = c.value());
        }
        for (i, value) in self.top_level.iter().take(n >> levels).enumerate() {
            temp[i << levels] = *value;
        }
        for (i, value) in self.last_coef.iter().enumerate() {
            if n & (1 << i) != 0 {
                temp[(n >> (i + 1)) << (i + 1)] = *value;
            }
        }

        let section = 1usize << levels;
        let last_section = (n >> levels) << levels;
        for base in (0..last_section).step_by(section) {
            for offset in (1..=section).rev() {
                inverse_at(&mut temp, base, offset);
            }
        }
        for offset in (1..=n - last_section).rev() {
            inverse_at(&mut temp, last_section, offset);
        }

        self.time
            .ticks()
            .into_iter()
            .zip(temp)
            .collect()
    }
}

/// Undoes every butterfly that closed at `base + offset`, coarsest level first.
fn inverse_at(temp: &mut [Amount], base: usize, offset: usize) {
    let pos = base + offset;
    for i in (0..offset.trailing_zeros()).rev() {
        let lo = temp[pos - (2 << i)];
        let hi = temp[pos - (1 << i)];
        temp[pos - (2 << i)] = (lo + hi) / 2;
        temp[pos - (1 << i)] = (lo - hi) / 2;
    }
}

impl Counter for WaveletCounter {
    fn new(config: &SketchConfig) -> Self {
        let partitions = config.detail_partitions();
        let details = (0..partitions)
            .map(|_| match config.thresholds() {
                None => DetailStore::Exact(BoundedHeap::new(config.detail_capacity() / partitions)),
                Some(thresholds) => DetailStore::Approx(ApproxBoundedSet::new(
                    config.approx_capacity() / partitions,
                    thresholds.clone(),
                    config.approx_seed(),
                )),
            })
            .collect();

        Self {
            levels: config.level(),
            index_mask: config.index_mask(),
            read_count: 0,
            value: 0,
            pending: false,
            last_coef: vec![0; config.level() as usize],
            top_level: vec![0; config.reserved()],
            details,
            time: Interval::new(config.max_length()),
            cache: OnceCell::new(),
        }
    }

    fn count(&mut self, tick: Tick, _residual: u64, amount: Amount) -> bool {
        if self.time.same_as_last(tick) {
            self.value += amount;
            self.pending = true;
            return false;
        }

        if self.time.count(tick) {
            self.flush();
            return true;
        }

        self.flush();
        self.value = amount;
        self.pending = true;
        false
    }

    fn flush(&mut self) {
        if !self.pending {
            return;
        }

        let level = (self.read_count & self.index_mask).trailing_ones() as u8;
        let mut carry = self.value;
        for l in 0..level {
            let recent = self.last_coef[l as usize];
            self.insert_detail(l, recent - carry);
            carry += recent;
        }

        if level < self.levels {
            self.last_coef[level as usize] = carry;
        } else {
            self.top_level[(self.read_count >> self.levels) as usize] = carry;
        }

        self.read_count += 1;
        self.value = 0;
        self.pending = false;
    }

    fn rebuild(&self, _residual: u64) -> Series {
        assert!(!self.is_empty(), "rebuild of an empty wavelet counter");
        self.cache
            .get_or_init(|| {
                self.reconstruct()
                    .into_iter()
                    .map(|(tick, value)| (tick, value.max(1)))
                    .collect()
            })
            .clone()
    }

    fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    fn start(&self) -> Option<Tick> {
        self.time.start()
    }

    fn ticks(&self) -> usize {
        self.read_count as usize
    }

    fn serialize(&self) -> usize {
        let top_levels = (self.read_count >> self.levels) as usize;
        size_of::<u16>()
            + top_levels * size_of::<i32>()
            + self.details.iter().map(DetailStore::serialize).sum::<usize>()
            + self.time.serialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Thresholds;

    fn config(capacity: usize) -> SketchConfig {
        SketchConfig::builder()
            .max_length(64)
            .detail_capacity(capacity)
            .build()
            .unwrap()
    }

    #[test]
    fn test_lossless_with_room_for_every_detail() {
        let mut counter = WaveletCounter::new(&config(64));
        let mut expected = vec![];
        for tick in 0..30u32 {
            let amount = Amount::from((tick * 7 + 3) % 11 + 1);
            assert!(!counter.count(tick * 2 + 5, 0, amount));
            expected.push((tick * 2 + 5, amount));
        }
        counter.flush();
        counter.flush();

        assert_eq!(counter.ticks(), 30);
        assert_eq!(counter.rebuild(0), expected);
        assert!(!counter.is_saturated());
    }

    #[test]
    fn test_full_window_signals_rollover() {
        let mut counter = WaveletCounter::new(&config(8));
        for tick in 0..64 {
            assert!(!counter.count(tick, 0, 1));
        }
        assert!(counter.count(64, 0, 1));
        counter.flush();
        assert_eq!(counter.ticks(), 64);

        // a flat series has no detail energy, so the top levels alone restore it
        let series = counter.rebuild(0);
        assert_eq!(series.len(), 64);
        assert!(series.iter().all(|&(_, v)| v == 1));
        assert!(counter.is_saturated());
        assert_eq!(counter.min_retained().map(|c| c.value()), Some(0));
    }

    #[test]
    fn test_retains_large_details_under_pressure() {
        let mut counter = WaveletCounter::new(&config(4));
        for tick in 0..32u32 {
            let amount = if tick == 13 { 1000 } else { 10 };
            counter.count(tick, 0, amount);
        }
        counter.flush();
        let series = counter.rebuild(0);
        let (peak, _) = series.iter().max_by_key(|&&(_, v)| v).copied().unwrap();
        assert_eq!(peak, 13);
    }

    #[test]
    fn test_thresholds_select_approximate_store() {
        let levels = 3;
        let config = SketchConfig::builder()
            .max_length(64)
            .approx_capacity(4)
            .thresholds(Thresholds::new(
                Coefficient::new(1, 100, levels),
                Coefficient::new(1, 1, levels),
            ))
            .build()
            .unwrap();
        let mut counter = WaveletCounter::new(&config);
        for tick in 0..16 {
            counter.count(tick, 0, 5);
        }
        counter.flush();
        // every detail of a flat series is zero and falls below the low threshold
        assert!(counter.min_retained().is_none());
        assert!(counter.rebuild(0).iter().all(|&(_, v)| v == 5));
    }
}
