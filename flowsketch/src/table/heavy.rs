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

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::hash::Hash;

use tracing::debug;

use crate::Amount;
use crate::Series;
use crate::Tick;
use crate::config::SketchConfig;
use crate::counter::Counter;
use crate::table::locate;

/// A table whose slots are owned by individual flows.
///
/// Every flow hashes to one column with a dedicated seed, the one following the seeds of the
/// companion [`SketchTable`](crate::table::SketchTable) rows. Within the column, the flow either
/// owns a slot already (a hit, which boosts the slot's frequency by
/// [`SketchConfig::hit_ratio`]) or competes for one: rows are scanned in order, a free slot is
/// taken at once, and otherwise each visited slot's frequency is decremented until one reaches
/// zero and is taken over. When no slot gives way, the observation is rejected.
///
/// A displaced owner's counter is archived under its label if it finalized at least
/// [`SketchConfig::retain_threshold`] ticks, and discarded otherwise.
#[derive(Debug)]
pub struct HeavyTable<K, C> {
    config: SketchConfig,
    width: usize,
    height: usize,
    seed: u64,
    frequency: Vec<u32>,
    labels: Vec<Option<K>>,
    counters: Vec<C>,
    history: Vec<Vec<(K, C)>>,
    archived: usize,
}

impl<K, C> HeavyTable<K, C>
where
    K: Hash + Eq + Clone,
    C: Counter,
{
    /// Creates an empty table.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero, or if the configuration has no seed left after the
    /// first `height` ones.
    pub fn new(config: &SketchConfig, width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "table dimensions must be positive");
        assert!(
            height < config.seeds().len(),
            "heavy table of height {height} needs {} seeds, got {}",
            height + 1,
            config.seeds().len()
        );
        let cells = width * height;
        Self {
            config: config.clone(),
            width,
            height,
            seed: config.seeds()[height],
            frequency: vec![0; cells],
            labels: vec![None; cells],
            counters: (0..cells).map(|_| C::new(config)).collect(),
            history: (0..cells).map(|_| vec![]).collect(),
            archived: 0,
        }
    }

    /// Counts `amount` for `flow` at `tick` if the flow owns or wins a slot.
    ///
    /// Returns false when the observation was rejected.
    pub fn count(&mut self, flow: &K, tick: Tick, amount: Amount) -> bool {
        let (column, residual) = locate(flow, self.seed, self.width);
        let owned = (0..self.height)
            .find(|&row| self.labels[self.cell(row, column)].as_ref() == Some(flow));
        let Some(row) = owned.or_else(|| self.claim(column, flow)) else {
            return false;
        };

        let cell = self.cell(row, column);
        self.frequency[cell] = self.frequency[cell].saturating_add(self.config.hit_ratio());
        if self.counters[cell].count(tick, residual, amount) {
            self.archive(row, column);
            self.counters[cell].count(tick, residual, amount);
        }
        true
    }

    /// Archives every non-empty active counter under its current owner.
    pub fn flush(&mut self) {
        let before = self.archived;
        for row in 0..self.height {
            for column in 0..self.width {
                if !self.counters[self.cell(row, column)].is_empty() {
                    self.archive(row, column);
                }
            }
        }
        debug!(
            flushed = self.archived - before,
            archived = self.archived,
            "flushed heavy table"
        );
    }

    /// Reconstructs every archived counter labelled with `flow`, merged by tick.
    ///
    /// The range is ignored: a flow only owns few counters, so all of them are rebuilt.
    pub fn rebuild(&self, flow: &K, _start: Tick, _last: Tick) -> Series {
        let (column, residual) = locate(flow, self.seed, self.width);
        let mut merger = BTreeMap::new();
        for row in 0..self.height {
            for (label, counter) in &self.history[self.cell(row, column)] {
                if label == flow {
                    merger.extend(counter.rebuild(residual));
                }
            }
        }
        merger.into_iter().collect()
    }

    /// Returns every flow that has an archived counter.
    pub fn labels(&self) -> HashSet<K> {
        self.history
            .iter()
            .flatten()
            .map(|(label, _)| label.clone())
            .collect()
    }

    /// Returns true if `flow` currently owns a slot.
    pub fn is_tracked(&self, flow: &K) -> bool {
        let (column, _) = locate(flow, self.seed, self.width);
        (0..self.height).any(|row| self.labels[self.cell(row, column)].as_ref() == Some(flow))
    }

    /// Returns the bytes needed to store every archive with its labels.
    pub fn serialize(&self) -> usize {
        self.history
            .iter()
            .map(|cell| {
                size_of::<u16>()
                    + cell
                        .iter()
                        .map(|(_, counter)| size_of::<K>() + counter.serialize())
                        .sum::<usize>()
            })
            .sum()
    }

    /// Iterates over every archived counter.
    pub fn archived(&self) -> impl Iterator<Item = &C> {
        self.history.iter().flatten().map(|(_, counter)| counter)
    }

    /// Returns the number of counters archived so far.
    pub fn archived_count(&self) -> usize {
        self.archived
    }

    /// Drops every slot, counter and archive.
    pub fn reset(&mut self) {
        self.frequency.fill(0);
        self.labels.fill(None);
        for counter in &mut self.counters {
            *counter = C::new(&self.config);
        }
        for cell in &mut self.history {
            cell.clear();
        }
        self.archived = 0;
    }

    #[inline]
    fn cell(&self, row: usize, column: usize) -> usize {
        row * self.width + column
    }

    /// Finds a slot in `column` for a flow that owns none, evicting its previous owner.
    fn claim(&mut self, column: usize, flow: &K) -> Option<usize> {
        for row in 0..self.height {
            let cell = self.cell(row, column);
            if self.labels[cell].is_some() && self.frequency[cell] > 0 {
                self.frequency[cell] -= 1;
                if self.frequency[cell] > 0 {
                    continue;
                }
            }
            self.evict(row, column);
            self.labels[cell] = Some(flow.clone());
            return Some(row);
        }
        None
    }

    fn evict(&mut self, row: usize, column: usize) {
        let cell = self.cell(row, column);
        if self.counters[cell].is_empty() {
            return;
        }
        let retained = self.counters[cell].ticks() >= self.config.retain_threshold();
        if retained {
            self.archive(row, column);
        } else {
            self.counters[cell] = C::new(&self.config);
        }
        debug!(row, column, retained, "evicted heavy hitter");
    }

    fn archive(&mut self, row: usize, column: usize) {
        let cell = self.cell(row, column);
        let Some(label) = self.labels[cell].clone() else {
            return;
        };
        let mut counter = std::mem::replace(&mut self.counters[cell], C::new(&self.config));
        counter.flush();
        debug!(
            row,
            column,
            start = ?counter.start(),
            ticks = counter.ticks(),
            "archived heavy counter"
        );
        self.history[cell].push((label, counter));
        self.archived += 1;
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::counter::NaiveCounter;

    fn config() -> SketchConfig {
        SketchConfig::builder()
            .max_length(64)
            .hit_ratio(4)
            .retain_threshold(2)
            .build()
            .unwrap()
    }

    #[test]
    fn test_free_slots_are_claimed_first() {
        let mut table = HeavyTable::<u32, NaiveCounter>::new(&config(), 1, 2);
        assert!(table.count(&1, 0, 1));
        assert!(table.count(&2, 0, 1));
        assert!(table.is_tracked(&1));
        assert!(table.is_tracked(&2));

        // the second claim decremented row 0, leaving frequencies 3 and 4
        assert!(!table.count(&3, 1, 1));
        assert!(!table.is_tracked(&3));
    }

    #[test]
    fn test_evicted_owner_is_archived_when_long_enough() {
        let mut table = HeavyTable::<u32, NaiveCounter>::new(&config(), 1, 1);
        table.count(&1, 0, 5);
        table.count(&1, 1, 5);
        // the single slot has frequency 8 now
        for tick in 2..9 {
            assert!(!table.count(&2, tick, 1));
        }
        assert!(table.count(&2, 9, 1));
        assert!(!table.is_tracked(&1));

        table.flush();
        assert_eq!(table.rebuild(&1, 0, 1), vec![(0, 5), (1, 5)]);
        assert_eq!(table.rebuild(&2, 9, 9), vec![(9, 1)]);
        assert_eq!(table.labels(), HashSet::from([1, 2]));
    }

    #[test]
    fn test_short_lived_owner_is_discarded() {
        let mut table = HeavyTable::<u32, NaiveCounter>::new(&config(), 1, 1);
        table.count(&1, 0, 5);
        for tick in 1..5 {
            table.count(&2, tick, 1);
        }
        table.flush();
        assert!(table.rebuild(&1, 0, 0).is_empty());
        assert!(!table.labels().contains(&1));
    }
    #[test]
    fn test_dominant_flow_keeps_its_slot() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut table = HeavyTable::<u32, NaiveCounter>::new(&config(), 1, 2);
        for tick in 0..20_000 {
            assert!(table.count(&0, tick, 1));
            for _ in 0..3 {
                table.count(&rng.random_range(1..u32::MAX), tick, 1);
            }
            assert!(table.is_tracked(&0), "lost the slot at tick {tick}");
        }
        table.flush();

        let series = table.rebuild(&0, 0, 19_999);
        assert_eq!(series.len(), 20_000);
        assert!(series.iter().all(|&(_, amount)| amount == 1));
    }
}
