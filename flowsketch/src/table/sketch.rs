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
use std::collections::HashMap;
use std::hash::Hash;

use tracing::debug;

use crate::Amount;
use crate::Series;
use crate::Tick;
use crate::config::SketchConfig;
use crate::counter::Counter;
use crate::table::locate;

/// A `height × width` grid of counters with per-cell archives.
///
/// # Usage
///
/// ```rust
/// # use flowsketch::config::SketchConfig;
/// # use flowsketch::counter::NaiveCounter;
/// # use flowsketch::table::SketchTable;
/// let config = SketchConfig::default();
/// let mut table = SketchTable::<NaiveCounter>::new(&config, 32, 3);
/// table.count(&7u32, 1, 10);
/// table.count(&7u32, 2, 20);
/// table.flush();
/// assert_eq!(table.rebuild(&7u32, 1, 2), vec![(1, 10), (2, 20)]);
/// ```
#[derive(Debug)]
pub struct SketchTable<C> {
    config: SketchConfig,
    width: usize,
    height: usize,
    counters: Vec<C>,
    history: Vec<Vec<C>>,
    archived: usize,
}

impl<C: Counter> SketchTable<C> {
    /// Creates an empty table.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero, or if the configuration has fewer than `height`
    /// seeds.
    pub fn new(config: &SketchConfig, width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "table dimensions must be positive");
        assert!(
            height <= config.seeds().len(),
            "table of height {height} needs {height} seeds, got {}",
            config.seeds().len()
        );
        Self {
            config: config.clone(),
            width,
            height,
            counters: (0..width * height).map(|_| C::new(config)).collect(),
            history: (0..width * height).map(|_| vec![]).collect(),
            archived: 0,
        }
    }

    /// Returns the number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Counts `amount` for `flow` at `tick` in every row.
    ///
    /// A counter whose window is full is archived and the observation re-opens a fresh window.
    /// Always returns true: collisions degrade accuracy but never reject data.
    pub fn count<K: Hash + ?Sized>(&mut self, flow: &K, tick: Tick, amount: Amount) -> bool {
        for row in 0..self.height {
            let (column, residual) = locate(flow, self.config.seeds()[row], self.width);
            let cell = row * self.width + column;
            if self.counters[cell].count(tick, residual, amount) {
                self.archive(row, column);
                self.counters[cell].count(tick, residual, amount);
            }
        }
        true
    }

    /// Archives every non-empty active counter.
    pub fn flush(&mut self) {
        let before = self.archived;
        for row in 0..self.height {
            for column in 0..self.width {
                if !self.counters[row * self.width + column].is_empty() {
                    self.archive(row, column);
                }
            }
        }
        debug!(
            flushed = self.archived - before,
            archived = self.archived,
            "flushed sketch table"
        );
    }

    /// Reconstructs `flow` over `[start, last]`, combining rows with the counter's selector.
    pub fn rebuild<K: Hash + Eq>(&self, flow: &K, start: Tick, last: Tick) -> Series {
        self.rebuild_excluding(flow, start, last, &HashMap::new())
    }

    /// Reconstructs `flow` like [`SketchTable::rebuild`], first subtracting from every row the
    /// series of the `known` flows that hash into the same cell.
    ///
    /// Each counter removes the colliding flows itself through [`Counter::rebuild_without`], so
    /// signed counters subtract them before the queried flow's sign is applied.
    pub fn rebuild_excluding<K: Hash + Eq>(
        &self,
        flow: &K,
        start: Tick,
        last: Tick,
        known: &HashMap<K, Series>,
    ) -> Series {
        let mut merger: BTreeMap<Tick, Vec<Amount>> = BTreeMap::new();
        for row in 0..self.height {
            let seed = self.config.seeds()[row];
            let (column, residual) = locate(flow, seed, self.width);

            let colliding: Vec<(u64, &Series)> = known
                .iter()
                .filter_map(|(other, series)| {
                    let (other_column, other_residual) = locate(other, seed, self.width);
                    (other_column == column).then_some((other_residual, series))
                })
                .collect();

            let mut estimate: BTreeMap<Tick, Amount> = BTreeMap::new();
            for counter in self.overlapping(row * self.width + column, start, last) {
                estimate.extend(counter.rebuild_without(residual, &colliding));
            }

            for (tick, amount) in estimate {
                merger.entry(tick).or_default().push(amount);
            }
        }

        merger
            .into_iter()
            .map(|(tick, mut values)| (tick, C::SELECTOR.select(&mut values)))
            .collect()
    }

    /// Returns the bytes needed to store every archive, each prefixed by its length.
    pub fn serialize(&self) -> usize {
        self.history
            .iter()
            .map(|cell| size_of::<u16>() + cell.iter().map(C::serialize).sum::<usize>())
            .sum()
    }

    /// Iterates over every archived counter.
    pub fn archived(&self) -> impl Iterator<Item = &C> {
        self.history.iter().flatten()
    }

    /// Returns the number of counters archived so far.
    pub fn archived_count(&self) -> usize {
        self.archived
    }

    /// Drops every counter and archive.
    pub fn reset(&mut self) {
        for counter in &mut self.counters {
            *counter = C::new(&self.config);
        }
        for cell in &mut self.history {
            cell.clear();
        }
        self.archived = 0;
    }

    /// Archived counters of `cell` whose window may intersect `[start, last]`.
    fn overlapping(&self, cell: usize, start: Tick, last: Tick) -> impl Iterator<Item = &C> {
        let history = &self.history[cell];
        let window = u64::from(self.config.max_length());
        let first = history.partition_point(|counter| {
            counter
                .start()
                .is_some_and(|s| u64::from(s) + window <= u64::from(start))
        });
        history[first..]
            .iter()
            .take_while(move |counter| counter.start().is_some_and(|s| s <= last))
    }

    fn archive(&mut self, row: usize, column: usize) {
        let cell = row * self.width + column;
        let mut counter = std::mem::replace(&mut self.counters[cell], C::new(&self.config));
        counter.flush();
        debug!(
            row,
            column,
            start = ?counter.start(),
            ticks = counter.ticks(),
            "archived counter"
        );
        self.history[cell].push(counter);
        self.archived += 1;
    }
}
