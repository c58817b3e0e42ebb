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

use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;

use crate::Amount;
use crate::Series;
use crate::Tick;
use crate::config::FULL_HEIGHT;
use crate::config::FULL_WIDTH;
use crate::config::SketchConfig;
use crate::counter::Counter;
use crate::scheme::Scheme;
use crate::scheme::bounds;
use crate::table::SketchTable;

/// A scheme backed by a single [`SketchTable`] of counter `C`.
///
/// # Usage
///
/// ```rust
/// # use std::collections::HashMap;
/// # use flowsketch::config::SketchConfig;
/// # use flowsketch::counter::HistogramCounter;
/// # use flowsketch::scheme::Scheme;
/// # use flowsketch::scheme::SketchScheme;
/// let config = SketchConfig::default();
/// let mut scheme = SketchScheme::<u64, HistogramCounter>::new(&config);
/// scheme.count(&1, 5, 4);
/// scheme.flush();
///
/// let answer = scheme.rebuild(&HashMap::from([(1u64, vec![5])]));
/// assert_eq!(answer[&1].len(), config.max_length() as usize);
/// ```
#[derive(Debug)]
pub struct SketchScheme<K, C> {
    table: SketchTable<C>,
    _flow: PhantomData<fn(&K)>,
}

impl<K, C: Counter> SketchScheme<K, C> {
    /// Creates a scheme with the standard table dimensions.
    pub fn new(config: &SketchConfig) -> Self {
        Self::with_dimensions(config, FULL_WIDTH, FULL_HEIGHT)
    }

    /// Creates a scheme over a `height × width` table.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`SketchTable::new`].
    pub fn with_dimensions(config: &SketchConfig, width: usize, height: usize) -> Self {
        Self {
            table: SketchTable::new(config, width, height),
            _flow: PhantomData,
        }
    }

    /// Returns the underlying table.
    pub fn table(&self) -> &SketchTable<C> {
        &self.table
    }
}

impl<K, C> Scheme<K> for SketchScheme<K, C>
where
    K: Hash + Eq + Clone,
    C: Counter,
{
    fn count(&mut self, flow: &K, tick: Tick, amount: Amount) -> bool {
        let before = self.table.archived_count();
        self.table.count(flow, tick, amount);
        self.table.archived_count() > before
    }

    fn flush(&mut self) {
        self.table.flush();
    }

    fn rebuild(&self, query: &HashMap<K, Vec<Tick>>) -> HashMap<K, Series> {
        query
            .iter()
            .filter_map(|(flow, ticks)| {
                let (start, last) = bounds(ticks)?;
                Some((flow.clone(), self.table.rebuild(flow, start, last)))
            })
            .collect()
    }

    fn serialize(&self) -> usize {
        self.table.serialize()
    }

    fn reset(&mut self) {
        self.table.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::NaiveCounter;

    #[test]
    fn test_rollover_is_reported() {
        let config = SketchConfig::builder().max_length(16).build().unwrap();
        let mut scheme = SketchScheme::<u32, NaiveCounter>::with_dimensions(&config, 4, 1);
        for tick in 0..16 {
            assert!(!scheme.count(&3, tick, 1));
        }
        assert!(scheme.count(&3, 16, 1));
        assert_eq!(scheme.table().archived_count(), 1);
    }

    #[test]
    fn test_empty_query_entries_are_skipped() {
        let config = SketchConfig::default();
        let mut scheme = SketchScheme::<u32, NaiveCounter>::new(&config);
        scheme.count(&1, 1, 1);
        scheme.flush();

        let answer = scheme.rebuild(&HashMap::from([(1, vec![1]), (2, vec![])]));
        assert_eq!(answer.len(), 1);
        assert_eq!(answer[&1], vec![(1, 1)]);
    }

    #[test]
    fn test_reset_forgets_everything() {
        let config = SketchConfig::default();
        let mut scheme = SketchScheme::<u32, NaiveCounter>::new(&config);
        scheme.count(&1, 1, 1);
        scheme.flush();
        assert!(scheme.serialize() > 0);

        scheme.reset();
        let empty = scheme.serialize();
        let answer = scheme.rebuild(&HashMap::from([(1, vec![1])]));
        assert!(answer[&1].is_empty());
        assert_eq!(empty, FULL_WIDTH * FULL_HEIGHT * size_of::<u16>());
    }
}
