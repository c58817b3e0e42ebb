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
use crate::config::FULL_HEIGHT;
use crate::config::FULL_WIDTH;
use crate::config::HALF_WIDTH;
use crate::config::LESS_HEIGHT;
use crate::config::PAIR_HEIGHT;
use crate::config::SketchConfig;
use crate::counter::Counter;
use crate::heap::Thresholds;
use crate::scheme::Scheme;
use crate::scheme::bounds;
use crate::table::HeavyTable;
use crate::table::SketchTable;
use crate::wavelet::Coefficient;
use crate::wavelet::SignedWaveletCounter;
use crate::wavelet::WaveletCounter;

/// Heavy-hitter table in front of a residual sketch table, both of wavelet counters.
///
/// Every observation is counted in both tables. Flows with an archive in the heavy table are
/// answered from it; every other flow is answered from the sketch table after subtracting the
/// heavy flows that collide with it.
///
/// The residual table holds plain [`WaveletCounter`]s by default. [`WaveletScheme::signed`]
/// builds the variant whose residual table holds [`SignedWaveletCounter`]s.
#[derive(Debug)]
pub struct WaveletScheme<K, C = WaveletCounter> {
    top: HeavyTable<K, WaveletCounter>,
    low: SketchTable<C>,
}

impl<K: Hash + Eq + Clone> WaveletScheme<K> {
    /// Creates the scheme with a `32 × 2` residual table.
    pub fn new(config: &SketchConfig) -> Self {
        Self {
            top: HeavyTable::new(config, HALF_WIDTH, PAIR_HEIGHT),
            low: SketchTable::new(config, FULL_WIDTH, LESS_HEIGHT),
        }
    }

    /// Derives detail thresholds from the coefficients this scheme had to evict.
    ///
    /// The smallest retained coefficient of every saturated archived counter marks where the
    /// exact heaps started dropping data. The upper threshold is the third quartile of those
    /// minima and the lower one sits at about a third. Returns `None` if no counter saturated.
    pub fn suggest_thresholds(&self) -> Option<Thresholds<Coefficient>> {
        let mut minima: Vec<Coefficient> = self
            .top
            .archived()
            .chain(self.low.archived())
            .filter(|counter| counter.is_saturated())
            .filter_map(WaveletCounter::min_retained)
            .collect();
        if minima.is_empty() {
            return None;
        }
        minima.sort_unstable();

        let len = minima.len();
        let lo = minima[len * 42 / 128];
        let hi = minima[len * 3 / 4];
        debug!(
            saturated = len,
            hi = hi.key(),
            lo = lo.key(),
            "suggested detail thresholds"
        );
        Some(Thresholds::new(hi, lo))
    }
}

impl<K: Hash + Eq + Clone> WaveletScheme<K, SignedWaveletCounter> {
    /// Creates the signed scheme with a `16 × 3` residual table.
    pub fn signed(config: &SketchConfig) -> Self {
        Self {
            top: HeavyTable::new(config, HALF_WIDTH, PAIR_HEIGHT),
            low: SketchTable::new(config, HALF_WIDTH, FULL_HEIGHT),
        }
    }
}

impl<K: Hash + Eq + Clone, C: Counter> WaveletScheme<K, C> {
    /// Returns the heavy-hitter table.
    pub fn top(&self) -> &HeavyTable<K, WaveletCounter> {
        &self.top
    }

    /// Returns the residual sketch table.
    pub fn low(&self) -> &SketchTable<C> {
        &self.low
    }
}

impl<K: Hash + Eq + Clone, C: Counter> Scheme<K> for WaveletScheme<K, C> {
    fn count(&mut self, flow: &K, tick: Tick, amount: Amount) -> bool {
        let before = self.top.archived_count() + self.low.archived_count();
        self.top.count(flow, tick, amount);
        self.low.count(flow, tick, amount);
        self.top.archived_count() + self.low.archived_count() > before
    }

    fn flush(&mut self) {
        self.top.flush();
        self.low.flush();
    }

    fn rebuild(&self, query: &HashMap<K, Vec<Tick>>) -> HashMap<K, Series> {
        let heavy: HashMap<K, Series> = query
            .iter()
            .filter_map(|(flow, ticks)| {
                let (start, last) = bounds(ticks)?;
                let series = self.top.rebuild(flow, start, last);
                (!series.is_empty()).then(|| (flow.clone(), series))
            })
            .collect();

        query
            .iter()
            .filter_map(|(flow, ticks)| {
                let (start, last) = bounds(ticks)?;
                let mut merged: BTreeMap<Tick, Amount> = self
                    .low
                    .rebuild_excluding(flow, start, last, &heavy)
                    .into_iter()
                    .collect();
                if let Some(series) = heavy.get(flow) {
                    merged.extend(series.iter().copied());
                }
                Some((flow.clone(), merged.into_iter().collect()))
            })
            .collect()
    }

    fn serialize(&self) -> usize {
        self.top.serialize() + self.low.serialize()
    }

    fn reset(&mut self) {
        self.top.reset();
        self.low.reset();
    }
}
