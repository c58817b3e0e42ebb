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
use crate::counter::window_exceeded;
use crate::persist::Polygon;
use crate::persist::Segment;
use crate::table::Selector;

/// Counter fitting the cumulative sum of its cell with a piecewise-linear function.
///
/// Each time the tick advances, the running total at the previous tick is fed to a [`Polygon`]
/// with tolerance [`SketchConfig::persist_delta`]. Only the finalized segments are kept.
#[derive(Debug, Clone)]
pub struct PersistCmsCounter {
    max_length: u32,
    delta: f64,
    start: Option<Tick>,
    last: Tick,
    value: Amount,
    ticks: usize,
    segments: Vec<Segment>,
    solver: Polygon,
    flushed: bool,
    cache: OnceCell<Series>,
}

impl PersistCmsCounter {
    /// Returns the finalized segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl Counter for PersistCmsCounter {
    const SELECTOR: Selector = Selector::Median;

    fn new(config: &SketchConfig) -> Self {
        Self {
            max_length: config.max_length(),
            delta: config.persist_delta(),
            start: None,
            last: 0,
            value: 0,
            ticks: 0,
            segments: vec![],
            solver: Polygon::new(),
            flushed: false,
            cache: OnceCell::new(),
        }
    }

    fn count(&mut self, tick: Tick, _residual: u64, amount: Amount) -> bool {
        match self.start {
            None => {
                self.start = Some(tick);
                self.ticks = 1;
            }
            Some(start) => {
                assert!(tick >= self.last, "tick {tick} arrived after tick {}", self.last);
                if window_exceeded(start, tick, self.max_length) {
                    self.flush();
                    return true;
                }
                if tick > self.last {
                    if let Some(segment) = self.solver.insert(self.last, self.value, self.delta) {
                        self.segments.push(segment);
                    }
                    self.ticks += 1;
                }
            }
        }
        self.last = tick;
        self.value += amount;
        false
    }

    fn flush(&mut self) {
        if self.start.is_none() || self.flushed {
            return;
        }
        if let Some(segment) = self.solver.insert(self.last, self.value, self.delta) {
            self.segments.push(segment);
        }
        self.segments.extend(self.solver.current());
        self.flushed = true;
    }

    fn rebuild(&self, _residual: u64) -> Series {
        let start = self.start.expect("rebuild of an empty persist counter");
        assert!(self.flushed, "persist counter rebuilt before flush");
        self.cache
            .get_or_init(|| {
                let mut series = Vec::with_capacity(self.ticks);
                let mut tick = start;
                let mut previous = 0;
                for segment in &self.segments {
                    while tick <= segment.end {
                        let cumulative = (segment.line.evaluate(tick).round() as Amount).max(0);
                        series.push((tick, (cumulative - previous).max(0)));
                        previous = cumulative;
                        tick += 1;
                    }
                }
                series
            })
            .clone()
    }

    fn is_empty(&self) -> bool {
        self.start.is_none()
    }

    fn start(&self) -> Option<Tick> {
        self.start
    }

    fn ticks(&self) -> usize {
        self.ticks
    }

    fn serialize(&self) -> usize {
        size_of::<Tick>()
            + self.segments.len() * (size_of::<Tick>() + size_of::<f64>() * 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(delta: f64) -> SketchConfig {
        SketchConfig::builder().persist_delta(delta).build().unwrap()
    }

    #[test]
    fn test_exact_with_zero_tolerance() {
        let mut counter = PersistCmsCounter::new(&config(0.0));
        let input = [(5, 3), (6, 1), (7, 4), (8, 2), (9, 6)];
        for (tick, amount) in input {
            counter.count(tick, 0, amount);
        }
        counter.flush();
        counter.flush();

        let series = counter.rebuild(0);
        assert_eq!(series, input.to_vec());
        assert_eq!(counter.segments().len(), 3);
    }

    #[test]
    fn test_constant_rate_needs_one_segment() {
        let mut counter = PersistCmsCounter::new(&config(2.0));
        for tick in 100..400 {
            counter.count(tick, 0, 5);
        }
        counter.flush();
        assert_eq!(counter.segments().len(), 1);

        let series = counter.rebuild(0);
        assert_eq!(series.len(), 300);
        let total: Amount = series.iter().map(|&(_, v)| v).sum();
        assert!((total - 1500).abs() <= 2);
    }
}
