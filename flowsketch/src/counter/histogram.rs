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

/// Fixed-width bucket histogram over the window.
///
/// Each bucket covers `max_length / buckets` consecutive ticks. Reconstruction spreads every
/// bucket evenly over its ticks, so the output always spans the whole window.
#[derive(Debug, Clone)]
pub struct HistogramCounter {
    max_length: u32,
    rate: u32,
    start: Option<Tick>,
    last: Tick,
    ticks: usize,
    buckets: Vec<Amount>,
    cache: OnceCell<Series>,
}

impl Counter for HistogramCounter {
    fn new(config: &SketchConfig) -> Self {
        let buckets = config.histogram_buckets();
        Self {
            max_length: config.max_length(),
            rate: config.max_length() / buckets as u32,
            start: None,
            last: 0,
            ticks: 0,
            buckets: vec![0; buckets],
            cache: OnceCell::new(),
        }
    }

    fn count(&mut self, tick: Tick, _residual: u64, amount: Amount) -> bool {
        let start = match self.start {
            None => {
                self.start = Some(tick);
                self.ticks = 1;
                tick
            }
            Some(start) => {
                assert!(tick >= self.last, "tick {tick} arrived after tick {}", self.last);
                if window_exceeded(start, tick, self.max_length) {
                    return true;
                }
                if tick > self.last {
                    self.ticks += 1;
                }
                start
            }
        };
        self.last = tick;
        self.buckets[((tick - start) / self.rate) as usize] += amount;
        false
    }

    fn flush(&mut self) {}

    fn rebuild(&self, _residual: u64) -> Series {
        let start = self.start.expect("rebuild of an empty histogram counter");
        self.cache
            .get_or_init(|| {
                let rate = Amount::from(self.rate);
                (0..self.max_length)
                    .map(|pos| {
                        let bucket = self.buckets[(pos / self.rate) as usize];
                        (start + pos, (bucket / rate).max(0))
                    })
                    .collect()
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
        size_of::<Tick>() + self.buckets.len() * size_of::<u32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spreads_buckets_over_window() {
        let config = SketchConfig::builder()
            .max_length(64)
            .histogram_buckets(8)
            .build()
            .unwrap();
        let mut counter = HistogramCounter::new(&config);
        counter.count(100, 0, 16);
        counter.count(107, 0, 8);
        counter.count(108, 0, 80);

        let series = counter.rebuild(0);
        assert_eq!(series.len(), 64);
        assert_eq!(series[0], (100, 3));
        assert_eq!(series[7], (107, 3));
        assert_eq!(series[8], (108, 10));
        assert_eq!(series[63], (163, 0));
        assert_eq!(counter.ticks(), 3);
    }
}
