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

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::Amount;
use crate::Series;
use crate::Tick;
use crate::config::SketchConfig;
use crate::counter::Counter;
use crate::counter::window_exceeded;
use crate::table::Selector;

/// Randomized persistent AMS counter.
///
/// Flows are split into a positive and a negative sub-stream by the low bit of their residual.
/// Each sub-stream keeps a running total, and whenever its tick advances the previous total is
/// sampled with probability `1 / sample_period`. Reconstruction replays the sampled deltas and
/// re-applies the caller's sign, so colliding flows of opposite sign cancel out in expectation.
#[derive(Debug, Clone)]
pub struct PersistAmsCounter {
    max_length: u32,
    period: u32,
    seed: u64,
    start: Option<Tick>,
    last_any: Tick,
    ticks: usize,
    last: [Tick; 2],
    value: [Amount; 2],
    samples: [Vec<(Tick, Amount)>; 2],
    flushed: bool,
    rng: StdRng,
    cache: OnceCell<Series>,
}

impl PersistAmsCounter {
    fn sample(&mut self) -> bool {
        self.rng.random_range(1..=self.period) == 1
    }
}

#[inline]
fn substream(residual: u64) -> usize {
    (residual & 1) as usize
}

impl Counter for PersistAmsCounter {
    const SELECTOR: Selector = Selector::Median;

    fn new(config: &SketchConfig) -> Self {
        Self {
            max_length: config.max_length(),
            period: config.ams_sample_period(),
            seed: config.ams_seed(),
            start: None,
            last_any: 0,
            ticks: 0,
            last: [0; 2],
            value: [0; 2],
            samples: [vec![], vec![]],
            flushed: false,
            rng: StdRng::seed_from_u64(config.ams_seed()),
            cache: OnceCell::new(),
        }
    }

    fn count(&mut self, tick: Tick, residual: u64, amount: Amount) -> bool {
        let sign = substream(residual);
        match self.start {
            None => {
                self.start = Some(tick);
                self.last = [tick; 2];
                self.last_any = tick;
                self.ticks = 1;
                self.rng = StdRng::seed_from_u64(self.seed ^ u64::from(tick).rotate_left(32));
            }
            Some(start) => {
                assert!(
                    tick >= self.last_any,
                    "tick {tick} arrived after tick {}",
                    self.last_any
                );
                if window_exceeded(start, tick, self.max_length) {
                    self.flush();
                    return true;
                }
                if tick > self.last_any {
                    self.ticks += 1;
                    self.last_any = tick;
                }
            }
        }

        if tick > self.last[sign] && self.sample() {
            self.samples[sign].push((self.last[sign], self.value[sign]));
        }
        self.last[sign] = tick;
        self.value[sign] += amount;
        false
    }

    fn flush(&mut self) {
        if self.start.is_none() || self.flushed {
            return;
        }
        for sign in 0..2 {
            if self.sample() {
                self.samples[sign].push((self.last[sign], self.value[sign]));
            }
        }
        self.flushed = true;
    }

    fn rebuild(&self, residual: u64) -> Series {
        let start = self.start.expect("rebuild of an empty ams counter");
        let signed = self.cache.get_or_init(|| {
            let mut cursor = [0usize; 2];
            let mut previous: [Amount; 2] = [0; 2];
            (0..self.max_length)
                .map(|pos| {
                    let tick = start + pos;
                    let mut delta = 0;
                    for sign in 0..2 {
                        let Some(&(at, total)) = self.samples[sign].get(cursor[sign]) else {
                            continue;
                        };
                        if tick >= at {
                            let step = total - previous[sign];
                            delta += if sign == 0 { step } else { -step };
                            previous[sign] = total;
                            cursor[sign] += 1;
                        }
                    }
                    (tick, delta)
                })
                .collect()
        });

        let sign: Amount = if substream(residual) == 0 { 1 } else { -1 };
        signed
            .iter()
            .map(|&(tick, delta)| (tick, (sign * delta).max(0)))
            .collect()
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
        let samples = self.samples[0].len() + self.samples[1].len();
        size_of::<Tick>() + size_of::<u16>() * 2 + samples * (size_of::<Tick>() + size_of::<i32>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_sample_kept_with_unit_period() {
        let config = SketchConfig::builder()
            .max_length(16)
            .ams_sample_period(1)
            .build()
            .unwrap();
        let mut counter = PersistAmsCounter::new(&config);
        counter.count(3, 0, 4);
        counter.count(4, 0, 2);
        counter.count(4, 1, 7);
        counter.count(6, 1, 1);
        counter.flush();

        let positive = counter.rebuild(0);
        assert_eq!(positive.len(), 16);
        assert_eq!(positive[0], (3, 4));
        assert_eq!(positive[1], (4, 0));
        assert_eq!(positive[2], (5, 0));

        // the negative sub-stream sees the same deltas with the sign flipped
        let negative = counter.rebuild(1);
        assert_eq!(negative[0], (3, 0));
        assert_eq!(negative[1], (4, 5));
        assert_eq!(negative[3], (6, 1));
    }
}
