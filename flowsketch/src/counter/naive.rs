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

use crate::Amount;
use crate::Series;
use crate::Tick;
use crate::config::SketchConfig;
use crate::counter::Counter;
use crate::counter::window_exceeded;

/// Uncompressed counter keeping the exact total of every observed tick.
///
/// Serves as the accuracy reference for the compressed counters.
#[derive(Debug, Clone)]
pub struct NaiveCounter {
    max_length: u32,
    totals: Vec<(Tick, Amount)>,
}

impl Counter for NaiveCounter {
    fn new(config: &SketchConfig) -> Self {
        Self {
            max_length: config.max_length(),
            totals: vec![],
        }
    }

    fn count(&mut self, tick: Tick, _residual: u64, amount: Amount) -> bool {
        let Some(start) = self.start() else {
            self.totals.push((tick, amount));
            return false;
        };
        let last = self.totals.len() - 1;
        let last_tick = self.totals[last].0;
        assert!(tick >= last_tick, "tick {tick} arrived after tick {last_tick}");
        if window_exceeded(start, tick, self.max_length) {
            return true;
        }
        if tick == last_tick {
            self.totals[last].1 += amount;
        } else {
            self.totals.push((tick, amount));
        }
        false
    }

    fn flush(&mut self) {}

    fn rebuild(&self, _residual: u64) -> Series {
        assert!(!self.is_empty(), "rebuild of an empty naive counter");
        self.totals.clone()
    }

    fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    fn start(&self) -> Option<Tick> {
        self.totals.first().map(|(tick, _)| *tick)
    }

    fn ticks(&self) -> usize {
        self.totals.len()
    }

    fn serialize(&self) -> usize {
        size_of::<Tick>() + self.totals.len() * (size_of::<u16>() + size_of::<Amount>())
    }
}
