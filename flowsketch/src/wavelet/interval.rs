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

use crate::Tick;

/// Run-length record of which ticks of a window carried data.
///
/// The active ticks form runs of consecutive ticks separated by silent gaps. Each closed run is
/// stored as `(run length, gap length)`; the open run only keeps its length. The wavelet payload
/// indexes finalized ticks densely, and this record maps those indices back to real ticks.
#[derive(Debug, Clone)]
pub struct Interval {
    max_length: u32,
    capacity: usize,
    start: Option<Tick>,
    last: Tick,
    open: u16,
    runs: Vec<(u16, u16)>,
}

impl Interval {
    /// Creates an empty record for windows of `max_length` ticks.
    pub fn new(max_length: u32) -> Self {
        let capacity = (max_length / 2) as usize;
        Self {
            max_length,
            capacity,
            start: None,
            last: 0,
            open: 0,
            runs: Vec::with_capacity(capacity),
        }
    }

    /// Returns true if `tick` is the most recently recorded tick.
    ///
    /// The first tick ever seen opens the window and is reported as the same.
    pub fn same_as_last(&mut self, tick: Tick) -> bool {
        if self.start.is_none() {
            self.start = Some(tick);
            self.last = tick;
            self.open = 1;
        }
        tick == self.last
    }

    /// Records `tick`, returning true without recording it if the window cannot hold it.
    ///
    /// # Panics
    ///
    /// Panics if `tick` is not later than the last recorded tick.
    pub fn count(&mut self, tick: Tick) -> bool {
        let Some(start) = self.start else {
            self.start = Some(tick);
            self.last = tick;
            self.open = 1;
            return false;
        };
        assert!(tick > self.last, "tick {tick} arrived after tick {}", self.last);
        if tick - start >= self.max_length {
            return true;
        }

        let gap = tick - self.last - 1;
        if gap > 0 {
            if self.runs.len() == self.capacity {
                return true;
            }
            self.runs.push((self.open, gap as u16));
            self.open = 0;
        }
        self.open += 1;
        self.last = tick;
        false
    }

    /// Returns the first tick, or `None` while empty.
    pub fn start(&self) -> Option<Tick> {
        self.start
    }

    /// Returns the last recorded tick.
    pub fn last(&self) -> Tick {
        self.last
    }

    /// Returns true if no tick was recorded.
    pub fn is_empty(&self) -> bool {
        self.start.is_none()
    }

    /// Returns the number of recorded ticks.
    pub fn len(&self) -> usize {
        self.runs.iter().map(|&(run, _)| run as usize).sum::<usize>() + self.open as usize
    }

    /// Lists every recorded tick in increasing order.
    pub fn ticks(&self) -> Vec<Tick> {
        let Some(mut tick) = self.start else {
            return vec![];
        };
        let mut result = Vec::with_capacity(self.len());
        for &(run, gap) in &self.runs {
            result.extend(tick..tick + Tick::from(run));
            tick += Tick::from(run) + Tick::from(gap);
        }
        result.extend(tick..tick + Tick::from(self.open));
        result
    }

    /// Returns the bytes needed to store the record.
    pub fn serialize(&self) -> usize {
        size_of::<Tick>() * 2
            + size_of::<u16>() * 2
            + self.runs.len() * size_of::<u16>() * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_runs_and_gaps() {
        let mut interval = Interval::new(64);
        assert!(interval.same_as_last(10));
        for tick in [11, 12, 15, 16, 20] {
            assert!(!interval.same_as_last(tick));
            assert!(!interval.count(tick));
        }
        assert_eq!(interval.len(), 6);
        assert_eq!(interval.ticks(), vec![10, 11, 12, 15, 16, 20]);
        assert_eq!(interval.last(), 20);
    }

    #[test]
    fn test_tick_zero_opens_window() {
        let mut interval = Interval::new(16);
        assert!(interval.same_as_last(0));
        assert!(!interval.count(15));
        assert!(interval.count(16));
        assert_eq!(interval.ticks(), vec![0, 15]);
    }

    #[test]
    fn test_alternating_ticks_fit_window() {
        let mut interval = Interval::new(16);
        interval.same_as_last(0);
        for tick in (2..=14).step_by(2) {
            assert!(!interval.count(tick));
        }
        assert!(!interval.count(15));
        assert_eq!(interval.len(), 9);
        assert_eq!(interval.ticks(), vec![0, 2, 4, 6, 8, 10, 12, 14, 15]);
    }
}
