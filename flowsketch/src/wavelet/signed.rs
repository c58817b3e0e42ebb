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
use crate::counter::subtract;
use crate::table::Selector;
use crate::wavelet::WaveletCounter;

/// Wavelet counter over signed amounts.
///
/// A flow enters the cell with `+amount` if its residual is odd and `-amount` otherwise, so
/// colliding flows of opposite sign cancel out instead of inflating each other. Reconstruction
/// removes the known colliding flows from the signed cell, then re-applies the queried flow's
/// sign and clamps at one. Rows are combined by median, since a cell may now undercount as well
/// as overcount.
#[derive(Debug, Clone)]
pub struct SignedWaveletCounter {
    inner: WaveletCounter,
    cache: OnceCell<Series>,
}

impl SignedWaveletCounter {
    /// Returns the unsigned counter holding the signed cell totals.
    pub fn inner(&self) -> &WaveletCounter {
        &self.inner
    }
}

impl Counter for SignedWaveletCounter {
    const SELECTOR: Selector = Selector::Median;

    fn new(config: &SketchConfig) -> Self {
        Self {
            inner: WaveletCounter::new(config),
            cache: OnceCell::new(),
        }
    }

    fn sign(residual: u64) -> Amount {
        if residual % 2 == 1 { 1 } else { -1 }
    }

    fn count(&mut self, tick: Tick, residual: u64, amount: Amount) -> bool {
        self.inner.count(tick, residual, Self::sign(residual) * amount)
    }

    fn flush(&mut self) {
        self.inner.flush();
    }

    fn rebuild(&self, residual: u64) -> Series {
        self.rebuild_without(residual, &[])
    }

    fn rebuild_without(&self, residual: u64, known: &[(u64, &Series)]) -> Series {
        assert!(!self.is_empty(), "rebuild of an empty signed wavelet counter");
        let mut cell = self.cache.get_or_init(|| self.inner.reconstruct()).clone();
        for &(other, series) in known {
            subtract(&mut cell, Self::sign(other), series);
        }
        let sign = Self::sign(residual);
        cell.into_iter()
            .map(|(tick, value)| (tick, (sign * value).max(1)))
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn start(&self) -> Option<Tick> {
        self.inner.start()
    }

    fn ticks(&self) -> usize {
        self.inner.ticks()
    }

    fn serialize(&self) -> usize {
        self.inner.serialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_follows_residual_parity() {
        let config = SketchConfig::builder().max_length(64).build().unwrap();
        let mut counter = SignedWaveletCounter::new(&config);
        for tick in 0..8 {
            counter.count(tick, 3, 10);
            counter.count(tick, 4, 4);
        }
        counter.flush();

        assert!(counter.rebuild(1).iter().all(|&(_, v)| v == 6));
        assert!(counter.rebuild(2).iter().all(|&(_, v)| v == 1));
        assert_eq!(counter.rebuild(1).len(), 8);
    }

    #[test]
    fn test_known_flow_is_removed_before_the_sign() {
        let config = SketchConfig::builder().max_length(64).build().unwrap();
        let mut counter = SignedWaveletCounter::new(&config);
        for tick in 0..8 {
            counter.count(tick, 3, 10);
            counter.count(tick, 4, 4);
        }
        counter.flush();

        let heavy: Series = (0..8).map(|tick| (tick, 10)).collect();
        let answer = counter.rebuild_without(2, &[(3, &heavy)]);
        assert!(answer.iter().all(|&(_, v)| v == 4));
        assert_eq!(counter.rebuild(2), counter.rebuild_without(2, &[]));
    }
}
