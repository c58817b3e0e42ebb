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
use std::cmp::Ordering;
use std::f64::consts::TAU;

use crate::Amount;
use crate::Series;
use crate::Tick;
use crate::config::SketchConfig;
use crate::counter::Counter;
use crate::counter::window_exceeded;
use crate::heap::BoundedHeap;
use crate::heap::Footprint;

/// One packed real-DFT coefficient, ranked by magnitude.
#[derive(Debug, Clone, Copy)]
struct Term {
    pos: u16,
    value: f32,
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .abs()
            .total_cmp(&other.value.abs())
            .then(self.pos.cmp(&other.pos))
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Term {}

impl Footprint for Term {
    fn footprint(&self) -> usize {
        size_of::<u16>() + size_of::<f32>()
    }
}

/// Windowed Fourier counter.
///
/// The window is cut into frames of [`SketchConfig::fourier_window`] ticks. Each completed frame
/// is transformed with a real DFT and its coefficients compete for the
/// [`SketchConfig::fourier_capacity`] slots of a [`BoundedHeap`] shared by the whole window.
///
/// Coefficients of a frame are packed into `frame` real slots: slot 0 holds the DC term, slot 1
/// the Nyquist term and slots `2k`, `2k + 1` the real and imaginary parts of bin `k`.
#[derive(Debug, Clone)]
pub struct FourierCounter {
    max_length: u32,
    frame: usize,
    start: Option<Tick>,
    last: Tick,
    ticks: usize,
    frame_index: usize,
    recent: Vec<f64>,
    dirty: bool,
    terms: BoundedHeap<Term>,
    cache: OnceCell<Series>,
}

impl FourierCounter {
    fn transform(&mut self) {
        let n = self.frame;
        let base = self.frame_index * n;
        let mut packed = vec![0.0f64; n];
        for k in 0..=n / 2 {
            let (mut re, mut im) = (0.0, 0.0);
            for (t, x) in self.recent.iter().enumerate() {
                let angle = TAU * (k * t) as f64 / n as f64;
                re += x * angle.cos();
                im -= x * angle.sin();
            }
            match k {
                0 => packed[0] = re,
                k if k == n / 2 => packed[1] = re,
                k => {
                    packed[2 * k] = re;
                    packed[2 * k + 1] = im;
                }
            }
        }
        for (slot, value) in packed.into_iter().enumerate() {
            self.terms.insert(Term {
                pos: (base + slot) as u16,
                value: value as f32,
            });
        }
        self.recent.fill(0.0);
    }

    fn inverse(packed: &[f64], out: &mut [f64]) {
        let n = packed.len();
        for (t, x) in out.iter_mut().enumerate() {
            let sign = if t % 2 == 0 { 1.0 } else { -1.0 };
            let mut sum = packed[0] + packed[1] * sign;
            for k in 1..n / 2 {
                let angle = TAU * (k * t) as f64 / n as f64;
                sum += 2.0 * (packed[2 * k] * angle.cos() - packed[2 * k + 1] * angle.sin());
            }
            *x = sum / n as f64;
        }
    }
}

impl Counter for FourierCounter {
    fn new(config: &SketchConfig) -> Self {
        Self {
            max_length: config.max_length(),
            frame: config.fourier_window(),
            start: None,
            last: 0,
            ticks: 0,
            frame_index: 0,
            recent: vec![0.0; config.fourier_window()],
            dirty: false,
            terms: BoundedHeap::new(config.fourier_capacity()),
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
                    self.flush();
                    return true;
                }
                if tick > self.last {
                    self.ticks += 1;
                }
                start
            }
        };

        let offset = (tick - start) as usize;
        if offset / self.frame > self.frame_index {
            self.flush();
            self.frame_index = offset / self.frame;
        }
        self.last = tick;
        self.recent[offset % self.frame] += amount as f64;
        self.dirty = true;
        false
    }

    fn flush(&mut self) {
        if self.dirty {
            self.transform();
            self.dirty = false;
        }
    }

    fn rebuild(&self, _residual: u64) -> Series {
        let start = self.start.expect("rebuild of an empty fourier counter");
        self.cache
            .get_or_init(|| {
                let mut packed = vec![0.0f64; self.max_length as usize];
                for term in self.terms.iter() {
                    packed[term.pos as usize] = f64::from(term.value);
                }
                let mut values = vec![0.0f64; self.max_length as usize];
                for (spectrum, out) in packed
                    .chunks(self.frame)
                    .zip(values.chunks_mut(self.frame))
                {
                    Self::inverse(spectrum, out);
                }
                values
                    .into_iter()
                    .enumerate()
                    .map(|(pos, v)| (start + pos as Tick, (v.round() as Amount).max(0)))
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
        size_of::<Tick>() + self.terms.serialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_capacity_reconstructs_exactly() {
        let config = SketchConfig::builder()
            .max_length(32)
            .fourier_window(8)
            .fourier_capacity(32)
            .build()
            .unwrap();
        let mut counter = FourierCounter::new(&config);
        let input = [(0, 5), (1, 3), (4, 9), (9, 2), (17, 7), (31, 4)];
        for (tick, amount) in input {
            assert!(!counter.count(tick, 0, amount));
        }
        counter.flush();
        counter.flush();

        let series = counter.rebuild(0);
        assert_eq!(series.len(), 32);
        for (tick, amount) in series {
            let expected = input
                .iter()
                .find(|(t, _)| *t == tick)
                .map_or(0, |(_, a)| *a);
            assert_eq!(amount, expected, "tick {tick}");
        }
    }

    #[test]
    fn test_keeps_dominant_terms() {
        let config = SketchConfig::builder()
            .max_length(16)
            .fourier_window(16)
            .fourier_capacity(1)
            .build()
            .unwrap();
        let mut counter = FourierCounter::new(&config);
        for tick in 0..16 {
            counter.count(tick, 0, 10);
        }
        counter.flush();
        assert!(counter.rebuild(0).iter().all(|&(_, v)| v == 10));
    }
}
