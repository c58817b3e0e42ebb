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

//! The per-cell counter contract and the simpler counter variants.
//!
//! A counter compresses the observations that hash into one table cell during one window of
//! [`SketchConfig::max_length`] ticks. Its lifecycle is: created empty, fed by
//! [`Counter::count`] until it reports a full window or the stream ends, finalized with
//! [`Counter::flush`], then archived and only read through [`Counter::rebuild`].
//!
//! The compressed variants live in [`crate::wavelet`] and [`crate::persist`]; this module holds
//! the contract plus the reference variants:
//!
//! * [`NaiveCounter`] keeps exact per-tick totals.
//! * [`HistogramCounter`] keeps fixed-width buckets over the window.
//! * [`FourierCounter`] keeps the largest coefficients of a windowed real DFT.
//! * [`PersistAmsCounter`] keeps randomly sampled running values of two signed sub-streams.

mod ams;
mod fourier;
mod histogram;
mod naive;

pub use self::ams::PersistAmsCounter;
pub use self::fourier::FourierCounter;
pub use self::histogram::HistogramCounter;
pub use self::naive::NaiveCounter;

use crate::Amount;
use crate::Series;
use crate::Tick;
use crate::config::SketchConfig;
use crate::table::Selector;

/// A lossy or exact compressor for the observations of one table cell.
pub trait Counter {
    /// How a table combines the per-row reconstructions of this counter.
    const SELECTOR: Selector = Selector::Min;

    /// Creates an empty counter.
    fn new(config: &SketchConfig) -> Self
    where
        Self: Sized;

    /// Returns the factor applied to the amounts of a flow whose residual is `residual`.
    ///
    /// Unsigned counters use `1` for every flow.
    fn sign(_residual: u64) -> Amount
    where
        Self: Sized,
    {
        1
    }

    /// Records `amount` at `tick`.
    ///
    /// `residual` is the part of the row hash left after column selection. Returns true when the
    /// window is full; the observation is then *not* recorded, and the caller must archive this
    /// counter and count the observation again into a fresh one.
    ///
    /// # Panics
    ///
    /// Panics if `tick` is earlier than a previously counted tick.
    fn count(&mut self, tick: Tick, residual: u64, amount: Amount) -> bool;

    /// Finalizes any buffered data. Calling it more than once has no further effect.
    fn flush(&mut self);

    /// Reconstructs the per-tick series of this counter.
    ///
    /// The result is cached, so repeated calls return identical series.
    ///
    /// # Panics
    ///
    /// Panics if the counter is empty.
    fn rebuild(&self, residual: u64) -> Series;

    /// Reconstructs the series of `residual` after removing the `known` series of other flows
    /// counted into the same cell, each paired with its own residual.
    ///
    /// # Panics
    ///
    /// Panics if the counter is empty.
    fn rebuild_without(&self, residual: u64, known: &[(u64, &Series)]) -> Series
    where
        Self: Sized,
    {
        let mut estimate = self.rebuild(residual);
        for &(other, series) in known {
            subtract(&mut estimate, Self::sign(residual) * Self::sign(other), series);
        }
        estimate
    }

    /// Returns true if nothing was ever counted.
    fn is_empty(&self) -> bool;

    /// Returns the first tick of the window, or `None` while empty.
    fn start(&self) -> Option<Tick>;

    /// Returns the number of finalized ticks.
    fn ticks(&self) -> usize;

    /// Returns the number of bytes needed to store the counter once archived.
    fn serialize(&self) -> usize;
}

/// Subtracts `factor` times every amount of `series` from the entry of `estimate` at the same tick.
pub(crate) fn subtract(estimate: &mut Series, factor: Amount, series: &Series) {
    for &(tick, amount) in series {
        if let Ok(index) = estimate.binary_search_by_key(&tick, |&(t, _)| t) {
            estimate[index].1 -= factor * amount;
        }
    }
}

/// Returns true if `tick` falls outside the window opened at `start`.
#[inline]
pub(crate) fn window_exceeded(start: Tick, tick: Tick, max_length: u32) -> bool {
    tick - start >= max_length
}
