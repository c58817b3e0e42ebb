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

//! Complete measurement schemes.
//!
//! A scheme is what a measurement pipeline talks to: it ingests observations with
//! [`Scheme::count`], finalizes with [`Scheme::flush`] at the end of the stream, then answers
//! [`Scheme::rebuild`] queries and reports its footprint with [`Scheme::serialize`].
//!
//! * [`SketchScheme`] is a single [`SketchTable`](crate::table::SketchTable) of any counter.
//! * [`WaveletScheme`] pairs a [`HeavyTable`](crate::table::HeavyTable) with a residual sketch
//!   table, both using wavelet counters. Its signed form cancels colliding flows in the residual
//!   table.
//!
//! [`Method`] names every scheme configuration and builds it behind a trait object.

mod basic;
mod hybrid;

pub use self::basic::SketchScheme;
pub use self::hybrid::WaveletScheme;

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use crate::Amount;
use crate::Series;
use crate::Tick;
use crate::config::SketchConfig;
use crate::counter::FourierCounter;
use crate::counter::HistogramCounter;
use crate::counter::NaiveCounter;
use crate::counter::PersistAmsCounter;
use crate::error::Error;
use crate::persist::PersistCmsCounter;
use crate::stream::Observation;
use crate::stream::Ordered;
use crate::wavelet::SignedWaveletCounter;

/// A measurement scheme over flows of type `K`.
pub trait Scheme<K> {
    /// Ingests one observation. Returns true if a counter window rolled over.
    ///
    /// # Panics
    ///
    /// Panics if `tick` is earlier than a previously counted tick of the same cell.
    fn count(&mut self, flow: &K, tick: Tick, amount: Amount) -> bool;

    /// Finalizes every in-progress window. Must be called once the stream ends.
    fn flush(&mut self);

    /// Reconstructs the series of every queried flow.
    ///
    /// Each flow maps to the sorted ticks of interest; the first and last of them bound the
    /// windows consulted. Flows with no ticks are skipped. The call is read-only, so repeated
    /// queries yield identical answers.
    fn rebuild(&self, query: &HashMap<K, Vec<Tick>>) -> HashMap<K, Series>;

    /// Returns the bytes needed to store everything archived.
    fn serialize(&self) -> usize;

    /// Returns to the empty state, keeping the configuration.
    fn reset(&mut self);

    /// Counts every observation in order, then flushes.
    ///
    /// Returns the number of observations counted, or an error at the first tick regression.
    fn ingest<I>(&mut self, observations: I) -> Result<usize, Error>
    where
        Self: Sized,
        I: IntoIterator<Item = Observation<K>>,
    {
        let mut counted = 0;
        for observation in Ordered::new(observations.into_iter()) {
            let (flow, tick, amount) = observation?;
            self.count(&flow, tick, amount);
            counted += 1;
        }
        self.flush();
        Ok(counted)
    }
}

/// Splits a query entry into its tick bounds.
pub(crate) fn bounds(ticks: &[Tick]) -> Option<(Tick, Tick)> {
    Some((*ticks.first()?, *ticks.last()?))
}

/// Every available scheme configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Heavy-hitter plus residual tables of wavelet counters with exact detail heaps.
    WaveletIdeal,
    /// Like [`Method::WaveletIdeal`] with thresholded approximate detail sets.
    WaveletPractical,
    /// Heavy-hitter table plus a signed, median-selected residual table with one detail heap.
    WaveletAltIdeal,
    /// Like [`Method::WaveletAltIdeal`] with the detail heap split in two by level.
    WaveletAltPractical,
    /// Fixed-width histogram counters.
    OmniWindow,
    /// Exact per-tick counters.
    NaiveSketch,
    /// Windowed Fourier counters.
    Fourier,
    /// Piecewise-linear counters.
    PersistCms,
    /// Randomized persistent AMS counters.
    PersistAms,
}

impl Method {
    /// All methods in presentation order.
    pub const ALL: [Method; 9] = [
        Method::WaveletIdeal,
        Method::WaveletPractical,
        Method::WaveletAltIdeal,
        Method::WaveletAltPractical,
        Method::OmniWindow,
        Method::NaiveSketch,
        Method::Fourier,
        Method::PersistCms,
        Method::PersistAms,
    ];

    /// Returns the display name of the method.
    pub fn name(self) -> &'static str {
        match self {
            Method::WaveletIdeal => "Wavelet-Ideal",
            Method::WaveletPractical => "Wavelet-Practical",
            Method::WaveletAltIdeal => "Wavelet-Alt-Ideal",
            Method::WaveletAltPractical => "Wavelet-Alt-Practical",
            Method::OmniWindow => "OmniWindow",
            Method::NaiveSketch => "Naive-Sketch",
            Method::Fourier => "Fourier",
            Method::PersistCms => "Persist-CMS",
            Method::PersistAms => "Persist-AMS",
        }
    }

    /// Builds the scheme for this method.
    ///
    /// [`Method::WaveletPractical`] requires [`SketchConfig::thresholds`];
    /// [`Method::WaveletIdeal`] and both signed variants ignore them. The signed variants
    /// override [`SketchConfig::detail_partitions`] and fail if the window has too few levels.
    pub fn build<K>(self, config: &SketchConfig) -> Result<Box<dyn Scheme<K>>, Error>
    where
        K: Hash + Eq + Clone + 'static,
    {
        let scheme: Box<dyn Scheme<K>> = match self {
            Method::WaveletIdeal => Box::new(WaveletScheme::new(&config.without_thresholds())),
            Method::WaveletPractical => {
                if config.thresholds().is_none() {
                    return Err(Error::invalid_argument("thresholds are not configured")
                        .with_context("method", self));
                }
                Box::new(WaveletScheme::new(config))
            }
            Method::WaveletAltIdeal => {
                let config = config.without_thresholds().with_detail_partitions(1)?;
                Box::new(WaveletScheme::<K, SignedWaveletCounter>::signed(&config))
            }
            Method::WaveletAltPractical => {
                let config = config.without_thresholds().with_detail_partitions(2)?;
                Box::new(WaveletScheme::<K, SignedWaveletCounter>::signed(&config))
            }
            Method::OmniWindow => Box::new(SketchScheme::<K, HistogramCounter>::new(config)),
            Method::NaiveSketch => Box::new(SketchScheme::<K, NaiveCounter>::new(config)),
            Method::Fourier => Box::new(SketchScheme::<K, FourierCounter>::new(config)),
            Method::PersistCms => Box::new(SketchScheme::<K, PersistCmsCounter>::new(config)),
            Method::PersistAms => Box::new(SketchScheme::<K, PersistAmsCounter>::new(config)),
        };
        Ok(scheme)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|method| method.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::invalid_argument("unknown method").with_context("name", s))
    }
}
