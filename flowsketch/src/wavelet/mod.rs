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

//! Online Haar wavelet compression with sparse-time bookkeeping.
//!
//! A [`WaveletCounter`] transforms its cell's per-tick totals incrementally: every finalized tick
//! runs one step of the in-place Haar butterfly, and only the most significant detail
//! [`Coefficient`]s survive in bounded stores. An [`Interval`] records which ticks actually
//! carried data, so silent gaps cost nothing in the transform. [`SignedWaveletCounter`] runs the
//! same transform over amounts signed by the flow's residual.
//!
//! ```rust
//! # use flowsketch::config::SketchConfig;
//! # use flowsketch::counter::Counter;
//! # use flowsketch::wavelet::WaveletCounter;
//! let config = SketchConfig::default();
//! let mut counter = WaveletCounter::new(&config);
//! for tick in [3, 4, 9] {
//!     counter.count(tick, 0, 2);
//! }
//! counter.flush();
//! assert_eq!(counter.rebuild(0), vec![(3, 2), (4, 2), (9, 2)]);
//! ```

mod coefficient;
mod counter;
mod interval;
mod signed;

pub use self::coefficient::Coefficient;
pub use self::counter::WaveletCounter;
pub use self::interval::Interval;
pub use self::signed::SignedWaveletCounter;
