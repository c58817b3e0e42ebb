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

//! Bounded-memory sketches that reconstruct per-flow time series.
//!
//! The crate ingests a time-ordered stream of `(flow, tick, amount)` observations and keeps
//! compressed per-cell summaries ("counters") inside multi-row hashed tables. After the stream
//! ends, the time series of any flow can be reconstructed approximately from the archived
//! counters, using far less memory than storing the raw series.
//!
//! # Building blocks
//!
//! * [`heap`]: fixed-capacity retention structures for compressed coefficients.
//! * [`wavelet`]: the online Haar wavelet counter with sparse-time bookkeeping.
//! * [`persist`]: the piecewise-linear polygon solver and its counter.
//! * [`counter`]: the [`Counter`](counter::Counter) contract and the simpler counter variants.
//! * [`table`]: the hashed sketch table and the heavy-hitter table.
//! * [`scheme`]: complete measurement schemes exposing `count`, `flush`, `rebuild` and
//!   `serialize`.
//!
//! # Usage
//!
//! ```rust
//! # use std::collections::HashMap;
//! # use flowsketch::config::SketchConfig;
//! # use flowsketch::counter::NaiveCounter;
//! # use flowsketch::scheme::Scheme;
//! # use flowsketch::scheme::SketchScheme;
//! let config = SketchConfig::default();
//! let mut scheme = SketchScheme::<u32, NaiveCounter>::new(&config);
//! for tick in 1..=10 {
//!     scheme.count(&7, tick, 3);
//! }
//! scheme.flush();
//!
//! let query = HashMap::from([(7u32, (1..=10).collect::<Vec<_>>())]);
//! let answer = scheme.rebuild(&query);
//! assert_eq!(answer[&7].len(), 10);
//! assert!(answer[&7].iter().all(|&(_, amount)| amount == 3));
//! ```

#![deny(missing_docs)]

pub mod config;
pub mod counter;
pub mod error;
pub mod flow;
pub mod hash;
pub mod heap;
pub mod persist;
pub mod scheme;
pub mod stream;
pub mod table;
pub mod wavelet;

/// Discretized time index. Observations must arrive in non-decreasing tick order.
pub type Tick = u32;

/// Signed quantity attached to an observation (bytes, packets or unit increments).
pub type Amount = i64;

/// A reconstructed time series: `(tick, amount)` pairs in increasing tick order.
pub type Series = Vec<(Tick, Amount)>;
