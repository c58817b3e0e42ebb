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

//! Run configuration shared by every counter and table of a scheme.
//!
//! All tunables live in one [`SketchConfig`] value that is passed explicitly at construction,
//! so no sketch depends on process-wide mutable state.
//!
//! ```rust
//! # use flowsketch::config::SketchConfig;
//! let config = SketchConfig::builder()
//!     .max_length(1024)
//!     .persist_delta(16.0)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.level(), 7);
//! assert_eq!(config.reserved(), 8);
//! assert_eq!(config.detail_capacity(), 32);
//! ```

use crate::error::Error;
use crate::heap::Thresholds;
use crate::wavelet::Coefficient;

/// Nanoseconds of trace time per tick.
pub const TIMESCALE: u64 = 8192;
/// Default number of ticks covered by one counter window.
pub const DEFAULT_MAX_LENGTH: u32 = 2048;
/// Ratio between window length and retained coefficients per counter.
pub const SAMPLE_RATE: u32 = 32;
/// Default table width.
pub const FULL_WIDTH: usize = 32;
/// Width of the heavy-hitter table in hybrid schemes.
pub const HALF_WIDTH: usize = FULL_WIDTH / 2;
/// Default table height.
pub const FULL_HEIGHT: usize = 3;
/// Height of the residual table in hybrid schemes.
pub const LESS_HEIGHT: usize = FULL_HEIGHT - 1;
/// Height of the heavy-hitter table in hybrid schemes.
pub const PAIR_HEIGHT: usize = 2;
/// Default per-row hash seeds.
pub const DEFAULT_SEEDS: [u64; 4] = [0x5A5A_5A5A, 0x4242_4242, 0xDEAD_BEEF, 0x1234_5678];

const MIN_MAX_LENGTH: u32 = 16;
// wavelet positions are kept in 14 bits
const MAX_MAX_LENGTH: u32 = 1 << 14;

const DEFAULT_PERSIST_DELTA: f64 = 40.0;
const DEFAULT_FOURIER_WINDOW: usize = 64;
const DEFAULT_AMS_SEED: u64 = 0xAEAB_DC85;
const DEFAULT_APPROX_SEED: u64 = 0x9E37_79B9_7F4A_7C15;
const DEFAULT_HIT_RATIO: u32 = 8;

/// Validated configuration for one measurement run.
#[derive(Debug, Clone)]
pub struct SketchConfig {
    max_length: u32,
    seeds: Vec<u64>,
    detail_capacity: usize,
    detail_partitions: usize,
    approx_capacity: usize,
    thresholds: Option<Thresholds<Coefficient>>,
    approx_seed: u64,
    persist_delta: f64,
    histogram_buckets: usize,
    fourier_window: usize,
    fourier_capacity: usize,
    ams_sample_period: u32,
    ams_seed: u64,
    hit_ratio: u32,
    retain_threshold: usize,
}

impl Default for SketchConfig {
    fn default() -> Self {
        SketchConfigBuilder::default()
            .build()
            .expect("default configuration is valid")
    }
}

impl SketchConfig {
    /// Creates a new builder populated with the default parameters.
    pub fn builder() -> SketchConfigBuilder {
        SketchConfigBuilder::default()
    }

    /// Returns the number of ticks covered by one counter window.
    pub fn max_length(&self) -> u32 {
        self.max_length
    }

    /// Returns the number of wavelet levels transformed inside a counter.
    ///
    /// Transformation stops three levels below the top, leaving [`SketchConfig::reserved`]
    /// coarse coefficients that are always kept exactly.
    pub fn level(&self) -> u8 {
        (self.max_length.trailing_zeros() - 3) as u8
    }

    /// Returns the number of exactly kept top-level wavelet coefficients.
    pub fn reserved(&self) -> usize {
        (self.max_length >> self.level()) as usize
    }

    /// Returns the mask selecting a position inside one transformed segment.
    pub fn index_mask(&self) -> u32 {
        (1u32 << self.level()) - 1
    }

    /// Returns the per-row hash seeds.
    pub fn seeds(&self) -> &[u64] {
        &self.seeds
    }

    /// Returns the total number of detail coefficients retained by a wavelet counter.
    pub fn detail_capacity(&self) -> usize {
        self.detail_capacity
    }

    /// Returns the number of stores the detail coefficients are partitioned into by level.
    pub fn detail_partitions(&self) -> usize {
        self.detail_partitions
    }

    /// Returns the capacity of the approximate coefficient set.
    pub fn approx_capacity(&self) -> usize {
        self.approx_capacity
    }

    /// Returns the thresholds of the approximate coefficient set, if configured.
    ///
    /// When present, wavelet counters retain coefficients with an [`ApproxBoundedSet`] instead
    /// of an exact [`BoundedHeap`].
    ///
    /// [`ApproxBoundedSet`]: crate::heap::ApproxBoundedSet
    /// [`BoundedHeap`]: crate::heap::BoundedHeap
    pub fn thresholds(&self) -> Option<&Thresholds<Coefficient>> {
        self.thresholds.as_ref()
    }

    /// Returns a copy of this configuration with the approximate-set thresholds removed.
    pub fn without_thresholds(&self) -> SketchConfig {
        SketchConfig {
            thresholds: None,
            ..self.clone()
        }
    }

    /// Returns a copy of this configuration using `thresholds` for the approximate set.
    pub fn with_thresholds(&self, thresholds: Thresholds<Coefficient>) -> SketchConfig {
        SketchConfig {
            thresholds: Some(thresholds),
            ..self.clone()
        }
    }

    /// Returns a copy of this configuration splitting the detail coefficients into `partitions`
    /// stores.
    pub fn with_detail_partitions(&self, partitions: usize) -> Result<SketchConfig, Error> {
        check_partitions(self.level() as usize, self.detail_capacity, partitions)?;
        Ok(SketchConfig {
            detail_partitions: partitions,
            ..self.clone()
        })
    }

    /// Returns the seed of the approximate set's eviction sampler.
    pub fn approx_seed(&self) -> u64 {
        self.approx_seed
    }

    /// Returns the tolerance of the piecewise-linear counter.
    pub fn persist_delta(&self) -> f64 {
        self.persist_delta
    }

    /// Returns the number of buckets of the histogram counter.
    pub fn histogram_buckets(&self) -> usize {
        self.histogram_buckets
    }

    /// Returns the number of ticks per Fourier transform window.
    pub fn fourier_window(&self) -> usize {
        self.fourier_window
    }

    /// Returns the number of Fourier coefficients retained per counter.
    pub fn fourier_capacity(&self) -> usize {
        self.fourier_capacity
    }

    /// Returns the mean number of tick advances between two samples of the AMS counter.
    pub fn ams_sample_period(&self) -> u32 {
        self.ams_sample_period
    }

    /// Returns the seed of the AMS counter's sampler.
    pub fn ams_seed(&self) -> u64 {
        self.ams_seed
    }

    /// Returns the frequency boost granted to a heavy-hitter slot on every hit.
    pub fn hit_ratio(&self) -> u32 {
        self.hit_ratio
    }

    /// Returns the number of finalized ticks an evicted heavy-hitter counter needs to be kept.
    pub fn retain_threshold(&self) -> usize {
        self.retain_threshold
    }
}

/// Builder for [`SketchConfig`].
///
/// Parameters left unset are derived from the window length when the configuration is built.
#[derive(Debug, Clone, Default)]
pub struct SketchConfigBuilder {
    max_length: Option<u32>,
    seeds: Option<Vec<u64>>,
    detail_capacity: Option<usize>,
    detail_partitions: Option<usize>,
    approx_capacity: Option<usize>,
    thresholds: Option<Thresholds<Coefficient>>,
    approx_seed: Option<u64>,
    persist_delta: Option<f64>,
    histogram_buckets: Option<usize>,
    fourier_window: Option<usize>,
    fourier_capacity: Option<usize>,
    ams_sample_period: Option<u32>,
    ams_seed: Option<u64>,
    hit_ratio: Option<u32>,
    retain_threshold: Option<usize>,
}

impl SketchConfigBuilder {
    /// Sets the window length in ticks. Must be a power of two in `[16, 16384]`.
    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Sets the per-row hash seeds.
    pub fn seeds(mut self, seeds: impl Into<Vec<u64>>) -> Self {
        self.seeds = Some(seeds.into());
        self
    }

    /// Sets the number of detail coefficients a wavelet counter retains.
    pub fn detail_capacity(mut self, capacity: usize) -> Self {
        self.detail_capacity = Some(capacity);
        self
    }

    /// Sets the number of level-partitioned coefficient stores per wavelet counter.
    pub fn detail_partitions(mut self, partitions: usize) -> Self {
        self.detail_partitions = Some(partitions);
        self
    }

    /// Sets the capacity of the approximate coefficient set.
    pub fn approx_capacity(mut self, capacity: usize) -> Self {
        self.approx_capacity = Some(capacity);
        self
    }

    /// Sets the approximate-set thresholds, selecting the thresholded wavelet variant.
    pub fn thresholds(mut self, thresholds: Thresholds<Coefficient>) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    /// Sets the seed of the approximate set's eviction sampler.
    pub fn approx_seed(mut self, seed: u64) -> Self {
        self.approx_seed = Some(seed);
        self
    }

    /// Sets the tolerance of the piecewise-linear counter.
    pub fn persist_delta(mut self, delta: f64) -> Self {
        self.persist_delta = Some(delta);
        self
    }

    /// Sets the number of histogram buckets per window.
    pub fn histogram_buckets(mut self, buckets: usize) -> Self {
        self.histogram_buckets = Some(buckets);
        self
    }

    /// Sets the Fourier transform window in ticks.
    pub fn fourier_window(mut self, window: usize) -> Self {
        self.fourier_window = Some(window);
        self
    }

    /// Sets the number of Fourier coefficients retained per counter.
    pub fn fourier_capacity(mut self, capacity: usize) -> Self {
        self.fourier_capacity = Some(capacity);
        self
    }

    /// Sets the mean number of tick advances between two AMS samples.
    pub fn ams_sample_period(mut self, period: u32) -> Self {
        self.ams_sample_period = Some(period);
        self
    }

    /// Sets the seed of the AMS sampler.
    pub fn ams_seed(mut self, seed: u64) -> Self {
        self.ams_seed = Some(seed);
        self
    }

    /// Sets the frequency boost of a heavy-hitter hit.
    pub fn hit_ratio(mut self, ratio: u32) -> Self {
        self.hit_ratio = Some(ratio);
        self
    }

    /// Sets the retention threshold for evicted heavy-hitter counters.
    pub fn retain_threshold(mut self, ticks: usize) -> Self {
        self.retain_threshold = Some(ticks);
        self
    }

    /// Validates the parameters and builds the configuration.
    pub fn build(self) -> Result<SketchConfig, Error> {
        let max_length = self.max_length.unwrap_or(DEFAULT_MAX_LENGTH);
        if !max_length.is_power_of_two() || !(MIN_MAX_LENGTH..=MAX_MAX_LENGTH).contains(&max_length)
        {
            return Err(invalid(
                "max_length",
                max_length,
                format!("must be a power of two in [{MIN_MAX_LENGTH}, {MAX_MAX_LENGTH}]"),
            ));
        }
        let level = (max_length.trailing_zeros() - 3) as usize;
        let depth = (max_length / SAMPLE_RATE).max(1) as usize;

        let seeds = self.seeds.unwrap_or_else(|| DEFAULT_SEEDS.to_vec());
        if seeds.is_empty() {
            return Err(invalid("seeds", 0, "at least one seed is required"));
        }

        let detail_capacity = self.detail_capacity.unwrap_or(depth);
        if detail_capacity == 0 {
            return Err(invalid("detail_capacity", 0, "must be at least 1"));
        }
        let detail_partitions = self.detail_partitions.unwrap_or(1);
        check_partitions(level, detail_capacity, detail_partitions)?;

        let approx_capacity = self.approx_capacity.unwrap_or(depth);
        if approx_capacity == 0 {
            return Err(invalid("approx_capacity", 0, "must be at least 1"));
        }

        let persist_delta = self.persist_delta.unwrap_or(DEFAULT_PERSIST_DELTA);
        if !persist_delta.is_finite() || persist_delta < 0.0 {
            return Err(invalid(
                "persist_delta",
                persist_delta,
                "must be finite and non-negative",
            ));
        }

        let histogram_buckets = self.histogram_buckets.unwrap_or(depth * 2);
        if !histogram_buckets.is_power_of_two() || histogram_buckets > max_length as usize {
            return Err(invalid(
                "histogram_buckets",
                histogram_buckets,
                "must be a power of two no larger than max_length",
            ));
        }

        let fourier_window = self
            .fourier_window
            .unwrap_or(DEFAULT_FOURIER_WINDOW.min(max_length as usize));
        if !fourier_window.is_power_of_two()
            || fourier_window < 2
            || fourier_window > max_length as usize
        {
            return Err(invalid(
                "fourier_window",
                fourier_window,
                "must be a power of two in [2, max_length]",
            ));
        }
        let fourier_capacity = self.fourier_capacity.unwrap_or((depth * 4 / 6).max(1));
        if fourier_capacity == 0 {
            return Err(invalid("fourier_capacity", 0, "must be at least 1"));
        }

        let ams_sample_period = self
            .ams_sample_period
            .unwrap_or_else(|| {
                let samples = (depth as u32 * 4).saturating_sub(20).div_ceil(10).max(1);
                (max_length / samples).max(1)
            });
        if ams_sample_period == 0 {
            return Err(invalid("ams_sample_period", 0, "must be at least 1"));
        }

        let hit_ratio = self.hit_ratio.unwrap_or(DEFAULT_HIT_RATIO);
        if hit_ratio == 0 {
            return Err(invalid("hit_ratio", 0, "must be at least 1"));
        }

        Ok(SketchConfig {
            max_length,
            seeds,
            detail_capacity,
            detail_partitions,
            approx_capacity,
            thresholds: self.thresholds,
            approx_seed: self.approx_seed.unwrap_or(DEFAULT_APPROX_SEED),
            persist_delta,
            histogram_buckets,
            fourier_window,
            fourier_capacity,
            ams_sample_period,
            ams_seed: self.ams_seed.unwrap_or(DEFAULT_AMS_SEED),
            hit_ratio,
            retain_threshold: self.retain_threshold.unwrap_or(depth * 4),
        })
    }
}

fn check_partitions(level: usize, capacity: usize, partitions: usize) -> Result<(), Error> {
    if !(1..=level).contains(&partitions) {
        return Err(invalid(
            "detail_partitions",
            partitions,
            format!("must be in [1, {level}]"),
        ));
    }
    if capacity < partitions {
        return Err(invalid(
            "detail_capacity",
            capacity,
            "must be at least the number of partitions",
        ));
    }
    Ok(())
}

fn invalid(field: &'static str, value: impl ToString, message: impl Into<String>) -> Error {
    Error::invalid_argument(message)
        .with_context("field", field)
        .with_context("value", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_window_length() {
        let config = SketchConfig::default();
        assert_eq!(config.max_length(), 2048);
        assert_eq!(config.level(), 8);
        assert_eq!(config.reserved(), 8);
        assert_eq!(config.index_mask(), 255);
        assert_eq!(config.detail_capacity(), 64);
        assert_eq!(config.histogram_buckets(), 128);
        assert_eq!(config.fourier_window(), 64);
        assert_eq!(config.fourier_capacity(), 42);
        assert_eq!(config.ams_sample_period(), 85);
        assert_eq!(config.retain_threshold(), 256);
        assert_eq!(config.seeds(), &DEFAULT_SEEDS);
        assert!(config.thresholds().is_none());
    }

    #[test]
    fn test_rejects_non_power_of_two_window() {
        let err = SketchConfig::builder().max_length(1000).build().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }
    #[test]
    fn test_detail_partitions_follow_level() {
        let config = SketchConfig::builder().max_length(64).build().unwrap();
        assert_eq!(config.level(), 3);
        assert_eq!(config.with_detail_partitions(2).unwrap().detail_partitions(), 2);
        assert!(config.with_detail_partitions(0).is_err());
        assert!(config.with_detail_partitions(4).is_err());
        assert!(config.with_detail_partitions(3).is_err());
    }
}
