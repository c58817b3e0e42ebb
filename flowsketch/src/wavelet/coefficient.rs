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

use std::cmp::Ordering;

use crate::Amount;
use crate::heap::Footprint;

// 128 and 128 + 53 approximate 1 and sqrt(2) in 7 fractional bits
const NO_SQRT: u64 = 0b1000_0000;
const SQRT2: u64 = 0b0011_0101;

/// A Haar detail coefficient tagged with its position in the transform buffer.
///
/// Coefficients are ranked by their energy-normalized magnitude: a detail at level `l` of a
/// transform with `levels` levels is scaled by `sqrt(2)^(levels - 1 - l)`, with the integer part
/// of the scale applied as a shift and the odd half-power approximated by a fixed-point factor.
/// Ties prefer exactly scaled coefficients, then the raw value, then the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coefficient {
    pos: u16,
    value: Amount,
    key: u64,
    sqrt: bool,
}

impl Coefficient {
    /// Creates the coefficient `value` stored at `pos` of a transform with `levels` levels.
    pub fn new(pos: u16, value: Amount, levels: u8) -> Self {
        let level = Self::level_of(pos, levels);
        let depth = levels.saturating_sub(1).saturating_sub(level);
        let sqrt = depth & 1 == 1;
        let key = value
            .unsigned_abs()
            .saturating_mul(1 << (depth / 2))
            .saturating_mul(NO_SQRT + u64::from(sqrt) * SQRT2);
        Self {
            pos,
            value,
            key,
            sqrt,
        }
    }

    /// Returns the wavelet level encoded by a buffer position.
    pub fn level_of(pos: u16, levels: u8) -> u8 {
        (u32::from(pos) | (1 << levels)).trailing_zeros() as u8
    }

    /// Returns the position in the transform buffer.
    pub fn pos(&self) -> u16 {
        self.pos
    }

    /// Returns the raw coefficient value.
    pub fn value(&self) -> Amount {
        self.value
    }

    /// Returns the normalized magnitude used for ranking.
    pub fn key(&self) -> u64 {
        self.key
    }

    /// Returns true unless the normalization needed the approximated `sqrt(2)` factor.
    pub fn is_exact(&self) -> bool {
        !self.sqrt
    }
}

impl Ord for Coefficient {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then(self.is_exact().cmp(&other.is_exact()))
            .then(self.value.cmp(&other.value))
            .then(self.pos.cmp(&other.pos))
    }
}

impl PartialOrd for Coefficient {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Footprint for Coefficient {
    // packed as a 14-bit position, two flags and a 16-bit normalized magnitude
    fn footprint(&self) -> usize {
        size_of::<u16>() * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_position() {
        assert_eq!(Coefficient::level_of(1, 8), 0);
        assert_eq!(Coefficient::level_of(6, 8), 1);
        assert_eq!(Coefficient::level_of(128, 8), 7);
        assert_eq!(Coefficient::level_of(256, 8), 8);
    }

    #[test]
    fn test_finer_levels_weigh_more() {
        // level 7 is the coarsest detail: scale 1
        let coarse = Coefficient::new(128, 10, 8);
        assert_eq!(coarse.key(), 10 * 128);
        assert!(coarse.is_exact());

        // level 6: scale sqrt(2)
        let sqrt = Coefficient::new(64, 10, 8);
        assert_eq!(sqrt.key(), 10 * (128 + 53));
        assert!(!sqrt.is_exact());

        // level 5: scale 2
        let finer = Coefficient::new(32, -10, 8);
        assert_eq!(finer.key(), 20 * 128);
        assert!(coarse < sqrt && sqrt < finer);
    }

    #[test]
    fn test_ties_prefer_exact_then_value() {
        let a = Coefficient::new(128, -5, 8);
        let b = Coefficient::new(384, 5, 8);
        assert_eq!(a.key(), b.key());
        assert!(a < b);
    }
}
