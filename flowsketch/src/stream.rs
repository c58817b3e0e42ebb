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

//! Helpers around the observation stream.
//!
//! Schemes assume observations arrive in non-decreasing tick order and abort otherwise.
//! [`Ordered`] checks that order at the ingestion boundary and reports violations as
//! [`ErrorKind::OutOfOrder`](crate::error::ErrorKind::OutOfOrder) instead. The remaining helpers
//! build exact per-flow series and queries to compare reconstructions against.

use std::collections::HashMap;
use std::hash::Hash;

use crate::Amount;
use crate::Series;
use crate::Tick;
use crate::config::TIMESCALE;
use crate::error::Error;

/// One `(flow, tick, amount)` observation.
pub type Observation<K> = (K, Tick, Amount);

/// Converts a timestamp in nanoseconds into a one-based tick.
pub fn tick_of(time_ns: u64) -> Result<Tick, Error> {
    Tick::try_from(time_ns / TIMESCALE + 1).map_err(|_| {
        Error::invalid_data("timestamp out of tick range").with_context("time_ns", time_ns)
    })
}

/// Iterator adapter that rejects tick regressions.
#[derive(Debug, Clone)]
pub struct Ordered<I> {
    inner: I,
    last: Option<Tick>,
}

impl<I> Ordered<I> {
    /// Wraps `inner`.
    pub fn new(inner: I) -> Self {
        Self { inner, last: None }
    }
}

impl<K, I> Iterator for Ordered<I>
where
    I: Iterator<Item = Observation<K>>,
{
    type Item = Result<Observation<K>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let (flow, tick, amount) = self.inner.next()?;
        match self.last {
            Some(previous) if tick < previous => Some(Err(Error::out_of_order(previous, tick))),
            _ => {
                self.last = Some(tick);
                Some(Ok((flow, tick, amount)))
            }
        }
    }
}

/// Checks that `observations` are in non-decreasing tick order.
pub fn ensure_ordered<K>(observations: &[Observation<K>]) -> Result<(), Error> {
    match observations
        .windows(2)
        .find(|pair| pair[1].1 < pair[0].1)
    {
        Some(pair) => Err(Error::out_of_order(pair[0].1, pair[1].1)),
        None => Ok(()),
    }
}

/// Aggregates ordered observations into exact per-flow, per-tick series.
pub fn sum_by_flow<K, I>(observations: I) -> HashMap<K, Series>
where
    K: Hash + Eq,
    I: IntoIterator<Item = Observation<K>>,
{
    let mut result: HashMap<K, Series> = HashMap::new();
    for (flow, tick, amount) in observations {
        let series = result.entry(flow).or_default();
        match series.last_mut() {
            Some((last, total)) if *last == tick => *total += amount,
            _ => series.push((tick, amount)),
        }
    }
    result
}

/// Turns exact series into a rebuild query over their ticks.
pub fn query_of<K: Hash + Eq + Clone>(truth: &HashMap<K, Series>) -> HashMap<K, Vec<Tick>> {
    truth
        .iter()
        .map(|(flow, series)| (flow.clone(), series.iter().map(|&(t, _)| t).collect()))
        .collect()
}

/// Projects `estimate` onto the ticks of `reference`, filling missing ticks with zero.
pub fn align(reference: &[(Tick, Amount)], estimate: &[(Tick, Amount)]) -> Series {
    let mut rest = estimate.iter().peekable();
    reference
        .iter()
        .map(|&(tick, _)| {
            while rest.next_if(|&&(t, _)| t < tick).is_some() {}
            let value = rest.next_if(|&&(t, _)| t == tick).map_or(0, |&(_, v)| v);
            (tick, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_ticks_are_one_based() {
        assert_eq!(tick_of(0).unwrap(), 1);
        assert_eq!(tick_of(8191).unwrap(), 1);
        assert_eq!(tick_of(8192).unwrap(), 2);
        assert_eq!(
            tick_of(u64::MAX).unwrap_err().kind(),
            ErrorKind::InvalidData
        );
    }

    #[test]
    fn test_ordered_reports_regression() {
        let items: Vec<Observation<&str>> = vec![("a", 1, 1), ("b", 3, 1), ("a", 2, 1), ("a", 3, 1)];
        let results: Vec<_> = Ordered::new(items.clone().into_iter()).collect();
        assert!(results[0].is_ok() && results[1].is_ok() && results[3].is_ok());
        let err = results[2].as_ref().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfOrder);
        assert_eq!(err.message(), "tick 2 arrived after tick 3");
        assert!(ensure_ordered(&items).is_err());
        assert!(ensure_ordered(&items[..2]).is_ok());
    }

    #[test]
    fn test_align_pads_and_drops() {
        let reference = vec![(1, 5), (2, 5), (4, 5)];
        let estimate = vec![(0, 9), (2, 3), (3, 7), (4, 1), (8, 2)];
        assert_eq!(align(&reference, &estimate), vec![(1, 0), (2, 3), (4, 1)]);
    }

    #[test]
    fn test_sum_by_flow_merges_same_tick() {
        let observations: Vec<Observation<u8>> = vec![(1, 1, 2), (2, 1, 1), (1, 1, 3), (1, 4, 1)];
        let truth = sum_by_flow(observations);
        assert_eq!(truth[&1], vec![(1, 5), (4, 1)]);
        assert_eq!(query_of(&truth)[&2], vec![1]);
    }
}
