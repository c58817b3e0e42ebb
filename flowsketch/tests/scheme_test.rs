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

use std::collections::HashMap;

use flowsketch::Amount;
use flowsketch::Series;
use flowsketch::Tick;
use flowsketch::config::SketchConfig;
use flowsketch::counter::NaiveCounter;
use flowsketch::error::ErrorKind;
use flowsketch::heap::Thresholds;
use flowsketch::scheme::Method;
use flowsketch::scheme::Scheme;
use flowsketch::scheme::SketchScheme;
use flowsketch::scheme::WaveletScheme;
use flowsketch::stream::Observation;
use flowsketch::stream::query_of;
use flowsketch::stream::sum_by_flow;
use flowsketch::wavelet::Coefficient;
use googletest::prelude::*;

fn mixed_stream() -> Vec<Observation<u32>> {
    let mut observations = vec![];
    for tick in 1..=300u32 {
        observations.push((1, tick, 20 + Amount::from(tick % 7)));
        if tick % 3 == 0 {
            observations.push((2, tick, 4));
        }
        if tick % 50 == 0 {
            observations.push((100 + tick, tick, 1));
        }
    }
    observations
}

fn practical_config() -> SketchConfig {
    SketchConfig::default().with_thresholds(Thresholds::new(
        Coefficient::new(0, 64, 8),
        Coefficient::new(0, 4, 8),
    ))
}

#[test]
fn test_naive_sketch_is_exact_for_a_single_flow() {
    let config = SketchConfig::default();
    let mut scheme = SketchScheme::<u32, NaiveCounter>::new(&config);
    for tick in 1..=2048 {
        scheme.count(&9, tick, 1);
    }
    scheme.flush();

    let answer = scheme.rebuild(&HashMap::from([(9, (1..=2048).collect())]));
    let expected: Series = (1..=2048).map(|tick| (tick, 1)).collect();
    assert_that!(answer[&9].len(), eq(2048usize));
    assert_eq!(answer[&9], expected);
}

#[test]
fn test_naive_sums_repeated_ticks() {
    let config = SketchConfig::default();
    let mut scheme = SketchScheme::<u32, NaiveCounter>::new(&config);
    let observations: Vec<Observation<u32>> = vec![(4, 1, 2), (4, 1, 3), (4, 2, 7), (4, 2, -1)];
    assert_that!(scheme.ingest(observations.clone()).unwrap(), eq(4usize));

    let truth = sum_by_flow(observations);
    let answer = scheme.rebuild(&query_of(&truth));
    assert_eq!(answer[&4], vec![(1, 5), (2, 6)]);
    assert_eq!(answer[&4], truth[&4]);
}

#[test]
fn test_ingest_rejects_tick_regression() {
    let config = SketchConfig::default();
    let mut scheme = SketchScheme::<u32, NaiveCounter>::new(&config);
    let error = scheme
        .ingest(vec![(1, 5, 1), (2, 6, 1), (1, 3, 1)])
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::OutOfOrder);
    assert_eq!(error.message(), "tick 3 arrived after tick 6");
}

#[test]
fn test_method_names_round_trip() {
    let names: Vec<&str> = Method::ALL.iter().map(|method| method.name()).collect();
    assert_eq!(
        names,
        [
            "Wavelet-Ideal",
            "Wavelet-Practical",
            "Wavelet-Alt-Ideal",
            "Wavelet-Alt-Practical",
            "OmniWindow",
            "Naive-Sketch",
            "Fourier",
            "Persist-CMS",
            "Persist-AMS",
        ]
    );
    for method in Method::ALL {
        assert_eq!(method.to_string().parse::<Method>().unwrap(), method);
    }
    assert_eq!("persist-cms".parse::<Method>().unwrap(), Method::PersistCms);
    assert_eq!(
        "wavelet-alt-practical".parse::<Method>().unwrap(),
        Method::WaveletAltPractical
    );
    assert_eq!(
        "Count-Min".parse::<Method>().unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
}

#[test]
fn test_practical_wavelet_requires_thresholds() {
    let config = SketchConfig::default();
    let error = Method::WaveletPractical.build::<u32>(&config).err().unwrap();
    assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    assert!(Method::WaveletPractical.build::<u32>(&practical_config()).is_ok());
    assert!(Method::WaveletIdeal.build::<u32>(&practical_config()).is_ok());
}

#[test]
fn test_signed_wavelet_needs_two_levels_for_two_partitions() {
    let config = SketchConfig::builder().max_length(16).build().unwrap();
    assert!(Method::WaveletAltIdeal.build::<u32>(&config).is_ok());
    let error = Method::WaveletAltPractical.build::<u32>(&config).err().unwrap();
    assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    assert!(Method::WaveletAltPractical.build::<u32>(&practical_config()).is_ok());
}

#[test]
fn test_signed_wavelet_answers_heavy_flow_exactly() {
    let config = SketchConfig::default();
    let mut scheme = WaveletScheme::signed(&config);
    for tick in 1..=500 {
        scheme.count(&1u32, tick, 5);
        if tick % 10 == 0 {
            scheme.count(&(1000 + tick), tick, 3);
        }
    }
    scheme.flush();

    assert!(scheme.top().labels().contains(&1));
    assert_that!(scheme.low().archived_count(), gt(0usize));
    let answer = scheme.rebuild(&HashMap::from([(1, (1..=500).collect())]));
    let expected: Series = (1..=500).map(|tick| (tick, 5)).collect();
    assert_eq!(answer[&1], expected);
}

#[test]
fn test_every_method_rebuilds_idempotently() {
    let observations = mixed_stream();
    let truth = sum_by_flow(observations.clone());
    let query = query_of(&truth);

    for method in Method::ALL {
        let mut scheme = method.build::<u32>(&practical_config()).unwrap();
        for (flow, tick, amount) in &observations {
            scheme.count(flow, *tick, *amount);
        }
        scheme.flush();

        let first = scheme.rebuild(&query);
        let second = scheme.rebuild(&query);
        assert_eq!(first, second, "{method}");
        assert_eq!(first.len(), truth.len(), "{method}");
        assert_that!(scheme.serialize(), gt(0usize));

        for series in first.values() {
            assert!(series.windows(2).all(|pair| pair[0].0 < pair[1].0), "{method}");
            assert!(series.iter().all(|&(_, amount)| amount >= 0), "{method}");
        }
    }
}

#[test]
fn test_flush_twice_changes_nothing() {
    let observations = mixed_stream();
    let query = query_of(&sum_by_flow(observations.clone()));

    for method in Method::ALL {
        let mut scheme = method.build::<u32>(&practical_config()).unwrap();
        for (flow, tick, amount) in &observations {
            scheme.count(flow, *tick, *amount);
        }
        scheme.flush();
        let once = (scheme.rebuild(&query), scheme.serialize());
        scheme.flush();
        let twice = (scheme.rebuild(&query), scheme.serialize());
        assert_eq!(once, twice, "{method}");
    }
}

#[test]
fn test_heavy_flow_is_answered_from_its_own_slot() {
    let config = SketchConfig::default();
    let mut scheme = WaveletScheme::<u32>::new(&config);
    for tick in 1..=500 {
        scheme.count(&1, tick, 5);
        if tick % 10 == 0 {
            scheme.count(&(1000 + tick), tick, 3);
        }
    }
    scheme.flush();

    assert!(scheme.top().labels().contains(&1));
    let answer = scheme.rebuild(&HashMap::from([(1, (1..=500).collect())]));
    let expected: Series = (1..=500).map(|tick| (tick, 5)).collect();
    assert_eq!(answer[&1], expected);
}

#[test]
fn test_wavelet_thresholds_from_saturated_counters() {
    let config = SketchConfig::builder()
        .max_length(256)
        .detail_capacity(8)
        .approx_capacity(8)
        .build()
        .unwrap();
    let amounts = |tick: Tick| Amount::from(tick * 37 % 101) + 1;

    let mut ideal = WaveletScheme::<u32>::new(&config);
    assert!(ideal.suggest_thresholds().is_none());
    for tick in 1..=200 {
        ideal.count(&7, tick, amounts(tick));
    }
    ideal.flush();

    let thresholds = ideal.suggest_thresholds().unwrap();
    assert!(thresholds.lo <= thresholds.hi);

    let mut practical = WaveletScheme::<u32>::new(&config.with_thresholds(thresholds));
    for tick in 1..=200 {
        practical.count(&7, tick, amounts(tick));
    }
    practical.flush();

    let query = HashMap::from([(7, (1..=200).collect::<Vec<Tick>>())]);
    for scheme in [&ideal, &practical] {
        let series = &scheme.rebuild(&query)[&7];
        assert_that!(series.len(), eq(200usize));
        assert_eq!(series.first().map(|&(tick, _)| tick), Some(1));
        assert_eq!(series.last().map(|&(tick, _)| tick), Some(200));
    }
}
