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

use flowsketch::config::SketchConfig;
use flowsketch::counter::NaiveCounter;
use flowsketch::flow::FiveTuple;
use flowsketch::scheme::Method;
use flowsketch::scheme::Scheme;
use flowsketch::scheme::SketchScheme;
use flowsketch::stream::tick_of;

#[test]
fn test_five_tuple_display() {
    let flow = FiveTuple::parse("10.0.0.1", "192.168.1.20", "5353", "443", "tcp").unwrap();
    insta::assert_snapshot!(flow, @"T10.0.0.1:5353<>192.168.1.20:443");

    let flow = FiveTuple::parse("167772161", "3232235796", "53", "53", "UDP").unwrap();
    insta::assert_snapshot!(flow, @"U10.0.0.1:53<>192.168.1.20:53");

    insta::assert_snapshot!(FiveTuple::from_id(7), @"T0.0.0.0:0<>0.0.0.7:0");
}

#[test]
fn test_five_tuple_parse_errors() {
    let error = FiveTuple::parse("10.0.0.1", "10.0.0.2", "80", "80", "ICMP").unwrap_err();
    insta::assert_snapshot!(error, @"InvalidData, context: { protocol: ICMP } => unknown protocol");

    let error = FiveTuple::parse("10.0.0.1", "10.0.0.2", "99999", "80", "TCP").unwrap_err();
    insta::assert_snapshot!(error, @"InvalidData, context: { port: 99999 } => malformed port");

    let error = FiveTuple::parse("10.0.0.256", "10.0.0.2", "80", "80", "TCP").unwrap_err();
    insta::assert_snapshot!(error, @"InvalidData, context: { address: 10.0.0.256 } => malformed address");
}

#[test]
fn test_config_errors() {
    let error = SketchConfig::builder().max_length(100).build().unwrap_err();
    insta::assert_snapshot!(
        error,
        @"InvalidArgument, context: { field: max_length, value: 100 } => must be a power of two in [16, 16384]"
    );

    let error = SketchConfig::builder().persist_delta(-1.0).build().unwrap_err();
    insta::assert_snapshot!(
        error,
        @"InvalidArgument, context: { field: persist_delta, value: -1 } => must be finite and non-negative"
    );
}

#[test]
fn test_stream_errors() {
    let mut scheme = SketchScheme::<u32, NaiveCounter>::new(&SketchConfig::default());
    let error = scheme.ingest(vec![(1, 9, 1), (1, 8, 1)]).unwrap_err();
    insta::assert_snapshot!(error, @"OutOfOrder => tick 8 arrived after tick 9");

    let error = tick_of(u64::MAX).unwrap_err();
    insta::assert_snapshot!(
        error,
        @"InvalidData, context: { time_ns: 18446744073709551615 } => timestamp out of tick range"
    );

    let error = "Sketchy".parse::<Method>().unwrap_err();
    insta::assert_snapshot!(error, @"InvalidArgument, context: { name: Sketchy } => unknown method");
}
