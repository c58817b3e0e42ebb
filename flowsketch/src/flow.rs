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

//! Network flow keys.
//!
//! Tables accept any `K: Hash + Eq + Ord + Clone` as a flow key. [`FiveTuple`] is the key used
//! for network traffic measurement.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::Error;

/// IANA protocol number for TCP.
pub const PROTOCOL_TCP: u8 = 6;
/// IANA protocol number for UDP.
pub const PROTOCOL_UDP: u8 = 17;

/// Classic network five-tuple identifying a flow.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FiveTuple {
    /// Source IPv4 address.
    pub src_ip: u32,
    /// Destination IPv4 address.
    pub dst_ip: u32,
    /// Source port.
    pub src_port: u16,
    /// Destination port.
    pub dst_port: u16,
    /// Transport protocol number.
    pub protocol: u8,
}

impl FiveTuple {
    /// Creates a five-tuple from its raw fields.
    pub fn new(src_ip: u32, dst_ip: u32, src_port: u16, dst_port: u16, protocol: u8) -> Self {
        Self {
            src_ip,
            dst_ip,
            src_port,
            dst_port,
            protocol,
        }
    }

    /// Creates a synthetic TCP flow identified only by `id` in the destination address.
    ///
    /// Traces that label flows with a bare integer id are mapped onto five-tuples this way.
    pub fn from_id(id: u32) -> Self {
        Self::new(0, id, 0, 0, PROTOCOL_TCP)
    }

    /// Parses a five-tuple from its textual fields.
    ///
    /// Addresses may be dotted quads (`10.0.0.1`) or plain decimal integers. The protocol must be
    /// `TCP` or `UDP` (case-insensitive).
    pub fn parse(
        src_ip: &str,
        dst_ip: &str,
        src_port: &str,
        dst_port: &str,
        protocol: &str,
    ) -> Result<Self, Error> {
        let protocol = if protocol.eq_ignore_ascii_case("TCP") {
            PROTOCOL_TCP
        } else if protocol.eq_ignore_ascii_case("UDP") {
            PROTOCOL_UDP
        } else {
            return Err(Error::invalid_data("unknown protocol").with_context("protocol", protocol));
        };
        Ok(Self::new(
            parse_ip(src_ip)?,
            parse_ip(dst_ip)?,
            parse_port(src_port)?,
            parse_port(dst_port)?,
            protocol,
        ))
    }
}

impl fmt::Display for FiveTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let protocol = if self.protocol == PROTOCOL_TCP {
            "T"
        } else {
            "U"
        };
        write!(
            f,
            "{protocol}{}:{}<>{}:{}",
            Ipv4Addr::from(self.src_ip),
            self.src_port,
            Ipv4Addr::from(self.dst_ip),
            self.dst_port
        )
    }
}

fn parse_ip(text: &str) -> Result<u32, Error> {
    let parsed = if text.contains('.') {
        Ipv4Addr::from_str(text).map(u32::from).ok()
    } else {
        text.parse::<u32>().ok()
    };
    parsed.ok_or_else(|| Error::invalid_data("malformed address").with_context("address", text))
}

fn parse_port(text: &str) -> Result<u16, Error> {
    text.parse::<u16>()
        .map_err(|_| Error::invalid_data("malformed port").with_context("port", text))
}
