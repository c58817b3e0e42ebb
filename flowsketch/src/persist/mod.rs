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

//! Piecewise-linear approximation of cumulative counts.
//!
//! The [`Polygon`] solver fits an online sequence of points with as few line segments as
//! possible while keeping every point within a tolerance, and [`PersistCmsCounter`] applies it
//! to the running total of a table cell.

mod counter;
mod polygon;

pub use self::counter::PersistCmsCounter;
pub use self::polygon::Polygon;
pub use self::polygon::Segment;
pub use self::polygon::Vertex;
