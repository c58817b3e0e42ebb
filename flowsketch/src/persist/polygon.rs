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
use std::collections::VecDeque;

use crate::Amount;
use crate::Tick;

/// A line `u = slope * t + intercept`, which is also a vertex of the dual feasible region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Slope of the line.
    pub slope: f64,
    /// Intercept of the line at tick zero.
    pub intercept: f64,
}

impl Vertex {
    /// Evaluates the line at `tick` in double precision.
    pub fn evaluate(&self, tick: Tick) -> f64 {
        self.intercept + self.slope * f64::from(tick)
    }

    fn midpoint(&self, other: &Vertex) -> Vertex {
        Vertex {
            slope: (self.slope + other.slope) / 2.0,
            intercept: (self.intercept + other.intercept) / 2.0,
        }
    }

    fn through(t0: Tick, y0: f64, t1: Tick, y1: f64) -> Vertex {
        let (t0, t1) = (f64::from(t0), f64::from(t1));
        let dt = t1 - t0;
        Vertex {
            slope: (y1 - y0) / dt,
            intercept: (t1 * y0 - t0 * y1) / dt,
        }
    }
}

/// A finalized line, valid up to and including `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Last tick covered by the line.
    pub end: Tick,
    /// The fitted line.
    pub line: Vertex,
}

#[derive(Debug, Clone, Copy)]
struct Point {
    tick: Tick,
    value: f64,
    delta: f64,
}

/// Online piecewise-linear fitting with a bounded error.
///
/// The polygon is the set of `(slope, intercept)` pairs whose line passes within `delta` of every
/// point inserted since the last break, i.e. all `(m, b)` with
///
/// ```text
/// -t_k * m + (v_k - delta) <= b <= -t_k * m + (v_k + delta)
/// ```
///
/// It is convex and stored as an upper and a lower chain of vertices, both running from the
/// leftmost vertex `L` to the rightmost vertex `R`. For a tick later than every inserted one, the
/// prediction `b + t * m` grows monotonically along both chains from `L` to `R`, so a new band
/// misses the polygon exactly when `R` lies below it or `L` above it.
#[derive(Debug, Clone, Default)]
pub struct Polygon {
    upper: VecDeque<Vertex>,
    lower: VecDeque<Vertex>,
    last: Option<Point>,
}

impl Polygon {
    /// Creates an empty polygon.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every inserted point.
    pub fn reset(&mut self) {
        self.upper.clear();
        self.lower.clear();
        self.last = None;
    }

    /// Returns the best current line, covering up to the last inserted tick.
    ///
    /// This is the midpoint of `L` and `R`. With a single pending point it is the flat line
    /// through that point. Returns `None` if nothing was inserted.
    pub fn current(&self) -> Option<Segment> {
        let last = self.last?;
        let line = match (self.upper.front(), self.upper.back()) {
            (Some(l), Some(r)) => l.midpoint(r),
            _ => Vertex {
                slope: 0.0,
                intercept: last.value,
            },
        };
        Some(Segment {
            end: last.tick,
            line,
        })
    }

    /// Inserts the band `value ± delta` at `tick`.
    ///
    /// Returns the finalized segment when the band cannot be fitted together with the previous
    /// points; the band then starts a fresh polygon on its own.
    ///
    /// # Panics
    ///
    /// Panics if `tick` is not later than the previously inserted tick.
    pub fn insert(&mut self, tick: Tick, value: Amount, delta: f64) -> Option<Segment> {
        let point = Point {
            tick,
            value: value as f64,
            delta,
        };
        let Some(last) = self.last else {
            self.last = Some(point);
            return None;
        };
        assert!(
            tick > last.tick,
            "tick {tick} inserted after tick {}",
            last.tick
        );

        if self.upper.is_empty() {
            self.initialize(last, point);
            self.last = Some(point);
            return None;
        }

        let (lo, hi) = (point.value - delta, point.value + delta);
        let (l, r) = (self.left(), self.right());
        if compare(&r, tick, lo) == Ordering::Less || compare(&l, tick, hi) == Ordering::Greater {
            let segment = self.current();
            self.upper.clear();
            self.lower.clear();
            self.last = Some(point);
            return segment;
        }

        if compare(&r, tick, hi) == Ordering::Greater {
            let new_r = clip_back(&mut self.lower, tick, hi);
            let new_u = clip_back(&mut self.upper, tick, hi);
            self.lower.push_back(new_r);
            self.upper.push_back(new_u);
            self.upper.push_back(new_r);
        }
        if compare(&self.left(), tick, lo) == Ordering::Less {
            let new_l = clip_front(&mut self.upper, tick, lo);
            let new_d = clip_front(&mut self.lower, tick, lo);
            self.upper.push_front(new_l);
            self.lower.push_front(new_d);
            self.lower.push_front(new_l);
        }

        self.last = Some(point);
        None
    }

    fn left(&self) -> Vertex {
        self.upper[0]
    }

    fn right(&self) -> Vertex {
        self.upper[self.upper.len() - 1]
    }

    fn initialize(&mut self, p0: Point, p1: Point) {
        let lg = Vertex::through(p0.tick, p0.value + p0.delta, p1.tick, p1.value - p1.delta);
        let gg = Vertex::through(p0.tick, p0.value + p0.delta, p1.tick, p1.value + p1.delta);
        let gl = Vertex::through(p0.tick, p0.value - p0.delta, p1.tick, p1.value + p1.delta);
        let ll = Vertex::through(p0.tick, p0.value - p0.delta, p1.tick, p1.value - p1.delta);

        self.upper.clear();
        self.upper.extend([lg, gg, gl]);
        self.lower.clear();
        self.lower.extend([lg, ll, gl]);
    }
}

/// Compares `vertex.intercept` against `-tick * vertex.slope + c`.
///
/// Values closer than a relative epsilon are equal; long chains of intersections would
/// otherwise report spurious empty regions.
fn compare(vertex: &Vertex, tick: Tick, c: f64) -> Ordering {
    let lhs = vertex.intercept;
    let rhs = -f64::from(tick) * vertex.slope + c;
    let epsilon = (lhs.abs() + rhs.abs()) * 1e-16;
    if (lhs - rhs).abs() < epsilon {
        Ordering::Equal
    } else {
        lhs.total_cmp(&rhs)
    }
}

/// Intersects the edge `v1 -> v2` with the line `b = -tick * m + c`.
fn intersect(v1: &Vertex, v2: &Vertex, tick: Tick, c: f64) -> Vertex {
    let t = f64::from(tick);
    let f1 = v1.intercept + t * v1.slope;
    let f2 = v2.intercept + t * v2.slope;
    let denominator = f2 - f1;
    if denominator.abs() <= f64::EPSILON * (f1.abs() + f2.abs()) {
        return *v1;
    }
    let s = (c - f1) / denominator;
    Vertex {
        slope: v1.slope + s * (v2.slope - v1.slope),
        intercept: v1.intercept + s * (v2.intercept - v1.intercept),
    }
}

/// Removes the vertices above `b = -tick * m + c` from the `R` end of `chain`, returning the
/// point where the chain crosses the line.
fn clip_back(chain: &mut VecDeque<Vertex>, tick: Tick, c: f64) -> Vertex {
    for i in (0..chain.len() - 1).rev() {
        if compare(&chain[i], tick, c) != Ordering::Greater {
            let crossing = intersect(&chain[i + 1], &chain[i], tick, c);
            chain.truncate(i + 1);
            return crossing;
        }
    }
    let left = chain[0];
    chain.truncate(1);
    left
}

/// Removes the vertices below `b = -tick * m + c` from the `L` end of `chain`, returning the
/// point where the chain crosses the line.
fn clip_front(chain: &mut VecDeque<Vertex>, tick: Tick, c: f64) -> Vertex {
    let last = chain.len() - 1;
    for i in 1..chain.len() {
        if compare(&chain[i], tick, c) != Ordering::Less {
            let crossing = intersect(&chain[i - 1], &chain[i], tick, c);
            chain.drain(..i);
            return crossing;
        }
    }
    let right = chain[last];
    chain.drain(..last);
    right
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(polygon: &mut Polygon, points: &[(Tick, Amount)], delta: f64) -> Vec<Segment> {
        points
            .iter()
            .filter_map(|&(t, v)| polygon.insert(t, v, delta))
            .collect()
    }

    #[test]
    fn test_linear_points_then_outlier() {
        let mut polygon = Polygon::new();
        assert!(feed(&mut polygon, &[(1, 10), (2, 12), (3, 14)], 1.0).is_empty());

        let current = polygon.current().unwrap();
        assert_eq!(current.end, 3);
        assert!((current.line.evaluate(3) - 14.0).abs() <= 1.0);

        let segment = polygon.insert(4, 100, 1.0).unwrap();
        assert_eq!(segment.end, 3);
        assert!((segment.line.evaluate(1) - 10.0).abs() <= 1.0);
        assert!((segment.line.evaluate(2) - 12.0).abs() <= 1.0);
        assert!((segment.line.evaluate(3) - 14.0).abs() <= 1.0);
    }

    #[test]
    fn test_region_keeps_every_band() {
        let mut polygon = Polygon::new();
        let points: Vec<(Tick, Amount)> = (0..50)
            .map(|t| (t, i64::from(t) * 3 + [0, 1, -1, 1, 0][t as usize % 5]))
            .collect();
        assert!(feed(&mut polygon, &points, 2.0).is_empty());

        let line = polygon.current().unwrap().line;
        for &(t, v) in &points {
            assert!((line.evaluate(t) - v as f64).abs() <= 2.0 + 1e-9, "tick {t}");
        }
    }

    #[test]
    fn test_single_point_is_flat() {
        let mut polygon = Polygon::new();
        assert!(polygon.current().is_none());
        polygon.insert(7, 42, 3.0);
        let current = polygon.current().unwrap();
        assert_eq!(current.end, 7);
        assert_eq!(current.line.evaluate(100), 42.0);

        polygon.reset();
        assert!(polygon.current().is_none());
    }
}
