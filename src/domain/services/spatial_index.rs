//! Bucket grid over lon/lat degrees.
//!
//! Queries visit cells ring by ring around the query cell and stop once a
//! great-circle lower bound for every unvisited ring exceeds the best
//! candidate, so answers match a plain linear scan exactly: the smallest
//! distance wins and ties go to the lowest insertion index.

use crate::domain::model::LonLat;
use crate::domain::services::geo::{haversine_meters, EARTH_RADIUS_METERS};
use std::collections::HashMap;
use std::f64::consts::PI;

/// 每格約 550 公尺緯度
pub const DEFAULT_CELL_DEGREES: f64 = 0.005;

// 浮點誤差容忍度
const BOUND_SLACK_METERS: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct GridIndex {
    cell_deg: f64,
    buckets: HashMap<(i64, i64), Vec<usize>>,
    points: Vec<LonLat>,
    min_cell: (i64, i64),
    max_cell: (i64, i64),
    min_lon: f64,
    max_lon: f64,
    max_abs_lat: f64,
}

impl GridIndex {
    pub fn new(cell_deg: f64) -> Self {
        let cell_deg = if cell_deg.is_finite() && cell_deg > 0.0 {
            cell_deg
        } else {
            DEFAULT_CELL_DEGREES
        };
        Self {
            cell_deg,
            buckets: HashMap::new(),
            points: Vec::new(),
            min_cell: (i64::MAX, i64::MAX),
            max_cell: (i64::MIN, i64::MIN),
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            max_abs_lat: 0.0,
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = LonLat>, cell_deg: f64) -> Self {
        let mut index = Self::new(cell_deg);
        for p in points {
            index.insert(p);
        }
        index
    }

    /// 加入一點並回傳其插入索引
    pub fn insert(&mut self, p: LonLat) -> usize {
        let idx = self.points.len();
        let cell = self.cell_of(p);
        self.buckets.entry(cell).or_default().push(idx);
        self.points.push(p);

        self.min_cell = (self.min_cell.0.min(cell.0), self.min_cell.1.min(cell.1));
        self.max_cell = (self.max_cell.0.max(cell.0), self.max_cell.1.max(cell.1));
        self.min_lon = self.min_lon.min(p.lon);
        self.max_lon = self.max_lon.max(p.lon);
        self.max_abs_lat = self.max_abs_lat.max(p.lat.abs());
        idx
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 距離 `q` 最近的點，回傳 `(index, distance_meters)`
    pub fn nearest(&self, q: LonLat) -> Option<(usize, f64)> {
        if self.is_empty() {
            return None;
        }
        if self.spans_antimeridian(q) {
            return self.nearest_linear(q);
        }

        let qc = self.cell_of(q);
        let max_ring = self.max_ring(qc);
        let mut best: Option<(usize, f64)> = None;

        for ring in 0..=max_ring {
            self.visit_ring(qc, ring, |idx| {
                let d = haversine_meters(q, self.points[idx]);
                best = match best {
                    Some((bi, bd)) if bd < d || (bd == d && bi < idx) => Some((bi, bd)),
                    _ => Some((idx, d)),
                };
            });

            if let Some((_, bd)) = best {
                if bd + BOUND_SLACK_METERS < self.ring_lower_bound(ring, q) {
                    break;
                }
            }
        }

        best
    }

    /// 距離嚴格小於 `radius_meters` 的點中，插入索引最小者
    pub fn first_within(&self, q: LonLat, radius_meters: f64) -> Option<usize> {
        if self.is_empty() || radius_meters <= 0.0 {
            return None;
        }
        if self.spans_antimeridian(q) {
            return self
                .points
                .iter()
                .position(|p| haversine_meters(q, *p) < radius_meters);
        }

        let qc = self.cell_of(q);
        let max_ring = self.max_ring(qc);
        let mut found: Option<usize> = None;

        for ring in 0..=max_ring {
            self.visit_ring(qc, ring, |idx| {
                if found.is_some_and(|f| f < idx) {
                    return;
                }
                if haversine_meters(q, self.points[idx]) < radius_meters {
                    found = Some(idx);
                }
            });

            if self.ring_lower_bound(ring, q) > radius_meters + BOUND_SLACK_METERS {
                break;
            }
        }

        found
    }

    fn nearest_linear(&self, q: LonLat) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, p) in self.points.iter().enumerate() {
            let d = haversine_meters(q, *p);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((idx, d));
            }
        }
        best
    }

    fn cell_of(&self, p: LonLat) -> (i64, i64) {
        (
            (p.lon / self.cell_deg).floor() as i64,
            (p.lat / self.cell_deg).floor() as i64,
        )
    }

    fn max_ring(&self, qc: (i64, i64)) -> i64 {
        [
            (qc.0 - self.min_cell.0).abs(),
            (qc.0 - self.max_cell.0).abs(),
            (qc.1 - self.min_cell.1).abs(),
            (qc.1 - self.max_cell.1).abs(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    // 經度跨度超過半圈時環狀下界不成立，改用線性掃描
    fn spans_antimeridian(&self, q: LonLat) -> bool {
        self.max_lon.max(q.lon) - self.min_lon.min(q.lon) > 180.0
    }

    fn visit_ring<F: FnMut(usize)>(&self, qc: (i64, i64), ring: i64, mut f: F) {
        let mut visit_cell = |x: i64, y: i64| {
            if x < self.min_cell.0 || x > self.max_cell.0 || y < self.min_cell.1 || y > self.max_cell.1 {
                return;
            }
            if let Some(bucket) = self.buckets.get(&(x, y)) {
                for &idx in bucket {
                    f(idx);
                }
            }
        };

        if ring == 0 {
            visit_cell(qc.0, qc.1);
            return;
        }

        for x in (qc.0 - ring)..=(qc.0 + ring) {
            visit_cell(x, qc.1 - ring);
            visit_cell(x, qc.1 + ring);
        }
        for y in (qc.1 - ring + 1)..=(qc.1 + ring - 1) {
            visit_cell(qc.0 - ring, y);
            visit_cell(qc.0 + ring, y);
        }
    }

    /// `0..=ring` 以外的點與 `q` 的距離至少為此值
    fn ring_lower_bound(&self, ring: i64, q: LonLat) -> f64 {
        let a = (ring as f64 * self.cell_deg).to_radians().min(PI);
        let cos_max = self.max_abs_lat.max(q.lat.abs()).to_radians().cos().max(0.0);

        let lat_bound = EARTH_RADIUS_METERS * a;
        let lon_bound = 2.0 * EARTH_RADIUS_METERS * (cos_max * (a / 2.0).sin()).min(1.0).asin();
        lat_bound.min(lon_bound)
    }
}
