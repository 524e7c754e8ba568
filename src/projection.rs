// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Planar projection of geographic positions, shared by the [base map](crate::BaseMap)
//! and route overlays.
//!
//! Positions are projected with the spherical
//! [Web Mercator](https://en.wikipedia.org/wiki/Web_Mercator_projection) formulas,
//! without scaling by the Earth radius, and then normalized with a [Normalization]
//! into the [-1, 1] range. Route overlays only line up with the base map when both
//! go through the very same [Normalization].

use crate::Graph;

/// Projects a lat-lon position (in degrees) onto the plane.
///
/// `x` is the longitude in radians, `y` is the
/// [inverse Gudermannian](https://en.wikipedia.org/wiki/Gudermannian_function)
/// of the latitude.
pub fn mercator(lat: f64, lon: f64) -> (f64, f64) {
    let x = lon.to_radians();
    let y = lat.to_radians().sin().atanh();
    (x, y)
}

/// Centering and scaling applied to projected positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub center_x: f32,
    pub center_y: f32,

    /// Extent of the projected area mapped onto the [-1, 1] range. Never zero.
    pub scale: f32,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            scale: 1.0,
        }
    }
}

impl Normalization {
    /// Computes the normalization which centers the given projected points, ignoring
    /// outliers: the central 90% of coordinates (5th to 95th percentile on each axis)
    /// are fit into the [-1, 1] range, preserving the aspect ratio.
    pub fn fit(points: &[[f32; 2]]) -> Self {
        if points.is_empty() {
            return Self::default();
        }

        let mut xs: Vec<f32> = points.iter().map(|p| p[0]).collect();
        let mut ys: Vec<f32> = points.iter().map(|p| p[1]).collect();

        let x_lo = percentile(&mut xs, 0.05);
        let x_hi = percentile(&mut xs, 0.95);
        let y_lo = percentile(&mut ys, 0.05);
        let y_hi = percentile(&mut ys, 0.95);

        let scale = (x_hi - x_lo).max(y_hi - y_lo);

        Self {
            center_x: (x_lo + x_hi) * 0.5,
            center_y: (y_lo + y_hi) * 0.5,
            scale: if scale == 0.0 { 1.0 } else { scale },
        }
    }

    /// Normalizes an already projected point.
    #[inline]
    pub fn apply(&self, x: f32, y: f32) -> [f32; 2] {
        let factor = 2.0 / self.scale;
        [(x - self.center_x) * factor, (y - self.center_y) * factor]
    }

    /// Projects and normalizes a lat-lon position.
    #[inline]
    pub fn project(&self, lat: f64, lon: f64) -> [f32; 2] {
        let (x, y) = mercator(lat, lon);
        self.apply(x as f32, y as f32)
    }
}

/// Element `floor(p * (len - 1))` of the sorted values. Reorders `values`.
fn percentile(values: &mut [f32], p: f64) -> f32 {
    let idx = (p * (values.len() - 1) as f64).floor() as usize;
    *values.select_nth_unstable_by(idx, f32::total_cmp).1
}

/// Route geometry ready to be drawn as a single line strip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectedPath {
    /// Normalized positions of route nodes, in route order.
    pub points: Vec<[f32; 2]>,

    /// Line strip indices into [ProjectedPath::points]: always `0..points.len()`.
    pub indices: Vec<u32>,
}

/// Projects a route (sequence of node ids) with the provided [Normalization].
///
/// Nodes missing from the graph are skipped, so the result may have fewer points
/// than the route has nodes.
pub fn project_path(g: &Graph, route: &[i64], normalization: &Normalization) -> ProjectedPath {
    let points: Vec<[f32; 2]> = route
        .iter()
        .filter_map(|&id| match g.get_node(id) {
            Some(node) => Some(normalization.project(node.lat, node.lon)),
            None => {
                log::debug!("skipping unknown node {id} in projected route");
                None
            }
        })
        .collect();

    let indices = (0..points.len() as u32).collect();
    ProjectedPath { points, indices }
}
