// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::hash_map::{Entry, HashMap};

use crate::osm::Road;
use crate::projection::{mercator, Normalization};
use crate::Graph;

/// Projected positions closer than this (in Mercator units) share a vertex.
const SNAP_EPS: f64 = 1e-7;

/// Strips with ends closer than this (in Mercator units) are dropped.
const MIN_STRIP_EXTENT: f32 = 1e-6;

/// A contiguous run of [BaseMap::indices] forming a single line strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strip {
    pub offset: usize,
    pub len: usize,
}

/// Drawable geometry of all drivable [Roads](Road), in the normalized plane.
///
/// Every way segment becomes its own line strip. Vertices are shared between
/// strips, and positions which project almost onto each other are merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseMap {
    /// Normalized vertex positions.
    pub vertices: Vec<[f32; 2]>,

    /// Indices into [BaseMap::vertices], grouped by [BaseMap::strips].
    pub indices: Vec<u32>,

    pub strips: Vec<Strip>,

    /// Parameters used to normalize [BaseMap::vertices]. Routes must be
    /// [projected](crate::projection::project_path) with the very same parameters
    /// to line up with the base map.
    pub normalization: Normalization,
}

impl BaseMap {
    /// Projects the geometry of the provided roads, resolving node references
    /// against the [Graph]. References to unknown nodes are skipped.
    pub fn build(g: &Graph, roads: &[Road]) -> Self {
        let mut b = Builder::default();
        for road in roads {
            for segment in &road.segments {
                b.add_segment(g, segment);
            }
        }

        let normalization = Normalization::fit(&b.vertices);
        for v in b.vertices.iter_mut() {
            *v = normalization.apply(v[0], v[1]);
        }

        log::debug!(
            "base map: {} vertices, {} indices in {} strips",
            b.vertices.len(),
            b.indices.len(),
            b.strips.len(),
        );

        Self {
            vertices: b.vertices,
            indices: b.indices,
            strips: b.strips,
            normalization,
        }
    }

    /// Returns true if there's nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.strips.is_empty()
    }

    /// Iterates over the indices of every line strip.
    pub fn lines(&self) -> impl Iterator<Item = &[u32]> {
        self.strips
            .iter()
            .map(|s| &self.indices[s.offset..s.offset + s.len])
    }
}

#[derive(Default)]
struct Builder {
    vertices: Vec<[f32; 2]>,
    indices: Vec<u32>,
    strips: Vec<Strip>,
    by_node: HashMap<i64, u32>,
    by_cell: HashMap<u64, u32>,
}

impl Builder {
    fn add_segment(&mut self, g: &Graph, segment: &[i64]) {
        if segment.len() < 2 {
            return;
        }

        let offset = self.indices.len();
        for &id in segment {
            if let Some(idx) = self.vertex_of(g, id) {
                self.indices.push(idx);
            }
        }

        let len = self.indices.len() - offset;
        if len >= 2 && self.extent(offset, len) >= MIN_STRIP_EXTENT {
            self.strips.push(Strip { offset, len });
        } else {
            self.indices.truncate(offset);
        }
    }

    fn vertex_of(&mut self, g: &Graph, id: i64) -> Option<u32> {
        if let Some(&idx) = self.by_node.get(&id) {
            return Some(idx);
        }

        let node = g.get_node(id)?;
        let (x, y) = mercator(node.lat, node.lon);

        let idx = match self.by_cell.entry(snap_key(x, y)) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let idx = self.vertices.len() as u32;
                self.vertices.push([x as f32, y as f32]);
                *e.insert(idx)
            }
        };

        self.by_node.insert(id, idx);
        Some(idx)
    }

    /// Distance between the first and the last vertex of a strip.
    fn extent(&self, offset: usize, len: usize) -> f32 {
        let [x0, y0] = self.vertices[self.indices[offset] as usize];
        let [x1, y1] = self.vertices[self.indices[offset + len - 1] as usize];
        (x1 - x0).hypot(y1 - y0)
    }
}

/// Packs the snap cell coordinates of a projected position into a single key,
/// keeping the lower 32 bits of each cell coordinate.
fn snap_key(x: f64, y: f64) -> u64 {
    let xi = (x / SNAP_EPS).round() as i64 as u64;
    let yi = (y / SNAP_EPS).round() as i64 as u64;
    ((xi & 0xFFFF_FFFF) << 32) | (yi & 0xFFFF_FFFF)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::project_path;
    use crate::{Edge, Node};

    fn road(segments: &[&[i64]]) -> Road {
        Road {
            name: "unnamed".to_string(),
            highway: "residential".to_string(),
            segments: segments.iter().map(|s| s.to_vec()).collect(),
        }
    }

    fn grid() -> Graph {
        let mut g = Graph::default();
        for (id, lat, lon) in [
            (1, 24.86, 67.00),
            (2, 24.86, 67.01),
            (3, 24.87, 67.01),
            (4, 24.87, 67.00),
            // Right on top of 1
            (5, 24.86, 67.00000000001),
        ] {
            g.insert_node(Node { id, lat, lon });
        }
        for (from, to) in [(1, 2), (2, 3), (3, 4)] {
            g.push_edge(from, Edge { to, cost: 1.0 });
            g.push_edge(to, Edge { to: from, cost: 1.0 });
        }
        g
    }

    #[test]
    fn strips() {
        let g = grid();
        let m = BaseMap::build(&g, &[road(&[&[1, 2, 3], &[3, 4]])]);

        assert_eq!(m.vertices.len(), 4);
        assert_eq!(
            m.strips,
            vec![Strip { offset: 0, len: 3 }, Strip { offset: 3, len: 2 }]
        );
        let lines: Vec<&[u32]> = m.lines().collect();
        assert_eq!(lines, vec![&[0u32, 1, 2][..], &[2, 3][..]]);
    }

    #[test]
    fn snapping_merges_vertices() {
        let g = grid();
        let m = BaseMap::build(&g, &[road(&[&[1, 2], &[5, 4]])]);
        assert_eq!(m.vertices.len(), 3);
        assert_eq!(m.indices, vec![0, 1, 0, 2]);
    }

    #[test]
    fn degenerate_segments_are_rolled_back() {
        let g = grid();
        let m = BaseMap::build(
            &g,
            &[road(&[
                // Single resolved point
                &[1, 99],
                // Zero extent after snapping
                &[1, 5],
                // Too short
                &[2],
                &[2, 3],
            ])],
        );

        assert_eq!(m.strips, vec![Strip { offset: 0, len: 2 }]);
        assert_eq!(m.indices.len(), 2);
        assert!(!m.is_empty());
    }

    #[test]
    fn empty() {
        let m = BaseMap::build(&Graph::default(), &[]);
        assert!(m.is_empty());
        assert!(m.vertices.is_empty());
        assert_eq!(m.normalization, Normalization::default());
    }

    #[test]
    fn vertices_are_normalized() {
        let g = grid();
        let m = BaseMap::build(&g, &[road(&[&[1, 2, 3, 4]])]);
        for v in &m.vertices {
            assert!(v[0].abs() <= 1.001 && v[1].abs() <= 1.001, "{v:?}");
        }
    }

    #[test]
    fn routes_line_up_with_the_base_map() {
        let g = grid();
        let m = BaseMap::build(&g, &[road(&[&[1, 2, 3, 4]])]);
        let route = project_path(&g, &[1, 2, 3], &m.normalization);

        assert_eq!(route.points.len(), 3);
        for (point, &idx) in route.points.iter().zip(&m.indices) {
            assert_eq!(*point, m.vertices[idx as usize]);
        }
    }
}
