// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{earth_distance, Graph, Node, EARTH_RADIUS};

/// KDTree implements the [k-d tree data structure](https://en.wikipedia.org/wiki/K-d_tree),
/// which can be used to speed up nearest-neighbor search for large datasets.
/// [Graph::find_nearest_node] computes the distance to every node of the graph,
/// while the tree only visits branches which may contain a closer node.
///
/// Nodes are split alternately by latitude and longitude, and branches are pruned
/// with exact great-circle lower bounds: the distance along a meridian to the splitting
/// parallel, or the cross-track distance to the great circle through the splitting
/// meridian. As a consequence, the returned node is always at the same [earth_distance]
/// as the one returned by [Graph::find_nearest_node]. Data spanning the ante meridian
/// (180°/-180° longitude) is not supported.
#[derive(Debug, Clone)]
pub struct KDTree {
    pivot: Node,
    left: Option<Box<KDTree>>,
    right: Option<Box<KDTree>>,
}

impl KDTree {
    /// Finds the closest [Node] to the given position.
    pub fn find_nearest_node(&self, lat: f64, lon: f64) -> Node {
        self.find_nearest_node_impl(lat, lon, false).0
    }

    fn find_nearest_node_impl(&self, lat: f64, lon: f64, lon_divides: bool) -> (Node, f64) {
        // Start by assuming that pivot is the closest
        let mut best = self.pivot;
        let mut best_dist = earth_distance(lat, lon, best.lat, best.lon);

        // Select which branch to recurse into first
        let first_left = if lon_divides {
            lon < best.lon
        } else {
            lat < best.lat
        };
        let (first, second) = if first_left {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        };

        if let Some(ref branch) = first {
            let (alt, alt_dist) = branch.find_nearest_node_impl(lat, lon, !lon_divides);
            if alt_dist < best_dist {
                best = alt;
                best_dist = alt_dist;
            }
        }

        // A closer node is possible in the second branch if and only if
        // the splitting axis is closer than the current best candidate.
        if let Some(ref branch) = second {
            if self.distance_to_axis(lat, lon, lon_divides) < best_dist {
                let (alt, alt_dist) = branch.find_nearest_node_impl(lat, lon, !lon_divides);
                if alt_dist < best_dist {
                    best = alt;
                    best_dist = alt_dist;
                }
            }
        }

        return (best, best_dist);
    }

    fn distance_to_axis(&self, lat: f64, lon: f64, lon_divides: bool) -> f64 {
        if lon_divides {
            // Distance to the great circle through the splitting meridian
            let dlon = (lon - self.pivot.lon).to_radians();
            let sin_d = (dlon.sin() * lat.to_radians().cos()).abs().min(1.0);
            EARTH_RADIUS * sin_d.asin()
        } else {
            earth_distance(lat, lon, self.pivot.lat, lon)
        }
    }

    /// Builds a k-d tree over the nodes eligible for nearest-node queries:
    /// the road network, or all known nodes if the graph has no road network.
    /// Returns `None` for an empty graph.
    pub fn from_graph(g: &Graph) -> Option<Self> {
        let mut nodes = g.road_network().cloned().collect::<Vec<_>>();
        if nodes.is_empty() {
            nodes = g.iter().cloned().collect();
        }
        Self::build(nodes.as_mut_slice())
    }

    /// Builds a k-d tree from a mutable slice of [Nodes](Node). Nodes will be reordered
    /// in the slice to facilitate building the tree.
    pub fn build(nodes: &mut [Node]) -> Option<Self> {
        Self::build_impl(nodes, false)
    }

    fn build_impl(nodes: &mut [Node], lon_divides: bool) -> Option<Self> {
        match nodes.len() {
            0 => None,
            1 => Some(Self {
                pivot: nodes[0],
                left: None,
                right: None,
            }),
            _ => {
                if lon_divides {
                    nodes.sort_by(|a, b| a.lon.total_cmp(&b.lon));
                } else {
                    nodes.sort_by(|a, b| a.lat.total_cmp(&b.lat));
                }
                let median = nodes.len() / 2;
                let pivot = nodes[median];
                let (left, right_and_pivot) = nodes.split_at_mut(median);
                let right = &mut right_and_pivot[1..];
                Some(Self {
                    pivot,
                    left: Self::build_impl(left, !lon_divides).map(Box::new),
                    right: Self::build_impl(right, !lon_divides).map(Box::new),
                })
            }
        }
    }
}
