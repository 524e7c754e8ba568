// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{earth_distance, Edge, Node};
use std::collections::btree_map::{BTreeMap, Entry};

#[derive(Debug, Clone, PartialEq)]
struct NodeEntry {
    node: Node,
    edges: Vec<Edge>,

    /// Set once any edge (incoming or outgoing) touches this node.
    routable: bool,
}

/// Represents a drivable OpenStreetMap network as a set of [Nodes](Node)
/// and [Edges](Edge) between them.
///
/// A graph is assembled by [GraphBuilder](crate::osm) and is read-only afterwards.
/// Besides the nodes of the road network, it may contain off-network nodes
/// (e.g. points of footways or stand-alone points of interest), which are
/// known by position only and have no edges.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Graph(BTreeMap<i64, NodeEntry>);

impl Graph {
    /// Returns the number of known nodes in the graph, including off-network nodes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the graph contains no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over all [Nodes](Node) in the graph.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.0.values().map(|entry| &entry.node)
    }

    /// Returns an iterator over [Nodes](Node) touched by at least one drivable way.
    pub fn road_network(&self) -> impl Iterator<Item = &Node> {
        self.0
            .values()
            .filter(|entry| entry.routable)
            .map(|entry| &entry.node)
    }

    /// Returns the number of road-network nodes.
    pub fn road_network_len(&self) -> usize {
        self.0.values().filter(|entry| entry.routable).count()
    }

    /// Returns the total number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.0.values().map(|entry| entry.edges.len()).sum()
    }

    /// Retrieves a [Node] with the provided id.
    pub fn get_node(&self, id: i64) -> Option<Node> {
        self.0.get(&id).map(|entry| entry.node)
    }

    /// Checks whether a node with the provided id is part of the road network,
    /// that is, whether it has any incoming or outgoing edge.
    pub fn is_routable(&self, id: i64) -> bool {
        self.0.get(&id).is_some_and(|entry| entry.routable)
    }

    /// Gets all outgoing [Edges](Edge) from a node with a given id.
    pub fn get_edges(&self, from_id: i64) -> &[Edge] {
        self.0
            .get(&from_id)
            .map(|entry| entry.edges.as_slice())
            .unwrap_or_default()
    }

    /// Gets the cost of the cheapest [Edge] from one node to another.
    /// If such an edge doesn't exist, returns [f64::INFINITY].
    pub fn get_edge(&self, from_id: i64, to_id: i64) -> f64 {
        self.get_edges(from_id)
            .iter()
            .filter(|edge| edge.to == to_id)
            .map(|edge| edge.cost)
            .fold(f64::INFINITY, f64::min)
    }

    /// Sums the costs of consecutive hops of a node sequence.
    ///
    /// Returns `None` if any pair of consecutive nodes isn't connected by an edge.
    /// An empty or single-node sequence has a length of zero.
    pub fn route_length(&self, route: &[i64]) -> Option<f64> {
        route.windows(2).try_fold(0.0, |total, pair| {
            let cost = self.get_edge(pair[0], pair[1]);
            if cost.is_finite() {
                Some(total + cost)
            } else {
                None
            }
        })
    }

    /// Finds the closest road-network [Node] to the given position.
    ///
    /// If the graph has no road network at all, every known node is considered instead.
    /// Returns `None` only for a graph without any nodes.
    ///
    /// This function requires computing the distance to every [Node] in the graph,
    /// and is not suitable for repeated queries over large graphs - see [KDTree](crate::KDTree).
    pub fn find_nearest_node(&self, lat: f64, lon: f64) -> Option<Node> {
        nearest_of(self.road_network(), lat, lon).or_else(|| {
            if !self.is_empty() {
                log::debug!("graph has no road network, falling back to all known nodes");
            }
            nearest_of(self.iter(), lat, lon)
        })
    }

    /// Records a [Node]. Re-inserting an existing id updates its position
    /// only if it has no edges yet, as moving a node would invalidate edge costs.
    pub(crate) fn insert_node(&mut self, node: Node) {
        assert_ne!(node.id, 0);

        match self.0.entry(node.id) {
            Entry::Vacant(e) => {
                e.insert(NodeEntry {
                    node,
                    edges: Vec::default(),
                    routable: false,
                });
            }
            Entry::Occupied(mut e) => {
                if !e.get().routable {
                    e.get_mut().node = node;
                }
            }
        }
    }

    /// Appends an [Edge] from a node with a given id, marking both ends as routable.
    ///
    /// Edges whose either end is unknown are dropped.
    pub(crate) fn push_edge(&mut self, from_id: i64, edge: Edge) {
        if !self.0.contains_key(&edge.to) {
            return;
        }

        if let Some(entry) = self.0.get_mut(&from_id) {
            entry.edges.push(edge);
            entry.routable = true;
        } else {
            return;
        }

        if let Some(entry) = self.0.get_mut(&edge.to) {
            entry.routable = true;
        }
    }
}

fn nearest_of<'a, I: Iterator<Item = &'a Node>>(candidates: I, lat: f64, lon: f64) -> Option<Node> {
    candidates
        .map(|nd| (earth_distance(lat, lon, nd.lat, nd.lon), *nd))
        .min_by(|(a_dist, _), (b_dist, _)| a_dist.total_cmp(b_dist))
        .map(|(_, nd)| nd)
}
