// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::path::Path;

use crate::projection::{self, ProjectedPath};
use crate::{earth_distance, find_route, osm, AStarError, BaseMap, Graph, KDTree};

/// Controls how a [Router] loads its data and answers queries.
#[derive(Debug, Clone, Copy)]
pub struct RouterOptions<'a> {
    /// How the OSM source is interpreted.
    pub osm: osm::Options<'a>,

    /// Maximum number of nodes expanded by a single search.
    /// Searches are unbounded if not set.
    pub step_limit: Option<usize>,

    /// Whether to answer nearest-node queries with a [KDTree] instead of
    /// scanning all nodes. Both give equally close results.
    pub spatial_index: bool,
}

impl Default for RouterOptions<'static> {
    fn default() -> Self {
        Self {
            osm: osm::Options::default(),
            step_limit: None,
            spatial_index: true,
        }
    }
}

/// Outcome of a route query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Found,

    /// Both endpoints are valid, but the goal can't be reached from the start.
    NotFound,

    /// The node with the provided id doesn't exist.
    InvalidNode(i64),

    /// A coordinate query was made against a graph without any nodes.
    NoNearestNode,

    /// The search gave up after expanding [RouterOptions::step_limit] nodes.
    StepLimitExceeded,
}

/// Non-fatal conditions detected while answering a route query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// The node has no outgoing edges, so it's a dead end or it lies off
    /// the drivable network. The search still runs, but is likely to fail.
    OffNetworkEndpoint(i64),
}

/// Result of a route query, returned by value even when no route was found.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    /// Route from the start to the goal, inclusive. Empty unless [PathStatus::Found].
    pub node_ids: Vec<i64>,
    pub status: PathStatus,

    /// Length of the route in meters, 0 if not found.
    pub distance: f64,

    /// Great-circle distance between both endpoints in meters,
    /// 0 if any of them is unknown.
    pub straight_line_distance: f64,

    pub advisories: Vec<Advisory>,
}

impl PathResult {
    fn failed(status: PathStatus) -> Self {
        Self {
            node_ids: Vec::default(),
            status,
            distance: 0.0,
            straight_line_distance: 0.0,
            advisories: Vec::default(),
        }
    }

    /// Returns true if a route was found.
    pub fn found(&self) -> bool {
        self.status == PathStatus::Found
    }
}

/// Router owns the road network graph with everything derived from it,
/// and answers queries against it.
///
/// The graph must be loaded with [Router::build_graph] (or [Router::build_graph_from_buffer])
/// before querying - until then, every query fails as if the graph was empty.
/// Loading happens once; all other methods take `&self`, so a loaded router may be
/// shared between threads.
#[derive(Debug)]
pub struct Router<'a> {
    options: RouterOptions<'a>,
    graph: Graph,
    index: Option<KDTree>,
    base_map: BaseMap,
    loaded: bool,
}

impl<'a> Router<'a> {
    /// Creates a router with an empty graph.
    pub fn new(options: RouterOptions<'a>) -> Self {
        Self {
            options,
            graph: Graph::default(),
            index: None,
            base_map: BaseMap::default(),
            loaded: false,
        }
    }

    /// Loads the road network from an OSM file.
    ///
    /// Does nothing if a graph was already loaded. On error, the router is left with
    /// an empty graph, and loading may be retried.
    pub fn build_graph<P: AsRef<Path>>(&mut self, path: P) -> Result<(), osm::Error> {
        if self.loaded {
            log::debug!("graph already loaded, ignoring {}", path.as_ref().display());
            return Ok(());
        }

        let result = osm::load_from_file(&self.options.osm, path.as_ref());
        self.install(result)
    }

    /// Loads the road network from in-memory OSM data.
    /// Behaves just like [Router::build_graph].
    pub fn build_graph_from_buffer(&mut self, data: &[u8]) -> Result<(), osm::Error> {
        if self.loaded {
            log::debug!("graph already loaded, ignoring provided buffer");
            return Ok(());
        }

        let result = osm::load_from_buffer(&self.options.osm, data);
        self.install(result)
    }

    fn install(&mut self, result: Result<osm::Extract, osm::Error>) -> Result<(), osm::Error> {
        let extract = match result {
            Ok(extract) => extract,
            Err(e) => {
                log::error!("failed to build the graph: {e}");
                *self = Self::new(self.options);
                return Err(e);
            }
        };

        self.index = if self.options.spatial_index {
            KDTree::from_graph(&extract.graph)
        } else {
            None
        };
        self.base_map = BaseMap::build(&extract.graph, &extract.roads);
        self.graph = extract.graph;
        self.loaded = true;
        Ok(())
    }

    /// Returns true once a graph was successfully loaded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Returns the loaded road network.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Returns the drawable geometry of the loaded road network.
    pub fn base_map(&self) -> &BaseMap {
        &self.base_map
    }

    /// Returns the position of a node, as (lat, lon).
    pub fn node_coordinates(&self, id: i64) -> Option<(f64, f64)> {
        self.graph.get_node(id).map(|n| (n.lat, n.lon))
    }

    /// Returns the id of the road-network node closest to the provided position,
    /// or `None` if there are no nodes.
    pub fn nearest_node(&self, lat: f64, lon: f64) -> Option<i64> {
        match self.index {
            Some(ref index) => Some(index.find_nearest_node(lat, lon).id),
            None => self.graph.find_nearest_node(lat, lon).map(|n| n.id),
        }
    }

    /// Finds the shortest route between two nodes.
    pub fn find_path(&self, start: i64, goal: i64) -> PathResult {
        let endpoints = (self.graph.get_node(start), self.graph.get_node(goal));
        let (start_node, goal_node) = match endpoints {
            (Some(s), Some(g)) => (s, g),
            (s, _) => {
                let invalid = if s.is_none() { start } else { goal };
                log::warn!("invalid node id {invalid}: not found in the loaded graph");
                return PathResult::failed(PathStatus::InvalidNode(invalid));
            }
        };

        let mut result = PathResult::failed(PathStatus::NotFound);
        result.straight_line_distance =
            earth_distance(start_node.lat, start_node.lon, goal_node.lat, goal_node.lon);

        for (id, role) in [(start, "start"), (goal, "end")] {
            if self.graph.get_edges(id).is_empty() {
                log::warn!(
                    "{role} node {id} has no outgoing edges \
                    (not part of the drivable road network)"
                );
                result.advisories.push(Advisory::OffNetworkEndpoint(id));
            }
        }

        let step_limit = self.options.step_limit.unwrap_or(usize::MAX);
        match find_route(&self.graph, start, goal, step_limit) {
            Ok(route) if route.is_empty() => {
                if result.advisories.is_empty() {
                    log::info!(
                        "no route from {start} to {goal}: \
                        nodes are in disconnected parts of the road network"
                    );
                } else {
                    log::info!(
                        "no route from {start} to {goal}: \
                        an endpoint is not on the drivable road network"
                    );
                }
            }

            Ok(route) => {
                result.distance = self.graph.route_length(&route).unwrap_or_default();
                result.node_ids = route;
                result.status = PathStatus::Found;
            }

            Err(AStarError::InvalidReference(id)) => result.status = PathStatus::InvalidNode(id),

            Err(AStarError::StepLimitExceeded) => {
                log::warn!(
                    "gave up searching for a route from {start} to {goal} after {step_limit} steps"
                );
                result.status = PathStatus::StepLimitExceeded;
            }
        }

        result
    }

    /// Finds the shortest route between the road-network nodes closest to the provided positions.
    pub fn find_path_by_coords(
        &self,
        start_lat: f64,
        start_lon: f64,
        goal_lat: f64,
        goal_lon: f64,
    ) -> PathResult {
        let start = self.nearest_node(start_lat, start_lon);
        let goal = self.nearest_node(goal_lat, goal_lon);

        match (start, goal) {
            (Some(start), Some(goal)) => {
                log::debug!("snapped query positions to nodes {start} and {goal}");
                self.find_path(start, goal)
            }
            _ => {
                log::warn!("could not find any nodes near the provided positions");
                PathResult::failed(PathStatus::NoNearestNode)
            }
        }
    }

    /// Projects a route onto the plane of the [BaseMap], so that both line up.
    pub fn project_path(&self, route: &[i64]) -> ProjectedPath {
        projection::project_path(&self.graph, route, &self.base_map.normalization)
    }
}
