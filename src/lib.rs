// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Drivable road network extraction and shortest-path search over
//! [OpenStreetMap](https://www.openstreetmap.org/) data.
//!
//! OSM ways are classified for motor vehicle traffic, turned into a directed graph
//! weighted by great-circle distance (in meters), and queried with A*. Nearest-node
//! lookups snap arbitrary positions onto the road network, and found routes can be
//! projected into the same normalized plane as the [base map](crate::BaseMap)
//! so that both can be drawn on top of each other.
//!
//! # Example
//!
//! ```no_run
//! let mut router = drivegraph::Router::new(drivegraph::RouterOptions::default());
//! router
//!     .build_graph("path/to/karachi.osm")
//!     .expect("failed to load karachi.osm");
//!
//! let result = router.find_path_by_coords(24.8607, 67.0011, 24.8931, 67.0281);
//! if result.found() {
//!     println!("Route: {:?} ({:.3} km)", result.node_ids, result.distance / 1000.0);
//! }
//! ```

mod astar;
mod basemap;
mod distance;
mod graph;
mod kd;
pub mod osm;
pub mod projection;
mod router;

pub use astar::{find_route, AStarError};
pub use basemap::{BaseMap, Strip};
pub use distance::{earth_distance, EARTH_RADIUS};
pub use graph::Graph;
pub use kd::KDTree;
pub use router::{Advisory, PathResult, PathStatus, Router, RouterOptions};

/// Represents a point of the road network, an element of the [Graph].
///
/// Nodes with `id == 0` are rejected by the OSM reader and never enter a [Graph].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
}

/// Represents an outgoing (one-way) connection from a specific [Node].
///
/// `cost` is the great-circle distance between both ends, in meters,
/// and thus never less than the crow-flies distance between the two nodes.
/// `to` always refers to a node which exists in the [Graph].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub to: i64,
    pub cost: f64,
}
