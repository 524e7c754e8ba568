// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::Node;
use std::collections::HashMap;

/// Represents an [OSM way](https://wiki.openstreetmap.org/wiki/Way).
///
/// Ways only live while the graph is being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Way {
    pub id: i64,
    pub nodes: Vec<i64>,
    pub tags: HashMap<String, String>,
}

/// Union over [OSM elements](https://wiki.openstreetmap.org/wiki/Elements)
/// relevant for building a road network. Relations are not represented.
#[derive(Debug, Clone)]
pub enum Feature {
    Node(Node),
    Way(Way),
}
