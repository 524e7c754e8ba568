// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

/// Describes which OSM ways end up in a [Graph](crate::Graph), and in which directions
/// they may be traversed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile<'a> {
    /// Human readable name of the routing profile,
    /// customary the most specific [access tag](https://wiki.openstreetmap.org/wiki/Key:access).
    /// Only used for diagnostics.
    pub name: &'a str,

    /// [highway=*](https://wiki.openstreetmap.org/wiki/Key:highway) values of ways
    /// which can be used for routing. Ways with any other highway value, or without
    /// the highway tag at all, are never routable.
    pub highways: &'a [&'a str],

    /// highway=* values which are never routable, even if also listed in [Profile::highways].
    pub excluded_highways: &'a [&'a str],

    /// OSM [access tags](https://wiki.openstreetmap.org/wiki/Key:access#Land-based_transportation)
    /// which, when set to "no", exclude a way from routing.
    pub access: &'a [&'a str],
}

/// Directions in which a way may be traversed, relative to the order of its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Two-way traffic.
    Both,

    /// Only in the order of way nodes.
    Forward,

    /// Only against the order of way nodes.
    Reverse,
}

impl Direction {
    /// Returns whether the way may be traversed forward (first value)
    /// and backwards (second value).
    pub fn as_pair(self) -> (bool, bool) {
        match self {
            Self::Both => (true, true),
            Self::Forward => (true, false),
            Self::Reverse => (false, true),
        }
    }
}

/// Outcome of [Profile::classify].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub included: bool,
    pub direction: Direction,
}

impl<'a> Profile<'a> {
    /// Decides whether a way with the given tags is part of the routing graph,
    /// and in which direction(s) it may be traversed.
    ///
    /// Direction is reported even for excluded ways.
    pub fn classify(&self, tags: &HashMap<String, String>) -> Classification {
        Classification {
            included: self.is_drivable_class(tags) && self.is_allowed(tags),
            direction: self.way_direction(tags),
        }
    }

    /// Checks the highway=* tag of a way against [Profile::highways] and
    /// [Profile::excluded_highways]. Unknown values are never drivable.
    pub fn is_drivable_class(&self, tags: &HashMap<String, String>) -> bool {
        match tags.get("highway").map(|v| v.as_str()) {
            None => false,
            Some(highway) if self.excluded_highways.contains(&highway) => false,
            Some(highway) => self.highways.contains(&highway),
        }
    }

    /// Checks that none of the [Profile::access] tags is set to "no".
    pub fn is_allowed(&self, tags: &HashMap<String, String>) -> bool {
        !self
            .access
            .iter()
            .any(|&key| tags.get(key).map(|v| v.as_str()) == Some("no"))
    }

    /// Figures out the travel [Direction] of a way.
    ///
    /// Roundabouts are always one-way in the order of their nodes,
    /// disregarding any oneway=* tag. Otherwise, `oneway=yes|true|1` makes the way
    /// forward-only and `oneway=-1` reverse-only.
    pub fn way_direction(&self, tags: &HashMap<String, String>) -> Direction {
        if tags.get("junction").map(|v| v.as_str()) == Some("roundabout") {
            return Direction::Forward;
        }

        match tags.get("oneway").map(|v| v.as_str()).unwrap_or("") {
            "yes" | "true" | "1" => Direction::Forward,
            "-1" => Direction::Reverse,
            _ => Direction::Both,
        }
    }
}

/// Routing [Profile] for cars, with all roads carrying motor vehicle traffic
/// and pedestrian and cycle infrastructure explicitly ruled out.
pub const CAR_PROFILE: Profile = Profile {
    name: "motorcar",
    highways: &[
        "motorway",
        "motorway_link",
        "trunk",
        "trunk_link",
        "primary",
        "primary_link",
        "secondary",
        "secondary_link",
        "tertiary",
        "tertiary_link",
        "unclassified",
        "residential",
        "service",
        "living_street",
    ],
    excluded_highways: &[
        "footway",
        "path",
        "cycleway",
        "steps",
        "pedestrian",
        "track",
        "bridleway",
        "corridor",
    ],
    access: &["access", "motor_vehicle"],
};
