// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use crate::{earth_distance, Edge, Graph, Node};

use super::{model, Extract, Options, Road};

/// Name given to roads without the name=* tag.
const UNNAMED_ROAD: &str = "unnamed";

/// Helper object which owns all state related to converting
/// [OSM features](super::model::Feature) into a [Graph].
///
/// The graph under construction is never exposed - it is handed out
/// only once all features were consumed, by [GraphBuilder::add_features].
pub(super) struct GraphBuilder<'a> {
    g: Graph,
    options: &'a Options<'a>,
    roads: BTreeMap<(String, String), Road>,
    ignore_bbox: bool,
    included_ways: usize,
    excluded_ways: usize,
    skipped_segments: usize,
}

impl<'a> GraphBuilder<'a> {
    /// Create a new, empty graph builder.
    pub(super) fn new(options: &'a Options<'a>) -> Self {
        let ignore_bbox =
            options.bbox.iter().all(|&x| x == 0.0) || options.bbox.iter().any(|x| !x.is_finite());

        if ignore_bbox && options.bbox.iter().any(|x| !x.is_finite()) {
            log::warn!("ignoring non-finite bounding box {:?}", options.bbox);
        }

        Self {
            g: Graph::default(),
            options,
            roads: BTreeMap::default(),
            ignore_bbox,
            included_ways: 0,
            excluded_ways: 0,
            skipped_segments: 0,
        }
    }

    /// Consumes all features from the provided source and returns the finished graph.
    ///
    /// The first error reported by the source aborts the build,
    /// and everything built so far is discarded.
    pub(super) fn add_features<E, I>(mut self, features: I) -> Result<Extract, E>
    where
        I: IntoIterator<Item = Result<model::Feature, E>>,
    {
        for f in features {
            self.add_feature(f?);
        }
        Ok(self.finish())
    }

    fn finish(self) -> Extract {
        log::info!(
            "loaded {} nodes ({} on the road network) and {} edges from {} ways \
            ({} ways excluded by the {} profile, {} segments with unknown nodes)",
            self.g.len(),
            self.g.road_network_len(),
            self.g.edge_count(),
            self.included_ways,
            self.excluded_ways,
            self.options.profile.name,
            self.skipped_segments,
        );

        Extract {
            graph: self.g,
            roads: self.roads.into_values().collect(),
        }
    }

    fn add_feature(&mut self, f: model::Feature) {
        match f {
            model::Feature::Node(n) => self.add_node(n),
            model::Feature::Way(w) => self.add_way(w),
        }
    }

    fn add_node(&mut self, n: Node) {
        if self.is_in_bbox(n.lat, n.lon) {
            self.g.insert_node(n);
        }
    }

    fn is_in_bbox(&self, lat: f64, lon: f64) -> bool {
        if self.ignore_bbox {
            return true;
        }
        let [min_lon, min_lat, max_lon, max_lat] = self.options.bbox;
        lat >= min_lat && lat <= max_lat && lon >= min_lon && lon <= max_lon
    }

    fn add_way(&mut self, w: model::Way) {
        let profile = self.options.profile;

        if profile.is_drivable_class(&w.tags) {
            self.record_road(&w);
        }

        let class = profile.classify(&w.tags);
        if !class.included {
            self.excluded_ways += 1;
            return;
        }

        let (forward, backward) = class.direction.as_pair();
        self.create_edges(w.id, &w.nodes, forward, backward);
        self.included_ways += 1;
    }

    /// Connects every pair of consecutive way nodes. Pairs with an unknown
    /// node are skipped, without affecting the remaining pairs.
    fn create_edges(&mut self, way_id: i64, nodes: &[i64], forward: bool, backward: bool) {
        debug_assert!(forward || backward);

        for pair in nodes.windows(2) {
            let (left, right) = match (self.g.get_node(pair[0]), self.g.get_node(pair[1])) {
                (Some(left), Some(right)) => (left, right),
                _ => {
                    log::debug!(
                        "way {way_id}: skipping segment {} - {} with an unknown node",
                        pair[0],
                        pair[1],
                    );
                    self.skipped_segments += 1;
                    continue;
                }
            };

            let cost = earth_distance(left.lat, left.lon, right.lat, right.lon);

            if forward {
                self.g.push_edge(left.id, Edge { to: right.id, cost });
            }
            if backward {
                self.g.push_edge(right.id, Edge { to: left.id, cost });
            }
        }
    }

    /// Remembers the geometry of a way for drawing, merged with other ways
    /// of the same name and highway class.
    fn record_road(&mut self, w: &model::Way) {
        if w.nodes.len() < 2 {
            return;
        }

        let name = w
            .tags
            .get("name")
            .map(|v| v.as_str())
            .unwrap_or(UNNAMED_ROAD);
        let highway = w.tags.get("highway").map(|v| v.as_str()).unwrap_or("");

        self.roads
            .entry((name.to_string(), highway.to_string()))
            .or_insert_with(|| Road {
                name: name.to_string(),
                highway: highway.to_string(),
                segments: Vec::default(),
            })
            .segments
            .push(w.nodes.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::model::{Feature, Way};
    use super::*;
    use crate::osm::{FileFormat, CAR_PROFILE};

    macro_rules! tags {
        {$( $k:literal : $v:expr ),*} => {
            HashMap::from_iter([ $( ($k.to_string(), $v.to_string()) ),* ])
        };
    }

    macro_rules! assert_edge {
        ($graph:expr, $from:expr, $to:expr) => {
            assert!($graph.get_edge($from, $to).is_finite());
        };
    }

    macro_rules! assert_no_edge {
        ($graph:expr, $from:expr, $to:expr) => {
            assert!($graph.get_edge($from, $to).is_infinite());
        };
    }

    const OPTIONS: Options = Options {
        profile: &CAR_PROFILE,
        file_format: FileFormat::Xml,
        bbox: [0.0; 4],
    };

    fn a_b_c() -> Vec<Feature> {
        vec![
            Feature::Node(Node {
                id: 1,
                lat: 0.0,
                lon: 0.0,
            }),
            Feature::Node(Node {
                id: 2,
                lat: 0.0,
                lon: 1.0,
            }),
            Feature::Node(Node {
                id: 3,
                lat: 0.0,
                lon: 2.0,
            }),
        ]
    }

    fn build(options: &Options<'_>, mut features: Vec<Feature>, tags: HashMap<String, String>) -> Extract {
        features.push(Feature::Way(Way {
            id: 10,
            nodes: vec![1, 2, 3],
            tags,
        }));
        GraphBuilder::new(options)
            .add_features(features.into_iter().map(Ok::<_, ()>))
            .unwrap()
    }

    #[test]
    fn two_way_edges_are_symmetric() {
        let g = build(&OPTIONS, a_b_c(), tags! {"highway": "residential"}).graph;
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.get_edge(1, 2), g.get_edge(2, 1));
        assert_eq!(g.get_edge(2, 3), g.get_edge(3, 2));
        assert!((g.get_edge(1, 2) - 111_194.93).abs() < 0.01);
    }

    #[test]
    fn oneway_forward() {
        let g = build(&OPTIONS, a_b_c(), tags! {"highway": "residential", "oneway": "yes"}).graph;
        assert_edge!(g, 1, 2);
        assert_edge!(g, 2, 3);
        assert_no_edge!(g, 2, 1);
        assert_no_edge!(g, 3, 2);
    }

    #[test]
    fn oneway_reverse() {
        let g = build(&OPTIONS, a_b_c(), tags! {"highway": "residential", "oneway": "-1"}).graph;
        assert_no_edge!(g, 1, 2);
        assert_no_edge!(g, 2, 3);
        assert_edge!(g, 2, 1);
        assert_edge!(g, 3, 2);
        assert!(g.is_routable(1), "reverse-only way still marks its first node");
    }

    #[test]
    fn excluded_way_produces_no_edges() {
        let extract = build(&OPTIONS, a_b_c(), tags! {"highway": "footway"});
        assert_eq!(extract.graph.edge_count(), 0);
        assert_eq!(extract.graph.road_network_len(), 0);
        assert_eq!(extract.graph.len(), 3);
        assert!(extract.roads.is_empty());
    }

    #[test]
    fn access_restricted_way_is_still_drawn() {
        let extract = build(&OPTIONS, a_b_c(), tags! {"highway": "service", "access": "no"});
        assert_eq!(extract.graph.edge_count(), 0);
        assert_eq!(extract.roads.len(), 1);
    }

    #[test]
    fn unknown_nodes_only_skip_their_segment() {
        let mut features = a_b_c();
        features.remove(0);
        let g = build(&OPTIONS, features, tags! {"highway": "residential"}).graph;
        assert_no_edge!(g, 1, 2);
        assert_edge!(g, 2, 3);
        assert_edge!(g, 3, 2);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn bbox_filters_nodes() {
        let options = Options {
            bbox: [-0.5, -0.5, 1.5, 0.5],
            ..OPTIONS
        };
        let g = build(&options, a_b_c(), tags! {"highway": "residential"}).graph;
        assert_eq!(g.len(), 2);
        assert!(g.get_node(3).is_none());
        assert_edge!(g, 1, 2);
        assert_edge!(g, 2, 1);
    }

    #[test]
    fn roads_are_merged_by_name_and_class() {
        let mut features = a_b_c();
        for (id, nodes, name) in [(10, vec![1, 2], "A"), (11, vec![2, 3], "A"), (12, vec![1, 3], "B")] {
            features.push(Feature::Way(Way {
                id,
                nodes,
                tags: tags! {"highway": "primary", "name": name},
            }));
        }
        features.push(Feature::Way(Way {
            id: 13,
            nodes: vec![3, 1],
            tags: tags! {"highway": "primary"},
        }));

        let extract = GraphBuilder::new(&OPTIONS)
            .add_features(features.into_iter().map(Ok::<_, ()>))
            .unwrap();

        let summary: Vec<(&str, usize)> = extract
            .roads
            .iter()
            .map(|r| (r.name.as_str(), r.segments.len()))
            .collect();
        assert_eq!(summary, vec![("A", 2), ("B", 1), ("unnamed", 1)]);
    }

    #[test]
    fn source_errors_abort_the_build() {
        let features = vec![
            Ok(Feature::Node(Node {
                id: 1,
                lat: 0.0,
                lon: 0.0,
            })),
            Err("broken"),
        ];
        assert_eq!(
            GraphBuilder::new(&OPTIONS).add_features(features).err(),
            Some("broken")
        );
    }
}
