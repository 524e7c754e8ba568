// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::{earth_distance, AStarError, Edge, Graph};

/// Tolerance for deciding whether a queue entry was superseded by a better one.
const STALE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    at: i64,
    score: f64,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // NOTE: We revert the order of comparison,
        // as lower scores are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        other.score.total_cmp(&self.score)
    }
}

fn reconstruct_path(came_from: &HashMap<i64, i64>, mut last: i64) -> Vec<i64> {
    let mut path = vec![last];

    while let Some(&nd) = came_from.get(&last) {
        path.push(nd);
        last = nd;
    }

    path.reverse();
    return path;
}

/// Uses the [A* algorithm](https://en.wikipedia.org/wiki/A*_search_algorithm)
/// to find the shortest route between two nodes in the provided graph.
///
/// Returns the ids of all nodes along the route, including both ends, or an empty
/// vector if the destination can't be reached from the start node. Searching from
/// a node to itself yields a single-node route.
///
/// The queue never has its keys decreased. Instead, a node is pushed again whenever
/// a cheaper way to it is found, and outdated entries are skipped when popped.
///
/// `step_limit` limits how many nodes may be expanded during the search
/// before returning [AStarError::StepLimitExceeded]. Pass [usize::MAX] to search
/// until the queue is exhausted.
pub fn find_route(
    g: &Graph,
    from_id: i64,
    to_id: i64,
    step_limit: usize,
) -> Result<Vec<i64>, AStarError> {
    let mut queue: BinaryHeap<QueueItem> = BinaryHeap::default();
    let mut came_from: HashMap<i64, i64> = HashMap::default();
    let mut known_costs: HashMap<i64, f64> = HashMap::default();
    let mut known_scores: HashMap<i64, f64> = HashMap::default();
    let mut steps: usize = 0;

    let to_node = g
        .get_node(to_id)
        .ok_or(AStarError::InvalidReference(to_id))?;

    {
        let from_node = g
            .get_node(from_id)
            .ok_or(AStarError::InvalidReference(from_id))?;

        let initial_distance =
            earth_distance(from_node.lat, from_node.lon, to_node.lat, to_node.lon);

        queue.push(QueueItem {
            at: from_id,
            score: initial_distance,
        });
        known_costs.insert(from_id, 0.0);
        known_scores.insert(from_id, initial_distance);
    }

    while let Some(item) = queue.pop() {
        // The same node may be queued multiple times - only the best entry is expanded.
        let best_score = known_scores.get(&item.at).cloned().unwrap_or(f64::INFINITY);
        if item.score > best_score + STALE_EPSILON {
            continue;
        }

        if item.at == to_id {
            return Ok(reconstruct_path(&came_from, to_id));
        }

        steps += 1;
        if steps > step_limit {
            return Err(AStarError::StepLimitExceeded);
        }

        let cost = known_costs.get(&item.at).cloned().unwrap_or(f64::INFINITY);

        for &Edge {
            to: neighbor_id,
            cost: edge_cost,
        } in g.get_edges(item.at)
        {
            // Edges only ever point at known nodes
            let Some(neighbor) = g.get_node(neighbor_id) else {
                continue;
            };

            // Check if this is the cheapest way to the neighbor
            let neighbor_cost = cost + edge_cost;
            if let Some(&known) = known_costs.get(&neighbor_id) {
                if neighbor_cost >= known {
                    continue;
                }
            }

            let neighbor_score =
                neighbor_cost + earth_distance(neighbor.lat, neighbor.lon, to_node.lat, to_node.lon);

            came_from.insert(neighbor_id, item.at);
            known_costs.insert(neighbor_id, neighbor_cost);
            known_scores.insert(neighbor_id, neighbor_score);
            queue.push(QueueItem {
                at: neighbor_id,
                score: neighbor_score,
            });
        }
    }

    log::debug!("A* exhausted after {steps} steps without reaching {to_id}");
    return Ok(vec![]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Node;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr) => {
            assert!(
                (($a - $b).abs() < 1e-6),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    fn add_node(g: &mut Graph, id: i64, lat: f64, lon: f64) {
        g.insert_node(Node { id, lat, lon });
    }

    fn add_edge(g: &mut Graph, from: i64, to: i64) {
        let a = g.get_node(from).unwrap();
        let b = g.get_node(to).unwrap();
        let cost = earth_distance(a.lat, a.lon, b.lat, b.lon);
        g.push_edge(from, Edge { to, cost });
    }

    fn add_two_way(g: &mut Graph, a: i64, b: i64) {
        add_edge(g, a, b);
        add_edge(g, b, a);
    }

    /// Graph with a short but one-way diagonal and a longer two-way detour.
    ///
    /// ```text
    /// 4───3
    /// │ ↗ │
    /// 1───2
    /// ```
    fn square() -> Graph {
        let mut g = Graph::default();
        add_node(&mut g, 1, 0.0, 0.0);
        add_node(&mut g, 2, 0.0, 0.01);
        add_node(&mut g, 3, 0.01, 0.01);
        add_node(&mut g, 4, 0.01, 0.0);
        add_two_way(&mut g, 1, 2);
        add_two_way(&mut g, 2, 3);
        add_two_way(&mut g, 3, 4);
        add_two_way(&mut g, 4, 1);
        add_edge(&mut g, 1, 3);
        g
    }

    #[test]
    fn takes_the_diagonal() {
        let g = square();
        assert_eq!(find_route(&g, 1, 3, usize::MAX), Ok(vec![1, 3]));
    }

    #[test]
    fn respects_edge_direction() {
        let g = square();
        let route = find_route(&g, 3, 1, usize::MAX).unwrap();
        assert_eq!(route.len(), 3);
        assert_eq!(route[0], 3);
        assert_eq!(route[2], 1);
    }

    #[test]
    fn route_to_self() {
        let g = square();
        assert_eq!(find_route(&g, 2, 2, usize::MAX), Ok(vec![2]));
    }

    #[test]
    fn invalid_reference() {
        let g = square();
        assert_eq!(
            find_route(&g, 1, 99, usize::MAX),
            Err(AStarError::InvalidReference(99))
        );
        assert_eq!(
            find_route(&g, 99, 1, usize::MAX),
            Err(AStarError::InvalidReference(99))
        );
    }

    #[test]
    fn isolated_node_is_unreachable() {
        let mut g = square();
        add_node(&mut g, 5, 0.02, 0.02);
        assert_eq!(find_route(&g, 1, 5, usize::MAX), Ok(vec![]));
        assert_eq!(find_route(&g, 5, 1, usize::MAX), Ok(vec![]));
        assert_eq!(find_route(&g, 5, 5, usize::MAX), Ok(vec![5]));
    }

    #[test]
    fn step_limit() {
        let g = square();
        assert_eq!(
            find_route(&g, 2, 4, 1),
            Err(AStarError::StepLimitExceeded)
        );
        assert!(find_route(&g, 2, 4, 10).is_ok());
    }

    #[test]
    fn idempotent() {
        let g = square();
        let first = find_route(&g, 3, 1, usize::MAX).unwrap();
        let second = find_route(&g, 3, 1, usize::MAX).unwrap();
        assert_eq!(first, second);
    }

    /// Computes all shortest path lengths with the Floyd-Warshall algorithm.
    fn brute_force_distances(g: &Graph, ids: &[i64]) -> Vec<Vec<f64>> {
        let n = ids.len();
        let mut dist = vec![vec![f64::INFINITY; n]; n];
        for i in 0..n {
            dist[i][i] = 0.0;
            for j in 0..n {
                dist[i][j] = dist[i][j].min(g.get_edge(ids[i], ids[j]));
            }
        }
        for k in 0..n {
            for i in 0..n {
                for j in 0..n {
                    let via = dist[i][k] + dist[k][j];
                    if via < dist[i][j] {
                        dist[i][j] = via;
                    }
                }
            }
        }
        dist
    }

    #[test]
    fn optimal_on_random_graphs() {
        let mut rng = SmallRng::seed_from_u64(2025);

        for _ in 0..20 {
            let mut g = Graph::default();
            let ids: Vec<i64> = (1..=25).collect();
            for &id in &ids {
                add_node(&mut g, id, rng.gen_range(24.80..24.90), rng.gen_range(67.00..67.10));
            }
            for _ in 0..60 {
                let a = ids[rng.gen_range(0..ids.len())];
                let b = ids[rng.gen_range(0..ids.len())];
                if a == b {
                    continue;
                }
                if rng.gen_bool(0.5) {
                    add_two_way(&mut g, a, b);
                } else {
                    add_edge(&mut g, a, b);
                }
            }

            let expected = brute_force_distances(&g, &ids);
            for (i, &from) in ids.iter().enumerate() {
                for (j, &to) in ids.iter().enumerate() {
                    let route = find_route(&g, from, to, usize::MAX).unwrap();
                    if expected[i][j].is_infinite() {
                        assert!(route.is_empty(), "{from} -> {to} should be unreachable");
                    } else {
                        assert_eq!(route.first(), Some(&from));
                        assert_eq!(route.last(), Some(&to));
                        let length = g.route_length(&route).unwrap();
                        assert_almost_eq!(length, expected[i][j]);
                    }
                }
            }
        }
    }
}
