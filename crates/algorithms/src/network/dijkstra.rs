//! Multi-source shortest-cost search
//!
//! Standard Dijkstra over the directed arcs of a [`NetworkGraph`], seeded
//! with every start vertex at cost zero. Expansion stops at the cutoff, so
//! vertices whose cheapest cost exceeds it stay at infinity.

use super::graph::NetworkGraph;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq)]
struct State {
    cost: f64,
    vertex: usize,
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed on cost so BinaryHeap pops the cheapest state first
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cheapest cost from any source to every vertex, capped at `cutoff`.
///
/// Returns one cost per vertex; `f64::INFINITY` marks vertices that are
/// unreachable or only reachable above the cutoff.
pub fn shortest_costs(graph: &NetworkGraph, sources: &[usize], cutoff: f64) -> Vec<f64> {
    let mut costs = vec![f64::INFINITY; graph.vertex_count()];
    let mut heap = BinaryHeap::new();

    for &source in sources {
        if costs[source] > 0.0 {
            costs[source] = 0.0;
            heap.push(State {
                cost: 0.0,
                vertex: source,
            });
        }
    }

    while let Some(State { cost, vertex }) = heap.pop() {
        if cost > costs[vertex] {
            continue; // stale entry
        }
        for arc in graph.out_arcs(vertex) {
            let next = cost + arc.cost;
            if next <= cutoff && next < costs[arc.to] {
                costs[arc.to] = next;
                heap.push(State {
                    cost: next,
                    vertex: arc.to,
                });
            }
        }
    }

    costs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::graph::GraphParams;
    use geo_types::{Geometry, LineString};
    use netreach_core::{Feature, FeatureCollection};

    fn chain_graph() -> NetworkGraph {
        // 0 --100-- 1 --100-- 2 --100-- 3
        let mut fc = FeatureCollection::new();
        fc.push(Feature::new(Geometry::LineString(LineString::from(vec![
            (0.0, 0.0),
            (100.0, 0.0),
            (200.0, 0.0),
            (300.0, 0.0),
        ]))));
        NetworkGraph::build(&fc, &GraphParams::default()).unwrap()
    }

    #[test]
    fn test_costs_along_chain() {
        let graph = chain_graph();
        let costs = shortest_costs(&graph, &[0], f64::INFINITY);
        assert_eq!(costs.len(), 4);
        for (i, expected) in [0.0, 100.0, 200.0, 300.0].iter().enumerate() {
            assert!(
                (costs[i] - expected).abs() < 1e-9,
                "vertex {i}: expected {expected}, got {}",
                costs[i]
            );
        }
    }

    #[test]
    fn test_cutoff_leaves_far_vertices_at_infinity() {
        let graph = chain_graph();
        let costs = shortest_costs(&graph, &[0], 150.0);
        assert_eq!(costs[1], 100.0);
        assert!(costs[2].is_infinite());
        assert!(costs[3].is_infinite());
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        let graph = chain_graph();
        let costs = shortest_costs(&graph, &[0], 200.0);
        assert_eq!(costs[2], 200.0);
        assert!(costs[3].is_infinite());
    }

    #[test]
    fn test_multi_source_takes_cheapest() {
        let graph = chain_graph();
        let costs = shortest_costs(&graph, &[0, 3], f64::INFINITY);
        assert_eq!(costs[1], 100.0); // from vertex 0
        assert_eq!(costs[2], 100.0); // from vertex 3
    }

    #[test]
    fn test_two_routes_prefers_shorter() {
        // Triangle: 0-1 direct (300) vs 0-2-1 (100 + 100)
        let mut fc = FeatureCollection::new();
        fc.push(Feature::new(Geometry::LineString(LineString::from(vec![
            (0.0, 0.0),
            (300.0, 0.0),
        ]))));
        fc.push(Feature::new(Geometry::LineString(LineString::from(vec![
            (0.0, 0.0),
            (0.0, 100.0),
        ]))));
        fc.push(Feature::new(Geometry::LineString(LineString::from(vec![
            (0.0, 100.0),
            (300.0, 0.0),
        ]))));
        let graph = NetworkGraph::build(&fc, &GraphParams::default()).unwrap();

        let start = graph.nearest_vertex(geo_types::Coord { x: 0.0, y: 0.0 }).unwrap();
        let end = graph
            .nearest_vertex(geo_types::Coord { x: 300.0, y: 0.0 })
            .unwrap();
        let costs = shortest_costs(&graph, &[start], f64::INFINITY);

        let via = 100.0 + (300.0_f64.powi(2) + 100.0_f64.powi(2)).sqrt();
        let expected = 300.0_f64.min(via);
        assert!((costs[end] - expected).abs() < 1e-9);
    }
}
