//! Negative-cycle detection over the rate graph.
//!
//! Runs Bellman-Ford from a chosen start vertex. Because edge weights are
//! negated log rates, a reachable negative cycle is exactly a swap loop
//! whose compounded rate beats one. Relaxation visits vertices and edges
//! in insertion order, so the reported cycle is deterministic for a given
//! build sequence.

use std::collections::HashMap;

use eyre::{bail, Result};

use crate::arb::graph::RateGraph;
use crate::arb::token::TokenId;

/// Outcome of one detection run.
#[derive(Debug, Clone)]
pub enum Detection {
    /// Relaxation settled without finding a profitable loop.
    NoCycle {
        /// Final distance per vertex, infinite where unreachable
        distances: HashMap<TokenId, f64>,
    },
    /// A profitable loop was reconstructed.
    CycleFound {
        /// Cycle vertices in forward swap order, without the closing
        /// repetition of the first vertex
        cycle: Vec<TokenId>,
    },
}

/// Searches for a negative cycle reachable from `start`.
///
/// Relaxes every edge for `|V| - 1` rounds, then scans once more: an edge
/// that still relaxes proves a negative cycle feeds its source vertex, and
/// the parent chain is walked back to reconstruct the loop.
///
/// # Errors
///
/// Fails when `start` is not a vertex of the graph, or when the parent
/// chain turns out inconsistent during reconstruction. The latter cannot
/// happen for a graph built from finite-weight edges and is treated as a
/// fatal internal error.
pub fn find_negative_cycle(graph: &RateGraph, start: &TokenId) -> Result<Detection> {
    if !graph.contains(start) {
        bail!("Unknown vertex {start}");
    }

    let mut distance: HashMap<TokenId, f64> = graph
        .vertices()
        .iter()
        .map(|vertex| (vertex.clone(), f64::INFINITY))
        .collect();
    distance.insert(start.clone(), 0.0);
    let mut parent: HashMap<TokenId, TokenId> = HashMap::new();

    for _ in 0..graph.vertex_count().saturating_sub(1) {
        for vertex in graph.vertices() {
            let from_distance = distance.get(vertex).copied().unwrap_or(f64::INFINITY);
            if from_distance.is_infinite() {
                continue;
            }
            for edge in graph.edges_from(vertex)? {
                let candidate = from_distance + edge.weight();
                let best = distance.get(edge.to()).copied().unwrap_or(f64::INFINITY);
                if candidate < best {
                    distance.insert(edge.to().clone(), candidate);
                    parent.insert(edge.to().clone(), vertex.clone());
                }
            }
        }
    }

    // One more scan. Any edge that still relaxes is fed by a negative cycle.
    let mut witness = None;
    'scan: for vertex in graph.vertices() {
        let from_distance = distance.get(vertex).copied().unwrap_or(f64::INFINITY);
        if from_distance.is_infinite() {
            continue;
        }
        for edge in graph.edges_from(vertex)? {
            let best = distance.get(edge.to()).copied().unwrap_or(f64::INFINITY);
            if from_distance + edge.weight() < best {
                witness = Some(vertex.clone());
                break 'scan;
            }
        }
    }
    let Some(witness) = witness else {
        return Ok(Detection::NoCycle { distances: distance });
    };

    // The witness is reachable from the cycle but not necessarily on it.
    // Walking back at least |V| parent steps must land inside; |E| is a
    // safe upper bound for how far relaxation can displace the chain.
    let mut inside = witness;
    for _ in 0..graph.edge_count() {
        inside = match parent.get(&inside) {
            Some(previous) => previous.clone(),
            None => bail!("Parent chain broke at {inside} during cycle reconstruction"),
        };
    }

    // Walk the cycle once, collecting vertices in backward traversal order.
    let mut cycle = vec![inside.clone()];
    let mut cursor = inside.clone();
    for _ in 0..graph.vertex_count() {
        cursor = match parent.get(&cursor) {
            Some(previous) => previous.clone(),
            None => bail!("Parent chain broke at {cursor} during cycle reconstruction"),
        };
        if cursor == inside {
            cycle.reverse();
            return Ok(Detection::CycleFound { cycle });
        }
        cycle.push(cursor.clone());
    }
    bail!(
        "Cycle through {inside} failed to close within {} vertices",
        graph.vertex_count()
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::arb::test_helpers::*;
    use crate::arb::token::Token;

    fn expect_cycle(detection: Detection) -> Vec<TokenId> {
        match detection {
            Detection::CycleFound { cycle } => cycle,
            Detection::NoCycle { .. } => panic!("Expected a cycle"),
        }
    }

    fn expect_distances(detection: Detection) -> HashMap<TokenId, f64> {
        match detection {
            Detection::NoCycle { distances } => distances,
            Detection::CycleFound { .. } => panic!("Expected no cycle"),
        }
    }

    fn abc() -> (Token, Token, Token) {
        (
            token("A", 18, 1.0),
            token("B", 18, 1.0),
            token("C", 18, 1.0),
        )
    }

    #[test]
    fn test_profitable_loop_is_found() {
        // x2, x3, x0.25 compounds to 1.5.
        let (a, b, c) = abc();
        let graph = graph(vec![
            edge(&a, &b, 1, 2),
            edge(&b, &c, 1, 3),
            edge(&c, &a, 4, 1),
        ]);
        let detection = find_negative_cycle(&graph, &tid("A")).unwrap();
        assert_eq!(expect_cycle(detection), vec![tid("B"), tid("C"), tid("A")]);
    }

    #[test]
    fn test_same_cycle_from_every_start() {
        let (a, b, c) = abc();
        let graph = graph(vec![
            edge(&a, &b, 1, 2),
            edge(&b, &c, 1, 3),
            edge(&c, &a, 4, 1),
        ]);
        for start in ["A", "B", "C"] {
            let detection = find_negative_cycle(&graph, &tid(start)).unwrap();
            assert_eq!(
                expect_cycle(detection),
                vec![tid("B"), tid("C"), tid("A")],
                "start {start}"
            );
        }
    }

    #[test]
    fn test_repeat_detection_reports_the_identical_cycle() {
        // Parallel A > B quotes give relaxation competing candidates.
        let (a, b, c) = abc();
        let graph = graph(vec![
            edge(&a, &b, 1, 2),
            edge(&a, &b, 2, 5),
            edge(&b, &c, 1, 3),
            edge(&c, &a, 4, 1),
        ]);
        let first = expect_cycle(find_negative_cycle(&graph, &tid("A")).unwrap());
        let second = expect_cycle(find_negative_cycle(&graph, &tid("A")).unwrap());
        assert_eq!(first, vec![tid("A"), tid("B"), tid("C")]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_cycle_returns_distances() {
        let (a, b, c) = abc();
        let d = token("D", 18, 1.0);
        let graph = graph(vec![
            edge(&a, &b, 1, 2),
            edge(&b, &c, 1, 3),
            edge(&a, &c, 1, 4),
            edge(&d, &a, 1, 1),
        ]);
        let distances = expect_distances(find_negative_cycle(&graph, &tid("A")).unwrap());
        assert_eq!(distances[&tid("A")], 0.0);
        assert!((distances[&tid("B")] + 2.0f64.ln()).abs() < 1e-12);
        // The direct A > C quote pays x4; going through B pays x6 and wins.
        assert!((distances[&tid("C")] + 6.0f64.ln()).abs() < 1e-12);
        // D only points into the start, nothing reaches it.
        assert!(distances[&tid("D")].is_infinite());
    }

    #[test]
    fn test_lossy_and_breakeven_loops_are_not_cycles() {
        let (a, b, _) = abc();
        // Halving both ways loses money in either rotation.
        let lossy = graph(vec![edge(&a, &b, 2, 1), edge(&b, &a, 2, 1)]);
        expect_distances(find_negative_cycle(&lossy, &tid("A")).unwrap());
        // A loop compounding to exactly 1.0 is not reported either.
        let breakeven = graph(vec![edge(&a, &b, 1, 1), edge(&b, &a, 1, 1)]);
        expect_distances(find_negative_cycle(&breakeven, &tid("A")).unwrap());
    }

    #[test]
    fn test_reconstruction_lands_inside_the_cycle() {
        // A feeds the loop and E drains it; neither may appear in the
        // reported cycle.
        let (a, b, c) = abc();
        let d = token("D", 18, 1.0);
        let e = token("E", 18, 1.0);
        let graph = graph(vec![
            edge(&a, &b, 1, 1),
            edge(&b, &c, 1, 2),
            edge(&c, &d, 1, 2),
            edge(&d, &b, 3, 1),
            edge(&d, &e, 10, 1),
        ]);
        let detection = find_negative_cycle(&graph, &tid("A")).unwrap();
        assert_eq!(expect_cycle(detection), vec![tid("D"), tid("B"), tid("C")]);
    }

    #[test]
    fn test_unknown_start_vertex() {
        let (a, b, _) = abc();
        let graph = graph(vec![edge(&a, &b, 1, 2)]);
        let err = find_negative_cycle(&graph, &tid("X")).err().unwrap();
        assert_eq!(err.to_string(), "Unknown vertex X");
    }

    #[test]
    fn test_empty_graph() {
        let graph = RateGraph::new();
        let err = find_negative_cycle(&graph, &tid("A")).err().unwrap();
        assert_eq!(err.to_string(), "Unknown vertex A");
    }
}
