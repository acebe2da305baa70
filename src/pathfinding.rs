use crate::config::SearchStrategy;
use crate::graph::DesireGraph;
use crate::models::PointId;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Copy, Clone, Eq, PartialEq)]
struct State {
    // g + h
    estimate: OrderedFloat<f64>,
    node: PointId,
}

// The priority queue depends on `Ord`.
// Flip the ordering on the estimate so the queue becomes a min-heap.
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest path from `start` to `goal` over the current edge costs.
///
/// Returns the node sequence including both ends, or an empty vector when
/// the goal is unreachable. With `SearchStrategy::AStar` the heuristic is
/// the straight line distance to the goal; once the optimizer has pushed
/// costs below Euclidean length that heuristic overestimates and the path
/// found may be slightly longer than optimal.
pub fn find_path(
    graph: &DesireGraph,
    start: PointId,
    goal: PointId,
    strategy: SearchStrategy,
) -> Vec<PointId> {
    if !graph.contains(start) || !graph.contains(goal) {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }

    let n = graph.node_count();
    let goal_xy = graph.point(goal).xy();
    let heuristic = |id: PointId| -> f64 {
        match strategy {
            SearchStrategy::AStar => {
                crate::geometry_utils::distance(graph.point(id).xy(), goal_xy)
            }
            SearchStrategy::Dijkstra => 0.0,
        }
    };

    let mut dist = vec![f64::INFINITY; n];
    let mut came_from: Vec<Option<PointId>> = vec![None; n];
    let mut closed = vec![false; n];
    let mut heap = BinaryHeap::new();

    dist[start.index()] = 0.0;
    heap.push(State {
        estimate: OrderedFloat(heuristic(start)),
        node: start,
    });

    while let Some(State { node: u, .. }) = heap.pop() {
        if u == goal {
            return reconstruct(&came_from, start, goal);
        }
        // stale entry
        if closed[u.index()] {
            continue;
        }
        closed[u.index()] = true;

        let g_u = dist[u.index()];
        for &(v, edge) in graph.neighbours(u) {
            if closed[v.index()] {
                continue;
            }
            let next = g_u + graph.edge(edge).cost;
            if next < dist[v.index()] {
                dist[v.index()] = next;
                came_from[v.index()] = Some(u);
                heap.push(State {
                    estimate: OrderedFloat(next + heuristic(v)),
                    node: v,
                });
            }
        }
    }

    Vec::new()
}

fn reconstruct(came_from: &[Option<PointId>], start: PointId, goal: PointId) -> Vec<PointId> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from[current.index()] {
            Some(prev) => {
                path.push(prev);
                current = prev;
            }
            None => return Vec::new(),
        }
    }
    path.reverse();
    path
}

/// Sum of current edge costs along `path`, `None` if a hop has no edge.
pub fn path_cost(graph: &DesireGraph, path: &[PointId]) -> Option<f64> {
    path.windows(2)
        .map(|w| graph.cost(w[0], w[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PointOrigin;

    fn grid(w: usize, h: usize) -> (DesireGraph, Vec<Vec<PointId>>) {
        let mut g = DesireGraph::new();
        let ids: Vec<Vec<PointId>> = (0..h)
            .map(|y| {
                (0..w)
                    .map(|x| g.add_point(x as f64, y as f64, PointOrigin::Lattice))
                    .collect()
            })
            .collect();
        for y in 0..h {
            for x in 0..w {
                if x + 1 < w {
                    g.add_edge(ids[y][x], ids[y][x + 1]);
                }
                if y + 1 < h {
                    g.add_edge(ids[y][x], ids[y + 1][x]);
                }
            }
        }
        (g, ids)
    }

    #[test]
    fn single_edge() {
        let mut g = DesireGraph::new();
        let a = g.add_point(0.0, 0.0, PointOrigin::Lattice);
        let b = g.add_point(1.0, 0.0, PointOrigin::Lattice);
        g.add_edge(a, b);
        assert_eq!(find_path(&g, a, b, SearchStrategy::AStar), vec![a, b]);
        assert_eq!(find_path(&g, b, a, SearchStrategy::Dijkstra), vec![b, a]);
    }

    #[test]
    fn disconnected_pair_is_empty() {
        let mut g = DesireGraph::new();
        let a = g.add_point(0.0, 0.0, PointOrigin::Lattice);
        let b = g.add_point(1.0, 0.0, PointOrigin::Lattice);
        let c = g.add_point(5.0, 0.0, PointOrigin::Lattice);
        g.add_edge(a, b);
        assert!(find_path(&g, a, c, SearchStrategy::AStar).is_empty());
        assert!(find_path(&g, a, PointId(42), SearchStrategy::AStar).is_empty());
    }

    #[test]
    fn grid_path_is_manhattan_optimal() {
        let (g, ids) = grid(6, 4);
        let start = ids[0][0];
        let goal = ids[3][5];
        for strategy in [SearchStrategy::AStar, SearchStrategy::Dijkstra] {
            let path = find_path(&g, start, goal, strategy);
            assert_eq!(path.first(), Some(&start));
            assert_eq!(path.last(), Some(&goal));
            assert_eq!(path.len(), 9);
            assert!((path_cost(&g, &path).unwrap() - 8.0).abs() < 1e-9);
        }
    }

    #[test]
    fn cheaper_edges_attract_the_route() {
        let (mut g, ids) = grid(5, 3);
        // make the top row cheap
        for x in 0..5 {
            g.point_mut(ids[2][x]).influence = 10.0;
        }
        for x in 0..5 {
            g.refresh_costs_around(ids[2][x]);
        }
        let path = find_path(&g, ids[0][0], ids[0][4], SearchStrategy::Dijkstra);
        assert!(path.contains(&ids[2][2]));
    }
}
