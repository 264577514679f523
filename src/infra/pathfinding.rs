use std::collections::{HashMap, HashSet};

use crate::infra::{NodeId, Position, WaypointGraph};

pub struct AStar;

impl AStar {
    /// Shortest path from `start` to `goal`, both ends included.
    ///
    /// Edge cost and heuristic are both straight-line distance. The open set is
    /// a plain list scanned for the lowest f-score, and the first minimum in
    /// insertion order wins, so equal-cost searches always expand in the same
    /// order. Returns `None` when the goal is unreachable.
    #[tracing::instrument(level = "trace", skip(graph), fields(start = start.0, goal = goal.0))]
    pub fn find_path(graph: &WaypointGraph, start: NodeId, goal: NodeId) -> Option<Vec<NodeId>> {
        let (Some(goal_pos), Some(start_pos)) = (graph.position(goal), graph.position(start))
        else {
            tracing::warn!("Path requested between nodes outside the graph");
            return None;
        };

        let mut open_set: Vec<NodeId> = vec![start];
        let mut closed_set: HashSet<NodeId> = HashSet::new();
        let mut came_from: HashMap<NodeId, NodeId> = HashMap::new();
        let mut g_score: HashMap<NodeId, f64> = HashMap::new();
        let mut f_score: HashMap<NodeId, f64> = HashMap::new();

        g_score.insert(start, 0.0);
        f_score.insert(start, start_pos.distance(&goal_pos));

        let score = |map: &HashMap<NodeId, f64>, id: NodeId| -> f64 {
            *map.get(&id).unwrap_or(&f64::INFINITY)
        };

        let mut expansions = 0;

        while !open_set.is_empty() {
            let mut best_index = 0;
            let mut best_f = score(&f_score, open_set[0]);
            for (i, &node) in open_set.iter().enumerate().skip(1) {
                let f = score(&f_score, node);
                if f < best_f {
                    best_f = f;
                    best_index = i;
                }
            }

            let current = open_set[best_index];
            if current == goal {
                tracing::trace!(expansions, "Path found");
                return Some(reconstruct_path(&came_from, current));
            }

            open_set.remove(best_index);
            closed_set.insert(current);
            expansions += 1;

            let Some(current_pos) = graph.position(current) else {
                continue;
            };
            let current_g = score(&g_score, current);

            for &neighbor in graph.neighbors(current) {
                if closed_set.contains(&neighbor) {
                    continue;
                }
                let Some(neighbor_pos) = graph.position(neighbor) else {
                    continue;
                };

                let tentative_g = current_g + current_pos.distance(&neighbor_pos);

                // Equal cost keeps the existing parent
                if tentative_g >= score(&g_score, neighbor) {
                    continue;
                }
                if !open_set.contains(&neighbor) {
                    open_set.push(neighbor);
                }

                came_from.insert(neighbor, current);
                g_score.insert(neighbor, tentative_g);
                f_score.insert(neighbor, tentative_g + neighbor_pos.distance(&goal_pos));
            }
        }

        tracing::trace!(expansions, "No path found");
        None
    }

    /// Path between the nodes nearest to two world points.
    pub fn find_path_between(
        graph: &WaypointGraph,
        from: Position,
        to: Position,
    ) -> Option<Vec<NodeId>> {
        let start = graph.nearest(from)?;
        let goal = graph.nearest(to)?;
        Self::find_path(graph, start, goal)
    }
}

/// Sum of the straight-line lengths of each hop.
pub fn path_length(graph: &WaypointGraph, path: &[NodeId]) -> f64 {
    path.windows(2)
        .filter_map(|pair| Some(graph.position(pair[0])?.distance(&graph.position(pair[1])?)))
        .sum()
}

fn reconstruct_path(came_from: &HashMap<NodeId, NodeId>, mut current: NodeId) -> Vec<NodeId> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
