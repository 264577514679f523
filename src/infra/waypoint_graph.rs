use crate::infra::Position;

/// Index of a waypoint inside its [`WaypointGraph`]. Only valid for the graph
/// (and the build) that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub struct Waypoint {
    pub id: NodeId,
    pub position: Position,
    neighbors: Vec<NodeId>,
}

impl Waypoint {
    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }
}

/// Walkable lane of waypoints.
///
/// Nodes are kept sorted left to right and each one is linked to its immediate
/// left and right neighbour only, so the graph is always a single chain.
#[derive(Debug, Clone, Default)]
pub struct WaypointGraph {
    nodes: Vec<Waypoint>,
}

impl WaypointGraph {
    pub fn new(positions: &[Position]) -> Self {
        let mut graph = Self::default();
        graph.rebuild(positions);
        graph
    }

    /// Nodes spaced `spacing` apart from `start_x` along a flat floor at `y`.
    pub fn lane(start_x: f64, count: usize, spacing: f64, y: f64) -> Self {
        let positions: Vec<Position> = (0..count)
            .map(|i| Position::new(start_x + i as f64 * spacing, y))
            .collect();
        Self::new(&positions)
    }

    /// Replace all nodes and regenerate the chain links.
    pub fn rebuild(&mut self, positions: &[Position]) {
        let mut sorted = positions.to_vec();
        // Stable, so nodes sharing an x keep their placement order
        sorted.sort_by(|a, b| a.x.total_cmp(&b.x));

        let count = sorted.len();
        self.nodes = sorted
            .into_iter()
            .enumerate()
            .map(|(i, position)| {
                let mut neighbors = Vec::with_capacity(2);
                if i > 0 {
                    neighbors.push(NodeId(i - 1));
                }
                if i + 1 < count {
                    neighbors.push(NodeId(i + 1));
                }
                Waypoint {
                    id: NodeId(i),
                    position,
                    neighbors,
                }
            })
            .collect();

        tracing::debug!(nodes = self.nodes.len(), "Waypoint graph rebuilt");
    }

    /// Node with the smallest squared distance to `point`. The first node in
    /// stored order wins ties.
    pub fn nearest(&self, point: Position) -> Option<NodeId> {
        let mut closest = None;
        let mut best = f64::MAX;

        for node in &self.nodes {
            let d = node.position.distance_squared(&point);
            if d < best {
                best = d;
                closest = Some(node.id);
            }
        }

        closest
    }

    pub fn get(&self, id: NodeId) -> Option<&Waypoint> {
        self.nodes.get(id.0)
    }

    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.get(id).map(|n| n.position)
    }

    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.neighbors()).unwrap_or(&[])
    }

    pub fn nodes(&self) -> &[Waypoint] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop the link between two adjacent nodes in both directions.
    ///
    /// Used to model a gap in the floor; the next [`rebuild`](Self::rebuild)
    /// restores the full chain.
    pub fn cut(&mut self, a: NodeId, b: NodeId) {
        if let Some(node) = self.nodes.get_mut(a.0) {
            node.neighbors.retain(|&n| n != b);
        }
        if let Some(node) = self.nodes.get_mut(b.0) {
            node.neighbors.retain(|&n| n != a);
        }
    }
}
