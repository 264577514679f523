mod match_events;
mod pathfinding;
mod types;
mod waypoint_graph;

pub use match_events::{MatchEvents, MatchListener, MatchResult, Subscription};
pub use pathfinding::{AStar, path_length};
pub use types::{Position, sign};
pub use waypoint_graph::{NodeId, Waypoint, WaypointGraph};
