pub mod config;
pub mod infra;
pub mod planners;
pub mod sim;

// Re-export commonly used types for convenience
pub use config::{AppConfig, ConfigError};
pub use infra::{AStar, MatchEvents, MatchListener, MatchResult, NodeId, Position, WaypointGraph};
pub use planners::rl::{Action, HybridController, Observation, Perceptron, QLearningAgent};
