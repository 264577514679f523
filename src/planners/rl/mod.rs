//! Hybrid reinforcement-learning fighter AI
//!
//! ```text
//! Observation
//!     │
//!     ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  HybridController (every action interval)                   │
//! │  - Perceptron::featurize + evaluate → state score           │
//! │  - QLearningAgent::state_key + select_action → Action       │
//! └─────────────────────────────────────────────────────────────┘
//!     │
//!     ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Dispatch                                                   │
//! │  - Approach / Retreat → A* over the WaypointGraph           │
//! │  - Attacks / Block → CombatCommands                         │
//! └─────────────────────────────────────────────────────────────┘
//!     │
//!     ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Rewards                                                    │
//! │  - distance band + weighted state score each decision       │
//! │  - damage dealt / taken, match result                       │
//! │  → QLearningAgent::give_reward, Perceptron::train           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod controller;
pub mod metrics;
pub mod perceptron;
pub mod q_agent;

pub use action::{Action, NUM_ACTIONS};
pub use controller::{CombatCommands, ControllerConfig, HybridController, Observation, RewardConfig};
pub use metrics::{MovingAverage, TrainingMetrics};
pub use perceptron::{FEATURE_COUNT, Features, Perceptron, PerceptronConfig};
pub use q_agent::{QLearningAgent, QLearningConfig, StateKey};
