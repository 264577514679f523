//! Stand-ins for the game engine: just enough arena, fighters and match
//! lifecycle to train and exercise the controller headlessly.

mod arena;
mod coordinator;
mod fighter;
mod opponent;

pub use arena::{Arena, ArenaConfig};
pub use coordinator::MatchCoordinator;
pub use fighter::{AttackKind, CombatStats, Fighter};
pub use opponent::{OpponentIntent, ScriptedOpponent};
