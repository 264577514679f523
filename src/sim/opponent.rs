use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::planners::rl::Action;

use super::fighter::{AttackKind, Fighter};

/// Rule-based sparring partner standing in for the human player.
pub struct ScriptedOpponent {
    rng: StdRng,
    /// Seconds between decisions
    pub reaction_time: f64,
    /// Chance of blocking instead of attacking when in range
    pub block_chance: f64,
    /// Chance a swing is heavy
    pub heavy_chance: f64,
    pub block_duration: f64,
    next_decision_at: f64,
    block_until: f64,
    last_action: Action,
}

/// What the opponent wants to do this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpponentIntent {
    pub move_dir: f64,
    pub attack: Option<AttackKind>,
    pub blocking: bool,
}

impl ScriptedOpponent {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            reaction_time: 0.25,
            block_chance: 0.2,
            heavy_chance: 0.3,
            block_duration: 0.5,
            next_decision_at: 0.0,
            block_until: 0.0,
            last_action: Action::Idle,
        }
    }

    pub fn reset(&mut self) {
        self.next_decision_at = 0.0;
        self.block_until = 0.0;
        self.last_action = Action::Idle;
    }

    pub fn last_action(&self) -> Action {
        self.last_action
    }

    pub fn decide(&mut self, now: f64, me: &Fighter, target: &Fighter) -> OpponentIntent {
        let blocking = now < self.block_until;
        let dx = target.position.x - me.position.x;
        let in_range = dx.abs() <= me.stats.attack_range;

        if blocking {
            return OpponentIntent {
                move_dir: 0.0,
                attack: None,
                blocking: true,
            };
        }

        if !in_range {
            self.last_action = Action::Approach;
            return OpponentIntent {
                move_dir: dx.signum(),
                attack: None,
                blocking: false,
            };
        }

        if now < self.next_decision_at {
            return OpponentIntent {
                move_dir: 0.0,
                attack: None,
                blocking: false,
            };
        }
        self.next_decision_at = now + self.reaction_time;

        if self.rng.random_bool(self.block_chance) {
            self.block_until = now + self.block_duration;
            self.last_action = Action::Block;
            return OpponentIntent {
                move_dir: 0.0,
                attack: None,
                blocking: true,
            };
        }

        let kind = if self.rng.random_bool(self.heavy_chance) {
            self.last_action = Action::HeavyAttack;
            AttackKind::Heavy
        } else {
            self.last_action = Action::LightAttack;
            AttackKind::Light
        };

        OpponentIntent {
            move_dir: 0.0,
            attack: Some(kind),
            blocking: false,
        }
    }
}
