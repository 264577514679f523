use std::cell::RefCell;
use std::rc::Rc;

use crate::infra::{MatchEvents, MatchResult, Position, WaypointGraph};
use crate::planners::rl::{
    CombatCommands, ControllerConfig, HybridController, Observation, Perceptron, PerceptronConfig,
    QLearningAgent, QLearningConfig, TrainingMetrics,
};

use super::coordinator::MatchCoordinator;
use super::fighter::{AttackKind, CombatStats, Fighter};
use super::opponent::ScriptedOpponent;

#[derive(Debug, Clone)]
pub struct ArenaConfig {
    pub half_width: f64,
    pub node_spacing: f64,
    pub floor_y: f64,
    pub self_start: Position,
    pub opponent_start: Position,
    pub max_health: i32,
    pub match_duration: f64,
    pub tick_rate: f64,
    pub seed: Option<u64>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            half_width: 8.0,
            node_spacing: 1.0,
            floor_y: 0.5,
            self_start: Position::new(3.0, 0.5),
            opponent_start: Position::new(-3.0, 0.5),
            max_health: 100,
            match_duration: 90.0,
            tick_rate: 50.0,
            seed: None,
        }
    }
}

/// Collects the controller's combat requests for one tick.
#[derive(Debug, Default)]
struct CommandBuffer {
    attack: Option<AttackKind>,
    blocking: Option<bool>,
}

impl CombatCommands for CommandBuffer {
    fn request_light_attack(&mut self) {
        self.attack = Some(AttackKind::Light);
    }

    fn request_heavy_attack(&mut self) {
        self.attack = Some(AttackKind::Heavy);
    }

    fn set_blocking(&mut self, blocking: bool) {
        self.blocking = Some(blocking);
    }
}

/// Headless 1-D arena: the AI fighter against a scripted opponent.
pub struct Arena {
    config: ArenaConfig,
    time: f64,
    ai: Fighter,
    opponent: Fighter,
    script: ScriptedOpponent,
    controller: Rc<RefCell<HybridController>>,
    coordinator: MatchCoordinator,
    pub metrics: TrainingMetrics,
}

impl Arena {
    pub fn new(config: ArenaConfig) -> Self {
        let events = MatchEvents::new();

        let node_count = (2.0 * config.half_width / config.node_spacing).floor() as usize + 1;
        let graph = WaypointGraph::lane(
            -config.half_width,
            node_count,
            config.node_spacing,
            config.floor_y,
        );

        let (agent, perceptron, script) = match config.seed {
            Some(seed) => (
                QLearningAgent::with_seed(QLearningConfig::default(), seed),
                Perceptron::with_seed(PerceptronConfig::default(), seed.wrapping_add(1)),
                ScriptedOpponent::new(seed.wrapping_add(2)),
            ),
            None => (
                QLearningAgent::new(QLearningConfig::default()),
                Perceptron::new(PerceptronConfig::default()),
                ScriptedOpponent::new(rand::random()),
            ),
        };

        let controller =
            HybridController::spawn(ControllerConfig::default(), agent, perceptron, graph, &events);

        let ai = Fighter::new(config.self_start, config.max_health, CombatStats::default());
        let opponent = Fighter::new(
            config.opponent_start,
            config.max_health,
            CombatStats {
                move_speed: 7.0,
                ..CombatStats::default()
            },
        );

        Self {
            coordinator: MatchCoordinator::new(events, config.match_duration),
            config,
            time: 0.0,
            ai,
            opponent,
            script,
            controller,
            metrics: TrainingMetrics::default(),
        }
    }

    pub fn controller(&self) -> &Rc<RefCell<HybridController>> {
        &self.controller
    }

    pub fn coordinator(&self) -> &MatchCoordinator {
        &self.coordinator
    }

    pub fn ai(&self) -> &Fighter {
        &self.ai
    }

    pub fn opponent(&self) -> &Fighter {
        &self.opponent
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Play one full match and return its result.
    pub fn run_match(&mut self) -> MatchResult {
        self.ai.reset(self.config.self_start);
        self.opponent.reset(self.config.opponent_start);
        self.script.reset();

        let start_reward = self.controller.borrow().agent().cumulative_reward;
        self.metrics.start_episode(start_reward);
        self.coordinator.start_match();

        let dt = 1.0 / self.config.tick_rate;
        loop {
            if let Some(result) = self.step(dt) {
                let controller = self.controller.borrow();
                let agent = controller.agent();
                let reward = self.metrics.record_episode(agent.cumulative_reward, result);
                self.metrics.log_episode(
                    agent.total_episodes,
                    reward,
                    &controller.perceptron().debug_info(),
                );
                return result;
            }
        }
    }

    /// Advance the world by one fixed step.
    pub fn step(&mut self, dt: f64) -> Option<MatchResult> {
        if !self.coordinator.is_match_in_progress() {
            return None;
        }
        self.time += dt;

        let obs = self.observation();
        let mut commands = CommandBuffer::default();
        let move_dir = {
            let mut controller = self.controller.borrow_mut();
            controller.update(self.time, &obs, &mut commands);
            controller.move_direction(&obs)
        };

        if let Some(blocking) = commands.blocking {
            self.ai.blocking = blocking;
        }
        if let Some(kind) = commands.attack {
            if let Some(damage) = self.ai.attack(kind, self.time, &mut self.opponent) {
                tracing::trace!(damage, "AI hit");
            }
        }
        self.move_fighter(true, move_dir, dt);

        let intent = self.script.decide(self.time, &self.opponent, &self.ai);
        self.opponent.blocking = intent.blocking;
        if let Some(kind) = intent.attack {
            if let Some(damage) = self.opponent.attack(kind, self.time, &mut self.ai) {
                tracing::trace!(damage, "Opponent hit");
            }
        }
        self.move_fighter(false, intent.move_dir, dt);

        self.coordinator
            .tick(dt, self.ai.is_alive(), self.opponent.is_alive())
    }

    fn move_fighter(&mut self, ai: bool, direction: f64, dt: f64) {
        let limit = self.config.half_width;
        let fighter = if ai { &mut self.ai } else { &mut self.opponent };
        let x = fighter.position.x + direction * fighter.stats.move_speed * dt;
        fighter.position.x = x.clamp(-limit, limit);
    }

    /// What the AI fighter perceives right now.
    pub fn observation(&self) -> Observation {
        Observation {
            self_position: self.ai.position,
            opponent_position: self.opponent.position,
            self_health: self.ai.health,
            self_max_health: self.ai.max_health,
            opponent_health: self.opponent.health,
            opponent_max_health: self.opponent.max_health,
            opponent_blocking: self.opponent.blocking,
            opponent_last_action: self.script.last_action().index() as i32,
            self_blocking: self.ai.blocking,
            grounded: true,
        }
    }
}
