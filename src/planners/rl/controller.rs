//! Hybrid decision loop: Q-learning picks actions, the perceptron scores
//! states and shapes the rewards the Q-learner sees.

use std::cell::RefCell;
use std::rc::Rc;

use crate::infra::{
    AStar, MatchEvents, MatchListener, MatchResult, NodeId, Position, Subscription, WaypointGraph,
    path_length, sign,
};

use super::action::Action;
use super::perceptron::{Features, Perceptron};
use super::q_agent::{QLearningAgent, StateKey};

/// Reward constants
#[derive(Debug, Clone)]
pub struct RewardConfig {
    /// Per 10 points of damage dealt
    pub hit_success: f64,
    /// Per 10 points of damage taken
    pub hit_taken: f64,
    /// Each decision made inside the ideal distance band
    pub ideal_distance: f64,
    pub win: f64,
    pub lose: f64,
    pub draw: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            hit_success: 10.0,
            hit_taken: -15.0,
            ideal_distance: 1.0,
            win: 100.0,
            lose: -100.0,
            draw: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Lower edge of the ideal distance band; no approaching inside it
    pub min_distance: f64,
    /// Upper edge of the ideal distance band; no retreating beyond it
    pub max_distance: f64,
    /// Stand-off distance aimed for when approaching
    pub desired_distance: f64,
    /// How far behind itself the fighter aims when retreating
    pub retreat_offset: f64,
    /// Seconds between decisions
    pub action_interval: f64,
    /// Seconds a block is held
    pub block_duration: f64,
    /// Horizontal distance at which a path node counts as reached
    pub node_reach_threshold: f64,
    pub use_q_learning: bool,
    pub use_perceptron: bool,
    /// Scale of the state evaluation added to every decision's reward
    pub perceptron_reward_weight: f64,
    pub rewards: RewardConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            min_distance: 1.0,
            max_distance: 3.0,
            desired_distance: 1.0,
            retreat_offset: 2.0,
            action_interval: 0.3,
            block_duration: 0.6,
            node_reach_threshold: 0.25,
            use_q_learning: true,
            use_perceptron: true,
            perceptron_reward_weight: 0.5,
            rewards: RewardConfig::default(),
        }
    }
}

/// What the controller reads from the world each tick.
#[derive(Debug, Clone, Default)]
pub struct Observation {
    pub self_position: Position,
    pub opponent_position: Position,
    pub self_health: i32,
    pub self_max_health: i32,
    pub opponent_health: i32,
    pub opponent_max_health: i32,
    pub opponent_blocking: bool,
    /// Ordinal of the opponent's last chosen action
    pub opponent_last_action: i32,
    pub self_blocking: bool,
    pub grounded: bool,
}

impl Observation {
    pub fn self_health_ratio(&self) -> f64 {
        health_ratio(self.self_health, self.self_max_health)
    }

    pub fn opponent_health_ratio(&self) -> f64 {
        health_ratio(self.opponent_health, self.opponent_max_health)
    }

    pub fn horizontal_distance(&self) -> f64 {
        self.self_position.horizontal_distance(&self.opponent_position)
    }

    pub fn distance(&self) -> f64 {
        self.self_position.distance(&self.opponent_position)
    }
}

fn health_ratio(health: i32, max_health: i32) -> f64 {
    if max_health > 0 {
        health as f64 / max_health as f64
    } else {
        1.0
    }
}

/// Combat requests the controller issues. Cooldowns, hit detection and
/// animation stay on the implementing side.
pub trait CombatCommands {
    fn request_light_attack(&mut self);
    fn request_heavy_attack(&mut self);
    fn set_blocking(&mut self, blocking: bool);
}

/// One per AI fighter; owns its learners and its current path.
pub struct HybridController {
    config: ControllerConfig,
    agent: QLearningAgent,
    perceptron: Perceptron,
    graph: WaypointGraph,

    current_path: Vec<NodeId>,
    path_index: usize,

    in_match: bool,
    next_action_time: f64,
    block_release_at: Option<f64>,
    decisions: u64,
    last_action: Action,
    last_action_outcome: f64,

    current_evaluation: f64,
    previous_evaluation: f64,

    last_self_health: Option<i32>,
    last_opponent_health: Option<i32>,
    last_observation: Option<Observation>,

    subscription: Option<Subscription>,
}

impl HybridController {
    pub fn new(
        config: ControllerConfig,
        agent: QLearningAgent,
        perceptron: Perceptron,
        graph: WaypointGraph,
    ) -> Self {
        Self {
            config,
            agent,
            perceptron,
            graph,
            current_path: Vec::new(),
            path_index: 0,
            in_match: false,
            next_action_time: 0.0,
            block_release_at: None,
            decisions: 0,
            last_action: Action::Idle,
            last_action_outcome: 0.0,
            current_evaluation: 0.0,
            previous_evaluation: 0.0,
            last_self_health: None,
            last_opponent_health: None,
            last_observation: None,
            subscription: None,
        }
    }

    /// Build a controller already subscribed to `events`. The subscription
    /// lives as long as the controller.
    pub fn spawn(
        config: ControllerConfig,
        agent: QLearningAgent,
        perceptron: Perceptron,
        graph: WaypointGraph,
        events: &MatchEvents,
    ) -> Rc<RefCell<Self>> {
        let controller = Rc::new(RefCell::new(Self::new(config, agent, perceptron, graph)));
        let subscription = events.subscribe(&controller);
        controller.borrow_mut().subscription = Some(subscription);
        controller
    }

    /// Stop receiving match events.
    pub fn detach(&mut self) {
        self.subscription = None;
    }

    pub fn agent(&self) -> &QLearningAgent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut QLearningAgent {
        &mut self.agent
    }

    pub fn perceptron(&self) -> &Perceptron {
        &self.perceptron
    }

    pub fn graph(&self) -> &WaypointGraph {
        &self.graph
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn current_path(&self) -> &[NodeId] {
        &self.current_path
    }

    pub fn last_action(&self) -> Action {
        self.last_action
    }

    pub fn decision_count(&self) -> u64 {
        self.decisions
    }

    pub fn current_evaluation(&self) -> f64 {
        self.current_evaluation
    }

    pub fn previous_evaluation(&self) -> f64 {
        self.previous_evaluation
    }

    pub fn in_match(&self) -> bool {
        self.in_match
    }

    /// Per-tick entry point. Decides only when the action interval has
    /// elapsed; health drops are checked every tick.
    pub fn update(&mut self, now: f64, obs: &Observation, combat: &mut dyn CombatCommands) {
        if !self.in_match {
            return;
        }

        self.last_observation = Some(obs.clone());
        if self.last_self_health.is_none() || self.last_opponent_health.is_none() {
            self.reset_health_tracking();
        }

        if let Some(release_at) = self.block_release_at {
            if now >= release_at {
                combat.set_blocking(false);
                self.block_release_at = None;
            }
        }

        if self.config.use_q_learning && now >= self.next_action_time {
            self.execute_hybrid_step(now, obs, combat);
            self.next_action_time = now + self.config.action_interval;
        }

        self.check_health_changes(obs);
    }

    fn execute_hybrid_step(&mut self, now: f64, obs: &Observation, combat: &mut dyn CombatCommands) {
        let distance_x = obs.horizontal_distance();

        if self.config.use_perceptron {
            let features = self.features(obs, distance_x);
            self.previous_evaluation = self.current_evaluation;
            self.current_evaluation = self.perceptron.evaluate(&features);
        }

        let state = self.state_key(obs, distance_x);
        let action = self.agent.select_action(&state);
        self.last_action = action;
        self.decisions += 1;

        self.execute_action(action, now, distance_x, obs, combat);

        let mut immediate_reward = 0.0;
        if distance_x >= self.config.min_distance && distance_x <= self.config.max_distance {
            immediate_reward += self.config.rewards.ideal_distance;
        }
        if self.config.use_perceptron {
            immediate_reward += self.current_evaluation * self.config.perceptron_reward_weight;
        }

        tracing::debug!(
            state = %state,
            action = %action,
            evaluation = self.current_evaluation,
            reward = immediate_reward,
            "Hybrid step"
        );

        if immediate_reward != 0.0 {
            let next_state = self.state_key(obs, distance_x);
            self.agent.give_reward(immediate_reward, &next_state);
        }
    }

    fn execute_action(
        &mut self,
        action: Action,
        now: f64,
        distance_x: f64,
        obs: &Observation,
        combat: &mut dyn CombatCommands,
    ) {
        match action {
            Action::Idle => {
                self.current_path.clear();
                self.path_index = 0;
                self.last_action_outcome = 0.0;
            }
            Action::Approach => {
                if distance_x > self.config.min_distance {
                    self.request_path_to_opponent(obs);
                    self.last_action_outcome = 0.0;
                }
            }
            Action::Retreat => {
                if distance_x < self.config.max_distance {
                    self.request_path_away_from_opponent(obs);
                    self.last_action_outcome = 0.0;
                }
            }
            Action::LightAttack => {
                if !obs.self_blocking && obs.grounded {
                    combat.request_light_attack();
                }
            }
            Action::HeavyAttack => {
                if !obs.self_blocking && obs.grounded {
                    combat.request_heavy_attack();
                }
            }
            Action::Block => {
                if !obs.self_blocking && self.block_release_at.is_none() {
                    combat.set_blocking(true);
                    self.block_release_at = Some(now + self.config.block_duration);
                    self.last_action_outcome = 0.0;
                }
            }
        }
    }

    fn request_path_to_opponent(&mut self, obs: &Observation) {
        let direction = obs.self_position.direction_to(&obs.opponent_position);
        let target = obs
            .opponent_position
            .offset_x(-direction * self.config.desired_distance);
        self.request_path_to(obs.self_position, target);
    }

    fn request_path_away_from_opponent(&mut self, obs: &Observation) {
        let direction = obs.self_position.direction_to(&obs.opponent_position);
        let target = obs
            .self_position
            .offset_x(-direction * self.config.retreat_offset);
        self.request_path_to(obs.self_position, target);
    }

    /// Replace the current path with one towards `target`; empty when no
    /// path exists.
    fn request_path_to(&mut self, from: Position, target: Position) {
        self.current_path = AStar::find_path_between(&self.graph, from, target).unwrap_or_default();
        self.path_index = 0;
        tracing::trace!(
            nodes = self.current_path.len(),
            length = path_length(&self.graph, &self.current_path),
            "New path"
        );
    }

    /// Horizontal steering along the current path: -1, 0 or +1.
    pub fn move_direction(&mut self, obs: &Observation) -> f64 {
        if obs.self_blocking || self.path_index >= self.current_path.len() {
            return 0.0;
        }

        let self_x = obs.self_position.x;
        let Some(mut target) = self.graph.position(self.current_path[self.path_index]) else {
            return 0.0;
        };
        let mut diff_x = target.x - self_x;

        if diff_x.abs() <= self.config.node_reach_threshold {
            self.path_index += 1;
            if self.path_index >= self.current_path.len() {
                return 0.0;
            }
            match self.graph.position(self.current_path[self.path_index]) {
                Some(next) => target = next,
                None => return 0.0,
            }
            diff_x = target.x - self_x;
        }

        sign(diff_x)
    }

    fn check_health_changes(&mut self, obs: &Observation) {
        if let Some(last) = self.last_self_health {
            if obs.self_health < last {
                self.reward_self_damage(last - obs.self_health);
            }
        }
        if let Some(last) = self.last_opponent_health {
            if obs.opponent_health < last {
                self.reward_opponent_damage(last - obs.opponent_health);
            }
        }
    }

    /// The AI fighter took `amount` damage. The latest observation is
    /// advanced to the post-hit health before rewarding.
    pub fn on_self_damaged(&mut self, amount: i32) {
        let Some(obs) = self.last_observation.as_mut() else {
            tracing::warn!(amount, "Self damage reported before any observation");
            return;
        };
        obs.self_health -= amount;
        self.reward_self_damage(amount);
    }

    /// The opponent took `amount` damage.
    pub fn on_opponent_damaged(&mut self, amount: i32) {
        let Some(obs) = self.last_observation.as_mut() else {
            tracing::warn!(amount, "Opponent damage reported before any observation");
            return;
        };
        obs.opponent_health -= amount;
        self.reward_opponent_damage(amount);
    }

    fn reward_self_damage(&mut self, amount: i32) {
        let reward = self.config.rewards.hit_taken * (amount as f64 / 10.0);
        self.apply_damage_reward(reward);
        self.last_action_outcome = -1.0;
        self.last_self_health = self.last_self_health.map(|h| h - amount);
    }

    fn reward_opponent_damage(&mut self, amount: i32) {
        let reward = self.config.rewards.hit_success * (amount as f64 / 10.0);
        self.apply_damage_reward(reward);
        self.last_action_outcome = 1.0;
        self.last_opponent_health = self.last_opponent_health.map(|h| h - amount);
    }

    /// Reward both learners against the stored, post-damage observation.
    fn apply_damage_reward(&mut self, reward: f64) {
        let Some(obs) = self.last_observation.clone() else {
            return;
        };
        let distance = obs.distance();

        let state = self.state_key(&obs, distance);
        self.agent.give_reward(reward, &state);

        if self.config.use_perceptron {
            let features = self.features(&obs, distance);
            let target = Perceptron::target_for(reward, self.previous_evaluation);
            self.perceptron.train(&features, target);
        }
    }

    fn state_key(&self, obs: &Observation, distance: f64) -> StateKey {
        self.agent.state_key(
            distance,
            obs.opponent_health_ratio(),
            obs.self_health_ratio(),
            obs.opponent_last_action,
            obs.opponent_blocking,
        )
    }

    fn features(&self, obs: &Observation, distance: f64) -> Features {
        Perceptron::featurize(
            distance,
            obs.opponent_health_ratio(),
            obs.self_health_ratio(),
            obs.opponent_blocking,
            self.last_action_outcome,
        )
    }

    fn reset_health_tracking(&mut self) {
        match &self.last_observation {
            Some(obs) => {
                self.last_self_health = Some(obs.self_health);
                self.last_opponent_health = Some(obs.opponent_health);
            }
            None => {
                self.last_self_health = None;
                self.last_opponent_health = None;
            }
        }
    }

    pub fn save(&self, name: &str) {
        self.agent.save_table(name);
        self.perceptron.save_weights(name);
    }

    pub fn load(&mut self, name: &str) {
        self.agent.load_table(name);
        self.perceptron.load_weights(name);
    }

    pub fn debug_info(&self) -> String {
        let mut info = format!("Last Action: {} | ", self.last_action);
        if self.config.use_perceptron {
            info += &format!(
                "State Eval: {:.3} | {}",
                self.current_evaluation,
                self.perceptron.debug_info()
            );
        }
        info
    }
}

impl MatchListener for HybridController {
    fn on_match_start(&mut self) {
        self.agent.on_episode_start();

        // Health is refilled before the event; take fresh baselines on the next update
        self.last_observation = None;
        self.reset_health_tracking();
        self.last_action_outcome = 0.0;
        self.current_evaluation = 0.0;
        self.previous_evaluation = 0.0;

        // The match clock may restart; decide on the first update and drop a
        // block still held from the last match there too
        self.next_action_time = f64::NEG_INFINITY;
        if self.block_release_at.is_some() {
            self.block_release_at = Some(f64::NEG_INFINITY);
        }
        self.in_match = true;
    }

    fn on_match_end(&mut self, result: MatchResult) {
        let rewards = &self.config.rewards;
        let final_reward = match result {
            MatchResult::SelfWin => rewards.win,
            MatchResult::OpponentWin => rewards.lose,
            MatchResult::Draw => rewards.draw,
        };

        if let Some(obs) = self.last_observation.clone() {
            let distance = obs.distance();
            let final_state = self.state_key(&obs, distance);
            self.agent.give_reward(final_reward, &final_state);

            if self.config.use_perceptron {
                let features = self.features(&obs, distance);
                let target = Perceptron::target_for(final_reward, self.current_evaluation);
                self.perceptron.train(&features, target);
                tracing::info!(perceptron = %self.perceptron.debug_info(), "Episode ended");
            }
        } else {
            tracing::warn!(?result, "Match ended without any observation, no terminal reward");
        }

        self.reset_health_tracking();
        self.agent.on_episode_end(result);
        self.in_match = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planners::rl::{NUM_ACTIONS, PerceptronConfig, QLearningConfig};

    #[derive(Default)]
    struct RecordingCombat {
        light: usize,
        heavy: usize,
        blocking: Vec<bool>,
    }

    impl CombatCommands for RecordingCombat {
        fn request_light_attack(&mut self) {
            self.light += 1;
        }

        fn request_heavy_attack(&mut self) {
            self.heavy += 1;
        }

        fn set_blocking(&mut self, blocking: bool) {
            self.blocking.push(blocking);
        }
    }

    fn controller(config: ControllerConfig) -> HybridController {
        let agent = QLearningAgent::with_seed(QLearningConfig::default(), 3);
        let perceptron = Perceptron::with_seed(PerceptronConfig::default(), 5);
        let graph = WaypointGraph::lane(-5.0, 11, 1.0, 0.0);
        let mut controller = HybridController::new(config, agent, perceptron, graph);
        controller.on_match_start();
        controller.agent_mut().set_exploration_rate(0.0);
        controller
    }

    fn observation(self_x: f64, opponent_x: f64) -> Observation {
        Observation {
            self_position: Position::new(self_x, 0.0),
            opponent_position: Position::new(opponent_x, 0.0),
            self_health: 100,
            self_max_health: 100,
            opponent_health: 100,
            opponent_max_health: 100,
            grounded: true,
            ..Default::default()
        }
    }

    fn node_xs(controller: &HybridController) -> Vec<f64> {
        controller
            .current_path()
            .iter()
            .map(|&id| controller.graph().position(id).unwrap().x)
            .collect()
    }

    #[test]
    fn test_decisions_follow_cadence() {
        let mut c = controller(ControllerConfig::default());
        let mut combat = RecordingCombat::default();
        let obs = observation(0.0, 4.0);

        c.update(0.0, &obs, &mut combat);
        assert_eq!(c.decision_count(), 1);
        c.update(0.1, &obs, &mut combat);
        c.update(0.29, &obs, &mut combat);
        assert_eq!(c.decision_count(), 1);
        c.update(0.3, &obs, &mut combat);
        assert_eq!(c.decision_count(), 2);
    }

    #[test]
    fn test_no_decisions_outside_a_match() {
        let mut c = controller(ControllerConfig::default());
        c.on_match_end(MatchResult::Draw);
        let mut combat = RecordingCombat::default();
        c.update(0.0, &observation(0.0, 2.0), &mut combat);
        assert_eq!(c.decision_count(), 0);
    }

    #[test]
    fn test_unseen_state_idles_and_clears_path() {
        let mut c = controller(ControllerConfig::default());
        let mut combat = RecordingCombat::default();
        let obs = observation(-4.0, 4.0);

        c.request_path_to_opponent(&obs);
        assert!(!c.current_path().is_empty());

        c.update(0.0, &obs, &mut combat);
        assert_eq!(c.last_action(), Action::Idle);
        assert!(c.current_path().is_empty());
    }

    #[test]
    fn test_immediate_reward_in_ideal_band() {
        let config = ControllerConfig {
            use_perceptron: false,
            ..Default::default()
        };
        let mut c = controller(config);
        let mut combat = RecordingCombat::default();

        c.update(0.0, &observation(0.0, 2.0), &mut combat);
        assert!((c.agent().last_reward - 1.0).abs() < 1e-12);
        assert_eq!(c.agent().total_actions, 1);

        // Outside the band with no perceptron there is nothing to reward
        c.update(1.0, &observation(0.0, 4.5), &mut combat);
        assert_eq!(c.agent().total_actions, 1);
    }

    #[test]
    fn test_immediate_reward_includes_weighted_evaluation() {
        let mut c = controller(ControllerConfig::default());
        let mut combat = RecordingCombat::default();

        c.update(0.0, &observation(0.0, 4.5), &mut combat);
        let expected = c.current_evaluation() * 0.5;
        assert!((c.agent().last_reward - expected).abs() < 1e-12);
    }

    #[test]
    fn test_approach_paths_to_stand_off_point() {
        let mut c = controller(ControllerConfig::default());
        let mut combat = RecordingCombat::default();
        let obs = observation(-3.0, 3.0);

        c.execute_action(Action::Approach, 0.0, obs.horizontal_distance(), &obs, &mut combat);
        assert_eq!(node_xs(&c), vec![-3.0, -2.0, -1.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_approach_from_the_right() {
        let mut c = controller(ControllerConfig::default());
        let mut combat = RecordingCombat::default();
        let obs = observation(4.0, 0.0);

        c.execute_action(Action::Approach, 0.0, obs.horizontal_distance(), &obs, &mut combat);
        assert_eq!(node_xs(&c), vec![4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_approach_skipped_when_already_close() {
        let mut c = controller(ControllerConfig::default());
        let mut combat = RecordingCombat::default();
        let obs = observation(0.0, 0.5);

        c.execute_action(Action::Approach, 0.0, obs.horizontal_distance(), &obs, &mut combat);
        assert!(c.current_path().is_empty());
    }

    #[test]
    fn test_retreat_paths_away_from_opponent() {
        let mut c = controller(ControllerConfig::default());
        let mut combat = RecordingCombat::default();
        let obs = observation(0.0, 1.0);

        c.execute_action(Action::Retreat, 0.0, obs.horizontal_distance(), &obs, &mut combat);
        assert_eq!(node_xs(&c), vec![0.0, -1.0, -2.0]);

        let far = observation(0.0, 3.5);
        c.execute_action(Action::Idle, 0.0, far.horizontal_distance(), &far, &mut combat);
        c.execute_action(Action::Retreat, 0.0, far.horizontal_distance(), &far, &mut combat);
        assert!(c.current_path().is_empty());
    }

    #[test]
    fn test_attacks_are_gated() {
        let mut c = controller(ControllerConfig::default());
        let mut combat = RecordingCombat::default();
        let mut obs = observation(0.0, 1.0);

        c.execute_action(Action::LightAttack, 0.0, 1.0, &obs, &mut combat);
        c.execute_action(Action::HeavyAttack, 0.0, 1.0, &obs, &mut combat);
        assert_eq!((combat.light, combat.heavy), (1, 1));

        obs.grounded = false;
        c.execute_action(Action::LightAttack, 0.0, 1.0, &obs, &mut combat);
        obs.grounded = true;
        obs.self_blocking = true;
        c.execute_action(Action::HeavyAttack, 0.0, 1.0, &obs, &mut combat);
        assert_eq!((combat.light, combat.heavy), (1, 1));
    }

    #[test]
    fn test_block_is_released_after_duration() {
        let config = ControllerConfig {
            use_q_learning: false,
            ..Default::default()
        };
        let mut c = controller(config);
        let mut combat = RecordingCombat::default();
        let obs = observation(0.0, 1.0);

        c.execute_action(Action::Block, 1.0, 1.0, &obs, &mut combat);
        assert_eq!(combat.blocking, vec![true]);

        c.update(1.5, &obs, &mut combat);
        assert_eq!(combat.blocking, vec![true]);
        c.update(1.7, &obs, &mut combat);
        assert_eq!(combat.blocking, vec![true, false]);
    }

    #[test]
    fn test_greedy_choice_from_learned_values() {
        let mut c = controller(ControllerConfig::default());
        let mut combat = RecordingCombat::default();
        let obs = observation(-4.0, 4.0);

        let key = c.state_key(&obs, obs.horizontal_distance());
        let mut values = [0.0; NUM_ACTIONS];
        values[Action::Approach.index()] = 5.0;
        c.agent_mut().set_q_values(key, values);

        c.update(0.0, &obs, &mut combat);
        assert_eq!(c.last_action(), Action::Approach);
        assert_eq!(node_xs(&c).last(), Some(&3.0));
    }

    #[test]
    fn test_move_direction_walks_the_path() {
        let mut c = controller(ControllerConfig::default());
        let mut combat = RecordingCombat::default();
        let obs = observation(-3.0, 3.0);
        c.execute_action(Action::Approach, 0.0, 6.0, &obs, &mut combat);

        // Standing on the first node moves on to the next
        assert_eq!(c.move_direction(&obs), 1.0);
        assert_eq!(c.move_direction(&observation(-2.5, 3.0)), 1.0);

        let mut blocked = observation(-2.5, 3.0);
        blocked.self_blocking = true;
        assert_eq!(c.move_direction(&blocked), 0.0);

        for x in [-2.0, -1.0, 0.0, 1.0] {
            assert_eq!(c.move_direction(&observation(x, 3.0)), 1.0);
        }
        assert_eq!(c.move_direction(&observation(2.0, 3.0)), 0.0);
        assert_eq!(c.move_direction(&observation(2.0, 3.0)), 0.0);
    }

    #[test]
    fn test_health_drops_reward_both_learners() {
        let config = ControllerConfig {
            use_q_learning: false,
            ..Default::default()
        };
        let mut c = controller(config);
        let mut combat = RecordingCombat::default();
        let mut obs = observation(0.0, 1.0);

        c.update(0.0, &obs, &mut combat);
        obs.opponent_health = 80;
        c.update(0.1, &obs, &mut combat);

        assert!((c.agent().last_reward - 20.0).abs() < 1e-12);
        assert_eq!(c.perceptron().total_updates, 1);
        assert_eq!(c.last_action_outcome, 1.0);

        obs.self_health = 70;
        c.update(0.2, &obs, &mut combat);
        assert!((c.agent().last_reward + 45.0).abs() < 1e-12);
        assert!((c.agent().cumulative_reward + 25.0).abs() < 1e-12);
        assert_eq!(c.perceptron().total_updates, 2);
        assert_eq!(c.last_action_outcome, -1.0);

        // Unchanged health gives nothing further
        c.update(0.3, &obs, &mut combat);
        assert_eq!(c.agent().total_actions, 2);
    }

    #[test]
    fn test_pushed_damage_is_not_counted_twice() {
        let config = ControllerConfig {
            use_q_learning: false,
            ..Default::default()
        };
        let mut c = controller(config);
        let mut combat = RecordingCombat::default();
        let mut obs = observation(0.0, 1.0);

        c.update(0.0, &obs, &mut combat);
        c.on_opponent_damaged(10);
        obs.opponent_health = 90;
        c.update(0.1, &obs, &mut combat);

        assert_eq!(c.agent().total_actions, 1);
        assert!((c.agent().cumulative_reward - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_pushed_damage_rewards_the_post_hit_state() {
        let mut c = controller(ControllerConfig::default());
        let mut combat = RecordingCombat::default();
        let obs = observation(0.0, 1.0);

        c.update(0.0, &obs, &mut combat);
        let pre_hit = c.state_key(&obs, obs.distance());
        assert_eq!(pre_hit.as_str(), "2_9_9_0_0");

        c.on_self_damaged(50);

        let stored = c.last_observation.clone().unwrap();
        assert_eq!(stored.self_health, 50);
        let post_hit = c.state_key(&stored, stored.distance());
        assert_eq!(post_hit.as_str(), "2_9_5_0_0");
        assert!(c.agent().q_values(&post_hit).is_some());
        assert!((c.agent().last_reward + 75.0).abs() < 1e-12);
        assert_eq!(c.last_action_outcome, -1.0);

        // The engine catching up to the same hit is not rewarded again
        let actions = c.agent().total_actions;
        let mut hit = observation(0.0, 1.0);
        hit.self_health = 50;
        c.update(0.1, &hit, &mut combat);
        assert_eq!(c.agent().total_actions, actions);
    }

    #[test]
    fn test_pushed_damage_before_any_observation_is_ignored() {
        let mut c = controller(ControllerConfig::default());

        c.on_opponent_damaged(10);
        c.on_self_damaged(10);

        assert_eq!(c.agent().total_actions, 0);
        assert_eq!(c.perceptron().total_updates, 0);
        assert_eq!(c.last_action_outcome, 0.0);
    }

    #[test]
    fn test_restarted_clock_still_decides_and_releases_block() {
        let mut c = controller(ControllerConfig::default());
        let mut combat = RecordingCombat::default();
        let obs = observation(0.0, 4.0);

        c.update(60.0, &obs, &mut combat);
        c.execute_action(Action::Block, 60.0, 4.0, &obs, &mut combat);
        assert_eq!(combat.blocking, vec![true]);
        c.on_match_end(MatchResult::Draw);

        c.on_match_start();
        let decisions = c.decision_count();
        c.update(0.0, &obs, &mut combat);

        assert_eq!(c.decision_count(), decisions + 1);
        assert!(!combat.blocking[1]);
        for i in 1..=50 {
            c.update(i as f64 * 0.1, &obs, &mut combat);
        }
        assert!(c.decision_count() >= decisions + 10);
    }

    #[test]
    fn test_match_end_gives_terminal_reward() {
        let mut c = controller(ControllerConfig::default());
        let mut combat = RecordingCombat::default();
        c.update(0.0, &observation(0.0, 4.5), &mut combat);
        let before = c.agent().cumulative_reward;
        let updates = c.perceptron().total_updates;

        c.on_match_end(MatchResult::SelfWin);
        assert!((c.agent().cumulative_reward - before - 100.0).abs() < 1e-9);
        assert_eq!(c.perceptron().total_updates, updates + 1);
        assert!(!c.in_match());
    }

    #[test]
    fn test_draw_still_submits_terminal_reward() {
        let mut c = controller(ControllerConfig::default());
        let mut combat = RecordingCombat::default();
        c.update(0.0, &observation(0.0, 4.5), &mut combat);
        let actions = c.agent().total_actions;

        c.on_match_end(MatchResult::Draw);
        assert_eq!(c.agent().total_actions, actions + 1);
        assert_eq!(c.agent().last_reward, 0.0);
    }

    #[test]
    fn test_match_start_resets_evaluation_history() {
        let mut c = controller(ControllerConfig::default());
        let mut combat = RecordingCombat::default();
        c.update(0.0, &observation(0.0, 4.5), &mut combat);
        c.update(0.3, &observation(0.0, 4.5), &mut combat);
        c.on_match_end(MatchResult::OpponentWin);

        let exploration = c.agent().exploration_rate();
        c.agent_mut().set_exploration_rate(0.5);
        c.on_match_start();

        assert_eq!(c.current_evaluation(), 0.0);
        assert_eq!(c.previous_evaluation(), 0.0);
        assert_eq!(c.last_action_outcome, 0.0);
        assert!(c.agent().exploration_rate() < 0.5);
        assert_eq!(exploration, 0.0);
        assert!(c.in_match());
    }

    #[test]
    fn test_health_refill_between_matches_is_not_a_reward() {
        let config = ControllerConfig {
            use_q_learning: false,
            ..Default::default()
        };
        let mut c = controller(config);
        let mut combat = RecordingCombat::default();
        let mut obs = observation(0.0, 1.0);
        obs.self_health = 10;
        c.update(0.0, &obs, &mut combat);
        c.on_match_end(MatchResult::OpponentWin);
        let actions = c.agent().total_actions;

        c.on_match_start();
        c.update(0.0, &observation(0.0, 1.0), &mut combat);
        obs = observation(0.0, 1.0);
        obs.self_health = 95;
        c.update(0.1, &obs, &mut combat);

        assert_eq!(c.agent().total_actions, actions + 1);
        assert!((c.agent().last_reward + 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_spawned_controller_follows_events_and_unsubscribes_on_drop() {
        let events = MatchEvents::new();
        let agent = QLearningAgent::with_seed(QLearningConfig::default(), 1);
        let perceptron = Perceptron::with_seed(PerceptronConfig::default(), 1);
        let graph = WaypointGraph::lane(0.0, 3, 1.0, 0.0);
        let c = HybridController::spawn(
            ControllerConfig::default(),
            agent,
            perceptron,
            graph,
            &events,
        );

        events.emit_match_start();
        assert!(c.borrow().in_match());
        assert_eq!(c.borrow().agent().total_episodes, 1);

        events.emit_match_end(MatchResult::Draw);
        assert!(!c.borrow().in_match());

        assert_eq!(events.listener_count(), 1);
        drop(c);
        assert_eq!(events.listener_count(), 0);
    }

    #[test]
    fn test_detach() {
        let events = MatchEvents::new();
        let agent = QLearningAgent::with_seed(QLearningConfig::default(), 1);
        let perceptron = Perceptron::with_seed(PerceptronConfig::default(), 1);
        let c = HybridController::spawn(
            ControllerConfig::default(),
            agent,
            perceptron,
            WaypointGraph::default(),
            &events,
        );

        c.borrow_mut().detach();
        events.emit_match_start();
        assert!(!c.borrow().in_match());
    }

    #[test]
    fn test_empty_graph_leaves_no_path() {
        let agent = QLearningAgent::with_seed(QLearningConfig::default(), 1);
        let perceptron = Perceptron::with_seed(PerceptronConfig::default(), 1);
        let mut c = HybridController::new(
            ControllerConfig::default(),
            agent,
            perceptron,
            WaypointGraph::default(),
        );
        let mut combat = RecordingCombat::default();
        let obs = observation(-3.0, 3.0);

        c.execute_action(Action::Approach, 0.0, 6.0, &obs, &mut combat);
        assert!(c.current_path().is_empty());
        assert_eq!(c.move_direction(&obs), 0.0);
    }
}
