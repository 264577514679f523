//! Tabular Q-learning over discretised combat states

use std::collections::HashMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::infra::{MatchListener, MatchResult};

use super::action::{Action, NUM_ACTIONS};

/// Q-learning configuration
#[derive(Debug, Clone)]
pub struct QLearningConfig {
    /// Alpha
    pub learning_rate: f64,
    /// Gamma
    pub discount_factor: f64,
    /// Starting epsilon
    pub exploration_rate: f64,
    /// Epsilon never decays below this
    pub min_exploration_rate: f64,
    /// Multiplied into epsilon at every episode start
    pub exploration_decay: f64,
    /// Number of distance buckets
    pub distance_bins: usize,
    /// Number of buckets for each health ratio
    pub health_bins: usize,
    /// Distance covered by the distance buckets; anything further lands in the last one
    pub max_distance: f64,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.95,
            exploration_rate: 1.0,
            min_exploration_rate: 0.01,
            exploration_decay: 0.995,
            distance_bins: 10,
            health_bins: 10,
            max_distance: 5.0,
        }
    }
}

/// Canonical table key: `dist_opponentHp_selfHp_opponentAction_blocking`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey(String);

impl StateKey {
    pub fn new(
        distance_bin: usize,
        opponent_health_bin: usize,
        self_health_bin: usize,
        opponent_last_action: i32,
        opponent_blocking: bool,
    ) -> Self {
        Self(format!(
            "{}_{}_{}_{}_{}",
            distance_bin,
            opponent_health_bin,
            self_health_bin,
            opponent_last_action,
            u8::from(opponent_blocking)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map `value` in `[0, range)` onto `bins` equal buckets, clamping outliers.
fn bin(value: f64, range: f64, bins: usize) -> usize {
    let raw = (value / range * bins as f64).floor();
    if raw.is_nan() || raw < 0.0 {
        0
    } else {
        (raw as usize).min(bins.saturating_sub(1))
    }
}

/// Epsilon-greedy Q-learning agent.
///
/// The table grows by one row per distinct state key and is never pruned.
pub struct QLearningAgent {
    config: QLearningConfig,
    q_table: HashMap<StateKey, [f64; NUM_ACTIONS]>,
    exploration_rate: f64,
    /// State and action of the last `select_action`, the pair the next reward applies to
    current_state: Option<StateKey>,
    current_action: Action,
    rng: StdRng,

    pub total_episodes: u32,
    pub cumulative_reward: f64,
    pub episode_reward: f64,
    pub total_actions: u64,
    pub last_reward: f64,
}

impl QLearningAgent {
    pub fn new(config: QLearningConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    pub fn with_seed(config: QLearningConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: QLearningConfig, rng: StdRng) -> Self {
        Self {
            exploration_rate: config.exploration_rate,
            config,
            q_table: HashMap::new(),
            current_state: None,
            current_action: Action::Idle,
            rng,
            total_episodes: 0,
            cumulative_reward: 0.0,
            episode_reward: 0.0,
            total_actions: 0,
            last_reward: 0.0,
        }
    }

    pub fn config(&self) -> &QLearningConfig {
        &self.config
    }

    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    pub fn set_exploration_rate(&mut self, rate: f64) {
        self.exploration_rate = rate.clamp(0.0, 1.0);
    }

    pub fn current_action(&self) -> Action {
        self.current_action
    }

    pub fn current_state(&self) -> Option<&StateKey> {
        self.current_state.as_ref()
    }

    /// Discretise the observables into a table key.
    ///
    /// Distance is bucketed over `[0, max_distance)`, health ratios over `[0, 1)`.
    pub fn state_key(
        &self,
        distance: f64,
        opponent_health_ratio: f64,
        self_health_ratio: f64,
        opponent_last_action: i32,
        opponent_blocking: bool,
    ) -> StateKey {
        let health_bins = self.config.health_bins;
        StateKey::new(
            bin(distance, self.config.max_distance, self.config.distance_bins),
            bin(opponent_health_ratio, 1.0, health_bins),
            bin(self_health_ratio, 1.0, health_bins),
            opponent_last_action,
            opponent_blocking,
        )
    }

    /// Epsilon-greedy choice. Remembers the state and action for the next
    /// [`give_reward`](Self::give_reward).
    pub fn select_action(&mut self, state: &StateKey) -> Action {
        self.current_state = Some(state.clone());

        self.current_action = if self.rng.random::<f64>() < self.exploration_rate {
            Action::ALL[self.rng.random_range(0..NUM_ACTIONS)]
        } else {
            self.best_action(state)
        };

        self.current_action
    }

    /// Highest-valued action; the lowest ordinal wins ties.
    pub fn best_action(&mut self, state: &StateKey) -> Action {
        let values = self.values_mut(state);
        let mut best = 0;
        for i in 1..NUM_ACTIONS {
            if values[i] > values[best] {
                best = i;
            }
        }
        Action::ALL[best]
    }

    /// Q-learning update of the last selected `(state, action)` towards
    /// `reward + gamma * max Q(next_state)`.
    pub fn give_reward(&mut self, reward: f64, next_state: &StateKey) {
        self.episode_reward += reward;
        self.cumulative_reward += reward;
        self.last_reward = reward;
        self.total_actions += 1;

        let max_next_q = self
            .values_mut(next_state)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        let Some(state) = self.current_state.clone() else {
            tracing::warn!(reward, "Reward given before any action was selected");
            return;
        };

        let alpha = self.config.learning_rate;
        let gamma = self.config.discount_factor;
        let index = self.current_action.index();
        let values = self.values_mut(&state);
        let current_q = values[index];
        values[index] = current_q + alpha * (reward + gamma * max_next_q - current_q);
    }

    /// Values for a state without creating a row.
    pub fn q_values(&self, state: &StateKey) -> Option<&[f64; NUM_ACTIONS]> {
        self.q_table.get(state)
    }

    /// Overwrite a row, e.g. to seed the table with known values.
    pub fn set_q_values(&mut self, state: StateKey, values: [f64; NUM_ACTIONS]) {
        self.q_table.insert(state, values);
    }

    fn values_mut(&mut self, state: &StateKey) -> &mut [f64; NUM_ACTIONS] {
        self.q_table
            .entry(state.clone())
            .or_insert([0.0; NUM_ACTIONS])
    }

    pub fn table_len(&self) -> usize {
        self.q_table.len()
    }

    pub fn on_episode_start(&mut self) {
        self.total_episodes += 1;
        self.episode_reward = 0.0;
        self.exploration_rate = (self.exploration_rate * self.config.exploration_decay)
            .max(self.config.min_exploration_rate);

        tracing::info!(
            episode = self.total_episodes,
            exploration = self.exploration_rate,
            "Episode started"
        );
    }

    /// Logs the episode; terminal rewards must already have been given.
    pub fn on_episode_end(&mut self, result: MatchResult) {
        tracing::info!(
            episode = self.total_episodes,
            reward = self.episode_reward,
            cumulative_reward = self.cumulative_reward,
            states = self.q_table.len(),
            ?result,
            "Episode ended"
        );
    }

    pub fn save_table(&self, name: &str) {
        tracing::info!("Saving Q-table with {} states to {}", self.q_table.len(), name);
    }

    pub fn load_table(&mut self, name: &str) {
        tracing::info!("Loading Q-table from {}", name);
    }

    pub fn debug_info(&self) -> String {
        format!(
            "Episodes: {} | Exploration: {:.3} | Last Reward: {:.1} | Q-States: {}",
            self.total_episodes,
            self.exploration_rate,
            self.last_reward,
            self.q_table.len()
        )
    }
}

impl MatchListener for QLearningAgent {
    fn on_match_start(&mut self) {
        self.on_episode_start();
    }

    fn on_match_end(&mut self, result: MatchResult) {
        self.on_episode_end(result);
    }
}
