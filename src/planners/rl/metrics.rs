//! Rolling training statistics across matches

use std::collections::VecDeque;
use std::time::Instant;

use crate::infra::MatchResult;

/// Moving average calculator
#[derive(Debug, Clone)]
pub struct MovingAverage {
    values: VecDeque<f64>,
    window_size: usize,
    sum: f64,
}

impl MovingAverage {
    pub fn new(window_size: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(window_size),
            window_size,
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.window_size {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
        self.values.push_back(value);
        self.sum += value;
    }

    pub fn average(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum / self.values.len() as f64
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Per-episode reward and outcome over a recent window, plus lifetime tallies.
#[derive(Debug)]
pub struct TrainingMetrics {
    /// Reward collected in each recent episode
    pub episode_rewards: MovingAverage,
    /// 1.0 for a win, 0.0 otherwise
    pub win_rate: MovingAverage,
    pub episodes: usize,
    pub wins: usize,
    pub losses: usize,
    pub draws: usize,
    /// Cumulative reward when the current episode started
    episode_start_reward: f64,
    start_time: Instant,
}

impl TrainingMetrics {
    pub fn new(window_size: usize) -> Self {
        Self {
            episode_rewards: MovingAverage::new(window_size),
            win_rate: MovingAverage::new(window_size),
            episodes: 0,
            wins: 0,
            losses: 0,
            draws: 0,
            episode_start_reward: 0.0,
            start_time: Instant::now(),
        }
    }

    pub fn start_episode(&mut self, cumulative_reward: f64) {
        self.episode_start_reward = cumulative_reward;
    }

    /// Record a finished episode; returns the reward it collected.
    pub fn record_episode(&mut self, cumulative_reward: f64, result: MatchResult) -> f64 {
        let reward = cumulative_reward - self.episode_start_reward;
        self.episodes += 1;
        self.episode_rewards.push(reward);
        self.win_rate.push(if result == MatchResult::SelfWin { 1.0 } else { 0.0 });

        match result {
            MatchResult::SelfWin => self.wins += 1,
            MatchResult::OpponentWin => self.losses += 1,
            MatchResult::Draw => self.draws += 1,
        }

        reward
    }

    pub fn average_reward(&self) -> f64 {
        self.episode_rewards.average()
    }

    /// Recent win rate in percent
    pub fn recent_win_rate(&self) -> f64 {
        self.win_rate.average() * 100.0
    }

    /// Lifetime share of `count` in percent
    pub fn rate(&self, count: usize) -> f64 {
        if self.episodes == 0 {
            0.0
        } else {
            count as f64 / self.episodes as f64 * 100.0
        }
    }

    pub fn log_episode(&self, episode: u32, reward: f64, perceptron_info: &str) {
        tracing::info!(
            "Ep {} | Reward: {:.1} | Avg: {:.1} | Win: {:.1}% | Perceptron: {}",
            episode,
            reward,
            self.average_reward(),
            self.recent_win_rate(),
            perceptron_info
        );
    }

    pub fn print_summary(&self) {
        tracing::info!("=== Training Summary ===");
        tracing::info!("Episodes: {}", self.episodes);
        tracing::info!("AI wins: {} ({:.1}%)", self.wins, self.rate(self.wins));
        tracing::info!("Opponent wins: {} ({:.1}%)", self.losses, self.rate(self.losses));
        tracing::info!("Draws: {} ({:.1}%)", self.draws, self.rate(self.draws));
        tracing::info!(
            "Recent: avg reward {:.1}, win rate {:.1}%",
            self.average_reward(),
            self.recent_win_rate()
        );
        tracing::info!("Duration: {:.2}s", self.start_time.elapsed().as_secs_f64());
    }

    /// Log intent to export the tallies under `name`; nothing is written.
    pub fn export(&self, name: &str) {
        tracing::info!(
            episodes = self.episodes,
            wins = self.wins,
            losses = self.losses,
            draws = self.draws,
            "Exporting training metrics to {}",
            name
        );
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average() {
        let mut avg = MovingAverage::new(3);
        assert!(avg.is_empty());

        avg.push(1.0);
        assert!((avg.average() - 1.0).abs() < 1e-9);

        avg.push(2.0);
        assert!((avg.average() - 1.5).abs() < 1e-9);

        avg.push(3.0);
        assert!((avg.average() - 2.0).abs() < 1e-9);

        avg.push(4.0); // Pushes out 1.0
        assert!((avg.average() - 3.0).abs() < 1e-9);
        assert_eq!(avg.len(), 3);
    }

    #[test]
    fn test_record_episode() {
        let mut metrics = TrainingMetrics::new(2);

        metrics.start_episode(0.0);
        assert!((metrics.record_episode(40.0, MatchResult::SelfWin) - 40.0).abs() < 1e-9);
        metrics.start_episode(40.0);
        assert!((metrics.record_episode(20.0, MatchResult::OpponentWin) + 20.0).abs() < 1e-9);

        assert_eq!(metrics.episodes, 2);
        assert!((metrics.average_reward() - 10.0).abs() < 1e-9);
        assert!((metrics.recent_win_rate() - 50.0).abs() < 1e-9);

        metrics.start_episode(20.0);
        metrics.record_episode(20.0, MatchResult::Draw);
        // Window of two: the win has dropped out
        assert_eq!(metrics.recent_win_rate(), 0.0);
        assert_eq!((metrics.wins, metrics.losses, metrics.draws), (1, 1, 1));
        assert!((metrics.rate(metrics.wins) - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_export_leaves_tallies_alone() {
        let mut metrics = TrainingMetrics::default();
        metrics.start_episode(0.0);
        metrics.record_episode(5.0, MatchResult::SelfWin);

        metrics.export("run");
        assert_eq!(metrics.episodes, 1);
        assert_eq!(metrics.wins, 1);
        assert!((metrics.average_reward() - 5.0).abs() < 1e-9);
    }
}
