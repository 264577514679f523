//! Single tanh unit that scores how favourable a combat state is

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of features produced by [`Perceptron::featurize`]
pub const FEATURE_COUNT: usize = 5;

/// Distance that maps to a feature value of 1.0
pub const DISTANCE_SCALE: f64 = 5.0;

/// Step applied to the current evaluation when building a training target
const TARGET_NUDGE: f64 = 0.1;

pub type Features = [f64; FEATURE_COUNT];

#[derive(Debug, Clone)]
pub struct PerceptronConfig {
    pub learning_rate: f64,
    pub input_size: usize,
}

impl Default for PerceptronConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            input_size: FEATURE_COUNT,
        }
    }
}

pub struct Perceptron {
    config: PerceptronConfig,
    weights: Vec<f64>,
    bias: f64,
    rng: StdRng,

    pub total_updates: u64,
    pub last_output: f64,
    pub last_error: f64,
}

impl Perceptron {
    pub fn new(config: PerceptronConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    pub fn with_seed(config: PerceptronConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: PerceptronConfig, rng: StdRng) -> Self {
        let mut perceptron = Self {
            weights: Vec::new(),
            bias: 0.0,
            config,
            rng,
            total_updates: 0,
            last_output: 0.0,
            last_error: 0.0,
        };
        perceptron.initialize_weights();
        perceptron
    }

    fn initialize_weights(&mut self) {
        let rng = &mut self.rng;
        self.weights = (0..self.config.input_size)
            .map(|_| rng.random_range(-0.5..=0.5))
            .collect();
        self.bias = self.rng.random_range(-0.5..=0.5);

        tracing::debug!(inputs = self.config.input_size, "Perceptron initialized");
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// `tanh(bias + weights . inputs)`, always in `[-1, 1]`.
    ///
    /// A wrong input length is a caller bug: it is logged and scores 0.
    pub fn evaluate(&mut self, inputs: &[f64]) -> f64 {
        if inputs.len() != self.config.input_size {
            tracing::error!(
                expected = self.config.input_size,
                got = inputs.len(),
                "Wrong perceptron input size"
            );
            return 0.0;
        }

        let sum = self.bias
            + self
                .weights
                .iter()
                .zip(inputs)
                .map(|(w, x)| w * x)
                .sum::<f64>();

        self.last_output = sum.tanh();
        self.last_output
    }

    /// One online gradient step towards `target`.
    pub fn train(&mut self, inputs: &[f64], target: f64) {
        if inputs.len() != self.config.input_size {
            tracing::error!(
                expected = self.config.input_size,
                got = inputs.len(),
                "Wrong perceptron input size for training"
            );
            return;
        }

        let predicted = self.evaluate(inputs);
        self.last_error = target - predicted;
        let derivative = 1.0 - predicted * predicted;
        let step = self.config.learning_rate * self.last_error * derivative;

        for (w, x) in self.weights.iter_mut().zip(inputs) {
            *w += step * x;
        }
        self.bias += step;
        self.total_updates += 1;
    }

    /// Normalise raw observables into the feature vector.
    pub fn featurize(
        distance: f64,
        opponent_health_ratio: f64,
        self_health_ratio: f64,
        opponent_blocking: bool,
        last_action_outcome: f64,
    ) -> Features {
        [
            (distance / DISTANCE_SCALE).clamp(0.0, 1.0),
            opponent_health_ratio.clamp(0.0, 1.0),
            self_health_ratio.clamp(0.0, 1.0),
            if opponent_blocking { 1.0 } else { 0.0 },
            last_action_outcome.clamp(-1.0, 1.0),
        ]
    }

    /// Training target: the current evaluation nudged by a fixed step in the
    /// direction of the reward's sign.
    pub fn target_for(reward: f64, current_evaluation: f64) -> f64 {
        let target = if reward > 0.0 {
            current_evaluation + TARGET_NUDGE
        } else if reward < 0.0 {
            current_evaluation - TARGET_NUDGE
        } else {
            current_evaluation
        };
        target.clamp(-1.0, 1.0)
    }

    /// Re-randomise the weights and clear the counters.
    pub fn reset(&mut self) {
        self.initialize_weights();
        self.total_updates = 0;
        self.last_output = 0.0;
        self.last_error = 0.0;
        tracing::info!("Perceptron reset");
    }

    pub fn debug_info(&self) -> String {
        format!(
            "Updates: {} | Last Output: {:.3} | Last Error: {:.3}",
            self.total_updates, self.last_output, self.last_error
        )
    }

    pub fn log_weights(&self) {
        let weights: Vec<String> = self.weights.iter().map(|w| format!("{:.3}", w)).collect();
        tracing::info!("Perceptron weights: [{}] | Bias: {:.3}", weights.join(", "), self.bias);
    }

    pub fn save_weights(&self, name: &str) {
        tracing::info!("Saving perceptron weights to {}", name);
    }

    pub fn load_weights(&mut self, name: &str) {
        tracing::info!("Loading perceptron weights from {}", name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perceptron() -> Perceptron {
        Perceptron::with_seed(PerceptronConfig::default(), 11)
    }

    #[test]
    fn test_initial_weights_in_range() {
        let p = perceptron();
        assert_eq!(p.weights().len(), FEATURE_COUNT);
        assert!(p.weights().iter().all(|w| (-0.5..=0.5).contains(w)));
        assert!((-0.5..=0.5).contains(&p.bias()));
    }

    #[test]
    fn test_evaluate_is_bounded() {
        let mut p = perceptron();
        for scale in [-1e6, -10.0, -1.0, 0.0, 0.3, 1.0, 25.0, 1e9] {
            let out = p.evaluate(&[scale; FEATURE_COUNT]);
            assert!((-1.0..=1.0).contains(&out), "out of range: {}", out);
        }
    }

    #[test]
    fn test_evaluate_matches_tanh_of_linear_sum() {
        let mut p = perceptron();
        let x = [0.2, 0.4, 0.6, 1.0, -0.5];
        let expected = (p.bias()
            + p.weights().iter().zip(x.iter()).map(|(w, v)| w * v).sum::<f64>())
        .tanh();
        assert!((p.evaluate(&x) - expected).abs() < 1e-12);
        assert!((p.last_output - expected).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_input_size_scores_zero() {
        let mut p = perceptron();
        assert_eq!(p.evaluate(&[1.0, 2.0]), 0.0);

        let before = p.weights().to_vec();
        p.train(&[1.0; 7], 1.0);
        assert_eq!(p.weights(), before.as_slice());
        assert_eq!(p.total_updates, 0);
    }

    #[test]
    fn test_train_applies_gradient_step() {
        let mut p = perceptron();
        let x = [0.5, 1.0, 0.0, 1.0, -1.0];
        let weights = p.weights().to_vec();
        let bias = p.bias();
        let predicted = p.evaluate(&x);
        let target = 0.9;

        p.train(&x, target);

        let step = 0.1 * (target - predicted) * (1.0 - predicted * predicted);
        for i in 0..FEATURE_COUNT {
            assert!((p.weights()[i] - (weights[i] + step * x[i])).abs() < 1e-12);
        }
        assert!((p.bias() - (bias + step)).abs() < 1e-12);
        assert!((p.last_error - (target - predicted)).abs() < 1e-12);
        assert_eq!(p.total_updates, 1);
    }

    #[test]
    fn test_training_moves_output_towards_target() {
        let mut p = perceptron();
        let x = [0.3, 0.8, 0.6, 0.0, 1.0];
        let start = p.evaluate(&x);
        for _ in 0..200 {
            p.train(&x, 0.8);
        }
        let end = p.evaluate(&x);
        assert!((0.8 - end).abs() < (0.8 - start).abs() || (0.8 - start).abs() < 1e-3);
    }

    #[test]
    fn test_featurize_clamps() {
        let f = Perceptron::featurize(12.0, 1.4, -0.2, true, -3.0);
        assert_eq!(f, [1.0, 1.0, 0.0, 1.0, -1.0]);

        let f = Perceptron::featurize(2.5, 0.73, 0.2, false, 0.5);
        assert_eq!(f, [0.5, 0.73, 0.2, 0.0, 0.5]);
    }

    #[test]
    fn test_target_for() {
        assert!((Perceptron::target_for(10.0, 0.2) - 0.3).abs() < 1e-12);
        assert!((Perceptron::target_for(0.001, 0.2) - 0.3).abs() < 1e-12);
        assert!((Perceptron::target_for(-50.0, 0.2) - 0.1).abs() < 1e-12);
        assert_eq!(Perceptron::target_for(0.0, 0.2), 0.2);
        assert_eq!(Perceptron::target_for(10.0, 0.95), 1.0);
        assert_eq!(Perceptron::target_for(-10.0, -0.97), -1.0);
        assert_eq!(Perceptron::target_for(10.0, 3.0), 1.0);
    }

    #[test]
    fn test_reset() {
        let mut p = perceptron();
        p.train(&[1.0; FEATURE_COUNT], 1.0);
        p.reset();
        assert_eq!(p.total_updates, 0);
        assert_eq!(p.last_output, 0.0);
        assert_eq!(p.weights().len(), FEATURE_COUNT);
    }
}
