use crate::infra::{MatchEvents, MatchResult};

/// Runs the match lifecycle: timer, knockouts, tallies, and the
/// start/end events listeners subscribe to.
pub struct MatchCoordinator {
    events: MatchEvents,
    match_duration: f64,
    timer: f64,
    in_progress: bool,
    pub current_episode: u32,
    pub self_wins: u32,
    pub opponent_wins: u32,
    pub draws: u32,
}

impl MatchCoordinator {
    pub fn new(events: MatchEvents, match_duration: f64) -> Self {
        Self {
            events,
            match_duration,
            timer: 0.0,
            in_progress: false,
            current_episode: 0,
            self_wins: 0,
            opponent_wins: 0,
            draws: 0,
        }
    }

    pub fn events(&self) -> &MatchEvents {
        &self.events
    }

    pub fn is_match_in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn time_remaining(&self) -> f64 {
        self.timer
    }

    /// Fighters must already be reset when this is called.
    pub fn start_match(&mut self) {
        self.current_episode += 1;
        self.in_progress = true;
        self.timer = self.match_duration;

        tracing::info!("=== EPISODE {} STARTED ===", self.current_episode);
        self.events.emit_match_start();
    }

    /// Advance the timer and check for a knockout. Returns the result if the
    /// match ended during this tick.
    pub fn tick(&mut self, dt: f64, self_alive: bool, opponent_alive: bool) -> Option<MatchResult> {
        if !self.in_progress {
            return None;
        }

        self.timer -= dt;
        let result = if self.timer <= 0.0 {
            MatchResult::Draw
        } else if !opponent_alive {
            MatchResult::SelfWin
        } else if !self_alive {
            MatchResult::OpponentWin
        } else {
            return None;
        };

        self.end_match(result);
        Some(result)
    }

    /// End the running match; ignored when none is running.
    pub fn end_match(&mut self, result: MatchResult) {
        if !self.in_progress {
            return;
        }
        self.in_progress = false;

        match result {
            MatchResult::SelfWin => self.self_wins += 1,
            MatchResult::OpponentWin => self.opponent_wins += 1,
            MatchResult::Draw => self.draws += 1,
        }
        tracing::info!(">>> {:?} (Episode {})", result, self.current_episode);

        self.events.emit_match_end(result);
        self.log_stats();
    }

    pub fn win_rate(&self, wins: u32) -> f64 {
        if self.current_episode == 0 {
            0.0
        } else {
            wins as f64 / self.current_episode as f64 * 100.0
        }
    }

    fn log_stats(&self) {
        tracing::debug!(
            "Episodes: {} | AI: {} ({:.1}%) | Opponent: {} ({:.1}%) | Draws: {} ({:.1}%)",
            self.current_episode,
            self.self_wins,
            self.win_rate(self.self_wins),
            self.opponent_wins,
            self.win_rate(self.opponent_wins),
            self.draws,
            self.win_rate(self.draws)
        );
    }
}
