use crate::infra::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackKind {
    Light,
    Heavy,
}

#[derive(Debug, Clone)]
pub struct CombatStats {
    pub attack_range: f64,
    pub light_damage: i32,
    pub heavy_damage: i32,
    pub light_cooldown: f64,
    pub heavy_cooldown: f64,
    /// Share of damage that still lands through a block, rounded up
    pub block_damage_multiplier: f64,
    pub move_speed: f64,
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            attack_range: 1.3,
            light_damage: 8,
            heavy_damage: 16,
            light_cooldown: 0.5,
            heavy_cooldown: 1.0,
            block_damage_multiplier: 0.3,
            move_speed: 6.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fighter {
    pub position: Position,
    pub health: i32,
    pub max_health: i32,
    pub blocking: bool,
    pub stats: CombatStats,
    next_light_at: f64,
    next_heavy_at: f64,
}

impl Fighter {
    pub fn new(position: Position, max_health: i32, stats: CombatStats) -> Self {
        Self {
            position,
            health: max_health,
            max_health,
            blocking: false,
            stats,
            next_light_at: 0.0,
            next_heavy_at: 0.0,
        }
    }

    /// Back to full health at `position`, cooldowns cleared.
    pub fn reset(&mut self, position: Position) {
        self.position = position;
        self.health = self.max_health;
        self.blocking = false;
        self.next_light_at = 0.0;
        self.next_heavy_at = 0.0;
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Apply a hit, reduced while blocking. Returns the damage taken.
    pub fn receive_damage(&mut self, amount: i32) -> i32 {
        if !self.is_alive() {
            return 0;
        }
        let taken = if self.blocking {
            (amount as f64 * self.stats.block_damage_multiplier).ceil() as i32
        } else {
            amount
        };
        self.health = (self.health - taken).max(0);
        taken
    }

    pub fn can_attack(&self, kind: AttackKind, now: f64) -> bool {
        match kind {
            AttackKind::Light => now >= self.next_light_at,
            AttackKind::Heavy => now >= self.next_heavy_at,
        }
    }

    /// Swing at `target`. Out of reach or on cooldown does nothing; a swing
    /// that starts always uses the cooldown. Returns damage dealt on a hit.
    pub fn attack(&mut self, kind: AttackKind, now: f64, target: &mut Fighter) -> Option<i32> {
        if !self.can_attack(kind, now) {
            return None;
        }
        let distance = self.position.horizontal_distance(&target.position);
        if distance > self.stats.attack_range + 0.2 {
            return None;
        }

        let damage = match kind {
            AttackKind::Light => {
                self.next_light_at = now + self.stats.light_cooldown;
                self.stats.light_damage
            }
            AttackKind::Heavy => {
                self.next_heavy_at = now + self.stats.heavy_cooldown;
                self.stats.heavy_damage
            }
        };

        if distance <= self.stats.attack_range {
            Some(target.receive_damage(damage))
        } else {
            tracing::trace!(?kind, "Attack missed");
            None
        }
    }
}
