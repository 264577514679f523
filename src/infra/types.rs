/// A point in the arena. Fighting happens along `x`; `y` only matters for
/// nodes placed on different heights.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        self.distance_squared(other).sqrt()
    }

    pub fn distance_squared(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn horizontal_distance(&self, other: &Position) -> f64 {
        (self.x - other.x).abs()
    }

    /// Sign of the horizontal offset towards `other` (-1, 0 or +1).
    pub fn direction_to(&self, other: &Position) -> f64 {
        sign(other.x - self.x)
    }

    pub fn offset_x(&self, dx: f64) -> Position {
        Position::new(self.x + dx, self.y)
    }
}

/// Like a game engine's sign: zero maps to +1.
pub fn sign(value: f64) -> f64 {
    if value >= 0.0 { 1.0 } else { -1.0 }
}
