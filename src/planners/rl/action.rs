use std::fmt;

/// Number of discrete actions, and the length of every Q-value row.
pub const NUM_ACTIONS: usize = 6;

/// Discrete combat/movement decision.
///
/// The discriminant is the action's slot in a Q-value row and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(usize)]
pub enum Action {
    #[default]
    Idle = 0,
    Approach = 1,
    Retreat = 2,
    LightAttack = 3,
    HeavyAttack = 4,
    Block = 5,
}

impl Action {
    pub const ALL: [Action; NUM_ACTIONS] = [
        Action::Idle,
        Action::Approach,
        Action::Retreat,
        Action::LightAttack,
        Action::HeavyAttack,
        Action::Block,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Action> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::Idle => "Idle",
            Action::Approach => "Approach",
            Action::Retreat => "Retreat",
            Action::LightAttack => "LightAttack",
            Action::HeavyAttack => "HeavyAttack",
            Action::Block => "Block",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
