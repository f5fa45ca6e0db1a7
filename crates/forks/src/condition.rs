use alloy_primitives::U256;

/// The condition under which a hardfork activates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForkCondition {
    /// The fork activates at a fixed block number.
    Block(u64),
    /// The fork activates once the chain's total difficulty reaches the given
    /// value; the proof-of-stake transition works this way. Callers resolve
    /// it against the parent's total difficulty.
    TotalDifficulty(U256),
    /// The fork is never active.
    #[default]
    Never,
}

impl ForkCondition {
    /// Returns the activation block number, if the condition is block based.
    pub const fn as_block(&self) -> Option<u64> {
        match self {
            Self::Block(block) => Some(*block),
            _ => None,
        }
    }

    /// Whether the fork is active at the given block number.
    pub const fn active_at_block(&self, number: u64) -> bool {
        match self {
            Self::Block(block) => number >= *block,
            _ => false,
        }
    }

    /// Whether the fork is active at the given total difficulty.
    pub fn active_at_ttd(&self, td: U256) -> bool {
        match self {
            Self::TotalDifficulty(ttd) => td >= *ttd,
            _ => false,
        }
    }
}
