use std::{fmt, str::FromStr};

/// The name of an Ethereum hardfork.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum Hardfork {
    /// Frontier, the genesis rule set.
    Frontier,
    /// Homestead.
    Homestead,
    /// The DAO fork.
    Dao,
    /// Tangerine Whistle.
    Tangerine,
    /// Spurious Dragon.
    SpuriousDragon,
    /// Byzantium.
    Byzantium,
    /// Constantinople.
    Constantinople,
    /// Petersburg.
    Petersburg,
    /// Istanbul.
    Istanbul,
    /// Muir Glacier.
    MuirGlacier,
    /// Berlin.
    Berlin,
    /// London, which activates EIP-1559.
    London,
    /// Arrow Glacier.
    ArrowGlacier,
    /// Gray Glacier.
    GrayGlacier,
    /// Paris, the proof-of-stake transition, activated by total difficulty.
    Paris,
}

impl Hardfork {
    /// Returns `true` if this fork is at or after London, i.e. blocks carry a
    /// base fee.
    pub fn is_london_active(&self) -> bool {
        *self >= Self::London
    }
}

impl fmt::Display for Hardfork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Error returned for an unrecognized hardfork name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hardfork: {0}")]
pub struct UnknownHardfork(String);

impl FromStr for Hardfork {
    type Err = UnknownHardfork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fork = match s.to_lowercase().as_str() {
            "frontier" | "chainstart" => Self::Frontier,
            "homestead" => Self::Homestead,
            "dao" => Self::Dao,
            "tangerine" => Self::Tangerine,
            "spuriousdragon" => Self::SpuriousDragon,
            "byzantium" => Self::Byzantium,
            "constantinople" => Self::Constantinople,
            "petersburg" => Self::Petersburg,
            "istanbul" => Self::Istanbul,
            "muirglacier" => Self::MuirGlacier,
            "berlin" => Self::Berlin,
            "london" => Self::London,
            "arrowglacier" => Self::ArrowGlacier,
            "grayglacier" => Self::GrayGlacier,
            "paris" | "merge" => Self::Paris,
            _ => return Err(UnknownHardfork(s.to_string())),
        };
        Ok(fork)
    }
}
