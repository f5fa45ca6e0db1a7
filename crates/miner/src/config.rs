use alloy_primitives::{Address, Bytes};
use ember_primitives::secret_key_to_address;
use secp256k1::SecretKey;
use std::time::Duration;

/// Delay range added per authorized signer when sealing out of turn, so the
/// in-turn signer usually wins the race.
pub const OUT_OF_TURN_DELAY_PER_SIGNER: Duration = Duration::from_millis(500);

/// The key a Clique block producer seals under.
#[derive(Debug, Clone)]
pub struct CliqueSigner {
    /// Address derived from the signing key.
    pub address: Address,
    /// The signing key itself.
    pub secret: SecretKey,
}

impl CliqueSigner {
    /// Creates a signer from its secret key.
    pub fn new(secret: SecretKey) -> Self {
        Self { address: secret_key_to_address(&secret), secret }
    }
}

/// Configuration of the block assembly loop.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    /// Target seconds between blocks; the Clique period.
    pub period: Duration,
    /// The Clique signer; `None` produces unsealed dev blocks.
    pub signer: Option<CliqueSigner>,
    /// Vanity bytes placed in the header's extra-data.
    pub extra_data: Bytes,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self { period: Duration::from_secs(15), signer: None, extra_data: Bytes::new() }
    }
}

impl MinerConfig {
    /// Sets the block period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Sets the Clique signer.
    pub fn with_signer(mut self, signer: CliqueSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Sets the extra-data vanity.
    pub fn with_extra_data(mut self, extra_data: Bytes) -> Self {
        self.extra_data = extra_data;
        self
    }
}
