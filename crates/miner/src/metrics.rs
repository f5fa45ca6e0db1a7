use metrics::{counter, Counter};

/// Block assembly metrics.
pub(crate) struct MinerMetrics {
    /// Blocks assembled and submitted to the chain.
    pub(crate) blocks_built: Counter,
    /// Assemblies abandoned because the chain moved underneath.
    pub(crate) assemblies_interrupted: Counter,
    /// Assemblies skipped by the recent-signer rule.
    pub(crate) assemblies_skipped: Counter,
}

impl std::fmt::Debug for MinerMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinerMetrics").finish_non_exhaustive()
    }
}

impl Default for MinerMetrics {
    fn default() -> Self {
        Self {
            blocks_built: counter!("miner_blocks_built"),
            assemblies_interrupted: counter!("miner_assemblies_interrupted"),
            assemblies_skipped: counter!("miner_assemblies_skipped"),
        }
    }
}
