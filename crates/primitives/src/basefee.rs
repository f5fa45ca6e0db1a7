//! EIP-1559 base fee arithmetic.

use crate::constants::{
    EIP1559_DEFAULT_BASE_FEE_MAX_CHANGE_DENOMINATOR, EIP1559_DEFAULT_ELASTICITY_MULTIPLIER,
};

/// The parameters that govern how the base fee moves between blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseFeeParams {
    /// Bounds the per-block base fee change to `base_fee / denominator`.
    pub max_change_denominator: u64,
    /// The gas target is `gas_limit / elasticity_multiplier`.
    pub elasticity_multiplier: u64,
}

impl BaseFeeParams {
    /// The parameters mainnet activated at London.
    pub const fn ethereum() -> Self {
        Self {
            max_change_denominator: EIP1559_DEFAULT_BASE_FEE_MAX_CHANGE_DENOMINATOR,
            elasticity_multiplier: EIP1559_DEFAULT_ELASTICITY_MULTIPLIER,
        }
    }
}

impl Default for BaseFeeParams {
    fn default() -> Self {
        Self::ethereum()
    }
}

/// Computes the base fee of the block following one with the given gas usage,
/// gas limit and base fee.
///
/// See [EIP-1559](https://eips.ethereum.org/EIPS/eip-1559): the fee rises when
/// the parent was more than half full, falls when it was less, and the step is
/// bounded by `base_fee / max_change_denominator`.
pub fn calc_next_block_base_fee(
    gas_used: u64,
    gas_limit: u64,
    base_fee: u64,
    params: BaseFeeParams,
) -> u64 {
    let gas_target = gas_limit / params.elasticity_multiplier;

    match gas_used.cmp(&gas_target) {
        std::cmp::Ordering::Equal => base_fee,
        std::cmp::Ordering::Greater => {
            let gas_used_delta = gas_used - gas_target;
            let base_fee_delta = (base_fee as u128 * gas_used_delta as u128
                / gas_target as u128
                / params.max_change_denominator as u128)
                .max(1);
            base_fee.saturating_add(base_fee_delta as u64)
        }
        std::cmp::Ordering::Less => {
            let gas_used_delta = gas_target - gas_used;
            let base_fee_delta = base_fee as u128 * gas_used_delta as u128
                / gas_target as u128
                / params.max_change_denominator as u128;
            base_fee.saturating_sub(base_fee_delta as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_fee_steady_at_target() {
        // parent exactly at target: unchanged
        assert_eq!(
            calc_next_block_base_fee(15_000_000, 30_000_000, 1_000_000_000, BaseFeeParams::ethereum()),
            1_000_000_000
        );
    }

    #[test]
    fn base_fee_rises_when_full() {
        // a completely full parent raises the fee by 1/8
        assert_eq!(
            calc_next_block_base_fee(30_000_000, 30_000_000, 1_000_000_000, BaseFeeParams::ethereum()),
            1_125_000_000
        );
    }

    #[test]
    fn base_fee_falls_when_empty() {
        // an empty parent lowers the fee by 1/8
        assert_eq!(
            calc_next_block_base_fee(0, 30_000_000, 1_000_000_000, BaseFeeParams::ethereum()),
            875_000_000
        );
    }

    #[test]
    fn base_fee_minimum_step_up() {
        // the upward step is never rounded down to zero
        assert_eq!(calc_next_block_base_fee(16, 30, 7, BaseFeeParams::ethereum()), 8);
    }
}
