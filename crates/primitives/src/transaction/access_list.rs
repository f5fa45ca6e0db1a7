use alloy_primitives::{Address, B256};
use alloy_rlp::{RlpDecodable, RlpDecodableWrapper, RlpEncodable, RlpEncodableWrapper};

/// A list of addresses and storage keys that a transaction plans to access,
/// as introduced by [EIP-2930](https://eips.ethereum.org/EIPS/eip-2930).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct AccessList(pub Vec<AccessListItem>);

/// A single item of an [`AccessList`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, RlpEncodable, RlpDecodable)]
pub struct AccessListItem {
    /// The accessed account.
    pub address: Address,
    /// The accessed storage slots of the account.
    pub storage_keys: Vec<B256>,
}
