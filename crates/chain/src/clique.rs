//! Clique seal handling: the signer's signature lives in the last 65 bytes
//! of the header's extra-data, and the sealed hash is the header hash with
//! that signature stripped.

use alloy_primitives::{Address, Bytes, B256};
use ember_primitives::{
    sign_message, Header, Signature, CLIQUE_EXTRA_SEAL, CLIQUE_EXTRA_VANITY,
};
use secp256k1::SecretKey;

/// The hash a Clique signer commits to: the header hash computed with the
/// seal signature removed from the extra-data.
pub fn seal_hash(header: &Header) -> Option<B256> {
    let extra_data = &header.extra_data;
    let end = extra_data.len().checked_sub(CLIQUE_EXTRA_SEAL)?;

    let mut unsealed = header.clone();
    unsealed.extra_data = Bytes::copy_from_slice(&extra_data[..end]);
    Some(unsealed.hash_slow())
}

/// Seals the header under the given key: fixes the vanity prefix to its
/// 32-byte width and appends the 65-byte signature over the seal hash.
///
/// The vanity bytes are opaque caller data and round-trip unchanged; a
/// shorter prefix is zero-padded up to the width, a longer one truncated.
pub fn seal(mut header: Header, secret: &SecretKey) -> Header {
    let vanity = if header.extra_data.len() >= CLIQUE_EXTRA_VANITY {
        header.extra_data[..CLIQUE_EXTRA_VANITY].to_vec()
    } else {
        let mut vanity = header.extra_data.to_vec();
        vanity.resize(CLIQUE_EXTRA_VANITY, 0);
        vanity
    };
    header.extra_data = Bytes::from(vanity);

    let digest = header.hash_slow();
    let signature = sign_message(secret, digest);

    let mut sealed_extra = header.extra_data.to_vec();
    sealed_extra.extend_from_slice(&signature.to_bytes());
    header.extra_data = Bytes::from(sealed_extra);
    header
}

/// Recovers the address that sealed the given header, `None` if the
/// extra-data carries no well-formed seal.
pub fn recover_signer(header: &Header) -> Option<Address> {
    let extra_data = &header.extra_data;
    let end = extra_data.len().checked_sub(CLIQUE_EXTRA_SEAL)?;
    let signature = Signature::from_bytes(&extra_data[end..])?;
    signature.recover_signer(seal_hash(header)?)
}
