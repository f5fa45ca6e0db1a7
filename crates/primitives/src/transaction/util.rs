//! secp256k1 helpers for signing and recovering.

use crate::transaction::Signature;
use alloy_primitives::{keccak256, Address, B256, U256};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, SecretKey, SECP256K1,
};

/// Converts a public key into the address derived from its keccak hash.
pub fn public_key_to_address(public: PublicKey) -> Address {
    // strip the 0x04 SEC1 tag, hash the raw 64-byte point
    let hash = keccak256(&public.serialize_uncompressed()[1..]);
    Address::from_slice(&hash[12..])
}

/// Returns the address controlled by the given secret key.
pub fn secret_key_to_address(secret: &SecretKey) -> Address {
    public_key_to_address(secret.public_key(SECP256K1))
}

/// Signs the given 32-byte digest, returning a recoverable [`Signature`].
pub fn sign_message(secret: &SecretKey, message: B256) -> Signature {
    let sig = SECP256K1.sign_ecdsa_recoverable(&Message::from_digest(message.0), secret);
    let (rec_id, data) = sig.serialize_compact();
    Signature {
        r: U256::from_be_slice(&data[..32]),
        s: U256::from_be_slice(&data[32..64]),
        odd_y_parity: rec_id.to_i32() != 0,
    }
}

/// Recovers the address that signed `msg` from a 65-byte compact signature.
pub(crate) fn recover_signer(
    sig: &[u8; 65],
    msg: &[u8; 32],
) -> Result<Address, secp256k1::Error> {
    let sig =
        RecoverableSignature::from_compact(&sig[..64], RecoveryId::from_i32(sig[64] as i32)?)?;
    let public = SECP256K1.recover_ecdsa(&Message::from_digest(*msg), &sig)?;
    Ok(public_key_to_address(public))
}
