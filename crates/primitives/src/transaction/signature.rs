use crate::transaction::util;
use alloy_primitives::{Address, B256, U256};
use alloy_rlp::{Decodable, Encodable};
use bytes::BufMut;

/// An ECDSA signature over a transaction's signing hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    /// The R field of the signature.
    pub r: U256,
    /// The S field of the signature.
    pub s: U256,
    /// Whether the Y coordinate of the curve point recovered from R is odd.
    pub odd_y_parity: bool,
}

impl Signature {
    /// The `v` value for a legacy transaction: EIP-155 protected when a chain
    /// id is present, 27/28 otherwise.
    pub fn v(&self, chain_id: Option<u64>) -> u64 {
        if let Some(chain_id) = chain_id {
            self.odd_y_parity as u64 + chain_id * 2 + 35
        } else {
            self.odd_y_parity as u64 + 27
        }
    }

    pub(crate) fn payload_len_with_eip155_chain_id(&self, chain_id: Option<u64>) -> usize {
        self.v(chain_id).length() + self.r.length() + self.s.length()
    }

    pub(crate) fn encode_with_eip155_chain_id(
        &self,
        out: &mut dyn BufMut,
        chain_id: Option<u64>,
    ) {
        self.v(chain_id).encode(out);
        self.r.encode(out);
        self.s.encode(out);
    }

    /// Decodes the `v, r, s` tail of a legacy transaction, extracting the
    /// EIP-155 chain id from `v` if one is folded in.
    pub(crate) fn decode_with_eip155_chain_id(
        buf: &mut &[u8],
    ) -> alloy_rlp::Result<(Self, Option<u64>)> {
        let v = u64::decode(buf)?;
        let r = Decodable::decode(buf)?;
        let s = Decodable::decode(buf)?;
        if v < 35 {
            if v != 27 && v != 28 {
                return Err(alloy_rlp::Error::Custom("invalid v value of legacy transaction"))
            }
            Ok((Self { r, s, odd_y_parity: v == 28 }, None))
        } else {
            let odd_y_parity = (v - 35) % 2 != 0;
            let chain_id = (v - 35) >> 1;
            Ok((Self { r, s, odd_y_parity }, Some(chain_id)))
        }
    }

    pub(crate) fn payload_len(&self) -> usize {
        self.odd_y_parity.length() + self.r.length() + self.s.length()
    }

    pub(crate) fn encode_parity_r_s(&self, out: &mut dyn BufMut) {
        self.odd_y_parity.encode(out);
        self.r.encode(out);
        self.s.encode(out);
    }

    pub(crate) fn decode_parity_r_s(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        Ok(Self {
            odd_y_parity: Decodable::decode(buf)?,
            r: Decodable::decode(buf)?,
            s: Decodable::decode(buf)?,
        })
    }

    /// The raw 65-byte `r || s || parity` form used by secp256k1 recovery and
    /// by the Clique seal.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut sig = [0u8; 65];
        sig[..32].copy_from_slice(&self.r.to_be_bytes::<32>());
        sig[32..64].copy_from_slice(&self.s.to_be_bytes::<32>());
        sig[64] = self.odd_y_parity as u8;
        sig
    }

    /// Parses a 65-byte `r || s || parity` signature, accepting both the 0/1
    /// and the 27/28 parity convention.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 65 {
            return None
        }
        let parity = match bytes[64] {
            0 | 27 => false,
            1 | 28 => true,
            _ => return None,
        };
        Some(Self {
            r: U256::from_be_slice(&bytes[..32]),
            s: U256::from_be_slice(&bytes[32..64]),
            odd_y_parity: parity,
        })
    }

    /// Recovers the address that produced this signature over `hash`.
    pub fn recover_signer(&self, hash: B256) -> Option<Address> {
        util::recover_signer(&self.to_bytes(), &hash.0).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eip155_v_roundtrip() {
        let sig = Signature { r: U256::from(1u64), s: U256::from(2u64), odd_y_parity: true };
        assert_eq!(sig.v(None), 28);
        assert_eq!(sig.v(Some(1)), 38);
        assert_eq!(sig.v(Some(4)), 44);

        let mut buf = Vec::new();
        sig.encode_with_eip155_chain_id(&mut buf, Some(4));
        let (decoded, chain_id) =
            Signature::decode_with_eip155_chain_id(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, sig);
        assert_eq!(chain_id, Some(4));
    }

    #[test]
    fn rejects_bogus_legacy_v() {
        let mut buf = Vec::new();
        26u64.encode(&mut buf);
        U256::from(1u64).encode(&mut buf);
        U256::from(2u64).encode(&mut buf);
        assert!(Signature::decode_with_eip155_chain_id(&mut buf.as_slice()).is_err());
    }

    #[test]
    fn raw_bytes_roundtrip() {
        let sig = Signature { r: U256::from(7u64), s: U256::from(9u64), odd_y_parity: true };
        assert_eq!(Signature::from_bytes(&sig.to_bytes()), Some(sig));
        assert_eq!(Signature::from_bytes(&[0u8; 64]), None);
    }
}
