//! Round-trip properties of the wire encoding: every value drawn from
//! integers, byte strings and nested lists decodes back to itself, and the
//! encoding is the minimal canonical form.

use alloy_primitives::{Bytes, U256};
use alloy_rlp::{Decodable, Encodable};
use proptest::prelude::*;

fn roundtrip<T: Encodable + Decodable + PartialEq + std::fmt::Debug>(value: &T) {
    let mut encoded = Vec::new();
    value.encode(&mut encoded);
    assert_eq!(encoded.len(), value.length());

    let mut slice = encoded.as_slice();
    let decoded = T::decode(&mut slice).unwrap();
    assert!(slice.is_empty(), "decoding must consume the whole input");
    assert_eq!(&decoded, value);
}

proptest! {
    #[test]
    fn integers_roundtrip(value: u64) {
        roundtrip(&value);
    }

    #[test]
    fn big_integers_roundtrip(bytes: [u8; 32]) {
        roundtrip(&U256::from_be_bytes(bytes));
    }

    #[test]
    fn byte_strings_roundtrip(data: Vec<u8>) {
        roundtrip(&Bytes::from(data));
    }

    #[test]
    fn nested_lists_roundtrip(data: Vec<Vec<u8>>) {
        let value: Vec<Bytes> = data.into_iter().map(Bytes::from).collect();
        roundtrip(&value);
    }

    #[test]
    fn deeply_nested_lists_roundtrip(data: Vec<Vec<Vec<u8>>>) {
        let value: Vec<Vec<Bytes>> =
            data.into_iter().map(|inner| inner.into_iter().map(Bytes::from).collect()).collect();
        roundtrip(&value);
    }

    #[test]
    fn integer_encoding_is_minimal(value: u64) {
        let mut encoded = Vec::new();
        value.encode(&mut encoded);

        if value == 0 {
            // zero is the empty string
            assert_eq!(encoded, vec![0x80]);
        } else if value < 0x80 {
            assert_eq!(encoded, vec![value as u8]);
        } else {
            // one-byte length prefix, then big-endian bytes with no leading zero
            let be = value.to_be_bytes();
            let stripped: Vec<u8> = be.iter().copied().skip_while(|b| *b == 0).collect();
            assert_eq!(encoded[0] as usize, 0x80 + stripped.len());
            assert_eq!(&encoded[1..], stripped.as_slice());
        }
    }
}

#[test]
fn non_minimal_integer_rejected() {
    // 0x8100 is `0` encoded with a superfluous length prefix
    assert!(u64::decode(&mut &[0x81u8, 0x00][..]).is_err());
    // leading zero byte in a two-byte integer
    assert!(u64::decode(&mut &[0x82u8, 0x00, 0x01][..]).is_err());
}

#[test]
fn truncated_input_rejected() {
    let mut encoded = Vec::new();
    Bytes::from(vec![0xabu8; 40]).encode(&mut encoded);
    encoded.truncate(encoded.len() - 1);
    assert!(Bytes::decode(&mut encoded.as_slice()).is_err());
}

#[test]
fn list_string_mismatch_rejected() {
    // a string where a list of strings is expected
    let mut encoded = Vec::new();
    Bytes::from_static(b"ember").encode(&mut encoded);
    assert!(Vec::<Bytes>::decode(&mut encoded.as_slice()).is_err());
}
