//! Block header and body queries.

use alloy_primitives::B256;
use alloy_rlp::{
    length_of_length, Decodable, Encodable, RlpDecodableWrapper, RlpEncodableWrapper,
};
use bytes::BufMut;
use ember_primitives::{BlockBody, BlockHashOrNumber, Header};

/// The most headers a single request may ask for.
pub const MAX_HEADERS_SERVE: u64 = 1024;

/// Which way a header request walks the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HeadersDirection {
    /// Ascending block numbers.
    #[default]
    Rising,
    /// Descending block numbers; the reverse flag on the wire.
    Falling,
}

impl HeadersDirection {
    /// Whether this is the falling (reverse) direction.
    pub const fn is_falling(&self) -> bool {
        matches!(self, Self::Falling)
    }
}

impl Encodable for HeadersDirection {
    fn encode(&self, out: &mut dyn BufMut) {
        self.is_falling().encode(out)
    }

    fn length(&self) -> usize {
        1
    }
}

impl Decodable for HeadersDirection {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        match bool::decode(buf)? {
            false => Ok(Self::Rising),
            true => Ok(Self::Falling),
        }
    }
}

/// A request for block headers: a walk of the chain anchored at a hash or a
/// number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GetBlockHeaders {
    /// Hash or number of the first block to fetch.
    pub start_block: BlockHashOrNumber,
    /// How many headers to return, at most [`MAX_HEADERS_SERVE`].
    pub limit: u64,
    /// Blocks to skip between returned headers; 0 walks consecutively.
    pub skip: u32,
    /// Walk direction.
    pub direction: HeadersDirection,
}

impl GetBlockHeaders {
    fn payload_length(&self) -> usize {
        self.start_block.length() +
            self.limit.length() +
            self.skip.length() +
            self.direction.length()
    }
}

impl Encodable for GetBlockHeaders {
    fn encode(&self, out: &mut dyn BufMut) {
        alloy_rlp::Header { list: true, payload_length: self.payload_length() }.encode(out);
        self.start_block.encode(out);
        self.limit.encode(out);
        self.skip.encode(out);
        self.direction.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + length_of_length(payload_length)
    }
}

impl Decodable for GetBlockHeaders {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = alloy_rlp::Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString)
        }
        let remaining = buf.len();

        let this = Self {
            start_block: Decodable::decode(buf)?,
            limit: Decodable::decode(buf)?,
            skip: Decodable::decode(buf)?,
            direction: Decodable::decode(buf)?,
        };

        if remaining - buf.len() != header.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: remaining - buf.len(),
            })
        }
        if this.limit > MAX_HEADERS_SERVE {
            return Err(alloy_rlp::Error::Custom("headers request limit exceeds maximum"))
        }
        Ok(this)
    }
}

/// The response to [`GetBlockHeaders`], an ordered list of headers.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct BlockHeaders(
    /// The requested headers.
    pub Vec<Header>,
);

impl From<Vec<Header>> for BlockHeaders {
    fn from(headers: Vec<Header>) -> Self {
        Self(headers)
    }
}

/// A request for block bodies by hash.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct GetBlockBodies(
    /// Hashes of the blocks whose bodies are requested.
    pub Vec<B256>,
);

/// The response to [`GetBlockBodies`], the bodies that were found.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct BlockBodies(
    /// The requested bodies, in request order, unknown hashes skipped.
    pub Vec<BlockBody>,
);

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::hex;

    #[test]
    fn get_block_headers_roundtrip() {
        for start in
            [BlockHashOrNumber::Number(9999), BlockHashOrNumber::Hash(B256::repeat_byte(0x7b))]
        {
            let request = GetBlockHeaders {
                start_block: start,
                limit: 5,
                skip: 1,
                direction: HeadersDirection::Falling,
            };
            let mut encoded = Vec::new();
            request.encode(&mut encoded);
            assert_eq!(encoded.len(), request.length());
            assert_eq!(GetBlockHeaders::decode(&mut encoded.as_slice()).unwrap(), request);
        }
    }

    #[test]
    fn get_block_headers_known_encoding() {
        // [ 0x0a, 0x05, 0x00, 0x01 ] => starting at block 10, 5 headers,
        // no skip, reverse
        let request = GetBlockHeaders {
            start_block: BlockHashOrNumber::Number(10),
            limit: 5,
            skip: 0,
            direction: HeadersDirection::Falling,
        };
        let mut encoded = Vec::new();
        request.encode(&mut encoded);
        assert_eq!(encoded, hex!("c40a058001"));
    }

    #[test]
    fn limit_above_maximum_rejected() {
        let request = GetBlockHeaders {
            start_block: BlockHashOrNumber::Number(0),
            limit: MAX_HEADERS_SERVE + 1,
            skip: 0,
            direction: HeadersDirection::Rising,
        };
        let mut encoded = Vec::new();
        request.encode(&mut encoded);
        assert!(GetBlockHeaders::decode(&mut encoded.as_slice()).is_err());
    }

    #[test]
    fn direction_must_be_boolean() {
        // fourth item is 2, not a valid reverse flag
        let bytes = hex!("c40a058002");
        assert!(GetBlockHeaders::decode(&mut &bytes[..]).is_err());
    }
}
