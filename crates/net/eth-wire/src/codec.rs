//! Snappy payload compression, negotiated through the devp2p hello: peers
//! advertising `p2p` protocol version 5 or higher compress every message
//! payload, STATUS included. The message code byte stays uncompressed.

use crate::{EthStreamError, ProtocolVersion};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Maximum size of an uncompressed message payload, per
/// [EIP-706](https://eips.ethereum.org/EIPS/eip-706).
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Per-session snappy codec for `eth` payloads.
pub struct Compression {
    enabled: bool,
    encoder: snap::raw::Encoder,
    decoder: snap::raw::Decoder,
}

impl fmt::Debug for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compression").field("enabled", &self.enabled).finish_non_exhaustive()
    }
}

impl Compression {
    /// Creates the codec for a session on a transport with the given devp2p
    /// version.
    pub fn new(p2p_version: ProtocolVersion) -> Self {
        Self {
            enabled: p2p_version.is_snappy(),
            encoder: snap::raw::Encoder::new(),
            decoder: snap::raw::Decoder::new(),
        }
    }

    /// Whether payloads are compressed on this session.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Compresses an encoded message: the leading code byte is carried as-is,
    /// the payload behind it is snappy-compressed.
    pub fn compress(&mut self, encoded: &[u8]) -> Result<Bytes, EthStreamError> {
        if !self.enabled || encoded.is_empty() {
            return Ok(Bytes::copy_from_slice(encoded))
        }

        let mut out = BytesMut::with_capacity(1 + encoded.len());
        out.put_u8(encoded[0]);
        out.extend_from_slice(&self.encoder.compress_vec(&encoded[1..])?);
        Ok(out.freeze())
    }

    /// Decompresses a received message back into code byte plus payload,
    /// enforcing the EIP-706 decompressed size cap.
    pub fn decompress(&mut self, bytes: &[u8]) -> Result<BytesMut, EthStreamError> {
        if !self.enabled || bytes.is_empty() {
            return Ok(BytesMut::from(bytes))
        }

        let decompressed_len = snap::raw::decompress_len(&bytes[1..])?;
        if decompressed_len > MAX_PAYLOAD_SIZE {
            return Err(EthStreamError::MessageTooBig(decompressed_len))
        }

        let mut out = BytesMut::zeroed(1 + decompressed_len);
        out[0] = bytes[0];
        self.decoder.decompress(&bytes[1..], &mut out[1..])?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_is_transparent() {
        let mut compression = Compression::new(ProtocolVersion::V5);
        let message: Vec<u8> = std::iter::once(0x07)
            .chain(std::iter::repeat(0xab).take(1000))
            .collect();

        let compressed = compression.compress(&message).unwrap();
        // repeated bytes compress well
        assert!(compressed.len() < message.len());
        assert_eq!(compressed[0], 0x07);

        let decompressed = compression.decompress(&compressed).unwrap();
        assert_eq!(decompressed.as_ref(), message.as_slice());
    }

    #[test]
    fn v4_transport_is_a_passthrough() {
        let mut compression = Compression::new(ProtocolVersion::V4);
        assert!(!compression.is_enabled());

        let message = [0x00u8, 0x01, 0x02, 0x03];
        let passed = compression.compress(&message).unwrap();
        assert_eq!(passed.as_ref(), message.as_slice());
        assert_eq!(compression.decompress(&passed).unwrap().as_ref(), message.as_slice());
    }

    #[test]
    fn corrupt_payload_rejected() {
        let mut compression = Compression::new(ProtocolVersion::V5);
        // not a valid snappy stream behind the code byte
        assert!(compression.decompress(&[0x00, 0xff, 0xff, 0xff]).is_err());
    }
}
