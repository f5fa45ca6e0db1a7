#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
//! Implementation of the `eth` wire protocol.
//!
//! The RLPx transport (framing, ECIES) is a collaborator: this crate sits on
//! top of any stream of framed bytes and provides the typed, versioned,
//! snappy-compressed `eth` session, from the STATUS handshake onwards.

pub mod codec;
mod disconnect;
pub mod errors;
mod ethstream;
mod message;
mod request;
mod status;
pub mod types;
mod version;

pub use codec::{Compression, MAX_PAYLOAD_SIZE};
pub use disconnect::{DisconnectReason, UnknownDisconnectReason};
pub use errors::{EthHandshakeError, EthStreamError, MessageError, RequestError};
pub use ethstream::{EthStream, UnauthedEthStream, MAX_MESSAGE_SIZE, STATUS_TIMEOUT};
pub use message::{EthMessage, EthMessageID, ProtocolMessage, RequestPair};
pub use request::RequestTracker;
pub use status::{Status, StatusBuilder, StatusLegacy, StatusMessage};
pub use types::*;
pub use version::{EthVersion, ParseVersionError, ProtocolVersion};
