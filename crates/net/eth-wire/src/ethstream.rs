use crate::{
    codec::Compression,
    errors::{EthHandshakeError, EthStreamError},
    message::{EthMessage, ProtocolMessage},
    request::RequestTracker,
    status::StatusMessage,
    version::{EthVersion, ProtocolVersion},
};
use bytes::{Bytes, BytesMut};
use ember_forks::ForkFilter;
use ember_primitives::GotExpected;
use futures::{ready, Sink, SinkExt, StreamExt};
use pin_project::pin_project;
use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio_stream::Stream;
use tracing::{debug, trace};

/// Maximum size of a decoded `eth` message.
pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// How long a peer has to deliver its STATUS after the session came up.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Total difficulties above this bit length are considered garbage.
const MAX_TD_BITLEN: usize = 160;

/// An `eth` session that has not performed the STATUS handshake yet. Consumed
/// by [`UnauthedEthStream::handshake`], which yields the established
/// [`EthStream`].
#[derive(Debug)]
pub struct UnauthedEthStream<S> {
    inner: S,
    version: EthVersion,
    compression: Compression,
}

impl<S> UnauthedEthStream<S> {
    /// Creates a new unauthed session over the given framed transport, for
    /// the negotiated `eth` version and the transport's devp2p version.
    pub fn new(inner: S, version: EthVersion, p2p_version: ProtocolVersion) -> Self {
        Self { inner, version, compression: Compression::new(p2p_version) }
    }
}

impl<S> UnauthedEthStream<S>
where
    S: Stream<Item = io::Result<BytesMut>> + Sink<Bytes, Error = io::Error> + Unpin,
{
    /// Performs the STATUS exchange: sends our status immediately, awaits the
    /// peer's under the 5 second window, and validates field equality and the
    /// EIP-2124 fork id.
    ///
    /// Returns the established stream and the peer's status on success.
    pub async fn handshake(
        mut self,
        status: StatusMessage,
        fork_filter: ForkFilter,
    ) -> Result<(EthStream<S>, StatusMessage), EthStreamError> {
        trace!(status = %status.version(), "sending eth status to peer");
        self.send_status(status).await?;

        let their_bytes = match tokio::time::timeout(STATUS_TIMEOUT, self.inner.next()).await {
            Err(_) => return Err(EthHandshakeError::StatusTimeout.into()),
            Ok(None) => return Err(EthHandshakeError::NoResponse.into()),
            Ok(Some(result)) => result?,
        };
        if their_bytes.len() > MAX_MESSAGE_SIZE {
            return Err(EthStreamError::MessageTooBig(their_bytes.len()))
        }

        let decompressed = self.compression.decompress(&their_bytes)?;
        let message = ProtocolMessage::decode_message(self.version, &mut decompressed.as_ref())?;

        let their_status = match message.message {
            EthMessage::Status(status) => status,
            message => {
                debug!(?message, "expected status message in handshake");
                return Err(EthHandshakeError::NonStatusMessageInHandshake.into())
            }
        };
        trace!(version = their_status.version(), "validating peer status");

        if their_status.version() != status.version() {
            return Err(EthHandshakeError::MismatchedProtocolVersion(GotExpected {
                got: their_status.version(),
                expected: status.version(),
            })
            .into())
        }

        if their_status.chain() != status.chain() {
            return Err(EthHandshakeError::MismatchedChain(GotExpected {
                got: their_status.chain(),
                expected: status.chain(),
            })
            .into())
        }

        // an honest total difficulty fits comfortably in 160 bits
        if their_status.total_difficulty().bit_len() > MAX_TD_BITLEN {
            return Err(EthHandshakeError::TotalDifficultyBitLenTooLarge {
                got: their_status.total_difficulty().bit_len(),
                maximum: MAX_TD_BITLEN,
            }
            .into())
        }

        if their_status.genesis() != status.genesis() {
            return Err(EthHandshakeError::MismatchedGenesis(GotExpected {
                got: their_status.genesis(),
                expected: status.genesis(),
            })
            .into())
        }

        if self.version.has_fork_id() {
            if let Some(forkid) = their_status.forkid() {
                fork_filter.validate(forkid).map_err(EthHandshakeError::InvalidFork)?;
            }
        }

        Ok((
            EthStream {
                inner: self.inner,
                version: self.version,
                compression: self.compression,
                request_tracker: RequestTracker::new(),
            },
            their_status,
        ))
    }

    async fn send_status(&mut self, status: StatusMessage) -> Result<(), EthStreamError> {
        let message = ProtocolMessage::from(EthMessage::Status(status));
        let mut encoded = Vec::with_capacity(message.length_for_version(self.version));
        message.encode_for_version(self.version, &mut encoded);
        let compressed = self.compression.compress(&encoded)?;
        self.inner.send(compressed).await.map_err(Into::into)
    }
}

/// An established `eth` session: a [`Stream`] of decoded inbound messages and
/// a [`Sink`] of outbound ones, both gated by the negotiated version.
///
/// From `eth/66` on the session keeps its own request bookkeeping: ids of
/// outbound requests are registered on send, and an inbound response must
/// echo an outstanding id with the code that request expects.
#[pin_project]
#[derive(Debug)]
pub struct EthStream<S> {
    #[pin]
    inner: S,
    version: EthVersion,
    compression: Compression,
    request_tracker: RequestTracker,
}

impl<S> EthStream<S> {
    /// Creates a session that is considered established, skipping the STATUS
    /// exchange. The caller vouches that the handshake already happened.
    pub fn new(inner: S, version: EthVersion, p2p_version: ProtocolVersion) -> Self {
        Self {
            inner,
            version,
            compression: Compression::new(p2p_version),
            request_tracker: RequestTracker::new(),
        }
    }

    /// The negotiated `eth` version of this session.
    pub const fn version(&self) -> EthVersion {
        self.version
    }

    /// Number of requests sent on this session that still await a response.
    pub fn inflight_requests(&self) -> usize {
        self.request_tracker.inflight()
    }

    /// A reference to the underlying transport.
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// Consumes the session and returns the underlying transport.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> Stream for EthStream<S>
where
    S: Stream<Item = io::Result<BytesMut>> + Unpin,
{
    type Item = Result<EthMessage, EthStreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            let bytes = match ready!(this.inner.as_mut().poll_next(cx)) {
                None => return Poll::Ready(None),
                Some(Err(err)) => return Poll::Ready(Some(Err(err.into()))),
                Some(Ok(bytes)) => bytes,
            };
            if bytes.len() > MAX_MESSAGE_SIZE {
                return Poll::Ready(Some(Err(EthStreamError::MessageTooBig(bytes.len()))))
            }

            let decompressed = match this.compression.decompress(&bytes) {
                Ok(decompressed) => decompressed,
                Err(err) => return Poll::Ready(Some(Err(err))),
            };

            let message =
                match ProtocolMessage::decode_message(*this.version, &mut decompressed.as_ref()) {
                    Ok(message) => message,
                    Err(err) => {
                        debug!(%err, msg = %alloy_primitives::hex::encode(&decompressed), "failed to decode protocol message");
                        return Poll::Ready(Some(Err(err.into())))
                    }
                };

            if matches!(message.message, EthMessage::Status(_)) {
                return Poll::Ready(Some(Err(EthHandshakeError::StatusNotInHandshake.into())))
            }

            // receiving a message outside the negotiated version's whitelist
            // is not fatal, the message is simply dropped
            if !message.message_type.supported_by(*this.version) {
                debug!(
                    message = message.message_type.name(),
                    version = %this.version,
                    "dropping message not supported by negotiated version"
                );
                continue
            }

            // a response must settle an id this session actually issued
            if this.version.has_request_ids() && message.message_type.is_response() {
                if let Some(request_id) = message.message.request_id() {
                    if let Err(err) = this.request_tracker.on_response(request_id, message.message_type)
                    {
                        return Poll::Ready(Some(Err(err.into())))
                    }
                }
            }

            return Poll::Ready(Some(Ok(message.message)))
        }
    }
}

impl<S> Sink<EthMessage> for EthStream<S>
where
    S: Sink<Bytes, Error = io::Error> + Unpin,
{
    type Error = EthStreamError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_ready(cx).map_err(Into::into)
    }

    fn start_send(self: Pin<&mut Self>, item: EthMessage) -> Result<(), Self::Error> {
        let this = self.project();

        if matches!(item, EthMessage::Status(_)) {
            // status is exchanged once, in the handshake
            return Err(EthHandshakeError::StatusNotInHandshake.into())
        }

        let message_type = item.message_id();
        if !message_type.supported_by(*this.version) {
            return Err(EthStreamError::MessageNotSupported {
                version: *this.version,
                message: message_type,
            })
        }

        if this.version.has_request_ids() && message_type.is_request() {
            if let Some(request_id) = item.request_id() {
                this.request_tracker.register(request_id, message_type)?;
            }
        }

        let message = ProtocolMessage::from(item);
        let mut encoded = Vec::with_capacity(message.length_for_version(*this.version));
        message.encode_for_version(*this.version, &mut encoded);
        let compressed = this.compression.compress(&encoded)?;

        this.inner.start_send(compressed).map_err(Into::into)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_flush(cx).map_err(Into::into)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_close(cx).map_err(Into::into)
    }
}
