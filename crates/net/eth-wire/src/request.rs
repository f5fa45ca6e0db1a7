use crate::{errors::RequestError, EthMessageID};
use ember_primitives::GotExpected;
use std::collections::HashMap;

/// Allocates request ids and correlates responses for one `eth/66` session.
///
/// Ids increase monotonically and wrap at `2^64`; an id still in flight is
/// never handed out twice. Responses whose id is not outstanding are
/// rejected, which is stricter than merely echoing ids back.
#[derive(Debug, Default)]
pub struct RequestTracker {
    next_id: u64,
    /// Outstanding requests and the response code each expects.
    inflight: HashMap<u64, EthMessageID>,
}

impl RequestTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests awaiting a response.
    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    /// Registers a request and returns the id to send it under.
    pub fn next_request_id(&mut self, request: EthMessageID) -> Result<u64, RequestError> {
        // the id is a correlation token, not an ordinal: wrap freely, but
        // never reuse an id that is still in flight
        let mut id = self.next_id;
        while self.inflight.contains_key(&id) {
            id = id.wrapping_add(1);
        }
        self.next_id = id.wrapping_add(1);

        self.register(id, request)?;
        Ok(id)
    }

    /// Registers a request under an id the caller picked itself.
    pub fn register(&mut self, request_id: u64, request: EthMessageID) -> Result<(), RequestError> {
        let expected_response = request.response().ok_or(RequestError::NotARequest(request))?;
        if self.inflight.contains_key(&request_id) {
            return Err(RequestError::DuplicateRequestId(request_id))
        }
        self.inflight.insert(request_id, expected_response);
        Ok(())
    }

    /// Settles an outstanding request with the response that echoed its id.
    pub fn on_response(
        &mut self,
        request_id: u64,
        response: EthMessageID,
    ) -> Result<(), RequestError> {
        if !response.is_response() {
            return Err(RequestError::NotAResponse(response))
        }
        let expected = self
            .inflight
            .get(&request_id)
            .copied()
            .ok_or(RequestError::UnknownRequestId(request_id))?;
        if expected != response {
            return Err(RequestError::UnexpectedResponseType {
                request_id,
                types: GotExpected { got: response, expected },
            })
        }
        self.inflight.remove(&request_id);
        Ok(())
    }
}
