use crate::protocol::{Credentials, PushEvent, QueuedEvent, RequestResult, SessionSnapshot};
use std::time::Duration;

/// Errors from the network boundary. Never fatal: the client turns them
/// into status `error` plus one log line.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("grid unavailable: {0}")]
    Unavailable(String),
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unrecognized message: {0}")]
    Unrecognized(String),
}

/// The grid as the viewer sees it: request/response calls, a polled
/// snapshot and event queue, and a push channel drained once per frame.
///
/// Calls are made from the frame loop's thread. Implementations must not
/// block for long; a real network transport buffers responses and hands
/// them out here.
pub trait SessionTransport {
    fn start(&mut self) -> Result<RequestResult, TransportError>;

    fn login(&mut self, credentials: &Credentials) -> Result<RequestResult, TransportError>;

    fn logout(&mut self) -> Result<RequestResult, TransportError>;

    fn fetch_snapshot(&mut self) -> Result<SessionSnapshot, TransportError>;

    /// Drain the event queue, oldest first.
    fn fetch_events(&mut self) -> Result<Vec<QueuedEvent>, TransportError>;

    /// Next pending push event, if any.
    fn poll_push(&mut self) -> Option<PushEvent>;

    /// Let time pass on the remote side. Real transports ignore this.
    fn advance(&mut self, _elapsed: Duration) {}
}
