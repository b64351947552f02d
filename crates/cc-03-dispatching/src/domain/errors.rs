use cc_01_message_routing::RouteOutcome;
use shared_types::{EnvelopeError, RemoteError, RoutingError};
use thiserror::Error;

/// Errors raised while dispatching inbound envelopes or sending on behalf of
/// local consumers.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Payload could not be decoded or encoded.
    #[error(transparent)]
    Payload(#[from] EnvelopeError),

    /// The router could not deliver an outgoing message.
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// The router dropped an outgoing message.
    #[error("message not delivered: {0:?}")]
    NotDelivered(RouteOutcome),

    /// The remote side answered with an error.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// No answer arrived before the message expired.
    #[error("no reply for {0} before expiry")]
    Timeout(String),

    /// The pending entry was dropped without an answer.
    #[error("request {0} was cancelled")]
    Cancelled(String),

    /// The dispatch queue has been shut down.
    #[error("dispatch queue closed")]
    QueueClosed,
}
