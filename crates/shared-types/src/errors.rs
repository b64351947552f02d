//! # Error Types
//!
//! Defines error types used across subsystems.

use crate::address::AddressKind;
use thiserror::Error;

/// Errors raised while decoding or validating an envelope.
///
/// All of these are boundary failures: they are logged and the message is
/// dropped, they never cross the ingress boundary.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Raw text is not a valid envelope JSON object.
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),

    /// The `type` field is empty or missing.
    #[error("received message with empty type")]
    EmptyType,

    /// The `type` field names no known message type.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// The payload is empty or missing.
    #[error("message {message_id} has an empty payload")]
    EmptyPayload { message_id: String },

    /// The expiry date header is missing.
    #[error("message {message_id} has no expiry date")]
    MissingExpiryDate { message_id: String },

    /// The expiry date header is not an epoch-millisecond integer.
    #[error("message {message_id} has an invalid expiry date: {value}")]
    InvalidExpiryDate { message_id: String, value: String },

    /// The payload could not be decoded into the expected body.
    #[error("cannot decode {expected} payload of message {message_id}: {reason}")]
    Payload {
        message_id: String,
        expected: &'static str,
        reason: String,
    },
}

/// Errors raised while decoding a serialized transport address.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The serialized address is not valid address JSON.
    #[error("cannot deserialize address {raw}: {reason}")]
    Malformed { raw: String, reason: String },

    /// The address belongs to a different transport than expected.
    #[error("expected {expected} address, got {actual}")]
    WrongTransport {
        expected: AddressKind,
        actual: AddressKind,
    },

    /// A message that needs a reply path carried no reply address.
    #[error("missing reply address")]
    Missing,
}

/// Errors reported by a transport-specific message sender.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The remote end refused the connection.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// The message could not be written to the transport.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The transport (or in-process queue) has been shut down.
    #[error("transport closed")]
    Closed,
}

/// Runtime routing failures, surfaced exactly once to the route caller.
///
/// Retry policy belongs to the caller; the router never retries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoutingError {
    /// A hop is known but no sender is registered for its transport.
    #[error("no {kind} sender available for participant {participant_id}")]
    NoSender {
        kind: AddressKind,
        participant_id: String,
    },

    /// A locally built envelope failed the well-formedness check.
    #[error("invalid envelope {message_id}: {reason}")]
    InvalidEnvelope { message_id: String, reason: String },

    /// The transport sender rejected the message.
    #[error("delivery to participant {participant_id} failed: {source}")]
    Transport {
        participant_id: String,
        #[source]
        source: TransportError,
    },
}
