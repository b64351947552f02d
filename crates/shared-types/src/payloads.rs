//! # RPC and Pub/Sub Payloads
//!
//! Typed bodies carried in `Envelope::payload`, one per message type.
//!
//! | Message type                   | Body                   |
//! |--------------------------------|------------------------|
//! | `request`                      | [`Request`]            |
//! | `oneWay`                       | [`OneWayRequest`]      |
//! | `reply`                        | [`Reply`]              |
//! | `subscriptionRequest`          | [`SubscriptionRequest`]|
//! | `broadcastSubscriptionRequest` | [`SubscriptionRequest`]|
//! | `subscriptionReply`            | [`SubscriptionReply`]  |
//! | `subscriptionPublication`      | [`SubscriptionPublication`] |
//! | `subscriptionStop`             | [`SubscriptionStop`]   |

use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Publication time-to-live used when a subscriber does not ask for one.
pub const DEFAULT_PUBLICATION_TTL_MS: u64 = 10_000;

/// Expiry value meaning "never expires".
pub const NO_EXPIRY_DATE: Timestamp = 0;

/// Method call expecting a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub request_reply_id: String,
    pub method_name: String,
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(default)]
    pub param_datatypes: Vec<String>,
}

impl Request {
    /// Create a request with a fresh request/reply id.
    pub fn new(method_name: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            request_reply_id: uuid::Uuid::new_v4().to_string(),
            method_name: method_name.into(),
            params,
            param_datatypes: Vec::new(),
        }
    }
}

/// Fire-and-forget method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneWayRequest {
    pub method_name: String,
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(default)]
    pub param_datatypes: Vec<String>,
}

impl OneWayRequest {
    pub fn new(method_name: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method_name: method_name.into(),
            params,
            param_datatypes: Vec::new(),
        }
    }
}

/// Result of a [`Request`], correlated by `request_reply_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub request_reply_id: String,
    #[serde(default)]
    pub response: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

impl Reply {
    pub fn success(request_reply_id: impl Into<String>, response: Vec<Value>) -> Self {
        Self {
            request_reply_id: request_reply_id.into(),
            response,
            error: None,
        }
    }

    pub fn failure(request_reply_id: impl Into<String>, error: RemoteError) -> Self {
        Self {
            request_reply_id: request_reply_id.into(),
            response: Vec::new(),
            error: Some(error),
        }
    }
}

/// Quality-of-service settings of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionQos {
    /// Absolute expiry of the subscription; [`NO_EXPIRY_DATE`] for never.
    pub expiry_date_ms: Timestamp,
    /// Time-to-live of each publication sent for this subscription.
    pub publication_ttl_ms: u64,
}

impl Default for SubscriptionQos {
    fn default() -> Self {
        Self {
            expiry_date_ms: NO_EXPIRY_DATE,
            publication_ttl_ms: DEFAULT_PUBLICATION_TTL_MS,
        }
    }
}

impl SubscriptionQos {
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expiry_date_ms != NO_EXPIRY_DATE && self.expiry_date_ms < now
    }
}

/// Subscription to an attribute or broadcast of a provider.
///
/// Broadcast subscriptions may carry filter parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub subscription_id: String,
    pub subscribed_to_name: String,
    #[serde(default)]
    pub qos: SubscriptionQos,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_parameters: Option<BTreeMap<String, String>>,
}

impl SubscriptionRequest {
    pub fn new(subscribed_to_name: impl Into<String>, qos: SubscriptionQos) -> Self {
        Self {
            subscription_id: uuid::Uuid::new_v4().to_string(),
            subscribed_to_name: subscribed_to_name.into(),
            qos,
            filter_parameters: None,
        }
    }
}

/// Provider acknowledgement of a subscription request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionReply {
    pub subscription_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

/// A value (or error) pushed to a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPublication {
    pub subscription_id: String,
    #[serde(default)]
    pub response: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

/// Request to cancel a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStop {
    pub subscription_id: String,
}

/// Category of an error reported back across the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteErrorKind {
    #[serde(rename = "ProviderRuntimeException")]
    ProviderRuntime,
    #[serde(rename = "MethodInvocationException")]
    MethodInvocation,
    #[serde(rename = "SubscriptionException")]
    Subscription,
    #[serde(rename = "PublicationMissedException")]
    PublicationMissed,
    #[serde(rename = "TimeoutException")]
    Timeout,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteErrorKind::ProviderRuntime => "provider runtime error",
            RemoteErrorKind::MethodInvocation => "method invocation error",
            RemoteErrorKind::Subscription => "subscription error",
            RemoteErrorKind::PublicationMissed => "publication missed",
            RemoteErrorKind::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// Error carried inside a reply, subscription reply or publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{kind}: {detail_message}")]
pub struct RemoteError {
    #[serde(rename = "_typeName")]
    pub kind: RemoteErrorKind,
    pub detail_message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, detail_message: impl Into<String>) -> Self {
        Self {
            kind,
            detail_message: detail_message.into(),
        }
    }

    pub fn provider_runtime(detail_message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::ProviderRuntime, detail_message)
    }

    pub fn method_invocation(detail_message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::MethodInvocation, detail_message)
    }

    pub fn subscription(detail_message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Subscription, detail_message)
    }

    pub fn timeout(detail_message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Timeout, detail_message)
    }
}
