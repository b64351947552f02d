//! # Envelope
//!
//! The unit of routing. Every message that crosses the cluster controller is
//! an `Envelope`: a typed header block plus an opaque payload string.
//!
//! ## Wire Format
//!
//! ```json
//! {
//!   "type": "request",
//!   "header": {
//!     "from": "consumer-1",
//!     "to": "provider-1",
//!     "replyAddress": "{\"_typeName\":\"MqttAddress\",...}",
//!     "expiryDate": "1700000000000",
//!     "msgId": "5f1c...",
//!     "creatorUserId": "alice"
//!   },
//!   "payload": "{\"requestReplyId\":...}"
//! }
//! ```
//!
//! `expiryDate` is accepted either as a JSON number or as a decimal string
//! and is always written back as a string. Unknown header keys are kept as
//! custom headers.

use crate::errors::EnvelopeError;
use crate::time::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Well-known header keys.
pub mod headers {
    pub const FROM: &str = "from";
    pub const TO: &str = "to";
    pub const REPLY_ADDRESS: &str = "replyAddress";
    pub const EXPIRY_DATE: &str = "expiryDate";
    pub const MESSAGE_ID: &str = "msgId";
    pub const CREATOR_USER_ID: &str = "creatorUserId";
}

/// The kind of an envelope, as carried in its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Request,
    Reply,
    OneWay,
    SubscriptionRequest,
    BroadcastSubscriptionRequest,
    SubscriptionReply,
    Publication,
    SubscriptionStop,
}

impl MessageType {
    pub const ALL: [MessageType; 8] = [
        MessageType::Request,
        MessageType::Reply,
        MessageType::OneWay,
        MessageType::SubscriptionRequest,
        MessageType::BroadcastSubscriptionRequest,
        MessageType::SubscriptionReply,
        MessageType::Publication,
        MessageType::SubscriptionStop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Request => "request",
            MessageType::Reply => "reply",
            MessageType::OneWay => "oneWay",
            MessageType::SubscriptionRequest => "subscriptionRequest",
            MessageType::BroadcastSubscriptionRequest => "broadcastSubscriptionRequest",
            MessageType::SubscriptionReply => "subscriptionReply",
            MessageType::Publication => "subscriptionPublication",
            MessageType::SubscriptionStop => "subscriptionStop",
        }
    }

    /// Message types whose sender expects something back and therefore
    /// advertise a reply address.
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            MessageType::Request
                | MessageType::SubscriptionRequest
                | MessageType::BroadcastSubscriptionRequest
        )
    }

    /// Message types that invoke a provider and are gated by consumer
    /// permissions when access control is enabled.
    pub fn is_consumer_call(&self) -> bool {
        matches!(
            self,
            MessageType::Request
                | MessageType::OneWay
                | MessageType::SubscriptionRequest
                | MessageType::BroadcastSubscriptionRequest
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(EnvelopeError::EmptyType);
        }
        MessageType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EnvelopeError::UnknownType(s.to_string()))
    }
}

/// A routed message.
///
/// Immutable once built, except that ingress may amend the reply address and
/// creator user id, and callers may attach custom headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    msg_type: MessageType,
    from: String,
    to: String,
    reply_address: Option<String>,
    expiry_date: Timestamp,
    message_id: String,
    creator_user_id: Option<String>,
    custom_headers: BTreeMap<String, String>,
    payload: String,
}

/// Raw JSON shape of an envelope before validation.
#[derive(Debug, Default, Serialize, Deserialize)]
struct WireEnvelope {
    #[serde(rename = "type", default)]
    msg_type: String,
    #[serde(default)]
    header: BTreeMap<String, Value>,
    #[serde(default)]
    payload: String,
}

impl Envelope {
    /// Create an envelope with a fresh message id.
    pub fn new(
        msg_type: MessageType,
        from: impl Into<String>,
        to: impl Into<String>,
        expiry_date: Timestamp,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            msg_type,
            from: from.into(),
            to: to.into(),
            reply_address: None,
            expiry_date,
            message_id: uuid::Uuid::new_v4().to_string(),
            creator_user_id: None,
            custom_headers: BTreeMap::new(),
            payload: payload.into(),
        }
    }

    /// Create an envelope whose payload is the JSON encoding of `body`.
    pub fn with_body<T: Serialize>(
        msg_type: MessageType,
        from: impl Into<String>,
        to: impl Into<String>,
        expiry_date: Timestamp,
        body: &T,
    ) -> Result<Self, EnvelopeError> {
        let payload = serde_json::to_string(body)?;
        Ok(Self::new(msg_type, from, to, expiry_date, payload))
    }

    pub fn with_reply_address(mut self, reply_address: impl Into<String>) -> Self {
        self.reply_address = Some(reply_address.into());
        self
    }

    pub fn with_creator_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.creator_user_id = Some(user_id.into());
        self
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = message_id.into();
        self
    }

    pub fn msg_type(&self) -> MessageType {
        self.msg_type
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn reply_address(&self) -> Option<&str> {
        self.reply_address.as_deref()
    }

    pub fn expiry_date(&self) -> Timestamp {
        self.expiry_date
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn creator_user_id(&self) -> Option<&str> {
        self.creator_user_id.as_deref()
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn custom_header(&self, key: &str) -> Option<&str> {
        self.custom_headers.get(key).map(String::as_str)
    }

    pub fn custom_headers(&self) -> &BTreeMap<String, String> {
        &self.custom_headers
    }

    pub fn set_reply_address(&mut self, reply_address: impl Into<String>) {
        self.reply_address = Some(reply_address.into());
    }

    pub fn set_creator_user_id(&mut self, user_id: impl Into<String>) {
        self.creator_user_id = Some(user_id.into());
    }

    /// Attach a custom header. Well-known keys are not overridable this way.
    pub fn set_custom_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if is_well_known(&key) {
            tracing::warn!(header = %key, "ignoring attempt to override well-known header");
            return;
        }
        self.custom_headers.insert(key, value.into());
    }

    /// An envelope is expired once its expiry date lies strictly in the past.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expiry_date < now
    }

    /// Decode the payload into a typed body.
    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T, EnvelopeError> {
        serde_json::from_str(&self.payload).map_err(|e| EnvelopeError::Payload {
            message_id: self.message_id.clone(),
            expected: std::any::type_name::<T>()
                .rsplit("::")
                .next()
                .unwrap_or("payload"),
            reason: e.to_string(),
        })
    }

    /// Parse and validate an envelope from its wire form.
    ///
    /// Validation order: non-empty type, non-empty payload, expiry date
    /// present, then known type.
    pub fn from_json(raw: &str) -> Result<Self, EnvelopeError> {
        let mut wire: WireEnvelope = serde_json::from_str(raw)?;

        if wire.msg_type.is_empty() {
            return Err(EnvelopeError::EmptyType);
        }

        let message_id = match wire.header.remove(headers::MESSAGE_ID) {
            Some(value) => header_string(value),
            None => uuid::Uuid::new_v4().to_string(),
        };

        if wire.payload.is_empty() {
            return Err(EnvelopeError::EmptyPayload { message_id });
        }

        let expiry_date = match wire.header.remove(headers::EXPIRY_DATE) {
            None | Some(Value::Null) => {
                return Err(EnvelopeError::MissingExpiryDate { message_id });
            }
            Some(value) => parse_expiry(value).map_err(|value| {
                EnvelopeError::InvalidExpiryDate {
                    message_id: message_id.clone(),
                    value,
                }
            })?,
        };

        let msg_type: MessageType = wire.msg_type.parse()?;

        let from = wire
            .header
            .remove(headers::FROM)
            .map(header_string)
            .unwrap_or_default();
        let to = wire
            .header
            .remove(headers::TO)
            .map(header_string)
            .unwrap_or_default();
        let reply_address = wire.header.remove(headers::REPLY_ADDRESS).map(header_string);
        let creator_user_id = wire
            .header
            .remove(headers::CREATOR_USER_ID)
            .map(header_string);

        let custom_headers = wire
            .header
            .into_iter()
            .map(|(k, v)| (k, header_string(v)))
            .collect();

        Ok(Self {
            msg_type,
            from,
            to,
            reply_address,
            expiry_date,
            message_id,
            creator_user_id,
            custom_headers,
            payload: wire.payload,
        })
    }

    /// Serialize to the wire form.
    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        let mut header: BTreeMap<String, Value> = self
            .custom_headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        header.insert(headers::FROM.into(), Value::String(self.from.clone()));
        header.insert(headers::TO.into(), Value::String(self.to.clone()));
        header.insert(
            headers::EXPIRY_DATE.into(),
            Value::String(self.expiry_date.to_string()),
        );
        header.insert(
            headers::MESSAGE_ID.into(),
            Value::String(self.message_id.clone()),
        );
        if let Some(reply_address) = &self.reply_address {
            header.insert(
                headers::REPLY_ADDRESS.into(),
                Value::String(reply_address.clone()),
            );
        }
        if let Some(user) = &self.creator_user_id {
            header.insert(headers::CREATOR_USER_ID.into(), Value::String(user.clone()));
        }

        let wire = WireEnvelope {
            msg_type: self.msg_type.as_str().to_string(),
            header,
            payload: self.payload.clone(),
        };
        Ok(serde_json::to_string(&wire)?)
    }
}

fn is_well_known(key: &str) -> bool {
    matches!(
        key,
        headers::FROM
            | headers::TO
            | headers::REPLY_ADDRESS
            | headers::EXPIRY_DATE
            | headers::MESSAGE_ID
            | headers::CREATOR_USER_ID
    )
}

fn header_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn parse_expiry(value: Value) -> Result<Timestamp, String> {
    match value {
        Value::Number(n) => n.as_u64().ok_or_else(|| n.to_string()),
        Value::String(s) => s.trim().parse::<Timestamp>().map_err(|_| s),
        other => Err(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(msg_type: &str, expiry: &str, payload: &str) -> String {
        format!(
            r#"{{"type":"{msg_type}","header":{{"from":"c1","to":"p1","msgId":"m-1"{expiry}}},"payload":{payload}}}"#
        )
    }

    #[test]
    fn test_message_type_strings() {
        for t in MessageType::ALL {
            assert_eq!(t.as_str().parse::<MessageType>().unwrap(), t);
        }
        assert_eq!(MessageType::Publication.as_str(), "subscriptionPublication");
    }

    #[test]
    fn test_unknown_type_rejected() {
        let text = raw("carrierPigeon", r#","expiryDate":"100""#, r#""{}""#);
        assert!(matches!(
            Envelope::from_json(&text),
            Err(EnvelopeError::UnknownType(t)) if t == "carrierPigeon"
        ));
    }

    #[test]
    fn test_empty_type_rejected_first() {
        // Both type and payload are empty; type wins.
        let text = raw("", "", r#""""#);
        assert!(matches!(
            Envelope::from_json(&text),
            Err(EnvelopeError::EmptyType)
        ));
    }

    #[test]
    fn test_empty_payload_rejected_before_expiry() {
        let text = raw("request", "", r#""""#);
        assert!(matches!(
            Envelope::from_json(&text),
            Err(EnvelopeError::EmptyPayload { message_id }) if message_id == "m-1"
        ));
    }

    #[test]
    fn test_missing_expiry_rejected() {
        let text = raw("request", "", r#""{}""#);
        assert!(matches!(
            Envelope::from_json(&text),
            Err(EnvelopeError::MissingExpiryDate { .. })
        ));
    }

    #[test]
    fn test_invalid_expiry_rejected() {
        let text = raw("request", r#","expiryDate":"soon""#, r#""{}""#);
        assert!(matches!(
            Envelope::from_json(&text),
            Err(EnvelopeError::InvalidExpiryDate { value, .. }) if value == "soon"
        ));
    }

    #[test]
    fn test_numeric_expiry_accepted() {
        let text = raw("oneWay", r#","expiryDate":1700000000000"#, r#""{}""#);
        let envelope = Envelope::from_json(&text).unwrap();
        assert_eq!(envelope.expiry_date(), 1_700_000_000_000);
        assert_eq!(envelope.msg_type(), MessageType::OneWay);
        assert_eq!(envelope.message_id(), "m-1");
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            Envelope::from_json("{not json"),
            Err(EnvelopeError::Json(_))
        ));
    }

    #[test]
    fn test_wire_form_keeps_custom_headers() {
        let mut envelope = Envelope::new(MessageType::Request, "c1", "p1", 42, "{}")
            .with_reply_address("{\"_typeName\":\"InProcessAddress\"}")
            .with_creator_user_id("alice");
        envelope.set_custom_header("traceparent", "00-abc");

        let text = envelope.to_json().unwrap();
        assert!(text.contains(r#""expiryDate":"42""#));

        let decoded = Envelope::from_json(&text).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.custom_header("traceparent"), Some("00-abc"));
    }

    #[test]
    fn test_well_known_headers_not_overridable() {
        let mut envelope = Envelope::new(MessageType::Request, "c1", "p1", 42, "{}");
        envelope.set_custom_header(headers::TO, "someone-else");
        assert_eq!(envelope.to(), "p1");
        assert!(envelope.custom_headers().is_empty());
    }

    #[test]
    fn test_expiry_is_strict() {
        let envelope = Envelope::new(MessageType::Request, "c1", "p1", 100, "{}");
        assert!(!envelope.is_expired_at(99));
        assert!(!envelope.is_expired_at(100));
        assert!(envelope.is_expired_at(101));
    }

    #[test]
    fn test_reply_classification() {
        assert!(MessageType::Request.expects_reply());
        assert!(MessageType::BroadcastSubscriptionRequest.expects_reply());
        assert!(!MessageType::OneWay.expects_reply());
        assert!(MessageType::OneWay.is_consumer_call());
        assert!(!MessageType::Reply.is_consumer_call());
        assert!(!MessageType::Publication.is_consumer_call());
    }
}
