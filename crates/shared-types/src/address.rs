//! # Transport Addresses
//!
//! Serialized addresses travel in the `replyAddress` header and are tagged
//! with a `_typeName` discriminator:
//!
//! | `_typeName`              | Transport                         |
//! |--------------------------|-----------------------------------|
//! | `MqttAddress`            | MQTT broker topic                 |
//! | `ChannelAddress`         | HTTP long-poll channel            |
//! | `WebSocketAddress`       | WebSocket server endpoint         |
//! | `WebSocketClientAddress` | WebSocket client connected to us  |
//! | `InProcessAddress`       | Provider living in this process   |

use crate::errors::AddressError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of a topic on an MQTT broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttAddress {
    pub broker_uri: String,
    pub topic: String,
}

/// Address of an HTTP long-poll channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAddress {
    pub messaging_endpoint_url: String,
    pub channel_id: String,
}

/// WebSocket protocol scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WebSocketProtocol {
    Ws,
    Wss,
}

/// Address of a WebSocket server endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebSocketAddress {
    pub protocol: WebSocketProtocol,
    pub host: String,
    pub port: u16,
    pub path: String,
}

/// Address of a WebSocket client connected to this node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebSocketClientAddress {
    pub id: String,
}

/// Next-hop address of a participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "_typeName")]
pub enum Address {
    #[serde(rename = "MqttAddress")]
    Mqtt(MqttAddress),
    #[serde(rename = "ChannelAddress")]
    Channel(ChannelAddress),
    #[serde(rename = "WebSocketAddress")]
    WebSocket(WebSocketAddress),
    #[serde(rename = "WebSocketClientAddress")]
    WebSocketClient(WebSocketClientAddress),
    #[serde(rename = "InProcessAddress")]
    InProcess,
}

/// Transport family of an address, used to pick a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressKind {
    Mqtt,
    Channel,
    WebSocket,
    WebSocketClient,
    InProcess,
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressKind::Mqtt => "mqtt",
            AddressKind::Channel => "http",
            AddressKind::WebSocket => "websocket",
            AddressKind::WebSocketClient => "websocket-client",
            AddressKind::InProcess => "in-process",
        };
        f.write_str(name)
    }
}

impl Address {
    /// Shorthand for an MQTT address.
    pub fn mqtt(broker_uri: impl Into<String>, topic: impl Into<String>) -> Self {
        Address::Mqtt(MqttAddress {
            broker_uri: broker_uri.into(),
            topic: topic.into(),
        })
    }

    /// Shorthand for an HTTP channel address.
    pub fn channel(messaging_endpoint_url: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Address::Channel(ChannelAddress {
            messaging_endpoint_url: messaging_endpoint_url.into(),
            channel_id: channel_id.into(),
        })
    }

    /// Shorthand for a WebSocket client address.
    pub fn websocket_client(id: impl Into<String>) -> Self {
        Address::WebSocketClient(WebSocketClientAddress { id: id.into() })
    }

    pub fn kind(&self) -> AddressKind {
        match self {
            Address::Mqtt(_) => AddressKind::Mqtt,
            Address::Channel(_) => AddressKind::Channel,
            Address::WebSocket(_) => AddressKind::WebSocket,
            Address::WebSocketClient(_) => AddressKind::WebSocketClient,
            Address::InProcess => AddressKind::InProcess,
        }
    }

    /// Serialize to the `_typeName`-tagged JSON form used in headers.
    pub fn to_json(&self) -> String {
        // Every variant is a plain struct of strings and integers.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Deserialize any tagged address.
    pub fn from_json(raw: &str) -> Result<Self, AddressError> {
        serde_json::from_str(raw).map_err(|e| AddressError::Malformed {
            raw: raw.to_string(),
            reason: e.to_string(),
        })
    }
}

/// A concrete address type accepted as a reply path by one transport.
///
/// Ingress skeletons are generic over this so that a reply address of the
/// wrong transport is rejected when it is learned.
pub trait TransportAddress:
    TryFrom<Address, Error = AddressError> + Into<Address> + Send + Sync + 'static
{
    const KIND: AddressKind;
}

macro_rules! transport_address {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Address {
            fn from(address: $ty) -> Self {
                Address::$variant(address)
            }
        }

        impl TryFrom<Address> for $ty {
            type Error = AddressError;

            fn try_from(address: Address) -> Result<Self, Self::Error> {
                match address {
                    Address::$variant(inner) => Ok(inner),
                    other => Err(AddressError::WrongTransport {
                        expected: AddressKind::$variant,
                        actual: other.kind(),
                    }),
                }
            }
        }

        impl TransportAddress for $ty {
            const KIND: AddressKind = AddressKind::$variant;
        }
    };
}

transport_address!(MqttAddress, Mqtt);
transport_address!(ChannelAddress, Channel);
transport_address!(WebSocketAddress, WebSocket);
transport_address!(WebSocketClientAddress, WebSocketClient);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Mqtt(a) => write!(f, "mqtt://{}#{}", a.broker_uri, a.topic),
            Address::Channel(a) => write!(f, "{}{}", a.messaging_endpoint_url, a.channel_id),
            Address::WebSocket(a) => {
                let scheme = match a.protocol {
                    WebSocketProtocol::Ws => "ws",
                    WebSocketProtocol::Wss => "wss",
                };
                write!(f, "{}://{}:{}{}", scheme, a.host, a.port, a.path)
            }
            Address::WebSocketClient(a) => write!(f, "ws-client:{}", a.id),
            Address::InProcess => f.write_str("in-process"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mqtt_address_wire_form() {
        let address = Address::mqtt("tcp://broker:1883", "cc/replies");
        let json = address.to_json();
        assert!(json.contains(r#""_typeName":"MqttAddress""#));
        assert!(json.contains(r#""brokerUri":"tcp://broker:1883""#));
        assert_eq!(Address::from_json(&json).unwrap(), address);
    }

    #[test]
    fn test_in_process_address_has_only_tag() {
        let json = Address::InProcess.to_json();
        assert_eq!(json, r#"{"_typeName":"InProcessAddress"}"#);
        assert_eq!(Address::from_json(&json).unwrap(), Address::InProcess);
    }

    #[test]
    fn test_websocket_address_parses() {
        let raw = r#"{"_typeName":"WebSocketAddress","protocol":"WSS","host":"cc","port":4243,"path":"/ws"}"#;
        let address = Address::from_json(raw).unwrap();
        assert_eq!(address.kind(), AddressKind::WebSocket);
        assert_eq!(address.to_string(), "wss://cc:4243/ws");
    }

    #[test]
    fn test_garbage_address_rejected() {
        assert!(matches!(
            Address::from_json("not json"),
            Err(AddressError::Malformed { .. })
        ));
        assert!(Address::from_json(r#"{"_typeName":"CarrierPigeon"}"#).is_err());
    }

    #[test]
    fn test_transport_address_conversion() {
        let address = Address::websocket_client("client-7");
        let client = WebSocketClientAddress::try_from(address.clone()).unwrap();
        assert_eq!(client.id, "client-7");
        assert_eq!(Address::from(client), address);
        assert!(MqttAddress::try_from(Address::InProcess).is_err());
    }

    #[test]
    fn test_wrong_transport_rejected() {
        let raw = Address::channel("http://bounce/", "ch-1").to_json();
        let err = MqttAddress::try_from(Address::from_json(&raw).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            AddressError::WrongTransport {
                expected: AddressKind::Mqtt,
                actual: AddressKind::Channel
            }
        ));
    }
}
