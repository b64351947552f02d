//! Shared test doubles.

use async_trait::async_trait;
use cc_01_message_routing::MessageSender;
use cc_03_dispatching::{ProviderListeners, RequestCaller, SubscriptionListener};
use parking_lot::Mutex;
use serde_json::{json, Value};
use shared_types::{Address, Envelope, MessageType, RemoteError, TransportError};
use std::sync::Arc;
use std::time::Duration;

/// Epoch milliseconds used as "now" throughout the suite.
pub const NOW: u64 = 1_700_000_000_000;

/// Transport sender that records every envelope it is asked to send.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(Address, Envelope)>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<(Address, Envelope)> {
        self.sent.lock().clone()
    }

    /// Wait until an envelope of `msg_type` has been sent.
    pub async fn wait_for(&self, msg_type: MessageType) -> (Address, Envelope) {
        let found = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let hit = self
                    .sent
                    .lock()
                    .iter()
                    .find(|(_, e)| e.msg_type() == msg_type)
                    .cloned();
                if let Some(hit) = hit {
                    return hit;
                }
                tokio::task::yield_now().await;
            }
        })
        .await;
        match found {
            Ok(hit) => hit,
            Err(_) => panic!("no {msg_type} envelope was sent"),
        }
    }
}

#[async_trait]
impl MessageSender for RecordingTransport {
    async fn send_message(&self, address: &Address, envelope: Envelope) -> Result<(), TransportError> {
        self.sent.lock().push((address.clone(), envelope));
        Ok(())
    }
}

/// Provider with a `volume` attribute and an `add` operation.
pub struct RadioProvider {
    listeners: Arc<ProviderListeners>,
    calls: Mutex<Vec<String>>,
}

impl RadioProvider {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(ProviderListeners::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Simulate the provider changing its volume.
    pub fn set_volume(&self, volume: i64) {
        self.listeners.notify("volume", &[json!(volume)]);
    }
}

impl Default for RadioProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestCaller for RadioProvider {
    async fn invoke(&self, method_name: &str, params: Vec<Value>) -> Result<Vec<Value>, RemoteError> {
        self.calls.lock().push(method_name.to_string());
        match method_name {
            "getVolume" => Ok(vec![json!(7)]),
            "add" => Ok(vec![json!(params.iter().filter_map(Value::as_i64).sum::<i64>())]),
            other => Err(RemoteError::method_invocation(format!("no method {other}"))),
        }
    }

    fn listeners(&self) -> Arc<ProviderListeners> {
        self.listeners.clone()
    }
}

/// Subscription listener recording every callback.
#[derive(Default)]
pub struct RecordingListener {
    pub subscribed: Mutex<Vec<String>>,
    pub received: Mutex<Vec<Vec<Value>>>,
    pub errors: Mutex<Vec<RemoteError>>,
}

impl SubscriptionListener for RecordingListener {
    fn on_subscribed(&self, subscription_id: &str) {
        self.subscribed.lock().push(subscription_id.to_string());
    }

    fn on_receive(&self, values: Vec<Value>) {
        self.received.lock().push(values);
    }

    fn on_error(&self, error: RemoteError) {
        self.errors.lock().push(error);
    }
}
