//! Consumer-side messaging: turns local calls into routed envelopes and
//! waits for the correlated answer.

use crate::domain::{CorrelationTable, DispatchError, SubscriptionListener};
use cc_01_message_routing::{MessageRouter, RouteOutcome};
use serde_json::Value;
use shared_types::{
    expiry_from_ttl, Envelope, MessageType, OneWayRequest, Request, SubscriptionRequest,
    SubscriptionStop, TimeSource,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default time-to-live of outgoing messages.
pub const DEFAULT_MESSAGING_TTL: Duration = Duration::from_secs(60);

/// Per-call messaging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagingQos {
    pub ttl: Duration,
    pub custom_headers: BTreeMap<String, String>,
}

impl Default for MessagingQos {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_MESSAGING_TTL,
            custom_headers: BTreeMap::new(),
        }
    }
}

impl MessagingQos {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Self::default()
        }
    }
}

pub struct MessagingFacade {
    router: Arc<dyn MessageRouter>,
    correlation: Arc<CorrelationTable>,
    time: Arc<dyn TimeSource>,
}

impl MessagingFacade {
    pub fn new(
        router: Arc<dyn MessageRouter>,
        correlation: Arc<CorrelationTable>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            router,
            correlation,
            time,
        }
    }

    /// Send a request and wait for its reply.
    pub async fn send_request(
        &self,
        from: &str,
        to: &str,
        request: Request,
        qos: &MessagingQos,
    ) -> Result<Vec<Value>, DispatchError> {
        let expiry = expiry_from_ttl(self.time.as_ref(), qos.ttl);
        let request_reply_id = request.request_reply_id.clone();
        let method = request.method_name.clone();
        let envelope = self.envelope(MessageType::Request, from, to, expiry, &request, qos)?;

        let rx = self
            .correlation
            .register_reply(request_reply_id.clone(), method.clone(), expiry);
        if let Err(e) = self.route(envelope).await {
            self.correlation.cancel_reply(&request_reply_id);
            return Err(e);
        }

        match tokio::time::timeout(qos.ttl, rx).await {
            Ok(Ok(Ok(response))) => Ok(response),
            Ok(Ok(Err(remote))) => Err(DispatchError::Remote(remote)),
            Ok(Err(_)) => Err(DispatchError::Cancelled(request_reply_id)),
            Err(_) => {
                self.correlation.cancel_reply(&request_reply_id);
                warn!(request_reply_id = %request_reply_id, method = %method, "request timed out");
                Err(DispatchError::Timeout(method))
            }
        }
    }

    /// Send a request that expects no reply.
    pub async fn send_one_way(
        &self,
        from: &str,
        to: &str,
        request: OneWayRequest,
        qos: &MessagingQos,
    ) -> Result<(), DispatchError> {
        let expiry = expiry_from_ttl(self.time.as_ref(), qos.ttl);
        let envelope = self.envelope(MessageType::OneWay, from, to, expiry, &request, qos)?;
        self.route(envelope).await
    }

    /// Subscribe to an attribute, or to a broadcast when `broadcast` is set.
    ///
    /// Resolves with the subscription id once the provider acknowledges it.
    pub async fn subscribe(
        &self,
        from: &str,
        to: &str,
        request: SubscriptionRequest,
        listener: Arc<dyn SubscriptionListener>,
        qos: &MessagingQos,
        broadcast: bool,
    ) -> Result<String, DispatchError> {
        let msg_type = if broadcast {
            MessageType::BroadcastSubscriptionRequest
        } else {
            MessageType::SubscriptionRequest
        };
        let expiry = expiry_from_ttl(self.time.as_ref(), qos.ttl);
        let subscription_id = request.subscription_id.clone();
        let envelope = self.envelope(msg_type, from, to, expiry, &request, qos)?;

        let rx = self.correlation.register_subscription(
            subscription_id.clone(),
            listener,
            request.qos.expiry_date_ms,
        );
        if let Err(e) = self.route(envelope).await {
            self.correlation.remove_subscription(&subscription_id);
            return Err(e);
        }

        match tokio::time::timeout(qos.ttl, rx).await {
            Ok(Ok(Ok(id))) => Ok(id),
            Ok(Ok(Err(remote))) => Err(DispatchError::Remote(remote)),
            Ok(Err(_)) => Err(DispatchError::Cancelled(subscription_id)),
            Err(_) => {
                self.correlation.remove_subscription(&subscription_id);
                Err(DispatchError::Timeout(subscription_id))
            }
        }
    }

    /// Forget a subscription locally and tell the provider to stop publishing.
    pub async fn unsubscribe(
        &self,
        from: &str,
        to: &str,
        subscription_id: &str,
        qos: &MessagingQos,
    ) -> Result<(), DispatchError> {
        self.correlation.remove_subscription(subscription_id);
        let expiry = expiry_from_ttl(self.time.as_ref(), qos.ttl);
        let stop = SubscriptionStop {
            subscription_id: subscription_id.to_string(),
        };
        let envelope = self.envelope(MessageType::SubscriptionStop, from, to, expiry, &stop, qos)?;
        self.route(envelope).await
    }

    fn envelope<T: serde::Serialize>(
        &self,
        msg_type: MessageType,
        from: &str,
        to: &str,
        expiry: u64,
        body: &T,
        qos: &MessagingQos,
    ) -> Result<Envelope, DispatchError> {
        let mut envelope = Envelope::with_body(msg_type, from, to, expiry, body)?;
        for (key, value) in &qos.custom_headers {
            envelope.set_custom_header(key.clone(), value.clone());
        }
        Ok(envelope)
    }

    async fn route(&self, envelope: Envelope) -> Result<(), DispatchError> {
        let message_id = envelope.message_id().to_string();
        match self.router.route(envelope).await? {
            RouteOutcome::Delivered | RouteOutcome::Queued => Ok(()),
            outcome => {
                debug!(message_id = %message_id, ?outcome, "outgoing message dropped");
                Err(DispatchError::NotDelivered(outcome))
            }
        }
    }
}
