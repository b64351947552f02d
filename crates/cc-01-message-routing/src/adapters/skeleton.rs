//! Transport ingress skeletons.
//!
//! A skeleton sits between a transport's network client and the router. It
//! decodes raw text into an [`Envelope`], rejects malformed messages, learns
//! the sender's reply path and forwards the envelope. Nothing it encounters
//! is returned to the transport: every failure is logged and the message is
//! dropped.

use crate::domain::RouteOutcome;
use crate::ports::MessageRouter;
use crate::service::Router;
use async_trait::async_trait;
use shared_types::{
    Address, AddressError, ChannelAddress, Envelope, MqttAddress, RoutingError, TransportAddress,
    WebSocketClientAddress,
};
use std::marker::PhantomData;
use tracing::{debug, error, trace, warn};

/// Ingress skeleton for one transport, parameterised by the address type
/// that transport accepts as a reply path.
pub struct TransportIngressSkeleton<A: TransportAddress> {
    router: Router,
    _transport: PhantomData<fn() -> A>,
}

pub type MqttMessagingSkeleton = TransportIngressSkeleton<MqttAddress>;
pub type HttpMessagingSkeleton = TransportIngressSkeleton<ChannelAddress>;
pub type WebSocketMessagingSkeleton = TransportIngressSkeleton<WebSocketClientAddress>;

impl<A: TransportAddress> Clone for TransportIngressSkeleton<A> {
    fn clone(&self) -> Self {
        Self::new(self.router.clone())
    }
}

impl<A: TransportAddress> TransportIngressSkeleton<A> {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            _transport: PhantomData,
        }
    }

    /// Entry point for transports delivering raw bytes.
    pub async fn on_raw_message_received(&self, bytes: &[u8]) {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.on_text_message_received(text).await,
            Err(e) => {
                error!(transport = %A::KIND, error = %e, "dropping non UTF-8 message");
            }
        }
    }

    /// Entry point for transports delivering text frames.
    pub async fn on_text_message_received(&self, raw: &str) {
        match Envelope::from_json(raw) {
            Ok(envelope) => self.transmit(envelope).await,
            Err(e) => {
                error!(transport = %A::KIND, error = %e, "dropping malformed message");
            }
        }
    }

    /// Learn the reply path if the message expects one, then route it.
    ///
    /// An expired message is dropped before the reply path is learned.
    pub async fn transmit(&self, envelope: Envelope) {
        if envelope.is_expired_at(self.router.time_source().now()) {
            debug!(
                transport = %A::KIND,
                message_id = %envelope.message_id(),
                msg_type = %envelope.msg_type(),
                "dropping expired incoming message"
            );
            return;
        }

        if envelope.msg_type().expects_reply() {
            if let Err(e) = self.learn_reply_address(&envelope) {
                error!(
                    transport = %A::KIND,
                    message_id = %envelope.message_id(),
                    from = %envelope.from(),
                    error = %e,
                    "cannot learn reply address, dropping message"
                );
                return;
            }
        }

        let message_id = envelope.message_id().to_string();
        match self.router.route(envelope).await {
            Ok(outcome) => {
                trace!(transport = %A::KIND, message_id = %message_id, ?outcome, "message routed");
            }
            Err(e) => {
                error!(
                    transport = %A::KIND,
                    message_id = %message_id,
                    error = %e,
                    "routing of incoming message failed"
                );
            }
        }
    }

    fn learn_reply_address(&self, envelope: &Envelope) -> Result<(), AddressError> {
        let raw = envelope.reply_address().ok_or(AddressError::Missing)?;
        let address = <A as TryFrom<Address>>::try_from(Address::from_json(raw)?)?;
        self.router.add_next_hop(envelope.from(), address.into());
        Ok(())
    }
}

/// Entry point for participants living in this process.
///
/// Envelopes are built locally, so only the payload needs checking; reply
/// paths of local participants are registered explicitly.
#[derive(Clone)]
pub struct InProcessMessagingSkeleton {
    router: Router,
}

impl InProcessMessagingSkeleton {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

#[async_trait]
impl MessageRouter for InProcessMessagingSkeleton {
    async fn route(&self, envelope: Envelope) -> Result<RouteOutcome, RoutingError> {
        if envelope.payload().is_empty() {
            warn!(message_id = %envelope.message_id(), "rejecting local message with empty payload");
            return Err(RoutingError::InvalidEnvelope {
                message_id: envelope.message_id().to_string(),
                reason: "empty payload".into(),
            });
        }
        self.router.route(envelope).await
    }

    fn add_next_hop(&self, participant_id: &str, address: Address) {
        self.router.add_next_hop(participant_id, address)
    }

    fn remove_next_hop(&self, participant_id: &str) -> Option<Address> {
        self.router.remove_next_hop(participant_id)
    }
}
