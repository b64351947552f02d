//! Router service.
//!
//! Owns the routing table, the message queue and the registry of transport
//! senders. Cheap to clone; all clones share state.

use crate::domain::{MessageQueue, QueueEntry, RouteOutcome, RoutingTable};
use crate::ports::{AccessGate, MessageRouter, MessageSender};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Address, AddressKind, Envelope, RoutingError, TimeSource};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Routes envelopes to the next hop of their destination participant.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    routing_table: RoutingTable,
    queue: MessageQueue,
    senders: RwLock<HashMap<AddressKind, Arc<dyn MessageSender>>>,
    access_gate: RwLock<Option<Arc<dyn AccessGate>>>,
    time: Arc<dyn TimeSource>,
}

impl Router {
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                routing_table: RoutingTable::new(),
                queue: MessageQueue::new(time.clone()),
                senders: RwLock::new(HashMap::new()),
                access_gate: RwLock::new(None),
                time,
            }),
        }
    }

    /// Register the sender used for every hop of the given transport.
    pub fn register_sender(&self, kind: AddressKind, sender: Arc<dyn MessageSender>) {
        info!(transport = %kind, "registering message sender");
        self.inner.senders.write().insert(kind, sender);
    }

    /// Install the consumer-permission gate applied to provider calls.
    pub fn set_access_gate(&self, gate: Arc<dyn AccessGate>) {
        *self.inner.access_gate.write() = Some(gate);
    }

    /// Learn the hop of a participant, replacing any previous one.
    ///
    /// Messages already queued for the participant are flushed in the
    /// background.
    pub fn add_next_hop(&self, participant_id: impl Into<String>, address: Address) {
        let participant_id = participant_id.into();
        debug!(participant_id = %participant_id, address = %address, "adding next hop");
        if let Some(previous) = self
            .inner
            .routing_table
            .insert(participant_id.clone(), address)
        {
            trace!(participant_id = %participant_id, previous = %previous, "replaced next hop");
        }
        if self.inner.queue.contains_participant(&participant_id) {
            self.spawn_flush(participant_id);
        }
    }

    pub fn remove_next_hop(&self, participant_id: &str) -> Option<Address> {
        debug!(participant_id = %participant_id, "removing next hop");
        self.inner.routing_table.remove(participant_id)
    }

    pub fn resolve_next_hop(&self, participant_id: &str) -> Option<Address> {
        self.inner.routing_table.lookup(participant_id)
    }

    pub fn routing_table_len(&self) -> usize {
        self.inner.routing_table.len()
    }

    pub fn queue(&self) -> &MessageQueue {
        &self.inner.queue
    }

    pub fn time_source(&self) -> Arc<dyn TimeSource> {
        self.inner.time.clone()
    }

    /// Route an envelope to its destination.
    ///
    /// Consumer calls are checked against the access gate only when they are
    /// about to be handed to a provider in this process. Calls leaving over a
    /// transport, or waiting in the queue, are checked by whoever hosts the
    /// provider.
    pub async fn route(&self, envelope: Envelope) -> Result<RouteOutcome, RoutingError> {
        if self.is_expired(&envelope) {
            debug!(
                message_id = %envelope.message_id(),
                msg_type = %envelope.msg_type(),
                "dropping expired message"
            );
            return Ok(RouteOutcome::Expired);
        }

        let participant_id = envelope.to().to_string();
        match self.inner.routing_table.lookup(&participant_id) {
            Some(address) => self.deliver(address, envelope).await,
            None => {
                let depth = self.inner.queue.enqueue(envelope);
                debug!(
                    participant_id = %participant_id,
                    depth,
                    "no next hop known, message queued"
                );
                // A hop may have been learned between the lookup and the enqueue.
                if self.inner.routing_table.contains(&participant_id) {
                    self.spawn_flush(participant_id);
                }
                Ok(RouteOutcome::Queued)
            }
        }
    }

    /// Deliver everything queued for a participant, oldest first. Returns how
    /// many were delivered.
    ///
    /// Stops, leaving the rest in order, if the participant loses its hop.
    pub async fn flush_queued(&self, participant_id: &str) -> usize {
        let mut delivered = 0;
        while let Some(entry) = self.inner.queue.take_next(participant_id) {
            if self.is_expired(&entry.envelope) {
                debug!(
                    message_id = %entry.envelope.message_id(),
                    participant_id = %participant_id,
                    "dropping expired queued message"
                );
                continue;
            }
            let Some(address) = self.inner.routing_table.lookup(participant_id) else {
                self.inner.queue.requeue_front(entry);
                break;
            };
            let QueueEntry { envelope, .. } = entry;
            let message_id = envelope.message_id().to_string();
            match self.deliver(address, envelope).await {
                Ok(RouteOutcome::Delivered) => delivered += 1,
                Ok(_) => {}
                Err(e) => {
                    error!(message_id = %message_id, error = %e, "failed to deliver queued message");
                }
            }
        }
        delivered
    }

    /// Drop every decayed queue entry.
    pub fn sweep_queue(&self) -> usize {
        self.inner.queue.sweep_expired()
    }

    fn is_expired(&self, envelope: &Envelope) -> bool {
        envelope.is_expired_at(self.inner.time.now())
    }

    async fn deliver(
        &self,
        address: Address,
        envelope: Envelope,
    ) -> Result<RouteOutcome, RoutingError> {
        if envelope.msg_type().is_consumer_call() && address.kind() == AddressKind::InProcess {
            let gate = self.inner.access_gate.read().clone();
            if let Some(gate) = gate {
                if !gate.has_consumer_permission(&envelope).await {
                    warn!(
                        message_id = %envelope.message_id(),
                        from = %envelope.from(),
                        to = %envelope.to(),
                        creator = envelope.creator_user_id().unwrap_or_default(),
                        "consumer permission denied, dropping message"
                    );
                    return Ok(RouteOutcome::Denied);
                }
                // The permission lookup may have taken a while.
                if self.is_expired(&envelope) {
                    debug!(
                        message_id = %envelope.message_id(),
                        "message expired during permission check"
                    );
                    return Ok(RouteOutcome::Expired);
                }
            }
        }

        self.send_to(address, envelope).await?;
        Ok(RouteOutcome::Delivered)
    }

    async fn send_to(&self, address: Address, envelope: Envelope) -> Result<(), RoutingError> {
        let kind = address.kind();
        let sender = self.inner.senders.read().get(&kind).cloned();
        let Some(sender) = sender else {
            error!(
                transport = %kind,
                participant_id = %envelope.to(),
                "no message sender registered for transport"
            );
            return Err(RoutingError::NoSender {
                kind,
                participant_id: envelope.to().to_string(),
            });
        };

        let participant_id = envelope.to().to_string();
        let message_id = envelope.message_id().to_string();
        trace!(message_id = %message_id, address = %address, "sending message");
        sender
            .send_message(&address, envelope)
            .await
            .map_err(|source| {
                error!(
                    message_id = %message_id,
                    participant_id = %participant_id,
                    error = %source,
                    "transport failed to deliver message"
                );
                RoutingError::Transport {
                    participant_id,
                    source,
                }
            })
    }

    fn spawn_flush(&self, participant_id: String) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let router = self.clone();
                handle.spawn(async move {
                    let delivered = router.flush_queued(&participant_id).await;
                    if delivered > 0 {
                        debug!(participant_id = %participant_id, delivered, "flushed queued messages");
                    }
                });
            }
            Err(_) => {
                warn!(
                    participant_id = %participant_id,
                    "no async runtime, queued messages wait for the next flush"
                );
            }
        }
    }
}

#[async_trait]
impl MessageRouter for Router {
    async fn route(&self, envelope: Envelope) -> Result<RouteOutcome, RoutingError> {
        Router::route(self, envelope).await
    }

    fn add_next_hop(&self, participant_id: &str, address: Address) {
        Router::add_next_hop(self, participant_id, address)
    }

    fn remove_next_hop(&self, participant_id: &str) -> Option<Address> {
        Router::remove_next_hop(self, participant_id)
    }
}
