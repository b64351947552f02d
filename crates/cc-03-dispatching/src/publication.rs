//! Publication manager.
//!
//! Tracks the subscriptions local providers serve and turns attribute or
//! broadcast changes into publication envelopes for the subscriber.

use crate::domain::{ChangeListener, ListenerHandle, ProviderListeners};
use crate::ports::RequestCaller;
use cc_01_message_routing::MessageRouter;
use dashmap::DashMap;
use serde_json::Value;
use shared_types::{
    Envelope, MessageType, ParticipantId, SubscriptionPublication, SubscriptionRequest,
    TimeSource, Timestamp,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

struct Publication {
    provider_id: ParticipantId,
    subscribed_to_name: String,
    handle: ListenerHandle,
    listeners: Arc<ProviderListeners>,
    expiry: Timestamp,
}

impl Publication {
    fn detach(&self) {
        self.listeners
            .remove_listener(&self.subscribed_to_name, self.handle);
    }
}

/// Sends a publication each time the subscribed attribute changes.
struct PublicationSender {
    subscription_id: String,
    provider_id: ParticipantId,
    subscriber_id: ParticipantId,
    publication_ttl_ms: u64,
    router: Arc<dyn MessageRouter>,
    time: Arc<dyn TimeSource>,
}

impl PublicationSender {
    fn publish(&self, values: Vec<Value>) {
        let body = SubscriptionPublication {
            subscription_id: self.subscription_id.clone(),
            response: values,
            error: None,
        };
        let expiry = self.time.now().saturating_add(self.publication_ttl_ms);
        let envelope = match Envelope::with_body(
            MessageType::Publication,
            self.provider_id.clone(),
            self.subscriber_id.clone(),
            expiry,
            &body,
        ) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(subscription_id = %self.subscription_id, error = %e, "failed to encode publication");
                return;
            }
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(subscription_id = %self.subscription_id, "no runtime available, publication dropped");
            return;
        };
        let router = self.router.clone();
        let subscription_id = self.subscription_id.clone();
        runtime.spawn(async move {
            if let Err(e) = router.route(envelope).await {
                warn!(subscription_id = %subscription_id, error = %e, "failed to route publication");
            }
        });
    }
}

impl ChangeListener for PublicationSender {
    fn on_change(&self, values: &[Value]) {
        self.publish(values.to_vec());
    }
}

pub struct PublicationManager {
    publications: DashMap<String, Publication>,
    router: Arc<dyn MessageRouter>,
    time: Arc<dyn TimeSource>,
}

impl PublicationManager {
    pub fn new(router: Arc<dyn MessageRouter>, time: Arc<dyn TimeSource>) -> Self {
        Self {
            publications: DashMap::new(),
            router,
            time,
        }
    }

    /// Start publishing for a subscription request.
    ///
    /// A request reusing an active subscription id replaces it. Attribute
    /// subscriptions receive the current value right away.
    pub async fn add(
        &self,
        subscriber_id: &str,
        provider_id: &str,
        caller: Arc<dyn RequestCaller>,
        request: SubscriptionRequest,
        is_attribute: bool,
    ) {
        let subscription_id = request.subscription_id.clone();
        self.stop(&subscription_id);

        let sender = Arc::new(PublicationSender {
            subscription_id: subscription_id.clone(),
            provider_id: provider_id.to_string(),
            subscriber_id: subscriber_id.to_string(),
            publication_ttl_ms: request.qos.publication_ttl_ms,
            router: self.router.clone(),
            time: self.time.clone(),
        });
        let listeners = caller.listeners();
        let handle = listeners.add_listener(&request.subscribed_to_name, sender.clone());

        info!(
            subscription_id = %subscription_id,
            provider_id = %provider_id,
            subscriber_id = %subscriber_id,
            name = %request.subscribed_to_name,
            "publication registered"
        );
        self.publications.insert(
            subscription_id.clone(),
            Publication {
                provider_id: provider_id.to_string(),
                subscribed_to_name: request.subscribed_to_name.clone(),
                handle,
                listeners,
                expiry: request.qos.expiry_date_ms,
            },
        );

        if is_attribute {
            let getter = getter_name(&request.subscribed_to_name);
            match caller.invoke(&getter, Vec::new()).await {
                Ok(values) => sender.publish(values),
                Err(e) => {
                    debug!(subscription_id = %subscription_id, error = %e, "no initial value to publish")
                }
            }
        }
    }

    /// Stop publishing for `subscription_id`.
    pub fn stop(&self, subscription_id: &str) -> bool {
        match self.publications.remove(subscription_id) {
            Some((_, publication)) => {
                publication.detach();
                debug!(subscription_id = %subscription_id, "publication stopped");
                true
            }
            None => false,
        }
    }

    /// Stop every publication served by `provider_id`.
    pub fn stop_for_provider(&self, provider_id: &str) -> usize {
        self.remove_where(|p| p.provider_id == provider_id)
    }

    /// Stop every publication whose subscription has expired.
    pub fn remove_expired(&self) -> usize {
        let now = self.time.now();
        self.remove_where(|p| p.expiry != shared_types::NO_EXPIRY_DATE && p.expiry < now)
    }

    pub fn contains(&self, subscription_id: &str) -> bool {
        self.publications.contains_key(subscription_id)
    }

    pub fn len(&self) -> usize {
        self.publications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publications.is_empty()
    }

    fn remove_where(&self, pred: impl Fn(&Publication) -> bool) -> usize {
        let ids: Vec<String> = self
            .publications
            .iter()
            .filter(|entry| pred(entry.value()))
            .map(|entry| entry.key().clone())
            .collect();
        ids.iter().filter(|id| self.stop(id)).count()
    }
}

/// Name of the provider operation returning an attribute's value.
pub fn getter_name(attribute: &str) -> String {
    let mut chars = attribute.chars();
    match chars.next() {
        Some(first) => format!("get{}{}", first.to_uppercase(), chars.as_str()),
        None => "get".to_string(),
    }
}
