//! Consumer proxy for a single provider, with cached attribute reads.

use crate::adapters::facade::{MessagingFacade, MessagingQos};
use crate::domain::{ClientCache, DispatchError, SubscriptionListener};
use crate::publication::getter_name;
use serde_json::Value;
use shared_types::{OneWayRequest, Request, SubscriptionQos, SubscriptionRequest, TimeSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

pub struct ProxyConnector {
    facade: Arc<MessagingFacade>,
    cache: Arc<dyn ClientCache>,
    time: Arc<dyn TimeSource>,
    proxy_id: String,
    provider_id: String,
    qos: MessagingQos,
    max_cache_age: Duration,
}

impl ProxyConnector {
    pub fn new(
        facade: Arc<MessagingFacade>,
        cache: Arc<dyn ClientCache>,
        time: Arc<dyn TimeSource>,
        proxy_id: impl Into<String>,
        provider_id: impl Into<String>,
        qos: MessagingQos,
    ) -> Self {
        Self {
            facade,
            cache,
            time,
            proxy_id: proxy_id.into(),
            provider_id: provider_id.into(),
            qos,
            max_cache_age: Duration::ZERO,
        }
    }

    /// Serve attribute reads from the cache while entries are younger than `age`.
    pub fn with_max_cache_age(mut self, age: Duration) -> Self {
        self.max_cache_age = age;
        self
    }

    pub fn proxy_id(&self) -> &str {
        &self.proxy_id
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Read an attribute, from the cache when fresh enough.
    pub async fn get_attribute(&self, name: &str) -> Result<Value, DispatchError> {
        let cache_key = self.cache_key(name);
        if !self.max_cache_age.is_zero() {
            if let Some(cached) = self.cache.lookup(&cache_key) {
                let age = self.time.now().saturating_sub(cached.timestamp);
                if age <= self.max_cache_age.as_millis() as u64 {
                    trace!(attribute = %name, age_ms = age, "attribute served from cache");
                    return Ok(cached.value);
                }
            }
        }

        let response = self.call(&getter_name(name), Vec::new()).await?;
        let value = response.into_iter().next().unwrap_or(Value::Null);
        self.cache.insert(cache_key, value.clone());
        Ok(value)
    }

    /// Invoke an operation on the provider and wait for its output values.
    pub async fn call(&self, method_name: &str, params: Vec<Value>) -> Result<Vec<Value>, DispatchError> {
        self.facade
            .send_request(
                &self.proxy_id,
                &self.provider_id,
                Request::new(method_name, params),
                &self.qos,
            )
            .await
    }

    pub async fn call_one_way(&self, method_name: &str, params: Vec<Value>) -> Result<(), DispatchError> {
        self.facade
            .send_one_way(
                &self.proxy_id,
                &self.provider_id,
                OneWayRequest::new(method_name, params),
                &self.qos,
            )
            .await
    }

    pub async fn subscribe_to_attribute(
        &self,
        name: &str,
        qos: SubscriptionQos,
        listener: Arc<dyn SubscriptionListener>,
    ) -> Result<String, DispatchError> {
        self.facade
            .subscribe(
                &self.proxy_id,
                &self.provider_id,
                SubscriptionRequest::new(name, qos),
                listener,
                &self.qos,
                false,
            )
            .await
    }

    pub async fn subscribe_to_broadcast(
        &self,
        name: &str,
        qos: SubscriptionQos,
        listener: Arc<dyn SubscriptionListener>,
    ) -> Result<String, DispatchError> {
        self.facade
            .subscribe(
                &self.proxy_id,
                &self.provider_id,
                SubscriptionRequest::new(name, qos),
                listener,
                &self.qos,
                true,
            )
            .await
    }

    pub async fn unsubscribe(&self, subscription_id: &str) -> Result<(), DispatchError> {
        self.facade
            .unsubscribe(&self.proxy_id, &self.provider_id, subscription_id, &self.qos)
            .await
    }

    fn cache_key(&self, name: &str) -> String {
        format!("{}:{}", self.provider_id, name)
    }
}
