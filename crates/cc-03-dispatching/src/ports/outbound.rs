//! Outbound (Driven) ports: the local provider behind a participant id.

use crate::domain::ProviderListeners;
use async_trait::async_trait;
use serde_json::Value;
use shared_types::RemoteError;
use std::sync::Arc;

/// Invokes operations on a local provider.
#[async_trait]
pub trait RequestCaller: Send + Sync {
    /// Invoke `method_name` and return its output values.
    async fn invoke(&self, method_name: &str, params: Vec<Value>) -> Result<Vec<Value>, RemoteError>;

    /// Invoke `method_name` without producing a reply.
    async fn invoke_one_way(&self, method_name: &str, params: Vec<Value>) {
        if let Err(error) = self.invoke(method_name, params).await {
            tracing::debug!(method = %method_name, error = %error, "one-way call failed");
        }
    }

    /// Change listeners of the provider's attributes and broadcasts.
    fn listeners(&self) -> Arc<ProviderListeners>;
}
