//! Adapters for the dispatching subsystem.

pub mod facade;
pub mod in_process;
pub mod pool;
pub mod proxy;

pub use facade::{MessagingFacade, MessagingQos, DEFAULT_MESSAGING_TTL};
pub use in_process::InProcessMessagingStub;
pub use pool::{DispatchHandle, DispatchPool};
pub use proxy::ProxyConnector;

use crate::service::Dispatcher;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Periodically fail expired requests and drop expired subscriptions and
/// publications.
pub async fn expiry_sweep_task(dispatcher: Arc<Dispatcher>, interval: Duration) {
    let mut sweep_interval = tokio::time::interval(interval);
    sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        sweep_interval.tick().await;
        let correlations = dispatcher.correlation().remove_expired();
        let publications = dispatcher.publications().remove_expired();
        if correlations > 0 || publications > 0 {
            debug!(correlations, publications, "expired dispatch entries removed");
        }
    }
}
