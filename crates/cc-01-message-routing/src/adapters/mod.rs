//! Adapters layer: transport ingress and background maintenance.

pub mod skeleton;

pub use skeleton::{
    HttpMessagingSkeleton, InProcessMessagingSkeleton, MqttMessagingSkeleton,
    TransportIngressSkeleton, WebSocketMessagingSkeleton,
};

use crate::service::Router;
use std::time::Duration;
use tracing::debug;

/// Background task that periodically drops decayed queue entries.
pub async fn queue_sweep_task(router: Router, interval: Duration) {
    let mut sweep_interval = tokio::time::interval(interval);
    sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        sweep_interval.tick().await;
        let removed = router.sweep_queue();
        if removed > 0 {
            debug!(removed, "swept expired queued messages");
        }
    }
}
