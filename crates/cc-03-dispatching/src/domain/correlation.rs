//! Correlation Table - maps outstanding requests and subscriptions back to
//! the local caller waiting for them.
//!
//! Flow for a request:
//! 1. Consumer registers the `request_reply_id` and gets a oneshot receiver
//! 2. The request envelope is routed
//! 3. The dispatcher receives the reply and calls `resolve_reply()`
//! 4. The consumer awaits the receiver; the sweep fails it once expired
//!
//! Subscriptions additionally keep a listener until stopped, expired or
//! failed. Reply arrival and subscription teardown both go through one
//! table-wide lock; callbacks run after the lock is released.

use parking_lot::Mutex;
use serde_json::Value;
use shared_types::{
    RemoteError, Reply, SubscriptionPublication, SubscriptionReply, TimeSource, Timestamp,
    NO_EXPIRY_DATE,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Outcome delivered to a waiting request.
pub type ReplyResult = Result<Vec<Value>, RemoteError>;

/// Outcome delivered to a waiting subscribe call: the subscription id.
pub type SubscriptionResult = Result<String, RemoteError>;

/// Consumer-side callbacks of a subscription.
pub trait SubscriptionListener: Send + Sync {
    /// The provider acknowledged the subscription.
    fn on_subscribed(&self, _subscription_id: &str) {}

    /// A publication arrived.
    fn on_receive(&self, values: Vec<Value>);

    /// The subscription failed; no further callbacks follow.
    fn on_error(&self, error: RemoteError);
}

struct PendingReply {
    sender: oneshot::Sender<ReplyResult>,
    method: String,
    expiry: Timestamp,
}

struct SubscriptionEntry {
    listener: Arc<dyn SubscriptionListener>,
    /// Present until the subscription reply arrives.
    future: Option<oneshot::Sender<SubscriptionResult>>,
    expiry: Timestamp,
}

#[derive(Default)]
struct Tables {
    replies: HashMap<String, PendingReply>,
    subscriptions: HashMap<String, SubscriptionEntry>,
}

/// Statistics for the correlation table
#[derive(Debug, Default)]
pub struct CorrelationStats {
    /// Requests registered
    pub replies_registered: AtomicU64,
    /// Requests resolved by a reply
    pub replies_resolved: AtomicU64,
    /// Requests and subscriptions failed by expiry
    pub timeouts: AtomicU64,
    /// Replies or publications with no matching entry
    pub unmatched: AtomicU64,
}

pub struct CorrelationTable {
    tables: Mutex<Tables>,
    time: Arc<dyn TimeSource>,
    stats: CorrelationStats,
}

impl CorrelationTable {
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            time,
            stats: CorrelationStats::default(),
        }
    }

    /// Register an outstanding request expiring at `expiry`.
    pub fn register_reply(
        &self,
        request_reply_id: impl Into<String>,
        method: impl Into<String>,
        expiry: Timestamp,
    ) -> oneshot::Receiver<ReplyResult> {
        let (tx, rx) = oneshot::channel();
        let request_reply_id = request_reply_id.into();
        let method = method.into();
        debug!(request_reply_id = %request_reply_id, method = %method, "registered pending reply");
        self.tables.lock().replies.insert(
            request_reply_id,
            PendingReply {
                sender: tx,
                method,
                expiry,
            },
        );
        self.stats.replies_registered.fetch_add(1, Ordering::Relaxed);
        rx
    }

    /// Complete a pending request. Returns false for unknown ids.
    pub fn resolve_reply(&self, reply: Reply) -> bool {
        let pending = self.tables.lock().replies.remove(&reply.request_reply_id);
        let Some(pending) = pending else {
            self.stats.unmatched.fetch_add(1, Ordering::Relaxed);
            warn!(request_reply_id = %reply.request_reply_id, "reply for unknown or expired request");
            return false;
        };

        let result = match reply.error {
            Some(error) => Err(error),
            None => Ok(reply.response),
        };
        if pending.sender.send(result).is_err() {
            debug!(
                request_reply_id = %reply.request_reply_id,
                method = %pending.method,
                "requester went away before the reply arrived"
            );
        }
        self.stats.replies_resolved.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Drop a pending request without resolving it.
    pub fn cancel_reply(&self, request_reply_id: &str) -> bool {
        self.tables.lock().replies.remove(request_reply_id).is_some()
    }

    /// Register a subscription and its listener.
    ///
    /// The returned receiver resolves with the subscription id once the
    /// provider acknowledges it, or with the error it reported.
    pub fn register_subscription(
        &self,
        subscription_id: impl Into<String>,
        listener: Arc<dyn SubscriptionListener>,
        expiry: Timestamp,
    ) -> oneshot::Receiver<SubscriptionResult> {
        let (tx, rx) = oneshot::channel();
        let subscription_id = subscription_id.into();
        debug!(subscription_id = %subscription_id, "registered subscription");
        self.tables.lock().subscriptions.insert(
            subscription_id,
            SubscriptionEntry {
                listener,
                future: Some(tx),
                expiry,
            },
        );
        rx
    }

    /// Handle the provider's answer to a subscription request.
    ///
    /// On a carried error the subscription is removed, its future fails and
    /// the listener's error callback fires once. Otherwise the future
    /// resolves and the listener learns the subscription is active.
    pub fn resolve_subscription_reply(&self, reply: SubscriptionReply) -> bool {
        let id = reply.subscription_id;
        match reply.error {
            Some(error) => {
                let entry = self.tables.lock().subscriptions.remove(&id);
                let Some(entry) = entry else {
                    return self.unmatched_subscription(&id);
                };
                warn!(subscription_id = %id, error = %error, "subscription failed");
                if let Some(future) = entry.future {
                    let _ = future.send(Err(error.clone()));
                }
                entry.listener.on_error(error);
            }
            None => {
                let taken = {
                    let mut tables = self.tables.lock();
                    tables
                        .subscriptions
                        .get_mut(&id)
                        .map(|entry| (entry.listener.clone(), entry.future.take()))
                };
                let Some((listener, future)) = taken else {
                    return self.unmatched_subscription(&id);
                };
                debug!(subscription_id = %id, "subscription acknowledged");
                if let Some(future) = future {
                    let _ = future.send(Ok(id.clone()));
                }
                listener.on_subscribed(&id);
            }
        }
        true
    }

    /// Deliver a publication to its listener.
    ///
    /// A carried error ends the subscription: it is unregistered, the
    /// listener's error callback fires and a still-pending future fails.
    pub fn handle_publication(&self, publication: SubscriptionPublication) -> bool {
        let id = publication.subscription_id;
        match publication.error {
            Some(error) => {
                let entry = self.tables.lock().subscriptions.remove(&id);
                let Some(entry) = entry else {
                    return self.unmatched_subscription(&id);
                };
                warn!(subscription_id = %id, error = %error, "publication carried an error, unsubscribing");
                entry.listener.on_error(error.clone());
                if let Some(future) = entry.future {
                    let _ = future.send(Err(error));
                }
            }
            None => {
                let listener = self
                    .tables
                    .lock()
                    .subscriptions
                    .get(&id)
                    .map(|entry| entry.listener.clone());
                let Some(listener) = listener else {
                    return self.unmatched_subscription(&id);
                };
                listener.on_receive(publication.response);
            }
        }
        true
    }

    /// Forget a subscription without notifying anyone.
    pub fn remove_subscription(&self, subscription_id: &str) -> bool {
        self.tables
            .lock()
            .subscriptions
            .remove(subscription_id)
            .is_some()
    }

    /// Fail and remove every entry whose expiry has passed.
    ///
    /// Returns the number of entries removed.
    pub fn remove_expired(&self) -> usize {
        let now = self.time.now();
        let (replies, subscriptions) = {
            let mut tables = self.tables.lock();
            let expired_replies: Vec<(String, PendingReply)> = drain_where(&mut tables.replies, |r| {
                r.expiry < now
            });
            let expired_subscriptions: Vec<(String, SubscriptionEntry)> =
                drain_where(&mut tables.subscriptions, |s| {
                    s.expiry != NO_EXPIRY_DATE && s.expiry < now
                });
            (expired_replies, expired_subscriptions)
        };

        let removed = replies.len() + subscriptions.len();
        for (id, pending) in replies {
            warn!(request_reply_id = %id, method = %pending.method, "request expired without reply");
            let _ = pending.sender.send(Err(RemoteError::timeout(format!(
                "no reply for request {id} before expiry"
            ))));
        }
        for (id, entry) in subscriptions {
            debug!(subscription_id = %id, "subscription expired");
            if let Some(future) = entry.future {
                let _ = future.send(Err(RemoteError::timeout(format!(
                    "subscription {id} expired before it was acknowledged"
                ))));
            }
        }
        self.stats
            .timeouts
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn pending_reply_count(&self) -> usize {
        self.tables.lock().replies.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.tables.lock().subscriptions.len()
    }

    pub fn is_pending_reply(&self, request_reply_id: &str) -> bool {
        self.tables.lock().replies.contains_key(request_reply_id)
    }

    pub fn has_subscription(&self, subscription_id: &str) -> bool {
        self.tables.lock().subscriptions.contains_key(subscription_id)
    }

    pub fn stats(&self) -> &CorrelationStats {
        &self.stats
    }

    fn unmatched_subscription(&self, subscription_id: &str) -> bool {
        self.stats.unmatched.fetch_add(1, Ordering::Relaxed);
        debug!(subscription_id = %subscription_id, "no subscription registered for id");
        false
    }
}

fn drain_where<V>(map: &mut HashMap<String, V>, expired: impl Fn(&V) -> bool) -> Vec<(String, V)> {
    let ids: Vec<String> = map
        .iter()
        .filter(|(_, v)| expired(v))
        .map(|(k, _)| k.clone())
        .collect();
    ids.into_iter()
        .filter_map(|id| map.remove(&id).map(|v| (id, v)))
        .collect()
}
