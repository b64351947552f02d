//! Domain layer for dispatching.

pub mod cache;
pub mod callers;
pub mod correlation;
pub mod errors;
pub mod listeners;

pub use cache::{CachedValue, ClientCache, ClientQCache};
pub use callers::RequestCallerDirectory;
pub use correlation::{
    CorrelationStats, CorrelationTable, ReplyResult, SubscriptionListener, SubscriptionResult,
};
pub use errors::DispatchError;
pub use listeners::{ChangeListener, ListenerHandle, ProviderListeners};
