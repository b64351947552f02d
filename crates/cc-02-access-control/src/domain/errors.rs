use shared_types::AceKey;
use thiserror::Error;

/// Errors raised by the access control subsystem.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessControlError {
    /// An entry would widen the tier above it.
    #[error("invalid {tier} ACE for {key:?}")]
    InvalidEntry { tier: &'static str, key: AceKey },
}
