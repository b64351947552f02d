//! Domain layer for access control.

pub mod errors;
pub mod permission;
pub mod store;
pub mod validator;

pub use errors::AccessControlError;
pub use permission::{consumer_permission, InterfacePermission, ProviderInterface};
pub use store::DomainAccessStore;
pub use validator::AceValidator;
