//! Adapters layer for access control.

pub mod directory;
pub mod local_controller;

pub use directory::ProviderDirectory;
pub use local_controller::LocalDomainAccessController;
