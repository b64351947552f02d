//! # Cluster Controller Test Suite
//!
//! Unified test crate for behavior that spans subsystems.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Recording transports, scripted providers
//! └── integration/      # Cross-subsystem flows
//!     ├── scenarios.rs  # Reply-address learning, permission lookups,
//!     │                 # subscription failure
//!     └── flows.rs      # Transport → provider → transport round trips
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cc-tests
//! cargo test -p cc-tests integration::flows::
//! ```

#[cfg(test)]
pub mod fixtures;
pub mod integration;
