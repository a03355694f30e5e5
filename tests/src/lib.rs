//! # Shard Federation Test Suite
//!
//! Unified test crate for cross-crate flows.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs          # Shared sessions and seed data
//! └── integration/         # End-to-end flows through ShardedSession
//!     ├── query_federation.rs
//!     ├── deferred_events.rs
//!     ├── transactions.rs
//!     └── custom_store.rs
//!
//! tests/benches/
//! └── federation_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p federation-tests
//!
//! # By category
//! cargo test -p federation-tests integration::transactions::
//!
//! # Benchmarks
//! cargo bench -p federation-tests
//! ```

#![allow(unused_variables)]
#![allow(dead_code)]

pub mod fixtures;
