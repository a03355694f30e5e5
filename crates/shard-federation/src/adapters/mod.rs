//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound store ports.

mod in_memory;

pub use in_memory::{FailurePoint, InMemorySession, InMemoryShardStore, InMemoryTransaction};
