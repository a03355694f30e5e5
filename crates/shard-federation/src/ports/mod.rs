//! # Ports Layer (Hexagonal Architecture)
//!
//! Inbound API offered to callers and outbound capabilities required from
//! the underlying stores.

pub mod inbound;
pub mod outbound;

pub use inbound::FederatedSessionApi;
pub use outbound::{ShardSession, ShardStore, ShardTransaction, TransactionSynchronization};
