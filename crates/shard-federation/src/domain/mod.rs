//! # Domain Module
//!
//! Core domain types for shard federation.

pub mod entities;
pub mod errors;
pub mod events;
pub mod invariants;
pub mod property;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use events::*;
pub use invariants::*;
pub use property::*;
pub use value_objects::*;
