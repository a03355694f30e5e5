//! # Deferred Events
//!
//! Configuration calls that arrive before a shard's session or query object
//! exists. They are queued per shard and replayed, in insertion order, when
//! the object is created.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::entities::ShardQuery;
use super::errors::FederationError;
use super::value_objects::{CacheMode, FlushMode};
use crate::ports::outbound::ShardSession;

/// Deferred session configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenSessionEvent {
    /// Enable a named fetch profile.
    EnableFetchProfile(String),
    /// Disable a named fetch profile.
    DisableFetchProfile(String),
    /// Default read-only flag for loaded entities.
    SetDefaultReadOnly(bool),
    /// Cache interaction mode.
    SetCacheMode(CacheMode),
    /// Flush policy.
    SetFlushMode(FlushMode),
}

impl OpenSessionEvent {
    /// Apply to a freshly opened (or already open) session.
    pub fn apply<S: ShardSession + ?Sized>(&self, session: &mut S) -> Result<(), FederationError> {
        match self {
            Self::EnableFetchProfile(name) => session.enable_fetch_profile(name),
            Self::DisableFetchProfile(name) => session.disable_fetch_profile(name),
            Self::SetDefaultReadOnly(read_only) => {
                session.set_default_read_only(*read_only);
                Ok(())
            }
            Self::SetCacheMode(mode) => {
                session.set_cache_mode(*mode);
                Ok(())
            }
            Self::SetFlushMode(mode) => {
                session.set_flush_mode(*mode);
                Ok(())
            }
        }
    }
}

impl fmt::Display for OpenSessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnableFetchProfile(name) => write!(f, "enable fetch profile '{}'", name),
            Self::DisableFetchProfile(name) => write!(f, "disable fetch profile '{}'", name),
            Self::SetDefaultReadOnly(v) => write!(f, "set default read-only {}", v),
            Self::SetCacheMode(mode) => write!(f, "set cache mode {:?}", mode),
            Self::SetFlushMode(mode) => write!(f, "set flush mode {:?}", mode),
        }
    }
}

/// Deferred per-query configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CriteriaEvent {
    /// Loaded entities are read-only.
    SetReadOnly(bool),
    /// Results may be cached.
    SetCacheable(bool),
    /// Cache interaction for this query.
    SetCacheMode(CacheMode),
    /// Fetch size hint.
    SetFetchSize(u32),
    /// Query timeout in seconds.
    SetTimeout(u32),
    /// Statement comment.
    SetComment(String),
}

impl CriteriaEvent {
    /// Apply to a shard-local query object.
    pub fn apply(&self, query: &mut ShardQuery) {
        let options = &mut query.options;
        match self {
            Self::SetReadOnly(v) => options.read_only = *v,
            Self::SetCacheable(v) => options.cacheable = *v,
            Self::SetCacheMode(mode) => options.cache_mode = Some(*mode),
            Self::SetFetchSize(n) => options.fetch_size = Some(*n),
            Self::SetTimeout(secs) => options.timeout_secs = Some(*secs),
            Self::SetComment(text) => options.comment = Some(text.clone()),
        }
    }
}
