//! Concurrency-safe registry of backend origins.
//!
//! The registry is the only mutable state shared across concurrent
//! dispatches. Every operation takes the whole set under a
//! `tokio::sync::RwLock`, so interleaved register/unregister/list calls
//! can never produce duplicates, lost updates, or torn reads. Dispatch
//! takes one [`list`](BackendRegistry::list) snapshot per request and
//! never re-reads mid-flight.

use std::collections::HashSet;

use tokio::sync::RwLock;

use crate::error::SprayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Added,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnregisterOutcome {
    Removed,
    NotFound,
}

#[derive(Debug, Default)]
pub struct BackendRegistry {
    origins: RwLock<HashSet<String>>,
}

impl BackendRegistry {
    /// Build a registry from the statically configured backend list,
    /// failing on the first malformed origin.
    pub fn from_static<I>(initial: I) -> Result<Self, SprayError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut origins = HashSet::new();
        for origin in initial {
            validate_origin(&origin)?;
            origins.insert(origin);
        }
        Ok(Self {
            origins: RwLock::new(origins),
        })
    }

    /// Snapshot of all registered origins. Order is not significant.
    pub async fn list(&self) -> Vec<String> {
        self.origins.read().await.iter().cloned().collect()
    }

    pub async fn register(&self, origin: &str) -> Result<RegisterOutcome, SprayError> {
        validate_origin(origin)?;
        let mut origins = self.origins.write().await;
        if origins.insert(origin.to_string()) {
            Ok(RegisterOutcome::Added)
        } else {
            Ok(RegisterOutcome::AlreadyExists)
        }
    }

    pub async fn unregister(&self, origin: &str) -> UnregisterOutcome {
        let mut origins = self.origins.write().await;
        if origins.remove(origin) {
            UnregisterOutcome::Removed
        } else {
            UnregisterOutcome::NotFound
        }
    }

    pub async fn len(&self) -> usize {
        self.origins.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.origins.read().await.is_empty()
    }
}

/// An origin must parse as an absolute http(s) URL with a host.
pub fn validate_origin(origin: &str) -> Result<url::Url, SprayError> {
    let parsed = url::Url::parse(origin).map_err(|e| SprayError::InvalidOrigin {
        origin: origin.to_string(),
        reason: e.to_string(),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(SprayError::InvalidOrigin {
            origin: origin.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    if parsed.host_str().is_none() {
        return Err(SprayError::InvalidOrigin {
            origin: origin.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(parsed)
}
