// crates/member-gateway-core/src/runtime/memory.rs
// ============================================================================
// Module: Member Gateway In-Memory Metadata Store
// Description: Process-local key/value store for member metadata.
// Purpose: Back the metadata seam in tests and single-node deployments.
// Dependencies: serde_json, tokio, crate::interfaces
// ============================================================================

//! ## Overview
//! Values live in a `BTreeMap` behind an async lock. Contents are lost on
//! restart, so production deployments configure the HTTP store instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::interfaces::KeyValueStore;
use crate::interfaces::MetadataError;

// ============================================================================
// SECTION: Store
// ============================================================================

/// In-memory key/value store.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    /// Stored values keyed by path.
    values: RwLock<BTreeMap<String, Value>>,
}

impl InMemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the value at `key`.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.values.read().await.get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn set(&self, key: &str, value: Value) -> Result<(), MetadataError> {
        if key.is_empty() {
            return Err(MetadataError::Rejected("empty key".to_string()));
        }
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }
}
