// src/fact_registry.rs
// Cheap existence probe against the external fact store (out of scope per
// spec section 1 — this crate only needs to know whether a fact_id exists).

use async_trait::async_trait;

/// Seam for the external collaborator that owns fact identity. SignalIngestor
/// uses this to reject signals for facts that don't exist before doing any
/// embedding or store work.
#[async_trait]
pub trait FactRegistry: Send + Sync {
    async fn exists(&self, bank_id: &str, fact_id: &str) -> bool;
}

/// A registry that treats every fact_id as valid. Used where the real fact
/// store is wired elsewhere and this crate is tested in isolation.
#[derive(Debug, Default)]
pub struct AlwaysPresent;

#[async_trait]
impl FactRegistry for AlwaysPresent {
    async fn exists(&self, _bank_id: &str, _fact_id: &str) -> bool {
        true
    }
}
