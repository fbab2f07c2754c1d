use crate::error::Result;
use crate::id::{RedirectId, UserId};
use crate::record::{RedirectRecord, VerificationRecord};
use async_trait::async_trait;

/// Contract with the backing record store.
///
/// The store is the only source of truth for verification and visited
/// state. Callers re-read on every request and never keep a copy longer
/// than one request.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Retrieves the verification record for a subject.
    /// Returns `None` if no record was issued.
    async fn get_verification(&self, user_id: UserId) -> Result<Option<VerificationRecord>>;

    /// Retrieves a redirect record by its identifier.
    /// Returns `None` if the identifier is unknown.
    async fn get_redirect(&self, redirect_id: &RedirectId) -> Result<Option<RedirectRecord>>;

    /// Persists a new redirect record. Returns `Err(Conflict)` if the
    /// identifier is already taken.
    async fn create_redirect(&self, record: RedirectRecord) -> Result<()>;

    /// Flags a redirect record as visited.
    ///
    /// Idempotent: marking an already visited or unknown record is not an error.
    async fn mark_visited(&self, redirect_id: &RedirectId) -> Result<()>;

    /// Probes the backend for liveness.
    async fn health_check(&self) -> Result<()>;
}
