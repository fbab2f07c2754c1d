use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use tracing::trace;
use verigate_core::error::{Result, StoreError};
use verigate_core::{RecordStore, RedirectId, RedirectRecord, UserId, VerificationRecord};

/// In-memory implementation of [`RecordStore`] backed by `DashMap`.
///
/// Verification records are written through [`put_verification`] and
/// [`mark_verified`], which stand in for the external issuing side.
///
/// [`put_verification`]: InMemoryRecordStore::put_verification
/// [`mark_verified`]: InMemoryRecordStore::mark_verified
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    verifications: DashMap<UserId, VerificationRecord>,
    redirects: DashMap<String, RedirectRecord>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the verification record for its subject.
    pub fn put_verification(&self, record: VerificationRecord) {
        self.verifications.insert(record.user_id, record);
    }

    /// Applies the external verification event.
    ///
    /// Returns `false` if the subject has no record. A record that is
    /// already verified keeps its original `verified_time`.
    pub fn mark_verified(&self, user_id: UserId, at: Timestamp) -> bool {
        let Some(mut record) = self.verifications.get_mut(&user_id) else {
            return false;
        };
        if !record.is_verified {
            record.is_verified = true;
            record.verified_time = Some(at);
        }
        true
    }

    /// Number of redirect records held.
    pub fn redirect_count(&self) -> usize {
        self.redirects.len()
    }

    /// Redirect records created for a subject, in no particular order.
    pub fn redirects_for(&self, user_id: UserId) -> Vec<RedirectRecord> {
        self.redirects
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_verification(&self, user_id: UserId) -> Result<Option<VerificationRecord>> {
        Ok(self
            .verifications
            .get(&user_id)
            .map(|entry| entry.value().clone()))
    }

    async fn get_redirect(&self, redirect_id: &RedirectId) -> Result<Option<RedirectRecord>> {
        Ok(self
            .redirects
            .get(redirect_id.as_str())
            .map(|entry| entry.value().clone()))
    }

    async fn create_redirect(&self, record: RedirectRecord) -> Result<()> {
        match self.redirects.entry(record.redirect_id.as_str().to_owned()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(record.redirect_id.to_string())),
            Entry::Vacant(slot) => {
                trace!(redirect_id = %record.redirect_id, "stored redirect record");
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn mark_visited(&self, redirect_id: &RedirectId) -> Result<()> {
        if let Some(mut record) = self.redirects.get_mut(redirect_id.as_str()) {
            record.visited = true;
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
