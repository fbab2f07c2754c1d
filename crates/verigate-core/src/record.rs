use crate::id::{RedirectId, UserId};
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A verification record owned by the backing store.
///
/// `is_verified` flips false to true exactly once, outside this crate.
/// A verified record is a terminal success no matter how old it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    /// The subject this record verifies.
    pub user_id: UserId,
    /// Identifies the issued verification page; must match the request.
    pub page_token: String,
    /// Token embedded in the bot deep link. Absent before issuance.
    pub verify_token: Option<String>,
    pub is_verified: bool,
    /// Anchors the verification-session window.
    pub created_at: Timestamp,
    pub verified_time: Option<Timestamp>,
}

impl VerificationRecord {
    /// Byte-for-byte comparison with the token supplied by the caller.
    pub fn matches_page_token(&self, supplied: &str) -> bool {
        self.page_token.as_bytes() == supplied.as_bytes()
    }

    /// Elapsed time since `created_at`, measured against `now`.
    pub fn session_age(&self, now: Timestamp) -> SignedDuration {
        now.duration_since(self.created_at)
    }

    /// Whether the verification session has strictly outlived `ttl`.
    pub fn session_expired(&self, now: Timestamp, ttl: Duration) -> bool {
        exceeds(self.session_age(now), ttl)
    }
}

/// The gateway's own record of one generated shortlink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectRecord {
    pub redirect_id: RedirectId,
    /// The short URL produced by the external shortener.
    pub shortlink: String,
    /// Back-reference to the subject, not an ownership edge.
    pub user_id: UserId,
    /// Anchors the redirect-page window, independent of the session window.
    pub created_at: Timestamp,
    /// Telemetry only; never gates access.
    pub visited: bool,
}

impl RedirectRecord {
    /// Creates an unvisited record for a freshly generated shortlink.
    pub fn new(user_id: UserId, shortlink: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            redirect_id: RedirectId::generate(),
            shortlink: shortlink.into(),
            user_id,
            created_at,
            visited: false,
        }
    }

    /// Whether the redirect page has strictly outlived `ttl`.
    pub fn expired(&self, now: Timestamp, ttl: Duration) -> bool {
        exceeds(now.duration_since(self.created_at), ttl)
    }
}

/// Strict comparison: an age equal to the TTL is still valid.
fn exceeds(age: SignedDuration, ttl: Duration) -> bool {
    match SignedDuration::try_from(ttl) {
        Ok(ttl) => age > ttl,
        // A TTL beyond SignedDuration's range never elapses.
        Err(_) => false,
    }
}
