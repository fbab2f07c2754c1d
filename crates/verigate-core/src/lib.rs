//! Core types and contracts for the Verigate redirect gateway.
//!
//! This crate holds the record shapes shared with the backing store, the
//! pure input validators, the [`RecordStore`] contract and the clock
//! abstraction used for every expiry decision.

pub mod clock;
pub mod error;
pub mod id;
pub mod record;
pub mod store;
pub mod validate;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{InvalidInput, StoreError};
pub use id::{RedirectId, UserId};
pub use record::{RedirectRecord, VerificationRecord};
pub use store::RecordStore;
