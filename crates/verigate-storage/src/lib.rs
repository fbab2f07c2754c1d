//! [`RecordStore`] backends for the Verigate gateway.
//!
//! [`RecordStore`]: verigate_core::RecordStore

pub mod memory;
pub mod mysql;

pub use memory::InMemoryRecordStore;
pub use mysql::MySqlRecordStore;
pub use verigate_core::{RecordStore, StoreError};
