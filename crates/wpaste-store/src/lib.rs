//! Transactional entry storage for wpaste.
//!
//! One table maps entry names to bincode-encoded [`Entry`](wpaste_types::Entry)
//! records. All access goes through transactions:
//!
//! - [`EntryStore::view`]: read-only, over a snapshot of the last commit
//! - [`EntryStore::update`]: read-write, all-or-nothing
//!
//! # Storage Backends
//!
//! - [`EntryStore::in_memory`]: nothing touches disk; for tests and embedding
//! - [`EntryStore::open`]: committed transactions are appended to a
//!   CRC-framed [`Journal`] and replayed on open
//!
//! # Design Rules
//!
//! 1. A write transaction is journaled as one frame, then applied.
//! 2. Writers are serialized. Readers work on an `Arc` snapshot of the last
//!    commit and take the table lock only to clone it; a commit takes it
//!    only to apply its batch.
//! 3. A record that fails to decode is an error for that record only.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod journal;
pub mod store;
pub mod txn;

pub use error::{StoreError, StoreResult};
pub use journal::{Journal, JournalOp, SyncMode};
pub use store::EntryStore;
pub use txn::{ReadTxn, WriteTxn};
