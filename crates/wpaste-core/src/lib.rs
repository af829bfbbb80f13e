//! Core paste logic for wpaste.
//!
//! [`PasteService`] exposes the four entry operations (create, read, edit,
//! remove) on top of one shared [`EntryStore`](wpaste_store::EntryStore):
//!
//! - [`NameAllocator`] picks unique short names inside the creating transaction
//! - [`Expirer`] decides passive expiry (reads see `Gone`) and sweep eligibility
//! - [`Sweeper`] purges entries past TTL plus grace in the background
//! - [`CredentialGuard`](wpaste_crypto::CredentialGuard) gates reads and edits

pub mod allocator;
pub mod config;
pub mod error;
pub mod expirer;
pub mod service;

pub use allocator::NameAllocator;
pub use config::PasteConfig;
pub use error::{PasteError, PasteResult, ValidationError};
pub use expirer::{Expirer, SweepReport, Sweeper};
pub use service::{parse_ttl, CreateRequest, PasteService};
