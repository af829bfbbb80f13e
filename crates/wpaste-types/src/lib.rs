//! Foundation types for wpaste.
//!
//! Every other wpaste crate depends on `wpaste-types`.
//!
//! # Key Types
//!
//! - [`Entry`]: one stored paste: payload, timestamps, TTL, credential hashes
//! - [`validate_entry_name`]: syntax rules for caller-chosen names
//! - [`Clock`]: wall-clock source, swappable for [`ManualClock`] in tests

pub mod clock;
pub mod entry;
pub mod error;
pub mod names;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::Entry;
pub use error::TypeError;
pub use names::{validate_entry_name, MAX_NAME_LEN, NAME_ALPHABET};
