//! Credential primitives for wpaste.
//!
//! Secrets are never stored; entries keep an Argon2id hash in PHC string
//! format. [`CredentialGuard`] derives and verifies those hashes and applies
//! the access policy: an unset access hash lets everyone read, an unset edit
//! hash lets nobody edit or delete.
//!
//! Hashing is delegated to the `argon2` crate.

pub mod error;
pub mod guard;
pub mod params;

pub use error::GuardError;
pub use guard::{CredentialGuard, Permission};
pub use params::HashParams;
