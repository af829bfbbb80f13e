use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::rngs::OsRng;
use tracing::warn;
use wpaste_types::Entry;

use crate::error::GuardError;
use crate::params::HashParams;

/// A permission an entry can gate behind a secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    /// Reading the payload.
    Access,
    /// Replacing the payload or deleting the entry.
    Edit,
}

impl Permission {
    /// Outcome when the entry has no hash for this permission.
    ///
    /// Reads are open, edits are closed. An entry created without an edit
    /// secret can never be changed or removed by anyone.
    pub const fn allowed_when_unset(self) -> bool {
        match self {
            Self::Access => true,
            Self::Edit => false,
        }
    }

    fn stored_hash(self, entry: &Entry) -> Option<&str> {
        match self {
            Self::Access => entry.access_hash(),
            Self::Edit => entry.edit_hash(),
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Edit => write!(f, "edit"),
        }
    }
}

/// Derives and checks one-way hashes of entry secrets.
pub struct CredentialGuard {
    argon2: Argon2<'static>,
}

impl CredentialGuard {
    /// Build a guard hashing with the given Argon2id cost.
    pub fn new(params: &HashParams) -> Result<Self, GuardError> {
        let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
            .map_err(|e| GuardError::InvalidParams(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash `secret` with a fresh random salt. Returns a PHC string.
    pub fn hash(&self, secret: &str) -> Result<String, GuardError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| GuardError::Hash(e.to_string()))
    }

    /// Check `presented` against a stored PHC hash.
    ///
    /// The hash's own parameters are used, so entries hashed under older
    /// settings still verify. A malformed hash never verifies.
    pub fn verify(&self, hash: &str, presented: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "stored credential hash is malformed");
                return false;
            }
        };
        self.argon2
            .verify_password(presented.as_bytes(), &parsed)
            .is_ok()
    }

    /// Decide whether `presented` grants `permission` on `entry`.
    ///
    /// With no stored hash the outcome is [`Permission::allowed_when_unset`],
    /// whatever was presented. With a stored hash, a missing secret and a
    /// wrong one are both refused.
    pub fn authorize(&self, entry: &Entry, permission: Permission, presented: Option<&str>) -> bool {
        match (permission.stored_hash(entry), presented) {
            (None, _) => permission.allowed_when_unset(),
            (Some(_), None) => false,
            (Some(hash), Some(secret)) => self.verify(hash, secret),
        }
    }
}

impl std::fmt::Debug for CredentialGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialGuard").finish_non_exhaustive()
    }
}
