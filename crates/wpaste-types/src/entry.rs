use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One stored paste.
///
/// The name is fixed at creation and doubles as the storage key. The payload
/// is the only field that changes afterwards. Credential hashes are opaque
/// PHC strings produced by the credential guard; an absent access hash means
/// anyone may read, an absent edit hash means nobody may ever edit or delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    name: String,
    payload: Vec<u8>,
    created_at: DateTime<Utc>,
    edited_at: Option<DateTime<Utc>>,
    /// Time-to-live in whole seconds. `None` never expires.
    ttl_secs: Option<u64>,
    access_hash: Option<String>,
    edit_hash: Option<String>,
}

impl Entry {
    /// Create an ungated, non-expiring entry.
    pub fn new(name: impl Into<String>, payload: Vec<u8>, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            payload,
            created_at,
            edited_at: None,
            ttl_secs: None,
            access_hash: None,
            edit_hash: None,
        }
    }

    pub fn with_ttl_secs(mut self, ttl_secs: Option<u64>) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn with_access_hash(mut self, hash: Option<String>) -> Self {
        self.access_hash = hash;
        self
    }

    pub fn with_edit_hash(mut self, hash: Option<String>) -> Self {
        self.edit_hash = hash;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn edited_at(&self) -> Option<DateTime<Utc>> {
        self.edited_at
    }

    pub fn ttl_secs(&self) -> Option<u64> {
        self.ttl_secs
    }

    pub fn access_hash(&self) -> Option<&str> {
        self.access_hash.as_deref()
    }

    pub fn edit_hash(&self) -> Option<&str> {
        self.edit_hash.as_deref()
    }

    /// Replace the payload and stamp the edit time.
    ///
    /// Neither `created_at` nor the TTL moves.
    pub fn replace_payload(&mut self, payload: Vec<u8>, now: DateTime<Utc>) {
        self.payload = payload;
        self.edited_at = Some(now);
    }

    /// The instant after which the entry is expired, if it ever is.
    ///
    /// A TTL too large to represent is treated as never expiring.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.ttl_secs?).ok()?;
        let ttl = Duration::try_seconds(secs)?;
        self.created_at.checked_add_signed(ttl)
    }

    /// Passive expiry: `true` iff a TTL is set and `now > created_at + ttl`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| now > at)
    }

    /// Sweep eligibility: `true` iff `now > created_at + ttl + grace`.
    pub fn is_purgeable_at(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        self.expires_at()
            .and_then(|at| at.checked_add_signed(grace))
            .is_some_and(|cutoff| now > cutoff)
    }

    /// Whether reading requires the access secret.
    pub fn is_read_gated(&self) -> bool {
        self.access_hash.is_some()
    }

    /// Whether the entry can be edited or deleted at all.
    pub fn is_editable(&self) -> bool {
        self.edit_hash.is_some()
    }
}
