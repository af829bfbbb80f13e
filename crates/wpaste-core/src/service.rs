use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use wpaste_crypto::{CredentialGuard, Permission};
use wpaste_store::EntryStore;
use wpaste_types::{validate_entry_name, Clock, Entry, SystemClock};

use crate::allocator::NameAllocator;
use crate::config::PasteConfig;
use crate::error::{PasteError, PasteResult, ValidationError};
use crate::expirer::{Expirer, Sweeper};

/// Parse a TTL given as decimal whole seconds.
///
/// Only the format is checked here; a negative value is rejected later by
/// [`PasteService::create`].
pub fn parse_ttl(raw: &str) -> Result<i64, ValidationError> {
    raw.trim()
        .parse()
        .map_err(|_| ValidationError::MalformedTtl(raw.to_string()))
}

/// Input to [`PasteService::create`].
///
/// Empty strings in the optional fields are treated as absent.
#[derive(Clone, Debug, Default)]
pub struct CreateRequest {
    pub payload: Vec<u8>,
    /// Caller-chosen name. A random one is allocated when absent.
    pub name: Option<String>,
    /// TTL in seconds. The configured default applies when absent.
    pub ttl_secs: Option<i64>,
    pub access_secret: Option<String>,
    pub edit_secret: Option<String>,
}

impl CreateRequest {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_ttl_secs(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = Some(ttl_secs);
        self
    }

    pub fn with_access_secret(mut self, secret: impl Into<String>) -> Self {
        self.access_secret = Some(secret.into());
        self
    }

    pub fn with_edit_secret(mut self, secret: impl Into<String>) -> Self {
        self.edit_secret = Some(secret.into());
        self
    }
}

/// The four entry operations over one shared store.
///
/// Every method is synchronous and may spend noticeable CPU time hashing
/// secrets; async callers should run them on a blocking thread.
///
/// Check order on existing entries is fixed: existence, then expiry, then
/// credentials. An expired entry therefore reports [`PasteError::Gone`] even
/// to a caller holding the right secret.
pub struct PasteService {
    store: Arc<EntryStore>,
    allocator: NameAllocator,
    guard: CredentialGuard,
    expirer: Expirer,
    clock: Arc<dyn Clock>,
    config: PasteConfig,
}

impl PasteService {
    /// Build a service on the system clock.
    pub fn new(store: Arc<EntryStore>, config: PasteConfig) -> PasteResult<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Build a service on an explicit clock.
    pub fn with_clock(
        store: Arc<EntryStore>,
        config: PasteConfig,
        clock: Arc<dyn Clock>,
    ) -> PasteResult<Self> {
        Ok(Self {
            allocator: NameAllocator::new(config.name_length, config.max_name_attempts),
            guard: CredentialGuard::new(&config.hash)?,
            expirer: Expirer::new(config.grace_period()),
            store,
            clock,
            config,
        })
    }

    /// Store a new entry and return its name.
    ///
    /// Validation and hashing happen before the write transaction opens. The
    /// name check and the insert then commit together, so two concurrent
    /// creates can never end up with the same name.
    pub fn create(&self, request: CreateRequest) -> PasteResult<String> {
        let CreateRequest {
            payload,
            name,
            ttl_secs,
            access_secret,
            edit_secret,
        } = request;

        self.check_payload(&payload)?;
        let ttl_secs = match ttl_secs {
            Some(secs) => Some(u64::try_from(secs).map_err(|_| ValidationError::NegativeTtl(secs))?),
            None => self.config.default_ttl(),
        };
        let requested = name.filter(|n| !n.is_empty());
        if let Some(name) = &requested {
            validate_entry_name(name)?;
        }

        let access_hash = self.hash_secret(access_secret)?;
        let edit_hash = self.hash_secret(edit_secret)?;
        let now = self.clock.now();
        let size = payload.len();

        let name = self.store.update(|tx| {
            let name = match requested {
                Some(name) => {
                    if !self.allocator.is_free(tx, &name) {
                        return Err(PasteError::Conflict(name));
                    }
                    name
                }
                None => self.allocator.allocate(tx)?,
            };

            let entry = Entry::new(name.as_str(), payload, now)
                .with_ttl_secs(ttl_secs)
                .with_access_hash(access_hash)
                .with_edit_hash(edit_hash);
            tx.put(&entry)?;
            Ok(name)
        })?;

        info!(
            name = %name,
            size,
            ttl_secs = ?ttl_secs,
            "entry created"
        );
        Ok(name)
    }

    /// Return the payload of a live entry.
    pub fn read(&self, name: &str, access_secret: Option<&str>) -> PasteResult<Vec<u8>> {
        let now = self.clock.now();
        let entry = self.load_live(name, now)?;
        self.require(&entry, Permission::Access, access_secret)?;

        debug!(name, size = entry.payload().len(), "entry read");
        Ok(entry.into_payload())
    }

    /// Replace the payload of a live entry. The TTL and creation time are
    /// kept; only `edited_at` moves.
    pub fn edit(&self, name: &str, payload: Vec<u8>, edit_secret: Option<&str>) -> PasteResult<()> {
        self.check_payload(&payload)?;
        let now = self.clock.now();
        let checked = self.load_live(name, now)?;
        self.require(&checked, Permission::Edit, edit_secret)?;
        let size = payload.len();

        self.store.update(|tx| {
            let mut entry = tx
                .get(name)?
                .ok_or_else(|| PasteError::NotFound(name.to_string()))?;
            if self.expirer.is_expired(&entry, now) {
                return Err(PasteError::Gone(name.to_string()));
            }
            // Deleted and recreated since the check above.
            if entry.edit_hash() != checked.edit_hash() {
                self.require(&entry, Permission::Edit, edit_secret)?;
            }
            entry.replace_payload(payload, now);
            tx.put(&entry)?;
            Ok(())
        })?;

        info!(name, size, "entry edited");
        Ok(())
    }

    /// Delete an entry.
    ///
    /// An expired entry is reported as not found and left for the sweep.
    pub fn remove(&self, name: &str, edit_secret: Option<&str>) -> PasteResult<()> {
        let now = self.clock.now();
        let checked = self.load_unexpired(name, now)?;
        self.require(&checked, Permission::Edit, edit_secret)?;

        self.store.update(|tx| {
            let entry = match tx.get(name)? {
                Some(entry) if !self.expirer.is_expired(&entry, now) => entry,
                _ => return Err(PasteError::NotFound(name.to_string())),
            };
            if entry.edit_hash() != checked.edit_hash() {
                self.require(&entry, Permission::Edit, edit_secret)?;
            }
            tx.delete(name);
            Ok(())
        })?;

        info!(name, "entry removed");
        Ok(())
    }

    /// A background sweeper over this service's store, clock and grace.
    pub fn sweeper(&self) -> Sweeper {
        Sweeper::new(
            Arc::clone(&self.store),
            self.expirer,
            Arc::clone(&self.clock),
            self.config.sweep_interval(),
        )
    }

    pub fn store(&self) -> &Arc<EntryStore> {
        &self.store
    }

    pub fn config(&self) -> &PasteConfig {
        &self.config
    }

    fn check_payload(&self, payload: &[u8]) -> PasteResult<()> {
        if payload.is_empty() {
            return Err(ValidationError::MissingPayload.into());
        }
        if payload.len() > self.config.max_payload_bytes {
            return Err(ValidationError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_bytes,
            }
            .into());
        }
        Ok(())
    }

    fn hash_secret(&self, secret: Option<String>) -> PasteResult<Option<String>> {
        match secret.filter(|s| !s.is_empty()) {
            Some(secret) => Ok(Some(self.guard.hash(&secret)?)),
            None => Ok(None),
        }
    }

    /// The entry under `name`: `NotFound` if absent, `Gone` if expired.
    fn load_live(&self, name: &str, now: DateTime<Utc>) -> PasteResult<Entry> {
        let entry = self
            .store
            .get(name)?
            .ok_or_else(|| PasteError::NotFound(name.to_string()))?;
        if self.expirer.is_expired(&entry, now) {
            debug!(name, "entry expired");
            return Err(PasteError::Gone(name.to_string()));
        }
        Ok(entry)
    }

    /// Like [`Self::load_live`], but an expired entry is `NotFound`.
    fn load_unexpired(&self, name: &str, now: DateTime<Utc>) -> PasteResult<Entry> {
        match self.load_live(name, now) {
            Err(PasteError::Gone(name)) => Err(PasteError::NotFound(name)),
            other => other,
        }
    }

    fn require(&self, entry: &Entry, permission: Permission, secret: Option<&str>) -> PasteResult<()> {
        let secret = secret.filter(|s| !s.is_empty());
        if self.guard.authorize(entry, permission, secret) {
            Ok(())
        } else {
            debug!(name = entry.name(), %permission, "credential check failed");
            Err(PasteError::Unauthorized)
        }
    }
}

impl std::fmt::Debug for PasteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasteService")
            .field("store", &self.store)
            .field("allocator", &self.allocator)
            .field("expirer", &self.expirer)
            .finish_non_exhaustive()
    }
}
