use std::time::Duration;

use serde::{Deserialize, Serialize};
use wpaste_crypto::HashParams;

/// Tuning for entry creation, expiry and the background sweep.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasteConfig {
    /// Length of generated names. The name space is 62^len and must stay far
    /// larger than the number of live entries.
    pub name_length: usize,
    /// Candidates tried before allocation gives up.
    pub max_name_attempts: u32,
    /// Largest accepted payload.
    pub max_payload_bytes: usize,
    /// TTL applied when a create request gives none. `0` means no expiry.
    pub default_ttl_secs: u64,
    /// Time between background sweeps.
    pub sweep_interval_secs: u64,
    /// How long an expired entry stays visible as gone before it is purged.
    pub grace_period_secs: u64,
    /// Argon2id cost for entry secrets.
    pub hash: HashParams,
}

impl Default for PasteConfig {
    fn default() -> Self {
        Self {
            name_length: 3,
            max_name_attempts: 64,
            max_payload_bytes: 10 << 20,
            default_ttl_secs: 30 * 24 * 60 * 60,
            sweep_interval_secs: 60,
            grace_period_secs: 60 * 60,
            hash: HashParams::default(),
        }
    }
}

impl PasteConfig {
    /// The TTL for a request that did not specify one.
    pub fn default_ttl(&self) -> Option<u64> {
        (self.default_ttl_secs > 0).then_some(self.default_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn grace_period(&self) -> chrono::Duration {
        i64::try_from(self.grace_period_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}
