use rand::Rng;
use tracing::{debug, warn};
use wpaste_store::WriteTxn;
use wpaste_types::NAME_ALPHABET;

use crate::error::{PasteError, PasteResult};

/// Picks unique short names for new entries.
///
/// Uniqueness is only meaningful inside the write transaction that stores
/// the entry: [`NameAllocator::allocate`] and [`NameAllocator::is_free`]
/// take that transaction so the check and the insert commit together.
#[derive(Clone, Debug)]
pub struct NameAllocator {
    length: usize,
    max_attempts: u32,
}

impl NameAllocator {
    pub fn new(length: usize, max_attempts: u32) -> Self {
        Self {
            length: length.max(1),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Length of generated names.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Draw one random candidate from the 62-symbol alphabet.
    pub fn candidate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| NAME_ALPHABET[rng.gen_range(0..NAME_ALPHABET.len())] as char)
            .collect()
    }

    /// Generate a name not present in `tx`.
    pub fn allocate(&self, tx: &WriteTxn<'_>) -> PasteResult<String> {
        self.allocate_with(|name| tx.contains(name))
    }

    /// Generate a name for which `is_taken` returns `false`, retrying with a
    /// fresh candidate on every collision up to the attempt limit.
    pub fn allocate_with(&self, mut is_taken: impl FnMut(&str) -> bool) -> PasteResult<String> {
        for attempt in 1..=self.max_attempts {
            let name = self.candidate();
            if !is_taken(&name) {
                if attempt > 1 {
                    debug!(attempt, name = %name, "name allocated after collisions");
                }
                return Ok(name);
            }
        }

        warn!(
            attempts = self.max_attempts,
            length = self.length,
            "name space looks exhausted"
        );
        Err(PasteError::NamespaceExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Whether a caller-chosen name is currently free.
    pub fn is_free(&self, tx: &WriteTxn<'_>, requested: &str) -> bool {
        !tx.contains(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use wpaste_store::{EntryStore, StoreError};
    use wpaste_types::Entry;

    #[test]
    fn candidate_has_configured_length() {
        let alloc = NameAllocator::new(5, 8);
        assert_eq!(alloc.candidate().len(), 5);
        assert_eq!(alloc.length(), 5);
    }

    #[test]
    fn zero_length_is_clamped() {
        let alloc = NameAllocator::new(0, 8);
        assert_eq!(alloc.candidate().len(), 1);
    }

    #[test]
    fn retries_until_free() {
        let alloc = NameAllocator::new(3, 64);
        let mut calls = 0;
        let name = alloc
            .allocate_with(|_| {
                calls += 1;
                calls < 4
            })
            .unwrap();
        assert_eq!(calls, 4);
        assert_eq!(name.len(), 3);
    }

    #[test]
    fn exhausted_namespace_stops() {
        let alloc = NameAllocator::new(3, 10);
        let mut calls = 0;
        let err = alloc
            .allocate_with(|_| {
                calls += 1;
                true
            })
            .unwrap_err();
        assert_eq!(calls, 10);
        assert!(matches!(err, PasteError::NamespaceExhausted { attempts: 10 }));
    }

    #[test]
    fn allocate_skips_names_in_store() {
        let store = EntryStore::in_memory();
        let alloc = NameAllocator::new(1, 1_000);
        let taken: HashSet<char> = NAME_ALPHABET[..61].iter().map(|b| *b as char).collect();
        store
            .update(|tx| {
                for c in &taken {
                    tx.put(&Entry::new(c.to_string(), vec![], chrono::Utc::now()))?;
                }
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let name = store
            .update(|tx| alloc.allocate(tx).map_err(|e| StoreError::Serialization(e.to_string())))
            .unwrap();
        assert_eq!(name, "9");
    }

    #[test]
    fn is_free_reflects_store() {
        let store = EntryStore::in_memory();
        store
            .put(&Entry::new("taken", vec![], chrono::Utc::now()))
            .unwrap();
        let alloc = NameAllocator::new(3, 8);
        store
            .update(|tx| {
                assert!(!alloc.is_free(tx, "taken"));
                assert!(alloc.is_free(tx, "free"));
                Ok::<_, StoreError>(())
            })
            .unwrap();
    }

    proptest! {
        #[test]
        fn candidates_use_only_the_alphabet(len in 1usize..32) {
            let name = NameAllocator::new(len, 1).candidate();
            prop_assert_eq!(name.len(), len);
            prop_assert!(name.bytes().all(|b| NAME_ALPHABET.contains(&b)));
        }
    }
}
