use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use tracing::info;
use wpaste_types::Entry;

use crate::error::{StoreError, StoreResult};
use crate::journal::{Journal, JournalOp, SyncMode};
use crate::txn::{apply, ReadTxn, Table, WriteTxn};

/// Transactional key-value store of [`Entry`] records, keyed by name.
///
/// - One writer at a time: [`EntryStore::update`] holds the writer lock for
///   the whole transaction.
/// - The committed table sits behind an `Arc`. A reader takes the table lock
///   only to clone that pointer, then works on its snapshot without a lock,
///   so a long [`EntryStore::view`] holds up neither readers nor writers.
/// - A commit takes the table lock for write only to apply its batch. The
///   table is copied first if a snapshot of it is still in use; records are
///   shared, so the copy does not duplicate payloads.
/// - A commit is appended to the journal as a single frame before it is
///   applied, so a failed append leaves the committed state untouched.
///
/// The table holds encoded records, so a corrupt record is discovered (and
/// reported) when it is read rather than when the store is opened.
pub struct EntryStore {
    table: RwLock<Arc<Table>>,
    /// Writer lock. `None` for a purely in-memory store.
    writer: Mutex<Option<Journal>>,
}

impl EntryStore {
    /// Create an empty store that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            table: RwLock::new(Arc::new(Table::new())),
            writer: Mutex::new(None),
        }
    }

    /// Open (or create) a durable store backed by the journal at `path`.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        let mut journal = Journal::open(path, sync_mode)?;
        let batches = journal.recover()?;
        let replayed = batches.len();

        let mut table = Table::new();
        for batch in batches {
            apply(&mut table, batch);
        }

        info!(
            path = %path.display(),
            batches = replayed,
            records = table.len(),
            "entry store opened"
        );

        Ok(Self {
            table: RwLock::new(Arc::new(table)),
            writer: Mutex::new(Some(journal)),
        })
    }

    /// Run `f` inside a read transaction over the table as last committed.
    ///
    /// `f` runs without holding any lock, so it may take as long as it
    /// needs; commits made meanwhile are not visible to it.
    pub fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&ReadTxn<'_>) -> Result<T, E>,
    {
        let snapshot = self.snapshot();
        f(&ReadTxn::new(&snapshot))
    }

    /// Run `f` inside a write transaction.
    ///
    /// If `f` returns `Ok`, its staged mutations are journaled and applied as
    /// one unit. If `f` returns `Err`, or the journal append fails, nothing
    /// is applied.
    pub fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut writer = self.writer.lock().expect("writer lock poisoned");

        // Holding the writer lock, `base` stays the latest commit.
        let base = self.snapshot();
        let mut txn = WriteTxn::new(&base);
        let value = f(&mut txn)?;
        let ops = txn.into_ops();
        if ops.is_empty() {
            return Ok(value);
        }

        if let Some(journal) = writer.as_mut() {
            journal.append(&ops)?;
        }
        drop(base);

        let mut table = self.table.write().expect("table lock poisoned");
        apply(Arc::make_mut(&mut table), ops);
        Ok(value)
    }

    /// Read the entry stored under `name`.
    pub fn get(&self, name: &str) -> StoreResult<Option<Entry>> {
        self.view(|tx| tx.get(name))
    }

    /// Whether a record exists under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.table
            .read()
            .expect("table lock poisoned")
            .contains_key(name)
    }

    /// Write or overwrite `entry` under its name.
    pub fn put(&self, entry: &Entry) -> StoreResult<()> {
        self.update(|tx| tx.put(entry))
    }

    /// Remove `name`. Returns `true` if a record was present.
    pub fn delete(&self, name: &str) -> StoreResult<bool> {
        self.update(|tx| Ok::<_, StoreError>(tx.delete(name)))
    }

    /// Snapshot every record in name order. Undecodable records are returned
    /// as per-record errors.
    pub fn scan(&self) -> Vec<(String, StoreResult<Entry>)> {
        let snapshot = self.snapshot();
        ReadTxn::new(&snapshot)
            .scan()
            .map(|(name, entry)| (name.to_string(), entry))
            .collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.table.read().expect("table lock poisoned").len()
    }

    /// Returns `true` if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.table.read().expect("table lock poisoned").is_empty()
    }

    /// Whether commits are written to a journal.
    pub fn is_durable(&self) -> bool {
        self.writer.lock().expect("writer lock poisoned").is_some()
    }

    /// Rewrite the journal so it holds only the live records.
    ///
    /// Blocks writers for the duration. A no-op for in-memory stores.
    pub fn compact(&self) -> StoreResult<()> {
        let mut writer = self.writer.lock().expect("writer lock poisoned");
        let Some(journal) = writer.as_mut() else {
            return Ok(());
        };

        let snapshot: Vec<JournalOp> = self
            .snapshot()
            .iter()
            .map(|(name, record)| JournalOp::Put {
                name: name.clone(),
                record: record.to_vec(),
            })
            .collect();

        journal.rewrite(&snapshot)
    }

    fn snapshot(&self) -> Arc<Table> {
        Arc::clone(&self.table.read().expect("table lock poisoned"))
    }
}

impl std::fmt::Debug for EntryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStore")
            .field("record_count", &self.len())
            .field("durable", &self.is_durable())
            .finish()
    }
}
