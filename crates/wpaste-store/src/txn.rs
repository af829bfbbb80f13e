use std::collections::BTreeMap;
use std::sync::Arc;

use wpaste_types::Entry;

use crate::error::{StoreError, StoreResult};
use crate::journal::JournalOp;

/// The committed table: entry name to bincode-encoded [`Entry`].
///
/// Records are shared so that copying the table for a commit does not copy
/// payloads.
pub(crate) type Table = BTreeMap<String, Arc<[u8]>>;

pub(crate) fn encode(entry: &Entry) -> StoreResult<Vec<u8>> {
    bincode::serialize(entry).map_err(|e| StoreError::Serialization(e.to_string()))
}

pub(crate) fn decode(name: &str, record: &[u8]) -> StoreResult<Entry> {
    bincode::deserialize(record).map_err(|e| StoreError::CorruptRecord {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// A read-only transaction over a consistent snapshot of the table.
///
/// Commits from concurrent writers become visible only to transactions
/// opened after them.
pub struct ReadTxn<'a> {
    table: &'a Table,
}

impl<'a> ReadTxn<'a> {
    pub(crate) fn new(table: &'a Table) -> Self {
        Self { table }
    }

    /// Read the entry stored under `name`.
    pub fn get(&self, name: &str) -> StoreResult<Option<Entry>> {
        self.table
            .get(name)
            .map(|record| decode(name, record))
            .transpose()
    }

    /// Whether a record exists under `name`, decodable or not.
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Iterate every record in name order.
    ///
    /// Records that fail to decode are yielded as errors alongside their
    /// name; they do not end the iteration.
    pub fn scan(&self) -> impl Iterator<Item = (&'a str, StoreResult<Entry>)> + 'a {
        let table: &'a Table = self.table;
        table
            .iter()
            .map(|(name, record)| (name.as_str(), decode(name, record)))
    }
}

/// A read-write transaction.
///
/// Mutations are staged and only reach the table (and the journal) when the
/// closure passed to [`EntryStore::update`](crate::EntryStore::update)
/// returns `Ok`. Reads see the transaction's own staged writes on top of the
/// table as it was when the transaction began.
pub struct WriteTxn<'a> {
    base: &'a Table,
    /// `Some(record)` for a staged put, `None` for a staged delete.
    staged: BTreeMap<String, Option<Vec<u8>>>,
}

impl<'a> WriteTxn<'a> {
    pub(crate) fn new(base: &'a Table) -> Self {
        Self {
            base,
            staged: BTreeMap::new(),
        }
    }

    /// Read the entry stored under `name`, including staged writes.
    pub fn get(&self, name: &str) -> StoreResult<Option<Entry>> {
        match self.staged.get(name) {
            Some(Some(record)) => decode(name, record).map(Some),
            Some(None) => Ok(None),
            None => ReadTxn::new(self.base).get(name),
        }
    }

    /// Whether a record exists under `name`, including staged writes.
    pub fn contains(&self, name: &str) -> bool {
        match self.staged.get(name) {
            Some(staged) => staged.is_some(),
            None => self.base.contains_key(name),
        }
    }

    /// Stage a write of `entry` under its own name, replacing any record.
    pub fn put(&mut self, entry: &Entry) -> StoreResult<()> {
        let record = encode(entry)?;
        self.staged.insert(entry.name().to_string(), Some(record));
        Ok(())
    }

    /// Stage removal of `name`. Returns `true` if a record was present.
    pub fn delete(&mut self, name: &str) -> bool {
        let existed = self.contains(name);
        if existed {
            self.staged.insert(name.to_string(), None);
        }
        existed
    }

    /// Number of staged mutations.
    pub fn pending(&self) -> usize {
        self.staged.len()
    }

    pub(crate) fn into_ops(self) -> Vec<JournalOp> {
        self.staged
            .into_iter()
            .map(|(name, staged)| match staged {
                Some(record) => JournalOp::Put { name, record },
                None => JournalOp::Delete { name },
            })
            .collect()
    }
}

/// Apply a committed batch to the table.
pub(crate) fn apply(table: &mut Table, ops: Vec<JournalOp>) {
    for op in ops {
        match op {
            JournalOp::Put { name, record } => {
                table.insert(name, Arc::from(record));
            }
            JournalOp::Delete { name } => {
                table.remove(&name);
            }
        }
    }
}
