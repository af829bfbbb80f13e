use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

/// A single mutation inside a committed batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalOp {
    /// Write (or overwrite) the serialized record stored under `name`.
    Put { name: String, record: Vec<u8> },
    /// Remove `name`.
    Delete { name: String },
}

/// Flush/sync strategy for the journal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every committed transaction.
    EveryCommit,
    /// Rely on OS page-cache buffering.
    OsDefault,
}

impl Default for SyncMode {
    fn default() -> Self {
        Self::EveryCommit
    }
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Operations per frame when rewriting a snapshot.
const SNAPSHOT_CHUNK: usize = 1024;

/// Append-only log of committed write transactions.
///
/// On-disk format, one frame per transaction:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized Vec<JournalOp>)]
/// ```
///
/// A frame is the unit of atomicity: recovery either replays a whole batch
/// or none of it.
pub struct Journal {
    path: PathBuf,
    file: File,
    /// Length of the valid prefix of the file; the next frame starts here.
    offset: u64,
    sync_mode: SyncMode,
}

impl Journal {
    /// Open (or create) the journal file at `path`.
    ///
    /// Call [`Journal::recover`] before appending to an existing file.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset,
            sync_mode,
        })
    }

    /// Append one committed batch. Returns the byte offset of its frame.
    ///
    /// On failure the file is cut back to its previous length so a partial
    /// frame never precedes later commits.
    pub fn append(&mut self, batch: &[JournalOp]) -> StoreResult<u64> {
        let frame = encode_frame(batch)?;
        let start = self.offset;

        if let Err(e) = self.write_frame(&frame) {
            if let Err(trunc) = self.file.set_len(start) {
                warn!(offset = start, error = %trunc, "failed to drop partial journal frame");
            }
            return Err(e.into());
        }

        self.offset += frame.len() as u64;
        debug!(offset = start, ops = batch.len(), len = frame.len(), "journal append");
        Ok(start)
    }

    /// Read back every intact batch in commit order.
    ///
    /// Frames failing the CRC check are skipped. A frame running past the end
    /// of the file is a torn write: the file is truncated there so the next
    /// append starts on a frame boundary.
    pub fn recover(&mut self) -> StoreResult<Vec<Vec<JournalOp>>> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let file_len = reader.get_ref().metadata()?.len();
        let mut batches = Vec::new();
        let mut offset: u64 = 0;

        while offset < file_len {
            if offset + HEADER_SIZE as u64 > file_len {
                warn!(offset, file_len, "truncated journal header");
                break;
            }

            reader.seek(SeekFrom::Start(offset))?;
            let mut header = [0u8; HEADER_SIZE];
            reader.read_exact(&mut header)?;

            let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
            let end = offset + HEADER_SIZE as u64 + length as u64;

            if length == 0 || end > file_len {
                warn!(offset, length, file_len, "invalid journal frame length");
                break;
            }

            let mut payload = vec![0u8; length as usize];
            reader.read_exact(&mut payload)?;

            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                warn!(
                    offset,
                    expected = expected_crc,
                    actual = actual_crc,
                    "CRC mismatch; skipping journal frame"
                );
                offset = end;
                continue;
            }

            match bincode::deserialize::<Vec<JournalOp>>(&payload) {
                Ok(batch) => batches.push(batch),
                Err(e) => warn!(offset, error = %e, "undecodable journal frame; skipping"),
            }
            offset = end;
        }

        if offset < file_len {
            warn!(valid_len = offset, file_len, "dropping torn journal tail");
            self.file.set_len(offset)?;
        }
        self.offset = offset;

        debug!(batches = batches.len(), "journal recovery complete");
        Ok(batches)
    }

    /// Replace the whole journal with `snapshot`.
    ///
    /// The new contents are written to a temp file in the same directory and
    /// renamed over the old journal, so a crash leaves one or the other.
    pub fn rewrite(&mut self, snapshot: &[JournalOp]) -> StoreResult<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        let mut written: u64 = 0;
        for chunk in snapshot.chunks(SNAPSHOT_CHUNK) {
            let frame = encode_frame(chunk)?;
            tmp.write_all(&frame)?;
            written += frame.len() as u64;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        self.file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        let before = self.offset;
        self.offset = written;

        info!(before, after = written, records = snapshot.len(), "journal compacted");
        Ok(())
    }

    /// Current length of the valid journal.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Path to the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Swap the handle for a read-only one so the next append fails.
    #[cfg(test)]
    pub(crate) fn reopen_read_only(&mut self) -> io::Result<()> {
        self.file = File::open(&self.path)?;
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.file.write_all(frame)?;
        if matches!(self.sync_mode, SyncMode::EveryCommit) {
            self.file.sync_data()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("path", &self.path)
            .field("offset", &self.offset)
            .field("sync_mode", &self.sync_mode)
            .finish()
    }
}

fn encode_frame(batch: &[JournalOp]) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(batch).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len()).map_err(|_| {
        StoreError::Serialization(format!("batch of {} bytes exceeds frame limit", payload.len()))
    })?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(name: &str, record: &[u8]) -> JournalOp {
        JournalOp::Put {
            name: name.into(),
            record: record.to_vec(),
        }
    }

    fn del(name: &str) -> JournalOp {
        JournalOp::Delete { name: name.into() }
    }

    #[test]
    fn append_and_recover_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries.journal");
        let mut journal = Journal::open(&path, SyncMode::default()).unwrap();

        let b1 = vec![put("a", b"1"), put("b", b"2")];
        let b2 = vec![del("a")];
        journal.append(&b1).unwrap();
        journal.append(&b2).unwrap();
        drop(journal);

        let mut journal = Journal::open(&path, SyncMode::default()).unwrap();
        let batches = journal.recover().unwrap();
        assert_eq!(batches, vec![b1, b2]);
    }

    #[test]
    fn recover_empty_journal() {
        let dir = tempfile::tempdir().unwrap();
        let mut journal = Journal::open(&dir.path().join("empty"), SyncMode::OsDefault).unwrap();
        assert!(journal.recover().unwrap().is_empty());
        assert_eq!(journal.offset(), 0);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("j");
        let journal = Journal::open(&path, SyncMode::OsDefault).unwrap();
        assert_eq!(journal.path(), path.as_path());
        assert!(path.exists());
    }

    #[test]
    fn crc_mismatch_skips_only_that_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt");
        let mut journal = Journal::open(&path, SyncMode::OsDefault).unwrap();
        journal.append(&[put("a", b"first")]).unwrap();
        journal.append(&[put("b", b"second")]).unwrap();
        drop(journal);

        {
            let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            let mut buf = [0u8; 1];
            file.read_exact(&mut buf).unwrap();
            buf[0] ^= 0xFF;
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            file.write_all(&buf).unwrap();
        }

        let mut journal = Journal::open(&path, SyncMode::OsDefault).unwrap();
        let batches = journal.recover().unwrap();
        assert_eq!(batches, vec![vec![put("b", b"second")]]);
    }

    #[test]
    fn torn_tail_is_truncated_and_appends_resume() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torn");
        let mut journal = Journal::open(&path, SyncMode::OsDefault).unwrap();
        journal.append(&[put("a", b"kept")]).unwrap();
        let torn_start = journal.append(&[put("b", b"lost")]).unwrap();
        let total = journal.offset();
        drop(journal);

        OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(total - 3)
            .unwrap();

        let mut journal = Journal::open(&path, SyncMode::OsDefault).unwrap();
        let batches = journal.recover().unwrap();
        assert_eq!(batches, vec![vec![put("a", b"kept")]]);
        assert_eq!(journal.offset(), torn_start);

        journal.append(&[put("c", b"after")]).unwrap();
        drop(journal);

        let mut journal = Journal::open(&path, SyncMode::OsDefault).unwrap();
        let batches = journal.recover().unwrap();
        assert_eq!(
            batches,
            vec![vec![put("a", b"kept")], vec![put("c", b"after")]]
        );
    }

    #[test]
    fn rewrite_replaces_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compact");
        let mut journal = Journal::open(&path, SyncMode::OsDefault).unwrap();
        for i in 0..50 {
            journal.append(&[put("k", format!("v{i}").as_bytes())]).unwrap();
        }
        let before = journal.offset();

        journal.rewrite(&[put("k", b"v49")]).unwrap();
        assert!(journal.offset() < before);

        journal.append(&[put("z", b"tail")]).unwrap();
        drop(journal);

        let mut journal = Journal::open(&path, SyncMode::OsDefault).unwrap();
        let batches = journal.recover().unwrap();
        assert_eq!(
            batches,
            vec![vec![put("k", b"v49")], vec![put("z", b"tail")]]
        );
    }

    #[test]
    fn rewrite_empty_snapshot_empties_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty-after");
        let mut journal = Journal::open(&path, SyncMode::EveryCommit).unwrap();
        journal.append(&[put("a", b"x")]).unwrap();
        journal.rewrite(&[]).unwrap();
        assert_eq!(journal.offset(), 0);
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn append_returns_increasing_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let mut journal = Journal::open(&dir.path().join("o"), SyncMode::EveryCommit).unwrap();
        let o1 = journal.append(&[put("a", b"1")]).unwrap();
        let o2 = journal.append(&[put("b", b"2")]).unwrap();
        assert_eq!(o1, 0);
        assert!(o2 > o1);
    }
}
