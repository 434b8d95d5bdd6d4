//! Storage engine for camroll.
//!
//! This module owns the snapshot file and the in-memory record sequence. It
//! provides methods for opening the store (loading the sequence from disk),
//! creating records per the configured insertion order, deleting and replacing
//! records by position, and reloading the sequence from disk.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::codec;
use crate::error::Error;
use crate::types::{ImageRecord, InsertOrder};

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Where newly created records are placed in the sequence.
    pub insert_order: InsertOrder,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            insert_order: InsertOrder::NewestFirst,
        }
    }
}

/// Sibling path the snapshot is staged at before the atomic rename.
fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Directory containing `path`. A bare filename has an empty parent, which
/// stands for the current directory.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Read and fully decode the snapshot at `path`.
///
/// A missing file is the store's defined empty state (first run), so it yields
/// an empty sequence rather than an error. An existing file decodes completely
/// or fails; there is no partial recovery.
fn read_snapshot(path: &Path) -> Result<Vec<ImageRecord>, Error> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read(path)?;
    codec::decode_snapshot(&data)
}

/// Write a fully encoded snapshot to `path`: stage it in the sibling
/// temporary file, fsync, then rename over the destination.
fn write_snapshot(path: &Path, encoded: &[u8]) -> Result<(), Error> {
    let tmp_path = temp_sibling(path);
    let mut tmp = File::create(&tmp_path)?;
    tmp.write_all(encoded)?;
    tmp.sync_all()?;
    drop(tmp);
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Core persistence component that manages the snapshot file and the in-memory
/// record sequence.
///
/// The store holds the full ordered sequence in memory and rewrites the whole
/// snapshot file on every mutation. The file is the sole durability mechanism;
/// the in-memory sequence is the single source of truth between persists, and
/// callers render directly from [`RecordStore::records`].
///
/// All operations run synchronously on the caller's thread. Mutations take
/// `&mut self`, so exclusive access within a process is enforced by the borrow
/// checker. The store takes no file lock -- callers sharing a path across
/// processes must serialize access themselves.
#[derive(Debug)]
pub struct RecordStore {
    /// Path of the snapshot file.
    path: PathBuf,
    /// Where newly created records are placed.
    insert_order: InsertOrder,
    /// The ordered sequence. Position 0 is the newest record under the
    /// default insertion order.
    records: Vec<ImageRecord>,
}

impl RecordStore {
    /// Open the store backed by the snapshot file at the given path, with the
    /// default configuration (newest-first insertion).
    ///
    /// If the file does not exist, the store opens empty; the file is only
    /// created once the first mutation persists. If the file exists, the full
    /// sequence is decoded into memory before the store is returned -- the
    /// caller gets either every record or an error, never a prefix.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the snapshot file.
    ///
    /// # Returns
    ///
    /// A `RecordStore` with the sequence loaded from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file exists but cannot be read.
    /// Returns [`Error::InvalidHeader`] if the file is not a recognizable
    /// snapshot, and [`Error::CorruptSnapshot`] if it is recognizable but
    /// damaged.
    pub fn open(path: &Path) -> Result<RecordStore, Error> {
        Self::open_with(path, StoreConfig::default())
    }

    /// Open the store with an explicit configuration.
    ///
    /// The insertion order applies to subsequent [`RecordStore::create`] calls;
    /// records already on disk keep the positions they were persisted with.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the snapshot file.
    /// * `config` - Store configuration.
    ///
    /// # Errors
    ///
    /// Same as [`RecordStore::open`].
    pub fn open_with(path: &Path, config: StoreConfig) -> Result<RecordStore, Error> {
        let records = read_snapshot(path)?;
        tracing::debug!(
            path = %path.display(),
            records = records.len(),
            "opened record store"
        );
        Ok(RecordStore {
            path: path.to_path_buf(),
            insert_order: config.insert_order,
            records,
        })
    }

    /// All records in store order. Position 0 is the newest record under the
    /// default insertion order.
    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    /// Returns the record at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<&ImageRecord> {
        self.records.get(index)
    }

    /// Number of records currently in the store.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Path of the backing snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configured insertion order.
    pub fn insert_order(&self) -> InsertOrder {
        self.insert_order
    }

    /// Create a record: place it in the sequence per the configured insertion
    /// order and rewrite the backing file with the full current sequence.
    ///
    /// The sequence in memory is updated before the file is written and is not
    /// rolled back if the write fails. After an error the new record is still
    /// present in memory while the disk keeps the last successful snapshot;
    /// the two stay divergent until the next successful persist, and
    /// [`RecordStore::reload`] resolves the divergence in favor of the disk.
    ///
    /// # Arguments
    ///
    /// * `record` - The record to store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordTooLarge`] if the payload cannot be encoded.
    /// Returns [`Error::Io`] if the snapshot cannot be written.
    pub fn create(&mut self, record: ImageRecord) -> Result<(), Error> {
        match self.insert_order {
            InsertOrder::NewestFirst => self.records.insert(0, record),
            InsertOrder::OldestFirst => self.records.push(record),
        }
        self.persist_after_mutation()
    }

    /// Remove and return the record at the given position, then rewrite the
    /// backing file.
    ///
    /// An out-of-bounds index changes nothing, in memory or on disk. Like
    /// [`RecordStore::create`], a removal that fails to persist is not rolled
    /// back in memory.
    ///
    /// # Arguments
    ///
    /// * `index` - Zero-based position of the record to remove.
    ///
    /// # Returns
    ///
    /// The removed record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index >= len`.
    /// Returns [`Error::RecordTooLarge`] or [`Error::Io`] if the rewrite fails.
    pub fn delete(&mut self, index: usize) -> Result<ImageRecord, Error> {
        if index >= self.records.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.records.len(),
            });
        }
        let removed = self.records.remove(index);
        self.persist_after_mutation()?;
        Ok(removed)
    }

    /// Swap the record at the given position for a new one, returning the
    /// previous record, then rewrite the backing file.
    ///
    /// Stored records are immutable; updating position `i` means replacing the
    /// whole record there. Bounds and persistence semantics match
    /// [`RecordStore::delete`].
    ///
    /// # Arguments
    ///
    /// * `index` - Zero-based position of the record to replace.
    /// * `record` - The replacement record.
    ///
    /// # Returns
    ///
    /// The record previously at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index >= len`.
    /// Returns [`Error::RecordTooLarge`] or [`Error::Io`] if the rewrite fails.
    pub fn replace(&mut self, index: usize, record: ImageRecord) -> Result<ImageRecord, Error> {
        if index >= self.records.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.records.len(),
            });
        }
        let previous = std::mem::replace(&mut self.records[index], record);
        self.persist_after_mutation()?;
        Ok(previous)
    }

    /// Re-read the snapshot from disk, replacing the in-memory sequence.
    ///
    /// Calling this twice without an intervening mutation yields equal
    /// sequences. On failure the in-memory sequence is left untouched.
    ///
    /// # Errors
    ///
    /// Same as [`RecordStore::open`].
    pub fn reload(&mut self) -> Result<(), Error> {
        self.records = read_snapshot(&self.path)?;
        Ok(())
    }

    /// Rewrite the snapshot file with the full current sequence.
    ///
    /// The rewrite is atomic at the file level: the snapshot is staged in a
    /// sibling temporary file and fsynced before being renamed over the
    /// destination, and the parent directory is fsynced so the rename itself
    /// is durable. A failure at any point leaves the previous snapshot intact
    /// on disk and removes the staging file if one was created.
    fn persist(&self) -> Result<(), Error> {
        let encoded = codec::encode_snapshot(&self.records)?;

        if let Err(e) = write_snapshot(&self.path, &encoded) {
            // A failure between create and rename can strand the staging
            // file; remove it if present.
            let _ = fs::remove_file(temp_sibling(&self.path));
            return Err(e);
        }

        // Fsync the parent directory so the renamed entry is durable. Without
        // this, a crash after the rename could still surface the old directory
        // entry.
        let dir = File::open(parent_dir(&self.path))?;
        dir.sync_all()?;

        tracing::trace!(
            path = %self.path.display(),
            bytes = encoded.len(),
            records = self.records.len(),
            "snapshot persisted"
        );
        Ok(())
    }

    /// Persist after a mutation has already been applied in memory.
    ///
    /// On failure the mutation stays in memory, so memory and disk diverge;
    /// that state is worth a warning even though the error also propagates to
    /// the caller.
    fn persist_after_mutation(&self) -> Result<(), Error> {
        if let Err(e) = self.persist() {
            tracing::warn!(
                path = %self.path.display(),
                records = self.records.len(),
                error = %e,
                "persist failed; in-memory sequence is ahead of the snapshot on disk"
            );
            return Err(e);
        }
        Ok(())
    }
}
