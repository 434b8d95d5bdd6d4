//! Core domain types for camroll.
//!
//! This module defines the foundational data types the store and codec depend on:
//! the image record itself (opaque payload plus creation timestamp) and the
//! insertion-order policy that decides where newly created records land.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;

/// One stored image entry.
///
/// The payload is the encoded image exactly as the capture source produced it
/// (JPEG, PNG, HEIC -- the store never inspects it). The timestamp is assigned
/// once, when the record is created, and never changes afterwards. Records have
/// no identity beyond their position in the store's sequence; two records with
/// identical contents are two records.
///
/// # Fields
///
/// * `payload` - Opaque encoded image bytes.
/// * `created_at` - Unix epoch milliseconds, assigned at creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    /// Opaque encoded image bytes.
    pub payload: Bytes,
    /// Unix epoch milliseconds, assigned at creation time.
    pub created_at: u64,
}

impl ImageRecord {
    /// Creates a record from raw image bytes, stamped with the current wall-clock time.
    ///
    /// Callers replaying known data (imports, tests) can construct the struct
    /// literally instead and supply their own `created_at`.
    pub fn new(payload: impl Into<Bytes>) -> ImageRecord {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        ImageRecord {
            payload: payload.into(),
            created_at,
        }
    }
}

/// Where newly created records are placed in the sequence.
///
/// The capture workflow this store was built for shows the most recent photo
/// first, so `NewestFirst` is the default.
///
/// # Variants
///
/// * `NewestFirst` - New records are inserted at position 0.
/// * `OldestFirst` - New records are appended at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOrder {
    /// New records are inserted at position 0.
    NewestFirst,
    /// New records are appended at the end.
    OldestFirst,
}

impl Default for InsertOrder {
    fn default() -> Self {
        InsertOrder::NewestFirst
    }
}
