//! camroll: a small, file-backed store for ordered image records.
//!
//! Records (opaque image bytes plus a creation timestamp) live in one ordered
//! in-memory sequence, newest first by default. Every mutation rewrites the
//! whole sequence to a single snapshot file, and opening the store loads the
//! sequence back -- fully, or not at all.

pub mod codec;
pub mod error;
pub mod store;
pub mod types;

pub use codec::MAX_PAYLOAD_SIZE;
pub use error::Error;
pub use store::{RecordStore, StoreConfig};
pub use types::{ImageRecord, InsertOrder};
