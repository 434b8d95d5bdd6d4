//! Binary codec for the camroll snapshot file.
//!
//! This module handles serialization and deserialization of the snapshot
//! header, individual record frames, and the whole-file envelope. It is pure
//! data transformation -- no file I/O, no clock, no store state.
//!
//! The file header is a fixed 8-byte sequence (magic number + format version),
//! followed by a `u64` record count, one length-prefixed CRC32-checksummed
//! frame per [`ImageRecord`], and an 8-byte footer whose CRC32 covers every
//! preceding byte. A snapshot decodes completely or not at all: there is no
//! partial recovery, because the store rewrites the entire file on every
//! mutation and a well-formed prefix of a snapshot is still a damaged snapshot.

use bytes::Bytes;

use crate::error::Error;
use crate::types::ImageRecord;

/// Magic bytes identifying a camroll snapshot file (ASCII "CROL").
const MAGIC: [u8; 4] = [0x43, 0x52, 0x4F, 0x4C];

/// Current on-disk format version.
const FORMAT_VERSION: u32 = 1;

/// Magic bytes identifying the snapshot footer (ASCII "CRFT").
const FOOTER_MAGIC: [u8; 4] = [0x43, 0x52, 0x46, 0x54];

/// Size of the file header in bytes (magic 4 + version 4).
const HEADER_SIZE: usize = 8;

/// Size of the record-count field in bytes (u64 LE).
const COUNT_SIZE: usize = 8;

/// Size of the snapshot footer in bytes (magic 4 + crc 4).
const FOOTER_SIZE: usize = 8;

/// Size of the per-frame length prefix in bytes.
const LENGTH_PREFIX_SIZE: usize = 4;

/// Fixed-size portion of a frame body (everything except the payload):
/// created_at(8) + payload_len(4) + checksum(4) = 16.
const FIXED_BODY_SIZE: usize = 8 + 4 + 4;

/// Maximum encodable payload size in bytes.
///
/// A frame body is length-prefixed with a `u32`, so the payload may not exceed
/// `u32::MAX` minus the fixed body overhead. Payloads past this limit fail
/// encoding with [`Error::RecordTooLarge`].
pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize - FIXED_BODY_SIZE;

/// Encode the file header as a fixed 8-byte array.
///
/// The header consists of a 4-byte magic number (`CROL` in ASCII) followed by
/// a 4-byte format version in little-endian encoding. The current format
/// version is `1`.
///
/// # Returns
///
/// An 8-byte array containing the encoded file header.
pub fn encode_header() -> [u8; 8] {
    let mut buf = [0u8; 8];
    buf[0..4].copy_from_slice(&MAGIC);
    buf[4..8].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf
}

/// Decode and validate the file header.
///
/// Checks that the magic number matches `CROL` and that the format version is
/// supported (currently only version `1`).
///
/// # Arguments
///
/// * `buf` - Exactly 8 bytes containing the file header.
///
/// # Returns
///
/// The format version on success.
///
/// # Errors
///
/// Returns [`Error::InvalidHeader`] if the magic number is wrong or the
/// format version is unsupported.
pub fn decode_header(buf: &[u8; 8]) -> Result<u32, Error> {
    if buf[0..4] != MAGIC {
        return Err(Error::InvalidHeader(
            "wrong magic bytes: expected CROL".to_string(),
        ));
    }
    let version = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    if version != FORMAT_VERSION {
        return Err(Error::InvalidHeader(format!(
            "unsupported format version: {version}"
        )));
    }
    Ok(version)
}

/// Encode an [`ImageRecord`] into its binary frame.
///
/// The returned buffer contains the length prefix, the record fields, and a
/// trailing CRC32 checksum over the body. Frames are concatenated between the
/// snapshot's count field and its footer.
///
/// # Arguments
///
/// * `record` - The record to serialize.
///
/// # Returns
///
/// A `Vec<u8>` containing the complete binary frame.
///
/// # Errors
///
/// Returns [`Error::RecordTooLarge`] if the payload exceeds
/// [`MAX_PAYLOAD_SIZE`].
pub fn encode_record(record: &ImageRecord) -> Result<Vec<u8>, Error> {
    if record.payload.len() > MAX_PAYLOAD_SIZE {
        return Err(Error::RecordTooLarge {
            size: record.payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let body_len = FIXED_BODY_SIZE + record.payload.len();
    let total_len = LENGTH_PREFIX_SIZE + body_len;

    let mut buf = Vec::with_capacity(total_len);

    // frame_length: byte count from created_at through checksum (inclusive).
    buf.extend_from_slice(&(body_len as u32).to_le_bytes());

    // -- Begin body (CRC32 covers from here through payload) --
    buf.extend_from_slice(&record.created_at.to_le_bytes());
    buf.extend_from_slice(&(record.payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&record.payload);
    // -- End body --

    // CRC32 over the body (everything after frame_length, before checksum).
    let crc = crc32fast::hash(&buf[LENGTH_PREFIX_SIZE..]);
    buf.extend_from_slice(&crc.to_le_bytes());

    Ok(buf)
}

/// Decode a single record frame from the start of a byte buffer.
///
/// Unlike an append-only log, a snapshot never legitimately ends mid-frame, so
/// a buffer too short for the frame it announces is corruption rather than a
/// "wait for more data" condition.
///
/// Errors carry byte offsets relative to the start of `buf`; callers decoding
/// a whole file rebase them to absolute file offsets.
///
/// # Arguments
///
/// * `buf` - A byte slice starting at the beginning of a frame.
///
/// # Returns
///
/// The decoded record and the total number of bytes consumed.
///
/// # Errors
///
/// Returns [`Error::CorruptSnapshot`] if the buffer is truncated, the CRC32
/// checksum does not match, or the frame's internal lengths disagree.
pub fn decode_record(buf: &[u8]) -> Result<(ImageRecord, usize), Error> {
    // Need at least 4 bytes for the length prefix.
    if buf.len() < LENGTH_PREFIX_SIZE {
        return Err(Error::CorruptSnapshot {
            offset: 0,
            detail: format!(
                "truncated record frame: {} bytes left, length prefix needs {LENGTH_PREFIX_SIZE}",
                buf.len()
            ),
        });
    }

    let frame_length = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if frame_length < FIXED_BODY_SIZE {
        return Err(Error::CorruptSnapshot {
            offset: 0,
            detail: format!(
                "frame length {frame_length} smaller than fixed body size {FIXED_BODY_SIZE}"
            ),
        });
    }
    let total = LENGTH_PREFIX_SIZE + frame_length;

    // Need the full frame body + length prefix.
    if buf.len() < total {
        return Err(Error::CorruptSnapshot {
            offset: 0,
            detail: format!(
                "truncated record frame: {} bytes left, frame needs {total}",
                buf.len()
            ),
        });
    }

    // Slice the body (created_at through checksum).
    let body = &buf[LENGTH_PREFIX_SIZE..total];

    // The last 4 bytes of the body are the checksum; everything before is the
    // CRC32-protected region.
    let crc_offset = body.len() - 4;
    let stored_crc = u32::from_le_bytes([
        body[crc_offset],
        body[crc_offset + 1],
        body[crc_offset + 2],
        body[crc_offset + 3],
    ]);
    let computed_crc = crc32fast::hash(&body[..crc_offset]);

    if stored_crc != computed_crc {
        return Err(Error::CorruptSnapshot {
            offset: 0,
            detail: format!(
                "CRC32 mismatch: stored {stored_crc:#010X}, computed {computed_crc:#010X}"
            ),
        });
    }

    // Parse fixed fields from the CRC-protected region.
    let protected = &body[..crc_offset];

    // created_at (u64 LE, 8 bytes)
    let created_at = u64::from_le_bytes(protected[0..8].try_into().expect("8 bytes for u64"));

    // payload_len (u32 LE, 4 bytes)
    let payload_len =
        u32::from_le_bytes(protected[8..12].try_into().expect("4 bytes for u32")) as usize;

    // payload (raw bytes) -- must account for every remaining protected byte.
    if 12 + payload_len != protected.len() {
        return Err(Error::CorruptSnapshot {
            offset: 0,
            detail: format!(
                "payload length {payload_len} disagrees with frame length {frame_length}"
            ),
        });
    }
    let payload = Bytes::copy_from_slice(&protected[12..]);

    let record = ImageRecord {
        payload,
        created_at,
    };

    Ok((record, total))
}

/// Encode a full ordered sequence of records as one snapshot.
///
/// Produces the complete file image: header, record count, one frame per
/// record in sequence order, and the footer with a CRC32 over everything
/// before it. Encoding is deterministic -- equal sequences produce identical
/// bytes.
///
/// # Arguments
///
/// * `records` - The records, in store order (position 0 first).
///
/// # Returns
///
/// A `Vec<u8>` containing the complete snapshot, ready to be written to disk.
///
/// # Errors
///
/// Returns [`Error::RecordTooLarge`] if any payload exceeds
/// [`MAX_PAYLOAD_SIZE`].
pub fn encode_snapshot(records: &[ImageRecord]) -> Result<Vec<u8>, Error> {
    let frames_len: usize = records
        .iter()
        .map(|r| LENGTH_PREFIX_SIZE + FIXED_BODY_SIZE + r.payload.len())
        .sum();
    let mut buf = Vec::with_capacity(HEADER_SIZE + COUNT_SIZE + frames_len + FOOTER_SIZE);

    buf.extend_from_slice(&encode_header());
    buf.extend_from_slice(&(records.len() as u64).to_le_bytes());
    for record in records {
        let frame = encode_record(record)?;
        buf.extend_from_slice(&frame);
    }

    // Footer: magic + CRC32 over every byte written so far.
    let snapshot_crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&FOOTER_MAGIC);
    buf.extend_from_slice(&snapshot_crc.to_le_bytes());

    Ok(buf)
}

/// Decode a complete snapshot into its ordered record sequence.
///
/// Validates the header, the record count against the file size, every frame's
/// length and checksum, the footer magic, and the whole-snapshot CRC32. The
/// result is the full sequence in store order, or an error -- never a prefix.
///
/// Error offsets are absolute byte offsets into `data`.
///
/// # Arguments
///
/// * `data` - The entire contents of a snapshot file.
///
/// # Returns
///
/// The decoded records, in store order (position 0 first).
///
/// # Errors
///
/// Returns [`Error::InvalidHeader`] if the file is too short for a header, the
/// magic bytes are foreign, or the format version is unsupported. Returns
/// [`Error::CorruptSnapshot`] for any damage past the header: an impossible
/// record count, truncated or malformed frames, leftover bytes between the
/// last frame and the footer, bad footer magic, or a whole-snapshot CRC32
/// mismatch.
pub fn decode_snapshot(data: &[u8]) -> Result<Vec<ImageRecord>, Error> {
    if data.len() < HEADER_SIZE {
        return Err(Error::InvalidHeader(format!(
            "file too short: {} bytes, header needs {HEADER_SIZE}",
            data.len()
        )));
    }
    let header_bytes: [u8; 8] = data[0..HEADER_SIZE].try_into().expect("8 bytes for header");
    decode_header(&header_bytes)?;

    if data.len() < HEADER_SIZE + COUNT_SIZE + FOOTER_SIZE {
        return Err(Error::CorruptSnapshot {
            offset: HEADER_SIZE as u64,
            detail: format!(
                "file too short for record count and footer: {} bytes",
                data.len()
            ),
        });
    }

    let count = u64::from_le_bytes(
        data[HEADER_SIZE..HEADER_SIZE + COUNT_SIZE]
            .try_into()
            .expect("8 bytes for u64"),
    );

    let frames_start = HEADER_SIZE + COUNT_SIZE;
    let footer_start = data.len() - FOOTER_SIZE;
    let frames = &data[frames_start..footer_start];

    // Every frame occupies at least a length prefix plus the fixed body, so a
    // count the frame region cannot hold is damage in the count field itself.
    // Checking up front also keeps a corrupt count from driving a huge
    // allocation below.
    let min_frame = (LENGTH_PREFIX_SIZE + FIXED_BODY_SIZE) as u64;
    if count > frames.len() as u64 / min_frame {
        return Err(Error::CorruptSnapshot {
            offset: HEADER_SIZE as u64,
            detail: format!(
                "record count {count} exceeds what {} frame bytes can hold",
                frames.len()
            ),
        });
    }

    let mut records = Vec::with_capacity(count as usize);
    let mut cursor = 0usize;
    for _ in 0..count {
        match decode_record(&frames[cursor..]) {
            Ok((record, consumed)) => {
                records.push(record);
                cursor += consumed;
            }
            Err(Error::CorruptSnapshot { detail, .. }) => {
                return Err(Error::CorruptSnapshot {
                    offset: (frames_start + cursor) as u64,
                    detail,
                });
            }
            Err(e) => return Err(e),
        }
    }

    if cursor != frames.len() {
        return Err(Error::CorruptSnapshot {
            offset: (frames_start + cursor) as u64,
            detail: format!(
                "{} leftover bytes between last record and footer",
                frames.len() - cursor
            ),
        });
    }

    if data[footer_start..footer_start + 4] != FOOTER_MAGIC {
        return Err(Error::CorruptSnapshot {
            offset: footer_start as u64,
            detail: "wrong snapshot footer magic bytes".to_string(),
        });
    }
    let stored_crc = u32::from_le_bytes(
        data[footer_start + 4..]
            .try_into()
            .expect("4 bytes for u32"),
    );
    let computed_crc = crc32fast::hash(&data[..footer_start]);
    if stored_crc != computed_crc {
        return Err(Error::CorruptSnapshot {
            offset: footer_start as u64,
            detail: format!(
                "snapshot CRC32 mismatch: stored {stored_crc:#010X}, computed {computed_crc:#010X}"
            ),
        });
    }

    Ok(records)
}
