// ---------------------------------------------------------------------------
// file_header – Save file header with magic bytes, version, and checksum
// ---------------------------------------------------------------------------
//
// Header format (32 bytes, fixed-size, little-endian):
//   [0..4]   Magic bytes: "THRM"
//   [4..8]   Header format version (u32)
//   [8..12]  Flags (u32: bit 0 = LZ4 compressed)
//   [12..20] Timestamp (Unix epoch seconds, u64)
//   [20..24] Uncompressed payload size (u32)
//   [24..28] xxHash32 checksum of the stored payload (after compression)
//   [28..32] Number of machine records in the payload (u32)
//
// On save: encode MachineSaveData -> maybe compress -> prepend header
// On load: check magic -> check version -> validate checksum -> strip header

use xxhash_rust::xxh32::xxh32;

use crate::save_error::SaveError;

/// Magic bytes identifying a thermal save file.
pub const MAGIC: [u8; 4] = *b"THRM";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 32;

/// Current header layout version. Distinct from the payload's
/// `MachineSaveData::version`, which tracks record schema changes.
pub const HEADER_FORMAT_VERSION: u32 = 1;

/// Payload is LZ4 block-compressed with its size prepended.
pub const FLAG_COMPRESSED: u32 = 1;

/// Seed for xxHash32 checksum.
const XXHASH_SEED: u32 = 0;

/// Parsed file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub format_version: u32,
    pub flags: u32,
    pub timestamp: u64,
    pub uncompressed_size: u32,
    pub checksum: u32,
    pub record_count: u32,
}

impl FileHeader {
    /// Create a header describing `payload` as it will be stored on disk.
    pub fn new(payload: &[u8], flags: u32, uncompressed_size: usize, record_count: usize) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            format_version: HEADER_FORMAT_VERSION,
            flags,
            timestamp,
            uncompressed_size: uncompressed_size as u32,
            checksum: checksum(payload),
            record_count: record_count as u32,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }
}

pub fn checksum(data: &[u8]) -> u32 {
    xxh32(data, XXHASH_SEED)
}

/// Returns bytes: [header (32 bytes)] ++ [payload].
pub fn wrap_with_header(header: &FileHeader, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&header.format_version.to_le_bytes());
    out.extend_from_slice(&header.flags.to_le_bytes());
    out.extend_from_slice(&header.timestamp.to_le_bytes());
    out.extend_from_slice(&header.uncompressed_size.to_le_bytes());
    out.extend_from_slice(&header.checksum.to_le_bytes());
    out.extend_from_slice(&header.record_count.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    u64::from_le_bytes([
        bytes[at],
        bytes[at + 1],
        bytes[at + 2],
        bytes[at + 3],
        bytes[at + 4],
        bytes[at + 5],
        bytes[at + 6],
        bytes[at + 7],
    ])
}

/// Parse and validate the file header, returning it with the stored payload.
///
/// # Errors
///
/// - [`SaveError::BadMagic`] if the file does not start with `"THRM"`
/// - [`SaveError::Truncated`] if the header itself is cut short
/// - [`SaveError::UnsupportedVersion`] for headers from a newer build
/// - [`SaveError::ChecksumMismatch`] if the payload was corrupted
pub fn unwrap_header(bytes: &[u8]) -> Result<(FileHeader, &[u8]), SaveError> {
    if bytes.len() < MAGIC.len() || bytes[..4] != MAGIC {
        return Err(SaveError::BadMagic);
    }
    if bytes.len() < HEADER_SIZE {
        return Err(SaveError::Truncated {
            len: bytes.len(),
            needed: HEADER_SIZE,
        });
    }

    let header = FileHeader {
        format_version: read_u32(bytes, 4),
        flags: read_u32(bytes, 8),
        timestamp: read_u64(bytes, 12),
        uncompressed_size: read_u32(bytes, 20),
        checksum: read_u32(bytes, 24),
        record_count: read_u32(bytes, 28),
    };

    if header.format_version > HEADER_FORMAT_VERSION {
        return Err(SaveError::UnsupportedVersion {
            found: header.format_version,
            supported: HEADER_FORMAT_VERSION,
        });
    }

    let payload = &bytes[HEADER_SIZE..];
    let computed = checksum(payload);
    if computed != header.checksum {
        return Err(SaveError::ChecksumMismatch {
            expected: header.checksum,
            computed,
        });
    }

    Ok((header, payload))
}
