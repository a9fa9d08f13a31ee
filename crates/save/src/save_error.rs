// ---------------------------------------------------------------------------
// SaveError: error types for thermal save/load operations
// ---------------------------------------------------------------------------

use std::fmt;

/// Errors that can occur while writing or reading a thermal save.
#[derive(Debug)]
pub enum SaveError {
    /// I/O error (file not found, permission denied, disk full, etc.)
    Io(std::io::Error),
    /// Bitcode decoding failed, or the payload disagrees with its header.
    Decode(String),
    /// The bytes do not start with the `THRM` magic.
    BadMagic,
    /// The file ends before the fixed-size header does.
    Truncated { len: usize, needed: usize },
    /// Header or payload version is newer than this build supports.
    UnsupportedVersion { found: u32, supported: u32 },
    /// The stored payload does not hash to the header checksum.
    ChecksumMismatch { expected: u32, computed: u32 },
    /// LZ4 decompression failed or produced the wrong size.
    Decompress(String),
    /// No save data was available to load.
    NoData,
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "I/O error: {e}"),
            SaveError::Decode(msg) => write!(f, "Decoding error: {msg}"),
            SaveError::BadMagic => write!(f, "Not a thermal save file (missing THRM magic)"),
            SaveError::Truncated { len, needed } => write!(
                f,
                "Save file is too short ({len} bytes, need at least {needed} for header)"
            ),
            SaveError::UnsupportedVersion { found, supported } => write!(
                f,
                "Version mismatch: save is v{found}, but this build only supports up to v{supported}"
            ),
            SaveError::ChecksumMismatch { expected, computed } => write!(
                f,
                "Save file is corrupted: checksum mismatch (expected {expected:#010X}, got {computed:#010X})"
            ),
            SaveError::Decompress(msg) => write!(f, "Decompression error: {msg}"),
            SaveError::NoData => write!(f, "No save data available to load"),
        }
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SaveError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<bitcode::Error> for SaveError {
    fn from(e: bitcode::Error) -> Self {
        SaveError::Decode(e.to_string())
    }
}

impl From<lz4_flex::block::DecompressError> for SaveError {
    fn from(e: lz4_flex::block::DecompressError) -> Self {
        SaveError::Decompress(e.to_string())
    }
}
