use thiserror::Error;

/// Result alias used across the codec.
pub type TagResult<T> = Result<T, TagError>;

/// Errors surfaced by the frame/box codec.
///
/// Truncated *fields* inside an otherwise well-delimited frame are not
/// errors: they degrade to empty values with a logged warning. Everything
/// here either corrupts the parse position (format violations), asks for
/// something the version cannot express (unsupported operations), or
/// indicates a codec bug (`LengthMismatch`).
#[derive(Debug, Error)]
pub enum TagError {
    #[error("unsupported tag major version {0}")]
    UnsupportedVersion(u8),

    #[error("value {value} does not fit a {bits}-bit size field")]
    SizeOutOfRange { value: u32, bits: u32 },

    #[error("truncated input: needed {needed} bytes, only {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("frame {id} overruns its region: declared {declared} bytes, {available} available")]
    BoxBounds {
        id: String,
        declared: usize,
        available: usize,
    },

    #[error("unknown text encoding byte 0x{0:02X}")]
    BadEncoding(u8),

    #[error("UTF-16 text starts with 0x{0:04X}, which is not a byte order mark")]
    MissingBom(u16),

    #[error("undecodable text field: {0}")]
    BadText(&'static str),

    #[error("malformed timestamp {0:?}")]
    BadTimestamp(String),

    #[error("bad tag header: {0}")]
    BadHeader(&'static str),

    #[error("invalid frame identifier {0:?}")]
    InvalidId(String),

    #[error("frame identifier {id:?} is not valid under major version {major}")]
    BadIdentifier { id: String, major: u8 },

    #[error("{op} is not supported under major version {major}")]
    Unsupported { op: &'static str, major: u8 },

    #[error("computed frame payload of {computed} bytes does not match {written} bytes written")]
    LengthMismatch { computed: usize, written: usize },

    #[error("compressed frame expanded to {actual} bytes, expected {expected}")]
    BadExpandedLength { expected: usize, actual: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
