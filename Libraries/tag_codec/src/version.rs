use crate::error::{TagError, TagResult};

// The `FormatVersion` struct captures everything that varies between tag
// major versions, so that the codec never branches on a raw version number.
//
// Fields:
// - `id_len`/`size_len`/`header_len`: byte widths of the frame identifier,
//   the frame size field, and the whole fixed frame header.
// - `has_frame_flags`: major 2 frames carry no flag bytes at all.
// - `supports_compression`: deflated frame payloads exist from major 3 on.
// - `*_mask`: position of each known bit inside the two flag bytes. A mask
//   of zero means the bit does not exist under this version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatVersion {
    pub major: u8,
    pub id_len: usize,
    pub size_len: usize,
    pub header_len: usize,
    pub has_frame_flags: bool,
    pub supports_compression: bool,
    pub tag_alter_mask: u16,
    pub file_alter_mask: u16,
    pub read_only_mask: u16,
    pub compressed_mask: u16,
    pub encrypted_mask: u16,
    pub grouping_mask: u16,
    pub unsync_mask: u16,
}

impl FormatVersion {
    /// Major 2: 3-byte identifiers, 24-bit sizes, no frame flags.
    pub const V2: FormatVersion = FormatVersion {
        major: 2,
        id_len: 3,
        size_len: 3,
        header_len: 6,
        has_frame_flags: false,
        supports_compression: false,
        tag_alter_mask: 0,
        file_alter_mask: 0,
        read_only_mask: 0,
        compressed_mask: 0,
        encrypted_mask: 0,
        grouping_mask: 0,
        unsync_mask: 0,
    };

    /// Major 3: 4-byte identifiers, plain 32-bit big-endian sizes.
    pub const V3: FormatVersion = FormatVersion {
        major: 3,
        id_len: 4,
        size_len: 4,
        header_len: 10,
        has_frame_flags: true,
        supports_compression: true,
        tag_alter_mask: 0x8000,
        file_alter_mask: 0x4000,
        read_only_mask: 0x2000,
        compressed_mask: 0x0080,
        encrypted_mask: 0x0040,
        grouping_mask: 0x0020,
        unsync_mask: 0,
    };

    /// Major 4: 4-byte identifiers, synch-safe sizes, per-frame
    /// unsynchronization.
    pub const V4: FormatVersion = FormatVersion {
        major: 4,
        id_len: 4,
        size_len: 4,
        header_len: 10,
        has_frame_flags: true,
        supports_compression: true,
        tag_alter_mask: 0x4000,
        file_alter_mask: 0x2000,
        read_only_mask: 0x1000,
        compressed_mask: 0x0008,
        encrypted_mask: 0x0004,
        grouping_mask: 0x0040,
        unsync_mask: 0x0002,
    };

    pub fn new(major: u8) -> TagResult<FormatVersion> {
        match major {
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            4 => Ok(Self::V4),
            other => Err(TagError::UnsupportedVersion(other)),
        }
    }
}
