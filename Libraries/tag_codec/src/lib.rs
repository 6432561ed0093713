//! # Tag frame/box format overview
//!
//! Media tags store their metadata as a flat-to-shallow tree of **frames**
//! (also called boxes): self-describing, length-prefixed units that share
//! one structural pattern across tag generations.
//!
//! ## Structure of a tag block
//! A tag block opens with a fixed 10-byte header (magic, major version,
//! flags, synch-safe total size) followed by a size-bounded region of
//! frames and optional zero padding.
//!
//! ### Key characteristics of frames
//! - **Frame header**: a 3- or 4-byte identifier and a size field whose
//!   width depends on the major version (24-bit, 32-bit, or synch-safe).
//! - **Frame flags**: from major 3 on, two flag bytes announce grouping,
//!   deflate compression, encryption and per-frame unsynchronization.
//! - **Frame payload**: an ordered list of typed fields — text encoding
//!   byte, NUL-terminated strings, fixed-width codes, raw binary tails —
//!   whose composition is fixed per frame class.
//!
//! ### Major versions
//! 1. **Major 2**: 3-character identifiers, 24-bit sizes, no frame flags.
//! 2. **Major 3**: 4-character identifiers, plain 32-bit sizes, frame
//!    flags with deflate compression.
//! 3. **Major 4**: synch-safe sizes everywhere, per-frame
//!    unsynchronization, NUL-joined multi-strings.
//!
//! ## Implementation in this library
//! - The [`synch`], [`encoding`] and [`timestamp`] modules hold the
//!   primitive codecs everything else is built from.
//! - The [`field`] module defines the typed atomic units and their byte
//!   extraction policies.
//! - The [`registry`] module is the static descriptor table mapping
//!   external identifiers (per major version) to internal kinds and field
//!   compositions. Unknown identifiers always degrade to a raw-payload
//!   frame; they are never an error.
//! - The [`frame`] module is the symmetric read/write state machine over
//!   one frame, and [`container`] walks size-bounded regions of frames,
//!   recursing into the chapter/table-of-contents containers.
//! - The [`tag`] module reads and writes whole tag blocks.
//!
//! Lengths are always recomputed bottom-up from current field contents
//! before writing; a stored length is never treated as authoritative.

pub mod container;
pub mod encoding;
pub mod error;
pub mod field;
pub mod frame;
pub mod registry;
pub mod synch;
pub mod tag;
pub mod timestamp;
pub mod version;

pub use container::{parse_region, write_region, ChapterFrame, TagNode, TocFrame};
pub use encoding::{Separator, TextEncoding};
pub use error::{TagError, TagResult};
pub use field::{Field, FieldKind};
pub use frame::Frame;
pub use registry::{FrameClass, FrameDefinition, FrameKind, TagID};
pub use tag::Tag;
pub use timestamp::Timestamp;
pub use version::FormatVersion;

pub fn format_capped_bytes(data: &[u8]) -> String {
    let capped = &data[..data.len().min(8)];
    if data.len() > 8 {
        format!("{:?} ...", capped)
    } else {
        format!("{:?}", capped)
    }
}
