use std::fmt;

use tracing::warn;

use crate::encoding::TextEncoding;
use crate::error::TagResult;
use crate::format_capped_bytes;

// The `FieldKind` enum names every atomic unit a frame can be composed of.
// Each kind carries one of four byte-extraction policies:
//
// - absorb-remaining: `Text`, `Url`, `Counter`, `BinaryData` — consumes
//   everything left in the frame region (these are always terminal or
//   followed by nothing that needs a boundary).
// - single byte: `TextEncoding`, `PicType`, `GroupSymbol`.
// - fixed three bytes: `Language`, `ImageFormat`.
// - NUL-terminated: `Description`, `Owner`, `Filename`, `MimeType` — closed
//   by a terminator whose width depends on the governing text encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    TextEncoding,
    Text,
    Url,
    BinaryData,
    Description,
    Owner,
    Language,
    Counter,
    PicType,
    GroupSymbol,
    ImageFormat,
    Filename,
    MimeType,
}

impl FieldKind {
    pub fn is_single_byte(self) -> bool {
        matches!(self, Self::TextEncoding | Self::PicType | Self::GroupSymbol)
    }

    pub fn is_fixed_triplet(self) -> bool {
        matches!(self, Self::Language | Self::ImageFormat)
    }

    pub fn is_nul_terminated(self) -> bool {
        matches!(self, Self::Description | Self::Owner | Self::Filename | Self::MimeType)
    }

    /// The encoding that governs this field's bytes and terminator width.
    /// Owner, MIME and URL strings are Latin-1 on the wire no matter what
    /// text encoding the frame declares.
    pub fn governing_encoding(self, frame_encoding: TextEncoding) -> TextEncoding {
        match self {
            Self::Owner | Self::MimeType | Self::Url => TextEncoding::Latin1,
            _ => frame_encoding,
        }
    }
}

/// One field instance: a kind plus the raw bytes it owns. Interpretation
/// (text decoding, counter arithmetic) happens in accessors so that
/// re-serialization can always reproduce the original bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Field {
    kind: FieldKind,
    data: Vec<u8>,
}

impl Field {
    pub fn empty(kind: FieldKind) -> Field {
        Field { kind, data: Vec::new() }
    }

    pub fn new(kind: FieldKind, data: Vec<u8>) -> Field {
        Field { kind, data }
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Extracts one field from `region[*pos..]` per this kind's policy and
    /// advances `pos` by the bytes consumed (terminator included).
    ///
    /// Running out of bytes is never an error here: the field comes back
    /// empty (or as the all-zero language sentinel) and a warning is logged,
    /// so a slightly short frame still yields a usable composite.
    pub fn read(kind: FieldKind, region: &[u8], pos: &mut usize, encoding: TextEncoding) -> Field {
        let available = region.len().saturating_sub(*pos);
        if available == 0 {
            warn!("{:?} field truncated: no bytes left in frame, set empty", kind);
            return Field::empty(kind);
        }
        let rest = &region[*pos..];

        let data = if kind.is_single_byte() {
            *pos += 1;
            vec![rest[0]]
        } else if kind.is_fixed_triplet() {
            if available < 3 {
                *pos += available;
                warn!("{:?} field truncated: {} of 3 bytes present", kind, available);
                if kind == FieldKind::Language {
                    vec![0; 3] // empty language sentinel
                } else {
                    rest.to_vec()
                }
            } else {
                *pos += 3;
                rest[..3].to_vec()
            }
        } else if kind.is_nul_terminated() {
            let governing = kind.governing_encoding(encoding);
            match find_terminator(rest, governing) {
                Some(at) => {
                    *pos += at + governing.terminator_len();
                    rest[..at].to_vec()
                }
                None => {
                    // No terminator before the frame boundary: take the rest.
                    *pos += available;
                    rest.to_vec()
                }
            }
        } else {
            // absorb-remaining policy
            *pos += available;
            rest.to_vec()
        };

        Field { kind, data }
    }

    /// Bytes this field will occupy on disk, terminator included. A pure
    /// function of the current contents.
    pub fn encoded_len(&self, encoding: TextEncoding) -> usize {
        if self.kind.is_nul_terminated() {
            self.data.len() + self.kind.governing_encoding(encoding).terminator_len()
        } else {
            self.data.len()
        }
    }

    /// Mirrors `read`: the raw bytes, plus the terminator for NUL-closed
    /// kinds. All other kinds write their bytes verbatim.
    pub fn write_to(&self, buf: &mut Vec<u8>, encoding: TextEncoding) {
        buf.extend_from_slice(&self.data);
        if self.kind.is_nul_terminated() {
            let width = self.kind.governing_encoding(encoding).terminator_len();
            buf.resize(buf.len() + width, 0);
        }
    }

    /// Decodes the bytes as text under the encoding that governs this kind.
    pub fn as_text(&self, frame_encoding: TextEncoding) -> TagResult<String> {
        self.kind.governing_encoding(frame_encoding).decode(&self.data)
    }

    /// Replaces the bytes with `text` encoded per the governing encoding.
    pub fn set_text(&mut self, text: &str, frame_encoding: TextEncoding) {
        self.data = self.kind.governing_encoding(frame_encoding).encode(text);
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("kind", &self.kind)
            .field("data", &format_capped_bytes(&self.data))
            .finish()
    }
}

/// Scans for the field terminator: a single `0x00` for 8-bit encodings, a
/// `0x00 0x00` pair at an even offset (relative to the field start) for
/// 16-bit encodings.
fn find_terminator(data: &[u8], encoding: TextEncoding) -> Option<usize> {
    if encoding.is_wide() {
        (0..data.len().saturating_sub(1))
            .step_by(2)
            .find(|&i| data[i] == 0 && data[i + 1] == 0)
    } else {
        data.iter().position(|&b| b == 0)
    }
}
