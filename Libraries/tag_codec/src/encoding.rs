//! Text encodings and the string codecs built on them.

use crate::error::{TagError, TagResult};

/// The four text encodings a frame can declare for its text fields. The
/// discriminants are the on-disk encoding byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TextEncoding {
    #[default]
    Latin1 = 0,
    /// UTF-16 with a leading byte-order mark; written little-endian.
    Utf16Bom = 1,
    /// UTF-16 big-endian without a byte-order mark.
    Utf16Be = 2,
    Utf8 = 3,
}

impl TextEncoding {
    pub fn from_byte(value: u8) -> TagResult<TextEncoding> {
        match value {
            0 => Ok(Self::Latin1),
            1 => Ok(Self::Utf16Bom),
            2 => Ok(Self::Utf16Be),
            3 => Ok(Self::Utf8),
            other => Err(TagError::BadEncoding(other)),
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Whether code units are two bytes wide.
    pub fn is_wide(self) -> bool {
        matches!(self, Self::Utf16Bom | Self::Utf16Be)
    }

    /// Width of the NUL terminator under this encoding.
    pub fn terminator_len(self) -> usize {
        if self.is_wide() {
            2
        } else {
            1
        }
    }

    /// Decodes `data` into a logical string, trimming a single trailing NUL.
    ///
    /// `Utf16Bom` inspects the leading mark to pick the byte order and fails
    /// with an unsupported-format error when the mark matches neither BOM.
    pub fn decode(self, data: &[u8]) -> TagResult<String> {
        let mut text = match self {
            Self::Latin1 => data.iter().map(|&b| b as char).collect(),
            Self::Utf8 => String::from_utf8(data.to_vec())
                .map_err(|_| TagError::BadText("invalid UTF-8 sequence"))?,
            Self::Utf16Be => decode_utf16(data, u16::from_be_bytes)?,
            Self::Utf16Bom => {
                if data.is_empty() {
                    String::new()
                } else if data.len() < 2 {
                    return Err(TagError::MissingBom(data[0] as u16));
                } else {
                    match u16::from_be_bytes([data[0], data[1]]) {
                        0xFFFE => decode_utf16(&data[2..], u16::from_le_bytes)?,
                        0xFEFF => decode_utf16(&data[2..], u16::from_be_bytes)?,
                        other => return Err(TagError::MissingBom(other)),
                    }
                }
            }
        };
        if text.ends_with('\0') {
            text.pop();
        }
        Ok(text)
    }

    /// Encodes `text` without a terminator, prepending the little-endian
    /// byte-order mark for `Utf16Bom`. Latin-1 substitutes `?` for
    /// characters outside its range.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Latin1 => text
                .chars()
                .map(|c| if (c as u32) < 0x100 { c as u8 } else { b'?' })
                .collect(),
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Self::Utf16Bom => {
                let mut out = vec![0xFF, 0xFE];
                out.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
                out
            }
        }
    }
}

fn decode_utf16(data: &[u8], combine: fn([u8; 2]) -> u16) -> TagResult<String> {
    if data.len() % 2 != 0 {
        return Err(TagError::BadText("UTF-16 text with odd byte length"));
    }
    let units: Vec<u16> = data.chunks_exact(2).map(|c| combine([c[0], c[1]])).collect();
    String::from_utf16(&units).map_err(|_| TagError::BadText("unpaired UTF-16 surrogate"))
}

/// How a list of logical strings maps onto one encoded text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// The field is a single string; no splitting happens.
    None,
    /// Strings are NUL-joined (major 4 text frames).
    Nul,
    /// Strings are `/`-joined (major 3 legacy list frames).
    Slash,
}

impl Separator {
    pub fn join(self, parts: &[String]) -> String {
        match self {
            Separator::None => parts.first().cloned().unwrap_or_default(),
            Separator::Nul => parts.join("\0"),
            Separator::Slash => parts.join("/"),
        }
    }

    pub fn split(self, text: &str) -> Vec<String> {
        match self {
            Separator::None => vec![text.to_string()],
            Separator::Nul => text.split('\0').map(str::to_string).collect(),
            Separator::Slash => text.split('/').map(str::to_string).collect(),
        }
    }
}
