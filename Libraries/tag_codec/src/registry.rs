//! Static descriptor tables mapping external frame identifiers to internal
//! kinds and field compositions.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::encoding::Separator;
use crate::error::{TagError, TagResult};
use crate::field::FieldKind;
use crate::version::FormatVersion;

/// Fixed-length 3- or 4-byte frame identifier. An all-zero byte pattern
/// (padding) normalizes to the empty identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagID {
    bytes: [u8; 4],
    len: u8,
}

impl TagID {
    pub const EMPTY: TagID = TagID { bytes: [0; 4], len: 0 };

    /// Builds an identifier from 3 or 4 raw bytes read off the wire.
    pub fn from_bytes(raw: &[u8]) -> TagID {
        debug_assert!(raw.len() == 3 || raw.len() == 4);
        if raw.iter().all(|&b| b == 0) {
            return TagID::EMPTY;
        }
        let mut bytes = [0u8; 4];
        bytes[..raw.len()].copy_from_slice(raw);
        TagID { bytes, len: raw.len() as u8 }
    }

    /// Parses a user-supplied identifier string.
    pub fn parse(text: &str) -> TagResult<TagID> {
        let raw = text.as_bytes();
        let ok_len = raw.len() == 3 || raw.len() == 4;
        if !ok_len || !raw.iter().all(u8::is_ascii_alphanumeric) {
            return Err(TagError::InvalidId(text.to_string()));
        }
        Ok(TagID::from_bytes(raw))
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    pub fn len(self) -> usize {
        self.len as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).unwrap_or("????")
    }
}

impl fmt::Display for TagID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for TagID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagID({})", self.as_str())
    }
}

/// Internal semantic identifier of a frame, independent of which external
/// identifier spelled it under which major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Title,
    Subtitle,
    Artist,
    AlbumArtist,
    Album,
    Track,
    Year,
    RecordingTime,
    Genre,
    Composer,
    Lyricist,
    OriginalArtist,
    EncodedBy,
    Bpm,
    Copyright,
    Publisher,
    Length,
    Comment,
    Lyrics,
    UserText,
    UserUrl,
    ArtistUrl,
    AudioFileUrl,
    UniqueFileId,
    PlayCounter,
    AttachedPicture,
    EncapsulatedObject,
    Chapter,
    TableOfContents,
    Unknown,
}

/// Schema-level shape of a frame: which ordered field list composes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameClass {
    Text,
    Url,
    UserText,
    UserUrl,
    Comment,
    Picture,
    /// Major-2 picture shape with the fixed 3-byte image format code.
    PictureLegacy,
    EncapsulatedObject,
    UniqueFileId,
    Counter,
    Chapter,
    TableOfContents,
    Unknown,
}

impl FrameClass {
    /// The ordered field composition for this class. Container classes have
    /// no flat field list; their shape lives in the container walker.
    pub fn fields(self) -> &'static [FieldKind] {
        use FieldKind as F;
        match self {
            FrameClass::Text => &[F::TextEncoding, F::Text],
            FrameClass::Url => &[F::Url],
            FrameClass::UserText => &[F::TextEncoding, F::Description, F::Text],
            FrameClass::UserUrl => &[F::TextEncoding, F::Description, F::Url],
            FrameClass::Comment => &[F::TextEncoding, F::Language, F::Description, F::Text],
            FrameClass::Picture => {
                &[F::TextEncoding, F::MimeType, F::PicType, F::Description, F::BinaryData]
            }
            FrameClass::PictureLegacy => {
                &[F::TextEncoding, F::ImageFormat, F::PicType, F::Description, F::BinaryData]
            }
            FrameClass::EncapsulatedObject => {
                &[F::TextEncoding, F::MimeType, F::Filename, F::Description, F::BinaryData]
            }
            FrameClass::UniqueFileId => &[F::Owner, F::BinaryData],
            FrameClass::Counter => &[F::Counter],
            FrameClass::Chapter | FrameClass::TableOfContents => &[],
            FrameClass::Unknown => &[F::BinaryData],
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, Self::Chapter | Self::TableOfContents)
    }
}

/// One row of the descriptor table. The identifier columns are sparse: not
/// every frame exists under every major version.
#[derive(Debug)]
pub struct FrameDefinition {
    pub kind: FrameKind,
    pub class: FrameClass,
    pub id_v2: Option<&'static str>,
    pub id_v3: Option<&'static str>,
    pub id_v4: Option<&'static str>,
    pub description: &'static str,
}

impl FrameDefinition {
    pub fn id_for(&self, version: &FormatVersion) -> Option<&'static str> {
        match version.major {
            2 => self.id_v2,
            3 => self.id_v3,
            _ => self.id_v4,
        }
    }

    /// The composition this kind uses under `version`. Only the attached
    /// picture differs: major 2 uses the legacy 3-byte format code.
    pub fn class_for(&self, version: &FormatVersion) -> FrameClass {
        if version.major == 2 && self.class == FrameClass::Picture {
            FrameClass::PictureLegacy
        } else {
            self.class
        }
    }
}

macro_rules! def {
    ($kind:ident, $class:ident, $v2:expr, $v3:expr, $v4:expr, $desc:expr) => {
        FrameDefinition {
            kind: FrameKind::$kind,
            class: FrameClass::$class,
            id_v2: $v2,
            id_v3: $v3,
            id_v4: $v4,
            description: $desc,
        }
    };
}

/// The descriptor table. Catalog prose (full frame descriptions) stays with
/// the external catalog layer; these rows are the codec's schema.
pub static DEFINITIONS: &[FrameDefinition] = &[
    def!(Title, Text, Some("TT2"), Some("TIT2"), Some("TIT2"), "Title"),
    def!(Subtitle, Text, Some("TT3"), Some("TIT3"), Some("TIT3"), "Subtitle"),
    def!(Artist, Text, Some("TP1"), Some("TPE1"), Some("TPE1"), "Lead performer"),
    def!(AlbumArtist, Text, Some("TP2"), Some("TPE2"), Some("TPE2"), "Band/accompaniment"),
    def!(Album, Text, Some("TAL"), Some("TALB"), Some("TALB"), "Album"),
    def!(Track, Text, Some("TRK"), Some("TRCK"), Some("TRCK"), "Track number"),
    def!(Year, Text, Some("TYE"), Some("TYER"), None, "Year"),
    def!(RecordingTime, Text, None, None, Some("TDRC"), "Recording time"),
    def!(Genre, Text, Some("TCO"), Some("TCON"), Some("TCON"), "Content type"),
    def!(Composer, Text, Some("TCM"), Some("TCOM"), Some("TCOM"), "Composer"),
    def!(Lyricist, Text, Some("TXT"), Some("TEXT"), Some("TEXT"), "Lyricist"),
    def!(OriginalArtist, Text, Some("TOA"), Some("TOPE"), Some("TOPE"), "Original performer"),
    def!(EncodedBy, Text, Some("TEN"), Some("TENC"), Some("TENC"), "Encoded by"),
    def!(Bpm, Text, Some("TBP"), Some("TBPM"), Some("TBPM"), "Beats per minute"),
    def!(Copyright, Text, Some("TCR"), Some("TCOP"), Some("TCOP"), "Copyright message"),
    def!(Publisher, Text, Some("TPB"), Some("TPUB"), Some("TPUB"), "Publisher"),
    def!(Length, Text, Some("TLE"), Some("TLEN"), Some("TLEN"), "Length"),
    def!(Comment, Comment, Some("COM"), Some("COMM"), Some("COMM"), "Comments"),
    def!(Lyrics, Comment, Some("ULT"), Some("USLT"), Some("USLT"), "Unsynchronised lyrics"),
    def!(UserText, UserText, Some("TXX"), Some("TXXX"), Some("TXXX"), "User defined text"),
    def!(UserUrl, UserUrl, Some("WXX"), Some("WXXX"), Some("WXXX"), "User defined URL"),
    def!(ArtistUrl, Url, Some("WAR"), Some("WOAR"), Some("WOAR"), "Official artist webpage"),
    def!(AudioFileUrl, Url, Some("WAF"), Some("WOAF"), Some("WOAF"), "Official audio file webpage"),
    def!(UniqueFileId, UniqueFileId, Some("UFI"), Some("UFID"), Some("UFID"), "Unique file identifier"),
    def!(PlayCounter, Counter, Some("CNT"), Some("PCNT"), Some("PCNT"), "Play counter"),
    def!(AttachedPicture, Picture, Some("PIC"), Some("APIC"), Some("APIC"), "Attached picture"),
    def!(EncapsulatedObject, EncapsulatedObject, Some("GEO"), Some("GEOB"), Some("GEOB"), "Encapsulated object"),
    def!(Chapter, Chapter, None, Some("CHAP"), Some("CHAP"), "Chapter"),
    def!(TableOfContents, TableOfContents, None, Some("CTOC"), Some("CTOC"), "Table of contents"),
];

/// The degradation target for identifiers the table does not know.
pub static UNKNOWN_DEFINITION: FrameDefinition =
    def!(Unknown, Unknown, None, None, None, "Unknown frame");

static BY_KIND: Lazy<HashMap<FrameKind, &'static FrameDefinition>> =
    Lazy::new(|| DEFINITIONS.iter().map(|d| (d.kind, d)).collect());

fn id_map(pick: fn(&FrameDefinition) -> Option<&'static str>) -> HashMap<&'static str, &'static FrameDefinition> {
    DEFINITIONS.iter().filter_map(|d| pick(d).map(|id| (id, d))).collect()
}

static BY_ID_V2: Lazy<HashMap<&'static str, &'static FrameDefinition>> =
    Lazy::new(|| id_map(|d| d.id_v2));
static BY_ID_V3: Lazy<HashMap<&'static str, &'static FrameDefinition>> =
    Lazy::new(|| id_map(|d| d.id_v3));
static BY_ID_V4: Lazy<HashMap<&'static str, &'static FrameDefinition>> =
    Lazy::new(|| id_map(|d| d.id_v4));

/// Looks up the definition for an internal kind.
pub fn definition(kind: FrameKind) -> &'static FrameDefinition {
    BY_KIND.get(&kind).copied().unwrap_or(&UNKNOWN_DEFINITION)
}

/// Resolves an external identifier under `version`. Never fails: unknown
/// identifiers come back as the Unknown definition.
pub fn resolve(version: &FormatVersion, id: TagID) -> &'static FrameDefinition {
    let map = match version.major {
        2 => &BY_ID_V2,
        3 => &BY_ID_V3,
        _ => &BY_ID_V4,
    };
    map.get(id.as_str()).copied().unwrap_or(&UNKNOWN_DEFINITION)
}

/// Major 3 inherited `/`-joined value lists for a handful of people-list
/// frames; major 4 switched every text frame to NUL joining.
pub fn separator_for(version: &FormatVersion, kind: FrameKind, class: FrameClass) -> Separator {
    if class != FrameClass::Text {
        return Separator::None;
    }
    match version.major {
        4 => Separator::Nul,
        3 if matches!(
            kind,
            FrameKind::Artist | FrameKind::Composer | FrameKind::Lyricist | FrameKind::OriginalArtist
        ) =>
        {
            Separator::Slash
        }
        _ => Separator::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bytes_normalize_to_the_empty_id() {
        assert!(TagID::from_bytes(&[0, 0, 0, 0]).is_empty());
        assert!(TagID::from_bytes(&[0, 0, 0]).is_empty());
        assert_eq!(TagID::from_bytes(&[0, 0, 0]), TagID::EMPTY);
    }

    #[test]
    fn ids_compare_by_identifier_string() {
        assert_eq!(TagID::parse("TIT2").unwrap(), TagID::from_bytes(b"TIT2"));
        assert_ne!(TagID::parse("TIT2").unwrap(), TagID::parse("TIT3").unwrap());
        assert!(TagID::parse("toolong").is_err());
        assert!(TagID::parse("T 2").is_err());
    }

    #[test]
    fn resolution_is_version_indexed() {
        let v2 = FormatVersion::V2;
        let v4 = FormatVersion::V4;
        assert_eq!(resolve(&v2, TagID::from_bytes(b"TT2")).kind, FrameKind::Title);
        assert_eq!(resolve(&v4, TagID::from_bytes(b"TIT2")).kind, FrameKind::Title);
        // TIT2 is not a major-2 identifier.
        assert_eq!(resolve(&v2, TagID::from_bytes(b"TIT2")).kind, FrameKind::Unknown);
    }

    #[test]
    fn unknown_identifiers_degrade() {
        let def = resolve(&FormatVersion::V4, TagID::from_bytes(b"XYZW"));
        assert_eq!(def.kind, FrameKind::Unknown);
        assert_eq!(def.class, FrameClass::Unknown);
    }

    #[test]
    fn picture_composition_is_version_dependent() {
        let def = definition(FrameKind::AttachedPicture);
        assert_eq!(def.class_for(&FormatVersion::V2), FrameClass::PictureLegacy);
        assert_eq!(def.class_for(&FormatVersion::V4), FrameClass::Picture);
        assert!(def.class_for(&FormatVersion::V2).fields().contains(&FieldKind::ImageFormat));
        assert!(def.class_for(&FormatVersion::V3).fields().contains(&FieldKind::MimeType));
    }

    #[test]
    fn separators_follow_kind_and_version() {
        let artist = definition(FrameKind::Artist);
        assert_eq!(separator_for(&FormatVersion::V4, artist.kind, artist.class), Separator::Nul);
        assert_eq!(separator_for(&FormatVersion::V3, artist.kind, artist.class), Separator::Slash);
        assert_eq!(separator_for(&FormatVersion::V2, artist.kind, artist.class), Separator::None);
        let title = definition(FrameKind::Title);
        assert_eq!(separator_for(&FormatVersion::V3, title.kind, title.class), Separator::None);
    }
}
