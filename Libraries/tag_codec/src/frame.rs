//! The frame codec: the symmetric read/write state machine over one
//! length-prefixed frame.

use std::fmt;
use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::warn;

use crate::encoding::TextEncoding;
use crate::error::{TagError, TagResult};
use crate::field::{Field, FieldKind};
use crate::registry::{self, FrameClass, FrameDefinition, FrameKind, TagID};
use crate::synch::{desynchronize, read_size, write_size};
use crate::version::FormatVersion;

/// Parsed fixed header of one frame: identifier, declared payload size and,
/// for majors >= 3, the two flag bytes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameHeader {
    pub id: TagID,
    pub declared: usize,
    pub flags: u16,
    pub header_len: usize,
}

impl FrameHeader {
    /// Reads the frame header at the start of `data`. Returns `None` when
    /// the walker has run into padding (a leading zero identifier byte).
    pub(crate) fn read(data: &[u8], version: &FormatVersion) -> TagResult<Option<FrameHeader>> {
        if data.is_empty() || data[0] == 0 {
            return Ok(None);
        }
        if data.len() < version.header_len {
            return Err(TagError::Truncated {
                needed: version.header_len,
                available: data.len(),
            });
        }
        let id = TagID::from_bytes(&data[..version.id_len]);
        let declared = read_size(version, &data[version.id_len..])? as usize;
        let flags = if version.has_frame_flags {
            let at = version.id_len + version.size_len;
            u16::from_be_bytes([data[at], data[at + 1]])
        } else {
            0
        };
        Ok(Some(FrameHeader {
            id,
            declared,
            flags,
            header_len: version.header_len,
        }))
    }
}

/// One leaf frame: an identifier plus the ordered fields its class
/// prescribes. The composition is fixed at construction; the on-disk length
/// is recomputed from the current field contents on every write.
#[derive(Clone, PartialEq)]
pub struct Frame {
    id: TagID,
    kind: FrameKind,
    class: FrameClass,
    fields: Vec<Field>,
    group_symbol: Option<u8>,
    compressed: bool,
    encrypted: bool,
    tag_alter_discard: bool,
    file_alter_discard: bool,
    read_only: bool,
}

impl Frame {
    /// Creates an empty frame of `kind` with the field composition its
    /// class prescribes under `version`.
    pub fn new(kind: FrameKind, version: &FormatVersion) -> TagResult<Frame> {
        let def = registry::definition(kind);
        let Some(id) = def.id_for(version) else {
            return Err(TagError::BadIdentifier {
                id: format!("{kind:?}"),
                major: version.major,
            });
        };
        let class = def.class_for(version);
        Ok(Frame {
            id: TagID::from_bytes(id.as_bytes()),
            kind,
            class,
            fields: class.fields().iter().map(|&k| default_field(k)).collect(),
            group_symbol: None,
            compressed: false,
            encrypted: false,
            tag_alter_discard: false,
            file_alter_discard: false,
            read_only: false,
        })
    }

    /// Wraps raw payload bytes under an identifier the registry does not
    /// know. Nothing is discarded; the payload re-serializes verbatim.
    pub fn unknown(id: TagID, payload: Vec<u8>) -> Frame {
        Frame {
            id,
            kind: FrameKind::Unknown,
            class: FrameClass::Unknown,
            fields: vec![Field::new(FieldKind::BinaryData, payload)],
            group_symbol: None,
            compressed: false,
            encrypted: false,
            tag_alter_discard: false,
            file_alter_discard: false,
            read_only: false,
        }
    }

    pub fn id(&self) -> TagID {
        self.id
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn class(&self) -> FrameClass {
        self.class
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn group_symbol(&self) -> Option<u8> {
        self.group_symbol
    }

    pub fn set_group_symbol(&mut self, symbol: Option<u8>, version: &FormatVersion) -> TagResult<()> {
        if symbol.is_some() && version.grouping_mask == 0 {
            return Err(TagError::Unsupported {
                op: "frame grouping",
                major: version.major,
            });
        }
        self.group_symbol = symbol;
        Ok(())
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Requests (or clears) deflate compression of the field payload.
    /// Fails fast under majors without frame compression.
    pub fn set_compressed(&mut self, compressed: bool, version: &FormatVersion) -> TagResult<()> {
        if compressed && !version.supports_compression {
            return Err(TagError::Unsupported {
                op: "frame compression",
                major: version.major,
            });
        }
        self.compressed = compressed;
        Ok(())
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The text encoding currently declared by this frame's encoding field.
    pub fn encoding(&self) -> TextEncoding {
        self.fields
            .iter()
            .find(|f| f.kind() == FieldKind::TextEncoding)
            .and_then(|f| f.data().first().copied())
            .and_then(|b| TextEncoding::from_byte(b).ok())
            .unwrap_or_default()
    }

    /// Switches the declared encoding, re-encoding every field the frame
    /// encoding governs so bytes and declaration stay consistent.
    pub fn set_encoding(&mut self, encoding: TextEncoding) -> TagResult<()> {
        let old = self.encoding();
        if old == encoding {
            return Ok(());
        }
        for i in 0..self.fields.len() {
            match self.fields[i].kind() {
                FieldKind::TextEncoding => self.fields[i].set_data(vec![encoding.as_byte()]),
                FieldKind::Text | FieldKind::Description | FieldKind::Filename => {
                    let text = old.decode(self.fields[i].data())?;
                    self.fields[i].set_data(encoding.encode(&text));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn field(&self, kind: FieldKind) -> Option<&Field> {
        self.fields.iter().find(|f| f.kind() == kind)
    }

    fn field_mut(&mut self, kind: FieldKind) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.kind() == kind)
    }

    fn text_of(&self, kind: FieldKind) -> TagResult<String> {
        match self.field(kind) {
            Some(f) => f.as_text(self.encoding()),
            None => Ok(String::new()),
        }
    }

    fn set_text_of(&mut self, kind: FieldKind, text: &str) {
        let encoding = self.encoding();
        if let Some(f) = self.field_mut(kind) {
            f.set_text(text, encoding);
        }
    }

    /// Decoded logical strings of the text field, split on the separator
    /// this kind uses under `version`.
    pub fn text(&self, version: &FormatVersion) -> TagResult<Vec<String>> {
        let Some(field) = self.field(FieldKind::Text) else {
            return Ok(Vec::new());
        };
        let joined = field.as_text(self.encoding())?;
        Ok(registry::separator_for(version, self.kind, self.class).split(&joined))
    }

    pub fn set_text(&mut self, parts: &[String], version: &FormatVersion) {
        let sep = registry::separator_for(version, self.kind, self.class);
        let encoding = self.encoding();
        if let Some(field) = self.field_mut(FieldKind::Text) {
            field.set_text(&sep.join(parts), encoding);
        }
    }

    pub fn description(&self) -> TagResult<String> {
        self.text_of(FieldKind::Description)
    }

    pub fn set_description(&mut self, text: &str) {
        self.set_text_of(FieldKind::Description, text);
    }

    pub fn url(&self) -> TagResult<String> {
        self.text_of(FieldKind::Url)
    }

    pub fn set_url(&mut self, url: &str) {
        self.set_text_of(FieldKind::Url, url);
    }

    pub fn owner(&self) -> TagResult<String> {
        self.text_of(FieldKind::Owner)
    }

    pub fn set_owner(&mut self, owner: &str) {
        self.set_text_of(FieldKind::Owner, owner);
    }

    pub fn mime_type(&self) -> TagResult<String> {
        self.text_of(FieldKind::MimeType)
    }

    pub fn set_mime_type(&mut self, mime: &str) {
        self.set_text_of(FieldKind::MimeType, mime);
    }

    /// The 3-character language code, or the empty string for the all-zero
    /// sentinel.
    pub fn language(&self) -> String {
        match self.field(FieldKind::Language) {
            Some(f) if !f.data().iter().all(|&b| b == 0) => {
                f.data().iter().map(|&b| b as char).collect()
            }
            _ => String::new(),
        }
    }

    pub fn set_language(&mut self, code: &str) {
        let mut bytes = [0u8; 3];
        for (i, b) in code.bytes().take(3).enumerate() {
            bytes[i] = b;
        }
        if let Some(f) = self.field_mut(FieldKind::Language) {
            f.set_data(bytes.to_vec());
        }
    }

    /// The legacy 3-character image format code (`PNG`, `JPG`), major 2
    /// pictures only.
    pub fn image_format(&self) -> String {
        match self.field(FieldKind::ImageFormat) {
            Some(f) if !f.data().iter().all(|&b| b == 0) => {
                f.data().iter().map(|&b| b as char).collect()
            }
            _ => String::new(),
        }
    }

    pub fn set_image_format(&mut self, code: &str) {
        let mut bytes = [0u8; 3];
        for (i, b) in code.bytes().take(3).enumerate() {
            bytes[i] = b;
        }
        if let Some(f) = self.field_mut(FieldKind::ImageFormat) {
            f.set_data(bytes.to_vec());
        }
    }

    pub fn pic_type(&self) -> Option<u8> {
        self.field(FieldKind::PicType).and_then(|f| f.data().first().copied())
    }

    pub fn set_pic_type(&mut self, value: u8) {
        if let Some(f) = self.field_mut(FieldKind::PicType) {
            f.set_data(vec![value]);
        }
    }

    pub fn binary(&self) -> &[u8] {
        match self.field(FieldKind::BinaryData) {
            Some(f) => f.data(),
            None => &[],
        }
    }

    pub fn set_binary(&mut self, data: Vec<u8>) {
        if let Some(f) = self.field_mut(FieldKind::BinaryData) {
            f.set_data(data);
        }
    }

    /// Big-endian counter value (play counters are at least 4 bytes wide
    /// on disk and grow as needed).
    pub fn counter(&self) -> u64 {
        self.field(FieldKind::Counter)
            .map_or(0, |f| f.data().iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }

    pub fn set_counter(&mut self, value: u64) {
        let bytes = if value > u32::MAX as u64 {
            value.to_be_bytes().to_vec()
        } else {
            (value as u32).to_be_bytes().to_vec()
        };
        if let Some(f) = self.field_mut(FieldKind::Counter) {
            f.set_data(bytes);
        }
    }

    /// Reads the frame body out of `region` (the declared-size slice right
    /// after the header).
    pub(crate) fn read_body(
        header: &FrameHeader,
        region: &[u8],
        version: &FormatVersion,
        def: &FrameDefinition,
    ) -> TagResult<Frame> {
        let flags = header.flags;
        let flag = |mask: u16| mask != 0 && flags & mask != 0;

        // An unsynchronized region is materialized into a scratch buffer;
        // the effective length is whatever the transform left. In-memory
        // frames are always synchronized, so the flag is dropped here.
        let desynced;
        let mut region = region;
        if flag(version.unsync_mask) {
            desynced = desynchronize(region);
            region = &desynced;
        }

        if flag(version.encrypted_mask) {
            // No decryption support: keep the payload uninterpreted so it
            // re-serializes byte-identical.
            warn!("frame {}: encrypted payload left uninterpreted", header.id);
            let mut frame = Frame::unknown(header.id, region.to_vec());
            frame.kind = def.kind;
            frame.encrypted = true;
            frame.tag_alter_discard = flag(version.tag_alter_mask);
            frame.file_alter_discard = flag(version.file_alter_mask);
            frame.read_only = flag(version.read_only_mask);
            return Ok(frame);
        }

        let mut pos = 0usize;
        let mut group_symbol = None;
        if flag(version.grouping_mask) {
            if pos < region.len() {
                group_symbol = Some(region[pos]);
                pos += 1;
            } else {
                warn!("frame {}: grouping flag set but no symbol byte", header.id);
            }
        }

        let compressed = flag(version.compressed_mask);
        let mut expanded = None;
        if compressed {
            if region.len() < pos + 4 {
                return Err(TagError::Truncated {
                    needed: pos + 4,
                    available: region.len(),
                });
            }
            expanded = Some(u32::from_be_bytes(region[pos..pos + 4].try_into().unwrap()) as usize);
            pos += 4;
        }

        // With compression the field walk moves into the decompressed
        // scratch buffer; otherwise it continues over the wire bytes.
        let inflated;
        let body: &[u8] = if let Some(expected) = expanded {
            let mut decoder = ZlibDecoder::new(&region[pos..]);
            let mut out = Vec::with_capacity(expected);
            decoder.read_to_end(&mut out)?;
            if out.len() != expected {
                return Err(TagError::BadExpandedLength {
                    expected,
                    actual: out.len(),
                });
            }
            inflated = out;
            &inflated
        } else {
            &region[pos..]
        };

        let class = def.class_for(version);
        let mut fields = Vec::with_capacity(class.fields().len());
        let mut encoding = TextEncoding::default();
        let mut at = 0usize;
        for &kind in class.fields() {
            let field = Field::read(kind, body, &mut at, encoding);
            if kind == FieldKind::TextEncoding {
                if let Some(&byte) = field.data().first() {
                    encoding = TextEncoding::from_byte(byte)?;
                }
            }
            fields.push(field);
        }

        Ok(Frame {
            id: header.id,
            kind: def.kind,
            class,
            fields,
            group_symbol,
            compressed,
            encrypted: false,
            tag_alter_discard: flag(version.tag_alter_mask),
            file_alter_discard: flag(version.file_alter_mask),
            read_only: flag(version.read_only_mask),
        })
    }

    /// Total field-data length implied by the current field contents.
    /// Recomputed on every write; never cached across mutations.
    pub fn payload_len(&self) -> usize {
        let mut encoding = TextEncoding::default();
        let mut total = 0;
        for field in &self.fields {
            if field.kind() == FieldKind::TextEncoding {
                if let Some(&byte) = field.data().first() {
                    if let Ok(declared) = TextEncoding::from_byte(byte) {
                        encoding = declared;
                    }
                }
            }
            total += field.encoded_len(encoding);
        }
        total
    }

    fn write_fields(&self, out: &mut Vec<u8>) {
        let mut encoding = TextEncoding::default();
        for field in &self.fields {
            if field.kind() == FieldKind::TextEncoding {
                if let Some(&byte) = field.data().first() {
                    if let Ok(declared) = TextEncoding::from_byte(byte) {
                        encoding = declared;
                    }
                }
            }
            field.write_to(out, encoding);
        }
    }

    fn compose_flags(&self, version: &FormatVersion) -> u16 {
        let mut flags = 0u16;
        let mut set = |mask: u16, on: bool| {
            if on {
                flags |= mask;
            }
        };
        set(version.tag_alter_mask, self.tag_alter_discard);
        set(version.file_alter_mask, self.file_alter_discard);
        set(version.read_only_mask, self.read_only);
        set(version.compressed_mask, self.compressed);
        set(version.encrypted_mask, self.encrypted);
        set(version.grouping_mask, self.group_symbol.is_some());
        flags
    }

    /// Serializes the frame and returns the total bytes written (header
    /// included). The declared size is computed bottom-up from the current
    /// field contents; a disagreement between that computation and the
    /// bytes actually emitted is a codec bug and aborts the write.
    pub fn write_to(&self, buf: &mut Vec<u8>, version: &FormatVersion) -> TagResult<usize> {
        if self.id.is_empty() || self.id.len() != version.id_len {
            // Cross-version identifier translation is deliberately not
            // attempted here.
            return Err(TagError::BadIdentifier {
                id: self.id.to_string(),
                major: version.major,
            });
        }
        if self.compressed && !version.supports_compression {
            return Err(TagError::Unsupported {
                op: "frame compression",
                major: version.major,
            });
        }
        if self.group_symbol.is_some() && version.grouping_mask == 0 {
            return Err(TagError::Unsupported {
                op: "frame grouping",
                major: version.major,
            });
        }

        let computed = self.payload_len();
        let mut payload = Vec::with_capacity(computed);
        self.write_fields(&mut payload);
        if payload.len() != computed {
            return Err(TagError::LengthMismatch {
                computed,
                written: payload.len(),
            });
        }

        // Deflate after sizing: the uncompressed length travels as the
        // expanded-length side value, the compressed length goes on disk.
        let mut expanded = None;
        if self.compressed {
            expanded = Some(payload.len() as u32);
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&payload)?;
            payload = encoder.finish()?;
        }

        let start = buf.len();
        let extra = self.group_symbol.map_or(0, |_| 1) + expanded.map_or(0, |_| 4);
        buf.extend_from_slice(self.id.as_bytes());
        write_size(version, (extra + payload.len()) as u32, buf)?;
        if version.has_frame_flags {
            buf.extend_from_slice(&self.compose_flags(version).to_be_bytes());
        }
        if let Some(symbol) = self.group_symbol {
            buf.push(symbol);
        }
        if let Some(expanded) = expanded {
            buf.extend_from_slice(&expanded.to_be_bytes());
        }
        buf.extend_from_slice(&payload);
        Ok(buf.len() - start)
    }
}

// A freshly built frame must already be structurally valid on disk: the
// fixed-width fields get their zero values (Latin-1, empty language).
fn default_field(kind: FieldKind) -> Field {
    match kind {
        FieldKind::TextEncoding | FieldKind::PicType => Field::new(kind, vec![0]),
        FieldKind::Language | FieldKind::ImageFormat => Field::new(kind, vec![0; 3]),
        _ => Field::empty(kind),
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Frame");
        dbg.field("id", &self.id.as_str())
            .field("kind", &self.kind)
            .field("class", &self.class)
            .field("fields", &self.fields);
        if let Some(symbol) = self.group_symbol {
            dbg.field("group_symbol", &symbol);
        }
        if self.compressed {
            dbg.field("compressed", &self.compressed);
        }
        dbg.finish()
    }
}
