//! The whole-tag codec: the 10-byte tag header, tag-level
//! unsynchronization, the extended header, padding and the frame region.

use tracing::debug;

use crate::container::{parse_region, write_region, TagNode};
use crate::encoding::TextEncoding;
use crate::error::{TagError, TagResult};
use crate::frame::Frame;
use crate::registry::FrameKind;
use crate::synch::{decode_synchsafe, desynchronize, encode_synchsafe};
use crate::version::FormatVersion;

/// Magic bytes opening a tag block.
pub const MAGIC: [u8; 3] = *b"ID3";
/// Fixed length of the tag header (and of the optional trailing footer).
pub const HEADER_LEN: usize = 10;

// Tag-level flag bits (header byte 5).
const FLAG_UNSYNC: u8 = 0x80;
const FLAG_EXTENDED: u8 = 0x40;
const FLAG_EXPERIMENTAL: u8 = 0x20;
const FLAG_FOOTER: u8 = 0x10;

/// A parsed tag: the major-version capability descriptor plus the ordered
/// frame tree. The on-disk size is recomputed from the frames on every
/// write; nothing from the original header is treated as authoritative.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub version: FormatVersion,
    pub experimental: bool,
    pub nodes: Vec<TagNode>,
}

impl Tag {
    pub fn new(major: u8) -> TagResult<Tag> {
        Ok(Tag {
            version: FormatVersion::new(major)?,
            experimental: false,
            nodes: Vec::new(),
        })
    }

    /// True when `data` opens with a tag header.
    pub fn is_present(data: &[u8]) -> bool {
        data.len() >= HEADER_LEN && data[..3] == MAGIC
    }

    /// Total on-disk length of the tag block at the start of `data`
    /// (header + body + optional footer), without parsing the body.
    pub fn block_len(data: &[u8]) -> TagResult<usize> {
        if !Tag::is_present(data) {
            return Err(TagError::BadHeader("missing ID3 magic"));
        }
        let size = decode_synchsafe([data[6], data[7], data[8], data[9]]) as usize;
        let footer = if data[5] & FLAG_FOOTER != 0 { HEADER_LEN } else { 0 };
        Ok(HEADER_LEN + size + footer)
    }

    /// Parses the tag block at the start of `data` into an object graph.
    pub fn read(data: &[u8]) -> TagResult<Tag> {
        if !Tag::is_present(data) {
            return Err(TagError::BadHeader("missing ID3 magic"));
        }
        let version = FormatVersion::new(data[3])?;
        // data[4] is the revision; revisions are read-compatible by contract.
        let flags = data[5];
        if version.major == 2 && flags & FLAG_EXTENDED != 0 {
            // Under major 2 this bit meant whole-tag compression, which has
            // no defined scheme.
            return Err(TagError::Unsupported { op: "tag compression", major: 2 });
        }
        let size = decode_synchsafe([data[6], data[7], data[8], data[9]]) as usize;
        if data.len() < HEADER_LEN + size {
            return Err(TagError::Truncated {
                needed: HEADER_LEN + size,
                available: data.len(),
            });
        }

        let mut body: &[u8] = &data[HEADER_LEN..HEADER_LEN + size];
        let desynced;
        if flags & FLAG_UNSYNC != 0 && version.major < 4 {
            // Majors 2/3 unsynchronize the whole frame region; major 4
            // marks individual frames instead.
            desynced = desynchronize(body);
            body = &desynced;
        }
        if flags & FLAG_EXTENDED != 0 {
            body = skip_extended_header(body, &version)?;
        }

        let nodes = parse_region(body, &version)?;
        debug!("parsed {} top-level frames under major {}", nodes.len(), version.major);
        Ok(Tag {
            version,
            experimental: flags & FLAG_EXPERIMENTAL != 0,
            nodes,
        })
    }

    /// Serializes the whole tag with `padding` zero bytes reserved after
    /// the last frame.
    pub fn write(&self, padding: usize) -> TagResult<Vec<u8>> {
        let mut body = Vec::new();
        write_region(&self.nodes, &mut body, &self.version)?;
        let size = body.len() + padding;

        let mut out = Vec::with_capacity(HEADER_LEN + size);
        out.extend_from_slice(&MAGIC);
        out.push(self.version.major);
        out.push(0); // revision
        let mut flags = 0u8;
        if self.experimental {
            flags |= FLAG_EXPERIMENTAL;
        }
        out.push(flags);
        out.extend_from_slice(&encode_synchsafe(size as u32)?);
        out.extend_from_slice(&body);
        out.resize(out.len() + padding, 0);
        Ok(out)
    }

    /// First leaf frame of `kind`, if any.
    pub fn frame(&self, kind: FrameKind) -> Option<&Frame> {
        self.nodes
            .iter()
            .filter_map(TagNode::as_frame)
            .find(|f| f.kind() == kind)
    }

    pub fn frame_mut(&mut self, kind: FrameKind) -> Option<&mut Frame> {
        self.nodes
            .iter_mut()
            .filter_map(TagNode::as_frame_mut)
            .find(|f| f.kind() == kind)
    }

    /// First decoded string of the first `kind` frame.
    pub fn text(&self, kind: FrameKind) -> Option<String> {
        let frame = self.frame(kind)?;
        frame.text(&self.version).ok()?.into_iter().next()
    }

    /// Sets (or creates) the text frame for `kind`. New frames pick UTF-8
    /// under major 4 and BOM-marked UTF-16 under the older majors.
    pub fn set_text(&mut self, kind: FrameKind, value: &str) -> TagResult<()> {
        let version = self.version;
        if let Some(frame) = self.frame_mut(kind) {
            frame.set_text(&[value.to_string()], &version);
            return Ok(());
        }
        let mut frame = Frame::new(kind, &version)?;
        let encoding = if version.major == 4 {
            TextEncoding::Utf8
        } else {
            TextEncoding::Utf16Bom
        };
        frame.set_encoding(encoding)?;
        frame.set_text(&[value.to_string()], &version);
        self.nodes.push(TagNode::Frame(frame));
        Ok(())
    }

    /// Drops every leaf frame of `kind`; returns how many went away.
    pub fn remove(&mut self, kind: FrameKind) -> usize {
        let before = self.nodes.len();
        self.nodes
            .retain(|node| node.as_frame().map_or(true, |f| f.kind() != kind));
        before - self.nodes.len()
    }
}

fn skip_extended_header<'a>(body: &'a [u8], version: &FormatVersion) -> TagResult<&'a [u8]> {
    if body.len() < 4 {
        return Err(TagError::BadHeader("extended header overruns tag body"));
    }
    // Major 3 counts the bytes after its plain 32-bit size field; major 4
    // counts the whole synch-safe-sized block.
    let skip = match version.major {
        3 => 4 + u32::from_be_bytes(body[0..4].try_into().unwrap()) as usize,
        _ => decode_synchsafe([body[0], body[1], body[2], body[3]]) as usize,
    };
    if skip < 4 || skip > body.len() {
        return Err(TagError::BadHeader("extended header overruns tag body"));
    }
    Ok(&body[skip..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_magic_is_required() {
        assert!(matches!(
            Tag::read(b"MP3junk-not-a-tag"),
            Err(TagError::BadHeader(_))
        ));
    }

    #[test]
    fn empty_tag_round_trips_with_padding() {
        let tag = Tag::new(4).unwrap();
        let bytes = tag.write(64).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 64);
        assert_eq!(Tag::block_len(&bytes).unwrap(), bytes.len());
        let back = Tag::read(&bytes).unwrap();
        assert!(back.nodes.is_empty());
        assert_eq!(back.version.major, 4);
    }

    #[test]
    fn set_text_creates_then_updates() {
        let mut tag = Tag::new(4).unwrap();
        tag.set_text(FrameKind::Title, "First").unwrap();
        tag.set_text(FrameKind::Title, "Second").unwrap();
        assert_eq!(tag.nodes.len(), 1);
        assert_eq!(tag.text(FrameKind::Title).as_deref(), Some("Second"));
    }

    #[test]
    fn remove_drops_only_the_kind() {
        let mut tag = Tag::new(3).unwrap();
        tag.set_text(FrameKind::Title, "A").unwrap();
        tag.set_text(FrameKind::Artist, "B").unwrap();
        assert_eq!(tag.remove(FrameKind::Title), 1);
        assert_eq!(tag.nodes.len(), 1);
        assert_eq!(tag.text(FrameKind::Artist).as_deref(), Some("B"));
    }
}
