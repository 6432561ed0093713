//! The container walker: parses a size-bounded region into an ordered
//! sequence of typed child nodes and serializes the mirror image, sizing
//! every container bottom-up.

use tracing::warn;

use crate::error::{TagError, TagResult};
use crate::frame::{Frame, FrameHeader};
use crate::registry::{self, FrameClass, TagID};
use crate::synch::write_size;
use crate::version::FormatVersion;

// `TagNode` is the closed set of node shapes the walker can produce: a leaf
// frame, or one of the two container frames that embed child nodes of their
// own. Dispatch is by match on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum TagNode {
    Frame(Frame),
    Chapter(ChapterFrame),
    Toc(TocFrame),
}

impl TagNode {
    pub fn id(&self) -> TagID {
        match self {
            TagNode::Frame(frame) => frame.id(),
            TagNode::Chapter(_) => TagID::from_bytes(b"CHAP"),
            TagNode::Toc(_) => TagID::from_bytes(b"CTOC"),
        }
    }

    pub fn as_frame(&self) -> Option<&Frame> {
        match self {
            TagNode::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn as_frame_mut(&mut self) -> Option<&mut Frame> {
        match self {
            TagNode::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    /// Reads one node starting at `data[0]`. `Ok(None)` means the walker
    /// ran into padding. On success the consumed count is exactly the
    /// header length plus the declared size.
    pub fn read(data: &[u8], version: &FormatVersion) -> TagResult<Option<(TagNode, usize)>> {
        let Some(header) = FrameHeader::read(data, version)? else {
            return Ok(None);
        };
        let end = header.header_len + header.declared;
        if end > data.len() {
            return Err(TagError::BoxBounds {
                id: header.id.to_string(),
                declared: header.declared,
                available: data.len() - header.header_len,
            });
        }
        let region = &data[header.header_len..end];
        let def = registry::resolve(version, header.id);
        let node = match def.class_for(version) {
            FrameClass::Chapter => TagNode::Chapter(ChapterFrame::read_body(region, version)?),
            FrameClass::TableOfContents => TagNode::Toc(TocFrame::read_body(region, version)?),
            _ => TagNode::Frame(Frame::read_body(&header, region, version, def)?),
        };
        Ok(Some((node, end)))
    }

    pub fn write_to(&self, buf: &mut Vec<u8>, version: &FormatVersion) -> TagResult<usize> {
        match self {
            TagNode::Frame(frame) => frame.write_to(buf, version),
            TagNode::Chapter(chapter) => chapter.write_to(buf, version),
            TagNode::Toc(toc) => toc.write_to(buf, version),
        }
    }
}

/// Walks a size-bounded region into its ordered children, advancing by
/// exactly the consumed byte count of each node. A child whose declared
/// size overruns the region is a boundary violation, not something to
/// silently correct.
pub fn parse_region(data: &[u8], version: &FormatVersion) -> TagResult<Vec<TagNode>> {
    let mut nodes = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let Some((node, consumed)) = TagNode::read(&data[offset..], version)? else {
            break; // padding runs to the end of the region
        };
        nodes.push(node);
        offset += consumed;
    }
    Ok(nodes)
}

/// Serializes `nodes` back to back and returns the bytes written.
pub fn write_region(nodes: &[TagNode], buf: &mut Vec<u8>, version: &FormatVersion) -> TagResult<usize> {
    let start = buf.len();
    for node in nodes {
        node.write_to(buf, version)?;
    }
    Ok(buf.len() - start)
}

// Chapter frames carry a timed range plus their own embedded child frames,
// which makes them the container case of the walker: parsing recurses into
// the remainder of the region, and sizing sums the serialized children.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterFrame {
    pub element_id: String,
    pub start_ms: u32,
    pub end_ms: u32,
    /// Byte offsets into the audio stream; `0xFFFFFFFF` when unused.
    pub start_offset: u32,
    pub end_offset: u32,
    pub children: Vec<TagNode>,
}

impl ChapterFrame {
    pub fn new(element_id: &str) -> ChapterFrame {
        ChapterFrame {
            element_id: element_id.to_string(),
            start_ms: 0,
            end_ms: 0,
            start_offset: u32::MAX,
            end_offset: u32::MAX,
            children: Vec::new(),
        }
    }

    fn read_body(region: &[u8], version: &FormatVersion) -> TagResult<ChapterFrame> {
        let (element_id, mut pos) = read_latin1_nul(region);
        if region.len() < pos + 16 {
            return Err(TagError::Truncated {
                needed: pos + 16,
                available: region.len(),
            });
        }
        let word = |at: usize| u32::from_be_bytes(region[at..at + 4].try_into().unwrap());
        let (start_ms, end_ms) = (word(pos), word(pos + 4));
        let (start_offset, end_offset) = (word(pos + 8), word(pos + 12));
        pos += 16;
        let children = parse_region(&region[pos..], version)?;
        Ok(ChapterFrame {
            element_id,
            start_ms,
            end_ms,
            start_offset,
            end_offset,
            children,
        })
    }

    pub fn write_to(&self, buf: &mut Vec<u8>, version: &FormatVersion) -> TagResult<usize> {
        if !version.has_frame_flags {
            return Err(TagError::Unsupported {
                op: "chapter frames",
                major: version.major,
            });
        }
        // Children first: the declared size can only be known bottom-up.
        let mut payload = Vec::new();
        write_latin1_nul(&self.element_id, &mut payload);
        for value in [self.start_ms, self.end_ms, self.start_offset, self.end_offset] {
            payload.extend_from_slice(&value.to_be_bytes());
        }
        write_region(&self.children, &mut payload, version)?;
        write_node_header(b"CHAP", &payload, buf, version)
    }
}

/// Table-of-contents frame: the ordered list of element identifiers it
/// points at, plus optional embedded child frames (typically a title).
#[derive(Debug, Clone, PartialEq)]
pub struct TocFrame {
    pub element_id: String,
    pub top_level: bool,
    pub ordered: bool,
    pub entries: Vec<String>,
    pub children: Vec<TagNode>,
}

const TOC_FLAG_TOP_LEVEL: u8 = 0x02;
const TOC_FLAG_ORDERED: u8 = 0x01;

impl TocFrame {
    pub fn new(element_id: &str) -> TocFrame {
        TocFrame {
            element_id: element_id.to_string(),
            top_level: true,
            ordered: true,
            entries: Vec::new(),
            children: Vec::new(),
        }
    }

    fn read_body(region: &[u8], version: &FormatVersion) -> TagResult<TocFrame> {
        let (element_id, mut pos) = read_latin1_nul(region);
        if region.len() < pos + 2 {
            return Err(TagError::Truncated {
                needed: pos + 2,
                available: region.len(),
            });
        }
        let flags = region[pos];
        let count = region[pos + 1] as usize;
        pos += 2;

        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            if pos >= region.len() {
                warn!("table of contents lists more entries than the frame holds");
                break;
            }
            let (entry, used) = read_latin1_nul(&region[pos..]);
            entries.push(entry);
            pos += used;
        }

        let children = parse_region(&region[pos..], version)?;
        Ok(TocFrame {
            element_id,
            top_level: flags & TOC_FLAG_TOP_LEVEL != 0,
            ordered: flags & TOC_FLAG_ORDERED != 0,
            entries,
            children,
        })
    }

    pub fn write_to(&self, buf: &mut Vec<u8>, version: &FormatVersion) -> TagResult<usize> {
        if !version.has_frame_flags {
            return Err(TagError::Unsupported {
                op: "table-of-contents frames",
                major: version.major,
            });
        }
        if self.entries.len() > u8::MAX as usize {
            return Err(TagError::SizeOutOfRange {
                value: self.entries.len() as u32,
                bits: 8,
            });
        }
        let mut payload = Vec::new();
        write_latin1_nul(&self.element_id, &mut payload);
        let mut flags = 0u8;
        if self.top_level {
            flags |= TOC_FLAG_TOP_LEVEL;
        }
        if self.ordered {
            flags |= TOC_FLAG_ORDERED;
        }
        payload.push(flags);
        payload.push(self.entries.len() as u8);
        for entry in &self.entries {
            write_latin1_nul(entry, &mut payload);
        }
        write_region(&self.children, &mut payload, version)?;
        write_node_header(b"CTOC", &payload, buf, version)
    }
}

/// Writes one container frame: header, declared size, zero flags, then the
/// already-serialized payload. The emitted byte count must match the
/// payload exactly or the write aborts as a codec bug.
fn write_node_header(
    id: &[u8; 4],
    payload: &[u8],
    buf: &mut Vec<u8>,
    version: &FormatVersion,
) -> TagResult<usize> {
    let start = buf.len();
    buf.extend_from_slice(id);
    write_size(version, payload.len() as u32, buf)?;
    buf.extend_from_slice(&0u16.to_be_bytes());
    let before_payload = buf.len();
    buf.extend_from_slice(payload);
    if buf.len() - before_payload != payload.len() {
        return Err(TagError::LengthMismatch {
            computed: payload.len(),
            written: buf.len() - before_payload,
        });
    }
    Ok(buf.len() - start)
}

fn read_latin1_nul(data: &[u8]) -> (String, usize) {
    match data.iter().position(|&b| b == 0) {
        Some(at) => (data[..at].iter().map(|&b| b as char).collect(), at + 1),
        None => (data.iter().map(|&b| b as char).collect(), data.len()),
    }
}

fn write_latin1_nul(text: &str, buf: &mut Vec<u8>) {
    buf.extend(text.chars().map(|c| if (c as u32) < 0x100 { c as u8 } else { b'?' }));
    buf.push(0);
}
