//! Round-trip and wire-layout tests for the frame codec and the container
//! walker.

use tag_codec::{
    ChapterFrame, FormatVersion, Frame, FrameKind, TagNode, TextEncoding, TocFrame, Tag, TagError,
    TagID,
};

fn read_one(data: &[u8], version: &FormatVersion) -> (TagNode, usize) {
    TagNode::read(data, version)
        .expect("node should parse")
        .expect("input should not be padding")
}

fn roundtrip(node: &TagNode, version: &FormatVersion) -> TagNode {
    let mut buf = Vec::new();
    let written = node.write_to(&mut buf, version).expect("node should serialize");
    assert_eq!(written, buf.len());
    let (back, consumed) = read_one(&buf, version);
    assert_eq!(consumed, buf.len());
    back
}

#[test]
fn v4_title_frame_has_the_documented_layout() {
    let v4 = FormatVersion::V4;
    let mut frame = Frame::new(FrameKind::Title, &v4).unwrap();
    frame.set_encoding(TextEncoding::Utf8).unwrap();
    frame.set_text(&["Title".to_string()], &v4);

    let mut buf = Vec::new();
    frame.write_to(&mut buf, &v4).unwrap();
    // identifier + synch-safe size 6 + flags 0x0000 + encoding byte + text,
    // no terminator on the absorbing text field.
    assert_eq!(
        buf,
        [
            b'T', b'I', b'T', b'2', 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x03, b'T', b'i', b't',
            b'l', b'e',
        ]
    );

    let (node, _) = read_one(&buf, &v4);
    let back = node.as_frame().unwrap();
    assert_eq!(back.text(&v4).unwrap(), vec!["Title".to_string()]);
}

#[test]
fn v3_comment_frame_round_trips_exactly() {
    let v3 = FormatVersion::V3;
    let mut frame = Frame::new(FrameKind::Comment, &v3).unwrap();
    frame.set_language("eng");
    frame.set_description("");
    frame.set_text(&["hello".to_string()], &v3);

    let mut buf = Vec::new();
    frame.write_to(&mut buf, &v3).unwrap();
    // encoding, 3-byte language, empty NUL-terminated description, text.
    assert_eq!(
        buf,
        [
            b'C', b'O', b'M', b'M', 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, b'e', b'n', b'g',
            0x00, b'h', b'e', b'l', b'l', b'o',
        ]
    );

    let node = roundtrip(&TagNode::Frame(frame.clone()), &v3);
    assert_eq!(node, TagNode::Frame(frame));
}

#[test]
fn unknown_identifier_round_trips_byte_identical() {
    let v4 = FormatVersion::V4;
    let mut original = Vec::new();
    original.extend_from_slice(b"XYZW");
    original.extend_from_slice(&[0x00, 0x00, 0x00, 0x04]);
    original.extend_from_slice(&[0x00, 0x00]);
    original.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

    let (node, consumed) = read_one(&original, &v4);
    assert_eq!(consumed, original.len());
    let frame = node.as_frame().unwrap();
    assert_eq!(frame.kind(), FrameKind::Unknown);
    assert_eq!(frame.binary(), [0xDE, 0xAD, 0xBE, 0xEF]);

    let mut rewritten = Vec::new();
    node.write_to(&mut rewritten, &v4).unwrap();
    assert_eq!(rewritten, original);
}

#[test]
fn compressed_frame_round_trips_under_major_three() {
    let v3 = FormatVersion::V3;
    let mut frame = Frame::new(FrameKind::Lyrics, &v3).unwrap();
    frame.set_language("eng");
    frame.set_description("verse");
    frame.set_text(&["la la la la la la la la la la".to_string()], &v3);
    frame.set_compressed(true, &v3).unwrap();

    let node = roundtrip(&TagNode::Frame(frame.clone()), &v3);
    let back = node.as_frame().unwrap();
    assert!(back.is_compressed());
    assert_eq!(node, TagNode::Frame(frame));
}

#[test]
fn compression_is_rejected_under_major_two() {
    let v2 = FormatVersion::V2;
    let mut frame = Frame::new(FrameKind::Title, &v2).unwrap();
    assert!(matches!(
        frame.set_compressed(true, &v2),
        Err(TagError::Unsupported { op: "frame compression", major: 2 })
    ));
}

#[test]
fn short_declared_length_degrades_to_empty_fields() {
    let v3 = FormatVersion::V3;
    // A comment frame whose declared size covers only the encoding byte and
    // one language byte: the remaining fields must come back empty, not as
    // an error.
    let mut data = Vec::new();
    data.extend_from_slice(b"COMM");
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x02]);
    data.extend_from_slice(&[0x00, 0x00]);
    data.extend_from_slice(&[0x00, b'e']);

    let (node, consumed) = read_one(&data, &v3);
    assert_eq!(consumed, data.len());
    let frame = node.as_frame().unwrap();
    assert_eq!(frame.language(), "");
    assert_eq!(frame.description().unwrap(), "");
    assert_eq!(frame.text(&v3).unwrap(), vec![String::new()]);
}

#[test]
fn declared_size_beyond_the_region_is_a_boundary_violation() {
    let v4 = FormatVersion::V4;
    let mut data = Vec::new();
    data.extend_from_slice(b"TIT2");
    data.extend_from_slice(&[0x00, 0x00, 0x01, 0x00]);
    data.extend_from_slice(&[0x00, 0x00, 0x03, b'x']);

    assert!(matches!(
        TagNode::read(&data, &v4),
        Err(TagError::BoxBounds { declared: 128, .. })
    ));
}

#[test]
fn grouping_symbol_travels_outside_the_field_data() {
    let v4 = FormatVersion::V4;
    let mut frame = Frame::new(FrameKind::Album, &v4).unwrap();
    frame.set_encoding(TextEncoding::Utf8).unwrap();
    frame.set_text(&["Abbey Road".to_string()], &v4);
    frame.set_group_symbol(Some(0x42), &v4).unwrap();

    let mut buf = Vec::new();
    frame.write_to(&mut buf, &v4).unwrap();
    // flags announce grouping, the symbol byte precedes the fields and the
    // declared size counts it.
    assert_eq!(&buf[8..10], [0x00, 0x40]);
    assert_eq!(buf[10], 0x42);

    let node = roundtrip(&TagNode::Frame(frame.clone()), &v4);
    assert_eq!(node.as_frame().unwrap().group_symbol(), Some(0x42));
    assert_eq!(node, TagNode::Frame(frame));
}

#[test]
fn unsynchronized_frame_is_materialized_and_the_flag_dropped() {
    let v4 = FormatVersion::V4;
    let payload = [0x00u8, 0xFF, 0xFF]; // Latin-1 "ÿÿ"
    let guarded = tag_codec::synch::synchronize(&payload);
    assert_eq!(guarded, [0x00, 0xFF, 0x00, 0xFF]);

    let mut data = Vec::new();
    data.extend_from_slice(b"TIT2");
    data.extend_from_slice(&[0x00, 0x00, 0x00, guarded.len() as u8]);
    data.extend_from_slice(&[0x00, 0x02]); // unsynchronized
    data.extend_from_slice(&guarded);

    let (node, consumed) = read_one(&data, &v4);
    assert_eq!(consumed, data.len());
    let frame = node.as_frame().unwrap();
    assert_eq!(frame.text(&v4).unwrap(), vec!["ÿÿ".to_string()]);

    // The in-memory graph is synchronized, so re-serialization writes the
    // raw payload and a clear flag field.
    let mut rewritten = Vec::new();
    node.write_to(&mut rewritten, &v4).unwrap();
    assert_eq!(
        rewritten,
        [
            b'T', b'I', b'T', b'2', 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0xFF, 0xFF,
        ]
    );
}

#[test]
fn multi_strings_split_per_version() {
    let v4 = FormatVersion::V4;
    let mut artist = Frame::new(FrameKind::Artist, &v4).unwrap();
    artist.set_encoding(TextEncoding::Utf8).unwrap();
    let parts = vec!["Lennon".to_string(), "McCartney".to_string()];
    artist.set_text(&parts, &v4);
    let node = roundtrip(&TagNode::Frame(artist), &v4);
    assert_eq!(node.as_frame().unwrap().text(&v4).unwrap(), parts);

    let v3 = FormatVersion::V3;
    let mut artist = Frame::new(FrameKind::Artist, &v3).unwrap();
    artist.set_text(&parts, &v3);
    let mut buf = Vec::new();
    artist.write_to(&mut buf, &v3).unwrap();
    assert!(buf.ends_with(b"Lennon/McCartney"));
    let (node, _) = read_one(&buf, &v3);
    assert_eq!(node.as_frame().unwrap().text(&v3).unwrap(), parts);
}

#[test]
fn pictures_use_the_composition_of_their_major() {
    let v3 = FormatVersion::V3;
    let mut picture = Frame::new(FrameKind::AttachedPicture, &v3).unwrap();
    picture.set_mime_type("image/png");
    picture.set_pic_type(3);
    picture.set_description("cover");
    picture.set_binary(vec![0x89, b'P', b'N', b'G', 0x00, 0xFF]);
    let node = roundtrip(&TagNode::Frame(picture.clone()), &v3);
    let back = node.as_frame().unwrap();
    assert_eq!(back.mime_type().unwrap(), "image/png");
    assert_eq!(back.pic_type(), Some(3));
    assert_eq!(node, TagNode::Frame(picture));

    let v2 = FormatVersion::V2;
    let mut legacy = Frame::new(FrameKind::AttachedPicture, &v2).unwrap();
    legacy.set_image_format("PNG");
    legacy.set_pic_type(3);
    legacy.set_binary(vec![1, 2, 3]);
    let node = roundtrip(&TagNode::Frame(legacy.clone()), &v2);
    assert_eq!(node.as_frame().unwrap().image_format(), "PNG");
    assert_eq!(node, TagNode::Frame(legacy));
}

#[test]
fn counters_and_file_ids_round_trip() {
    let v4 = FormatVersion::V4;
    let mut counter = Frame::new(FrameKind::PlayCounter, &v4).unwrap();
    counter.set_counter(300);
    let node = roundtrip(&TagNode::Frame(counter), &v4);
    assert_eq!(node.as_frame().unwrap().counter(), 300);

    let mut ufid = Frame::new(FrameKind::UniqueFileId, &v4).unwrap();
    ufid.set_owner("http://example.com");
    ufid.set_binary(vec![0xAA, 0x00, 0xBB]);
    let node = roundtrip(&TagNode::Frame(ufid.clone()), &v4);
    let back = node.as_frame().unwrap();
    assert_eq!(back.owner().unwrap(), "http://example.com");
    assert_eq!(back.binary(), [0xAA, 0x00, 0xBB]);
    assert_eq!(node, TagNode::Frame(ufid));
}

#[test]
fn chapters_nest_and_size_bottom_up() {
    let v4 = FormatVersion::V4;
    let mut title = Frame::new(FrameKind::Title, &v4).unwrap();
    title.set_encoding(TextEncoding::Utf8).unwrap();
    title.set_text(&["Intro".to_string()], &v4);

    let mut chapter = ChapterFrame::new("chp1");
    chapter.end_ms = 10_000;
    chapter.children.push(TagNode::Frame(title));

    let mut toc = TocFrame::new("toc");
    toc.entries.push("chp1".to_string());

    let chapter_node = roundtrip(&TagNode::Chapter(chapter.clone()), &v4);
    assert_eq!(chapter_node, TagNode::Chapter(chapter));
    let toc_node = roundtrip(&TagNode::Toc(toc.clone()), &v4);
    assert_eq!(toc_node, TagNode::Toc(toc));
}

#[test]
fn chapter_frames_do_not_exist_under_major_two() {
    let v2 = FormatVersion::V2;
    let chapter = ChapterFrame::new("chp1");
    let mut buf = Vec::new();
    assert!(matches!(
        TagNode::Chapter(chapter).write_to(&mut buf, &v2),
        Err(TagError::Unsupported { major: 2, .. })
    ));
}

#[test]
fn cross_version_identifiers_are_not_translated() {
    let v2 = FormatVersion::V2;
    let v4 = FormatVersion::V4;
    // A frame built for major 4 carries a 4-character identifier and must
    // refuse to serialize under major 2 rather than guess a translation.
    let frame = Frame::new(FrameKind::Title, &v4).unwrap();
    let mut buf = Vec::new();
    assert!(matches!(
        frame.write_to(&mut buf, &v2),
        Err(TagError::BadIdentifier { major: 2, .. })
    ));
}

#[test]
fn empty_identifier_never_serializes() {
    let v4 = FormatVersion::V4;
    let frame = Frame::unknown(TagID::EMPTY, vec![1, 2, 3]);
    let mut buf = Vec::new();
    assert!(matches!(
        frame.write_to(&mut buf, &v4),
        Err(TagError::BadIdentifier { .. })
    ));
}

#[test]
fn computed_length_matches_the_header_exactly() {
    let v4 = FormatVersion::V4;
    let mut frame = Frame::new(FrameKind::UserText, &v4).unwrap();
    frame.set_encoding(TextEncoding::Utf16Bom).unwrap();
    frame.set_description("mood");
    frame.set_text(&["calm".to_string()], &v4);

    let mut buf = Vec::new();
    let written = frame.write_to(&mut buf, &v4).unwrap();
    assert_eq!(written, v4.header_len + frame.payload_len());
    let declared = u32::from_be_bytes(buf[4..8].try_into().unwrap());
    assert_eq!(declared as usize, frame.payload_len());
}

#[test]
fn whole_tag_round_trips_with_padding() {
    let mut tag = Tag::new(4).unwrap();
    tag.set_text(FrameKind::Title, "Paranoid Android").unwrap();
    tag.set_text(FrameKind::Artist, "Radiohead").unwrap();
    tag.set_text(FrameKind::Album, "OK Computer").unwrap();

    let bytes = tag.write(256).unwrap();
    assert_eq!(Tag::block_len(&bytes).unwrap(), bytes.len());

    let back = Tag::read(&bytes).unwrap();
    assert_eq!(back, tag);
    assert_eq!(back.text(FrameKind::Title).as_deref(), Some("Paranoid Android"));
}

#[test]
fn tag_level_unsynchronization_applies_to_older_majors() {
    // Build a major-3 tag whose body contains 0xFF bytes, then guard the
    // whole body and set the tag-level unsynchronization flag.
    let v3 = FormatVersion::V3;
    let mut frame = Frame::new(FrameKind::Title, &v3).unwrap();
    frame.set_text(&["ÿa".to_string()], &v3);
    let mut body = Vec::new();
    frame.write_to(&mut body, &v3).unwrap();
    let guarded = tag_codec::synch::synchronize(&body);
    assert_ne!(guarded, body);

    let mut data = Vec::new();
    data.extend_from_slice(b"ID3");
    data.push(3);
    data.push(0);
    data.push(0x80); // unsynchronized
    data.extend_from_slice(&tag_codec::synch::encode_synchsafe(guarded.len() as u32).unwrap());
    data.extend_from_slice(&guarded);

    let tag = Tag::read(&data).unwrap();
    assert_eq!(tag.text(FrameKind::Title).as_deref(), Some("ÿa"));
}
