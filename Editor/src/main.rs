use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use tag_codec::{FrameKind, Tag, TagID, Timestamp};

#[derive(Parser, Debug)]
#[command(author, version, about = "tag-editor")]
struct Args {
    /// The media file whose tag block is inspected or rewritten
    file: PathBuf,
    /// Print every frame in the tag
    #[clap(short, long)]
    list: bool,
    /// Set the title
    #[clap(long)]
    title: Option<String>,
    /// Set the lead performer
    #[clap(long)]
    artist: Option<String>,
    /// Set the album
    #[clap(long)]
    album: Option<String>,
    /// Set the content type
    #[clap(long)]
    genre: Option<String>,
    /// Set the track number
    #[clap(long)]
    track: Option<String>,
    /// Set the recording date (`YYYY`, `YYYY-MM-DD`, ...)
    #[clap(long)]
    date: Option<String>,
    /// Drop all frames with this identifier (e.g. COMM); repeatable
    #[clap(long)]
    remove: Vec<String>,
    /// Zero bytes reserved after the last frame when rewriting
    #[clap(long, default_value_t = 1024)]
    padding: usize,
    /// Write the result here instead of editing in place
    #[clap(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::new();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let data = fs::read(&args.file)?;

    let (mut tag, audio_start) = if Tag::is_present(&data) {
        let block = Tag::block_len(&data)?;
        (Tag::read(&data)?, block)
    } else {
        info!("no tag block in {}; starting an empty major-4 tag", args.file.display());
        (Tag::new(4)?, 0)
    };

    let mut dirty = false;
    let text_edits = [
        (FrameKind::Title, &args.title),
        (FrameKind::Artist, &args.artist),
        (FrameKind::Album, &args.album),
        (FrameKind::Genre, &args.genre),
        (FrameKind::Track, &args.track),
    ];
    for (kind, value) in text_edits {
        if let Some(value) = value {
            tag.set_text(kind, value)?;
            dirty = true;
        }
    }

    if let Some(date) = &args.date {
        let stamp = Timestamp::parse(date)?;
        // Major 4 replaced the year frame with the full recording time.
        let kind = if tag.version.major == 4 {
            FrameKind::RecordingTime
        } else {
            FrameKind::Year
        };
        tag.set_text(kind, &stamp.to_string())?;
        dirty = true;
    }

    for raw in &args.remove {
        let id = TagID::parse(raw)?;
        let before = tag.nodes.len();
        tag.nodes.retain(|node| node.id() != id);
        if tag.nodes.len() == before {
            warn!("no {} frames to remove", id);
        } else {
            dirty = true;
        }
    }

    if args.list || !dirty {
        println!("{} frames under major version {}:\n", tag.nodes.len(), tag.version.major);
        for (i, node) in tag.nodes.iter().enumerate() {
            println!("Frame {}:\n{:#?}\n", i + 1, node);
        }
    }

    if dirty {
        let block = tag.write(args.padding)?;
        let mut out = Vec::with_capacity(block.len() + data.len() - audio_start);
        out.extend_from_slice(&block);
        out.extend_from_slice(&data[audio_start..]);
        let target = args.output.as_ref().unwrap_or(&args.file);
        fs::write(target, &out)?;
        info!(
            "wrote {} tag bytes + {} media bytes to {}",
            block.len(),
            data.len() - audio_start,
            target.display()
        );
    }

    Ok(())
}
