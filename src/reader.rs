//! Tag parser.
//!
//! Reads the 10-byte header, then walks frame records until one carries an
//! identifier outside `[A-Z0-9]{4}` (padding, or the start of audio).
//! Frames not in the preserved set are skipped; the rest are decoded and
//! handed to the [`Transcoder`] so that every stored [`Frame`] is already
//! valid in the target encoding.

use std::collections::BTreeSet;
use std::io::{self, Read};
use tracing::{debug, error, info};

use crate::frame::{Frame, FrameHeader, FrameId, SourceEncoding, FRAME_FLAGS_SIZE};
use crate::header::{TagHeader, PREFIX_SIZE};
use crate::transcode::{CorrectionPolicy, TranscodeError, Transcoder};
use crate::RetroError;

/// A parsed tag, reduced to its retained frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// Header bytes preceding the size field, written back verbatim.
    pub header: [u8; PREFIX_SIZE],
    /// Tag size declared by the source header.
    pub declared_size: u32,
    /// Retained frames in on-disk order.
    pub frames: Vec<Frame>,
    /// Identifiers of frames dropped by the preservation filter.
    pub dropped: Vec<FrameId>,
    /// Absolute source offset where the audio payload begins.
    pub content_offset: u64,
}

/// Set of frame identifiers to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedFrames(BTreeSet<String>);

impl PreservedFrames {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    pub fn retains(&self, id: &FrameId) -> bool {
        self.0.contains(id.as_str())
    }
}

/// Parse a tag from `reader`, transcoding retained frames as they are read.
pub fn read_container<R: Read>(
    mut reader: R,
    preserved: &PreservedFrames,
    transcoder: &mut Transcoder<'_>,
    policy: &mut CorrectionPolicy<'_>,
    verbose: bool,
) -> Result<Container, RetroError> {
    let header = TagHeader::read(&mut reader)?;
    info!(
        header = %hex::encode_upper(header.prefix),
        size = header.size,
        "Reported size {:#X}",
        header.size,
    );

    let mut container = Container {
        header: header.prefix,
        declared_size: header.size,
        frames: Vec::new(),
        dropped: Vec::new(),
        content_offset: header.content_offset(),
    };

    let mut offset = crate::header::HEADER_SIZE as u64;
    loop {
        let record = match FrameHeader::read(&mut reader) {
            Ok(r) => r,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                debug!(offset, "End of file while reading next frame header");
                return Ok(container);
            }
            Err(e) => return Err(e.into()),
        };

        let Some(id) = FrameId::parse(record.id) else {
            debug!(offset, raw = %hex::encode_upper(record.id), "Invalid next frame header");
            return Ok(container);
        };

        let mut flags = [0u8; FRAME_FLAGS_SIZE];
        reader.read_exact(&mut flags)?;
        let mut raw = Vec::new();
        (&mut reader).take(u64::from(record.payload_len)).read_to_end(&mut raw)?;
        if raw.len() != record.payload_len as usize {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("frame {} declares {} payload bytes, {} available", id, record.payload_len, raw.len()),
            )
            .into());
        }
        let frame_offset = offset;
        offset += (crate::frame::FRAME_HEADER_SIZE + FRAME_FLAGS_SIZE) as u64
            + u64::from(record.payload_len);

        if !preserved.retains(&id) {
            debug!(offset = frame_offset, frame = %id, "Skipped frame");
            container.dropped.push(id);
            continue;
        }

        let source = SourceEncoding::of(&raw);
        let Some(decoded) = source.decode(&raw) else {
            error!(
                frame = %id,
                flags = %hex::encode_upper(flags),
                raw = %hex::encode_upper(&raw),
                "FATAL DECODING ERROR as {}",
                source.name(),
            );
            return Err(TranscodeError::Decode { frame: id, attempt: source.name(), raw }.into());
        };

        if verbose {
            info!(frame = %id, len = record.payload_len, flags = %hex::encode_upper(flags),
                  raw = %hex::encode_upper(&raw), "{decoded}");
        } else {
            info!(frame = %id, len = record.payload_len, flags = %hex::encode_upper(flags), "{decoded}");
        }

        let out = transcoder.transcode(id, &raw, &decoded, source, policy)?;
        debug!(
            frame = %id,
            payload = %hex::encode_upper(&out.payload),
            "{}",
            match source {
                SourceEncoding::Utf16 => "Re-encoded",
                SourceEncoding::Latin1 => "Passed through",
            },
        );

        container.frames.push(Frame {
            id,
            flags,
            payload: out.payload,
            was_transcoded: source == SourceEncoding::Utf16,
            was_corrected: out.corrected,
        });
    }
}
