//! Tag writer.
//!
//! Output layout:
//!
//! ```text
//! header prefix (6 B) | synchsafe size (4 B) | frames | 32 B zero padding | audio
//! ```
//!
//! The audio is copied byte-for-byte from the source file starting at
//! [`Container::content_offset`].  Everything is written into a temporary
//! file next to the destination and renamed into place once complete, so an
//! interrupted run never leaves a truncated file under the final name.

use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::header::TagHeader;
use crate::reader::Container;
use crate::synchsafe;
use crate::transcode::Prompter;
use crate::RetroError;

/// Zero bytes appended after the last frame.
pub const PADDING_SIZE: usize = 32;

/// What to do when the destination already exists.
pub enum OverwritePolicy<'p> {
    /// Replace without asking.
    Replace,
    Ask(&'p mut dyn Prompter),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written { path: PathBuf, tag_size: u32 },
    /// The destination existed and the overwrite was declined.
    Skipped { path: PathBuf },
}

/// Destination path: `output_dir` joined with the input's file name.
pub fn output_path(input: &Path, output_dir: &Path) -> io::Result<PathBuf> {
    let name = input.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Input path has no file name: {}", input.display()),
        )
    })?;
    Ok(output_dir.join(name))
}

/// Serialise retained frames followed by the zero padding.
pub fn assemble_frames(container: &Container) -> io::Result<Vec<u8>> {
    let len = container.frames.iter().map(|f| f.encoded_len()).sum::<usize>() + PADDING_SIZE;
    let mut block = Vec::with_capacity(len);
    for frame in &container.frames {
        frame.write(&mut block)?;
    }
    block.resize(len, 0);
    Ok(block)
}

/// Write `container` plus the source audio into `output_dir`.
pub fn write_container(
    container: &Container,
    input: &Path,
    output_dir: &Path,
    overwrite: &mut OverwritePolicy<'_>,
) -> Result<WriteOutcome, RetroError> {
    let path = output_path(input, output_dir)?;
    info!(path = %path.display(), "Output path");

    fs::create_dir_all(output_dir)?;
    if path.is_file() {
        if let OverwritePolicy::Ask(prompter) = overwrite {
            if !prompter.confirm_overwrite(&path)? {
                warn!(path = %path.display(), "File exists; skipped");
                return Ok(WriteOutcome::Skipped { path });
            }
        }
    }

    let block = assemble_frames(container)?;
    for frame in &container.frames {
        info!(
            frame = %frame.id,
            len = frame.payload.len(),
            transcoded = frame.was_transcoded,
            corrected = frame.was_corrected,
            "Writing frame"
        );
    }
    let tag_size = synchsafe::encode(block.len() as u64)?;
    let header = TagHeader {
        prefix: container.header,
        size: synchsafe::decode(tag_size),
    };

    let mut source = File::open(input)?;
    source.seek(SeekFrom::Start(container.content_offset))?;

    let tmp = NamedTempFile::new_in(output_dir)?;
    // The temp file is created owner-only; the output takes the source's mode.
    fs::set_permissions(tmp.path(), source.metadata()?.permissions())?;
    {
        let mut out = BufWriter::new(tmp.as_file());
        header.write(&mut out)?;
        out.write_all(&block)?;
        let audio = io::copy(&mut source, &mut out)?;
        out.flush()?;
        info!(frames = container.frames.len(), tag_size = header.size, audio, "Assembled output");
    }
    tmp.as_file().sync_all()?;
    tmp.persist(&path).map_err(|e| RetroError::Io(e.error))?;

    Ok(WriteOutcome::Written { path, tag_size: header.size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, FrameId};

    #[test]
    fn frames_are_laid_out_in_order_with_padding() {
        let container = Container {
            header: *b"ID3\x03\x00\x00",
            declared_size: 0,
            frames: vec![
                Frame {
                    id: FrameId::parse(*b"TIT2").unwrap(),
                    flags: [0x00, 0x40],
                    payload: b"\x00A\x00".to_vec(),
                    was_transcoded: false,
                    was_corrected: false,
                },
                Frame {
                    id: FrameId::parse(*b"TRCK").unwrap(),
                    flags: [0, 0],
                    payload: b"\x001\x00".to_vec(),
                    was_transcoded: true,
                    was_corrected: false,
                },
            ],
            dropped: Vec::new(),
            content_offset: 10,
        };
        let block = assemble_frames(&container).unwrap();
        assert_eq!(block.len(), 13 + 13 + PADDING_SIZE);
        assert_eq!(&block[..13], b"TIT2\x00\x00\x00\x03\x00\x40\x00A\x00");
        assert_eq!(&block[13..17], b"TRCK");
        assert!(block[26..].iter().all(|&b| b == 0));
    }

    #[test]
    fn output_keeps_file_name() {
        let p = output_path(Path::new("/music/in/track 01.mp3"), Path::new("/out")).unwrap();
        assert_eq!(p, Path::new("/out/track 01.mp3"));
        assert!(output_path(Path::new("/"), Path::new("/out")).is_err());
    }
}
