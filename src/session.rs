//! Run-level API — the primary embedding surface.
//!
//! ```no_run
//! use std::path::Path;
//! use zitrog::session::{RetroOptions, RetroSession};
//!
//! let mut session = RetroSession::new(RetroOptions {
//!     auto_correct: true,
//!     auto_overwrite: true,
//!     ..RetroOptions::default()
//! });
//! # struct Never;
//! # impl zitrog::Prompter for Never {
//! #     fn correction(&mut self, _: &zitrog::Conflict<'_>) -> std::io::Result<String> { Ok(String::new()) }
//! #     fn confirm_overwrite(&mut self, _: &std::path::Path) -> std::io::Result<bool> { Ok(true) }
//! # }
//! let report = session.process_file(Path::new("in/song.mp3"), Path::new("out"), &mut Never)?;
//! println!("{}", serde_json::to_string(&report)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::frame::FrameId;
use crate::reader::{read_container, PreservedFrames};
use crate::transcode::{
    CorrectionCache, CorrectionPolicy, Deunicode, Prompter, TargetEncoding, Transcoder,
    Transliterator,
};
use crate::writer::{write_container, OverwritePolicy, WriteOutcome};
use crate::RetroError;

/// Album, artist, album artist, copyright, disc, genre, title, track, year.
pub const DEFAULT_PRESERVED_TAGS: [&str; 9] = [
    "TALB", "TPE1", "TPE2", "TCOP", "TPOS", "TCON", "TIT2", "TRCK", "TYER",
];

// ── RetroOptions ─────────────────────────────────────────────────────────────

/// Configuration for [`RetroSession::new`].
#[derive(Debug, Clone)]
pub struct RetroOptions {
    pub preserved: PreservedFrames,
    pub target: TargetEncoding,
    /// Accept every suggested correction without prompting.
    pub auto_correct: bool,
    /// Replace existing output files without prompting.
    pub auto_overwrite: bool,
    /// Log raw payload bytes alongside decoded text.
    pub verbose: bool,
}

impl Default for RetroOptions {
    fn default() -> Self {
        Self {
            preserved: PreservedFrames::new(DEFAULT_PRESERVED_TAGS),
            target: TargetEncoding::default(),
            auto_correct: false,
            auto_overwrite: false,
            verbose: false,
        }
    }
}

// ── FileReport ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub id: FrameId,
    pub payload_len: usize,
    pub transcoded: bool,
    pub corrected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Written,
    Skipped,
}

/// Summary of one processed input, returned by [`RetroSession::process_file`].
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub outcome: Outcome,
    pub declared_size: u32,
    /// Size field of the written tag; absent when skipped.
    pub written_size: Option<u32>,
    pub frames: Vec<FrameReport>,
    pub dropped: Vec<FrameId>,
}

// ── RetroSession ─────────────────────────────────────────────────────────────

/// One run over any number of input files.  Owns the correction cache so
/// that a substitution accepted for one file is reused for the next.
pub struct RetroSession {
    options: RetroOptions,
    cache: CorrectionCache,
    transliterator: Box<dyn Transliterator>,
}

impl RetroSession {
    pub fn new(options: RetroOptions) -> Self {
        Self::with_transliterator(options, Box::new(Deunicode))
    }

    pub fn with_transliterator(options: RetroOptions, transliterator: Box<dyn Transliterator>) -> Self {
        Self {
            options,
            cache: CorrectionCache::new(),
            transliterator,
        }
    }

    pub fn cache(&self) -> &CorrectionCache {
        &self.cache
    }

    /// Re-encode `input` into `output_dir`.
    ///
    /// `prompter` is consulted only for the decisions the options leave
    /// open: corrections unless `auto_correct`, overwrites unless
    /// `auto_overwrite`.
    pub fn process_file(
        &mut self,
        input: &Path,
        output_dir: &Path,
        prompter: &mut dyn Prompter,
    ) -> Result<FileReport, RetroError> {
        info!(input = %input.display(), target = %self.options.target, "Processing");

        let container = {
            let mut transcoder =
                Transcoder::new(self.options.target, &mut self.cache, self.transliterator.as_ref());
            let mut policy = if self.options.auto_correct {
                CorrectionPolicy::Automatic
            } else {
                CorrectionPolicy::Interactive(&mut *prompter)
            };
            read_container(
                BufReader::new(File::open(input)?),
                &self.options.preserved,
                &mut transcoder,
                &mut policy,
                self.options.verbose,
            )?
        };

        let mut overwrite = if self.options.auto_overwrite {
            OverwritePolicy::Replace
        } else {
            OverwritePolicy::Ask(prompter)
        };
        let (output, outcome, written_size) =
            match write_container(&container, input, output_dir, &mut overwrite)? {
                WriteOutcome::Written { path, tag_size } => (path, Outcome::Written, Some(tag_size)),
                WriteOutcome::Skipped { path } => (path, Outcome::Skipped, None),
            };

        Ok(FileReport {
            input: input.to_owned(),
            output,
            outcome,
            declared_size: container.declared_size,
            written_size,
            frames: container
                .frames
                .iter()
                .map(|f| FrameReport {
                    id: f.id,
                    payload_len: f.payload.len(),
                    transcoded: f.was_transcoded,
                    corrected: f.was_corrected,
                })
                .collect(),
            dropped: container.dropped,
        })
    }
}
