//! Text transcoder: UTF-16 frame text → legacy target encoding.
//!
//! # Correction loop
//! When the working text cannot be encoded, every failing character
//! position is collected and a suggestion is built by transliterating just
//! those characters to ASCII (or `_` when no approximation exists).  The
//! [`CorrectionPolicy`] then either accepts the suggestion outright or asks
//! a [`Prompter`].  A reply that still fails to encode becomes the new
//! working text and the loop repeats.
//!
//! # Cache
//! Accepted substitutions are stored in the run-scoped [`CorrectionCache`]
//! keyed on the original decoded text, so the same string is never
//! prompted for twice in one run.

pub mod encoding;
pub mod transliterate;

use std::collections::HashMap;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::frame::{FrameId, SourceEncoding};
pub use encoding::{EncodeFailure, TargetEncoding};
pub use transliterate::{Deunicode, Transliterator};

/// Substitute used when transliteration finds nothing better.
pub const PLACEHOLDER: &str = "_";

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Cannot decode <{frame}> as {attempt}: raw payload {}", hex::encode_upper(.raw))]
    Decode {
        frame: FrameId,
        attempt: &'static str,
        raw: Vec<u8>,
    },
    #[error(
        "Unexpected {target} encoding error on <{frame}>: {reason} (raw {}, decoded {text:?})",
        hex::encode_upper(.raw)
    )]
    UnexpectedEncode {
        frame: FrameId,
        target: TargetEncoding,
        reason: String,
        raw: Vec<u8>,
        text: String,
    },
    #[error("Correction prompt failed: {0}")]
    Prompt(#[from] io::Error),
}

// ── CorrectionCache ──────────────────────────────────────────────────────────

/// Original decoded text → accepted replacement.  Append-only; lives for
/// one run and is never written to disk.
#[derive(Debug, Clone, Default)]
pub struct CorrectionCache {
    entries: HashMap<String, String>,
}

impl CorrectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.entries.get(original).map(String::as_str)
    }

    pub fn insert(&mut self, original: String, replacement: String) {
        self.entries.insert(original, replacement);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Conflict & policy ────────────────────────────────────────────────────────

/// A working text that the target encoding rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict<'a> {
    pub frame: FrameId,
    /// Text as decoded from the source frame.
    pub original: &'a str,
    /// Text that was just rejected (original, cached, or a previous reply).
    pub working: &'a str,
    /// Char indices in `working` that fail to encode.
    pub positions: Vec<usize>,
    pub suggestion: String,
}

/// Interactive side of the run: correction replies and overwrite decisions.
pub trait Prompter {
    /// Return replacement text for `conflict`; an empty reply accepts
    /// `conflict.suggestion`.
    fn correction(&mut self, conflict: &Conflict<'_>) -> io::Result<String>;

    /// Whether an existing file at `path` may be replaced.
    fn confirm_overwrite(&mut self, path: &Path) -> io::Result<bool>;
}

/// How encoding conflicts are resolved.
pub enum CorrectionPolicy<'p> {
    /// Accept every suggestion without asking.
    Automatic,
    Interactive(&'p mut dyn Prompter),
}

// ── Transcoder ───────────────────────────────────────────────────────────────

/// Produces encoding-valid payload bytes for retained frames.
pub struct Transcoder<'a> {
    pub target: TargetEncoding,
    cache: &'a mut CorrectionCache,
    transliterator: &'a dyn Transliterator,
}

/// Result of transcoding one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcoded {
    pub payload: Vec<u8>,
    /// The final text differs from the decoded text.
    pub corrected: bool,
}

impl<'a> Transcoder<'a> {
    pub fn new(
        target: TargetEncoding,
        cache: &'a mut CorrectionCache,
        transliterator: &'a dyn Transliterator,
    ) -> Self {
        Self { target, cache, transliterator }
    }

    /// Turn a source payload into the bytes to store.
    ///
    /// Latin-1 payloads pass through untouched.  UTF-16 payloads are
    /// re-encoded, resolving conflicts through `policy`.
    pub fn transcode(
        &mut self,
        frame: FrameId,
        raw: &[u8],
        decoded: &str,
        source: SourceEncoding,
        policy: &mut CorrectionPolicy<'_>,
    ) -> Result<Transcoded, TranscodeError> {
        if source != SourceEncoding::Utf16 {
            return Ok(Transcoded { payload: raw.to_vec(), corrected: false });
        }

        let mut working = self.cache.get(decoded).unwrap_or(decoded).to_owned();
        let mut corrected = working != decoded;

        loop {
            match self.target.encode_payload(&working) {
                Ok(payload) => {
                    if corrected {
                        self.cache.insert(decoded.to_owned(), working);
                    }
                    return Ok(Transcoded { payload, corrected });
                }
                Err(EncodeFailure::Unexpected(reason)) => {
                    return Err(self.unexpected(frame, raw, &working, reason));
                }
                Err(EncodeFailure::Unmappable(_)) => {}
            }

            let positions = self.failing_positions(frame, raw, &working)?;
            let suggestion = self.suggest(&working, &positions);
            let conflict = Conflict {
                frame,
                original: decoded,
                working: &working,
                positions,
                suggestion,
            };

            let reply = match policy {
                CorrectionPolicy::Automatic => {
                    info!(
                        frame = %frame,
                        positions = ?conflict.positions,
                        "Automatic correction accepted {:?} >>> {:?}",
                        decoded,
                        conflict.suggestion,
                    );
                    String::new()
                }
                CorrectionPolicy::Interactive(prompter) => {
                    warn!(
                        frame = %frame,
                        positions = ?conflict.positions,
                        "Encoding error; suggesting {:?} >>> {:?}",
                        decoded,
                        conflict.suggestion,
                    );
                    prompter.correction(&conflict)?.trim().to_owned()
                }
            };

            working = if reply.is_empty() { conflict.suggestion } else { reply };
            corrected = true;
        }
    }

    /// Char indices of `text` that the target encoding rejects.
    fn failing_positions(
        &self,
        frame: FrameId,
        raw: &[u8],
        text: &str,
    ) -> Result<Vec<usize>, TranscodeError> {
        let mut positions = Vec::new();
        let mut buf = [0u8; 4];
        for (i, c) in text.chars().enumerate() {
            match self.target.encode(c.encode_utf8(&mut buf)) {
                Ok(_) => {}
                Err(EncodeFailure::Unmappable(_)) => positions.push(i),
                Err(EncodeFailure::Unexpected(reason)) => {
                    return Err(self.unexpected(frame, raw, text, reason));
                }
            }
        }
        Ok(positions)
    }

    /// Replace each failing char with its ASCII approximation, or `_`.
    pub fn suggest(&self, text: &str, positions: &[usize]) -> String {
        let mut buf = [0u8; 4];
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                if !positions.contains(&i) {
                    return c.to_string();
                }
                let original = c.encode_utf8(&mut buf);
                let ascii = self.transliterator.to_ascii(original);
                if ascii.is_empty() || ascii == *original {
                    PLACEHOLDER.to_owned()
                } else {
                    ascii
                }
            })
            .collect()
    }

    fn unexpected(&self, frame: FrameId, raw: &[u8], text: &str, reason: String) -> TranscodeError {
        error!(
            frame = %frame,
            raw = %hex::encode_upper(raw),
            decoded = text,
            utf8 = %hex::encode_upper(text.as_bytes()),
            "FATAL ENCODING ERROR: {reason}",
        );
        TranscodeError::UnexpectedEncode {
            frame,
            target: self.target,
            reason,
            raw: raw.to_vec(),
            text: text.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted {
        replies: VecDeque<String>,
        asked: Vec<String>,
    }

    impl Scripted {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: replies.iter().map(|s| s.to_string()).collect(),
                asked: Vec::new(),
            }
        }
    }

    impl Prompter for Scripted {
        fn correction(&mut self, conflict: &Conflict<'_>) -> io::Result<String> {
            self.asked.push(conflict.working.to_owned());
            Ok(self.replies.pop_front().unwrap_or_default())
        }

        fn confirm_overwrite(&mut self, _: &Path) -> io::Result<bool> {
            Ok(false)
        }
    }

    fn tit2() -> FrameId {
        FrameId::parse(*b"TIT2").unwrap()
    }

    #[test]
    fn latin1_passes_through() {
        let mut cache = CorrectionCache::new();
        let mut t = Transcoder::new(TargetEncoding::ShiftJis, &mut cache, &Deunicode);
        let raw = b"\x00caf\xe9\x00";
        let out = t
            .transcode(tit2(), raw, "café", SourceEncoding::Latin1, &mut CorrectionPolicy::Automatic)
            .unwrap();
        assert_eq!(out.payload, raw.to_vec());
        assert!(!out.corrected);
    }

    #[test]
    fn clean_text_does_not_touch_cache() {
        let mut cache = CorrectionCache::new();
        let mut t = Transcoder::new(TargetEncoding::ShiftJis, &mut cache, &Deunicode);
        let out = t
            .transcode(tit2(), b"", "テスト", SourceEncoding::Utf16, &mut CorrectionPolicy::Automatic)
            .unwrap();
        assert_eq!(out.payload[0], 0x00);
        assert_eq!(*out.payload.last().unwrap(), 0x00);
        assert!(!out.corrected);
        assert!(cache.is_empty());
    }

    #[test]
    fn automatic_accepts_transliteration() {
        let mut cache = CorrectionCache::new();
        let mut t = Transcoder::new(TargetEncoding::ShiftJis, &mut cache, &Deunicode);
        let out = t
            .transcode(tit2(), b"", "café", SourceEncoding::Utf16, &mut CorrectionPolicy::Automatic)
            .unwrap();
        assert_eq!(out.payload, b"\x00cafe\x00");
        assert!(out.corrected);
        assert_eq!(cache.get("café"), Some("cafe"));
    }

    #[test]
    fn suggestion_only_touches_failing_positions() {
        let mut cache = CorrectionCache::new();
        let t = Transcoder::new(TargetEncoding::ShiftJis, &mut cache, &Deunicode);
        let positions = t.failing_positions(tit2(), b"", "Béla ア").unwrap();
        assert_eq!(positions, vec![1]);
        assert_eq!(t.suggest("Béla ア", &positions), "Bela ア");
    }

    #[test]
    fn placeholder_when_no_transliteration() {
        struct Nothing;
        impl Transliterator for Nothing {
            fn to_ascii(&self, text: &str) -> String {
                text.to_owned()
            }
        }
        let mut cache = CorrectionCache::new();
        let t = Transcoder::new(TargetEncoding::Latin1, &mut cache, &Nothing);
        assert_eq!(t.suggest("aアb", &[1]), "a_b");
    }

    #[test]
    fn interactive_empty_reply_accepts_suggestion() {
        let mut cache = CorrectionCache::new();
        let mut prompter = Scripted::new(&[""]);
        let mut t = Transcoder::new(TargetEncoding::ShiftJis, &mut cache, &Deunicode);
        let out = t
            .transcode(
                tit2(),
                b"",
                "naïve",
                SourceEncoding::Utf16,
                &mut CorrectionPolicy::Interactive(&mut prompter),
            )
            .unwrap();
        assert_eq!(out.payload, b"\x00naive\x00");
        assert_eq!(prompter.asked, vec!["naïve"]);
    }

    #[test]
    fn interactive_retries_until_reply_encodes() {
        let mut cache = CorrectionCache::new();
        let mut prompter = Scripted::new(&["Crème", "  Creme brulee "]);
        let mut t = Transcoder::new(TargetEncoding::ShiftJis, &mut cache, &Deunicode);
        let out = t
            .transcode(
                tit2(),
                b"",
                "Crème brûlée",
                SourceEncoding::Utf16,
                &mut CorrectionPolicy::Interactive(&mut prompter),
            )
            .unwrap();
        assert_eq!(out.payload, b"\x00Creme brulee\x00");
        assert_eq!(prompter.asked, vec!["Crème brûlée", "Crème"]);
        assert_eq!(cache.get("Crème brûlée"), Some("Creme brulee"));
    }

    #[test]
    fn cached_text_is_not_prompted_again() {
        let mut cache = CorrectionCache::new();
        let mut prompter = Scripted::new(&["Cafe X"]);
        {
            let mut t = Transcoder::new(TargetEncoding::ShiftJis, &mut cache, &Deunicode);
            let mut policy = CorrectionPolicy::Interactive(&mut prompter);
            let first = t
                .transcode(tit2(), b"", "café", SourceEncoding::Utf16, &mut policy)
                .unwrap();
            let second = t
                .transcode(tit2(), b"", "café", SourceEncoding::Utf16, &mut policy)
                .unwrap();
            assert_eq!(first, second);
            assert_eq!(second.payload, b"\x00Cafe X\x00");
            assert!(second.corrected);
        }
        assert_eq!(prompter.asked.len(), 1);
    }
}
