use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use serde::Serialize;
use std::fmt;
use std::io::{self, Read, Write};

/// Length of a frame record header: identifier + big-endian payload length.
pub const FRAME_HEADER_SIZE: usize = 8;
pub const FRAME_FLAGS_SIZE: usize = 2;

/// Indicator byte announcing a UTF-16 payload.
pub const INDICATOR_UTF16: u8 = 0x01;

// ── FrameId ──────────────────────────────────────────────────────────────────

/// Four-character frame identifier, restricted to `[A-Z0-9]{4}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId([u8; 4]);

impl FrameId {
    /// Returns `None` when any byte is outside `A-Z` / `0-9`; that is the
    /// normal end-of-frames signal, not an error.
    pub fn parse(bytes: [u8; 4]) -> Option<Self> {
        bytes
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
            .then_some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Validated ASCII in `parse`.
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FrameId {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

// ── FrameHeader ──────────────────────────────────────────────────────────────

/// The 8-byte record preceding every frame's flags and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub id: [u8; 4],
    pub payload_len: u32,
}

impl FrameHeader {
    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut id = [0u8; 4];
        reader.read_exact(&mut id)?;
        Ok(Self {
            id,
            payload_len: reader.read_u32::<BigEndian>()?,
        })
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.id)?;
        writer.write_u32::<BigEndian>(self.payload_len)?;
        Ok(())
    }
}

// ── Frame ────────────────────────────────────────────────────────────────────

/// A retained frame whose payload is ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: FrameId,
    pub flags: [u8; FRAME_FLAGS_SIZE],
    pub payload: Vec<u8>,
    /// The source payload was UTF-16 and went through the transcoder.
    pub was_transcoded: bool,
    /// A substitution (cached or fresh) replaced the decoded text.
    pub was_corrected: bool,
}

impl Frame {
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let payload_len = u32::try_from(self.payload.len())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        FrameHeader { id: *self.id.as_bytes(), payload_len }.write(&mut writer)?;
        writer.write_all(&self.flags)?;
        writer.write_all(&self.payload)?;
        Ok(())
    }

    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_SIZE + FRAME_FLAGS_SIZE + self.payload.len()
    }
}

// ── Source text ──────────────────────────────────────────────────────────────

/// Encoding of a frame payload as announced by its indicator byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Latin1,
    Utf16,
}

impl SourceEncoding {
    pub fn of(payload: &[u8]) -> Self {
        match payload.first() {
            Some(&INDICATOR_UTF16) => SourceEncoding::Utf16,
            _ => SourceEncoding::Latin1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SourceEncoding::Latin1 => "ISO-8859-1",
            SourceEncoding::Utf16 => "UTF-16",
        }
    }

    fn delimiter_len(self) -> usize {
        match self {
            SourceEncoding::Latin1 => 1,
            SourceEncoding::Utf16 => 2,
        }
    }

    /// Payload bytes between the indicator byte and the trailing delimiter.
    pub fn body(self, payload: &[u8]) -> &[u8] {
        let end = payload.len().saturating_sub(self.delimiter_len());
        payload.get(1..end).unwrap_or(&[])
    }

    /// Decode the payload body.  `None` means the bytes are malformed.
    pub fn decode(self, payload: &[u8]) -> Option<String> {
        let body = self.body(payload);
        match self {
            SourceEncoding::Latin1 => Some(body.iter().map(|&b| char::from(b)).collect()),
            SourceEncoding::Utf16 => {
                let (encoding, bom_len) =
                    Encoding::for_bom(body).unwrap_or((UTF_16LE, 0));
                if encoding != UTF_16LE && encoding != UTF_16BE {
                    // A UTF-8 BOM is not a valid UTF-16 byte order mark.
                    return UTF_16LE
                        .decode_without_bom_handling_and_without_replacement(body)
                        .map(|s| s.into_owned());
                }
                encoding
                    .decode_without_bom_handling_and_without_replacement(&body[bom_len..])
                    .map(|s| s.into_owned())
            }
        }
    }
}
