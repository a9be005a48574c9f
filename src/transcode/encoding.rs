//! Legacy target encodings.
//!
//! Every transcoded payload is written as `indicator (0x00) | text | 0x00`.
//! Devices that predate Unicode tags read indicator 0 text in their local
//! code page, which is what makes the Shift_JIS target work.

use encoding_rs::{EncoderResult, SHIFT_JIS};
use std::fmt;

/// Indicator byte written in front of re-encoded text.
pub const TARGET_INDICATOR: u8 = 0x00;
/// Terminator written after re-encoded text.
pub const TARGET_DELIMITER: u8 = 0x00;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeFailure {
    /// The character has no mapping in the target encoding.
    Unmappable(char),
    /// Anything else the encoder reports.
    Unexpected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetEncoding {
    /// Double-byte legacy Japanese encoding.
    #[default]
    ShiftJis,
    /// Single-byte ISO-8859-1.
    Latin1,
}

impl TargetEncoding {
    pub fn name(self) -> &'static str {
        match self {
            TargetEncoding::ShiftJis => "shift-jis",
            TargetEncoding::Latin1 => "latin1",
        }
    }

    /// Parse from a CLI string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "shift-jis" | "sjis" | "shiftjis" => Some(TargetEncoding::ShiftJis),
            "latin1" | "latin-1" | "iso-8859-1" => Some(TargetEncoding::Latin1),
            _ => None,
        }
    }

    /// Encode `text` without any substitution.
    pub fn encode(self, text: &str) -> Result<Vec<u8>, EncodeFailure> {
        match self {
            TargetEncoding::ShiftJis => {
                let mut encoder = SHIFT_JIS.new_encoder();
                let capacity = encoder
                    .max_buffer_length_from_utf8_without_replacement(text.len())
                    .ok_or_else(|| EncodeFailure::Unexpected("output length overflow".into()))?;
                let mut out = Vec::with_capacity(capacity);
                let (result, _) =
                    encoder.encode_from_utf8_to_vec_without_replacement(text, &mut out, true);
                match result {
                    EncoderResult::InputEmpty => Ok(out),
                    EncoderResult::Unmappable(c) => Err(EncodeFailure::Unmappable(c)),
                    EncoderResult::OutputFull => {
                        Err(EncodeFailure::Unexpected("encoder output buffer full".into()))
                    }
                }
            }
            TargetEncoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).map_err(|_| EncodeFailure::Unmappable(c)))
                .collect(),
        }
    }

    /// Encode `text` wrapped with the target indicator and delimiter.
    pub fn encode_payload(self, text: &str) -> Result<Vec<u8>, EncodeFailure> {
        let body = self.encode(text)?;
        let mut payload = Vec::with_capacity(body.len() + 2);
        payload.push(TARGET_INDICATOR);
        payload.extend_from_slice(&body);
        payload.push(TARGET_DELIMITER);
        Ok(payload)
    }
}

impl fmt::Display for TargetEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_jis_encodes_kana_and_ascii() {
        let bytes = TargetEncoding::ShiftJis.encode("aア").unwrap();
        assert_eq!(bytes, vec![b'a', 0x83, 0x41]);
    }

    #[test]
    fn shift_jis_rejects_accented_latin() {
        assert_eq!(
            TargetEncoding::ShiftJis.encode("café"),
            Err(EncodeFailure::Unmappable('é'))
        );
    }

    #[test]
    fn latin1_range() {
        assert_eq!(TargetEncoding::Latin1.encode("café").unwrap(), b"caf\xe9");
        assert_eq!(
            TargetEncoding::Latin1.encode("ア"),
            Err(EncodeFailure::Unmappable('ア'))
        );
    }

    #[test]
    fn payload_is_wrapped() {
        let payload = TargetEncoding::ShiftJis.encode_payload("cafe").unwrap();
        assert_eq!(payload, b"\x00cafe\x00");
    }

    #[test]
    fn names_parse() {
        assert_eq!(TargetEncoding::from_name("Shift_JIS"), Some(TargetEncoding::ShiftJis));
        assert_eq!(TargetEncoding::from_name("ISO-8859-1"), Some(TargetEncoding::Latin1));
        assert_eq!(TargetEncoding::from_name("koi8-r"), None);
    }
}
