/// Best-effort mapping of arbitrary text to its closest ASCII rendering.
pub trait Transliterator {
    /// Returns an ASCII approximation of `text`.  Characters with no known
    /// approximation may come back empty or unchanged.
    fn to_ascii(&self, text: &str) -> String;
}

/// Transliteration backed by the `deunicode` tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deunicode;

impl Transliterator for Deunicode {
    fn to_ascii(&self, text: &str) -> String {
        deunicode::deunicode_with_tofu(text, "")
    }
}
