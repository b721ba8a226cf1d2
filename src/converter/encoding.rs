//! Text decoding for the source CSV files.
//!
//! The files have been published as UTF-8, Big5 and GB-family encodings over
//! the years, with no charset marker. Candidates are tried strictly in order
//! and the first clean decode wins.

use encoding_rs::{BIG5, Encoding, GB18030, GBK, UTF_8};
use std::borrow::Cow;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decoders in the order they are tried
pub fn candidate_encodings() -> [&'static Encoding; 4] {
    [UTF_8, BIG5, GBK, GB18030]
}

/// Decode `bytes` with `encoding`, or `None` on any malformed sequence.
/// A UTF-8 byte order mark is stripped.
pub fn decode_strict<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Option<Cow<'a, str>> {
    let bytes = if encoding == UTF_8 { bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes) } else { bytes };
    encoding.decode_without_bom_handling_and_without_replacement(bytes)
}

/// UTF-8 decode that drops undecodable bytes instead of failing
pub fn decode_lossy(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let (text, _) = UTF_8.decode_without_bom_handling(bytes);
    text.chars().filter(|&c| c != char::REPLACEMENT_CHARACTER).collect()
}

/// Decoded text together with how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    /// `None` when the lossy fallback was used
    pub encoding: Option<&'static Encoding>,
}

impl DecodedText {
    pub fn label(&self) -> &'static str {
        self.encoding.map(|e| e.name()).unwrap_or("UTF-8 (lossy)")
    }
}

/// All decodings worth trying, in order: each strict candidate that decodes
/// cleanly, then the lossy fallback.
pub fn decode_attempts(bytes: &[u8]) -> impl Iterator<Item = DecodedText> + '_ {
    let strict = candidate_encodings().into_iter().filter_map(move |encoding| {
        decode_strict(bytes, encoding)
            .map(|text| DecodedText { text: text.into_owned(), encoding: Some(encoding) })
    });
    let lossy = std::iter::once_with(move || DecodedText { text: decode_lossy(bytes), encoding: None });
    strict.chain(lossy)
}

/// First successful decoding of `bytes`
pub fn decode_text(bytes: &[u8]) -> DecodedText {
    decode_attempts(bytes)
        .next()
        .unwrap_or_else(|| DecodedText { text: decode_lossy(bytes), encoding: None })
}
