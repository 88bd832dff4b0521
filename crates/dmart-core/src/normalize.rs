//! Text normalization shared by every natural key.
//!
//! Pipeline, in order:
//!   raw bytes
//!     └─ decode()          → UTF-8, invalid sequences dropped
//!          └─ lower-case
//!               └─ strip `"` `'` `\` `,`
//!                    └─ trim
//!                         └─ truncate() (optional) → `..` marker
//!
//! The result is a fixed point: normalizing an already-normalized string
//! returns it unchanged.

use std::borrow::Cow;

/// Appended to a value that was cut short.
pub const TRUNCATION_MARKER: &str = "..";

/// Characters removed from every normalized value.
pub const STRIPPED_CHARS: [char; 4] = ['"', '\'', '\\', ','];

// ─── Normalize ───────────────────────────────────────────────────────────────

/// Decode, lower-case, strip and trim. Length limits are applied by callers
/// with [`truncate`].
pub fn normalize(raw: impl AsRef<[u8]>) -> String {
  let lowered = decode(raw.as_ref()).to_lowercase();
  let stripped: String = lowered
    .chars()
    .filter(|c| !STRIPPED_CHARS.contains(c))
    .collect();
  stripped.trim().to_owned()
}

/// Normalize and map the empty string to `None`.
pub fn normalize_non_empty(raw: impl AsRef<[u8]>) -> Option<String> {
  Some(normalize(raw)).filter(|s| !s.is_empty())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Decode `raw` as UTF-8, dropping any invalid byte sequence.
pub fn decode(raw: &[u8]) -> String {
  let (text, _) = encoding_rs::UTF_8.decode_without_bom_handling(raw);
  text
    .chars()
    .filter(|&c| c != char::REPLACEMENT_CHARACTER)
    .collect()
}

/// Cut `text` to at most `max_chars` characters. When anything is removed the
/// kept prefix is followed by [`TRUNCATION_MARKER`], and the whole result is
/// still `max_chars` long. Limits too small to hold the marker just cut.
pub fn truncate(text: &str, max_chars: usize) -> Cow<'_, str> {
  if text.chars().count() <= max_chars {
    return Cow::Borrowed(text);
  }
  let marker_len = TRUNCATION_MARKER.chars().count();
  if max_chars <= marker_len {
    let cut: String = text.chars().take(max_chars).collect();
    return Cow::Owned(cut.trim_end().to_owned());
  }
  let mut cut: String = text.chars().take(max_chars - marker_len).collect();
  cut.push_str(TRUNCATION_MARKER);
  Cow::Owned(cut)
}
