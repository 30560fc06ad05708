//! Normalized plain text: the output of extraction and the input of segmentation.

use serde::Serialize;

/// Whitespace-collapsed, markup-free text in source order.
///
/// Only constructible through [`NormalizedText::clean`], so every value has been through the
/// line/fragment cleaning rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    /// Apply the cleaning rule to raw concatenated text:
    ///
    /// - split on line boundaries and trim each line
    /// - split each line on two-space runs and trim each fragment
    /// - drop empty fragments and rejoin with a single space
    pub fn clean(raw: &str) -> Self {
        let mut out = String::with_capacity(raw.len());
        for line in raw.split(is_line_boundary) {
            for fragment in line.trim().split("  ") {
                let fragment = fragment.trim();
                if fragment.is_empty() {
                    continue;
                }
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(fragment);
            }
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }

    /// First `max_chars` characters, with `...` appended when clipped.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut out: String = self.0.chars().take(max_chars).collect();
        if self.0.chars().nth(max_chars).is_some() {
            out.push_str("...");
        }
        out
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// Same boundary set as a universal-newlines splitter; a CRLF pair yields an empty line,
// which the fragment filter drops.
fn is_line_boundary(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}'
            | '\u{2029}'
    )
}
