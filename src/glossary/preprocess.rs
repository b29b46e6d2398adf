//! Glossary preprocessing
//!
//! One left-to-right scan; at each position the longest matching term wins
//! and the scan resumes after it, so replaced text is never matched again.

use super::{GlossaryEntry, GlossaryTable, MatchKind};
use std::sync::Arc;

/// Output of a preprocessing pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    pub text: String,
    pub glossary_hit: bool,
    pub substitutions: usize,
}

/// Applies a glossary snapshot to chat text
#[derive(Debug, Clone)]
pub struct Preprocessor {
    table: Arc<GlossaryTable>,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl Preprocessor {
    pub fn new(table: Arc<GlossaryTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &GlossaryTable {
        &self.table
    }

    /// Replace every glossary term in `text`.
    ///
    /// Each replacement is padded with spaces and whitespace is collapsed
    /// afterwards, so `毒蜥锚定` becomes `Gila Anchor up`. Text without a hit
    /// is returned byte-for-byte.
    pub fn apply(&self, text: &str) -> Preprocessed {
        let mut out = String::with_capacity(text.len() + 16);
        let mut substitutions = 0;
        let mut pos = 0;

        while let Some(c) = text[pos..].chars().next() {
            match self.match_at(text, pos, c) {
                Some(entry) => {
                    out.push(' ');
                    out.push_str(&entry.target_term);
                    out.push(' ');
                    pos += entry.source_term.len();
                    substitutions += 1;
                }
                None => {
                    out.push(c);
                    pos += c.len_utf8();
                }
            }
        }

        if substitutions == 0 {
            return Preprocessed {
                text: text.to_string(),
                glossary_hit: false,
                substitutions,
            };
        }

        Preprocessed {
            text: out.split_whitespace().collect::<Vec<_>>().join(" "),
            glossary_hit: true,
            substitutions,
        }
    }

    fn match_at(&self, text: &str, pos: usize, first: char) -> Option<&GlossaryEntry> {
        let rest = &text[pos..];
        self.table.candidates(first).find(|entry| {
            if !rest.starts_with(entry.source_term.as_str()) {
                return false;
            }
            match entry.match_kind {
                MatchKind::Literal => true,
                MatchKind::WordBoundary => {
                    let end = pos + entry.source_term.len();
                    let before = text[..pos].chars().next_back();
                    let after = text[end..].chars().next();
                    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
                }
            }
        })
    }
}
