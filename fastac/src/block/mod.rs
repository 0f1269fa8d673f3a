pub mod metadata;

use std::ops::Range;

use crate::block::metadata::Metadata;

/// A titled record: a `>` title line followed by body lines.
/// Blocks are the unit other blocks reference by title.
#[derive(Debug, Clone)]
pub struct Block {
    /// The block title, whitespace-normalized, without its metadata suffix.
    pub title: String,
    pub metadata: Metadata,
    /// Body lines in source order. `#` comments are never stored.
    pub lines: Vec<Line>,
    /// Byte span of the whole record in source, title line included.
    pub span: Range<usize>,
    /// 1-based line number of the title line.
    pub line: usize,
}

impl Block {
    /// Concatenated literal lines, before any macro is expanded.
    pub fn raw_sequence(&self) -> String {
        self.lines
            .iter()
            .filter_map(|line| match &line.kind {
                LineKind::Literal(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn macro_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| matches!(line.kind, LineKind::Macro { .. }))
            .count()
    }
}

/// A single body line with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub kind: LineKind,
    /// 1-based line number.
    pub line: usize,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    /// Sequence text, all whitespace removed.
    Literal(String),
    /// `$name arguments...`; arguments stay raw until dispatch.
    Macro { name: String, arguments: String },
    /// `;` markup comment, kept as inline metadata.
    Comment(String),
}

/// Normalize a title or reference key: trim, collapse interior whitespace.
/// Lookup stays case-sensitive.
pub fn normalize_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_collapses() {
        assert_eq!(normalize_title("  promoter   proD \t"), "promoter proD");
        assert_eq!(normalize_title("Promoter"), "Promoter");
        assert_eq!(normalize_title(""), "");
    }
}
