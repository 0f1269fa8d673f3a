//! Formatting compiled blocks as multi-sequence FASTA.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::compiler::CompiledBlock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterCase {
    #[default]
    Lower,
    Upper,
    Preserve,
}

impl LetterCase {
    fn apply(self, sequence: &str) -> String {
        match self {
            LetterCase::Lower => sequence.to_lowercase(),
            LetterCase::Upper => sequence.to_uppercase(),
            LetterCase::Preserve => sequence.to_string(),
        }
    }
}

impl fmt::Display for LetterCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LetterCase::Lower => "lower",
            LetterCase::Upper => "upper",
            LetterCase::Preserve => "preserve",
        })
    }
}

impl FromStr for LetterCase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lower" => Ok(LetterCase::Lower),
            "upper" => Ok(LetterCase::Upper),
            "preserve" => Ok(LetterCase::Preserve),
            other => Err(format!(
                "unknown letter case '{}' (expected lower, upper or preserve)",
                other
            )),
        }
    }
}

/// How compiled blocks are written out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderOptions {
    /// Characters per sequence line. 0 keeps each sequence on one line.
    pub wrap_width: usize,
    pub case: LetterCase,
    /// Omit the JSON metadata from title lines.
    pub plain: bool,
    pub include_private: bool,
    pub last_block_only: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            wrap_width: 50,
            case: LetterCase::Lower,
            plain: true,
            include_private: false,
            last_block_only: false,
        }
    }
}

/// Render blocks in order, separated by one blank line.
pub fn render(blocks: &[CompiledBlock], options: &RenderOptions) -> String {
    let visible: Vec<&CompiledBlock> = blocks
        .iter()
        .filter(|block| options.include_private || !block.is_private())
        .collect();
    let selected = match (options.last_block_only, visible.split_last()) {
        (true, Some((last, _))) => std::slice::from_ref(last),
        _ => visible.as_slice(),
    };

    if selected.is_empty() {
        return String::new();
    }

    let mut out = selected
        .iter()
        .map(|block| render_block(block, options))
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push('\n');
    out
}

fn render_block(block: &CompiledBlock, options: &RenderOptions) -> String {
    let mut out = format!("> {}", block.title);
    if !options.plain {
        out.push(' ');
        out.push_str(&title_metadata(block).to_string());
    }

    let sequence = options.case.apply(&block.sequence);
    for line in wrap(&sequence, options.wrap_width) {
        out.push('\n');
        out.push_str(&line);
    }
    out
}

/// The JSON written after the title: user keys in source order, then the
/// resolved type, `private`, and inline comments as `[from, to, text]`.
pub fn title_metadata(block: &CompiledBlock) -> Value {
    let mut fields: Map<String, Value> = block.metadata.fields.clone();
    fields.insert("type".to_string(), json!(block.seq_type.as_str()));
    if block.metadata.private {
        fields.insert("private".to_string(), json!(true));
    }

    if !block.comments.is_empty() {
        let inline = block
            .comments
            .iter()
            .map(|c| json!([c.position, c.position, c.text]));
        match fields.get_mut("comments") {
            Some(Value::Array(existing)) => existing.extend(inline),
            _ => {
                fields.insert("comments".to_string(), Value::Array(inline.collect()));
            }
        }
    }
    Value::Object(fields)
}

fn wrap(sequence: &str, width: usize) -> Vec<String> {
    if sequence.is_empty() {
        return Vec::new();
    }
    if width == 0 {
        return vec![sequence.to_string()];
    }
    let chars: Vec<char> = sequence.chars().collect();
    chars.chunks(width).map(|chunk| chunk.iter().collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::InlineComment;
    use fastac::block::metadata::{Metadata, SeqType};

    fn block(title: &str, sequence: &str, private: bool) -> CompiledBlock {
        CompiledBlock {
            title: title.to_string(),
            metadata: Metadata {
                private,
                ..Metadata::default()
            },
            seq_type: SeqType::Dna,
            sequence: sequence.to_string(),
            comments: Vec::new(),
        }
    }

    #[test]
    fn plain_lowercase_by_default() {
        let out = render(&[block("a", "ACGT", false)], &RenderOptions::default());
        assert_eq!(out, "> a\nacgt\n");
    }

    #[test]
    fn blocks_are_separated_by_a_blank_line() {
        let blocks = [block("a", "AC", false), block("b", "GT", false)];
        let options = RenderOptions {
            case: LetterCase::Upper,
            ..RenderOptions::default()
        };
        assert_eq!(render(&blocks, &options), "> a\nAC\n\n> b\nGT\n");
    }

    #[test]
    fn wraps_by_width() {
        let options = RenderOptions {
            wrap_width: 4,
            case: LetterCase::Preserve,
            ..RenderOptions::default()
        };
        assert_eq!(
            render(&[block("a", "ACGTacgtAC", false)], &options),
            "> a\nACGT\nacgt\nAC\n"
        );

        let unwrapped = RenderOptions {
            wrap_width: 0,
            ..options
        };
        assert_eq!(
            render(&[block("a", "ACGTacgtAC", false)], &unwrapped),
            "> a\nACGTacgtAC\n"
        );
    }

    #[test]
    fn private_blocks_and_last_only() {
        let blocks = [
            block("a", "A", false),
            block("b", "C", true),
            block("c", "G", false),
        ];
        let default = RenderOptions::default();
        assert_eq!(render(&blocks, &default), "> a\na\n\n> c\ng\n");

        let all = RenderOptions {
            include_private: true,
            ..RenderOptions::default()
        };
        assert_eq!(render(&blocks, &all), "> a\na\n\n> b\nc\n\n> c\ng\n");

        let last = RenderOptions {
            last_block_only: true,
            ..RenderOptions::default()
        };
        assert_eq!(render(&blocks, &last), "> c\ng\n");
        assert_eq!(render(&blocks[1..2], &last), "");
    }

    #[test]
    fn metadata_json_keeps_key_order() {
        let mut b = block("gfp", "ATG", true);
        b.metadata
            .fields
            .insert("source".to_string(), json!("pUC19"));
        b.metadata
            .fields
            .insert("comments".to_string(), json!([[1, 3, "start"]]));
        b.comments.push(InlineComment {
            position: 2,
            text: "kozak".to_string(),
        });

        let options = RenderOptions {
            plain: false,
            include_private: true,
            ..RenderOptions::default()
        };
        assert_eq!(
            render(&[b], &options),
            "> gfp {\"source\":\"pUC19\",\"comments\":[[1,3,\"start\"],[2,2,\"kozak\"]],\"type\":\"dna\",\"private\":true}\natg\n"
        );
    }

    #[test]
    fn options_read_from_toml() {
        let options: RenderOptions = toml::from_str("wrap_width = 60\ncase = \"upper\"\n").unwrap();
        assert_eq!(options.wrap_width, 60);
        assert_eq!(options.case, LetterCase::Upper);
        assert!(options.plain);
        assert!(toml::from_str::<RenderOptions>("colour = true").is_err());
    }

    #[test]
    fn letter_case_parses() {
        assert_eq!("UPPER".parse::<LetterCase>(), Ok(LetterCase::Upper));
        assert!("title".parse::<LetterCase>().is_err());
    }
}
