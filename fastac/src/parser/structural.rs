use std::collections::HashMap;
use std::ops::Range;

use crate::block::metadata::Metadata;
use crate::block::{Block, Line, LineKind};
use crate::document::Document;
use crate::parser::error::ParseError;
use crate::parser::title::split_title;
use crate::template::Template;

const DEF_TEMPLATE: &str = "def_template";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse source text into a Document of blocks and templates.
pub fn parse_document(source: &str, file_id: usize) -> Result<Document, Vec<ParseError>> {
    let mut state = ParseState::new(file_id);
    let mut offset = 0;
    for (index, raw) in source.split_inclusive('\n').enumerate() {
        let text = raw.trim_end_matches(['\n', '\r']);
        state.process_line(index + 1, offset..offset + text.len(), text);
        offset += raw.len();
    }
    state.finalize(source.len())
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

struct ParseState {
    file_id: usize,
    /// The record currently collecting body lines.
    current: Option<RecordBuilder>,
    blocks: Vec<Block>,
    templates: HashMap<String, Template>,
    /// Title -> line of its first definition, for duplicate detection.
    seen_titles: HashMap<String, usize>,
    /// Set once body content before any title has been reported.
    orphan_reported: bool,
    errors: Vec<ParseError>,
}

struct RecordBuilder {
    title: String,
    metadata: Metadata,
    lines: Vec<Line>,
    span_start: usize,
    line: usize,
    /// `$def_template <name>` seen: the record becomes a template.
    template: Option<String>,
    /// The title line failed to parse; body lines are consumed but dropped.
    poisoned: bool,
}

impl RecordBuilder {
    fn has_content(&self) -> bool {
        self.lines
            .iter()
            .any(|line| !matches!(line.kind, LineKind::Comment(_)))
    }
}

impl ParseState {
    fn new(file_id: usize) -> Self {
        ParseState {
            file_id,
            current: None,
            blocks: Vec::new(),
            templates: HashMap::new(),
            seen_titles: HashMap::new(),
            orphan_reported: false,
            errors: Vec::new(),
        }
    }

    fn error(&mut self, message: impl Into<String>, line: usize, span: Range<usize>) {
        self.errors
            .push(ParseError::error(message, line, span, self.file_id));
    }

    fn process_line(&mut self, number: usize, span: Range<usize>, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }

        if let Some(title_text) = trimmed.strip_prefix('>') {
            self.close_record(span.start);
            self.open_record(number, span, title_text);
            return;
        }

        // Throwaway comments are dropped wherever they appear.
        if trimmed.starts_with('#') {
            return;
        }

        let Some(builder) = self.current.as_ref() else {
            if !self.orphan_reported {
                self.orphan_reported = true;
                self.error("sequence content before the first title line", number, span);
            }
            return;
        };

        if let Some(name) = &builder.template {
            if !trimmed.starts_with(';') {
                let message = format!(
                    "`$def_template {}` must be the last line of its record",
                    name
                );
                self.error(message, number, span);
                return;
            }
        }

        let kind = if let Some(content) = trimmed.strip_prefix('$') {
            let content = content.trim();
            if content.is_empty() {
                self.error("macro line has no macro name", number, span);
                return;
            }
            let (name, arguments) = match content.split_once(char::is_whitespace) {
                Some((name, rest)) => (name, rest.trim()),
                None => (content, ""),
            };
            if name == DEF_TEMPLATE {
                self.define_template(number, span, arguments);
                return;
            }
            LineKind::Macro {
                name: name.to_string(),
                arguments: arguments.to_string(),
            }
        } else if let Some(comment) = trimmed.strip_prefix(';') {
            LineKind::Comment(comment.trim().to_string())
        } else {
            LineKind::Literal(trimmed.chars().filter(|c| !c.is_whitespace()).collect())
        };

        if let Some(builder) = self.current.as_mut() {
            builder.lines.push(Line {
                kind,
                line: number,
                span,
            });
        }
    }

    fn open_record(&mut self, number: usize, span: Range<usize>, title_text: &str) {
        let parsed = split_title(title_text).and_then(|(title, object)| {
            let metadata = match object {
                Some(object) => Metadata::from_object(object)?,
                None => Metadata::default(),
            };
            Ok((title, metadata))
        });

        let (title, metadata, poisoned) = match parsed {
            Ok((title, metadata)) => (title, metadata, false),
            Err(message) => {
                self.error(message, number, span.clone());
                (String::new(), Metadata::default(), true)
            }
        };

        self.current = Some(RecordBuilder {
            title,
            metadata,
            lines: Vec::new(),
            span_start: span.start,
            line: number,
            template: None,
            poisoned,
        });
    }

    fn define_template(&mut self, number: usize, span: Range<usize>, arguments: &str) {
        let names: Vec<&str> = arguments.split_whitespace().collect();
        if names.len() != 1 {
            self.error(
                format!(
                    "`$def_template` takes exactly one template name, got {}",
                    names.len()
                ),
                number,
                span,
            );
            return;
        }

        let has_content = self
            .current
            .as_ref()
            .is_some_and(RecordBuilder::has_content);
        if !has_content {
            self.error(
                format!(
                    "`$def_template {}` has no preceding block content to capture",
                    names[0]
                ),
                number,
                span,
            );
            return;
        }

        if let Some(builder) = self.current.as_mut() {
            builder.template = Some(names[0].to_string());
        }
    }

    /// Finish the current record, registering it as a block or a template.
    fn close_record(&mut self, span_end: usize) {
        let Some(builder) = self.current.take() else {
            return;
        };
        if builder.poisoned {
            return;
        }

        let span = builder.span_start..span_end;
        match builder.template {
            Some(name) => {
                if let Some(existing) = self.templates.get(&name) {
                    let message = format!("template '{}' is defined twice", name);
                    let note = format!("first defined by the record on line {}", existing.line);
                    self.errors.push(
                        ParseError::error(message, builder.line, span, self.file_id)
                            .with_note(note),
                    );
                    return;
                }
                match Template::new(name.clone(), builder.lines, span.clone(), builder.line) {
                    Ok(template) => {
                        self.templates.insert(name, template);
                    }
                    Err(message) => self.error(message, builder.line, span),
                }
            }
            None => {
                if let Some(first) = self.seen_titles.get(&builder.title) {
                    let message = format!("block title '{}' is defined twice", builder.title);
                    let note = format!("first defined on line {}", first);
                    self.errors.push(
                        ParseError::error(message, builder.line, span, self.file_id)
                            .with_note(note),
                    );
                    return;
                }
                self.seen_titles
                    .insert(builder.title.clone(), builder.line);
                self.blocks.push(Block {
                    title: builder.title,
                    metadata: builder.metadata,
                    lines: builder.lines,
                    span,
                    line: builder.line,
                });
            }
        }
    }

    fn finalize(mut self, source_len: usize) -> Result<Document, Vec<ParseError>> {
        self.close_record(source_len);
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        Ok(Document {
            blocks: self.blocks,
            templates: self.templates,
            source_id: self.file_id,
        })
    }
}
