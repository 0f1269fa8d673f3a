use std::path::{Path, PathBuf};

use fastac::block::metadata::{Metadata, SeqType};
use fastac::{Block, Document, Line, LineKind};
use tracing::trace;

use crate::alphabet;
use crate::error::{CompileError, DiagnosticError, Location};
use crate::library::DocId;
use crate::registry::{MacroCall, MacroRegistry};
use crate::scope::CompilationScope;

/// A `;` comment pinned to a position in the compiled sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineComment {
    /// 1-based index of the character the comment precedes.
    pub position: usize,
    pub text: String,
}

/// A block with every macro expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledBlock {
    pub title: String,
    pub metadata: Metadata,
    /// The declared type, or the one inferred from the sequence.
    pub seq_type: SeqType,
    pub sequence: String,
    pub comments: Vec<InlineComment>,
}

impl CompiledBlock {
    pub fn is_private(&self) -> bool {
        self.metadata.private
    }
}

/// Result of compiling a whole document.
#[derive(Debug)]
pub struct Compilation {
    /// Every block of the entry document, in source order.
    pub blocks: Vec<CompiledBlock>,
    pub warnings: Vec<DiagnosticError>,
}

/// Sequence text and comments produced by a run of body lines.
#[derive(Debug, Default)]
pub(crate) struct Expanded {
    pub sequence: String,
    pub comments: Vec<InlineComment>,
}

impl CompilationScope<'_> {
    /// Compile every block of a loaded document in source order.
    /// Stops at the first error.
    pub fn compile(&mut self, doc: DocId) -> Result<Compilation, DiagnosticError> {
        let document = self
            .library
            .document(doc)
            .ok_or_else(|| CompileError::Custom(format!("document {} is not loaded", doc)))?;

        let mut blocks = Vec::with_capacity(document.blocks.len());
        for block in &document.blocks {
            let compiled = self.resolve_block(doc, &block.title, None)?;
            blocks.push(CompiledBlock::clone(&compiled));
        }

        Ok(Compilation {
            blocks,
            warnings: std::mem::take(&mut self.warnings),
        })
    }

    /// Expand one block. The caller owns the resolution frame.
    pub(crate) fn compile_block(
        &mut self,
        doc: DocId,
        block: &Block,
    ) -> Result<CompiledBlock, DiagnosticError> {
        let expanded = self.expand_lines(doc, &block.title, &block.lines)?;

        let seq_type = match block.metadata.seq_type {
            Some(SeqType::Unknown) | None => alphabet::infer(&expanded.sequence),
            Some(declared) => {
                alphabet::check(&expanded.sequence, declared).map_err(|mismatch| {
                    DiagnosticError::from(CompileError::Alphabet {
                        subject: format!("block '{}'", block.title),
                        expected: declared,
                        found: mismatch.found,
                        position: mismatch.position,
                    })
                    .or_location(self.location(doc, &block.title, block.line, block.span.clone()))
                })?;
                declared
            }
        };

        Ok(CompiledBlock {
            title: block.title.clone(),
            metadata: block.metadata.clone(),
            seq_type,
            sequence: expanded.sequence,
            comments: expanded.comments,
        })
    }

    /// Expand body lines in order. `doc` is the document macro references
    /// resolve against; `context` names the enclosing block or template.
    pub(crate) fn expand_lines(
        &mut self,
        doc: DocId,
        context: &str,
        lines: &[Line],
    ) -> Result<Expanded, DiagnosticError> {
        let mut expanded = Expanded::default();
        // Characters so far; the sequence may hold non-ASCII text from literals.
        let mut length = 0;

        for line in lines {
            match &line.kind {
                LineKind::Literal(text) => {
                    length += text.chars().count();
                    expanded.sequence.push_str(text);
                }
                LineKind::Comment(text) => expanded.comments.push(InlineComment {
                    position: length + 1,
                    text: text.clone(),
                }),
                LineKind::Macro { name, arguments } => {
                    let location = self.location(doc, context, line.line, line.span.clone());
                    let text = self
                        .dispatch(doc, name, arguments, location.clone())
                        .map_err(|e| e.or_location(location))?;
                    length += text.chars().count();
                    expanded.sequence.push_str(&text);
                }
            }
        }

        Ok(expanded)
    }

    fn dispatch(
        &mut self,
        doc: DocId,
        name: &str,
        arguments: &str,
        location: Location,
    ) -> Result<String, DiagnosticError> {
        let registry = self.registry;
        let (def, invocation) = registry.resolve(name, arguments)?;
        trace!(
            path = %location.path,
            line = location.line,
            macro_name = def.name,
            positional = ?invocation.positional,
            "dispatching macro"
        );
        let call = MacroCall {
            invocation,
            doc,
            location,
        };
        (def.handler)(&call, self)
    }

    pub(crate) fn location(
        &self,
        doc: DocId,
        title: &str,
        line: usize,
        span: std::ops::Range<usize>,
    ) -> Location {
        Location {
            source_id: doc,
            path: self.library.path(doc).to_string(),
            title: title.to_string(),
            line,
            span,
        }
    }
}

/// Compile a document that was parsed elsewhere. Relative `--lib` paths
/// resolve against `base_dir`.
pub fn compile_document(
    document: Document,
    registry: &MacroRegistry,
    base_dir: PathBuf,
) -> Result<Compilation, DiagnosticError> {
    let mut scope = CompilationScope::new(registry);
    let doc = scope.add_document(document, "<input>", base_dir);
    scope.compile(doc)
}

/// Read, parse and compile a file from disk.
pub fn compile_file(path: &Path, registry: &MacroRegistry) -> Result<Compilation, DiagnosticError> {
    let mut scope = CompilationScope::new(registry);
    let doc = scope.load_file(path)?;
    scope.compile(doc)
}

/// Parse and compile source text.
pub fn compile_str(
    source: &str,
    registry: &MacroRegistry,
    base_dir: PathBuf,
) -> Result<Compilation, DiagnosticError> {
    let mut scope = CompilationScope::new(registry);
    let doc = scope.load_source("<input>", source, base_dir)?;
    scope.compile(doc)
}
