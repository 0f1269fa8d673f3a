use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use fastac::Document;
use tracing::warn;

use crate::compiler::CompiledBlock;
use crate::error::{CompileError, DiagnosticError, Location};
use crate::library::{DocId, Library};
use crate::registry::MacroRegistry;

/// Maximum number of nested block/template expansions.
pub const MAX_DEPTH: usize = 64;

/// What a resolution frame is expanding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameKey {
    Block(String),
    /// A template instantiation. Arguments are part of the key, so only
    /// an identical re-instantiation counts as a cycle.
    Template { name: String, arguments: Vec<String> },
}

/// One in-flight expansion on the resolution stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    pub doc: DocId,
    pub key: FrameKey,
}

impl Frame {
    pub fn block(doc: DocId, title: impl Into<String>) -> Self {
        Frame {
            doc,
            key: FrameKey::Block(title.into()),
        }
    }

    pub fn template(doc: DocId, name: impl Into<String>, arguments: &[String]) -> Self {
        Frame {
            doc,
            key: FrameKey::Template {
                name: name.into(),
                arguments: arguments.to_vec(),
            },
        }
    }
}

/// State for one top-level compile: loaded documents, the resolution
/// stack, compiled blocks and collected warnings.
pub struct CompilationScope<'r> {
    pub(crate) registry: &'r MacroRegistry,
    pub(crate) library: Library,
    stack: Vec<Frame>,
    pub(crate) compiled: HashMap<(DocId, String), Rc<CompiledBlock>>,
    pub(crate) warnings: Vec<DiagnosticError>,
}

impl<'r> CompilationScope<'r> {
    pub fn new(registry: &'r MacroRegistry) -> Self {
        CompilationScope {
            registry,
            library: Library::new(),
            stack: Vec::new(),
            compiled: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Read and parse an entry file. It joins the library cache, so a
    /// library that points back at it reuses the same document.
    pub fn load_file(&mut self, path: &Path) -> Result<DocId, DiagnosticError> {
        Ok(self.library.load(path)?)
    }

    /// Parse entry source text that is not on disk.
    pub fn load_source(
        &mut self,
        path: impl Into<String>,
        text: impl Into<String>,
        base_dir: PathBuf,
    ) -> Result<DocId, DiagnosticError> {
        Ok(self
            .library
            .insert_source(path.into(), text.into(), base_dir)?)
    }

    /// Register an already parsed entry document.
    pub fn add_document(
        &mut self,
        document: Document,
        path: impl Into<String>,
        base_dir: PathBuf,
    ) -> DocId {
        self.library.insert(document, path.into(), base_dir)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Push a frame, failing on a repeated frame (a cycle) or when the
    /// stack is full.
    pub fn push_frame(&mut self, frame: Frame) -> Result<(), CompileError> {
        if let Some(start) = self.stack.iter().position(|f| *f == frame) {
            let chain = self.stack[start..]
                .iter()
                .chain(std::iter::once(&frame))
                .map(|f| self.describe(f))
                .collect();
            return Err(CompileError::Cycle { chain });
        }
        if self.stack.len() >= MAX_DEPTH {
            return Err(CompileError::RecursionLimit { limit: MAX_DEPTH });
        }
        self.stack.push(frame);
        Ok(())
    }

    pub fn pop_frame(&mut self) -> Option<Frame> {
        self.stack.pop()
    }

    /// Human-readable name of a frame, e.g. `parts.fa#gfp` or
    /// `parts.fa#template:wrap(gfp)`.
    pub fn describe(&self, frame: &Frame) -> String {
        let path = self.library.path(frame.doc);
        match &frame.key {
            FrameKey::Block(title) => format!("{}#{}", path, title),
            FrameKey::Template { name, arguments } => {
                format!("{}#template:{}({})", path, name, arguments.join(", "))
            }
        }
    }

    /// Record a non-fatal diagnostic.
    pub fn warn(&mut self, location: &Location, message: impl Into<String>) {
        let message = message.into();
        warn!(path = %location.path, line = location.line, "{}", message);
        self.warnings
            .push(DiagnosticError::warning(message, location.clone()));
    }

    pub fn warnings(&self) -> &[DiagnosticError] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn repeated_frame_is_a_cycle() {
        let registry = MacroRegistry::standard();
        let mut scope = CompilationScope::new(&registry);
        let doc = scope
            .load_source("main.fa", ">a\nAC\n", PathBuf::from("."))
            .unwrap();
        scope.push_frame(Frame::block(doc, "a")).unwrap();
        scope.push_frame(Frame::block(doc, "b")).unwrap();
        scope
            .push_frame(Frame::template(doc, "a", &["x".to_string()]))
            .unwrap();
        let err = scope.push_frame(Frame::block(doc, "b")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cycle);
        assert_eq!(
            err.to_string(),
            "circular reference: main.fa#b -> main.fa#template:a(x) -> main.fa#b"
        );
        assert_eq!(scope.depth(), 3);
    }

    #[test]
    fn template_frames_differ_by_arguments() {
        let registry = MacroRegistry::standard();
        let mut scope = CompilationScope::new(&registry);
        let doc = scope
            .load_source("main.fa", ">a\nAC\n", PathBuf::from("."))
            .unwrap();
        let inner = ["inner".to_string()];
        let base = ["base".to_string()];
        scope.push_frame(Frame::template(doc, "wrap", &inner)).unwrap();
        scope.push_frame(Frame::template(doc, "wrap", &base)).unwrap();
        let err = scope
            .push_frame(Frame::template(doc, "wrap", &inner))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cycle);
    }

    #[test]
    fn depth_is_bounded() {
        let registry = MacroRegistry::standard();
        let mut scope = CompilationScope::new(&registry);
        for i in 0..MAX_DEPTH {
            scope.push_frame(Frame::block(0, i.to_string())).unwrap();
        }
        let err = scope.push_frame(Frame::block(0, "one more")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecursionLimit);
    }
}
