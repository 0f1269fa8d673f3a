use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use fastac::Document;
use fastac::parser::Parser;
use tracing::debug;

use crate::error::CompileError;

/// Index of a loaded document. Doubles as its codespan source id.
pub type DocId = usize;

/// Source text of a loaded document, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub text: String,
}

/// Every document loaded during one compilation, with a cache keyed by
/// canonical path so each library is read and parsed at most once.
#[derive(Debug, Default)]
pub struct Library {
    files: Vec<SourceFile>,
    documents: HashMap<DocId, Rc<Document>>,
    /// Directory that relative `--lib` paths resolve against, per document.
    base_dirs: HashMap<DocId, PathBuf>,
    by_path: HashMap<PathBuf, DocId>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source files in load order. Index `i` is the source id of document `i`.
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn path(&self, id: DocId) -> &str {
        self.files.get(id).map(|f| f.path.as_str()).unwrap_or("<unknown>")
    }

    pub fn document(&self, id: DocId) -> Option<Rc<Document>> {
        self.documents.get(&id).cloned()
    }

    /// Register a document that was parsed elsewhere.
    pub fn insert(&mut self, mut document: Document, path: String, base_dir: PathBuf) -> DocId {
        let id = self.files.len();
        self.files.push(SourceFile {
            path,
            text: String::new(),
        });
        document.source_id = id;
        self.base_dirs.insert(id, base_dir);
        self.documents.insert(id, Rc::new(document));
        id
    }

    /// Parse source text that does not come from a file on disk.
    pub fn insert_source(
        &mut self,
        path: String,
        text: String,
        base_dir: PathBuf,
    ) -> Result<DocId, CompileError> {
        self.parse_and_insert(path, text, base_dir)
    }

    /// Load a document from disk, or return the cached one.
    pub fn load(&mut self, path: &Path) -> Result<DocId, CompileError> {
        let display = path.display().to_string();
        let canonical = path.canonicalize().map_err(|e| CompileError::Io {
            path: display.clone(),
            message: e.to_string(),
        })?;

        if let Some(&id) = self.by_path.get(&canonical) {
            return Ok(id);
        }

        let text = std::fs::read_to_string(&canonical).map_err(|e| CompileError::Io {
            path: display.clone(),
            message: e.to_string(),
        })?;
        let base_dir = canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let id = self.parse_and_insert(display, text, base_dir)?;
        self.by_path.insert(canonical, id);
        Ok(id)
    }

    /// Resolve a `--lib` path relative to the referencing document and load it.
    pub fn resolve(&mut self, from: DocId, lib: &str) -> Result<DocId, CompileError> {
        let base = self
            .base_dirs
            .get(&from)
            .cloned()
            .unwrap_or_else(|| PathBuf::from("."));
        self.load(&base.join(lib))
    }

    fn parse_and_insert(
        &mut self,
        path: String,
        text: String,
        base_dir: PathBuf,
    ) -> Result<DocId, CompileError> {
        let id = self.files.len();
        // The file is kept even when parsing fails so diagnostics can show it.
        self.files.push(SourceFile {
            path: path.clone(),
            text: text.clone(),
        });

        let document = Parser::new(text, id)
            .parse()
            .map_err(|errors| CompileError::Parse {
                path: path.clone(),
                errors,
            })?;

        debug!(
            path = %path,
            id,
            blocks = document.blocks.len(),
            templates = document.templates.len(),
            "loaded document"
        );

        self.base_dirs.insert(id, base_dir);
        self.documents.insert(id, Rc::new(document));
        Ok(id)
    }
}
