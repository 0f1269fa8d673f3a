//! Reference resolution across documents.

use std::rc::Rc;

use fastac::Template;
use fastac::block::normalize_title;
use tracing::debug;

use crate::compiler::CompiledBlock;
use crate::error::{CompileError, DiagnosticError};
use crate::library::DocId;
use crate::scope::{CompilationScope, Frame};

impl CompilationScope<'_> {
    /// The document a reference points into: the library named by `--lib`,
    /// resolved relative to `from`, or `from` itself.
    fn target(&mut self, from: DocId, lib: Option<&str>) -> Result<DocId, CompileError> {
        match lib {
            Some(path) => self.library.resolve(from, path),
            None => Ok(from),
        }
    }

    /// Resolve a block by title and compile it, at most once per run.
    pub fn resolve_block(
        &mut self,
        from: DocId,
        title: &str,
        lib: Option<&str>,
    ) -> Result<Rc<CompiledBlock>, DiagnosticError> {
        let target = self.target(from, lib)?;
        let key = normalize_title(title);

        if let Some(compiled) = self.compiled.get(&(target, key.clone())) {
            return Ok(Rc::clone(compiled));
        }

        let document = self
            .library
            .document(target)
            .ok_or_else(|| CompileError::Custom(format!("document {} is not loaded", target)))?;
        let block = document
            .block(&key)
            .ok_or_else(|| CompileError::UndefinedBlock {
                title: key.clone(),
                library: lib.map(str::to_string),
                available: document.titles().iter().map(|t| t.to_string()).collect(),
            })?;

        self.push_frame(Frame::block(target, key.clone()))?;
        let result = self.compile_block(target, block);
        self.pop_frame();

        let compiled = Rc::new(result?);
        debug!(
            path = self.library.path(target),
            title = %key,
            length = compiled.sequence.len(),
            seq_type = %compiled.seq_type,
            "compiled block"
        );
        self.compiled.insert((target, key), Rc::clone(&compiled));
        Ok(compiled)
    }

    /// Find a template. Returns the id of the document that defines it;
    /// its macro lines resolve against that document.
    pub fn resolve_template(
        &mut self,
        from: DocId,
        name: &str,
        lib: Option<&str>,
    ) -> Result<(DocId, Template), DiagnosticError> {
        let target = self.target(from, lib)?;
        let document = self
            .library
            .document(target)
            .ok_or_else(|| CompileError::Custom(format!("document {} is not loaded", target)))?;
        let template = document
            .template(name)
            .ok_or_else(|| CompileError::UndefinedTemplate {
                name: normalize_title(name),
                library: lib.map(str::to_string),
            })?;
        Ok((target, template.clone()))
    }
}
