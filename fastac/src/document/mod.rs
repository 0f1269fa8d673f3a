use std::collections::HashMap;

use crate::block::{Block, normalize_title};
use crate::template::Template;

/// A parsed source file: blocks in source order plus the templates it defines.
#[derive(Debug, Clone)]
pub struct Document {
    pub blocks: Vec<Block>,
    pub templates: HashMap<String, Template>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl Document {
    /// Look a block up by title. The key is normalized the same way titles are.
    pub fn block(&self, title: &str) -> Option<&Block> {
        let key = normalize_title(title);
        self.blocks.iter().find(|block| block.title == key)
    }

    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.get(&normalize_title(name))
    }

    pub fn titles(&self) -> Vec<&str> {
        self.blocks.iter().map(|block| block.title.as_str()).collect()
    }

    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}
