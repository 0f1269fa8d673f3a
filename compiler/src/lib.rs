pub mod alphabet;
pub mod args;
pub mod compiler;
pub mod error;
pub mod library;
pub mod macros;
pub mod registry;
pub mod render;
pub mod resolver;
pub mod scope;
pub mod tables;
pub mod transform;

pub use compiler::{
    Compilation, CompiledBlock, InlineComment, compile_document, compile_file, compile_str,
};
pub use error::{CompileError, DiagnosticError, ErrorKind, Location};
pub use registry::MacroRegistry;
pub use render::{LetterCase, RenderOptions, render};
pub use scope::CompilationScope;
