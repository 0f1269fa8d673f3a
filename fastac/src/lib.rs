pub mod block;
pub mod document;
pub mod parser;
pub mod template;

pub use block::{Block, Line, LineKind};
pub use document::Document;
pub use template::Template;
