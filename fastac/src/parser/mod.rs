pub mod error;
mod structural;
mod title;

pub use error::ParseError;
pub use title::split_title;

use crate::document::Document;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the source text into a Document. Every error in the file is reported.
    pub fn parse(&self) -> Result<Document, Vec<ParseError>> {
        structural::parse_document(&self.source, self.file_id)
    }
}
