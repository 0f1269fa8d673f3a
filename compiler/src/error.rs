use std::fmt;
use std::ops::Range;

use fastac::block::metadata::SeqType;
use fastac::parser::ParseError;

use crate::registry::Arity;

/// Coarse classification of compile errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Reference,
    Cycle,
    MacroArgument,
    TemplateArity,
    Alphabet,
    Io,
    RecursionLimit,
    Other,
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("parse errors in '{path}': {}", summarize(.errors))]
    Parse {
        path: String,
        errors: Vec<ParseError>,
    },

    #[error("cannot read '{path}': {message}")]
    Io { path: String, message: String },

    #[error(
        "undefined block '{title}'{} (available: {})",
        in_library(.library),
        list_or_none(.available)
    )]
    UndefinedBlock {
        title: String,
        library: Option<String>,
        available: Vec<String>,
    },

    #[error("undefined template '{name}'{}", in_library(.library))]
    UndefinedTemplate {
        name: String,
        library: Option<String>,
    },

    #[error("index {index} is out of range for '{title}' (length {length})")]
    IndexOutOfRange {
        title: String,
        index: usize,
        length: usize,
    },

    #[error("circular reference: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error("expansion exceeded the maximum depth of {limit}")]
    RecursionLimit { limit: usize },

    #[error("unknown macro '${0}'")]
    UnknownMacro(String),

    #[error("unknown flag '{flag}' for macro '${macro_name}'")]
    UnknownFlag { macro_name: String, flag: String },

    #[error("macro '${macro_name}' expects {expected} positional argument(s), got {given}")]
    Arity {
        macro_name: String,
        expected: Arity,
        given: usize,
    },

    #[error("macro '${macro_name}': {message}")]
    InvalidArgument { macro_name: String, message: String },

    #[error("template '{name}' expects {expected} argument(s), got {given}")]
    TemplateArity {
        name: String,
        expected: usize,
        given: usize,
    },

    #[error("{subject}: '{found}' at position {position} is not valid {expected}")]
    Alphabet {
        subject: String,
        expected: SeqType,
        found: char,
        position: usize,
    },

    #[error("${macro_name} cannot take block '{title}': it is declared {declared}, expected {expected}")]
    DeclaredType {
        macro_name: String,
        title: String,
        declared: SeqType,
        expected: String,
    },

    #[error("{0}")]
    Custom(String),
}

impl CompileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Parse { .. } => ErrorKind::Parse,
            CompileError::Io { .. } => ErrorKind::Io,
            CompileError::UndefinedBlock { .. }
            | CompileError::UndefinedTemplate { .. }
            | CompileError::IndexOutOfRange { .. } => ErrorKind::Reference,
            CompileError::Cycle { .. } => ErrorKind::Cycle,
            CompileError::RecursionLimit { .. } => ErrorKind::RecursionLimit,
            CompileError::UnknownMacro(_)
            | CompileError::UnknownFlag { .. }
            | CompileError::Arity { .. }
            | CompileError::InvalidArgument { .. } => ErrorKind::MacroArgument,
            CompileError::TemplateArity { .. } => ErrorKind::TemplateArity,
            CompileError::Alphabet { .. } | CompileError::DeclaredType { .. } => {
                ErrorKind::Alphabet
            }
            CompileError::Custom(_) => ErrorKind::Other,
        }
    }

    pub(crate) fn invalid_argument(macro_name: &str, message: impl Into<String>) -> Self {
        CompileError::InvalidArgument {
            macro_name: macro_name.to_string(),
            message: message.into(),
        }
    }
}

fn summarize(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn in_library(library: &Option<String>) -> String {
    match library {
        Some(path) => format!(" in library '{}'", path),
        None => String::new(),
    }
}

/// Where a diagnostic points: the source file, the enclosing block or
/// template, and the offending line.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub source_id: usize,
    pub path: String,
    pub title: String,
    /// 1-based line number.
    pub line: usize,
    pub span: Range<usize>,
}

/// A compile error or warning enriched with source location information.
#[derive(Debug)]
pub struct DiagnosticError {
    pub error: CompileError,
    pub location: Option<Location>,
    pub is_warning: bool,
}

impl DiagnosticError {
    /// Create a warning diagnostic at a source location.
    pub fn warning(message: String, location: Location) -> Self {
        DiagnosticError {
            error: CompileError::Custom(message),
            location: Some(location),
            is_warning: true,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Attach a location unless the error already carries a more precise one.
    pub fn or_location(mut self, location: Location) -> Self {
        if self.location.is_none() {
            self.location = Some(location);
        }
        self
    }
}

impl From<CompileError> for DiagnosticError {
    fn from(error: CompileError) -> Self {
        DiagnosticError {
            error,
            location: None,
            is_warning: false,
        }
    }
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(
                f,
                "{}:{}: in '{}': {}",
                location.path, location.line, location.title, self.error
            ),
            None => self.error.fmt(f),
        }
    }
}

impl std::error::Error for DiagnosticError {}
