use std::collections::HashMap;
use std::fmt;

use crate::args::{self, FlagSpec, Invocation};
use crate::error::{CompileError, DiagnosticError, Location};
use crate::library::DocId;
use crate::scope::CompilationScope;

/// A macro implementation. Receives the resolved invocation and the
/// compilation scope, returns the sequence text the line expands to.
pub type MacroFn = fn(&MacroCall, &mut CompilationScope<'_>) -> Result<String, DiagnosticError>;

/// Positional argument count a macro accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, given: usize) -> bool {
        match *self {
            Arity::Exactly(n) => given == n,
            Arity::AtLeast(n) => given >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MacroDef {
    pub name: &'static str,
    pub arity: Arity,
    /// The closed set of flags this macro accepts.
    pub flags: &'static [FlagSpec],
    pub handler: MacroFn,
}

/// One macro line being expanded.
#[derive(Debug, Clone)]
pub struct MacroCall {
    pub invocation: Invocation,
    /// The document the macro line belongs to; unqualified references resolve here.
    pub doc: DocId,
    pub location: Location,
}

impl MacroCall {
    pub fn positional(&self, index: usize) -> &str {
        self.invocation
            .positional
            .get(index)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn flag(&self, name: &str) -> Option<&str> {
        self.invocation.flags.value(name)
    }
}

/// Maps macro names to their definitions.
/// Built once, then shared read-only by every compilation.
#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
    macros: HashMap<&'static str, MacroDef>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with every built-in macro.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for def in crate::macros::BUILTINS {
            registry.register(*def);
        }
        registry
    }

    /// Register a macro, returning the definition it replaced.
    pub fn register(&mut self, def: MacroDef) -> Option<MacroDef> {
        self.macros.insert(def.name, def)
    }

    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.macros.get(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.macros.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Resolve a raw macro line: look the macro up, tokenize its
    /// arguments, bind flags and check positional arity.
    pub fn resolve(&self, name: &str, raw: &str) -> Result<(&MacroDef, Invocation), CompileError> {
        let def = self
            .get(name)
            .ok_or_else(|| CompileError::UnknownMacro(name.to_string()))?;

        let tokens =
            args::tokenize(raw).map_err(|message| CompileError::invalid_argument(name, message))?;
        let (positional, flags) = args::bind(name, tokens, def.flags)?;

        if !def.arity.accepts(positional.len()) {
            return Err(CompileError::Arity {
                macro_name: name.to_string(),
                expected: def.arity,
                given: positional.len(),
            });
        }

        Ok((
            def,
            Invocation {
                name: name.to_string(),
                positional,
                flags,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn standard_registry_has_builtins() {
        let registry = MacroRegistry::standard();
        assert_eq!(
            registry.names(),
            vec![
                "complement",
                "dumb_backtranslate",
                "include",
                "mutate",
                "translate",
                "use_template"
            ]
        );
    }

    #[test]
    fn resolve_binds_arguments() {
        let registry = MacroRegistry::standard();
        let (def, invocation) = registry
            .resolve("translate", "'coding seq' --table 11 --lib parts.fa")
            .unwrap();
        assert_eq!(def.name, "translate");
        assert_eq!(invocation.positional, vec!["coding seq".to_string()]);
        assert_eq!(invocation.flags.value("table"), Some("11"));
        assert_eq!(invocation.flags.value("lib"), Some("parts.fa"));
    }

    #[test]
    fn unknown_macro() {
        let registry = MacroRegistry::standard();
        let err = registry.resolve("frobnicate", "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MacroArgument);
        assert_eq!(err.to_string(), "unknown macro '$frobnicate'");
    }

    #[test]
    fn wrong_arity_names_expected_and_given() {
        let registry = MacroRegistry::standard();
        let err = registry.resolve("mutate", "block 3").unwrap_err();
        assert_eq!(
            err.to_string(),
            "macro '$mutate' expects exactly 3 positional argument(s), got 2"
        );
        let err = registry.resolve("use_template", "-r").unwrap_err();
        assert!(err.to_string().contains("at least 1"), "{}", err);
    }

    #[test]
    fn unterminated_quote_is_an_argument_error() {
        let registry = MacroRegistry::standard();
        let err = registry.resolve("include", "'block").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MacroArgument);
    }
}
