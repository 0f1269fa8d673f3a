//! Built-in macros.

use std::rc::Rc;

use fastac::LineKind;
use fastac::block::metadata::SeqType;

use crate::alphabet::Mismatch;
use crate::args::{FlagKind, FlagSpec};
use crate::compiler::CompiledBlock;
use crate::error::{CompileError, DiagnosticError};
use crate::registry::{Arity, MacroCall, MacroDef};
use crate::scope::{CompilationScope, Frame};
use crate::tables::{self, GeneticCode};
use crate::transform;

const LIB: FlagSpec = FlagSpec {
    name: "lib",
    kind: FlagKind::Value,
};
const TABLE: FlagSpec = FlagSpec {
    name: "table",
    kind: FlagKind::Value,
};
const RECURSIVE: FlagSpec = FlagSpec {
    name: "r",
    kind: FlagKind::Switch,
};

const DEFAULT_TABLE: &str = "standard";

pub const BUILTINS: &[MacroDef] = &[
    MacroDef {
        name: "include",
        arity: Arity::Exactly(1),
        flags: &[LIB],
        handler: include,
    },
    MacroDef {
        name: "complement",
        arity: Arity::Exactly(1),
        flags: &[LIB],
        handler: complement,
    },
    MacroDef {
        name: "translate",
        arity: Arity::Exactly(1),
        flags: &[LIB, TABLE],
        handler: translate,
    },
    MacroDef {
        name: "dumb_backtranslate",
        arity: Arity::Exactly(1),
        flags: &[LIB, TABLE],
        handler: dumb_backtranslate,
    },
    MacroDef {
        name: "mutate",
        arity: Arity::Exactly(3),
        flags: &[LIB],
        handler: mutate,
    },
    MacroDef {
        name: "use_template",
        arity: Arity::AtLeast(1),
        flags: &[LIB, RECURSIVE],
        handler: use_template,
    },
];

fn referenced(
    call: &MacroCall,
    scope: &mut CompilationScope<'_>,
) -> Result<Rc<CompiledBlock>, DiagnosticError> {
    scope.resolve_block(call.doc, call.positional(0), call.flag("lib"))
}

/// Reject a block whose declared type rules the transform out.
fn require_type(
    call: &MacroCall,
    block: &CompiledBlock,
    accepted: &[SeqType],
) -> Result<(), CompileError> {
    match block.metadata.seq_type {
        Some(declared) if declared != SeqType::Unknown && !accepted.contains(&declared) => {
            let names: Vec<&str> = accepted.iter().map(SeqType::as_str).collect();
            Err(CompileError::DeclaredType {
                macro_name: call.invocation.name.clone(),
                title: block.title.clone(),
                declared,
                expected: names.join(" or "),
            })
        }
        _ => Ok(()),
    }
}

fn alphabet_error(block: &CompiledBlock, expected: SeqType, mismatch: Mismatch) -> CompileError {
    CompileError::Alphabet {
        subject: format!("block '{}'", block.title),
        expected,
        found: mismatch.found,
        position: mismatch.position,
    }
}

fn table(call: &MacroCall) -> Result<&'static GeneticCode, CompileError> {
    let name = call.flag("table").unwrap_or(DEFAULT_TABLE);
    tables::genetic_code(name).ok_or_else(|| {
        CompileError::invalid_argument(
            &call.invocation.name,
            format!(
                "unknown genetic code table '{}' (known: {})",
                name,
                tables::table_names().join(", ")
            ),
        )
    })
}

fn include(call: &MacroCall, scope: &mut CompilationScope<'_>) -> Result<String, DiagnosticError> {
    Ok(referenced(call, scope)?.sequence.clone())
}

fn complement(
    call: &MacroCall,
    scope: &mut CompilationScope<'_>,
) -> Result<String, DiagnosticError> {
    let block = referenced(call, scope)?;
    require_type(call, &block, &[SeqType::Dna])?;
    transform::reverse_complement(&block.sequence)
        .map_err(|m| alphabet_error(&block, SeqType::Dna, m).into())
}

fn translate(
    call: &MacroCall,
    scope: &mut CompilationScope<'_>,
) -> Result<String, DiagnosticError> {
    let code = table(call)?;
    let block = referenced(call, scope)?;
    require_type(call, &block, &[SeqType::Dna, SeqType::Rna])?;
    let translation = transform::translate(&block.sequence, code)
        .map_err(|m| alphabet_error(&block, SeqType::Dna, m))?;

    if !translation.dropped.is_empty() {
        scope.warn(
            &call.location,
            format!(
                "length of '{}' ({}) is not a multiple of 3; dropped trailing '{}'",
                block.title,
                block.sequence.chars().count(),
                translation.dropped
            ),
        );
    }
    Ok(translation.protein)
}

fn dumb_backtranslate(
    call: &MacroCall,
    scope: &mut CompilationScope<'_>,
) -> Result<String, DiagnosticError> {
    let code = table(call)?;
    let block = referenced(call, scope)?;
    require_type(call, &block, &[SeqType::Aminos])?;
    transform::dumb_backtranslate(&block.sequence, code)
        .map_err(|m| alphabet_error(&block, SeqType::Aminos, m).into())
}

fn mutate(call: &MacroCall, scope: &mut CompilationScope<'_>) -> Result<String, DiagnosticError> {
    let index = call.positional(1).parse::<usize>().map_err(|_| {
        CompileError::invalid_argument(
            "mutate",
            format!(
                "index '{}' is not a non-negative integer",
                call.positional(1)
            ),
        )
    })?;

    let mut chars = call.positional(2).chars();
    let replacement = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => {
            return Err(CompileError::invalid_argument(
                "mutate",
                format!(
                    "replacement '{}' must be exactly one character",
                    call.positional(2)
                ),
            )
            .into());
        }
    };

    let block = referenced(call, scope)?;
    transform::mutate(&block.sequence, index, replacement).map_err(|length| {
        CompileError::IndexOutOfRange {
            title: block.title.clone(),
            index,
            length,
        }
        .into()
    })
}

fn use_template(
    call: &MacroCall,
    scope: &mut CompilationScope<'_>,
) -> Result<String, DiagnosticError> {
    let (home, template) = scope.resolve_template(call.doc, call.positional(0), call.flag("lib"))?;
    let lines = template
        .instantiate(&call.invocation.positional[1..])
        .map_err(|mismatch| CompileError::TemplateArity {
            name: template.name.clone(),
            expected: mismatch.expected,
            given: mismatch.given,
        })?;

    let has_macros = lines
        .iter()
        .any(|line| matches!(line.kind, LineKind::Macro { .. }));
    if has_macros && !call.invocation.flags.is_set("r") {
        return Err(CompileError::invalid_argument(
            "use_template",
            format!(
                "template '{}' contains macro lines; pass -r to expand them",
                template.name
            ),
        )
        .into());
    }

    // Template bodies resolve against the document that defines them.
    scope.push_frame(Frame::template(
        home,
        template.name.clone(),
        &call.invocation.positional[1..],
    ))?;
    let expanded = scope.expand_lines(home, &template.name, &lines);
    scope.pop_frame();
    Ok(expanded?.sequence)
}
