use std::collections::BTreeSet;
use std::ops::Range;

use crate::block::{Line, LineKind};

/// A block body captured by `$def_template <name>`.
/// Templates live in their own namespace and are never rendered directly.
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    /// Body lines with `{0}`, `{1}`, ... placeholders left verbatim.
    pub lines: Vec<Line>,
    /// Number of distinct placeholders. Indices always cover `0..arity`.
    pub arity: usize,
    pub span: Range<usize>,
    /// 1-based line number of the record's title line.
    pub line: usize,
}

/// Argument count given to a template does not match its placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArityMismatch {
    pub expected: usize,
    pub given: usize,
}

impl Template {
    /// Capture a template, checking that its placeholder indices are contiguous.
    pub fn new(
        name: String,
        lines: Vec<Line>,
        span: Range<usize>,
        line: usize,
    ) -> Result<Self, String> {
        let mut indices = BTreeSet::new();
        for body_line in &lines {
            indices.extend(placeholders(line_text(&body_line.kind)));
        }

        if let Some(missing) = (0..indices.len()).find(|i| !indices.contains(i)) {
            let found: Vec<String> = indices.iter().map(|i| format!("{{{}}}", i)).collect();
            return Err(format!(
                "template '{}' has non-contiguous placeholders {}: {{{}}} is missing",
                name,
                found.join(", "),
                missing
            ));
        }

        Ok(Template {
            name,
            arity: indices.len(),
            lines,
            span,
            line,
        })
    }

    /// Substitute positional arguments into every placeholder.
    ///
    /// Substitution is textual. Literal lines are stripped of whitespace
    /// again afterwards; macro lines keep their raw argument text so they
    /// can be expanded by the caller.
    pub fn instantiate(&self, arguments: &[String]) -> Result<Vec<Line>, ArityMismatch> {
        if arguments.len() != self.arity {
            return Err(ArityMismatch {
                expected: self.arity,
                given: arguments.len(),
            });
        }

        Ok(self
            .lines
            .iter()
            .map(|body_line| {
                let kind = match &body_line.kind {
                    LineKind::Literal(text) => LineKind::Literal(
                        substitute(text, arguments)
                            .chars()
                            .filter(|c| !c.is_whitespace())
                            .collect(),
                    ),
                    LineKind::Macro { name, arguments: raw } => LineKind::Macro {
                        name: name.clone(),
                        arguments: substitute(raw, arguments),
                    },
                    LineKind::Comment(text) => LineKind::Comment(substitute(text, arguments)),
                };
                Line {
                    kind,
                    line: body_line.line,
                    span: body_line.span.clone(),
                }
            })
            .collect())
    }
}

fn line_text(kind: &LineKind) -> &str {
    match kind {
        LineKind::Literal(text) | LineKind::Comment(text) => text,
        LineKind::Macro { arguments, .. } => arguments,
    }
}

/// Scan `{digits}` placeholders in a piece of text.
pub fn placeholders(text: &str) -> BTreeSet<usize> {
    let mut found = BTreeSet::new();
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let inner = &after[..close];
                if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(index) = inner.parse::<usize>() {
                        found.insert(index);
                    }
                    rest = &after[close + 1..];
                } else {
                    rest = after;
                }
            }
            None => break,
        }
    }
    found
}

/// Replace `{i}` with `arguments[i]`; placeholders beyond the arguments stay as-is.
pub fn substitute(text: &str, arguments: &[String]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let inner = &after[..close];
            if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let index = inner.parse::<usize>().ok()?;
            arguments.get(index).map(|arg| (arg, close))
        });
        match replaced {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(text: &str, line: usize) -> Line {
        Line {
            kind: LineKind::Literal(text.to_string()),
            line,
            span: 0..0,
        }
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn scans_placeholders() {
        let found: Vec<usize> = placeholders("AC{0}GT{1}{0}{x}{}{12").into_iter().collect();
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn substitution_is_textual() {
        assert_eq!(
            substitute("AA{0}CC{1}GG{0}", &args(&["t", "u"])),
            "AAtCCuGGt"
        );
        assert_eq!(substitute("{json}{2}", &args(&["a"])), "{json}{2}");
    }

    #[test]
    fn arity_counts_distinct_placeholders() {
        let template = Template::new(
            "t".into(),
            vec![literal("AA{0}", 2), literal("{1}CC{0}", 3)],
            0..0,
            1,
        )
        .unwrap();
        assert_eq!(template.arity, 2);
    }

    #[test]
    fn non_contiguous_placeholders_are_rejected() {
        let err = Template::new("gap".into(), vec![literal("{0}{2}", 2)], 0..0, 1).unwrap_err();
        assert!(err.contains("{1} is missing"), "{}", err);
    }

    #[test]
    fn instantiate_requires_exact_arity() {
        let template =
            Template::new("t".into(), vec![literal("AA{0}{1}", 2)], 0..0, 1).unwrap();
        assert_eq!(
            template.instantiate(&args(&["c"])).unwrap_err(),
            ArityMismatch { expected: 2, given: 1 }
        );
        assert_eq!(
            template.instantiate(&args(&["c", "g", "t"])).unwrap_err(),
            ArityMismatch { expected: 2, given: 3 }
        );
        let lines = template.instantiate(&args(&["c", "g"])).unwrap();
        assert_eq!(lines[0].kind, LineKind::Literal("AAcg".into()));
    }

    #[test]
    fn instantiated_literals_drop_whitespace() {
        let template = Template::new("t".into(), vec![literal("A{0}", 2)], 0..0, 1).unwrap();
        let lines = template.instantiate(&args(&["c g"])).unwrap();
        assert_eq!(lines[0].kind, LineKind::Literal("Acg".into()));
    }
}
