use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use compiler::{
    CompilationScope, Compilation, DiagnosticError, ErrorKind, MacroRegistry, RenderOptions,
    render,
};

const TEST_SUFFIX: &str = ".test.fa";

#[derive(Debug, Deserialize)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message.
    pub contains: String,

    /// If set, the warning must point at this 1-based line of the source
    /// below the frontmatter.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    #[serde(default)]
    pub description: Option<String>,

    /// Expected rendered output, compared after trimming.
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Substring the compile error must contain.
    #[serde(default)]
    pub expect_error: Option<String>,

    #[serde(default)]
    pub expect_parse_error: bool,

    /// When present (even empty), the warnings must match one for one.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,

    #[serde(default)]
    pub render: RenderOptions,
}

/// Split a `.test.fa` file into its TOML frontmatter and the source below it.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');
    let body = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let body = body
        .strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body);

    let close = body
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;
    let frontmatter = body[..close].trim_end_matches('\r');
    let rest = &body[close + 4..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(frontmatter).map_err(|e| format!("TOML parse error: {}", e))?;
    Ok((config, source))
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    /// `None` on success, the failure reason otherwise.
    pub failure: Option<String>,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_suffix(TEST_SUFFIX))
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path, registry: &MacroRegistry) -> TestResult {
    let failed = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        failure: Some(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => return failed(None, format!("cannot read file: {}", e)),
    };
    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return failed(None, format!("frontmatter error: {}", e)),
    };

    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut scope = CompilationScope::new(registry);
    let result = scope
        .load_source(path.display().to_string(), source, base_dir)
        .and_then(|doc| scope.compile(doc));

    TestResult {
        path: path.to_path_buf(),
        description: config.description.clone(),
        failure: check(&config, result),
    }
}

/// Compare a compile result against the expectations. Returns the reason on mismatch.
fn check(config: &TestConfig, result: Result<Compilation, DiagnosticError>) -> Option<String> {
    if config.expect_parse_error {
        return match result {
            Err(e) if e.kind() == ErrorKind::Parse => None,
            Err(e) => Some(format!("expected a parse error, got: {}", e)),
            Ok(_) => Some("expected a parse error, but parsing succeeded".into()),
        };
    }

    let compilation = match (&config.expect_error, result) {
        (Some(expected), Err(e)) => {
            let message = e.to_string();
            return if message.contains(expected.as_str()) {
                None
            } else {
                Some(format!(
                    "expected error containing \"{}\", got: {}",
                    expected, message
                ))
            };
        }
        (Some(expected), Ok(_)) => {
            return Some(format!(
                "expected error containing \"{}\", but compilation succeeded",
                expected
            ));
        }
        (None, Err(e)) => return Some(format!("unexpected error: {}", e)),
        (None, Ok(compilation)) => compilation,
    };

    if let Some(expected) = &config.expect_output {
        let actual = render(&compilation.blocks, &config.render);
        if actual.trim() != expected.trim() {
            return Some(format!(
                "output mismatch\n  expected:\n{}\n  actual:\n{}",
                indent(expected.trim()),
                indent(actual.trim())
            ));
        }
    }

    match &config.expect_warnings {
        Some(expected) => check_warnings(&compilation.warnings, expected),
        None => None,
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn check_warnings(actual: &[DiagnosticError], expected: &[ExpectedWarning]) -> Option<String> {
    let actual: Vec<&DiagnosticError> = actual.iter().filter(|d| d.is_warning).collect();

    if actual.len() != expected.len() {
        let listed = if actual.is_empty() {
            "    (none)".to_string()
        } else {
            actual
                .iter()
                .map(|w| format!("    - {}", w))
                .collect::<Vec<_>>()
                .join("\n")
        };
        return Some(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{}",
            expected.len(),
            actual.len(),
            listed
        ));
    }

    for (i, (warning, expected)) in actual.iter().zip(expected).enumerate() {
        let message = warning.to_string();
        if !message.contains(&expected.contains) {
            return Some(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, message
            ));
        }

        if let Some(line) = expected.line {
            match &warning.location {
                Some(location) if location.line == line => {}
                Some(location) => {
                    return Some(format!(
                        "warning[{}]: expected on line {}, but it is on line {}",
                        i, line, location.line
                    ));
                }
                None => {
                    return Some(format!(
                        "warning[{}]: expected on line {}, but it has no location",
                        i, line
                    ));
                }
            }
        }
    }

    None
}

/// `.test.fa` files grouped by sub-directory relative to `root`, sorted.
/// Files directly in `root` have the empty category.
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
            continue;
        }
        let is_test = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(TEST_SUFFIX));
        if is_test {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (category, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(category), files.len());
    }
}

/// ANSI styling for the report, disabled by `--no-color`.
#[derive(Clone, Copy)]
struct Style {
    color: bool,
}

impl Style {
    fn paint(self, text: &str, code: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    fn pass(self) -> String {
        self.paint("PASS", "32")
    }

    fn fail(self) -> String {
        self.paint("FAIL", "31")
    }

    fn bold(self, text: &str) -> String {
        self.paint(text, "1")
    }
}

/// Pick the categories to run. Unknown names are reported and skipped.
fn select<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a [PathBuf]> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
    }

    let mut selected = BTreeMap::new();
    for name in requested {
        let name = name.trim_matches('/');
        let nested = format!("{}/", name);
        let before = selected.len();
        for (category, files) in all {
            if category == name || category.starts_with(&nested) {
                selected.insert(category.as_str(), files.as_slice());
            }
        }
        if selected.len() == before {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                name,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    selected
}

/// Run one `.test.fa` file or every one under a directory, optionally
/// restricted to categories. Returns the process exit code.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let style = Style { color: !no_color };
    let registry = MacroRegistry::standard();

    let all = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover_categorized(path)
    };
    if all.is_empty() {
        eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
        return 1;
    }

    let selected = select(&all, categories);
    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures = Vec::new();
    for (category, files) in &selected {
        if !path.is_file() {
            eprintln!();
            eprintln!("{}", style.bold(category_label(category)));
        }
        for file in *files {
            let result = run_single_test(file, &registry);
            if result.failure.is_none() {
                passed += 1;
                eprintln!("  {}  {}", style.pass(), result.label());
            } else {
                eprintln!("  {}  {}", style.fail(), result.label());
                failures.push(result);
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for result in &failures {
            eprintln!();
            eprintln!("  --- {} ---", result.path.display());
            for line in result.failure.iter().flat_map(|reason| reason.lines()) {
                eprintln!("  {}", line);
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!(
            "test result: {}. {} passed, 0 failed",
            style.paint("ok", "32"),
            passed
        );
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            style.paint("FAILED", "31"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(content: &str) -> Option<String> {
        let (config, source) = parse_test_file(content).unwrap();
        let registry = MacroRegistry::standard();
        let mut scope = CompilationScope::new(&registry);
        let result = scope
            .load_source("case.test.fa", source, PathBuf::from("."))
            .and_then(|doc| scope.compile(doc));
        check(&config, result)
    }

    #[test]
    fn splits_frontmatter_from_source() {
        let (config, source) =
            parse_test_file("---\ndescription = \"d\"\n[render]\ncase = \"upper\"\n---\n>a\nAC\n")
                .unwrap();
        assert_eq!(config.description.as_deref(), Some("d"));
        assert_eq!(config.render.case, compiler::LetterCase::Upper);
        assert_eq!(source, ">a\nAC\n");
    }

    #[test]
    fn frontmatter_is_required() {
        assert!(parse_test_file(">a\nAC\n").is_err());
        assert!(parse_test_file("---\ndescription = \"d\"\n>a\n").is_err());
        assert!(parse_test_file("---\nunknown = 1\n---\n>a\n").is_err());
    }

    #[test]
    fn output_expectation() {
        assert_eq!(run("---\nexpect_output = \"> a\\nac\"\n---\n>a\nAC\n"), None);
        let failure = run("---\nexpect_output = \"> a\\ngg\"\n---\n>a\nAC\n").unwrap();
        assert!(failure.starts_with("output mismatch"), "{}", failure);
    }

    #[test]
    fn error_expectations() {
        assert_eq!(
            run("---\nexpect_error = \"circular reference\"\n---\n>a\n$include a\n"),
            None
        );
        assert_eq!(run("---\nexpect_parse_error = true\n---\n>a {x}\nAC\n"), None);
        assert!(run("---\nexpect_parse_error = true\n---\n>a\nAC\n").is_some());
    }

    #[test]
    fn warning_expectations() {
        let source = ">a\nATGG\n>b\n$translate a\n";
        let ok = format!(
            "---\nexpect_warnings = [{{ contains = \"not a multiple of 3\", line = 4 }}]\n---\n{}",
            source
        );
        assert_eq!(run(&ok), None);

        let wrong_line = format!(
            "---\nexpect_warnings = [{{ contains = \"multiple\", line = 2 }}]\n---\n{}",
            source
        );
        assert!(run(&wrong_line).unwrap().contains("line 2"));

        let none = format!("---\nexpect_warnings = []\n---\n{}", source);
        assert!(run(&none).unwrap().starts_with("expected 0 warning(s), got 1"));
    }
}
