mod test_runner;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::info;
use tracing_subscriber::EnvFilter;

use compiler::library::Library;
use fastac::Document;
use compiler::{
    CompilationScope, CompileError, DiagnosticError, LetterCase, MacroRegistry, RenderOptions,
    render,
};

const SUBCOMMANDS: &[&str] = &["build", "test", "help"];

#[derive(Parser)]
#[command(name = "fastac", version, about = "Compiler for extended FASTA")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile an extended FASTA file into plain multi-FASTA
    Build(BuildArgs),

    /// Run .test.fa test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Source file to compile
    file: PathBuf,

    /// Write output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Characters per sequence line (0 disables wrapping)
    #[arg(short = 'l', long = "line-length", default_value_t = 50)]
    line_length: usize,

    /// Letter case of the output sequences
    #[arg(short, long, default_value_t = LetterCase::Lower)]
    case: LetterCase,

    /// Keep JSON metadata on title lines
    #[arg(long)]
    meta: bool,

    /// Also emit blocks marked private
    #[arg(long)]
    include_private: bool,

    /// Emit only the last block
    #[arg(long)]
    last_block_only: bool,

    /// Compile without writing output (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// List the blocks and templates in the file and exit
    #[arg(long)]
    list_blocks: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.fa file or directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    init_logging();

    // `fastac file.fa` is shorthand for `fastac build file.fa`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args
        .iter()
        .skip(1)
        .position(|a| !a.starts_with('-'))
        .map(|i| i + 1)
    {
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "build".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    match cli.command {
        Command::Build(build_args) => {
            let exit_code = build(build_args, cli.no_color);
            process::exit(exit_code);
        }
        Command::Test(test_args) => {
            if test_args.list_categories {
                test_runner::list_categories(&test_args.path);
                return;
            }
            let exit_code =
                test_runner::run_tests(&test_args.path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build(args: BuildArgs, no_color: bool) -> i32 {
    let reporter = Reporter::new(no_color);
    let registry = MacroRegistry::standard();
    let mut scope = CompilationScope::new(&registry);

    let doc = match scope.load_file(&args.file) {
        Ok(doc) => doc,
        Err(error) => {
            reporter.emit(scope.library(), &error);
            return 1;
        }
    };

    if args.list_blocks {
        if let Some(document) = scope.library().document(doc) {
            list_blocks(&document);
        }
        return 0;
    }

    let compilation = match scope.compile(doc) {
        Ok(compilation) => compilation,
        Err(error) => {
            for warning in scope.warnings() {
                reporter.emit(scope.library(), warning);
            }
            reporter.emit(scope.library(), &error);
            return 1;
        }
    };
    for warning in &compilation.warnings {
        reporter.emit(scope.library(), warning);
    }

    if args.check {
        eprintln!(
            "ok: {} compiled {} block(s)",
            args.file.display(),
            compilation.blocks.len()
        );
        return 0;
    }

    let options = RenderOptions {
        wrap_width: args.line_length,
        case: args.case,
        plain: !args.meta,
        include_private: args.include_private,
        last_block_only: args.last_block_only,
    };
    let output = render(&compilation.blocks, &options);

    match &args.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &output) {
                eprintln!("error: cannot write '{}': {}", path.display(), e);
                return 1;
            }
            info!(path = %path.display(), bytes = output.len(), "wrote output");
        }
        None => print!("{}", output),
    }
    0
}

fn list_blocks(document: &Document) {
    for block in &document.blocks {
        let mut notes = Vec::new();
        if let Some(seq_type) = block.metadata.seq_type {
            notes.push(seq_type.to_string());
        }
        if block.metadata.private {
            notes.push("private".to_string());
        }
        if block.macro_count() > 0 {
            notes.push(format!("{} macro(s)", block.macro_count()));
        }
        if notes.is_empty() {
            println!("{}", block.title);
        } else {
            println!("{} ({})", block.title, notes.join(", "));
        }
    }
    for name in document.template_names() {
        if let Some(template) = document.template(name) {
            println!("$template {} ({} argument(s))", name, template.arity);
        }
    }
}

/// Renders diagnostics against every file the compilation loaded.
struct Reporter {
    writer: StandardStream,
    config: term::Config,
}

impl Reporter {
    fn new(no_color: bool) -> Self {
        let choice = if no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Reporter {
            writer: StandardStream::stderr(choice),
            config: term::Config::default(),
        }
    }

    fn emit(&self, library: &Library, error: &DiagnosticError) {
        // Library ids are assigned in load order, as are SimpleFiles ids.
        let mut files = SimpleFiles::new();
        for file in library.files() {
            files.add(file.path.clone(), file.text.clone());
        }

        if let CompileError::Parse { errors, .. } = &error.error {
            for parse_error in errors {
                self.write(&files, &parse_error.to_diagnostic());
            }
            if let Some(location) = &error.location {
                eprintln!("note: loaded from {}:{}", location.path, location.line);
            }
            return;
        }

        let severity = if error.is_warning {
            Severity::Warning
        } else {
            Severity::Error
        };
        match &error.location {
            Some(location) if library.files().get(location.source_id).is_some() => {
                let diagnostic = Diagnostic::new(severity)
                    .with_message(error.error.to_string())
                    .with_labels(vec![Label::primary(
                        location.source_id,
                        location.span.clone(),
                    )])
                    .with_notes(vec![format!("in '{}'", location.title)]);
                self.write(&files, &diagnostic);
            }
            _ => {
                let prefix = if error.is_warning { "warning" } else { "error" };
                eprintln!("{}: {}", prefix, error);
            }
        }
    }

    fn write(&self, files: &SimpleFiles<String, String>, diagnostic: &Diagnostic<usize>) {
        let _ = term::emit_to_write_style(&mut self.writer.lock(), &self.config, files, diagnostic);
    }
}

