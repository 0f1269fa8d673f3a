use fastac::block::metadata::SeqType;
use fastac::{Document, LineKind};

fn parse(source: &str) -> Document {
    fastac::parser::Parser::new(source.to_string(), 0)
        .parse()
        .expect("parse failed")
}

fn parse_errors(source: &str) -> Vec<String> {
    match fastac::parser::Parser::new(source.to_string(), 0).parse() {
        Ok(_) => panic!("expected a parse error"),
        Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
    }
}

#[test]
fn blocks_in_source_order() {
    let doc = parse(">first\nACGT\n\n>second\nTTTT\n>third\nGG\n");
    assert_eq!(doc.titles(), vec!["first", "second", "third"]);
    assert_eq!(doc.block("second").unwrap().raw_sequence(), "TTTT");
}

#[test]
fn literal_lines_are_concatenated_without_whitespace() {
    let doc = parse(">seq\n  ACG TTA  \nGG\tCC\n");
    assert_eq!(doc.block("seq").unwrap().raw_sequence(), "ACGTTAGGCC");
}

#[test]
fn line_classification() {
    let doc = parse(">seq\n# dropped\n; kept comment\nACGT\n$include other --lib lib.fa\n");
    let block = doc.block("seq").unwrap();
    assert_eq!(block.lines.len(), 3);
    assert_eq!(block.lines[0].kind, LineKind::Comment("kept comment".into()));
    assert_eq!(block.lines[0].line, 3);
    assert_eq!(block.lines[1].kind, LineKind::Literal("ACGT".into()));
    assert_eq!(
        block.lines[2].kind,
        LineKind::Macro {
            name: "include".into(),
            arguments: "other --lib lib.fa".into()
        }
    );
    assert_eq!(block.macro_count(), 1);
}

#[test]
fn metadata_suffix_is_not_part_of_the_title() {
    let doc = parse(">gfp {\"type\": \"dna\", \"private\": true, \"source\": \"x\"}\nACGT\n");
    let block = doc.block("gfp").expect("title without metadata");
    assert_eq!(block.metadata.seq_type, Some(SeqType::Dna));
    assert!(block.metadata.private);
    assert_eq!(block.metadata.fields["source"], "x");
}

#[test]
fn title_lookup_normalizes_whitespace_but_not_case() {
    let doc = parse(">  my   block  \nACGT\n");
    assert!(doc.block("my block").is_some());
    assert!(doc.block(" my  block ").is_some());
    assert!(doc.block("My Block").is_none());
}

#[test]
fn def_template_moves_block_to_template_namespace() {
    let src = ">promoter_template\nAAAA\n{0}\nCC{1}\n$def_template promoter\n\n>other\nGG\n";
    let doc = parse(src);
    assert_eq!(doc.titles(), vec!["other"]);
    let template = doc.template("promoter").unwrap();
    assert_eq!(template.arity, 2);
    assert_eq!(template.lines.len(), 3);
    assert!(doc.block("promoter_template").is_none());
}

#[test]
fn header_comments_before_first_title_are_allowed() {
    let doc = parse("# library of parts\n\n>a\nAC\n");
    assert_eq!(doc.titles(), vec!["a"]);
}

#[test]
fn content_before_first_title_is_an_error() {
    let errors = parse_errors("ACGT\n>a\nAC\n");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("line 1"), "{}", errors[0]);
}

#[test]
fn malformed_metadata_names_the_line() {
    let errors = parse_errors(">a\nAC\n>b {\"type\": }\nGG\n");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("line 3: malformed metadata"), "{}", errors[0]);
}

#[test]
fn empty_macro_line_is_an_error() {
    let errors = parse_errors(">a\n$   \n");
    assert!(errors[0].contains("no macro name"), "{}", errors[0]);
}

#[test]
fn def_template_without_content_is_an_error() {
    let errors = parse_errors(">a\n; only a comment\n$def_template t\n");
    assert!(errors[0].contains("no preceding block content"), "{}", errors[0]);
}

#[test]
fn def_template_must_be_last() {
    let errors = parse_errors(">a\nAC{0}\n$def_template t\nGG\n");
    assert!(errors[0].contains("must be the last line"), "{}", errors[0]);
}

#[test]
fn def_template_requires_one_name() {
    let errors = parse_errors(">a\nAC\n$def_template\n");
    assert!(errors[0].contains("exactly one template name"), "{}", errors[0]);
}

#[test]
fn non_contiguous_placeholders_fail_at_definition() {
    let errors = parse_errors(">a\nAC{0}{2}\n$def_template t\n");
    assert!(errors[0].contains("non-contiguous"), "{}", errors[0]);
}

#[test]
fn duplicate_titles_are_rejected() {
    let errors = parse_errors(">a\nAC\n>a\nGG\n");
    assert!(errors[0].contains("defined twice"), "{}", errors[0]);
}

#[test]
fn all_errors_are_collected() {
    let errors = parse_errors(">a {oops}\nAC\n>b\n$\n>c {\"type\": \"lipid\"}\n");
    assert_eq!(errors.len(), 3, "{:?}", errors);
}

#[test]
fn spans_point_at_the_line() {
    let src = ">a\nAC\n$include b\n";
    let doc = parse(src);
    let line = &doc.block("a").unwrap().lines[1];
    assert_eq!(&src[line.span.clone()], "$include b");
}

#[test]
fn parse_errors_render_as_error_diagnostics() {
    let src = "ACGT\n>a\nAC\n";
    let errors = fastac::parser::Parser::new(src.to_string(), 3)
        .parse()
        .unwrap_err();
    let diagnostic = errors[0].to_diagnostic();
    assert_eq!(
        diagnostic.severity,
        codespan_reporting::diagnostic::Severity::Error
    );
    assert_eq!(diagnostic.labels[0].file_id, 3);
    assert_eq!(&src[diagnostic.labels[0].range.clone()], "ACGT");
}
