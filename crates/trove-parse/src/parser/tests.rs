use crate::{
    Document, ErrorCategory, Options, ParseError, ParseErrorKind, Table, TokenKind, Value, parse,
    parse_as_pairs,
};
use trove_testhelpers::test;

fn doc(source: &str) -> Document {
    match parse(source) {
        Ok(doc) => doc,
        Err(err) => panic!("{:?} failed: {}", source, err),
    }
}

/// Parse and render the root table in notation form.
fn render(source: &str) -> String {
    doc(source).root.to_string()
}

fn error(source: &str) -> ParseError {
    match parse(source) {
        Ok(doc) => panic!("{:?} parsed to {}", source, doc.root),
        Err(err) => err,
    }
}

#[test]
fn test_empty_document() {
    assert_eq!(render(""), "{}");
    assert_eq!(render("\n\n  # only a comment\n"), "{}");
}

#[test]
fn test_flat_map() {
    insta::assert_snapshot!(
        render("name: demo\nport = 8080\nratio: 0.5\nenabled: TRUE\nnothing: nil"),
        @"{name: demo port: 8080 ratio: 0.5 enabled: true nothing: nil}"
    );
}

#[test]
fn test_same_line_entries() {
    assert_eq!(render("a: 1, b: 2 c: 3"), "{a: 1 b: 2 c: 3}");
}

#[test]
fn test_sequence_document() {
    assert_eq!(render("1 two \"three\"\n4.0"), r#"{1 two three 4.0}"#);
}

#[test]
fn test_nested_sections() {
    insta::assert_snapshot!(
        render("server:\n  host: localhost\n  tls:\n    cert: a.pem\n  port: 443\nname: x"),
        @"{server: {host: localhost tls: {cert: a.pem} port: 443} name: x}"
    );
}

#[test]
fn test_sibling_indentation_must_match() {
    let d = doc("x:\n  y: 1\n  z: 2");
    assert_eq!(d.get("x.y"), Some(Value::Int(1)));
    assert_eq!(d.get("x.z"), Some(Value::Int(2)));

    let err = error("x:\n  y: 1\n z: 2");
    assert!(matches!(err.kind, ParseErrorKind::BadIndentation));
    assert_eq!(err.category(), ErrorCategory::Structural);
    assert_eq!(err.line, 3);
}

#[test]
fn test_unexpected_deeper_line() {
    let err = error("a: 1\n  b: 2");
    assert!(matches!(err.kind, ParseErrorKind::BadIndentation));
    assert_eq!(err.line, 2);
}

#[test]
fn test_indented_document() {
    assert_eq!(render("\n    a: 1\n    b: 2\n"), "{a: 1 b: 2}");

    let err = error("  a: 1\nb: 2");
    assert!(matches!(err.kind, ParseErrorKind::BadIndentation));
}

#[test]
fn test_empty_values_are_tables() {
    assert_eq!(render("a:\nb: 1"), "{a: {} b: 1}");
    assert_eq!(render("a:"), "{a: {}}");
    assert_eq!(render("a: {}\nb: []"), "{a: {} b: {}}");
}

#[test]
fn test_bracket_tables() {
    assert_eq!(render("point: {x: 1, y: -2}"), "{point: {x: 1 y: -2}}");
    assert_eq!(render("list: [1 [2 3] {k: v}]"), "{list: {1 {2 3} {k: v}}}");
    assert_eq!(
        render("a: {\n  b: 1\n  c: [\n    1\n    2\n  ]\n}"),
        "{a: {b: 1 c: {1 2}}}"
    );
}

#[test]
fn test_section_inside_bracket() {
    assert_eq!(render("a: {b:\n    c: 1\n  d: 2}"), "{a: {b: {c: 1} d: 2}}");
    assert_eq!(render("a: {\n  b:\n  c: 1\n}"), "{a: {b: {} c: 1}}");
}

#[test]
fn test_mismatched_bracket() {
    let err = error("a: {b: 1]");
    assert!(matches!(err.kind, ParseErrorKind::MismatchedBracket));
    assert_eq!(err.span.start, 8);
}

#[test]
fn test_unclosed_bracket() {
    let err = error("a: [1 2\nb: 3");
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));

    let err = error("a: [1 2\n  3");
    assert!(matches!(err.kind, ParseErrorKind::UnclosedBracket));
    assert_eq!(err.line, 1);
    assert_eq!(err.span.start, 3);
}

#[test]
fn test_stray_closer() {
    let err = error("a: 1 }");
    assert!(matches!(
        err.kind,
        ParseErrorKind::UnexpectedToken {
            found: TokenKind::Close,
            ..
        }
    ));
}

#[test]
fn test_duplicate_keys_coalesce() {
    let d = doc("a: 1\na: 2");
    assert_eq!(d.get("a").unwrap().to_string(), "{1 2}");

    let d = doc("a: 1\na: 2\na: 3");
    assert_eq!(d.get("a").unwrap().to_string(), "{1 2 3}");
    assert_eq!(d.get("a[3]"), Some(Value::Int(3)));
}

#[test]
fn test_duplicate_keys_in_brackets() {
    assert_eq!(render("p: {x: 1 x: 2}"), "{p: {x: {1 2}}}");
}

#[test]
fn test_pairs_mode() {
    let d = parse_as_pairs("a: 1\na: 2").unwrap();
    assert_eq!(d.root.to_string(), "{a 1 a 2}");

    let d = parse_as_pairs("outer:\n  k: v\n  k: w\nlist: {x: 1}").unwrap();
    assert_eq!(d.root.to_string(), "{outer {k v k w} list {x 1}}");
}

#[test]
fn test_pairs_mode_keeps_sequences() {
    let d = parse_as_pairs("1 2 3").unwrap();
    assert_eq!(d.root.to_string(), "{1 2 3}");
}

#[test]
fn test_invalid_key() {
    let err = error("\"quoted\": 1");
    assert!(matches!(err.kind, ParseErrorKind::InvalidKey));
    assert_eq!(err.category(), ErrorCategory::KeyType);

    let err = error("a: 1\n[x]: 2");
    assert!(matches!(err.kind, ParseErrorKind::InvalidKey));
    assert_eq!(err.line, 2);
}

#[test]
fn test_numeric_keys_are_strings() {
    let d = doc("1: one\n0x10: sixteen");
    assert_eq!(d.get("1").as_ref().and_then(Value::as_str), Some("one"));
    assert_eq!(
        d.get("0x10").as_ref().and_then(Value::as_str),
        Some("sixteen")
    );
}

#[test]
fn test_missing_value_separator() {
    let err = error("a: 1 b");
    assert!(matches!(
        err.kind,
        ParseErrorKind::UnexpectedToken {
            expected: "':' after key",
            found: TokenKind::Eof
        }
    ));
}

#[test]
fn test_list_of_sections() {
    insta::assert_snapshot!(
        render("-\n  name: a\n  size: 1\n-\n  name: b\n-\n- plain"),
        @"{{name: a size: 1} {name: b} {} plain}"
    );
}

#[test]
fn test_list_of_sections_as_value() {
    insta::assert_snapshot!(
        render("items:\n- \n  x: 1\n- \n  x: 2\ncount: 2"),
        @"{items: {{x: 1} {x: 2}} count: 2}"
    );
    assert_eq!(
        render("outer:\n  items:\n  --\n    a: 1\n  after: 1"),
        "{outer: {items: {{a: 1}} after: 1}}"
    );
}

#[test]
fn test_list_of_sections_as_deeper_value() {
    assert_eq!(render("items:\n  -\n    a: 1\n  -\n"), "{items: {{a: 1} {}}}");
}

#[test]
fn test_list_element_rejects_trailing_tokens() {
    let err = error("- a b");
    assert!(matches!(
        err.kind,
        ParseErrorKind::UnexpectedToken {
            found: TokenKind::Atom,
            ..
        }
    ));
}

#[test]
fn test_cycle_through_tags() {
    let d = doc("a: &1 {next: *2}\nb: &2 {next: *1}");
    let a = d.get("a").unwrap();
    let b = d.get("b").unwrap();
    let a_table = a.as_table().unwrap();

    let next_next = d.get("a.next.next").unwrap();
    assert!(next_next.as_table().unwrap().ptr_eq(a_table));
    assert!(d.get("a.next").unwrap().as_table().unwrap().ptr_eq(b.as_table().unwrap()));
    assert_eq!(d.refs.len(), 2);
    assert!(d.tag(1).unwrap().ptr_eq(a_table));

    let mut refs = d.refs;
    refs.release();
    assert!(a_table.is_empty());
}

#[test]
fn test_back_reference_shares_table() {
    let d = doc("base: &a0\n  x: 1\ncopy: *A0");
    let base = d.get("base").unwrap();
    let copy = d.get("copy").unwrap();
    assert!(base.as_table().unwrap().ptr_eq(copy.as_table().unwrap()));
    assert_eq!(d.get("copy.x"), Some(Value::Int(1)));
}

#[test]
fn test_tagged_forms() {
    let d = doc("a: &1\nb: &2 [1 2]\nc: &3\n- x");
    assert!(d.get("a").unwrap().as_table().unwrap().is_empty());
    assert_eq!(d.get("b").unwrap().to_string(), "{1 2}");
    assert_eq!(d.get("c").unwrap().to_string(), "{x}");
    assert!(d.tag(3).unwrap().ptr_eq(d.get("c").unwrap().as_table().unwrap()));

    let err = error("a: &1 5");
    assert!(matches!(
        err.kind,
        ParseErrorKind::UnexpectedToken {
            expected: "a table",
            ..
        }
    ));
}

#[test]
fn test_anonymous_tags() {
    let d = doc("a: &0 {x: 1}\nb: &0 {x: 1}");
    assert!(d.refs.is_empty());
    let a = d.get("a").unwrap();
    let b = d.get("b").unwrap();
    assert!(!a.as_table().unwrap().ptr_eq(b.as_table().unwrap()));
    assert_eq!(a, b);

    let err = error("a: *0");
    assert!(matches!(err.kind, ParseErrorKind::AnonymousReference));
}

#[test]
fn test_unresolved_reference() {
    let err = error("x: *1");
    assert!(matches!(err.kind, ParseErrorKind::Unresolved(id) if id.value() == 1));
    assert_eq!(err.category(), ErrorCategory::Reference);
    assert_eq!(err.to_string(), "Line 1 : unresolved reference *1");
}

#[test]
fn test_unresolved_reports_first_reference() {
    let err = error("a: *2\nb: *1\nc: *2\nd: &2 {}");
    assert!(matches!(err.kind, ParseErrorKind::Unresolved(id) if id.value() == 1));
    assert_eq!(err.line, 2);
}

#[test]
fn test_duplicate_tag() {
    let err = error("a: &1 {}\nb: &1 {}");
    assert!(matches!(err.kind, ParseErrorKind::DuplicateTag(id) if id.value() == 1));
    assert_eq!(err.line, 2);

    let err = error("a: *1\nb: &1 {}\nc: &1 {}");
    assert!(matches!(err.kind, ParseErrorKind::DuplicateTag(_)));
    assert_eq!(err.line, 3);
}

#[test]
fn test_id_out_of_range() {
    let err = error("a: &ffffffffffffffff {}");
    assert!(matches!(err.kind, ParseErrorKind::IdOutOfRange));
    let err = error("a: *123456789abcdef01");
    assert!(matches!(err.kind, ParseErrorKind::IdOutOfRange));
}

#[test]
fn test_converter_builds_pair() {
    assert_eq!(render("v: $vec [1 2]"), "{v: {vec {1 2}}}");
    assert_eq!(render("v: $color red"), "{v: {color red}}");
    assert_eq!(
        render("v: $point\n  x: 1\n  y: 2"),
        "{v: {point {x: 1 y: 2}}}"
    );
    assert_eq!(render("v: $outer $inner 1"), "{v: {outer {inner 1}}}");
}

#[test]
fn test_converter_needs_name() {
    let err = error("v: $ [1]");
    assert!(matches!(err.kind, ParseErrorKind::ExpectedConverterName));
    let err = error("v: $\"quoted\" 1");
    assert!(matches!(err.kind, ParseErrorKind::ExpectedConverterName));
}

#[test]
fn test_transform_replaces_value() {
    let d = Options::new()
        .transform(|table| {
            let items = table.items();
            match items.first().and_then(Value::as_str) {
                Some("sum") => Ok(Value::Int(
                    items[1]
                        .as_table()
                        .map(|t| t.items().iter().filter_map(Value::as_int).sum::<i64>())
                        .unwrap_or_default(),
                )),
                _ => Ok(Value::Table(table)),
            }
        })
        .parse("total: $sum [1 2 3]\nraw: [4 5]\nplain: {a: 1}")
        .unwrap();
    assert_eq!(d.get("total"), Some(Value::Int(6)));
    assert_eq!(d.get("raw").unwrap().to_string(), "{4 5}");
    assert_eq!(d.get("plain.a"), Some(Value::Int(1)));
}

#[test]
fn test_transform_invocation_counts() {
    let mut seen = Vec::new();
    Options::new()
        .transform(|table| {
            seen.push(table.to_string());
            Ok(Value::Table(table))
        })
        .parse("plain: {x: 1}\nsection:\n  y: 2\nbracket: [1 2]\nconv: $name {z: 3}")
        .unwrap();
    assert_eq!(seen, vec!["{1 2}", "{name {z: 3}}"]);
}

#[test]
fn test_transform_error_aborts() {
    let err = Options::new()
        .transform(|_| Err("unknown converter".into()))
        .parse("a: 1\nb: $nope 2")
        .unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::Transform(_)));
    assert_eq!(err.category(), ErrorCategory::Hook);
    assert_eq!(err.to_string(), "Line 2 : unknown converter");
}

#[test]
fn test_tag_keeps_table_before_transform() {
    let d = Options::new()
        .transform(|table| Ok(Value::Int(table.len() as i64)))
        .parse("a: &1 [x y]\nb: *1")
        .unwrap();
    assert_eq!(d.get("a"), Some(Value::Int(2)));
    assert_eq!(d.get("b").unwrap().to_string(), "{x y}");
}

#[test]
fn test_seed_table() {
    let seed = Table::from_entries([("existing", Value::Int(1))]);
    let d = Options::new()
        .seed(seed.clone())
        .parse("existing: 2\nadded: 3")
        .unwrap();
    assert!(d.root.as_table().unwrap().ptr_eq(&seed));
    assert_eq!(seed.get("existing").unwrap().to_string(), "{1 2}");
    assert_eq!(seed.get("added"), Some(Value::Int(3)));
}

#[test]
fn test_depth_limit() {
    let ok = Options::new().max_depth(2).parse("a: {b: {c: 1}}");
    assert!(ok.is_ok());

    let err = Options::new()
        .max_depth(2)
        .parse("a: {b: {c: {}}}")
        .unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::TooDeep(2)));

    let err = Options::new()
        .max_depth(1)
        .parse("a: $x $y 1")
        .unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::TooDeep(1)));
}

#[test]
fn test_section_depth_limit() {
    let d = Options::new().max_depth(2).parse("a:\n b:\n  c: 1").unwrap();
    assert_eq!(d.get("a.b.c"), Some(Value::Int(1)));

    let err = Options::new()
        .max_depth(2)
        .parse("a:\n b:\n  c:\n   d: 1")
        .unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::TooDeep(2)));
    assert_eq!(err.to_string(), "Line 4 : nesting deeper than 2 levels");
}

#[test]
fn test_default_depth_limit() {
    let deep = "[".repeat(300) + &"]".repeat(300);
    let err = error(&deep);
    assert!(matches!(err.kind, ParseErrorKind::TooDeep(256)));

    let fine = "[".repeat(200) + &"]".repeat(200);
    assert!(parse(&fine).is_ok());

    let mut sections = String::new();
    for depth in 0..255 {
        sections.push_str(&" ".repeat(depth));
        sections.push_str("k:\n");
    }
    sections.push_str(&" ".repeat(255));
    sections.push_str("k: 1");
    assert!(parse(&sections).is_ok());
}

#[test]
fn test_lex_errors_have_lines() {
    let err = error("a: 1\nb: \"open");
    assert!(matches!(err.kind, ParseErrorKind::Lex(_)));
    assert_eq!(err.category(), ErrorCategory::Lexical);
    assert_eq!(err.to_string(), "Line 2 : unterminated string");
}

#[test]
fn test_invalid_escape_location() {
    let err = error("a: 1\nb: \"x\\qy\"");
    assert!(matches!(&err.kind, ParseErrorKind::InvalidEscape(seq) if seq == "\\q"));
    assert_eq!(err.line, 2);
    assert_eq!(err.span.start, 10);
}

#[test]
fn test_invalid_utf8() {
    let err = parse(b"a: 1\nb: \xff".as_slice()).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::Lex(_)));
    assert_eq!(err.line, 2);
}

#[test]
fn test_bytes_input() {
    let d = parse(b"a: 1".as_slice()).unwrap();
    assert_eq!(d.get("a"), Some(Value::Int(1)));
}

#[test]
fn test_error_clears_cycles() {
    let seed = Table::new();
    let err = Options::new()
        .seed(seed.clone())
        .parse("a: &1 {me: *1}\nb: *2")
        .unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::Unresolved(_)));
    let a = seed.get("a").unwrap();
    assert!(a.as_table().unwrap().is_empty());
}

#[test]
fn test_float_words_in_documents() {
    let d = doc("x: inf\ny: nan\nz: info");
    assert_eq!(d.get("x"), Some(Value::Float(f64::INFINITY)));
    assert!(d.get("y").and_then(|v| v.as_float()).is_some_and(f64::is_nan));
    assert_eq!(d.get("z"), Some(Value::from("info")));
}

#[test]
fn test_comments_and_commas() {
    assert_eq!(
        render("# header\na: 1 # trailing\n\n# between\nb: [1, 2,]"),
        "{a: 1 b: {1 2}}"
    );
}
