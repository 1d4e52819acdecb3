//! Parsing procedures into syntax trees

use pluto_core::{ParseError, PlutoParser, SyntaxNode, Token, parse_tree};

#[test]
fn test_default_start_rule_is_procedure() {
    let tree = parse_tree("procedure main log 1; end main end procedure", None).unwrap();
    assert_eq!(tree.rule, "procedure_definition");
    assert_eq!(tree.start, 0);
    assert_eq!(tree.end, 44);
    assert!(tree.find("procedure_main_body").is_some());
}

#[test]
fn test_explicit_start_rule() {
    let tree = parse_tree("Speed * 2 + 1", Some("expression")).unwrap();
    assert_eq!(tree.rule, "expression");
    assert_eq!(tree.text(), "Speed*2+1");
}

#[test]
fn test_comments_are_ignored() {
    let source = "procedure /* block\n comment */ main\n  // line comment\n  log 1;\nend main end procedure";
    let tree = parse_tree(source, None).unwrap();
    let body = tree.find("procedure_main_body").unwrap();
    let log = body.find("log_statement").unwrap();
    assert_eq!(log.start, source.find("log 1").unwrap());
}

#[test]
fn test_multi_word_names_stop_at_keywords() {
    let tree = parse_tree("Tank Level of Fuel Tank", Some("expression")).unwrap();
    assert!(tree.pretty().contains("Tank Level"));
    assert!(tree.pretty().contains("Fuel Tank"));
}

#[test]
fn test_names_may_contain_words_of_keyword_phrases() {
    // "absolute time", "reporting data", "until one completes", "end main"
    for name in ["Start time", "Tank data", "Valve one", "Burn end"] {
        let tree = parse_tree(&format!("{name} := 5"), Some("assignment_statement")).unwrap();
        assert_eq!(tree.find("variable_reference").unwrap().text(), name);
    }
}

#[test]
fn test_names_stop_before_whole_keyword_phrases() {
    let tree = parse_tree(
        "procedure main Start time := 5; end main end procedure",
        None,
    )
    .unwrap();
    let body = tree.find("procedure_main_body").unwrap();
    let assignment = body.find("assignment_statement").unwrap();
    assert_eq!(assignment.find("variable_reference").unwrap().text(), "Start time");
}

#[test]
fn test_mission_specific_function_calls_parse() {
    let tree = parse_tree("Check Limit(Level, 2) > 1", Some("expression")).unwrap();
    let name = find_token(&tree, "NONSTANDARD_FUNCTION_NAME").unwrap();
    assert_eq!((name.text.as_str(), name.start), ("Check Limit", 0));
    assert!(find_token(&tree, "STANDARD_FUNCTION_NAME").is_none());
}

fn find_token<'a>(node: &'a SyntaxNode, terminal: &str) -> Option<&'a Token> {
    node.tokens()
        .find(|token| token.terminal == terminal)
        .or_else(|| node.nodes().find_map(|child| find_token(child, terminal)))
}

#[test]
fn test_syntax_error_reports_furthest_position() {
    let err = parse_tree("procedure main log 1 end main end procedure", None).unwrap_err();
    let (offset, line, column, expected, found) = match err {
        pluto_core::PlutoError::Parse(ParseError::Syntax {
            offset,
            line,
            column,
            expected,
            found,
        }) => (offset, line, column, expected, found),
        other => panic!("expected a syntax error, got {other:?}"),
    };
    assert_eq!(offset, 21);
    assert_eq!((line, column), (1, 22));
    assert!(expected.iter().any(|e| e == "\";\""), "{expected:?}");
    assert_eq!(found, "'end'");
}

#[test]
fn test_syntax_error_at_end_of_input() {
    let parser = PlutoParser::new().unwrap();
    let err = parser.parse("procedure main log 1;").unwrap_err();
    assert!(err.to_string().contains("end of input"), "{err}");
}

#[test]
fn test_parser_is_shared_across_threads() {
    let parser = PlutoParser::new().unwrap();
    std::thread::scope(|scope| {
        for n in 0..4 {
            scope.spawn(move || {
                let source = format!("procedure main log {n}; end main end procedure");
                assert!(parser.parse(&source).is_ok());
            });
        }
    });
}
