//! Parser edge cases and error tests.

use yarn_dialogue::{
    AssignOp, Error, Statement, StatementKind, format_expr, parse, parse_expression, parse_str,
    tokenize,
};

fn kinds(input: &str) -> Vec<StatementKind> {
    parse_str(input)
        .expect("parse failed")
        .into_iter()
        .map(|s| s.kind)
        .collect()
}

fn text(s: &str) -> Statement {
    Statement {
        kind: StatementKind::Text(s.into()),
        line: 0,
    }
}

fn without_lines(statements: Vec<Statement>) -> Vec<Statement> {
    statements
        .into_iter()
        .map(|mut s| {
            s.line = 0;
            if let StatementKind::ShortcutOption { body, .. } = &mut s.kind {
                *body = without_lines(std::mem::take(body));
            }
            s
        })
        .collect()
}

// -----------------------------------------------------------
// Statements.
// -----------------------------------------------------------

#[test]
fn parse_plain_text() {
    let statements = parse_str("some text").expect("parse");
    assert_eq!(
        statements,
        vec![Statement {
            kind: StatementKind::Text("some text".into()),
            line: 1,
        }]
    );
}

#[test]
fn parse_lone_link() {
    assert_eq!(kinds("[[dest]]"), vec![StatementKind::Link("dest".into())]);
}

#[test]
fn parse_sibling_named_options() {
    assert_eq!(
        kinds("[[A|n1]][[A2|n2]]"),
        vec![
            StatementKind::NamedOption {
                text: "A".into(),
                destination: "n1".into(),
                condition: None,
            },
            StatementKind::NamedOption {
                text: "A2".into(),
                destination: "n2".into(),
                condition: None,
            },
        ]
    );
}

#[test]
fn parse_shortcut_group() {
    let statements = without_lines(
        parse_str("text\n-> s1\n\tT1\n-> s2\n\tT2\nmore").expect("parse"),
    );
    let shortcut = |label: &str, body: &str| Statement {
        kind: StatementKind::ShortcutOption {
            text: label.into(),
            body: vec![text(body)],
            condition: None,
        },
        line: 0,
    };
    assert_eq!(
        statements,
        vec![
            text("text"),
            shortcut("s1", "T1"),
            shortcut("s2", "T2"),
            text("more"),
        ]
    );
}

#[test]
fn parse_shortcuts_without_bodies() {
    let statements = kinds("-> a\n-> b");
    assert_eq!(statements.len(), 2);
    assert!(statements.iter().all(|s| matches!(
        s,
        StatementKind::ShortcutOption { body, .. } if body.is_empty()
    )));
}

#[test]
fn parse_shortcut_inside_indented_if() {
    let statements = kinds("<<if true>>\n\t-> a\n\t\tA\n<<endif>>");
    let [StatementKind::Conditional(branches)] = statements.as_slice() else {
        panic!("expected one conditional, got {statements:?}");
    };
    let [shortcut] = branches[0].body.as_slice() else {
        panic!("expected one statement in the branch");
    };
    assert!(matches!(
        &shortcut.kind,
        StatementKind::ShortcutOption { text, body, .. } if text == "a" && body.len() == 1
    ));
}

#[test]
fn parse_option_condition_at_line_end() {
    let statements = kinds("[[Go|Town]] <<if $open>>\nafter");
    assert_eq!(statements.len(), 2);
    let StatementKind::NamedOption {
        condition: Some(condition),
        ..
    } = &statements[0]
    else {
        panic!("expected conditional option");
    };
    assert_eq!(format_expr(condition), "$open");
    assert_eq!(statements[1], StatementKind::Text("after".into()));
}

#[test]
fn parse_assignment_expression() {
    let statements = kinds("<<set $x = ((1+2)*-3)+4.3>>");
    let [StatementKind::Assignment {
        variable,
        op: AssignOp::Set,
        value,
    }] = statements.as_slice()
    else {
        panic!("expected assignment");
    };
    assert_eq!(variable, "x");
    assert_eq!(format_expr(value), "(1 + 2) * -3 + 4.3");
}

#[test]
fn parse_word_operators() {
    let statements = kinds("<<if $a is 1 and not $b>>\n<<endif>>");
    let StatementKind::Conditional(branches) = &statements[0] else {
        panic!("expected conditional");
    };
    let condition = branches[0].condition.as_ref().expect("condition");
    assert_eq!(format_expr(condition), "$a == 1 && !$b");
}

#[test]
fn parse_command_with_call_syntax_is_verbatim() {
    assert_eq!(
        kinds("<<testfunc(1, \"x\")>>"),
        vec![StatementKind::Command("testfunc(1, \"x\")".into())]
    );
}

#[test]
fn parse_tracks_lines() {
    let statements = parse_str("a\n\n<<set $x = 1>>\n[[b]]").expect("parse");
    let lines: Vec<_> = statements.iter().map(|s| s.line).collect();
    assert_eq!(lines, [1, 3, 4]);
}

#[test]
fn parse_tokens_directly() {
    let tokens = tokenize("Hi [[there]]").expect("tokenize");
    let statements = parse(&tokens).expect("parse");
    assert_eq!(statements.len(), 2);
}

// -----------------------------------------------------------
// Errors.
// -----------------------------------------------------------

#[test]
fn parse_str_lex_error() {
    let err = parse_str("[[a\nb]]").expect_err("should fail");
    assert!(matches!(err, Error::Lex(_)));
}

#[test]
fn parse_str_syntax_error() {
    let err = parse_str("[[a").expect_err("should fail");
    let Error::Syntax(err) = err else {
        panic!("expected syntax error");
    };
    assert_eq!(err.expected, "']]'");
}

#[test]
fn parse_error_display_includes_location() {
    let err = parse_str("text\n[[a|b").expect_err("should fail");
    let msg = err.to_string();
    assert!(msg.contains("expected ']]'"), "{msg}");
    assert!(msg.contains("line 2"), "{msg}");
}

#[test]
fn parse_error_else_without_if() {
    let err = parse_str("<<else>>").expect_err("should fail");
    let Error::Syntax(err) = err else {
        panic!("expected syntax error");
    };
    assert_eq!(err.expected, "statement");
}

#[test]
fn parse_error_clause_after_else() {
    let err = parse_str("<<if $a>>\nA\n<<else>>\nB\n<<elseif $c>>\n<<endif>>")
        .expect_err("should fail");
    let Error::Syntax(err) = err else {
        panic!("expected syntax error");
    };
    assert_eq!(err.expected, "'<<endif>>'");
    assert_eq!(err.found, "'<<elseif $c>>'");
    assert_eq!(err.span.line, 5);
}

#[test]
fn parse_error_condition_on_bare_link() {
    let err = parse_str("intro\n[[Town]] <<if $open>>\nafter").expect_err("should fail");
    let Error::Syntax(err) = err else {
        panic!("expected syntax error");
    };
    assert_eq!(err.expected, "'[[text|destination]]' before an option condition");
    assert_eq!(err.found, "'[[Town]]'");
    assert_eq!(err.span.line, 2);
}

#[test]
fn parse_link_then_conditional_block_on_next_line() {
    let statements = kinds("[[Town]]\n<<if $open>>\nopen\n<<endif>>");
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0], StatementKind::Link("Town".into()));
    assert!(matches!(statements[1], StatementKind::Conditional(_)));
}

#[test]
fn parse_error_set_without_variable() {
    let err = parse_str("<<set x = 1>>").expect_err("should fail");
    let Error::Syntax(err) = err else {
        panic!("expected syntax error");
    };
    assert_eq!(err.expected, "variable");
}

#[test]
fn parse_expression_error_keeps_line() {
    let err = parse_expression("1 + @", 7).expect_err("should fail");
    assert_eq!(err.span.line, 7);
    assert_eq!(err.found, "'@'");
}
