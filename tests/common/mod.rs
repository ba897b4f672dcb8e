#![allow(dead_code)]

use yarn_dialogue::{DialogueResult, OptionsResult, Run, Runner, YarnNode, format, parse_str};

/// Build a runner from `(title, body)` pairs.
pub fn runner(nodes: &[(&str, &str)]) -> Runner {
    Runner::new().with_nodes(
        nodes
            .iter()
            .map(|(title, body)| YarnNode::new(*title, *body)),
    )
}

/// Drain results up to the next option set or the end of the run.
///
/// Text is rendered as-is, commands as `<<text>>`, and node completion
/// as `[done Title]`.
pub fn drain(run: &mut Run<'_>) -> (Vec<String>, Option<OptionsResult>) {
    let mut out = Vec::new();
    for result in run.by_ref() {
        match result.expect("run failed") {
            DialogueResult::Text(text) => out.push(text.text),
            DialogueResult::Command(command) => out.push(format!("<<{}>>", command.text)),
            DialogueResult::NodeComplete(done) => out.push(format!("[done {}]", done.title)),
            DialogueResult::Options(options) => return (out, Some(options)),
        }
    }
    (out, None)
}

/// Drain a run that is expected to finish without presenting options.
pub fn drain_all(run: &mut Run<'_>) -> Vec<String> {
    let (out, options) = drain(run);
    assert!(options.is_none(), "unexpected options after {out:?}");
    out
}

/// Parse then format must reproduce the input exactly.
pub fn roundtrip(input: &str) {
    let statements = parse_str(input).expect("parse failed");
    let output = format(&statements);
    assert_eq!(
        output, input,
        "round-trip mismatch:\n--- expected ---\n{input}\n--- got ---\n{output}"
    );
}

fn nodes(pairs: &[(&str, &str)]) -> Vec<YarnNode> {
    pairs
        .iter()
        .map(|(title, body)| YarnNode::new(*title, *body))
        .collect()
}

// -----------------------------------------------------------
// Fixture node sets.
// -----------------------------------------------------------

pub fn links() -> Vec<YarnNode> {
    nodes(&[
        ("OneNode", "This is a test line"),
        ("Option1", "This is Option1's test line"),
        ("Option2", "This is Option2's test line"),
        (
            "ThreeNodes",
            "This is a test line\nThis is another test line\n[[Option1]]\n[[Option2]]",
        ),
        (
            "NamedLink",
            "This is a test line\nThis is another test line\n[[First choice|Option1]]\n[[Second choice|Option2]]",
        ),
        ("OneLinkPassthrough", "First test line\n[[Option1]]"),
        (
            "LinkAfterShortcuts",
            "First test line\n-> Shortcut 1\n\tThis is the first shortcut\n-> Shortcut 2\n\tThis is the second shortcut\n[[First link|Option1]][[Second link|Option2]]",
        ),
    ])
}

pub fn shortcuts() -> Vec<YarnNode> {
    nodes(&[
        (
            "NonNested",
            "This is a test line\n-> Option 1\n\tThis is the first option\n-> Option 2\n\tThis is the second option\nThis is after both options",
        ),
        (
            "Nested",
            "text\n-> shortcut1\n\tText1\n\t-> nestedshortcut1\n\t\tNestedText1\n\t-> nestedshortcut2\n\t\tNestedText2\n-> shortcut2\n\tText2\nmore text",
        ),
        (
            "Conditional",
            "This is a test line\n-> Option 1\n\tThis is the first option\n-> Option 2 <<if false>>\n\tThis is the second option\n-> Option 3\n\tThis is the third option\nThis is after both options",
        ),
    ])
}

pub fn assignments() -> Vec<YarnNode> {
    nodes(&[
        ("Numeric", "Test Line\n<<set $testvar = -123.4>>\nTest Line After"),
        (
            "NumericExpression",
            "Test Line\n<<set $testvar = ((1+2)*-3)+4.3>>\nTest Line After",
        ),
        (
            "String",
            "Test Line\n<<set $testvar = \"Variable String\">>\nTest Line After",
        ),
        (
            "StringExpression",
            "Test Line\n<<set $testvar = \"Variable String\" + \" Appended\">>\nTest Line After",
        ),
        ("Boolean", "Test Line\n<<set $testvar = true>>\nTest Line After"),
        (
            "BooleanExpression",
            "Test Line\n<<set $testvar = (true || false) && (false || !false)>>\nTest Line After",
        ),
        (
            "Variable",
            "Test Line\n<<set $firstvar = \"First variable string\">>\n<<set $secondvar = $firstvar>>\nTest Line After",
        ),
        (
            "VariableExpression",
            "Test Line\n<<set $firstvar = 100>>\n<<set $secondvar = -4.3 + $firstvar>>\nTest Line After",
        ),
    ])
}

pub fn conditions() -> Vec<YarnNode> {
    nodes(&[
        (
            "BasicIf",
            "Text before\n<<if true>>\nInside if\n<<endif>>\nText after",
        ),
        (
            "BasicIfElse",
            "Text before\n<<if false>>\nInside if\n<<else>>\nInside else\n<<endif>>\nText after",
        ),
        (
            "BasicIfElseIf",
            "Text before\n<<if false>>\nInside if\n<<elseif true>>\nInside elseif\n<<endif>>\nText after",
        ),
        (
            "BasicIfElseIfElse",
            "Text before\n<<if false>>\nInside if\n<<elseif false>>\nInside elseif\n<<else>>\nInside else\n<<endif>>\nText after",
        ),
    ])
}

pub fn commands_and_functions() -> Vec<YarnNode> {
    nodes(&[
        ("StopCommand", "First line\n<<stop>>\nThis shouldn't show"),
        (
            "BasicCommands",
            "<<command>>\ntext in between commands\n<< command with space >>\n<<callFunction()>>\n<<callFunctionWithParam(\"test\",true,1,12.5,[2,3])>>",
        ),
        (
            "FunctionConditional",
            "First line\n<<if testfunc(\"firstarg\", \"secondarg\")>>\nThis should show\n<<endif>>\n<<if testfunc(\"firstarg\", \"wrongarg\")>>\nThis should not show\n<<endif>>\nAfter both",
        ),
        ("VisitedFunctionStart", "Hello\n[[VisitedFunctionEnd]]"),
        (
            "VisitedFunctionEnd",
            "<<if visited(\"VisitedFunctionStart\")>>\nyou have visited VisitedFunctionStart!\n<<endif>>\n<<if visited(\"SomewhereElse\")>>\nyou have visited SomewhereElse!\n<<endif>>",
        ),
    ])
}
