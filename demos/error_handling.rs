//! Show the errors reported for bad dialogue.

use yarn_dialogue::{Error, Runner, YarnNode};

fn main() {
    // Unterminated option
    match yarn_dialogue::parse_str("Hello\n[[Go|Town") {
        Ok(_) => println!("Parsed OK (unexpected)"),
        Err(Error::Lex(e)) => {
            println!("Lex error: {e}");
            println!("  State: {}", e.state);
            println!("  Location: line {}, column {}", e.span.line, e.span.column);
        }
        Err(Error::Syntax(e)) => {
            println!("Syntax error: {e}");
            println!("  Location: line {}, column {}", e.span.line, e.span.column);
        }
    }

    println!();

    // Runtime error from an unset variable
    let mut runner = Runner::new().with_nodes([YarnNode::new("Start", "<<set $x += 1>>")]);
    for result in runner.run_default() {
        if let Err(e) = result {
            println!("Run error: {e}");
        }
    }
}
