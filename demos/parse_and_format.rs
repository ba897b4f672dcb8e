//! Parse a node body and print it in canonical form.

fn main() {
    let input = "\
Guard: Halt!
<<if $has_pass is true>>
Guard: Go on through.
<<else>>
Guard: No pass, no entry.
-> Bribe <<if $gold>5>>
\t<<set $gold-=5>>
-> Leave
<<endif>>
";

    let statements = yarn_dialogue::parse_str(input).expect("parse failed");
    println!("Top-level statements: {}", statements.len());

    let output = yarn_dialogue::format(&statements);
    println!("\nFormatted output:\n{output}");
}
