//! Lexer, parser, formatter, and suspendable interpreter for Yarn-style
//! branching dialogue.
//!
//! Node bodies are tokenized, parsed into a typed statement tree, and run
//! one result at a time. The run pauses on every option set until the
//! host picks one.
//!
//! # Quick start
//!
//! ## Run a conversation
//!
//! ```
//! use yarn_dialogue::{DialogueResult, Runner, YarnNode};
//!
//! let mut runner = Runner::new().with_nodes([
//!     YarnNode::new("Start", "Hello!\n[[Ask about the weather|Weather]]\n[[Leave|Bye]]"),
//!     YarnNode::new("Weather", "Looks like rain."),
//!     YarnNode::new("Bye", "Goodbye."),
//! ]);
//!
//! let mut run = runner.run_default();
//! let Some(Ok(DialogueResult::Text(hello))) = run.next() else { panic!() };
//! assert_eq!(hello.text, "Hello!");
//!
//! let Some(Ok(DialogueResult::Options(options))) = run.next() else { panic!() };
//! assert_eq!(options.options, ["Ask about the weather", "Leave"]);
//! options.select(0).unwrap();
//!
//! let Some(Ok(DialogueResult::Text(reply))) = run.next() else { panic!() };
//! assert_eq!(reply.node, "Weather");
//! ```
//!
//! ## Parse and re-format a body
//!
//! ```
//! use yarn_dialogue::{format, parse_str};
//!
//! let body = "<<if $gold >= 10>>\n\tYou can afford it.\n<<endif>>\n";
//! let statements = parse_str(body).unwrap();
//! assert_eq!(format(&statements), body);
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod ast;
pub mod builder;
mod eval;
pub mod formatter;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod result;
pub mod runner;
pub mod scanner;
pub mod state;
pub mod token;
pub mod value;

pub use ast::{
    AssignOp, BinaryOp, Branch, Expr, ExprKind, Literal, Statement, StatementKind, UnaryOp,
};
pub use formatter::{format, format_expr};
pub use lexer::{LexError, LexStateId, Lexer, tokenize};
pub use node::YarnNode;
pub use parser::{SyntaxError, parse, parse_expression};
pub use result::{CommandResult, DialogueResult, NodeCompleteResult, OptionsResult, TextResult};
pub use runner::{DEFAULT_START_NODE, Run, RunError, Runner};
pub use state::{MemoryVariableStorage, VariableStorage};
pub use token::{Span, Token, TokenKind};
pub use value::Value;

/// Unified error type covering both lexing and parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A lexer error.
    #[error("{0}")]
    Lex(#[from] LexError),
    /// A parser error.
    #[error("{0}")]
    Syntax(#[from] SyntaxError),
}

/// Tokenize and parse a node body in one step.
pub fn parse_str(body: &str) -> Result<Vec<Statement>, Error> {
    let tokens = tokenize(body)?;
    Ok(parse(&tokens)?)
}
