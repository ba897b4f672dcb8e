//! Scanner for the expression language inside `<<...>>` commands.
//!
//! The body lexer hands command contents to the parser as one `Text`
//! token; this scanner splits that text into expression tokens.

use std::ops::Range;

use logos::Logos;

/// Expression-level token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum ExprToken {
    /// Numeric literal such as `12`, `12.5` or `.5`.
    #[regex(r"[0-9]+(\.[0-9]+)?", parse_number)]
    #[regex(r"\.[0-9]+", parse_number)]
    Number(f64),
    /// Double-quoted string literal, escapes resolved.
    #[regex(r#""([^"\\]|\\.)*""#, parse_string)]
    Str(String),
    /// `$name`, stored without the sigil.
    #[regex(r"\$[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice()[1..].to_string())]
    Variable(String),
    /// Function or keyword-like name.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),
    #[token("true", |_| true)]
    #[token("false", |_| false)]
    Bool(bool),

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    #[token("=")]
    #[token("to")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,

    #[token("==")]
    #[token("is")]
    #[token("eq")]
    EqualEqual,
    #[token("!=")]
    #[token("neq")]
    BangEqual,
    #[token("<")]
    #[token("lt")]
    Less,
    #[token("<=")]
    #[token("lte")]
    LessEqual,
    #[token(">")]
    #[token("gt")]
    Greater,
    #[token(">=")]
    #[token("gte")]
    GreaterEqual,

    #[token("&&")]
    #[token("and")]
    And,
    #[token("||")]
    #[token("or")]
    Or,
    #[token("^")]
    #[token("xor")]
    Xor,
    #[token("!")]
    #[token("not")]
    Not,
}

impl ExprToken {
    /// Short description used in syntax errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Str(s) => format!("{s:?}"),
            Self::Variable(name) => format!("${name}"),
            Self::Identifier(name) => name.clone(),
            Self::Bool(b) => b.to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    const fn symbol(&self) -> &'static str {
        match self {
            Self::LParen => "(",
            Self::RParen => ")",
            Self::Comma => ",",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Assign => "=",
            Self::PlusAssign => "+=",
            Self::MinusAssign => "-=",
            Self::StarAssign => "*=",
            Self::SlashAssign => "/=",
            Self::EqualEqual => "==",
            Self::BangEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::Xor => "^",
            Self::Not => "!",
            Self::Number(_)
            | Self::Str(_)
            | Self::Variable(_)
            | Self::Identifier(_)
            | Self::Bool(_) => "",
        }
    }
}

/// Characters the scanner could not classify, with their byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub text: String,
    pub range: Range<usize>,
}

/// Scan command contents into expression tokens with byte ranges.
///
/// # Errors
///
/// Returns the first run of input that is not a valid expression token.
pub fn scan(source: &str) -> Result<Vec<(ExprToken, Range<usize>)>, ScanError> {
    ExprToken::lexer(source)
        .spanned()
        .map(|(token, range)| match token {
            Ok(token) => Ok((token, range)),
            Err(()) => Err(ScanError {
                text: source[range.clone()].to_string(),
                range,
            }),
        })
        .collect()
}

fn parse_number(lex: &logos::Lexer<ExprToken>) -> Option<f64> {
    lex.slice().parse().ok()
}

fn parse_string(lex: &logos::Lexer<ExprToken>) -> String {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
