/// Source location for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Run of prose, option text, or raw command contents.
    Text,
    /// Option destination (`dest` in `[[text|dest]]`).
    Identifier,
    /// Line break, including any following blank lines and the
    /// indentation of the next content line.
    Newline,
    /// `[[`
    OptionStart,
    /// `|` inside an option.
    OptionSep,
    /// `]]`
    OptionEnd,
    /// `<<`
    CommandStart,
    /// `>>`
    CommandEnd,
    /// `->` at the start of a line.
    ShortcutMarker,
    /// Indentation increased.
    Indent,
    /// Indentation decreased.
    Dedent,
    /// End of the body.
    EndOfInput,
    /// Input no rule of the current state matches.
    Invalid,
}

impl TokenKind {
    /// Short description used in syntax errors.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Identifier => "identifier",
            Self::Newline => "newline",
            Self::OptionStart => "'[['",
            Self::OptionSep => "'|'",
            Self::OptionEnd => "']]'",
            Self::CommandStart => "'<<'",
            Self::CommandEnd => "'>>'",
            Self::ShortcutMarker => "'->'",
            Self::Indent => "indent",
            Self::Dedent => "dedent",
            Self::EndOfInput => "end of input",
            Self::Invalid => "invalid input",
        }
    }
}

/// A single token with its kind, matched text, and source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    /// Describe the token for error messages, quoting text content.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Text | TokenKind::Identifier => format!("'{}'", self.text.trim()),
            kind => kind.describe().to_string(),
        }
    }
}
