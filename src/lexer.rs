use std::fmt;

use crate::token::{Span, Token, TokenKind};

/// Named lexer state; each owns an ordered table of transition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexStateId {
    /// Prose, option/command openers, shortcut markers, newlines.
    Base,
    /// Inside `[[`, before `|` or `]]`.
    Option,
    /// After `|` inside an option.
    OptionDestination,
    /// Inside `<<`, before `>>`.
    Command,
}

impl fmt::Display for LexStateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::Option => write!(f, "option"),
            Self::OptionDestination => write!(f, "option destination"),
            Self::Command => write!(f, "command"),
        }
    }
}

/// Error produced when no rule of the current state matches.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "unexpected input in {state} state at line {}, column {}: {:?}",
    span.line,
    span.column,
    remaining.lines().next().unwrap_or_default()
)]
pub struct LexError {
    pub state: LexStateId,
    pub remaining: String,
    pub span: Span,
}

/// Tokenize a node body, ending with `EndOfInput`.
///
/// # Errors
///
/// Returns `LexError` when the body contains input that no rule of the
/// active state accepts, such as a line break inside `[[...]]`.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::EndOfInput;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Matcher {
    Literal(&'static str),
    /// Literal that only matches at the start of a line.
    LineStart(&'static str),
    Newline,
    Identifier,
    /// Longest run not starting any delimiting rule of the state.
    Text,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    kind: TokenKind,
    matcher: Matcher,
    next: Option<LexStateId>,
    delimits_text: bool,
}

/// Ordered transition rules for one lexer state.
#[derive(Debug, Clone, Default)]
pub struct LexState {
    rules: Vec<Rule>,
    /// A backslash in text shields the next character from every rule.
    escapes: bool,
}

impl LexState {
    fn transition(
        mut self,
        kind: TokenKind,
        matcher: Matcher,
        next: Option<LexStateId>,
        delimits_text: bool,
    ) -> Self {
        self.rules.push(Rule {
            kind,
            matcher,
            next,
            delimits_text,
        });
        self
    }

    fn text_rule(self, next: Option<LexStateId>) -> Self {
        debug_assert!(
            !self.rules.iter().any(|r| matches!(r.matcher, Matcher::Text)),
            "a lexer state holds at most one text rule"
        );
        self.transition(TokenKind::Text, Matcher::Text, next, false)
    }

    fn base() -> Self {
        Self::default()
            .transition(
                TokenKind::ShortcutMarker,
                Matcher::LineStart("->"),
                None,
                false,
            )
            .transition(
                TokenKind::OptionStart,
                Matcher::Literal("[["),
                Some(LexStateId::Option),
                true,
            )
            .transition(
                TokenKind::CommandStart,
                Matcher::Literal("<<"),
                Some(LexStateId::Command),
                true,
            )
            .transition(TokenKind::Newline, Matcher::Newline, None, true)
            .text_rule(None)
            .with_escapes()
    }

    const fn with_escapes(mut self) -> Self {
        self.escapes = true;
        self
    }

    fn option() -> Self {
        Self::default()
            .transition(
                TokenKind::OptionEnd,
                Matcher::Literal("]]"),
                Some(LexStateId::Base),
                true,
            )
            .transition(
                TokenKind::OptionSep,
                Matcher::Literal("|"),
                Some(LexStateId::OptionDestination),
                true,
            )
            .text_rule(None)
    }

    fn option_destination() -> Self {
        Self::default()
            .transition(
                TokenKind::OptionEnd,
                Matcher::Literal("]]"),
                Some(LexStateId::Base),
                false,
            )
            .transition(TokenKind::Identifier, Matcher::Identifier, None, false)
    }

    fn command() -> Self {
        Self::default()
            .transition(
                TokenKind::CommandEnd,
                Matcher::Literal(">>"),
                Some(LexStateId::Base),
                true,
            )
            .text_rule(None)
    }

    fn match_len(&self, rule: &Rule, rest: &str, at_line_start: bool) -> Option<usize> {
        match rule.matcher {
            Matcher::Literal(lit) => rest.starts_with(lit).then_some(lit.len()),
            Matcher::LineStart(lit) => (at_line_start && rest.starts_with(lit)).then_some(lit.len()),
            Matcher::Newline => newline_len(rest),
            Matcher::Identifier => identifier_len(rest),
            Matcher::Text => self.text_len(rest),
        }
    }

    fn text_len(&self, rest: &str) -> Option<usize> {
        let mut end = rest.len();
        let mut chars = rest.char_indices().peekable();
        while let Some((i, ch)) = chars.next() {
            let tail = &rest[i..];
            let delimited = line_break_len(tail).is_some()
                || self.rules.iter().any(|rule| {
                    rule.delimits_text && self.match_len(rule, tail, false).is_some()
                });
            if delimited {
                end = i;
                break;
            }
            if self.escapes && ch == '\\' {
                chars.next_if(|&(j, _)| line_break_len(&rest[j..]).is_none());
            }
        }
        (end > 0).then_some(end)
    }
}

/// Stateful lexer over one node body.
///
/// `next_token` is the fallible interface used by the parser. The
/// `Iterator` implementation is lossless: it yields a final `Invalid`
/// token carrying the unmatched remainder instead of failing, so the
/// concatenated token texts always reproduce the input.
#[derive(Debug, Clone)]
pub struct Lexer {
    base: LexState,
    option: LexState,
    destination: LexState,
    command: LexState,
    input: String,
    pos: usize,
    line: usize,
    column: usize,
    state: LexStateId,
    at_line_start: bool,
    indents: Vec<usize>,
    pending: Vec<Token>,
    started: bool,
    error: Option<LexError>,
    exhausted: bool,
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new("")
    }
}

impl Lexer {
    #[must_use]
    pub fn new(input: &str) -> Self {
        let mut lexer = Self {
            base: LexState::base(),
            option: LexState::option(),
            destination: LexState::option_destination(),
            command: LexState::command(),
            input: String::new(),
            pos: 0,
            line: 1,
            column: 1,
            state: LexStateId::Base,
            at_line_start: true,
            indents: vec![0],
            pending: Vec::new(),
            started: false,
            error: None,
            exhausted: false,
        };
        lexer.set_input(input);
        lexer
    }

    /// Reset the lexer to the start of a new body.
    pub fn set_input(&mut self, input: &str) {
        input.clone_into(&mut self.input);
        self.pos = 0;
        self.line = 1;
        self.column = 1;
        self.state = LexStateId::Base;
        self.at_line_start = true;
        self.indents = vec![0];
        self.pending.clear();
        self.started = false;
        self.error = None;
        self.exhausted = false;
    }

    /// The state the next token will be matched in.
    #[must_use]
    pub const fn state(&self) -> LexStateId {
        self.state
    }

    /// Produce the next token.
    ///
    /// # Errors
    ///
    /// Returns `LexError` when no rule matches at the current position.
    /// The error is sticky: every later call returns it again.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let state = self.state;
        let token = self.scan();
        if token.kind == TokenKind::Invalid {
            let err = LexError {
                state,
                remaining: token.text,
                span: token.span,
            };
            self.error = Some(err.clone());
            return Err(err);
        }
        Ok(token)
    }

    const fn table(&self, id: LexStateId) -> &LexState {
        match id {
            LexStateId::Base => &self.base,
            LexStateId::Option => &self.option,
            LexStateId::OptionDestination => &self.destination,
            LexStateId::Command => &self.command,
        }
    }

    const fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }

    fn marker(&self, kind: TokenKind) -> Token {
        Token {
            kind,
            text: String::new(),
            span: self.span(),
        }
    }

    fn scan(&mut self) -> Token {
        if !self.pending.is_empty() {
            return self.pending.remove(0);
        }
        if !self.started {
            self.started = true;
            if let Some(token) = self.leading_blank() {
                return token;
            }
        }
        if self.pos >= self.input.len() {
            if self.indents.len() > 1 {
                self.indents.pop();
                return self.marker(TokenKind::Dedent);
            }
            return self.marker(TokenKind::EndOfInput);
        }

        let rest = &self.input[self.pos..];
        let table = self.table(self.state);
        let matched = table.rules.iter().find_map(|rule| {
            table
                .match_len(rule, rest, self.at_line_start)
                .map(|len| (rule.kind, rule.next, len))
        });

        let span = self.span();
        let Some((kind, next, len)) = matched else {
            let text = rest.to_string();
            self.advance(text.len());
            return Token {
                kind: TokenKind::Invalid,
                text,
                span,
            };
        };

        let text = rest[..len].to_string();
        self.advance(len);
        if let Some(next) = next {
            self.state = next;
        }
        if kind == TokenKind::Newline {
            self.at_line_start = true;
            self.track_indentation();
        } else {
            self.at_line_start = false;
        }

        Token { kind, text, span }
    }

    /// Blank lines and indentation before the first content line. The
    /// first content line's indentation becomes the base level.
    fn leading_blank(&mut self) -> Option<Token> {
        let len = skip_blank_lines(&self.input);
        let width = indentation_width(&self.input[..len]);
        if len < self.input.len() {
            self.indents = vec![width];
        }
        if len == 0 {
            return None;
        }
        let token = Token {
            kind: TokenKind::Newline,
            text: self.input[..len].to_string(),
            span: self.span(),
        };
        self.advance(len);
        Some(token)
    }

    fn track_indentation(&mut self) {
        if self.pos >= self.input.len() {
            return;
        }
        let width = self.column - 1;
        let mut top = self.indents.last().copied().unwrap_or(0);
        while self.indents.len() > 1 && width < top {
            let below = self.indents[self.indents.len() - 2];
            // A width between two levels stays in the inner block.
            if width > below {
                break;
            }
            self.indents.pop();
            top = below;
            self.pending.push(self.marker(TokenKind::Dedent));
        }
        if width > top {
            self.indents.push(width);
            self.pending.push(self.marker(TokenKind::Indent));
        }
    }

    fn advance(&mut self, len: usize) {
        for ch in self.input[self.pos..self.pos + len].chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos += len;
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.exhausted {
            return None;
        }
        let token = self.scan();
        if matches!(token.kind, TokenKind::EndOfInput | TokenKind::Invalid) {
            self.exhausted = true;
        }
        Some(token)
    }
}

fn line_break_len(s: &str) -> Option<usize> {
    if s.starts_with('\n') {
        Some(1)
    } else if s.starts_with("\r\n") {
        Some(2)
    } else {
        None
    }
}

fn blank_len(s: &str) -> usize {
    s.len() - s.trim_start_matches([' ', '\t']).len()
}

/// Blank lines plus the indentation of the next content line.
fn skip_blank_lines(s: &str) -> usize {
    let mut len = 0;
    loop {
        let blank = blank_len(&s[len..]);
        match line_break_len(&s[len + blank..]) {
            Some(brk) => len += blank + brk,
            None => return len + blank,
        }
    }
}

fn newline_len(rest: &str) -> Option<usize> {
    let brk = line_break_len(rest)?;
    Some(brk + skip_blank_lines(&rest[brk..]))
}

fn indentation_width(consumed: &str) -> usize {
    consumed.rsplit('\n').next().unwrap_or_default().chars().count()
}

const fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-')
}

fn identifier_len(rest: &str) -> Option<usize> {
    let lead = blank_len(rest);
    let body = &rest[lead..];
    let ident = body
        .find(|ch: char| !is_identifier_char(ch))
        .unwrap_or(body.len());
    if ident == 0 {
        return None;
    }
    let end = lead + ident;
    Some(end + blank_len(&rest[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .expect("should tokenize")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn plain_text() {
        let tokens = tokenize("This is some text").expect("should tokenize");
        assert_eq!(tokens[0].kind, TokenKind::Text);
        assert_eq!(tokens[0].text, "This is some text");
        assert_eq!(tokens[1].kind, TokenKind::EndOfInput);
    }

    #[test]
    fn link() {
        assert_eq!(
            kinds("[[option]]"),
            vec![
                TokenKind::OptionStart,
                TokenKind::Text,
                TokenKind::OptionEnd,
                TokenKind::EndOfInput,
            ]
        );
    }

    #[test]
    fn named_option_followed_by_text() {
        let tokens = tokenize("[[option|blah]] text").expect("should tokenize");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::OptionStart,
                TokenKind::Text,
                TokenKind::OptionSep,
                TokenKind::Identifier,
                TokenKind::OptionEnd,
                TokenKind::Text,
                TokenKind::EndOfInput,
            ]
        );
        assert_eq!(tokens[3].text, "blah");
    }

    #[test]
    fn command_contents_are_one_text_token() {
        let tokens = tokenize("<<set $x = 1 > 0>>").expect("should tokenize");
        assert_eq!(tokens[0].kind, TokenKind::CommandStart);
        assert_eq!(tokens[1].text, "set $x = 1 > 0");
        assert_eq!(tokens[2].kind, TokenKind::CommandEnd);
    }

    #[test]
    fn shortcut_blocks() {
        assert_eq!(
            kinds("text\n-> shortcut1\n\tText1\n-> shortcut2\n\tText2\nmore text"),
            vec![
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::ShortcutMarker,
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::ShortcutMarker,
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Text,
                TokenKind::EndOfInput,
            ]
        );
    }

    #[test]
    fn arrow_mid_line_is_text() {
        let tokens = tokenize("a -> b").expect("should tokenize");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "a -> b");
    }

    #[test]
    fn blank_lines_fold_into_one_newline() {
        let tokens = tokenize("a\n\n  \nb").expect("should tokenize");
        assert_eq!(tokens[1].kind, TokenKind::Newline);
        assert_eq!(tokens[1].text, "\n\n  \n");
        assert_eq!(tokens[2].text, "b");
        assert_eq!(tokens[2].span.line, 4);
    }

    #[test]
    fn open_levels_close_before_end() {
        assert_eq!(
            kinds("-> a\n\t-> b\n\t\tdeep"),
            vec![
                TokenKind::ShortcutMarker,
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::ShortcutMarker,
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Text,
                TokenKind::Dedent,
                TokenKind::Dedent,
                TokenKind::EndOfInput,
            ]
        );
    }

    #[test]
    fn partial_dedent_stays_in_block() {
        assert_eq!(
            kinds("-> a\n\t\tA\n\tB\nC"),
            vec![
                TokenKind::ShortcutMarker,
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Text,
                TokenKind::EndOfInput,
            ]
        );
    }

    #[test]
    fn leading_indentation_sets_base_level() {
        assert_eq!(
            kinds("  a\n  b"),
            vec![
                TokenKind::Newline,
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::Text,
                TokenKind::EndOfInput,
            ]
        );
    }

    #[test]
    fn newline_inside_option_is_an_error() {
        let err = tokenize("[[unclosed\nmore").expect_err("should fail");
        assert_eq!(err.state, LexStateId::Option);
        assert_eq!(err.remaining, "\nmore");
        assert_eq!(err.span.line, 1);
        assert_eq!(err.span.column, 11);
    }

    #[test]
    fn errors_are_sticky() {
        let mut lexer = Lexer::new("<<cmd\nrest");
        assert!(lexer.next_token().is_ok());
        assert!(lexer.next_token().is_ok());
        let first = lexer.next_token().expect_err("should fail");
        let second = lexer.next_token().expect_err("should fail again");
        assert_eq!(first, second);
    }

    #[test]
    fn iterator_is_lossless_on_invalid_input() {
        let input = "ok [[broken\n-> x";
        let text: String = Lexer::new(input).map(|t| t.text).collect();
        assert_eq!(text, input);
        let last = Lexer::new(input).last().expect("at least one token");
        assert_eq!(last.kind, TokenKind::Invalid);
    }

    #[test]
    fn set_input_resets() {
        let mut lexer = Lexer::new("[[a");
        lexer.next_token().expect("option start");
        assert_eq!(lexer.state(), LexStateId::Option);
        lexer.set_input("b");
        assert_eq!(lexer.state(), LexStateId::Base);
        assert_eq!(lexer.next_token().expect("text").text, "b");
    }

    #[test]
    fn span_tracking() {
        let tokens = tokenize("ab\n[[c]]").expect("should tokenize");
        assert_eq!(tokens[0].span, Span::new(1, 1));
        assert_eq!(tokens[2].span, Span::new(2, 1));
        assert_eq!(tokens[3].span, Span::new(2, 3));
    }
}
