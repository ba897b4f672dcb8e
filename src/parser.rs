use std::ops::Range;

use crate::ast::{
    AssignOp, BinaryOp, Branch, Expr, ExprKind, Literal, Statement, StatementKind, UnaryOp,
};
use crate::scanner::{self, ExprToken};
use crate::token::{Span, Token, TokenKind};

/// Error produced during parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected}, found {found} at line {}, column {}", span.line, span.column)]
pub struct SyntaxError {
    pub expected: String,
    pub found: String,
    pub span: Span,
}

impl SyntaxError {
    fn new(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        Self {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }
}

/// Parse a token stream into the statements of one node body.
///
/// # Errors
///
/// Returns `SyntaxError` on unterminated options or commands, unbalanced
/// conditional chains, or malformed expressions.
pub fn parse(tokens: &[Token]) -> Result<Vec<Statement>, SyntaxError> {
    Parser::new(tokens).parse()
}

/// Parse a standalone expression, as found after `<<if`.
///
/// # Errors
///
/// Returns `SyntaxError` if `source` is not exactly one expression.
pub fn parse_expression(source: &str, line: usize) -> Result<Expr, SyntaxError> {
    let mut parser = ExprParser::new(source, Span::new(line, 1))?;
    let expr = parser.expression()?;
    parser.finish()?;
    Ok(expr)
}

/// What the current block stops at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockEnd {
    /// End of the body.
    Input,
    /// The dedent closing a shortcut option body.
    Dedent,
    /// `<<elseif>>`, `<<else>>` or `<<endif>>`.
    Clause,
}

/// Who opened an indentation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opener {
    Shortcut,
    Transparent,
}

#[derive(Debug)]
enum ClauseKind {
    ElseIf(Expr),
    Else,
    EndIf,
}

#[derive(Debug)]
struct Clause {
    kind: ClauseKind,
    text: String,
    span: Span,
}

enum Directive {
    Statement(Statement),
    If(Expr),
    Clause(Clause),
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    open: Vec<Opener>,
}

impl<'a> Parser<'a> {
    const fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            open: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<Statement>, SyntaxError> {
        let (statements, _) = self.parse_block(BlockEnd::Input)?;
        Ok(statements)
    }

    fn token(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn kind(&self) -> TokenKind {
        self.token().map_or(TokenKind::EndOfInput, |t| t.kind)
    }

    fn eof_span(&self) -> Span {
        self.tokens.last().map_or(Span::new(1, 1), |t| t.span)
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        match self.token() {
            Some(token) => SyntaxError::new(expected, token.describe(), token.span),
            None => SyntaxError::new(expected, "end of input", self.eof_span()),
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<&'a Token, SyntaxError> {
        match self.token() {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn at_line_end(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Newline | TokenKind::Dedent | TokenKind::EndOfInput
        )
    }

    fn parse_block(
        &mut self,
        end: BlockEnd,
    ) -> Result<(Vec<Statement>, Option<Clause>), SyntaxError> {
        let mut statements = Vec::new();

        loop {
            let Some(token) = self.token() else {
                return self.finish_block(end, statements);
            };

            match token.kind {
                TokenKind::EndOfInput => return self.finish_block(end, statements),
                TokenKind::Newline => self.pos += 1,
                TokenKind::Indent => {
                    self.pos += 1;
                    self.open.push(Opener::Transparent);
                }
                TokenKind::Dedent => match self.open.last() {
                    Some(Opener::Transparent) => {
                        self.open.pop();
                        self.pos += 1;
                    }
                    Some(Opener::Shortcut) if end == BlockEnd::Dedent => {
                        self.open.pop();
                        self.pos += 1;
                        return Ok((statements, None));
                    }
                    Some(Opener::Shortcut) => return Err(self.unexpected("'<<endif>>'")),
                    None => self.pos += 1,
                },
                TokenKind::Text => {
                    self.pos += 1;
                    let text = token.text.trim();
                    if !text.is_empty() {
                        statements.push(Statement {
                            kind: StatementKind::Text(unescape(text)),
                            line: token.span.line,
                        });
                    }
                }
                TokenKind::OptionStart => statements.push(self.parse_option()?),
                TokenKind::ShortcutMarker => statements.push(self.parse_shortcut()?),
                TokenKind::CommandStart => match self.parse_command()? {
                    Directive::Statement(statement) => statements.push(statement),
                    Directive::If(condition) => {
                        statements.push(self.parse_conditional(condition, token.span.line)?);
                    }
                    Directive::Clause(clause) if end == BlockEnd::Clause => {
                        return Ok((statements, Some(clause)));
                    }
                    Directive::Clause(clause) => {
                        return Err(SyntaxError::new(
                            "statement",
                            format!("'<<{}>>'", clause.text),
                            clause.span,
                        ));
                    }
                },
                _ => return Err(self.unexpected("statement")),
            }
        }
    }

    fn finish_block(
        &self,
        end: BlockEnd,
        statements: Vec<Statement>,
    ) -> Result<(Vec<Statement>, Option<Clause>), SyntaxError> {
        if end == BlockEnd::Clause {
            return Err(self.unexpected("'<<endif>>'"));
        }
        Ok((statements, None))
    }

    fn parse_option(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.expect(TokenKind::OptionStart, "'[['")?;
        let text_token = self.expect(TokenKind::Text, "option text")?;
        let text = text_token.text.trim();
        if text.is_empty() {
            return Err(SyntaxError::new(
                "option text",
                "blank text",
                text_token.span,
            ));
        }

        let kind = match self.kind() {
            TokenKind::OptionEnd => {
                self.pos += 1;
                if self.trailing_condition()?.is_some() {
                    return Err(SyntaxError::new(
                        "'[[text|destination]]' before an option condition",
                        format!("'[[{text}]]'"),
                        start.span,
                    ));
                }
                StatementKind::Link(text.to_string())
            }
            TokenKind::OptionSep => {
                self.pos += 1;
                let destination = self
                    .expect(TokenKind::Identifier, "option destination")?
                    .text
                    .trim()
                    .to_string();
                self.expect(TokenKind::OptionEnd, "']]'")?;
                let condition = self.trailing_condition()?;
                StatementKind::NamedOption {
                    text: text.to_string(),
                    destination,
                    condition,
                }
            }
            _ => return Err(self.unexpected("']]'")),
        };

        Ok(Statement {
            kind,
            line: start.span.line,
        })
    }

    fn parse_shortcut(&mut self) -> Result<Statement, SyntaxError> {
        let marker = self.expect(TokenKind::ShortcutMarker, "'->'")?;
        let label = self.expect(TokenKind::Text, "shortcut text")?;
        let condition = self.trailing_condition()?;
        let text = label.text.trim();
        if text.is_empty() {
            return Err(SyntaxError::new("shortcut text", "blank text", label.span));
        }
        if !self.at_line_end() {
            return Err(self.unexpected("end of line"));
        }

        let mut body = Vec::new();
        if self.kind() == TokenKind::Newline {
            self.pos += 1;
            if self.kind() == TokenKind::Indent {
                self.pos += 1;
                self.open.push(Opener::Shortcut);
                body = self.parse_block(BlockEnd::Dedent)?.0;
            }
        }

        Ok(Statement {
            kind: StatementKind::ShortcutOption {
                text: text.to_string(),
                body,
                condition,
            },
            line: marker.span.line,
        })
    }

    /// `<<if expr>>` closing the line of an option.
    fn trailing_condition(&mut self) -> Result<Option<Expr>, SyntaxError> {
        let mut at = self.pos;
        if let Some(token) = self.tokens.get(at) {
            if token.kind == TokenKind::Text && token.text.trim().is_empty() {
                at += 1;
            }
        }
        let kinds: Vec<_> = self.tokens[at.min(self.tokens.len())..]
            .iter()
            .take(4)
            .map(|t| t.kind)
            .collect();
        let closes_line = matches!(
            kinds.get(3),
            None | Some(TokenKind::Newline | TokenKind::Dedent | TokenKind::EndOfInput)
        );
        if kinds.get(..3)
            != Some(&[TokenKind::CommandStart, TokenKind::Text, TokenKind::CommandEnd][..])
            || !closes_line
        {
            return Ok(None);
        }

        let command = &self.tokens[at + 1];
        let (word, offset) = split_keyword(&command.text);
        if word != "if" {
            return Ok(None);
        }
        let condition = parse_command_expression(command, offset)?;
        self.pos = at + 3;
        Ok(Some(condition))
    }

    fn parse_command(&mut self) -> Result<Directive, SyntaxError> {
        let start = self.expect(TokenKind::CommandStart, "'<<'")?;
        let command = self.expect(TokenKind::Text, "command")?;
        self.expect(TokenKind::CommandEnd, "'>>'")?;

        let text = command.text.trim();
        let line = start.span.line;
        let (word, offset) = split_keyword(&command.text);
        let rest = command.text[offset..].trim();

        let clause = |kind: ClauseKind| -> Result<Directive, SyntaxError> {
            Ok(Directive::Clause(Clause {
                kind,
                text: text.to_string(),
                span: start.span,
            }))
        };

        match word {
            "set" => {
                let mut parser = ExprParser::new(&command.text[offset..], span_at(command, offset))?;
                let (variable, op, value) = parser.assignment()?;
                Ok(Directive::Statement(Statement {
                    kind: StatementKind::Assignment {
                        variable,
                        op,
                        value,
                    },
                    line,
                }))
            }
            "if" => Ok(Directive::If(parse_command_expression(command, offset)?)),
            "elseif" => clause(ClauseKind::ElseIf(parse_command_expression(
                command, offset,
            )?)),
            "else" if rest.is_empty() => clause(ClauseKind::Else),
            "else" => {
                let lead = command.text.len() - command.text[offset..].trim_start().len();
                let (next, next_offset) = split_keyword(&command.text[lead..]);
                if next != "if" {
                    return Err(SyntaxError::new(
                        "'>>'",
                        format!("'{rest}'"),
                        span_at(command, lead),
                    ));
                }
                clause(ClauseKind::ElseIf(parse_command_expression(
                    command,
                    lead + next_offset,
                )?))
            }
            "endif" if rest.is_empty() => clause(ClauseKind::EndIf),
            "endif" => Err(SyntaxError::new(
                "'>>'",
                format!("'{rest}'"),
                span_at(command, offset),
            )),
            _ => Ok(Directive::Statement(Statement {
                kind: StatementKind::Command(text.to_string()),
                line,
            })),
        }
    }

    fn parse_conditional(&mut self, condition: Expr, line: usize) -> Result<Statement, SyntaxError> {
        let mut branches = Vec::new();
        let mut condition = Some(condition);
        let mut branch_line = line;
        let mut seen_else = false;

        loop {
            let (body, clause) = self.parse_block(BlockEnd::Clause)?;
            branches.push(Branch {
                condition: condition.take(),
                body,
                line: branch_line,
            });
            let Some(clause) = clause else {
                return Err(self.unexpected("'<<endif>>'"));
            };

            match clause.kind {
                ClauseKind::EndIf => {
                    return Ok(Statement {
                        kind: StatementKind::Conditional(branches),
                        line,
                    });
                }
                _ if seen_else => {
                    return Err(SyntaxError::new(
                        "'<<endif>>'",
                        format!("'<<{}>>'", clause.text),
                        clause.span,
                    ));
                }
                ClauseKind::ElseIf(expr) => condition = Some(expr),
                ClauseKind::Else => seen_else = true,
            }
            branch_line = clause.span.line;
        }
    }
}

/// Leading identifier of a command and the byte offset just past it.
/// Characters a backslash escapes in dialogue text.
pub(crate) const ESCAPABLE: [char; 4] = ['\\', '[', '<', '-'];

/// Drop the backslash in front of an escapable character. Any other
/// backslash is kept as written.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next_if(|next| ESCAPABLE.contains(next)) {
                out.push(next);
                continue;
            }
        }
        out.push(ch);
    }
    out
}

fn split_keyword(text: &str) -> (&str, usize) {
    let lead = text.len() - text.trim_start().len();
    let rest = &text[lead..];
    let len = rest
        .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
        .unwrap_or(rest.len());
    (&rest[..len], lead + len)
}

const fn span_at(token: &Token, offset: usize) -> Span {
    Span::new(token.span.line, token.span.column + offset)
}

fn parse_command_expression(command: &Token, offset: usize) -> Result<Expr, SyntaxError> {
    let mut parser = ExprParser::new(&command.text[offset..], span_at(command, offset))?;
    let expr = parser.expression()?;
    parser.finish()?;
    Ok(expr)
}

/// Precedence-climbing parser over one command's expression tokens.
struct ExprParser {
    tokens: Vec<(ExprToken, Range<usize>)>,
    pos: usize,
    start: Span,
    end: usize,
}

impl ExprParser {
    fn new(source: &str, start: Span) -> Result<Self, SyntaxError> {
        let tokens = scanner::scan(source).map_err(|err| {
            SyntaxError::new(
                "expression",
                format!("'{}'", err.text),
                Span::new(start.line, start.column + err.range.start),
            )
        })?;
        Ok(Self {
            tokens,
            pos: 0,
            start,
            end: source.len(),
        })
    }

    const fn line(&self) -> usize {
        self.start.line
    }

    fn peek(&self) -> Option<&ExprToken> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        match self.tokens.get(self.pos) {
            Some((token, range)) => SyntaxError::new(
                expected,
                token.describe(),
                Span::new(self.start.line, self.start.column + range.start),
            ),
            None => SyntaxError::new(
                expected,
                "'>>'",
                Span::new(self.start.line, self.start.column + self.end),
            ),
        }
    }

    fn eat(&mut self, expected: &ExprToken) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn finish(&self) -> Result<(), SyntaxError> {
        if self.pos < self.tokens.len() {
            return Err(self.unexpected("'>>'"));
        }
        Ok(())
    }

    fn assignment(&mut self) -> Result<(String, AssignOp, Expr), SyntaxError> {
        let Some(ExprToken::Variable(name)) = self.peek().cloned() else {
            return Err(self.unexpected("variable"));
        };
        self.pos += 1;

        let op = match self.peek() {
            Some(ExprToken::Assign) => AssignOp::Set,
            Some(ExprToken::PlusAssign) => AssignOp::Add,
            Some(ExprToken::MinusAssign) => AssignOp::Subtract,
            Some(ExprToken::StarAssign) => AssignOp::Multiply,
            Some(ExprToken::SlashAssign) => AssignOp::Divide,
            _ => return Err(self.unexpected("assignment operator")),
        };
        self.pos += 1;

        let value = self.expression()?;
        self.finish()?;
        Ok((name, op, value))
    }

    fn expression(&mut self) -> Result<Expr, SyntaxError> {
        self.binary(1)
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        let op = match self.peek()? {
            ExprToken::Or => BinaryOp::Or,
            ExprToken::Xor => BinaryOp::Xor,
            ExprToken::And => BinaryOp::And,
            ExprToken::EqualEqual => BinaryOp::Equal,
            ExprToken::BangEqual => BinaryOp::NotEqual,
            ExprToken::Less => BinaryOp::Less,
            ExprToken::LessEqual => BinaryOp::LessEqual,
            ExprToken::Greater => BinaryOp::Greater,
            ExprToken::GreaterEqual => BinaryOp::GreaterEqual,
            ExprToken::Plus => BinaryOp::Add,
            ExprToken::Minus => BinaryOp::Subtract,
            ExprToken::Star => BinaryOp::Multiply,
            ExprToken::Slash => BinaryOp::Divide,
            _ => return None,
        };
        Some(op)
    }

    fn binary(&mut self, min_precedence: u8) -> Result<Expr, SyntaxError> {
        let mut left = self.unary()?;
        while let Some(op) = self.binary_op() {
            if op.precedence() < min_precedence {
                break;
            }
            self.pos += 1;
            let right = self.binary(op.precedence() + 1)?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                self.line(),
            );
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek() {
            Some(ExprToken::Minus) => UnaryOp::Negate,
            Some(ExprToken::Not) => UnaryOp::Not,
            _ => return self.primary(),
        };
        self.pos += 1;
        let operand = self.unary()?;
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            self.line(),
        ))
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let line = self.line();
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected("expression"));
        };

        let literal = match token {
            ExprToken::Number(n) => Literal::Number(n),
            ExprToken::Str(s) => Literal::String(s),
            ExprToken::Bool(b) => Literal::Bool(b),
            ExprToken::Variable(name) => Literal::Variable(name),
            ExprToken::Identifier(name) => {
                self.pos += 1;
                return self.call(name);
            }
            ExprToken::LParen => {
                self.pos += 1;
                let inner = self.expression()?;
                if !self.eat(&ExprToken::RParen) {
                    return Err(self.unexpected("')'"));
                }
                return Ok(inner);
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.pos += 1;
        Ok(Expr::literal(literal, line))
    }

    fn call(&mut self, name: String) -> Result<Expr, SyntaxError> {
        if !self.eat(&ExprToken::LParen) {
            return Err(self.unexpected("'('"));
        }
        let mut args = Vec::new();
        if !self.eat(&ExprToken::RParen) {
            loop {
                args.push(self.expression()?);
                if self.eat(&ExprToken::RParen) {
                    break;
                }
                if !self.eat(&ExprToken::Comma) {
                    return Err(self.unexpected("',' or ')'"));
                }
            }
        }
        Ok(Expr::new(ExprKind::Call { name, args }, self.line()))
    }
}
