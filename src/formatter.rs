//! Pretty-printer that serializes parsed statements back into canonical
//! node body text.
//!
//! Produces one statement per line, with shortcut and `<<if>>` bodies
//! indented by one tab per level.

use std::fmt::Write as _;

use crate::ast::{Branch, Expr, ExprKind, Literal, Statement, StatementKind};
use crate::parser::ESCAPABLE;

/// Binding strength of a unary operator.
const UNARY_PRECEDENCE: u8 = 7;
/// Binding strength of literals, calls, and anything else atomic.
const ATOM_PRECEDENCE: u8 = 8;

/// Format statements into node body text that parses back to the same
/// statements.
#[must_use]
pub fn format(statements: &[Statement]) -> String {
    let mut out = String::new();
    format_statements(&mut out, statements, 0);
    out
}

/// Format an expression with the fewest parentheses that keep its shape.
#[must_use]
pub fn format_expr(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

/// Write a dialogue line, escaping anything the lexer would read as
/// markup: a leading `->`, `[[`, `<<`, and backslashes that precede an
/// escapable character.
fn write_text(out: &mut String, text: &str) {
    if text.starts_with("->") {
        out.push('\\');
    }
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        let next = chars.peek().copied();
        let escape = match ch {
            '\\' => next.is_some_and(|next| ESCAPABLE.contains(&next)),
            '[' | '<' => next == Some(ch),
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(ch);
    }
}

fn format_statements(out: &mut String, statements: &[Statement], indent: usize) {
    for statement in statements {
        format_statement(out, statement, indent);
    }
}

fn format_statement(out: &mut String, statement: &Statement, indent: usize) {
    let prefix = "\t".repeat(indent);
    out.push_str(&prefix);

    match &statement.kind {
        StatementKind::Text(text) => write_text(out, text),
        StatementKind::Link(destination) => {
            let _ = write!(out, "[[{destination}]]");
        }
        StatementKind::NamedOption {
            text,
            destination,
            condition,
        } => {
            let _ = write!(out, "[[{text}|{destination}]]");
            format_condition(out, condition.as_ref());
        }
        StatementKind::ShortcutOption {
            text,
            body,
            condition,
        } => {
            let _ = write!(out, "-> {text}");
            format_condition(out, condition.as_ref());
            out.push('\n');
            format_statements(out, body, indent + 1);
            return;
        }
        StatementKind::Conditional(branches) => {
            format_branches(out, branches, indent);
            return;
        }
        StatementKind::Assignment {
            variable,
            op,
            value,
        } => {
            let _ = write!(
                out,
                "<<set ${variable} {} {}>>",
                op.symbol(),
                format_expr(value)
            );
        }
        StatementKind::Command(text) => {
            let _ = write!(out, "<<{text}>>");
        }
    }
    out.push('\n');
}

fn format_condition(out: &mut String, condition: Option<&Expr>) {
    if let Some(condition) = condition {
        let _ = write!(out, " <<if {}>>", format_expr(condition));
    }
}

/// The caller has already written the indentation of the first line.
fn format_branches(out: &mut String, branches: &[Branch], indent: usize) {
    let prefix = "\t".repeat(indent);

    for (i, branch) in branches.iter().enumerate() {
        if i > 0 {
            out.push_str(&prefix);
        }
        match (&branch.condition, i) {
            (Some(condition), 0) => {
                let _ = write!(out, "<<if {}>>", format_expr(condition));
            }
            (Some(condition), _) => {
                let _ = write!(out, "<<elseif {}>>", format_expr(condition));
            }
            (None, _) => out.push_str("<<else>>"),
        }
        out.push('\n');
        format_statements(out, &branch.body, indent + 1);
    }

    out.push_str(&prefix);
    out.push_str("<<endif>>\n");
}

const fn precedence(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Binary { op, .. } => op.precedence(),
        ExprKind::Unary { .. } => UNARY_PRECEDENCE,
        ExprKind::Literal(_) | ExprKind::Call { .. } => ATOM_PRECEDENCE,
    }
}

fn write_operand(out: &mut String, expr: &Expr, parenthesize: bool) {
    if parenthesize {
        out.push('(');
        write_expr(out, expr);
        out.push(')');
    } else {
        write_expr(out, expr);
    }
}

fn write_expr(out: &mut String, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(literal) => write_literal(out, literal),
        ExprKind::Call { name, args } => {
            out.push_str(name);
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(out, arg);
            }
            out.push(')');
        }
        ExprKind::Unary { op, operand } => {
            out.push_str(op.symbol());
            write_operand(out, operand, precedence(operand) < UNARY_PRECEDENCE);
        }
        ExprKind::Binary { op, left, right } => {
            let own = op.precedence();
            write_operand(out, left, precedence(left) < own);
            let _ = write!(out, " {} ", op.symbol());
            // Left-associative: an equal-precedence right child needs parentheses.
            write_operand(out, right, precedence(right) <= own);
        }
    }
}

fn write_literal(out: &mut String, literal: &Literal) {
    match literal {
        Literal::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Literal::String(s) => {
            out.push('"');
            for ch in s.chars() {
                match ch {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    _ => out.push(ch),
                }
            }
            out.push('"');
        }
        Literal::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Literal::Variable(name) => {
            let _ = write!(out, "${name}");
        }
    }
}
