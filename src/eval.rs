//! Expression evaluation against a session.

use std::cmp::Ordering;

use crate::ast::{AssignOp, BinaryOp, Expr, ExprKind, Literal, UnaryOp};
use crate::runner::RunError;
use crate::state::Session;
use crate::value::Value;

/// Evaluate an expression, reading variables and calling functions.
pub fn evaluate(expr: &Expr, session: &mut Session) -> Result<Value, RunError> {
    match &expr.kind {
        ExprKind::Literal(literal) => literal_value(literal, session, expr.line),
        ExprKind::Call { name, args } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, session))
                .collect::<Result<Vec<_>, _>>()?;
            session.call(name, &args, expr.line)
        }
        ExprKind::Unary { op, operand } => {
            let value = evaluate(operand, session)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                UnaryOp::Negate => match value {
                    Value::Number(n) => Ok(Value::Number(-n)),
                    other => Err(RunError::InvalidOperand {
                        operator: op.symbol().to_string(),
                        operand: other.type_name().to_string(),
                        line: expr.line,
                    }),
                },
            }
        }
        ExprKind::Binary { op, left, right } => {
            let left = evaluate(left, session)?;
            match op {
                BinaryOp::And if !left.is_truthy() => Ok(Value::Bool(false)),
                BinaryOp::Or if left.is_truthy() => Ok(Value::Bool(true)),
                _ => {
                    let right = evaluate(right, session)?;
                    binary(*op, left, right, expr.line)
                }
            }
        }
    }
}

fn literal_value(literal: &Literal, session: &Session, line: usize) -> Result<Value, RunError> {
    Ok(match literal {
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Variable(name) => {
            return session.get(name).ok_or_else(|| RunError::UnsetVariable {
                name: name.clone(),
                line,
            });
        }
    })
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value, line: usize) -> RunError {
    RunError::TypeMismatch {
        operator: op.symbol().to_string(),
        left: left.type_name().to_string(),
        right: right.type_name().to_string(),
        line,
    }
}

/// Apply a binary operator to two evaluated operands.
pub fn binary(op: BinaryOp, left: Value, right: Value, line: usize) -> Result<Value, RunError> {
    match op {
        BinaryOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
        BinaryOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        BinaryOp::Xor => Ok(Value::Bool(left.is_truthy() != right.is_truthy())),
        BinaryOp::Equal => Ok(Value::Bool(left == right)),
        BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
        BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
            let ordering = match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => return Err(mismatch(op, &left, &right, line)),
            };
            let result = ordering.is_some_and(|ordering| match op {
                BinaryOp::Less => ordering == Ordering::Less,
                BinaryOp::LessEqual => ordering != Ordering::Greater,
                BinaryOp::Greater => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            });
            Ok(Value::Bool(result))
        }
        BinaryOp::Add => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (left @ Value::String(_), right) | (left, right @ Value::String(_)) => {
                Ok(Value::String(format!("{left}{right}")))
            }
            (left, right) => Err(mismatch(op, &left, &right, line)),
        },
        BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide => {
            let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
                return Err(mismatch(op, &left, &right, line));
            };
            Ok(Value::Number(match op {
                BinaryOp::Subtract => a - b,
                BinaryOp::Multiply => a * b,
                _ => a / b,
            }))
        }
    }
}

/// Combine an assignment's right-hand side with the stored value.
pub fn assign(
    op: AssignOp,
    variable: &str,
    current: Option<Value>,
    value: Value,
    line: usize,
) -> Result<Value, RunError> {
    let arithmetic = match op {
        AssignOp::Set => return Ok(value),
        AssignOp::Add => BinaryOp::Add,
        AssignOp::Subtract => BinaryOp::Subtract,
        AssignOp::Multiply => BinaryOp::Multiply,
        AssignOp::Divide => BinaryOp::Divide,
    };
    let current = current.ok_or_else(|| RunError::UnsetVariable {
        name: variable.to_string(),
        line,
    })?;
    binary(arithmetic, current, value, line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn eval(source: &str, session: &mut Session) -> Result<Value, RunError> {
        let expr = parse_expression(source, 1).expect("parse failed");
        evaluate(&expr, session)
    }

    #[test]
    fn arithmetic_precedence() {
        let mut session = Session::default();
        assert_eq!(
            eval("(1 + 2) * -3 + 4.5", &mut session),
            Ok(Value::Number(-4.5))
        );
    }

    #[test]
    fn string_concatenation() {
        let mut session = Session::default();
        assert_eq!(
            eval("\"Variable String\" + \" Appended\"", &mut session),
            Ok(Value::from("Variable String Appended"))
        );
        assert_eq!(eval("\"n=\" + 3", &mut session), Ok(Value::from("n=3")));
    }

    #[test]
    fn comparisons() {
        let mut session = Session::default();
        assert_eq!(eval("2 >= 2", &mut session), Ok(Value::Bool(true)));
        assert_eq!(eval("\"a\" < \"b\"", &mut session), Ok(Value::Bool(true)));
        assert_eq!(eval("1 == \"1\"", &mut session), Ok(Value::Bool(false)));
        assert!(matches!(
            eval("1 < true", &mut session),
            Err(RunError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn logic_short_circuits() {
        let mut session = Session::default();
        // $never is unset; short-circuit must not read it.
        assert_eq!(
            eval("false and $never", &mut session),
            Ok(Value::Bool(false))
        );
        assert_eq!(eval("true or $never", &mut session), Ok(Value::Bool(true)));
        assert_eq!(eval("true xor true", &mut session), Ok(Value::Bool(false)));
        assert_eq!(eval("not 0", &mut session), Ok(Value::Bool(true)));
    }

    #[test]
    fn unset_variable() {
        let mut session = Session::default();
        assert_eq!(
            eval("$missing + 1", &mut session),
            Err(RunError::UnsetVariable {
                name: "missing".into(),
                line: 1,
            })
        );
    }

    #[test]
    fn subtracting_strings_is_a_type_error() {
        let mut session = Session::default();
        assert!(matches!(
            eval("\"a\" - 1", &mut session),
            Err(RunError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn negating_a_string_names_the_operand() {
        let mut session = Session::default();
        let err = eval("-\"a\"", &mut session).expect_err("should fail");
        assert_eq!(
            err,
            RunError::InvalidOperand {
                operator: "-".into(),
                operand: "string".into(),
                line: 1,
            }
        );
        assert_eq!(err.to_string(), "cannot apply '-' to string at line 1");
    }

    #[test]
    fn compound_assignment_needs_a_value() {
        assert_eq!(
            assign(AssignOp::Add, "x", Some(Value::from(1)), Value::from(2), 1),
            Ok(Value::Number(3.0))
        );
        assert!(matches!(
            assign(AssignOp::Multiply, "x", None, Value::from(2), 4),
            Err(RunError::UnsetVariable { line: 4, .. })
        ));
        assert_eq!(
            assign(AssignOp::Set, "x", None, Value::from(2), 1),
            Ok(Value::Number(2.0))
        );
    }
}
