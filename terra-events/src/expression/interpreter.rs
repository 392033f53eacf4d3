//! Tree-walking evaluation.

use super::parser::{BinOp, Expr};
use super::{Value, Variables};
use crate::error::ExpressionError;
use std::cmp::Ordering;

pub(crate) fn eval(expr: &Expr, vars: &Variables) -> Result<Value, ExpressionError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Var(name) => vars
            .get(name)
            .cloned()
            .ok_or_else(|| ExpressionError::UnknownVariable(name.clone())),
        Expr::List(items) => items
            .iter()
            .map(|item| eval(item, vars))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expr::Not(operand) => Ok(Value::Bool(!eval(operand, vars)?.truthy())),
        Expr::Neg(operand) => match eval(operand, vars)? {
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| overflow("-")),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(ExpressionError::Type(format!(
                "bad operand type for unary -: {}",
                other.type_name()
            ))),
        },
        // `and`/`or` short-circuit and yield an operand, not a bool
        Expr::And(left, right) => {
            let left = eval(left, vars)?;
            if left.truthy() {
                eval(right, vars)
            } else {
                Ok(left)
            }
        }
        Expr::Or(left, right) => {
            let left = eval(left, vars)?;
            if left.truthy() {
                Ok(left)
            } else {
                eval(right, vars)
            }
        }
        Expr::Binary(op, left, right) => {
            let left = eval(left, vars)?;
            let right = eval(right, vars)?;
            binary(*op, left, right)
        }
        Expr::Member(base, field) => match eval(base, vars)? {
            Value::Map(mut map) => Ok(map.remove(field).unwrap_or_default()),
            other => Err(ExpressionError::Type(format!(
                "{} has no field '{}'",
                other.type_name(),
                field
            ))),
        },
        Expr::Index(base, index) => {
            let base = eval(base, vars)?;
            let index = eval(index, vars)?;
            subscript(base, index)
        }
        Expr::Call(builtin, args) => {
            let args = args
                .iter()
                .map(|arg| eval(arg, vars))
                .collect::<Result<Vec<_>, _>>()?;
            builtin.call(args)
        }
    }
}

fn binary(op: BinOp, left: Value, right: Value) -> Result<Value, ExpressionError> {
    use Value::{Float, Int, List, Str};

    match op {
        BinOp::Eq => Ok(Value::Bool(equals(&left, &right))),
        BinOp::Ne => Ok(Value::Bool(!equals(&left, &right))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = compare(&left, &right).ok_or_else(|| {
                ExpressionError::Type(format!(
                    "cannot compare {} with {}",
                    left.type_name(),
                    right.type_name()
                ))
            })?;
            Ok(Value::Bool(match op {
                BinOp::Lt => ordering == Ordering::Less,
                BinOp::Le => ordering != Ordering::Greater,
                BinOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinOp::In => contains(&right, &left).map(Value::Bool),
        BinOp::NotIn => contains(&right, &left).map(|found| Value::Bool(!found)),
        BinOp::Add => match (left, right) {
            (Int(a), Int(b)) => a.checked_add(b).map(Int).ok_or_else(|| overflow("+")),
            (Str(a), Str(b)) => Ok(Str(a + &b)),
            (List(mut a), List(b)) => {
                a.extend(b);
                Ok(List(a))
            }
            (a, b) => float_op(&a, &b, "+", |x, y| x + y),
        },
        BinOp::Sub => match (left, right) {
            (Int(a), Int(b)) => a.checked_sub(b).map(Int).ok_or_else(|| overflow("-")),
            (a, b) => float_op(&a, &b, "-", |x, y| x - y),
        },
        BinOp::Mul => match (left, right) {
            (Int(a), Int(b)) => a.checked_mul(b).map(Int).ok_or_else(|| overflow("*")),
            (a, b) => float_op(&a, &b, "*", |x, y| x * y),
        },
        BinOp::Div => {
            if matches!(right, Int(0)) || matches!(right, Float(f) if f == 0.0) {
                return Err(ExpressionError::DivisionByZero);
            }
            float_op(&left, &right, "/", |x, y| x / y)
        }
        BinOp::Mod => match (left, right) {
            (Int(_), Int(0)) => Err(ExpressionError::DivisionByZero),
            (Int(a), Int(b)) => floor_mod(a, b).map(Int).ok_or_else(|| overflow("%")),
            (_, Float(f)) if f == 0.0 => Err(ExpressionError::DivisionByZero),
            (a, b) => float_op(&a, &b, "%", |x, y| {
                let r = x % y;
                if r != 0.0 && (r < 0.0) != (y < 0.0) {
                    r + y
                } else {
                    r
                }
            }),
        },
    }
}

fn float_op(
    left: &Value,
    right: &Value,
    symbol: &str,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Value, ExpressionError> {
    match (as_f64(left), as_f64(right)) {
        (Some(x), Some(y)) => Ok(Value::Float(f(x, y))),
        _ => Err(ExpressionError::Type(format!(
            "unsupported operand types for {}: {} and {}",
            symbol,
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            as_f64(left) == as_f64(right)
        }
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => as_f64(left)?.partial_cmp(&as_f64(right)?),
    }
}

fn contains(haystack: &Value, needle: &Value) -> Result<bool, ExpressionError> {
    match (haystack, needle) {
        (Value::List(items), _) => Ok(items.iter().any(|item| equals(item, needle))),
        (Value::Str(s), Value::Str(sub)) => Ok(s.contains(sub.as_str())),
        (Value::Map(map), Value::Str(key)) => Ok(map.contains_key(key)),
        _ => Err(ExpressionError::Type(format!(
            "'in' is not supported between {} and {}",
            needle.type_name(),
            haystack.type_name()
        ))),
    }
}

fn subscript(base: Value, index: Value) -> Result<Value, ExpressionError> {
    match (base, index) {
        (Value::List(mut items), Value::Int(i)) => {
            let idx = position(i, items.len())?;
            Ok(items.swap_remove(idx))
        }
        (Value::Str(s), Value::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = position(i, chars.len())?;
            Ok(Value::Str(chars[idx].to_string()))
        }
        (Value::Map(mut map), Value::Str(key)) => Ok(map.remove(&key).unwrap_or_default()),
        (base, index) => Err(ExpressionError::Type(format!(
            "{} cannot be indexed by {}",
            base.type_name(),
            index.type_name()
        ))),
    }
}

/// Resolve a possibly negative index against `len`.
fn position(index: i64, len: usize) -> Result<usize, ExpressionError> {
    let resolved = if index < 0 {
        len.checked_sub(index.unsigned_abs() as usize)
    } else {
        Some(index as usize)
    };
    resolved
        .filter(|&i| i < len)
        .ok_or_else(|| ExpressionError::Type(format!("index {} out of range", index)))
}

/// Remainder taking the sign of the divisor: `7 % -3 == -2`.
fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && (r < 0) != (b < 0) {
        r.checked_add(b)
    } else {
        Some(r)
    }
}

fn overflow(symbol: &str) -> ExpressionError {
    ExpressionError::Type(format!("integer overflow in {}", symbol))
}
