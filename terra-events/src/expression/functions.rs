//! Built-in functions. This is the complete set of callables.

use super::Value;
use crate::error::ExpressionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Len,
    Lower,
    Upper,
    Str,
    Int,
    Split,
    Join,
    StartsWith,
    EndsWith,
}

impl Builtin {
    pub(crate) fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "len" => Self::Len,
            "lower" => Self::Lower,
            "upper" => Self::Upper,
            "str" => Self::Str,
            "int" => Self::Int,
            "split" => Self::Split,
            "join" => Self::Join,
            "startswith" => Self::StartsWith,
            "endswith" => Self::EndsWith,
            _ => return None,
        })
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Len => "len",
            Self::Lower => "lower",
            Self::Upper => "upper",
            Self::Str => "str",
            Self::Int => "int",
            Self::Split => "split",
            Self::Join => "join",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
        }
    }

    /// Accepted argument counts (inclusive).
    pub(crate) fn arity(self) -> (usize, usize) {
        match self {
            Self::Len | Self::Lower | Self::Upper | Self::Str | Self::Int => (1, 1),
            Self::Split => (1, 2),
            Self::Join | Self::StartsWith | Self::EndsWith => (2, 2),
        }
    }

    pub(crate) fn call(self, args: Vec<Value>) -> Result<Value, ExpressionError> {
        let mut args = args.into_iter();
        let first = args.next().unwrap_or_default();
        let second = args.next();

        match self {
            Self::Len => match &first {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::List(items) => Ok(Value::Int(items.len() as i64)),
                Value::Map(map) => Ok(Value::Int(map.len() as i64)),
                other => Err(self.bad_arg(other)),
            },
            Self::Lower => Ok(Value::Str(self.string(&first)?.to_lowercase())),
            Self::Upper => Ok(Value::Str(self.string(&first)?.to_uppercase())),
            Self::Str => Ok(Value::Str(first.to_string())),
            Self::Int => match &first {
                Value::Int(i) => Ok(Value::Int(*i)),
                Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
                Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
                Value::Str(s) => s.trim().parse().map(Value::Int).map_err(|_| {
                    ExpressionError::Type(format!("int() cannot convert '{}'", s))
                }),
                other => Err(self.bad_arg(other)),
            },
            Self::Split => {
                let s = self.string(&first)?;
                let parts: Vec<Value> = match &second {
                    None => s.split_whitespace().map(Value::from).collect(),
                    Some(sep) => {
                        let sep = self.string(sep)?;
                        if sep.is_empty() {
                            return Err(ExpressionError::Type(
                                "split() separator is empty".to_string(),
                            ));
                        }
                        s.split(sep).map(Value::from).collect()
                    }
                };
                Ok(Value::List(parts))
            }
            Self::Join => {
                let Value::List(items) = &first else {
                    return Err(self.bad_arg(&first));
                };
                let sep = self.string(second.as_ref().unwrap_or(&Value::Null))?;
                let joined = items
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(sep);
                Ok(Value::Str(joined))
            }
            Self::StartsWith | Self::EndsWith => {
                let s = self.string(&first)?;
                let affix = self.string(second.as_ref().unwrap_or(&Value::Null))?;
                Ok(Value::Bool(if self == Self::StartsWith {
                    s.starts_with(affix)
                } else {
                    s.ends_with(affix)
                }))
            }
        }
    }

    fn string<'v>(self, value: &'v Value) -> Result<&'v str, ExpressionError> {
        value.as_str().ok_or_else(|| self.bad_arg(value))
    }

    fn bad_arg(self, value: &Value) -> ExpressionError {
        ExpressionError::Type(format!(
            "{}() does not accept a {} argument",
            self.name(),
            value.type_name()
        ))
    }
}
