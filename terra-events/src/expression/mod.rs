//! Sandboxed condition language.
//!
//! Handler conditions and recipient lists are short expressions evaluated
//! against the event's variables and the handler's settings:
//!
//! ```text
//! status == 'approved' and days > 0
//! user_email in settings.REVIEWERS
//! split(recipients, ',')
//! ```
//!
//! The language has no assignment, no attribute access on anything but
//! settings maps, and no callables beyond a fixed set of built-ins, so an
//! expression can only ever compute a value. Source length and nesting
//! depth are bounded by [`EvaluatorLimits`].

mod functions;
mod interpreter;
mod lexer;
mod parser;
mod value;

pub use value::{Value, Variables};

use crate::error::ExpressionError;
use parser::Expr;
use tracing::trace;

/// Deepest nesting any [`EvaluatorLimits`] can allow.
pub const MAX_DEPTH: usize = terra_config::MAX_EXPRESSION_DEPTH;

/// Bounds applied before an expression is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorLimits {
    /// Maximum source length in bytes.
    pub max_length: usize,
    /// Maximum nesting depth, capped at [`MAX_DEPTH`].
    pub max_depth: usize,
}

impl Default for EvaluatorLimits {
    fn default() -> Self {
        Self {
            max_length: 4096,
            max_depth: 64,
        }
    }
}

/// A parsed expression, ready to be evaluated any number of times.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    /// Parse with the default limits.
    pub fn parse(src: &str) -> Result<Self, ExpressionError> {
        Self::parse_with(src, EvaluatorLimits::default())
    }

    /// Parse with explicit limits.
    pub fn parse_with(src: &str, limits: EvaluatorLimits) -> Result<Self, ExpressionError> {
        if src.len() > limits.max_length {
            return Err(ExpressionError::TooLong {
                len: src.len(),
                max: limits.max_length,
            });
        }

        let tokens = lexer::tokenize(src)?;
        let ast = parser::parse(&tokens, src.len(), limits.max_depth.min(MAX_DEPTH))?;

        Ok(Self {
            source: src.to_string(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against `vars`.
    pub fn evaluate(&self, vars: &Variables) -> Result<Value, ExpressionError> {
        interpreter::eval(&self.ast, vars)
    }
}

/// Parses and evaluates expressions under a fixed set of limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    limits: EvaluatorLimits,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: EvaluatorLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> EvaluatorLimits {
        self.limits
    }

    /// Parse `src` under this evaluator's limits.
    pub fn compile(&self, src: &str) -> Result<Expression, ExpressionError> {
        Expression::parse_with(src, self.limits)
    }

    /// Evaluate `src` to a value.
    pub fn eval(&self, src: &str, vars: &Variables) -> Result<Value, ExpressionError> {
        let value = self.compile(src)?.evaluate(vars)?;
        trace!(expression = %src, result = %value, "Evaluated expression");
        Ok(value)
    }

    /// Evaluate `src` and reduce the result to its truthiness.
    pub fn eval_bool(&self, src: &str, vars: &Variables) -> Result<bool, ExpressionError> {
        Ok(self.eval(src, vars)?.truthy())
    }

    /// Evaluate `src` to a list of strings.
    ///
    /// A string yields a one-element list, a list yields its stringified
    /// elements and `None` yields an empty list.
    pub fn eval_strings(&self, src: &str, vars: &Variables) -> Result<Vec<String>, ExpressionError> {
        match self.eval(src, vars)? {
            Value::Null => Ok(Vec::new()),
            Value::Str(s) => Ok(vec![s]),
            Value::List(items) => Ok(items.iter().map(ToString::to_string).collect()),
            other => Err(ExpressionError::Type(format!(
                "expected a string or a list, got {}",
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars() -> Variables {
        let mut vars = Variables::new();
        vars.insert("action".into(), Value::from("REQUEST_APPROVED"));
        vars.insert("user_email".into(), Value::from("ada@example.com"));
        vars.insert("days".into(), Value::Int(30));
        vars.insert("recipients".into(), Value::from("a@example.com, b@example.com"));
        vars.insert(
            "settings".into(),
            Value::from(json!({"REVIEWERS": ["ada@example.com"], "LIMIT": 2.5})),
        );
        vars
    }

    fn eval(src: &str) -> Result<Value, ExpressionError> {
        Evaluator::new().eval(src, &vars())
    }

    #[test]
    fn test_literals() {
        let e = Evaluator::new();
        assert!(e.eval_bool("True", &Variables::new()).unwrap());
        assert!(!e.eval_bool("False", &Variables::new()).unwrap());
        assert!(!e.eval_bool("None", &Variables::new()).unwrap());
        assert_eq!(eval("'x'").unwrap(), Value::from("x"));
        assert_eq!(eval("-3").unwrap(), Value::Int(-3));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(
            eval("action == 'REQUEST_APPROVED' and days >= 30").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(eval("days < 10 || action != 'X'").unwrap(), Value::Bool(true));
        assert_eq!(eval("not days").unwrap(), Value::Bool(false));
        assert_eq!(eval("days == 30.0").unwrap(), Value::Bool(true));
        assert_eq!(eval("'' or 'fallback'").unwrap(), Value::from("fallback"));
    }

    #[test]
    fn test_short_circuit_skips_unknown_names() {
        assert_eq!(eval("False and missing").unwrap(), Value::Bool(false));
        assert_eq!(eval("True or missing").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_membership() {
        assert_eq!(
            eval("user_email in settings.REVIEWERS").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(eval("'APPROVED' in action").unwrap(), Value::Bool(true));
        assert_eq!(eval("'LIMIT' in settings").unwrap(), Value::Bool(true));
        assert_eq!(eval("'x' not in ['a', 'b']").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("days * 2 + 1").unwrap(), Value::Int(61));
        assert_eq!(eval("days / 4").unwrap(), Value::Float(7.5));
        assert_eq!(eval("days % 7").unwrap(), Value::Int(2));
        assert_eq!(eval("settings.LIMIT * 2").unwrap(), Value::Float(5.0));
        assert_eq!(eval("'a' + 'b'").unwrap(), Value::from("ab"));
        assert_eq!(eval("days / 0"), Err(ExpressionError::DivisionByZero));
        assert_eq!(eval("days % 0"), Err(ExpressionError::DivisionByZero));
    }

    #[test]
    fn test_modulo_follows_divisor_sign() {
        assert_eq!(eval("7 % -3").unwrap(), Value::Int(-2));
        assert_eq!(eval("-7 % 3").unwrap(), Value::Int(2));
        assert_eq!(eval("-6 % 3").unwrap(), Value::Int(0));
        assert_eq!(eval("7.5 % -2").unwrap(), Value::Float(-0.5));
    }

    #[test]
    fn test_modulo_overflow_is_an_error() {
        assert!(matches!(
            eval("(-9223372036854775807 - 1) % -1"),
            Err(ExpressionError::Type(msg)) if msg.contains("overflow")
        ));
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("upper(action[0])").unwrap(), Value::from("R"));
        assert_eq!(eval("len(settings.REVIEWERS)").unwrap(), Value::Int(1));
        assert_eq!(eval("int('12') + 1").unwrap(), Value::Int(13));
        assert_eq!(eval("str(days)").unwrap(), Value::from("30"));
        assert_eq!(
            eval("join(split('a b', ' '), '-')").unwrap(),
            Value::from("a-b")
        );
        assert_eq!(
            eval("endswith(user_email, '@example.com')").unwrap(),
            Value::Bool(true)
        );
        assert!(matches!(eval("lower(days)"), Err(ExpressionError::Type(_))));
    }

    #[test]
    fn test_indexing() {
        assert_eq!(eval("['a', 'b'][-1]").unwrap(), Value::from("b"));
        assert_eq!(eval("settings['MISSING']").unwrap(), Value::Null);
        assert!(matches!(eval("['a'][3]"), Err(ExpressionError::Type(_))));
        assert!(matches!(eval("days.field"), Err(ExpressionError::Type(_))));
    }

    #[test]
    fn test_unknown_variable() {
        assert_eq!(
            eval("nope == 1"),
            Err(ExpressionError::UnknownVariable("nope".into()))
        );
    }

    #[test]
    fn test_eval_strings() {
        let e = Evaluator::new();
        let vars = vars();
        assert_eq!(
            e.eval_strings("[user_email, 'ops@example.com']", &vars).unwrap(),
            vec!["ada@example.com", "ops@example.com"]
        );
        assert_eq!(
            e.eval_strings("user_email", &vars).unwrap(),
            vec!["ada@example.com"]
        );
        assert!(e.eval_strings("None", &vars).unwrap().is_empty());
        assert!(e.eval_strings("days", &vars).is_err());
    }

    #[test]
    fn test_limits() {
        let e = Evaluator::with_limits(EvaluatorLimits {
            max_length: 16,
            max_depth: 3,
        });
        assert!(matches!(
            e.eval("'a very long expression'", &Variables::new()),
            Err(ExpressionError::TooLong { max: 16, .. })
        ));
        assert_eq!(
            e.eval("((((1))))", &Variables::new()),
            Err(ExpressionError::TooDeep(3))
        );
        assert_eq!(e.eval("((1))", &Variables::new()).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_deepest_expression_fits_worker_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(2 << 20)
            .spawn(|| {
                let e = Evaluator::with_limits(EvaluatorLimits {
                    max_length: 8192,
                    max_depth: 1024,
                });
                let deepest = format!("{}1{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
                let negations = format!("{}True", "not ".repeat(MAX_DEPTH));
                let too_deep = format!("{}1{}", "(".repeat(1000), ")".repeat(1000));
                (
                    e.eval(&deepest, &Variables::new()),
                    e.eval(&negations, &Variables::new()),
                    e.eval(&too_deep, &Variables::new()),
                )
            })
            .unwrap();

        let (deepest, negations, too_deep) = handle.join().unwrap();
        assert_eq!(deepest.unwrap(), Value::Int(1));
        assert_eq!(negations.unwrap(), Value::Bool(true));
        assert_eq!(too_deep, Err(ExpressionError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn test_compiled_expression_is_reusable() {
        let expr = Expression::parse("days > 10").unwrap();
        assert_eq!(expr.source(), "days > 10");

        let mut vars = Variables::new();
        vars.insert("days".into(), Value::Int(5));
        assert_eq!(expr.evaluate(&vars).unwrap(), Value::Bool(false));
        vars.insert("days".into(), Value::Int(50));
        assert_eq!(expr.evaluate(&vars).unwrap(), Value::Bool(true));
    }
}
