//! Recursive-descent parser producing the expression tree.
//!
//! Precedence, lowest first: `or`, `and`, `not`, comparisons (`in` and
//! `not in` included), `+ -`, `* / %`, unary minus, postfix access.

use super::Value;
use super::functions::Builtin;
use super::lexer::{Spanned, Token};
use crate::error::ExpressionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Var(String),
    List(Vec<Expr>),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Builtin, Vec<Expr>),
}

pub(crate) fn parse(
    tokens: &[Spanned],
    src_len: usize,
    max_depth: usize,
) -> Result<Expr, ExpressionError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
        src_len,
    };

    if tokens.is_empty() {
        return Err(parser.error("empty expression"));
    }

    let expr = parser.parse_or()?;
    if parser.pos < tokens.len() {
        return Err(parser.error("unexpected token"));
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    depth: usize,
    max_depth: usize,
    src_len: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_second(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos).map(|s| &s.token);
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), ExpressionError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {}", what)))
        }
    }

    fn error(&self, message: &str) -> ExpressionError {
        let pos = self
            .tokens
            .get(self.pos)
            .map(|s| s.pos)
            .unwrap_or(self.src_len);
        ExpressionError::Syntax {
            pos,
            message: message.to_string(),
        }
    }

    /// Account for one more level of nesting.
    fn nest(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ExpressionError::TooDeep(self.max_depth));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let saved = self.depth;
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            self.nest()?;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth = saved;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let saved = self.depth;
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            self.nest()?;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth = saved;
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ExpressionError> {
        // `not in` belongs to the comparison level
        if self.peek() == Some(&Token::Not) && self.peek_second() != Some(&Token::In) {
            self.pos += 1;
            let saved = self.depth;
            self.nest()?;
            let operand = self.parse_not()?;
            self.depth = saved;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExpressionError> {
        let left = self.parse_additive()?;

        let op = match self.peek() {
            Some(Token::Eq) => BinOp::Eq,
            Some(Token::Ne) => BinOp::Ne,
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Ge) => BinOp::Ge,
            Some(Token::In) => BinOp::In,
            Some(Token::Not) if self.peek_second() == Some(&Token::In) => {
                self.pos += 1;
                BinOp::NotIn
            }
            _ => return Ok(left),
        };
        self.pos += 1;

        let right = self.parse_additive()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn parse_additive(&mut self) -> Result<Expr, ExpressionError> {
        let saved = self.depth;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            self.nest()?;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = saved;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExpressionError> {
        let saved = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Mod,
                _ => break,
            };
            self.pos += 1;
            self.nest()?;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = saved;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        if self.eat(&Token::Minus) {
            let saved = self.depth;
            self.nest()?;
            let operand = self.parse_unary()?;
            self.depth = saved;
            return Ok(Expr::Neg(Box::new(operand)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExpressionError> {
        let saved = self.depth;
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    self.nest()?;
                    let Some(Token::Ident(field)) = self.peek().cloned() else {
                        return Err(self.error("expected field name after '.'"));
                    };
                    self.pos += 1;
                    expr = Expr::Member(Box::new(expr), field);
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    self.nest()?;
                    let index = self.parse_or()?;
                    self.expect(&Token::RBracket, "']'")?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                Some(Token::LParen) => {
                    return Err(self.error("only built-in functions can be called"));
                }
                _ => break,
            }
        }
        self.depth = saved;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        let start = self.pos;
        let Some(token) = self.advance().cloned() else {
            return Err(self.error("unexpected end of expression"));
        };

        match token {
            Token::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            Token::Float(f) => Ok(Expr::Literal(Value::Float(f))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::None => Ok(Expr::Literal(Value::Null)),
            Token::Ident(name) => {
                if self.peek() == Some(&Token::LParen) {
                    self.parse_call(&name, start)
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Token::LParen => {
                let saved = self.depth;
                self.nest()?;
                let inner = self.parse_or()?;
                self.expect(&Token::RParen, "')'")?;
                self.depth = saved;
                Ok(inner)
            }
            Token::LBracket => {
                let saved = self.depth;
                self.nest()?;
                let items = self.parse_sequence(&Token::RBracket, "']'")?;
                self.depth = saved;
                Ok(Expr::List(items))
            }
            _ => {
                self.pos = start;
                Err(self.error("unexpected token"))
            }
        }
    }

    fn parse_call(&mut self, name: &str, start: usize) -> Result<Expr, ExpressionError> {
        let Some(builtin) = Builtin::lookup(name) else {
            return Err(ExpressionError::UnknownFunction(name.to_string()));
        };

        self.pos += 1;
        let saved = self.depth;
        self.nest()?;
        let args = self.parse_sequence(&Token::RParen, "')'")?;
        self.depth = saved;

        let (min, max) = builtin.arity();
        if args.len() < min || args.len() > max {
            self.pos = start;
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{} to {}", min, max)
            };
            return Err(self.error(&format!(
                "{}() takes {} argument(s), {} given",
                name,
                expected,
                args.len()
            )));
        }

        Ok(Expr::Call(builtin, args))
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed.
    fn parse_sequence(&mut self, close: &Token, what: &str) -> Result<Vec<Expr>, ExpressionError> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.parse_or()?);
            if !self.eat(&Token::Comma) {
                self.expect(close, what)?;
                return Ok(items);
            }
        }
    }
}
