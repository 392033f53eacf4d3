//! Tokenizer for condition expressions.

use crate::error::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    None,
    And,
    Or,
    Not,
    In,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub pos: usize,
}

pub(crate) fn tokenize(src: &str) -> Result<Vec<Spanned>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let token = if c.is_ascii_digit() {
            let mut end = pos;
            let mut is_float = false;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_ascii_digit() {
                    end = i + 1;
                    chars.next();
                } else if d == '.' && !is_float {
                    let mut ahead = chars.clone();
                    ahead.next();
                    match ahead.peek() {
                        Some(&(_, n)) if n.is_ascii_digit() => {
                            is_float = true;
                            end = i + 1;
                            chars.next();
                        }
                        _ => break,
                    }
                } else {
                    break;
                }
            }
            let text = &src[pos..end];
            if is_float {
                Token::Float(text.parse().map_err(|_| syntax(pos, "invalid number"))?)
            } else {
                Token::Int(text.parse().map_err(|_| syntax(pos, "integer out of range"))?)
            }
        } else if c.is_alphabetic() || c == '_' {
            let mut end = pos;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            match &src[pos..end] {
                "and" => Token::And,
                "or" => Token::Or,
                "not" => Token::Not,
                "in" => Token::In,
                "True" | "true" => Token::True,
                "False" | "false" => Token::False,
                "None" | "null" => Token::None,
                ident => Token::Ident(ident.to_string()),
            }
        } else if c == '\'' || c == '"' {
            chars.next();
            let mut out = String::new();
            let mut closed = false;
            while let Some((_, d)) = chars.next() {
                match d {
                    '\\' => match chars.next() {
                        Some((_, 'n')) => out.push('\n'),
                        Some((_, 't')) => out.push('\t'),
                        Some((_, 'r')) => out.push('\r'),
                        Some((_, e @ ('\\' | '\'' | '"'))) => out.push(e),
                        Some((i, e)) => {
                            return Err(syntax(i, &format!("unknown escape '\\{}'", e)));
                        }
                        None => break,
                    },
                    d if d == c => {
                        closed = true;
                        break;
                    }
                    d => out.push(d),
                }
            }
            if !closed {
                return Err(syntax(pos, "unterminated string"));
            }
            tokens.push(Spanned {
                token: Token::Str(out),
                pos,
            });
            continue;
        } else {
            chars.next();
            let next = chars.peek().map(|&(_, n)| n);
            let (token, double) = match (c, next) {
                ('=', Some('=')) => (Token::Eq, true),
                ('!', Some('=')) => (Token::Ne, true),
                ('<', Some('=')) => (Token::Le, true),
                ('>', Some('=')) => (Token::Ge, true),
                ('&', Some('&')) => (Token::And, true),
                ('|', Some('|')) => (Token::Or, true),
                ('<', _) => (Token::Lt, false),
                ('>', _) => (Token::Gt, false),
                ('!', _) => (Token::Not, false),
                ('(', _) => (Token::LParen, false),
                (')', _) => (Token::RParen, false),
                ('[', _) => (Token::LBracket, false),
                (']', _) => (Token::RBracket, false),
                (',', _) => (Token::Comma, false),
                ('.', _) => (Token::Dot, false),
                ('+', _) => (Token::Plus, false),
                ('-', _) => (Token::Minus, false),
                ('*', _) => (Token::Star, false),
                ('/', _) => (Token::Slash, false),
                ('%', _) => (Token::Percent, false),
                ('=', _) => return Err(syntax(pos, "assignment is not allowed, use '=='")),
                _ => return Err(syntax(pos, &format!("unexpected character '{}'", c))),
            };
            if double {
                chars.next();
            }
            tokens.push(Spanned { token, pos });
            continue;
        };

        tokens.push(Spanned { token, pos });
    }

    Ok(tokens)
}

fn syntax(pos: usize, message: &str) -> ExpressionError {
    ExpressionError::Syntax {
        pos,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_tokenize_comparison() {
        assert_eq!(
            kinds("status == 'approved' && days >= 30"),
            vec![
                Token::Ident("status".into()),
                Token::Eq,
                Token::Str("approved".into()),
                Token::And,
                Token::Ident("days".into()),
                Token::Ge,
                Token::Int(30),
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers_and_members() {
        assert_eq!(
            kinds("1.5 + x.y[0]"),
            vec![
                Token::Float(1.5),
                Token::Plus,
                Token::Ident("x".into()),
                Token::Dot,
                Token::Ident("y".into()),
                Token::LBracket,
                Token::Int(0),
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(kinds(r#""a\"b\n""#), vec![Token::Str("a\"b\n".into())]);
        assert_eq!(kinds("'it\\'s'"), vec![Token::Str("it's".into())]);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("not x in y or None"),
            vec![
                Token::Not,
                Token::Ident("x".into()),
                Token::In,
                Token::Ident("y".into()),
                Token::Or,
                Token::None,
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            tokenize("'open"),
            Err(ExpressionError::Syntax { pos: 0, .. })
        ));
        assert!(matches!(
            tokenize("a = 1"),
            Err(ExpressionError::Syntax { pos: 2, .. })
        ));
        assert!(tokenize("a ; b").is_err());
    }
}
