//! Sandboxed numeric expression evaluator
//!
//! Grammar (Python-flavoured precedence):
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/' | '//' | '%') unary)*
//! unary  := ('+' | '-') unary | power
//! power  := atom ('**' unary)?
//! atom   := NUMBER | '(' expr ')'
//! ```
//!
//! Only numeric literals and operators are accepted; there are no names,
//! calls or attribute access, so nothing outside arithmetic can run.
//!
//! Integer literals stay exact through `+ - * // % **`. A value becomes
//! floating point only through `/`, a fractional or exponent literal, or a
//! negative power. Integer overflow is an error, never a rounded result.

use std::fmt;

use thiserror::Error;

/// Nesting limit for parentheses and chained unary operators
const MAX_DEPTH: usize = 64;

/// Errors produced while parsing or evaluating an expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unexpected token '{token}' at position {pos}")]
    UnexpectedToken { token: String, pos: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NotFinite,

    #[error("integer result is too large")]
    Overflow,

    #[error("integer {0} cannot be represented exactly as a float")]
    Inexact(i128),

    #[error("expression nested too deeply")]
    TooDeep,
}

/// An evaluated value: exact integer or float
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    fn is_zero(self) -> bool {
        match self {
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
        }
    }

    fn is_negative(self) -> bool {
        match self {
            Number::Int(i) => i < 0,
            Number::Float(f) => f < 0.0,
        }
    }

    /// Float view of the value; integers must convert without rounding
    fn to_f64(self) -> Result<f64, ExprError> {
        match self {
            Number::Float(f) => Ok(f),
            Number::Int(i) => {
                let f = i as f64;
                if f as i128 != i {
                    return Err(ExprError::Inexact(i));
                }
                Ok(f)
            }
        }
    }

    fn neg(self) -> Result<Number, ExprError> {
        match self {
            Number::Int(i) => i.checked_neg().map(Number::Int).ok_or(ExprError::Overflow),
            Number::Float(f) => Ok(Number::Float(-f)),
        }
    }

    fn add(self, rhs: Number) -> Result<Number, ExprError> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a.checked_add(b).map(Number::Int).ok_or(ExprError::Overflow),
            _ => Ok(Number::Float(self.to_f64()? + rhs.to_f64()?)),
        }
    }

    fn sub(self, rhs: Number) -> Result<Number, ExprError> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a.checked_sub(b).map(Number::Int).ok_or(ExprError::Overflow),
            _ => Ok(Number::Float(self.to_f64()? - rhs.to_f64()?)),
        }
    }

    fn mul(self, rhs: Number) -> Result<Number, ExprError> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a.checked_mul(b).map(Number::Int).ok_or(ExprError::Overflow),
            _ => Ok(Number::Float(self.to_f64()? * rhs.to_f64()?)),
        }
    }

    fn div(self, rhs: Number) -> Result<Number, ExprError> {
        if rhs.is_zero() {
            return Err(ExprError::DivisionByZero);
        }
        // exact quotients keep full integer precision
        if let (Number::Int(a), Number::Int(b)) = (self, rhs)
            && a.checked_rem(b) == Some(0)
        {
            return a.checked_div(b).map(Number::Int).ok_or(ExprError::Overflow);
        }
        Ok(Number::Float(self.to_f64()? / rhs.to_f64()?))
    }

    fn floor_div(self, rhs: Number) -> Result<Number, ExprError> {
        if rhs.is_zero() {
            return Err(ExprError::DivisionByZero);
        }
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => {
                let quotient = a.checked_div(b).ok_or(ExprError::Overflow)?;
                if a % b != 0 && (a < 0) != (b < 0) {
                    return Ok(Number::Int(quotient - 1));
                }
                Ok(Number::Int(quotient))
            }
            _ => Ok(Number::Float((self.to_f64()? / rhs.to_f64()?).floor())),
        }
    }

    /// Floored modulo: the result takes the sign of the divisor
    fn modulo(self, rhs: Number) -> Result<Number, ExprError> {
        if rhs.is_zero() {
            return Err(ExprError::DivisionByZero);
        }
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => {
                let rem = a.checked_rem(b).ok_or(ExprError::Overflow)?;
                if rem != 0 && (rem < 0) != (b < 0) {
                    return Ok(Number::Int(rem + b));
                }
                Ok(Number::Int(rem))
            }
            _ => {
                let (a, b) = (self.to_f64()?, rhs.to_f64()?);
                Ok(Number::Float(a - b * (a / b).floor()))
            }
        }
    }

    fn pow(self, exponent: Number) -> Result<Number, ExprError> {
        if self.is_zero() && exponent.is_negative() {
            return Err(ExprError::DivisionByZero);
        }
        if let (Number::Int(base), Number::Int(exp)) = (self, exponent)
            && exp >= 0
        {
            let exp = u32::try_from(exp).map_err(|_| ExprError::Overflow)?;
            return base.checked_pow(exp).map(Number::Int).ok_or(ExprError::Overflow);
        }
        Ok(Number::Float(self.to_f64()?.powf(exponent.to_f64()?)))
    }
}

/// Integers print exactly; integral floats print without a fractional part
impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{}", *v as i64),
            Number::Float(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Number),
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    DoubleStar,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => n.to_string(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::DoubleSlash => "//".into(),
            Token::Percent => "%".into(),
            Token::DoubleStar => "**".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, ExprError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let start = i;
        match ch {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '0'..='9' | '.' => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == '_') {
                    i += 1;
                }
                // exponent: e, e+, e-
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let text: String = literal.chars().filter(|c| *c != '_').collect();
                let value = if text.chars().all(|c| c.is_ascii_digit()) {
                    text.parse::<i128>().map(Number::Int).map_err(|_| ExprError::Overflow)?
                } else {
                    text.parse::<f64>()
                        .map(Number::Float)
                        .map_err(|_| ExprError::InvalidNumber(literal))?
                };
                tokens.push((Token::Number(value), start));
                continue;
            }
            '+' => tokens.push((Token::Plus, start)),
            '-' => tokens.push((Token::Minus, start)),
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    i += 1;
                    tokens.push((Token::DoubleStar, start));
                } else {
                    tokens.push((Token::Star, start));
                }
            }
            '/' => {
                if chars.get(i + 1) == Some(&'/') {
                    i += 1;
                    tokens.push((Token::DoubleSlash, start));
                } else {
                    tokens.push((Token::Slash, start));
                }
            }
            '%' => tokens.push((Token::Percent, start)),
            '(' => tokens.push((Token::LParen, start)),
            ')' => tokens.push((Token::RParen, start)),
            other => return Err(ExprError::UnexpectedChar { ch: other, pos: start }),
        }
        i += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Number, ExprError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    value = value.add(self.term()?)?;
                }
                Some(Token::Minus) => {
                    self.advance();
                    value = value.sub(self.term()?)?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<Number, ExprError> {
        let mut value = self.unary()?;
        loop {
            let op: fn(Number, Number) -> Result<Number, ExprError> = match self.peek() {
                Some(Token::Star) => Number::mul,
                Some(Token::Slash) => Number::div,
                Some(Token::DoubleSlash) => Number::floor_div,
                Some(Token::Percent) => Number::modulo,
                _ => return Ok(value),
            };
            self.advance();
            value = op(value, self.unary()?)?;
        }
    }

    fn unary(&mut self) -> Result<Number, ExprError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                self.enter()?;
                let value = self.unary()?;
                self.depth -= 1;
                value.neg()
            }
            Some(Token::Plus) => {
                self.advance();
                self.enter()?;
                let value = self.unary()?;
                self.depth -= 1;
                Ok(value)
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Number, ExprError> {
        let base = self.atom()?;
        if let Some(Token::DoubleStar) = self.peek() {
            self.advance();
            self.enter()?;
            let exponent = self.unary()?;
            self.depth -= 1;
            return base.pow(exponent);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Number, ExprError> {
        match self.advance() {
            Some((Token::Number(n), _)) => Ok(n),
            Some((Token::LParen, _)) => {
                self.enter()?;
                let value = self.expr()?;
                self.depth -= 1;
                match self.advance() {
                    Some((Token::RParen, _)) => Ok(value),
                    Some((token, pos)) => Err(ExprError::UnexpectedToken {
                        token: token.describe(),
                        pos,
                    }),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some((token, pos)) => Err(ExprError::UnexpectedToken {
                token: token.describe(),
                pos,
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

/// Evaluate an arithmetic expression
pub fn evaluate(input: &str) -> Result<Number, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;

    if let Some((token, pos)) = parser.advance() {
        return Err(ExprError::UnexpectedToken {
            token: token.describe(),
            pos,
        });
    }

    if let Number::Float(f) = value
        && !f.is_finite()
    {
        return Err(ExprError::NotFinite);
    }

    Ok(value)
}
