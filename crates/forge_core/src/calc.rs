//! Integer expressions over a single bound variable `n`.
//!
//! Sequence parameters store an expression such as `1000 + n * 10`; the
//! provisioner binds `n` to the counter value before the current write.
//!
//! Grammar (left-associative, `*` and `/` bind tighter than `+` and `-`):
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := integer | 'n' | '-' factor | '(' expr ')'
//! ```
//!
//! Parentheses and unary minus may nest at most [`MAX_NESTING`] levels deep;
//! anything deeper is reported as a parse error at the offending offset.

use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    character::complete::{char, digit1, multispace0, one_of},
    combinator::{all_consuming, map, map_res, value},
    error::{Error as NomError, ErrorKind},
    multi::many0,
    sequence::{delimited, pair, preceded},
    Err as NomErr, Finish, IResult,
};
use thiserror::Error;

pub const VARIABLE: char = 'n';
pub const MAX_NESTING: usize = 256;

type ParseResult<'a, T> = IResult<&'a str, T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticFault {
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    #[error("cannot parse expression '{expression}' at offset {offset}")]
    Parse { expression: String, offset: usize },
    #[error("cannot evaluate expression '{expression}': {fault}")]
    Arithmetic {
        expression: String,
        fault: ArithmeticFault,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn from_symbol(symbol: char) -> Self {
        match symbol {
            '+' => Self::Add,
            '-' => Self::Sub,
            '*' => Self::Mul,
            _ => Self::Div,
        }
    }

    fn apply(self, lhs: i64, rhs: i64) -> Result<i64, ArithmeticFault> {
        let result = match self {
            Self::Add => lhs.checked_add(rhs),
            Self::Sub => lhs.checked_sub(rhs),
            Self::Mul => lhs.checked_mul(rhs),
            Self::Div => {
                if rhs == 0 {
                    return Err(ArithmeticFault::DivisionByZero);
                }
                lhs.checked_div(rhs)
            }
        };
        result.ok_or(ArithmeticFault::Overflow)
    }
}

/// Operator runs of equal precedence are kept flat, so tree depth only grows
/// with parentheses and unary minus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(i64),
    Variable,
    Negate(Box<Expr>),
    Chain {
        head: Box<Expr>,
        tail: Vec<(BinaryOp, Expr)>,
    },
}

impl Expr {
    fn chain(head: Expr, tail: Vec<(BinaryOp, Expr)>) -> Self {
        if tail.is_empty() {
            return head;
        }
        Self::Chain {
            head: Box::new(head),
            tail,
        }
    }

    fn eval(&self, n: i64) -> Result<i64, ArithmeticFault> {
        match self {
            Self::Literal(value) => Ok(*value),
            Self::Variable => Ok(n),
            Self::Negate(inner) => inner
                .eval(n)?
                .checked_neg()
                .ok_or(ArithmeticFault::Overflow),
            Self::Chain { head, tail } => tail
                .iter()
                .try_fold(head.eval(n)?, |lhs, (op, rhs)| op.apply(lhs, rhs.eval(n)?)),
        }
    }
}

/// A parsed expression, ready to be evaluated for any value of `n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, CalcError> {
        match all_consuming(root)(source).finish() {
            Ok((_, root)) => Ok(Self {
                source: source.to_string(),
                root,
            }),
            Err(error) => Err(CalcError::Parse {
                expression: source.to_string(),
                offset: source.len() - error.input.len(),
            }),
        }
    }

    pub fn evaluate(&self, n: i64) -> Result<i64, CalcError> {
        self.root
            .eval(n)
            .map_err(|fault| CalcError::Arithmetic {
                expression: self.source.clone(),
                fault,
            })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }
}

impl FromStr for Expression {
    type Err = CalcError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::parse(source)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> ParseResult<'a, O>
where
    F: FnMut(&'a str) -> ParseResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn root(input: &str) -> ParseResult<'_, Expr> {
    expr(input, 0)
}

fn expr<'a>(input: &'a str, depth: usize) -> ParseResult<'a, Expr> {
    let (input, head) = term(input, depth)?;
    let (input, tail) = many0(pair(
        map(ws(one_of("+-")), BinaryOp::from_symbol),
        |input: &'a str| term(input, depth),
    ))(input)?;
    Ok((input, Expr::chain(head, tail)))
}

fn term<'a>(input: &'a str, depth: usize) -> ParseResult<'a, Expr> {
    let (input, head) = factor(input, depth)?;
    let (input, tail) = many0(pair(
        map(ws(one_of("*/")), BinaryOp::from_symbol),
        |input: &'a str| factor(input, depth),
    ))(input)?;
    Ok((input, Expr::chain(head, tail)))
}

fn factor<'a>(input: &'a str, depth: usize) -> ParseResult<'a, Expr> {
    if depth > MAX_NESTING {
        return Err(NomErr::Failure(NomError::new(input, ErrorKind::TooLarge)));
    }
    ws(alt((
        map_res(digit1, |digits: &str| digits.parse::<i64>().map(Expr::Literal)),
        value(Expr::Variable, char(VARIABLE)),
        map(
            preceded(char('-'), |input: &'a str| factor(input, depth + 1)),
            |inner| Expr::Negate(Box::new(inner)),
        ),
        delimited(
            char('('),
            |input: &'a str| expr(input, depth + 1),
            char(')'),
        ),
    )))(input)
}
