//! Arithmetic expressions over named traces.
//!
//! `Expression::parse` builds an AST from a small Python-like grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary ('**' unary)?
//! primary := number | constant | variable | function '(' expr ')' | '(' expr ')'
//! ```
//!
//! Variables are `A`..`D`, constants `pi` and `e`, functions `abs sqrt log
//! log10 sin cos tan exp`. Evaluation only sees the bindings it is given.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::MAX_EXPRESSION_DEPTH;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{ch}' at {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unexpected '{found}' at {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("invalid number '{text}' at {pos}")]
    InvalidNumber { text: String, pos: usize },

    #[error("unknown name '{name}' at {pos}")]
    UnknownName { name: String, pos: usize },

    #[error("function '{name}' must be called, at {pos}")]
    FunctionNotCalled { name: String, pos: usize },

    #[error("expression nested too deeply at {pos}")]
    TooDeep { pos: usize },

    #[error("variable {0} is not bound")]
    UnboundVariable(Variable),
}

/// Trace variable name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Variable {
    A,
    B,
    C,
    D,
}

impl Variable {
    pub const ALL: [Variable; 4] = [Variable::A, Variable::B, Variable::C, Variable::D];
}

impl FromStr for Variable {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            _ => Err(ExprError::UnknownName {
                name: s.to_string(),
                pos: 0,
            }),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Function {
    Abs,
    Sqrt,
    Log,
    Log10,
    Sin,
    Cos,
    Tan,
    Exp,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "abs" => Self::Abs,
            "sqrt" => Self::Sqrt,
            "log" => Self::Log,
            "log10" => Self::Log10,
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "exp" => Self::Exp,
            _ => return None,
        })
    }

    fn apply(self, x: f64) -> f64 {
        match self {
            Self::Abs => x.abs(),
            Self::Sqrt => x.sqrt(),
            Self::Log => x.ln(),
            Self::Log10 => x.log10(),
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Exp => x.exp(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Number(f64),
    Variable(Variable),
    Neg(Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Call(Function, Box<Node>),
}

/// Values bound to the expression's variables for one evaluation.
pub type Bindings = BTreeMap<Variable, f64>;

/// A parsed expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ExprError::Empty);
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.expr()?;
        if let Some(tok) = parser.peek() {
            return Err(ExprError::UnexpectedToken {
                found: tok.kind.to_string(),
                pos: tok.pos,
            });
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Variables referenced anywhere in the expression.
    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut vars = BTreeSet::new();
        collect_variables(&self.root, &mut vars);
        vars
    }

    pub fn eval(&self, bindings: &Bindings) -> Result<f64, ExprError> {
        eval_node(&self.root, bindings)
    }
}

fn collect_variables(node: &Node, vars: &mut BTreeSet<Variable>) {
    match node {
        Node::Number(_) => {}
        Node::Variable(v) => {
            vars.insert(*v);
        }
        Node::Neg(inner) | Node::Call(_, inner) => collect_variables(inner, vars),
        Node::Binary(_, lhs, rhs) => {
            collect_variables(lhs, vars);
            collect_variables(rhs, vars);
        }
    }
}

fn eval_node(node: &Node, bindings: &Bindings) -> Result<f64, ExprError> {
    Ok(match node {
        Node::Number(v) => *v,
        Node::Variable(var) => *bindings
            .get(var)
            .ok_or(ExprError::UnboundVariable(*var))?,
        Node::Neg(inner) => -eval_node(inner, bindings)?,
        Node::Call(func, arg) => func.apply(eval_node(arg, bindings)?),
        Node::Binary(op, lhs, rhs) => {
            let a = eval_node(lhs, bindings)?;
            let b = eval_node(rhs, bindings)?;
            match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Pow => a.powf(b),
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    DoubleStar,
    LParen,
    RParen,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Ident(name) => write!(f, "{name}"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::DoubleStar => write!(f, "**"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
        }
    }
}

#[derive(Clone, Debug)]
struct Token {
    kind: TokenKind,
    pos: usize,
}

fn tokenize(src: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;
        let kind = match c {
            _ if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '/' => TokenKind::Slash,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                TokenKind::DoubleStar
            }
            '*' => TokenKind::Star,
            _ if c.is_ascii_digit() || c == '.' => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if matches!(chars.get(i).copied(), Some('e' | 'E')) {
                    let exp_digits = match chars.get(i + 1).copied() {
                        Some('+' | '-') => i + 2,
                        _ => i + 1,
                    };
                    if chars.get(exp_digits).is_some_and(|d| d.is_ascii_digit()) {
                        i = exp_digits;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text.parse::<f64>().map_err(|_| ExprError::InvalidNumber {
                    text: text.clone(),
                    pos: start,
                })?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    pos: start,
                });
                continue;
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(chars[start..i].iter().collect()),
                    pos: start,
                });
                continue;
            }
            _ => return Err(ExprError::UnexpectedChar { ch: c, pos: i }),
        };
        i += 1;
        tokens.push(Token { kind, pos: start });
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Nesting of the node being parsed, bounded by `MAX_EXPRESSION_DEPTH`.
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().is_some_and(|t| &t.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Position of the most recently consumed token.
    fn last_pos(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.pos)
    }

    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_EXPRESSION_DEPTH {
            return Err(ExprError::TooDeep {
                pos: self.last_pos(),
            });
        }
        Ok(())
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ExprError>,
    ) -> Result<T, ExprError> {
        self.descend()?;
        let out = parse(self);
        self.depth -= 1;
        out
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ExprError> {
        match self.next() {
            Some(tok) if &tok.kind == kind => Ok(()),
            Some(tok) => Err(ExprError::UnexpectedToken {
                found: tok.kind.to_string(),
                pos: tok.pos,
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<Node, ExprError> {
        let start = self.depth;
        let mut lhs = self.term()?;
        loop {
            let op = if self.eat(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.eat(&TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                self.depth = start;
                return Ok(lhs);
            };
            // Each operator adds a level to the left-leaning tree.
            self.descend()?;
            let rhs = self.term()?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Node, ExprError> {
        let start = self.depth;
        let mut lhs = self.unary()?;
        loop {
            let op = if self.eat(&TokenKind::Star) {
                BinaryOp::Mul
            } else if self.eat(&TokenKind::Slash) {
                BinaryOp::Div
            } else {
                self.depth = start;
                return Ok(lhs);
            };
            self.descend()?;
            let rhs = self.unary()?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Node, ExprError> {
        if self.eat(&TokenKind::Minus) {
            let operand = self.nested(Self::unary)?;
            return Ok(Node::Neg(Box::new(operand)));
        }
        if self.eat(&TokenKind::Plus) {
            return self.nested(Self::unary);
        }
        self.power()
    }

    fn power(&mut self) -> Result<Node, ExprError> {
        let base = self.primary()?;
        if self.eat(&TokenKind::DoubleStar) {
            let exponent = self.nested(Self::unary)?;
            return Ok(Node::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Node, ExprError> {
        let tok = self.next().ok_or(ExprError::UnexpectedEnd)?;
        match tok.kind {
            TokenKind::Number(v) => Ok(Node::Number(v)),
            TokenKind::LParen => self.nested(|p| {
                let inner = p.expr()?;
                p.expect(&TokenKind::RParen)?;
                Ok(inner)
            }),
            TokenKind::Ident(name) => self.identifier(name, tok.pos),
            other => Err(ExprError::UnexpectedToken {
                found: other.to_string(),
                pos: tok.pos,
            }),
        }
    }

    fn identifier(&mut self, name: String, pos: usize) -> Result<Node, ExprError> {
        if let Some(func) = Function::lookup(&name) {
            if !self.eat(&TokenKind::LParen) {
                return Err(ExprError::FunctionNotCalled { name, pos });
            }
            let arg = self.nested(|p| {
                let arg = p.expr()?;
                p.expect(&TokenKind::RParen)?;
                Ok(arg)
            })?;
            return Ok(Node::Call(func, Box::new(arg)));
        }
        match name.as_str() {
            "pi" => Ok(Node::Number(std::f64::consts::PI)),
            "e" => Ok(Node::Number(std::f64::consts::E)),
            _ => name
                .parse::<Variable>()
                .map(Node::Variable)
                .map_err(|_| ExprError::UnknownName { name, pos }),
        }
    }
}
