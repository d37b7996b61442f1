use crate::error::{RulesError, RulesResult};
use crate::expr::lexer::{tokenize, Token, TokenKind};

/// Parsed rule expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Vec<Expr>),
    Variable(String),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    /// Binding power; higher binds tighter.
    fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Ne => 3,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div | Self::Rem => 6,
        }
    }

    fn from_token(kind: &TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::Or => Self::Or,
            TokenKind::And => Self::And,
            TokenKind::Eq => Self::Eq,
            TokenKind::Ne => Self::Ne,
            TokenKind::Lt => Self::Lt,
            TokenKind::Le => Self::Le,
            TokenKind::Gt => Self::Gt,
            TokenKind::Ge => Self::Ge,
            TokenKind::Plus => Self::Add,
            TokenKind::Minus => Self::Sub,
            TokenKind::Star => Self::Mul,
            TokenKind::Slash => Self::Div,
            TokenKind::Percent => Self::Rem,
            _ => return None,
        })
    }
}

/// Parse a rule expression.
pub fn parse(source: &str) -> RulesResult<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    let expr = parser.conditional()?;
    parser.expect(&TokenKind::Eof, "unexpected trailing input")?;
    Ok(expr)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        kind
    }

    fn error(&self, reason: &str) -> RulesError {
        RulesError::Syntax {
            expression: self.source.to_string(),
            offset: self.tokens[self.pos.min(self.tokens.len() - 1)].offset,
            reason: reason.to_string(),
        }
    }

    fn expect(&mut self, kind: &TokenKind, reason: &str) -> RulesResult<()> {
        if self.peek() == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    fn conditional(&mut self) -> RulesResult<Expr> {
        let test = self.binary(1)?;
        if self.peek() != &TokenKind::Question {
            return Ok(test);
        }
        self.advance();
        let then = self.conditional()?;
        self.expect(&TokenKind::Colon, "expected ':' in conditional")?;
        let otherwise = self.conditional()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// Precedence climbing over left-associative binary operators.
    fn binary(&mut self, min_precedence: u8) -> RulesResult<Expr> {
        let mut left = self.unary()?;
        while let Some(op) = BinaryOp::from_token(self.peek()) {
            if op.precedence() < min_precedence {
                break;
            }
            self.advance();
            let right = self.binary(op.precedence() + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> RulesResult<Expr> {
        let op = match self.peek() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> RulesResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    match self.advance() {
                        TokenKind::Ident(property) => {
                            expr = Expr::Member {
                                object: Box::new(expr),
                                property,
                            };
                        }
                        _ => return Err(self.error("expected property name after '.'")),
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.conditional()?;
                    self.expect(&TokenKind::RBracket, "expected ']'")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.list(&TokenKind::RParen)?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Comma-separated expressions up to and including `close`.
    fn list(&mut self, close: &TokenKind) -> RulesResult<Vec<Expr>> {
        let mut items = Vec::new();
        if self.peek() == close {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.conditional()?);
            match self.advance() {
                TokenKind::Comma => continue,
                ref k if k == close => return Ok(items),
                _ => return Err(self.error("expected ',' or closing delimiter")),
            }
        }
    }

    fn primary(&mut self) -> RulesResult<Expr> {
        match self.advance() {
            TokenKind::Null => Ok(Expr::Null),
            TokenKind::True => Ok(Expr::Bool(true)),
            TokenKind::False => Ok(Expr::Bool(false)),
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::Ident(name) => Ok(Expr::Variable(name)),
            TokenKind::LParen => {
                let inner = self.conditional()?;
                self.expect(&TokenKind::RParen, "expected ')'")?;
                Ok(inner)
            }
            TokenKind::LBracket => Ok(Expr::Array(self.list(&TokenKind::RBracket)?)),
            _ => Err(self.error("expected an expression")),
        }
    }
}
