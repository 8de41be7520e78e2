//! Recursive descent parser from formula tokens to [`Expr`].
//!
//! GRAMMAR:
//!   expression     --> comparison
//!   comparison     --> concatenation ( ("=" | "<>" | "<" | ">" | "<=" | ">=") concatenation )*
//!   concatenation  --> additive ( "&" additive )*
//!   additive       --> multiplicative ( ("+" | "-") multiplicative )*
//!   multiplicative --> unary ( ("*" | "/") unary )*
//!   unary          --> ("-" | "+") unary | power
//!   power          --> primary ( "^" unary )?
//!   primary        --> NUMBER | STRING | BOOLEAN | "#REF!" | REF (":" REF)?
//!                    | IDENT "(" arguments? ")" | "(" expression ")"
//!   arguments      --> expression ("," expression)*

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::error::ParseError;
use super::lexer::{Lexer, Token};

pub type ParseResult<T> = Result<T, ParseError>;

/// Deepest nesting of parentheses, signs and exponents accepted.
pub const MAX_NESTING: usize = 100;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Parser {
            lexer,
            current,
            depth: 0,
        }
    }

    /// Parse the whole input. A leading `=` is skipped.
    pub fn parse(&mut self) -> ParseResult<Expr> {
        if self.current == Token::Eq {
            self.advance();
        }
        if self.current == Token::Eof {
            return Err(ParseError::new("empty formula"));
        }

        let expr = self.parse_comparison()?;
        if self.current != Token::Eof {
            return Err(self.unexpected("end of formula"));
        }
        Ok(expr)
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.current == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("{:?}", expected)))
        }
    }

    fn unexpected(&self, wanted: &str) -> ParseError {
        match &self.current {
            Token::Illegal(text) => ParseError::new(format!("unexpected `{}`", text)),
            Token::Eof => ParseError::new(format!("expected {}, found end of formula", wanted)),
            other => ParseError::new(format!("expected {}, found {:?}", wanted, other)),
        }
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_concatenation()?;
        loop {
            let op = match self.current {
                Token::Eq => BinaryOp::Eq,
                Token::Ne => BinaryOp::Ne,
                Token::Lt => BinaryOp::Lt,
                Token::Le => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::Ge => BinaryOp::Ge,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_concatenation()?;
            left = binary(op, left, right);
        }
    }

    fn parse_concatenation(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_additive()?;
        while self.current == Token::Amp {
            self.advance();
            let right = self.parse_additive()?;
            left = binary(BinaryOp::Concat, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
    }

    /// Every nested sub-expression passes through here, so this is where
    /// the nesting depth is counted.
    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new(format!(
                "formula nested deeper than {} levels",
                MAX_NESTING
            )));
        }
        self.depth += 1;
        let result = self.parse_signed();
        self.depth -= 1;
        result
    }

    fn parse_signed(&mut self) -> ParseResult<Expr> {
        let op = match self.current {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Plus,
            _ => return self.parse_power(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_primary()?;
        if self.current == Token::Caret {
            self.advance();
            let exponent = self.parse_unary()?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.current.clone();
        match token {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::Text(s) => {
                self.advance();
                Ok(Expr::Text(s))
            }
            Token::Bool(b) => {
                self.advance();
                Ok(Expr::Bool(b))
            }
            Token::RefError => {
                self.advance();
                Ok(Expr::InvalidRef)
            }
            Token::Ref(start) => {
                self.advance();
                if self.current != Token::Colon {
                    return Ok(Expr::Ref(start));
                }
                self.advance();
                match self.current.clone() {
                    Token::Ref(end) => {
                        self.advance();
                        Ok(Expr::Range { start, end })
                    }
                    _ => Err(self.unexpected("a cell reference after `:`")),
                }
            }
            Token::Ident(name) => {
                self.advance();
                if self.current != Token::LParen {
                    return Err(ParseError::new(format!("unknown name `{}`", name)));
                }
                self.parse_call(name)
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_comparison()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            _ => Err(self.unexpected("a value")),
        }
    }

    fn parse_call(&mut self, name: String) -> ParseResult<Expr> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if self.current == Token::RParen {
            self.advance();
            return Ok(Expr::Call { name, args });
        }
        loop {
            args.push(self.parse_comparison()?);
            match self.current {
                Token::Comma => self.advance(),
                Token::RParen => {
                    self.advance();
                    return Ok(Expr::Call { name, args });
                }
                _ => return Err(self.unexpected("`,` or `)`")),
            }
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Parse formula text into an expression tree.
pub fn parse(input: &str) -> ParseResult<Expr> {
    Parser::new(input).parse()
}
