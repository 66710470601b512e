//! A recursive-descent parser.
//!
//! Expression parsing is deliberately flat and right-associative: there is
//! no precedence climbing. `1 + 2 * 3` parses as `1 + (2 * 3)`, and so does
//! `1 * 2 + 3` as `1 * (2 + 3)` — every binary operator binds everything to
//! its right before combining with what's on its left. Parenthesize if you
//! mean something else.

use crate::ast::{Block, ElifBlock, Expr, Statement};
use crate::lexer::{LexError, Lexer};
use crate::token::{Position, Token, TokenType};
use hotaru_core::Arena;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Lex(LexError),
    UnexpectedEof { expected: &'static str },
    UnexpectedToken { expected: &'static str, found: &'static str, pos: Position },
    Unsupported { what: &'static str, pos: Position },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Lex(e) => write!(f, "{e}"),
            ParseError::UnexpectedEof { expected } => {
                write!(f, "expecting a `{expected}` token but reached end of file")
            }
            ParseError::UnexpectedToken { expected, found, pos } => {
                write!(f, "expecting token `{expected}` but found `{found}` at {pos}")
            }
            ParseError::Unsupported { what, pos } => {
                write!(f, "{what} is not supported at {pos}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::Lex(e)
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    arena: &'a Arena,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, arena: &'a Arena) -> Self {
        Parser { lexer: Lexer::new(source), arena }
    }

    fn peek(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        Ok(self.lexer.peek(0)?)
    }

    fn next(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        Ok(self.lexer.next()?)
    }

    fn expect(&mut self, expected: TokenType) -> Result<Token<'a>, ParseError> {
        let tok = self.next()?.ok_or(ParseError::UnexpectedEof { expected: expected.describe() })?;
        if tok.ty != expected {
            return Err(ParseError::UnexpectedToken {
                expected: expected.describe(),
                found: tok.ty.describe(),
                pos: tok.pos,
            });
        }
        Ok(tok)
    }

    /// Parse a single expression. Binary operators are right-associative
    /// and all bind at the same precedence.
    pub fn parse_expr(&mut self) -> Result<Expr<'a>, ParseError> {
        let token = self.peek()?.ok_or(ParseError::UnexpectedEof { expected: "expression" })?;

        let primary = match token.ty {
            TokenType::Identifier => {
                self.next()?;
                Expr::VarRead(token.literal)
            }
            TokenType::IntLiteral => {
                self.next()?;
                Expr::IntLiteral(token.literal.to_i64())
            }
            TokenType::FloatLiteral => {
                self.next()?;
                let value: f64 = token.literal.as_str().parse().unwrap_or(0.0);
                Expr::FloatLiteral(value)
            }
            TokenType::LParen => {
                self.next()?;
                let inner = self.parse_expr()?;
                self.expect(TokenType::RParen)?;
                inner
            }
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "expression",
                    found: other.describe(),
                    pos: token.pos,
                })
            }
        };

        match self.peek()? {
            Some(next_tok) => match next_tok.ty.as_binop() {
                Some(op) => {
                    self.next()?; // consume the operator
                    let left = &*self.arena.alloc(primary);
                    let right = &*self.arena.alloc(self.parse_expr()?);
                    Ok(Expr::BinOp { op, left, right })
                }
                None => Ok(primary),
            },
            None => Ok(primary),
        }
    }

    fn parse_block(&mut self) -> Result<Block<'a>, ParseError> {
        self.expect(TokenType::LCurly)?;
        let mut stmts = Vec::new();
        loop {
            match self.peek()? {
                Some(tok) if tok.ty == TokenType::RCurly => break,
                Some(_) => stmts.push(self.parse_stmt()?),
                None => {
                    return Err(ParseError::UnexpectedEof { expected: "} or another statement" })
                }
            }
        }
        self.expect(TokenType::RCurly)?;
        Ok(stmts)
    }

    pub fn parse_stmt(&mut self) -> Result<Statement<'a>, ParseError> {
        let token = self.peek()?.ok_or(ParseError::UnexpectedEof { expected: "statement" })?;

        match token.ty {
            TokenType::Var => {
                self.next()?;
                let name = self.expect(TokenType::Identifier)?.literal;
                self.expect(TokenType::Assign)?;
                let value = self.parse_expr()?;
                self.expect(TokenType::Semicolon)?;
                Ok(Statement::VarInit { name, value })
            }
            TokenType::Identifier => {
                self.next()?;
                self.expect(TokenType::Assign)?;
                let value = self.parse_expr()?;
                self.expect(TokenType::Semicolon)?;
                Ok(Statement::VarAssign { name: token.literal, value })
            }
            TokenType::While => {
                self.next()?;
                self.expect(TokenType::LParen)?;
                let condition = self.parse_expr()?;
                self.expect(TokenType::RParen)?;
                let body = self.parse_block()?;
                Ok(Statement::While { condition, body })
            }
            TokenType::If => {
                self.next()?;
                self.expect(TokenType::LParen)?;
                let condition = self.parse_expr()?;
                self.expect(TokenType::RParen)?;
                let body = self.parse_block()?;

                let mut elifs = Vec::new();
                loop {
                    match self.peek()? {
                        Some(tok) if tok.ty == TokenType::Elif => {
                            self.next()?;
                            self.expect(TokenType::LParen)?;
                            let condition = self.parse_expr()?;
                            self.expect(TokenType::RParen)?;
                            let body = self.parse_block()?;
                            elifs.push(ElifBlock { condition, body });
                        }
                        _ => break,
                    }
                }

                let else_body = match self.peek()? {
                    Some(tok) if tok.ty == TokenType::Else => {
                        self.next()?;
                        self.parse_block()?
                    }
                    _ => Vec::new(),
                };

                Ok(Statement::If { condition, body, elifs, else_body })
            }
            TokenType::DebugDump => {
                self.next()?;
                let value = self.parse_expr()?;
                self.expect(TokenType::Semicolon)?;
                Ok(Statement::Dump(value))
            }
            TokenType::Break => Err(ParseError::Unsupported { what: "break", pos: token.pos }),
            TokenType::Continue => Err(ParseError::Unsupported { what: "continue", pos: token.pos }),
            other => Err(ParseError::UnexpectedToken {
                expected: "statement",
                found: other.describe(),
                pos: token.pos,
            }),
        }
    }

    /// Parse a whole source file as a top-level sequence of statements.
    pub fn parse_program(&mut self) -> Result<Block<'a>, ParseError> {
        let mut stmts = Vec::new();
        while self.peek()?.is_some() {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Block<'_> {
        let arena = Box::leak(Box::new(Arena::new()));
        let mut parser = Parser::new(src, arena);
        parser.parse_program().unwrap()
    }

    #[test]
    fn parses_var_init_and_dump() {
        let block = parse("var x = 1 + 2; dd x;");
        assert_eq!(block.len(), 2);
        assert!(matches!(block[0], Statement::VarInit { .. }));
        assert!(matches!(block[1], Statement::Dump(_)));
    }

    #[test]
    fn binary_operators_are_right_associative() {
        let block = parse("var x = 1 + 2 * 3;");
        match &block[0] {
            Statement::VarInit { value, .. } => match value {
                Expr::BinOp { op: crate::token::BinOp::Add, right, .. } => {
                    assert!(matches!(**right, Expr::BinOp { op: crate::token::BinOp::Mul, .. }));
                }
                _ => panic!("expected a top-level add"),
            },
            _ => panic!("expected a var init"),
        }
    }

    #[test]
    fn parses_if_elif_else() {
        let block = parse("if (1) { dd 1; } elif (2) { dd 2; } else { dd 3; }");
        match &block[0] {
            Statement::If { elifs, else_body, .. } => {
                assert_eq!(elifs.len(), 1);
                assert_eq!(else_body.len(), 1);
            }
            _ => panic!("expected an if statement"),
        }
    }

    #[test]
    fn parses_while_loop() {
        let block = parse("var i = 0; while (i) { i = i - 1; }");
        assert!(matches!(block[1], Statement::While { .. }));
    }

    #[test]
    fn rejects_break_with_a_clear_diagnostic() {
        let arena = Arena::new();
        let mut parser = Parser::new("break;", &arena);
        let err = parser.parse_stmt().unwrap_err();
        assert!(matches!(err, ParseError::Unsupported { what: "break", .. }));
    }

    #[test]
    fn parenthesized_expression_overrides_flat_associativity() {
        let block = parse("var x = (1 + 2) * 3;");
        match &block[0] {
            Statement::VarInit { value: Expr::BinOp { op: crate::token::BinOp::Mul, left, .. }, .. } => {
                assert!(matches!(**left, Expr::BinOp { op: crate::token::BinOp::Add, .. }));
            }
            _ => panic!("expected a top-level multiplication"),
        }
    }
}
