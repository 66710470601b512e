//! Token types produced by the lexer.

use hotaru_core::StringView;

/// A source position, 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub row: u32,
    pub col: u32,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

/// A binary operator. Kept separate from [`TokenType`] so the parser can
/// carry it on an expression node without re-deriving it from the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Identifier,
    IntLiteral,
    FloatLiteral,

    Semicolon,
    LParen,
    RParen,
    LCurly,
    RCurly,

    Assign,
    Plus,
    Minus,
    Asterisk,

    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,

    Var,
    If,
    Elif,
    Else,
    While,
    Break,
    Continue,
    DebugDump,
}

impl TokenType {
    /// The binary operator this token type denotes, if any.
    pub fn as_binop(self) -> Option<BinOp> {
        match self {
            TokenType::Plus => Some(BinOp::Add),
            TokenType::Minus => Some(BinOp::Sub),
            TokenType::Asterisk => Some(BinOp::Mul),
            TokenType::Eq => Some(BinOp::Eq),
            TokenType::Ne => Some(BinOp::Ne),
            TokenType::Gt => Some(BinOp::Gt),
            TokenType::Lt => Some(BinOp::Lt),
            TokenType::Ge => Some(BinOp::Ge),
            TokenType::Le => Some(BinOp::Le),
            _ => None,
        }
    }

    /// A human-readable label used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenType::Identifier => "identifier",
            TokenType::IntLiteral => "integer literal",
            TokenType::FloatLiteral => "float literal",
            TokenType::Semicolon => ";",
            TokenType::LParen => "(",
            TokenType::RParen => ")",
            TokenType::LCurly => "{",
            TokenType::RCurly => "}",
            TokenType::Assign => "=",
            TokenType::Plus => "+",
            TokenType::Minus => "-",
            TokenType::Asterisk => "*",
            TokenType::Eq => "==",
            TokenType::Ne => "!=",
            TokenType::Gt => ">",
            TokenType::Lt => "<",
            TokenType::Ge => ">=",
            TokenType::Le => "<=",
            TokenType::Var => "var",
            TokenType::If => "if",
            TokenType::Elif => "elif",
            TokenType::Else => "else",
            TokenType::While => "while",
            TokenType::Break => "break",
            TokenType::Continue => "continue",
            TokenType::DebugDump => "dd",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub ty: TokenType,
    pub literal: StringView<'a>,
    pub pos: Position,
}
