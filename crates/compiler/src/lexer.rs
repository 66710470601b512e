//! A lexer with a small circular look-ahead cache.
//!
//! Tokens are produced lazily, one at a time, and parked in a fixed-size
//! ring buffer so the parser can peek arbitrarily far ahead (bounded by the
//! cache capacity) without re-scanning the source.

use crate::token::{Position, Token, TokenType};
use hotaru_core::StringView;

const CACHE_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    CacheFull,
    UnexpectedChar { ch: char, pos: Position },
    UnterminatedFloat { pos: Position },
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexError::CacheFull => write!(f, "lexer look-ahead cache is full"),
            LexError::UnexpectedChar { ch, pos } => {
                write!(f, "unexpected character '{ch}' at {pos}")
            }
            LexError::UnterminatedFloat { pos } => {
                write!(f, "a second '.' in an already floating point literal at {pos}")
            }
        }
    }
}

impl std::error::Error for LexError {}

struct Cache<'a> {
    items: [Option<Token<'a>>; CACHE_CAPACITY],
    /// Next slot to write to.
    head: usize,
    /// Next slot to read from.
    tail: usize,
    /// Number of cached, unread tokens. Tracked explicitly rather than
    /// inferred from `head`/`tail` alone, since `head == tail` is ambiguous
    /// between an empty ring and a full one.
    len: usize,
}

impl<'a> Cache<'a> {
    fn new() -> Self {
        Cache { items: [None; CACHE_CAPACITY], head: 0, tail: 0, len: 0 }
    }

    fn count(&self) -> usize {
        self.len
    }

    fn push(&mut self, item: Token<'a>) -> Result<(), LexError> {
        if self.len == CACHE_CAPACITY {
            return Err(LexError::CacheFull);
        }
        self.items[self.head] = Some(item);
        self.head = (self.head + 1) % CACHE_CAPACITY;
        self.len += 1;
        Ok(())
    }

    fn shift(&mut self) -> Option<Token<'a>> {
        if self.len == 0 {
            return None;
        }
        let item = self.items[self.tail].take();
        self.tail = (self.tail + 1) % CACHE_CAPACITY;
        self.len -= 1;
        item
    }
}

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    i: usize,
    cpos: Position,
    cache: Cache<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer { source, bytes: source.as_bytes(), i: 0, cpos: Position::default(), cache: Cache::new() }
    }

    fn cc(&self) -> u8 {
        self.bytes.get(self.i).copied().unwrap_or(0)
    }

    fn advance(&mut self) {
        self.i += 1;
        self.cpos.col += 1;
    }

    fn slice(&self, start: usize, end: usize) -> StringView<'a> {
        StringView::from_str(&self.source[start..end])
    }

    fn extend(&mut self, ty: TokenType, literal: StringView<'a>) -> Result<(), LexError> {
        self.cache.push(Token { ty, literal, pos: self.cpos })
    }

    /// Scan and cache exactly one more token. Returns `Ok(false)` at end of
    /// input with nothing left to cache.
    fn cache_next(&mut self) -> Result<bool, LexError> {
        while self.cc().is_ascii_whitespace() {
            if self.cc() == b'\n' {
                self.cpos.row += 1;
                self.cpos.col = 0;
            }
            self.advance();
        }

        match self.cc() {
            0 => return Ok(false),
            b'{' => {
                let start = self.i;
                self.advance();
                self.extend(TokenType::LCurly, self.slice(start, start + 1))?;
            }
            b'}' => {
                let start = self.i;
                self.advance();
                self.extend(TokenType::RCurly, self.slice(start, start + 1))?;
            }
            b'(' => {
                let start = self.i;
                self.advance();
                self.extend(TokenType::LParen, self.slice(start, start + 1))?;
            }
            b')' => {
                let start = self.i;
                self.advance();
                self.extend(TokenType::RParen, self.slice(start, start + 1))?;
            }
            b';' => {
                let start = self.i;
                self.advance();
                self.extend(TokenType::Semicolon, self.slice(start, start + 1))?;
            }
            b'+' => {
                let start = self.i;
                self.advance();
                self.extend(TokenType::Plus, self.slice(start, start + 1))?;
            }
            b'-' => {
                let start = self.i;
                self.advance();
                self.extend(TokenType::Minus, self.slice(start, start + 1))?;
            }
            b'*' => {
                let start = self.i;
                self.advance();
                self.extend(TokenType::Asterisk, self.slice(start, start + 1))?;
            }
            b'!' => {
                let start = self.i;
                self.advance();
                if self.cc() == b'=' {
                    self.advance();
                    self.extend(TokenType::Ne, self.slice(start, self.i))?;
                } else {
                    return Err(LexError::UnexpectedChar { ch: '!', pos: self.cpos });
                }
            }
            b'>' => {
                let start = self.i;
                self.advance();
                if self.cc() == b'=' {
                    self.advance();
                    self.extend(TokenType::Ge, self.slice(start, self.i))?;
                } else {
                    self.extend(TokenType::Gt, self.slice(start, self.i))?;
                }
            }
            b'<' => {
                let start = self.i;
                self.advance();
                if self.cc() == b'=' {
                    self.advance();
                    self.extend(TokenType::Le, self.slice(start, self.i))?;
                } else {
                    self.extend(TokenType::Lt, self.slice(start, self.i))?;
                }
            }
            b'=' => {
                let start = self.i;
                self.advance();
                if self.cc() == b'=' {
                    self.advance();
                    self.extend(TokenType::Eq, self.slice(start, self.i))?;
                } else {
                    self.extend(TokenType::Assign, self.slice(start, self.i))?;
                }
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = self.i;
                while self.cc().is_ascii_alphanumeric() || self.cc() == b'_' {
                    self.advance();
                }
                let name = self.slice(start, self.i);
                let ty = match name.as_str() {
                    "var" => TokenType::Var,
                    "if" => TokenType::If,
                    "elif" => TokenType::Elif,
                    "else" => TokenType::Else,
                    "while" => TokenType::While,
                    "break" => TokenType::Break,
                    "continue" => TokenType::Continue,
                    "dd" => TokenType::DebugDump,
                    _ => TokenType::Identifier,
                };
                self.extend(ty, name)?;
            }
            c if c.is_ascii_digit() => {
                let start = self.i;
                let mut floating_point = false;
                while self.cc().is_ascii_digit() || self.cc() == b'.' {
                    if self.cc() == b'.' {
                        if floating_point {
                            return Err(LexError::UnterminatedFloat { pos: self.cpos });
                        }
                        floating_point = true;
                    }
                    self.advance();
                }
                let ty = if floating_point { TokenType::FloatLiteral } else { TokenType::IntLiteral };
                self.extend(ty, self.slice(start, self.i))?;
            }
            other => {
                return Err(LexError::UnexpectedChar { ch: other as char, pos: self.cpos });
            }
        }
        Ok(true)
    }

    /// Pull the next token off the cache, scanning more input as needed.
    pub fn next(&mut self) -> Result<Option<Token<'a>>, LexError> {
        if self.cache.count() == 0 && !self.cache_next()? {
            return Ok(None);
        }
        Ok(self.cache.shift())
    }

    /// Look `index` tokens ahead (0 = the next token to be returned by
    /// [`Lexer::next`]) without consuming anything.
    pub fn peek(&mut self, index: usize) -> Result<Option<Token<'a>>, LexError> {
        while self.cache.count() <= index {
            if !self.cache_next()? {
                return Ok(None);
            }
        }
        Ok(Some(self.cache.last_pushed_at(index)))
    }
}

impl<'a> Cache<'a> {
    /// The `index`-th token from `tail`, without consuming it.
    fn last_pushed_at(&self, index: usize) -> Token<'a> {
        let pos = (self.tail + index) % CACHE_CAPACITY;
        self.items[pos].expect("peeked index must already be cached")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(source: &str) -> Vec<TokenType> {
        let mut lex = Lexer::new(source);
        let mut out = Vec::new();
        while let Some(tok) = lex.next().unwrap() {
            out.push(tok.ty);
        }
        out
    }

    #[test]
    fn lexes_keywords_and_identifiers_separately() {
        let types = collect("var x = while dd");
        assert_eq!(
            types,
            vec![TokenType::Var, TokenType::Identifier, TokenType::Assign, TokenType::While, TokenType::DebugDump]
        );
    }

    #[test]
    fn lexes_two_char_operators_greedily() {
        let types = collect("== != >= <= > <");
        assert_eq!(
            types,
            vec![TokenType::Eq, TokenType::Ne, TokenType::Ge, TokenType::Le, TokenType::Gt, TokenType::Lt]
        );
    }

    #[test]
    fn lexes_int_and_float_literals() {
        let mut lex = Lexer::new("42 3.14");
        let a = lex.next().unwrap().unwrap();
        assert_eq!(a.ty, TokenType::IntLiteral);
        assert_eq!(a.literal.as_str(), "42");
        let b = lex.next().unwrap().unwrap();
        assert_eq!(b.ty, TokenType::FloatLiteral);
        assert_eq!(b.literal.as_str(), "3.14");
    }

    #[test]
    fn peek_does_not_consume() {
        let mut lex = Lexer::new("var x");
        assert_eq!(lex.peek(0).unwrap().unwrap().ty, TokenType::Var);
        assert_eq!(lex.peek(1).unwrap().unwrap().ty, TokenType::Identifier);
        assert_eq!(lex.next().unwrap().unwrap().ty, TokenType::Var);
        assert_eq!(lex.next().unwrap().unwrap().ty, TokenType::Identifier);
    }

    #[test]
    fn rejects_a_second_dot_in_a_float_literal() {
        let mut lex = Lexer::new("3.1.4");
        assert!(lex.next().is_err());
    }

    #[test]
    fn peeking_exactly_to_capacity_succeeds_without_corrupting_earlier_slots() {
        let source = ";".repeat(CACHE_CAPACITY);
        let mut lex = Lexer::new(&source);
        // Fill the ring to exactly CACHE_CAPACITY cached tokens.
        assert!(lex.peek(CACHE_CAPACITY - 1).unwrap().is_some());
        // The slot at index 0 must still read back correctly, not be
        // clobbered by the fill-up.
        assert_eq!(lex.peek(0).unwrap().unwrap().ty, TokenType::Semicolon);
        assert_eq!(lex.next().unwrap().unwrap().ty, TokenType::Semicolon);
    }

    #[test]
    fn overfilling_the_ring_reports_cache_full_instead_of_overwriting() {
        let source = ";".repeat(CACHE_CAPACITY + 1);
        let mut lex = Lexer::new(&source);
        let err = lex.peek(CACHE_CAPACITY).unwrap_err();
        assert_eq!(err, LexError::CacheFull);
    }
}
