//! The parsed syntax tree.
//!
//! Expressions are allocated out of an [`hotaru_core::Arena`] so that a
//! binary operator's operands can be self-referential (`&'a Expr<'a>`)
//! without reference counting or boxing.

use crate::token::BinOp;
use hotaru_core::StringView;

#[derive(Debug, Clone, Copy)]
pub enum Expr<'a> {
    IntLiteral(i64),
    FloatLiteral(f64),
    VarRead(StringView<'a>),
    BinOp { op: BinOp, left: &'a Expr<'a>, right: &'a Expr<'a> },
}

#[derive(Debug, Clone)]
pub struct ElifBlock<'a> {
    pub condition: Expr<'a>,
    pub body: Block<'a>,
}

#[derive(Debug, Clone)]
pub enum Statement<'a> {
    VarInit { name: StringView<'a>, value: Expr<'a> },
    VarAssign { name: StringView<'a>, value: Expr<'a> },
    If {
        condition: Expr<'a>,
        body: Block<'a>,
        elifs: Vec<ElifBlock<'a>>,
        else_body: Block<'a>,
    },
    While { condition: Expr<'a>, body: Block<'a> },
    Dump(Expr<'a>),
}

/// A sequence of statements, e.g. the contents of a `{ ... }` block.
pub type Block<'a> = Vec<Statement<'a>>;
