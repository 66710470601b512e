//! hotaru-compiler: the `hotaru` toolchain front end — lexer, AST, parser,
//! and the `State` compiler/executor that either emits a [`hotaru_vm::Module`]
//! or drives an [`hotaru_vm::Hvm`] one statement at a time.

pub mod ast;
pub mod config;
pub mod lexer;
pub mod parser;
pub mod state;
pub mod token;

pub use ast::{Block, ElifBlock, Expr, Statement};
pub use config::HotaruConfig;
pub use parser::{ParseError, Parser};
pub use state::{ExecError, SemanticError, State};
