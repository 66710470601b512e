//! hotaru-core: arena allocation, buffers and string views.
//!
//! These are the primitives every later stage of the hotaru toolchain
//! (lexer, parser, AST, compiler, VM) is built on.
//!
//! # Modules
//!
//! - `arena`: bump allocation for parse/compile-time data
//! - `buffer`: arena-backed growable byte buffer with file save/load
//! - `string_view`: non-owning sub-range over a source string

pub mod arena;
pub mod buffer;
pub mod string_view;

pub use arena::Arena;
pub use buffer::Buffer;
pub use string_view::StringView;
