//! The rule expression language.
//!
//! A small JavaScript-like language: literals, the variables `auth`, `root`,
//! `data`, `newData`, `now` and `$wildcard` captures, member access, method
//! calls and the usual arithmetic, comparison and logical operators. Types
//! are strict: logical operators and conditionals only accept booleans.

pub mod eval;
pub mod lexer;
pub mod parser;

pub use eval::{evaluate, Scope};
pub use parser::{parse, BinaryOp, Expr, UnaryOp};
