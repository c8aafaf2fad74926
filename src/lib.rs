//! Smart labels: a small boolean query language over track metadata.
//!
//! ```text
//! criteria string
//!     ↓  lexer, parser
//! Expr (AST)
//!     ↓  compiler, against an explicit `now`
//! Predicate
//!     ↓  Predicate::matches (in memory) or SqlCompiler (sea-query)
//! matching tracks
//! ```

pub mod ast;
pub mod compiler;
pub mod config;
pub mod lexer;
pub mod parser;
pub mod predicate;
pub mod search;
pub mod sql_compiler;
pub mod token;
pub mod track;

pub use ast::{Atom, CompOp, DateField, DatePrecision, DateSpec, DurationUnit, Expr};
pub use compiler::{compile, compile_filter, compile_str};
pub use parser::{parse, SyntaxError};
pub use predicate::{Bound, Predicate};
pub use track::Track;
