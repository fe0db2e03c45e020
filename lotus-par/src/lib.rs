//! lotus-par - the Lotus AST and recursive-descent parser.

pub mod ast;
pub mod parser;

pub use ast::{Expr, LiteralKind, Operator, Stmt};
pub use parser::Parser;
