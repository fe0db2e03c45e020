//! lotus-lex - the Lotus scanner: source text → token stream.

pub mod scanner;
pub mod token;

pub use scanner::Scanner;
pub use token::{keyword_kind, Token, TokenKind};
