//! Lexer, type tags, syntax tree and parser of the beauty language.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod types;
