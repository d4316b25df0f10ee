//! The compiler pipeline: lexer, parser, IR, resolver, analyzer, codegen.

pub mod ast;
pub mod codegen;
pub mod lexer;
pub mod parser;
pub mod resolve;
pub mod tokens;
pub mod typecheck;
