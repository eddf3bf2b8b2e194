//! Core logic: lexing, parsing, validation, model extraction, resolution.

pub mod builder;
pub mod constraint;
pub mod descriptor;
pub mod engine;
pub mod lexer;
pub mod locate;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod typemap;
pub mod types;
pub mod validator;
