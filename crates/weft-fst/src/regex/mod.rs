// Pattern syntax: abstract syntax tree and recursive-descent parser.

mod ast;
mod parser;

pub use ast::Ast;
pub use parser::parse;
