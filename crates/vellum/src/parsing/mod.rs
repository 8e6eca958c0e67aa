//! SQL parsing: a hand-written lexer and recursive-descent parser producing
//! the statement AST. The parser only checks that the syntax is well-formed;
//! whether tables or indexes exist is the planner's and executor's job.

pub mod ast;
mod lexer;
mod parser;

pub use lexer::{Keyword, Lexer, Token};
pub use parser::Parser;

use crate::error::Result;

/// Parses one SQL statement.
pub fn parse(sql: &str) -> Result<ast::Statement> {
    Parser::parse(sql)
}
