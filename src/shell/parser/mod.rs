pub mod ast;
pub mod classifier;
pub mod lexer;
pub mod parser;
pub mod splitter;

pub use ast::{Command, Node, Pipeline, Redirection};
pub use lexer::{Lexer, RedirectOp, Token};
pub use parser::{parse, ParseError};
