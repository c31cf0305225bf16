#![forbid(unsafe_code)]

mod lexer;
mod pos;
mod token;

pub use lexer::{tokenize, Lexer};
pub use pos::{LineMap, Pos};
pub use token::{Tok, Token};
