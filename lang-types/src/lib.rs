#![forbid(unsafe_code)]

mod check;
mod info;
mod types;

pub use check::check;
pub use info::{Info, Object};
pub use types::{FuncSig, Type};
