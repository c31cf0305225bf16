#![forbid(unsafe_code)]

mod dump;
mod ir;
mod passes;
mod translate;

pub use dump::dump;
pub use ir::*;
pub use passes::loads;
pub use translate::translate;
