mod error;
mod fragment;
mod splitter;

pub use error::*;
pub use fragment::*;
pub use splitter::*;
