mod error;
mod interface;
mod lock;
mod node;
mod status;
#[cfg(test)]
mod tests;

pub use error::*;
pub use interface::*;
pub use lock::*;
pub use node::*;
pub use status::*;
