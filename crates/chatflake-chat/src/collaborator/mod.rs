//! Interfaces to the systems a chat turn depends on but does not own: the
//! language model producing text, and the store keeping rooms and messages.

mod memory;
mod model;
mod store;

pub use memory::*;
pub use model::*;
pub use store::*;
