pub mod handler;
pub mod packet;
pub mod streaming;
