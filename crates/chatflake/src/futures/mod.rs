#[cfg(feature = "async-tokio")]
mod runtime;
mod sleep_provider;
mod snowflake;
mod split_stream;

#[cfg(feature = "async-tokio")]
pub use runtime::*;
pub use sleep_provider::*;
pub use snowflake::*;
pub use split_stream::*;
