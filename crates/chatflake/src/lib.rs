//! Snowflake-style chat identifiers and an incremental title/answer splitter
//! for streamed language-model responses.
//!
//! The crate has two independent halves:
//!
//! - [`generator`]: a lock-based generator issuing unique, time-ordered
//!   [`ChatId`]s from a node ID, a millisecond timestamp and a per-millisecond
//!   sequence.
//! - [`split`]: a [`StreamSplitter`] that partitions one token stream into a
//!   title and an answer at a reserved separator character, without buffering
//!   the answer.
//!
//! Time is injected through [`TimeSource`], so both the wall clock and
//! simulated clocks (see [`ManualClock`]) drive the same code.

#[cfg(feature = "futures")]
pub mod futures;
pub mod generator;
pub mod id;
#[cfg(feature = "serde")]
mod serde;
pub mod split;
pub mod time;

#[cfg(feature = "futures")]
pub use crate::futures::*;
pub use crate::generator::*;
pub use crate::id::*;
#[cfg(feature = "serde")]
pub use crate::serde::*;
pub use crate::split::*;
pub use crate::time::*;
