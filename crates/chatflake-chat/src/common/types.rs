//! # Shared ID Types and Constants
//!
//! The chat service issues every room and message identifier from one
//! [`Generator`]. Records, packets and the CLI all agree on the layout and
//! epoch defined here.
//!
//! - [`ChatId`]: the 64-bit identifier (1 reserved, 41 timestamp, 10 node and
//!   12 sequence bits)
//! - [`Clock`]: the wall clock embedded into IDs
//! - [`EPOCH`]: the zero point of the timestamp field
//! - [`Generator`]: the lock-based generator shared by all turns

use chatflake::{CHAT_EPOCH, LockSnowflakeGenerator, SystemClock};

pub use chatflake::ChatId;

/// The clock used by the service generator.
///
/// This is the wall clock, so a backward step surfaces as a clock
/// regression instead of being absorbed.
pub type Clock = SystemClock;

/// The epoch offset used as the zero point for ID timestamps.
pub const EPOCH: core::time::Duration = CHAT_EPOCH;

/// The generator shared by every turn, parameterized over its clock so
/// simulations can drive it with a [`ManualClock`].
///
/// [`ManualClock`]: chatflake::ManualClock
pub type Generator<C = Clock> = LockSnowflakeGenerator<ChatId, C>;

/// Milliseconds since the Unix epoch at which `id` was issued.
pub fn issued_at(id: ChatId) -> u64 {
    id.unix_millis(EPOCH)
}
