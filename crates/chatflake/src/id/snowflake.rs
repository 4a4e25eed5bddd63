/// A macro for defining a bit layout for a custom Snowflake ID using four
/// required components: `reserved`, `timestamp`, `node_id`, and `sequence`.
///
/// These components are always laid out from **most significant bit (MSB)** to
/// **least significant bit (LSB)** - in that exact order.
///
/// - The first field (`reserved`) occupies the highest bits and is always
///   written as zero.
/// - The last field (`sequence`) occupies the lowest bits.
/// - The total number of bits **must exactly equal** the size of the backing
///   integer type. If it doesn't, the macro triggers a compile-time assertion
///   failure.
///
/// ```text
/// define_snowflake_id!(
///     <TypeName>, <IntegerType>,
///     reserved: <bits>,
///     timestamp: <bits>,
///     node_id: <bits>,
///     sequence: <bits>
/// );
/// ```
///
/// ## Example
/// ```rust
/// use chatflake::define_snowflake_id;
///
/// define_snowflake_id!(
///     ShardId, u64,
///     reserved: 0,
///     timestamp: 44,
///     node_id: 8,
///     sequence: 12
/// );
///
/// let id = ShardId::from(3, 2, 1);
/// assert_eq!(id.timestamp(), 3);
/// assert_eq!(id.node_id(), 2);
/// assert_eq!(id.sequence(), 1);
/// ```
#[macro_export]
macro_rules! define_snowflake_id {
    (
        $(#[$meta:meta])*
        $name:ident, $int:ty,
        reserved: $reserved_bits:expr,
        timestamp: $timestamp_bits:expr,
        node_id: $node_bits:expr,
        sequence: $sequence_bits:expr
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name {
            id: $int,
        }

        const _: () = {
            // Compile-time check: total bit width _must_ equal the backing
            // type. This is to avoid aliasing surprises.
            assert!(
                $reserved_bits + $timestamp_bits + $node_bits + $sequence_bits == <$int>::BITS,
                "Layout must match underlying type width"
            );
        };

        impl $name {
            pub const RESERVED_BITS: $int = $reserved_bits;
            pub const TIMESTAMP_BITS: $int = $timestamp_bits;
            pub const NODE_ID_BITS: $int = $node_bits;
            pub const SEQUENCE_BITS: $int = $sequence_bits;

            pub const SEQUENCE_SHIFT: $int = 0;
            pub const NODE_ID_SHIFT: $int = Self::SEQUENCE_SHIFT + Self::SEQUENCE_BITS;
            pub const TIMESTAMP_SHIFT: $int = Self::NODE_ID_SHIFT + Self::NODE_ID_BITS;

            pub const TIMESTAMP_MASK: $int = ((1 << Self::TIMESTAMP_BITS) - 1);
            pub const NODE_ID_MASK: $int = ((1 << Self::NODE_ID_BITS) - 1);
            pub const SEQUENCE_MASK: $int = ((1 << Self::SEQUENCE_BITS) - 1);

            const fn valid_mask() -> $int {
                (Self::TIMESTAMP_MASK << Self::TIMESTAMP_SHIFT)
                    | (Self::NODE_ID_MASK << Self::NODE_ID_SHIFT)
                    | (Self::SEQUENCE_MASK << Self::SEQUENCE_SHIFT)
            }

            #[must_use]
            pub const fn from(timestamp: $int, node_id: $int, sequence: $int) -> Self {
                let t = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
                let n = (node_id & Self::NODE_ID_MASK) << Self::NODE_ID_SHIFT;
                let s = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
                Self { id: t | n | s }
            }

            /// Extracts the timestamp from the packed ID.
            #[must_use]
            pub const fn timestamp(&self) -> $int {
                (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
            }

            /// Extracts the node ID from the packed ID.
            #[must_use]
            pub const fn node_id(&self) -> $int {
                (self.id >> Self::NODE_ID_SHIFT) & Self::NODE_ID_MASK
            }

            /// Extracts the sequence number from the packed ID.
            #[must_use]
            pub const fn sequence(&self) -> $int {
                (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
            }

            #[must_use]
            pub const fn max_timestamp() -> $int {
                Self::TIMESTAMP_MASK
            }

            #[must_use]
            pub const fn max_node_id() -> $int {
                Self::NODE_ID_MASK
            }

            #[must_use]
            pub const fn max_sequence() -> $int {
                Self::SEQUENCE_MASK
            }

            /// Converts this type into its raw type representation
            #[must_use]
            pub const fn to_raw(&self) -> $int {
                self.id
            }

            /// Converts a raw type into this type
            #[must_use]
            pub const fn from_raw(raw: $int) -> Self {
                Self { id: raw }
            }

            /// Returns the embedded timestamp as milliseconds since the Unix
            /// epoch, given the epoch the generator counted from. Saturates at
            /// `u64::MAX`.
            #[must_use]
            pub fn unix_millis(&self, epoch: core::time::Duration) -> u64 {
                u64::try_from(epoch.as_millis())
                    .unwrap_or(u64::MAX)
                    .saturating_add(u64::from(self.timestamp()))
            }

            /// Returns the embedded timestamp as a [`std::time::SystemTime`].
            ///
            /// The precision is limited to whole milliseconds.
            #[must_use]
            pub fn datetime(&self, epoch: core::time::Duration) -> std::time::SystemTime {
                std::time::SystemTime::UNIX_EPOCH
                    + core::time::Duration::from_millis(self.unix_millis(epoch))
            }
        }

        impl $crate::id::Id for $name {
            type Ty = $int;
            const ZERO: $int = 0;
            const ONE: $int = 1;

            fn to_raw(&self) -> Self::Ty {
                self.to_raw()
            }

            fn from_raw(raw: Self::Ty) -> Self {
                Self::from_raw(raw)
            }
        }

        impl $crate::id::SnowflakeId for $name {
            fn timestamp(&self) -> Self::Ty {
                self.timestamp()
            }

            fn node_id(&self) -> Self::Ty {
                self.node_id()
            }

            fn sequence(&self) -> Self::Ty {
                self.sequence()
            }

            fn max_timestamp() -> Self::Ty {
                Self::TIMESTAMP_MASK
            }

            fn max_node_id() -> Self::Ty {
                Self::NODE_ID_MASK
            }

            fn max_sequence() -> Self::Ty {
                Self::SEQUENCE_MASK
            }

            fn from_components(timestamp: $int, node_id: $int, sequence: $int) -> Self {
                Self::from(timestamp, node_id, sequence)
            }

            fn is_valid(&self) -> bool {
                (self.to_raw() & !Self::valid_mask()) == 0
            }

            fn into_valid(self) -> Self {
                Self::from_raw(self.to_raw() & Self::valid_mask())
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.id)
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("id", &self.id)
                    .field("timestamp", &self.timestamp())
                    .field("node_id", &self.node_id())
                    .field("sequence", &self.sequence())
                    .finish()
            }
        }

        impl From<$name> for $int {
            fn from(id: $name) -> Self {
                id.to_raw()
            }
        }
    };
}

define_snowflake_id!(
    /// The identifier issued for chat rooms and chat messages.
    ///
    /// ```text
    ///  Bit Index:  63           63 62            22 21          12 11             0
    ///              +--------------+----------------+--------------+---------------+
    ///  Field:      | reserved (1) | timestamp (41) | node ID (10) | sequence (12) |
    ///              +--------------+----------------+--------------+---------------+
    ///              |<----------- MSB ---------- 64 bits ----------- LSB ------------>|
    /// ```
    ///
    /// The reserved bit keeps the value positive when stored in a signed
    /// 64-bit column. Timestamps count milliseconds from [`CHAT_EPOCH`], which
    /// leaves roughly 69 years of range.
    ///
    /// [`CHAT_EPOCH`]: crate::time::CHAT_EPOCH
    ChatId, u64,
    reserved: 1,
    timestamp: 41,
    node_id: 10,
    sequence: 12
);
