use core::{fmt, hash::Hash, ops::Add};

/// An identifier backed by a primitive unsigned integer.
///
/// Numeric order of the raw value is the identifier's order.
pub trait Id: Copy + fmt::Debug + fmt::Display + Ord + Hash {
    const ZERO: Self::Ty;
    const ONE: Self::Ty;

    /// Backing integer; every bit field is read and written as this type.
    /// Widening into `u64` is how errors and durations report field values.
    type Ty: Copy + Default + fmt::Debug + fmt::Display + Ord + Hash + Into<u64> + Add<Output = Self::Ty>;

    fn to_raw(&self) -> Self::Ty;

    fn from_raw(raw: Self::Ty) -> Self;
}

/// An [`Id`] packing `timestamp | node_id | sequence`, most significant field
/// first, so that one node's IDs sort in issuance order.
pub trait SnowflakeId: Id {
    fn timestamp(&self) -> Self::Ty;

    fn node_id(&self) -> Self::Ty;

    fn sequence(&self) -> Self::Ty;

    /// Largest timestamp the layout can hold. Also the field mask.
    fn max_timestamp() -> Self::Ty;

    /// Largest node ID the layout can hold. Also the field mask.
    fn max_node_id() -> Self::Ty;

    /// Largest sequence the layout can hold. Also the field mask.
    fn max_sequence() -> Self::Ty;

    /// Builds an ID from its fields, masking each to its width.
    #[must_use]
    fn from_components(timestamp: Self::Ty, node_id: Self::Ty, sequence: Self::Ty) -> Self;

    /// `false` once this millisecond's sequence numbers are used up.
    fn has_sequence_room(&self) -> bool {
        self.sequence() < Self::max_sequence()
    }

    /// The same timestamp and node with the following sequence number.
    #[must_use]
    fn increment_sequence(&self) -> Self {
        Self::from_components(self.timestamp(), self.node_id(), self.sequence() + Self::ONE)
    }

    /// The first ID of a later millisecond on the same node.
    #[must_use]
    fn rollover_to_timestamp(&self, ts: Self::Ty) -> Self {
        Self::from_components(ts, self.node_id(), Self::ZERO)
    }

    /// `true` if no reserved bit is set.
    fn is_valid(&self) -> bool;

    /// Clears the reserved bits.
    #[must_use]
    fn into_valid(self) -> Self;
}
