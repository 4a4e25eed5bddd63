use rand::{Rng, distr::uniform::SampleUniform};

use crate::id::SnowflakeId;

/// Draws a node ID uniformly from the full node range of `ID`.
///
/// Nodes are not coordinated externally, so two processes may draw the same
/// value. IDs then only collide if both also issue the same sequence in the
/// same millisecond.
///
/// # Example
///
/// ```
/// use chatflake::{ChatId, random_node_id};
///
/// let node = random_node_id::<ChatId>();
/// assert!(node <= ChatId::max_node_id());
/// ```
pub fn random_node_id<ID>() -> ID::Ty
where
    ID: SnowflakeId,
    ID::Ty: SampleUniform,
{
    rand::rng().random_range(ID::ZERO..=ID::max_node_id())
}
