/// Stable identifier of a node within the arena; never reused while the
/// filesystem is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub const ROOT: Self = Self(1);

    pub fn new(id: u64) -> Self {
        Self(id)
    }
}
