#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier for a mirrored node, stable for the lifetime of a session.
///
/// Ids are allocated monotonically on the source side, starting above the
/// [`ROOT`](MirrorId::ROOT) sentinel, and are never reused within a session.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MirrorId(pub u64);

impl MirrorId {
    /// Sentinel under which each side registers its root node out-of-band.
    pub const ROOT: MirrorId = MirrorId(0);
}
