use std::collections::HashMap;
use std::hash::Hash;

use crate::ids::MirrorId;

/// Bidirectional id <-> node map for one side of a mirroring session.
///
/// Ids leave the map only through [`forget`](NodeRegistry::forget); the
/// allocation counter never moves backwards, so a forgotten id is never
/// handed out again within the session.
#[derive(Clone, Debug)]
pub struct NodeRegistry<N> {
    ids: HashMap<N, MirrorId>,
    nodes: HashMap<MirrorId, N>,
    next: u64,
}

impl<N: Copy + Eq + Hash> NodeRegistry<N> {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            nodes: HashMap::new(),
            next: MirrorId::ROOT.0 + 1,
        }
    }

    /// Allocate a fresh id for `node`. Source side only.
    pub fn assign(&mut self, node: N) -> MirrorId {
        let id = MirrorId(self.next);
        self.next += 1;
        self.ids.insert(node, id);
        self.nodes.insert(id, node);
        id
    }

    /// Bind `node` under an id chosen elsewhere: a transmitted id on the
    /// replica side, or the root sentinel on either side.
    pub fn bind(&mut self, id: MirrorId, node: N) {
        self.ids.insert(node, id);
        self.nodes.insert(id, node);
    }

    pub fn id(&self, node: N) -> Option<MirrorId> {
        self.ids.get(&node).copied()
    }

    pub fn node(&self, id: MirrorId) -> Option<N> {
        self.nodes.get(&id).copied()
    }

    /// Drop both directions of the mapping. No-op on unknown ids.
    pub fn forget(&mut self, id: MirrorId) {
        if let Some(node) = self.nodes.remove(&id) {
            self.ids.remove(&node);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<N: Copy + Eq + Hash> Default for NodeRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
