use log::debug;

use crate::ids::MirrorId;
use crate::records::{AttributeData, DiffBatch, NodeData, NodeKind, PositionData};
use crate::registry::NodeRegistry;
use crate::traits::{BatchSink, Codec, IdentityCodec, MirrorDelegate, NoopDelegate, ReplicaTree};

/// Replica side of a mirroring session.
///
/// Owns the replica tree and rebuilds the source's shape from batches, best
/// effort: unresolved references are skipped silently and rejected
/// attributes are dropped without aborting the batch. The tree must not be
/// mutated by anything else while a mirror owns it.
pub struct TreeMirror<T, C = IdentityCodec, D = NoopDelegate>
where
    T: ReplicaTree,
    C: Codec,
    D: MirrorDelegate<T>,
{
    tree: T,
    root: T::Node,
    registry: NodeRegistry<T::Node>,
    codec: C,
    delegate: D,
}

impl<T: ReplicaTree, C: Codec> TreeMirror<T, C, NoopDelegate> {
    pub fn new(tree: T, root: T::Node, codec: C) -> Self {
        Self::with_delegate(tree, root, codec, NoopDelegate)
    }
}

impl<T, C, D> TreeMirror<T, C, D>
where
    T: ReplicaTree,
    C: Codec,
    D: MirrorDelegate<T>,
{
    pub fn with_delegate(tree: T, root: T::Node, codec: C, delegate: D) -> Self {
        Self {
            tree,
            root,
            registry: NodeRegistry::new(),
            codec,
            delegate,
        }
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    pub fn into_tree(self) -> T {
        self.tree
    }

    pub fn root(&self) -> T::Node {
        self.root
    }

    pub fn node(&self, id: MirrorId) -> Option<T::Node> {
        self.registry.node(id)
    }

    pub fn contains(&self, id: MirrorId) -> bool {
        self.registry.node(id).is_some()
    }

    /// Bind the replica root under the transmitted id and materialize the
    /// initial children snapshot under it, in order.
    pub fn initialize(&mut self, root_id: MirrorId, children: &[NodeData]) {
        self.registry.bind(root_id, self.root);
        let root = self.root;
        for child in children {
            self.deserialize_node(child, Some(root));
        }
    }

    /// Apply one batch in the fixed phase order that makes concurrent
    /// relocation cycles safe: every node about to move is detached before
    /// any insert happens, so an insert can never target a node that is
    /// still attached below the node being moved.
    pub fn apply_changed(&mut self, batch: &DiffBatch) {
        for data in &batch.added_or_moved {
            if let Some(node) = self.deserialize_node(&data.node, None) {
                self.tree.detach(node);
            }
        }

        for data in &batch.removed {
            if let Some(node) = self.deserialize_node(data, None) {
                self.tree.detach(node);
            }
        }

        for data in &batch.added_or_moved {
            self.reattach(data);
        }

        for data in &batch.attributes {
            self.apply_attributes(data);
        }

        for data in &batch.text {
            if let Some(node) = self.deserialize_node(&data.node, None) {
                // Raw channel: no codec on this path.
                self.tree.set_text(node, &data.text_content);
            }
        }

        for data in &batch.removed {
            self.registry.forget(data.id);
        }
    }

    fn reattach(&mut self, data: &PositionData) {
        let Some(node) = self.deserialize_node(&data.node, None) else {
            return;
        };
        let parent = data
            .parent
            .as_ref()
            .and_then(|parent| self.deserialize_node(parent, None));
        let previous = data
            .previous_sibling
            .as_ref()
            .and_then(|prev| self.deserialize_node(prev, None));
        if let Some(parent) = parent {
            self.tree.insert_after(parent, node, previous);
        }
    }

    fn apply_attributes(&mut self, data: &AttributeData) {
        let Some(node) = self.deserialize_node(&data.node, None) else {
            return;
        };
        for (name, value) in &data.attributes {
            match value {
                None => self.tree.remove_attribute(node, name),
                Some(value) => {
                    let value = self.codec.decode(value);
                    self.set_attribute_best_effort(node, name, &value);
                }
            }
        }
    }

    /// Delegate first, then the native operation; a rejected value is
    /// dropped without aborting the record or the batch.
    fn set_attribute_best_effort(&mut self, node: T::Node, name: &str, value: &str) {
        if self
            .delegate
            .try_set_attribute(&mut self.tree, node, name, value)
        {
            return;
        }
        if let Err(err) = self.tree.set_attribute(node, name, value) {
            debug!("dropping attribute {name:?}: {err}");
        }
    }

    /// Resolve a record to a replica node, materializing full payloads on
    /// first encounter. Reference records whose id is unknown resolve to
    /// `None` and the enclosing operation is skipped.
    fn deserialize_node(&mut self, data: &NodeData, parent: Option<T::Node>) -> Option<T::Node> {
        if let Some(node) = self.registry.node(data.id) {
            return Some(node);
        }

        // First encounter is the only decode point, which keeps the inverse
        // transform from running twice on one payload.
        let data = self.decode_node(data);

        let node = match data.kind? {
            NodeKind::Comment => self
                .tree
                .create_comment(data.text.as_deref().unwrap_or_default()),
            NodeKind::Text => self
                .tree
                .create_text(data.text.as_deref().unwrap_or_default()),
            NodeKind::DocumentType => self.tree.create_doctype(
                data.name.as_deref().unwrap_or_default(),
                data.public_id.as_deref().unwrap_or_default(),
                data.system_id.as_deref().unwrap_or_default(),
            ),
            NodeKind::Element => {
                let tag = data.tag.as_deref().unwrap_or_default();
                let node = match self.delegate.try_create_element(&mut self.tree, tag) {
                    Some(node) => node,
                    None => self.tree.create_element(tag),
                };
                if let Some(attrs) = &data.attributes {
                    for (name, value) in attrs {
                        self.set_attribute_best_effort(node, name, value);
                    }
                }
                node
            }
        };

        // Register before materializing children so a child can reference
        // its parent id from inside the same payload.
        self.registry.bind(data.id, node);

        if let Some(parent) = parent {
            self.tree.append_child(parent, node);
        }

        if let Some(children) = &data.children {
            for child in children {
                self.deserialize_node(child, Some(node));
            }
        }

        Some(node)
    }

    /// Inverse of the sender's compression step.
    fn decode_node(&self, data: &NodeData) -> NodeData {
        let mut data = data.clone();
        if !data.compressed {
            return data;
        }
        if let Some(text) = data.text.take() {
            data.text = Some(self.codec.decode(&text));
        }
        if let Some(attrs) = data.attributes.as_mut() {
            for value in attrs.values_mut() {
                *value = self.codec.decode(value);
            }
        }
        data
    }
}

impl<T, C, D> BatchSink for TreeMirror<T, C, D>
where
    T: ReplicaTree,
    C: Codec,
    D: MirrorDelegate<T>,
{
    fn initialize(&mut self, root_id: MirrorId, children: Vec<NodeData>) {
        TreeMirror::initialize(self, root_id, &children);
    }

    fn apply_changed(&mut self, batch: DiffBatch) {
        TreeMirror::apply_changed(self, &batch);
    }
}
