use std::collections::{HashMap, HashSet};

use log::trace;

use crate::ids::MirrorId;
use crate::records::{AttributeData, DiffBatch, NodeData, NodeKind, PositionData, TextData};
use crate::registry::NodeRegistry;
use crate::traits::{BatchSink, ChangeSummary, Codec, ObserverQuery, SourceTree};

/// Tags whose elements, together with their entire subtrees, are never
/// mirrored.
const EXCLUDED_TAGS: [&str; 3] = ["script", "noscript", "canvas"];

fn excluded_tag(tag: &str) -> bool {
    EXCLUDED_TAGS.iter().any(|t| tag.eq_ignore_ascii_case(t))
}

/// Whether a node has a replica-side counterpart at all.
fn is_mirrored<T: SourceTree>(tree: &T, node: T::Node) -> bool {
    match tree.kind(node) {
        NodeKind::Comment => false,
        NodeKind::Element => !excluded_tag(&tree.tag_name(node).unwrap_or_default()),
        _ => true,
    }
}

/// Closest preceding sibling that exists on the replica side. Unmirrored
/// siblings are transparent: naming one would make the receiver fall back to
/// front insertion and scramble the order.
fn mirrored_previous_sibling<T: SourceTree>(tree: &T, node: T::Node) -> Option<T::Node> {
    let mut prev = tree.previous_sibling(node);
    while let Some(candidate) = prev {
        if is_mirrored(tree, candidate) {
            return Some(candidate);
        }
        prev = tree.previous_sibling(candidate);
    }
    None
}

fn mirrored_next_sibling<T: SourceTree>(tree: &T, node: T::Node) -> Option<T::Node> {
    let mut next = tree.next_sibling(node);
    while let Some(candidate) = next {
        if is_mirrored(tree, candidate) {
            return Some(candidate);
        }
        next = tree.next_sibling(candidate);
    }
    None
}

/// Source side of a mirroring session.
///
/// Owns the id registry for the observed tree, serializes nodes on first
/// contact, and turns each change summary into one [`DiffBatch`] for the
/// sink. One client per mirrored tree; two clients never share a counter.
pub struct MirrorClient<T: SourceTree, C: Codec> {
    registry: NodeRegistry<T::Node>,
    codec: C,
    root: T::Node,
    queries: Vec<ObserverQuery>,
    connected: bool,
}

impl<T: SourceTree, C: Codec> MirrorClient<T, C> {
    /// Start a session over `root`: bind the root id, push a recursive
    /// snapshot of its current children into `sink`, and record the
    /// observation queries the host must register with its engine.
    pub fn connect(
        tree: &T,
        root: T::Node,
        codec: C,
        sink: &mut impl BatchSink,
        extra_queries: Vec<ObserverQuery>,
    ) -> Self {
        let mut client = Self {
            registry: NodeRegistry::new(),
            codec,
            root,
            queries: Vec::new(),
            connected: true,
        };
        client.registry.bind(MirrorId::ROOT, root);

        let mut children = Vec::new();
        let mut child = tree.first_child(root);
        while let Some(node) = child {
            if let Some(data) = client.serialize_node(tree, node, true) {
                children.push(data);
            }
            child = tree.next_sibling(node);
        }
        sink.initialize(MirrorId::ROOT, children);

        client.queries.push(ObserverQuery::All);
        client.queries.extend(extra_queries);
        client
    }

    /// Queries to register with the observation engine, broadest first.
    pub fn queries(&self) -> &[ObserverQuery] {
        &self.queries
    }

    pub fn root(&self) -> T::Node {
        self.root
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Stop producing batches. A batch already delivered before the
    /// disconnect is still valid and must be applied; later summaries are
    /// dropped here.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Build one batch from `summary` and deliver it to `sink`.
    pub fn apply_summary(
        &mut self,
        tree: &T,
        summary: &ChangeSummary<T::Node>,
        sink: &mut impl BatchSink,
    ) {
        if !self.connected {
            return;
        }
        let batch = self.build_batch(tree, summary);
        sink.apply_changed(batch);
    }

    /// Turn one change summary into a batch, then purge the ids of removed
    /// nodes from the registry.
    pub fn build_batch(&mut self, tree: &T, summary: &ChangeSummary<T::Node>) -> DiffBatch {
        let removed: Vec<NodeData> = summary
            .removed
            .iter()
            .filter_map(|&node| self.serialize_node(tree, node, false))
            .collect();

        let added_or_moved = self.serialize_added_and_moved(tree, summary);
        let attributes = self.serialize_attribute_changes(tree, summary);

        let text: Vec<TextData> = summary
            .character_data_changed
            .iter()
            .filter_map(|&node| {
                let data = self.serialize_node(tree, node, false)?;
                Some(TextData {
                    node: data,
                    // This channel is raw on purpose: the receiver applies it
                    // without running the codec.
                    text_content: tree.text_content(node).unwrap_or_default(),
                })
            })
            .collect();

        for data in &removed {
            self.registry.forget(data.id);
        }

        trace!(
            "batch: {} removed, {} positioned, {} attribute records, {} text records",
            removed.len(),
            added_or_moved.len(),
            attributes.len(),
            text.len()
        );

        DiffBatch {
            removed,
            added_or_moved,
            attributes,
            text,
        }
    }

    /// Serialize one node, assigning an id on first contact.
    ///
    /// Already-known nodes come back as the reference form regardless of
    /// `recursive`. Comments and excluded-tag elements come back as `None`;
    /// for comments the freshly assigned id is immediately forgotten (the
    /// counter still advances), for excluded elements it is kept so later
    /// sightings resolve to a reference without re-visiting the subtree.
    pub fn serialize_node(&mut self, tree: &T, node: T::Node, recursive: bool) -> Option<NodeData> {
        if let Some(id) = self.registry.id(node) {
            return Some(NodeData::reference(id));
        }

        let kind = tree.kind(node);
        let id = self.registry.assign(node);
        let mut data = NodeData::new(id, kind);

        match kind {
            NodeKind::Comment => {
                self.registry.forget(id);
                return None;
            }
            NodeKind::DocumentType => {
                let (name, public_id, system_id) = tree.doctype(node).unwrap_or_default();
                data.name = Some(name);
                data.public_id = Some(public_id);
                data.system_id = Some(system_id);
            }
            NodeKind::Text => {
                data.text = Some(tree.text_content(node).unwrap_or_default());
            }
            NodeKind::Element => {
                let tag = tree.tag_name(node).unwrap_or_default();
                if excluded_tag(&tag) {
                    return None;
                }
                data.attributes = Some(tree.attributes(node).into_iter().collect());
                data.tag = Some(tag);
                if recursive {
                    let mut children = Vec::new();
                    let mut child = tree.first_child(node);
                    while let Some(c) = child {
                        if let Some(child_data) = self.serialize_node(tree, c, true) {
                            children.push(child_data);
                        }
                        child = tree.next_sibling(c);
                    }
                    if !children.is_empty() {
                        data.children = Some(children);
                    }
                }
            }
        }

        Some(self.compress_node(data))
    }

    /// Compression step: payloads carrying text or an attribute map are
    /// flagged and their strings run through the codec.
    fn compress_node(&self, mut data: NodeData) -> NodeData {
        if data.text.is_none() && data.attributes.is_none() {
            return data;
        }
        data.compressed = true;
        if let Some(text) = data.text.take() {
            data.text = Some(self.codec.encode(&text));
        }
        if let Some(attrs) = data.attributes.as_mut() {
            for value in attrs.values_mut() {
                *value = self.codec.encode(value);
            }
        }
        data
    }

    /// Move-run compaction over the union of added, reparented, and
    /// reordered nodes.
    ///
    /// The union is grouped by current parent; within a group every
    /// contiguous run of changed siblings is emitted left to right, so the
    /// receiver reconstructs the exact final order by sequentially inserting
    /// each node after its previous sibling (or at the front). Exactly one
    /// record per changed-position node.
    fn serialize_added_and_moved(
        &mut self,
        tree: &T,
        summary: &ChangeSummary<T::Node>,
    ) -> Vec<PositionData> {
        let union = summary
            .added
            .iter()
            .chain(summary.reparented.iter())
            .chain(summary.reordered.iter());

        // First-encounter grouping keeps record order deterministic.
        // Unmirrored members never produce records and would stall the run
        // walk, so they are dropped up front.
        let mut groups: Vec<Vec<T::Node>> = Vec::new();
        let mut group_of: HashMap<T::Node, usize> = HashMap::new();
        let mut in_union: HashSet<T::Node> = HashSet::new();

        for &node in union {
            if !is_mirrored(tree, node) {
                continue;
            }
            // A node detached again later in the same turn has no position
            // to report.
            let Some(parent) = tree.parent(node) else {
                continue;
            };
            if !in_union.insert(node) {
                continue;
            }
            let index = *group_of.entry(parent).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[index].push(node);
        }

        let mut moved = Vec::new();
        let mut emitted: HashSet<T::Node> = HashSet::new();

        for group in &groups {
            for &start in group {
                if emitted.contains(&start) {
                    continue;
                }

                // Walk back through changed siblings to the start of the run.
                // Contiguity is judged over mirrored siblings only, so a run
                // continues across interleaved comments and excluded tags.
                let mut node = start;
                while let Some(prev) = mirrored_previous_sibling(tree, node) {
                    if in_union.contains(&prev) && !emitted.contains(&prev) {
                        node = prev;
                    } else {
                        break;
                    }
                }

                // Emit the run left to right.
                let mut cursor = Some(node);
                while let Some(current) = cursor {
                    if !in_union.contains(&current) || emitted.contains(&current) {
                        break;
                    }
                    emitted.insert(current);
                    if let Some(data) = self.serialize_node(tree, current, true) {
                        let previous_sibling = mirrored_previous_sibling(tree, current)
                            .and_then(|prev| self.serialize_node(tree, prev, false));
                        let parent = tree
                            .parent(current)
                            .and_then(|parent| self.serialize_node(tree, parent, false));
                        moved.push(PositionData {
                            node: data,
                            parent,
                            previous_sibling,
                        });
                    }
                    cursor = mirrored_next_sibling(tree, current);
                }
            }
        }

        moved
    }

    /// One record per changed element, accumulating every changed attribute
    /// name; values are current (encoded), removals are tombstones.
    fn serialize_attribute_changes(
        &mut self,
        tree: &T,
        summary: &ChangeSummary<T::Node>,
    ) -> Vec<AttributeData> {
        let mut records: Vec<AttributeData> = Vec::new();
        let mut index: HashMap<T::Node, usize> = HashMap::new();

        for (name, elements) in &summary.attribute_changed {
            for &element in elements {
                let slot = match index.get(&element) {
                    Some(&slot) => slot,
                    None => {
                        let Some(node) = self.serialize_node(tree, element, false) else {
                            continue;
                        };
                        records.push(AttributeData {
                            node,
                            attributes: Default::default(),
                        });
                        index.insert(element, records.len() - 1);
                        records.len() - 1
                    }
                };
                let value = tree
                    .attribute(element, name)
                    .map(|value| self.codec.encode(&value));
                records[slot].attributes.insert(name.clone(), value);
            }
        }

        records
    }
}
