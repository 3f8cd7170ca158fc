use crate::error::{Error, Result};
use crate::records::NodeKind;
use crate::traits::{ReplicaTree, SourceTree};

/// Handle into a [`MemoryDom`] arena. Only valid for the arena that minted it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct DomNodeId(usize);

#[derive(Clone, Debug)]
struct DomNode {
    kind: NodeKind,
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    name: String,
    public_id: String,
    system_id: String,
    parent: Option<DomNodeId>,
    children: Vec<DomNodeId>,
}

impl DomNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            tag: String::new(),
            attrs: Vec::new(),
            text: String::new(),
            name: String::new(),
            public_id: String::new(),
            system_id: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Structural snapshot of a subtree, used for assertions and debugging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeExport {
    pub kind: NodeKind,
    pub tag: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub doctype: Option<(String, String, String)>,
    pub children: Vec<NodeExport>,
}

fn valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '=' | '"' | '\'' | '/' | '>'))
}

/// In-memory document tree for prototyping and tests. One arena implements
/// both tree traits, so it can stand in for either side of a session; the
/// inherent mutators double as the "live edit" API when it plays the source.
#[derive(Clone, Debug)]
pub struct MemoryDom {
    nodes: Vec<DomNode>,
}

impl MemoryDom {
    /// Fresh arena holding only the root container node.
    pub fn new() -> Self {
        let mut root = DomNode::new(NodeKind::Element);
        root.tag = "#document".to_owned();
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> DomNodeId {
        DomNodeId(0)
    }

    fn get(&self, node: DomNodeId) -> &DomNode {
        &self.nodes[node.0]
    }

    fn get_mut(&mut self, node: DomNodeId) -> &mut DomNode {
        &mut self.nodes[node.0]
    }

    fn alloc(&mut self, node: DomNode) -> DomNodeId {
        self.nodes.push(node);
        DomNodeId(self.nodes.len() - 1)
    }

    pub fn new_element(&mut self, tag: &str) -> DomNodeId {
        let mut node = DomNode::new(NodeKind::Element);
        node.tag = tag.to_owned();
        self.alloc(node)
    }

    pub fn new_text(&mut self, text: &str) -> DomNodeId {
        let mut node = DomNode::new(NodeKind::Text);
        node.text = text.to_owned();
        self.alloc(node)
    }

    pub fn new_comment(&mut self, text: &str) -> DomNodeId {
        let mut node = DomNode::new(NodeKind::Comment);
        node.text = text.to_owned();
        self.alloc(node)
    }

    pub fn new_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> DomNodeId {
        let mut node = DomNode::new(NodeKind::DocumentType);
        node.name = name.to_owned();
        node.public_id = public_id.to_owned();
        node.system_id = system_id.to_owned();
        self.alloc(node)
    }

    pub fn kind(&self, node: DomNodeId) -> NodeKind {
        self.get(node).kind
    }

    pub fn tag(&self, node: DomNodeId) -> &str {
        &self.get(node).tag
    }

    pub fn text(&self, node: DomNodeId) -> &str {
        &self.get(node).text
    }

    pub fn attributes(&self, node: DomNodeId) -> &[(String, String)] {
        &self.get(node).attrs
    }

    pub fn attribute(&self, node: DomNodeId, name: &str) -> Option<&str> {
        self.get(node)
            .attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn parent(&self, node: DomNodeId) -> Option<DomNodeId> {
        self.get(node).parent
    }

    pub fn children(&self, node: DomNodeId) -> &[DomNodeId] {
        &self.get(node).children
    }

    pub fn first_child(&self, node: DomNodeId) -> Option<DomNodeId> {
        self.get(node).children.first().copied()
    }

    pub fn next_sibling(&self, node: DomNodeId) -> Option<DomNodeId> {
        let parent = self.get(node).parent?;
        let siblings = &self.get(parent).children;
        let position = siblings.iter().position(|&c| c == node)?;
        siblings.get(position + 1).copied()
    }

    pub fn previous_sibling(&self, node: DomNodeId) -> Option<DomNodeId> {
        let parent = self.get(node).parent?;
        let siblings = &self.get(parent).children;
        let position = siblings.iter().position(|&c| c == node)?;
        siblings.get(position.checked_sub(1)?).copied()
    }

    /// Append `node` as the last child of `parent`, detaching it first if it
    /// already sits somewhere.
    pub fn append_child(&mut self, parent: DomNodeId, node: DomNodeId) {
        self.detach(node);
        self.get_mut(parent).children.push(node);
        self.get_mut(node).parent = Some(parent);
    }

    /// Insert `node` immediately after `previous` under `parent`, or at the
    /// front when `previous` is `None`. A sibling that is not currently a
    /// child of `parent` behaves like an absent one.
    pub fn insert_after(
        &mut self,
        parent: DomNodeId,
        node: DomNodeId,
        previous: Option<DomNodeId>,
    ) {
        self.detach(node);
        let position = match previous {
            Some(prev) => self
                .get(parent)
                .children
                .iter()
                .position(|&c| c == prev)
                .map_or(0, |i| i + 1),
            None => 0,
        };
        self.get_mut(parent).children.insert(position, node);
        self.get_mut(node).parent = Some(parent);
    }

    pub fn detach(&mut self, node: DomNodeId) {
        if let Some(parent) = self.get(node).parent {
            self.get_mut(parent).children.retain(|&c| c != node);
            self.get_mut(node).parent = None;
        }
    }

    /// Set or replace an attribute, keeping document order for existing
    /// names. Rejects non-element targets and syntactically invalid names.
    pub fn set_attribute(&mut self, node: DomNodeId, name: &str, value: &str) -> Result<()> {
        let entry = self.get(node);
        if entry.kind != NodeKind::Element {
            return Err(Error::InvalidTarget(format!(
                "{:?} node cannot carry attributes",
                entry.kind
            )));
        }
        if !valid_attribute_name(name) {
            return Err(Error::AttributeRejected(format!(
                "invalid attribute name {name:?}"
            )));
        }
        let entry = self.get_mut(node);
        if let Some(slot) = entry.attrs.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value.to_owned();
        } else {
            entry.attrs.push((name.to_owned(), value.to_owned()));
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: DomNodeId, name: &str) {
        self.get_mut(node).attrs.retain(|(n, _)| n != name);
    }

    pub fn set_text(&mut self, node: DomNodeId, text: &str) {
        self.get_mut(node).text = text.to_owned();
    }

    pub fn export(&self, node: DomNodeId) -> NodeExport {
        let entry = self.get(node);
        // Attribute order is not part of the mirrored shape; sort so exports
        // from either side compare equal.
        let mut attributes = entry.attrs.clone();
        attributes.sort();
        NodeExport {
            kind: entry.kind,
            tag: (entry.kind == NodeKind::Element).then(|| entry.tag.clone()),
            attributes,
            text: matches!(entry.kind, NodeKind::Text | NodeKind::Comment)
                .then(|| entry.text.clone()),
            doctype: (entry.kind == NodeKind::DocumentType).then(|| {
                (
                    entry.name.clone(),
                    entry.public_id.clone(),
                    entry.system_id.clone(),
                )
            }),
            children: entry.children.iter().map(|&c| self.export(c)).collect(),
        }
    }
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceTree for MemoryDom {
    type Node = DomNodeId;

    fn kind(&self, node: DomNodeId) -> NodeKind {
        self.kind(node)
    }

    fn tag_name(&self, node: DomNodeId) -> Option<String> {
        (self.kind(node) == NodeKind::Element).then(|| self.tag(node).to_owned())
    }

    fn attributes(&self, node: DomNodeId) -> Vec<(String, String)> {
        self.attributes(node).to_vec()
    }

    fn attribute(&self, node: DomNodeId, name: &str) -> Option<String> {
        self.attribute(node, name).map(str::to_owned)
    }

    fn text_content(&self, node: DomNodeId) -> Option<String> {
        matches!(self.kind(node), NodeKind::Text | NodeKind::Comment)
            .then(|| self.text(node).to_owned())
    }

    fn doctype(&self, node: DomNodeId) -> Option<(String, String, String)> {
        (self.kind(node) == NodeKind::DocumentType).then(|| {
            let entry = self.get(node);
            (
                entry.name.clone(),
                entry.public_id.clone(),
                entry.system_id.clone(),
            )
        })
    }

    fn parent(&self, node: DomNodeId) -> Option<DomNodeId> {
        self.parent(node)
    }

    fn first_child(&self, node: DomNodeId) -> Option<DomNodeId> {
        self.first_child(node)
    }

    fn next_sibling(&self, node: DomNodeId) -> Option<DomNodeId> {
        self.next_sibling(node)
    }

    fn previous_sibling(&self, node: DomNodeId) -> Option<DomNodeId> {
        self.previous_sibling(node)
    }
}

impl ReplicaTree for MemoryDom {
    type Node = DomNodeId;

    fn create_element(&mut self, tag: &str) -> DomNodeId {
        self.new_element(tag)
    }

    fn create_text(&mut self, text: &str) -> DomNodeId {
        self.new_text(text)
    }

    fn create_comment(&mut self, text: &str) -> DomNodeId {
        self.new_comment(text)
    }

    fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> DomNodeId {
        self.new_doctype(name, public_id, system_id)
    }

    fn parent(&self, node: DomNodeId) -> Option<DomNodeId> {
        self.parent(node)
    }

    fn detach(&mut self, node: DomNodeId) {
        self.detach(node);
    }

    fn append_child(&mut self, parent: DomNodeId, node: DomNodeId) {
        self.append_child(parent, node);
    }

    fn insert_after(&mut self, parent: DomNodeId, node: DomNodeId, previous: Option<DomNodeId>) {
        self.insert_after(parent, node, previous);
    }

    fn set_attribute(&mut self, node: DomNodeId, name: &str, value: &str) -> Result<()> {
        self.set_attribute(node, name, value)
    }

    fn remove_attribute(&mut self, node: DomNodeId, name: &str) {
        self.remove_attribute(node, name);
    }

    fn set_text(&mut self, node: DomNodeId, text: &str) {
        self.set_text(node, text);
    }
}
