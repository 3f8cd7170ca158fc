use std::collections::BTreeMap;

use crate::ids::MirrorId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Node kinds that can cross the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    DocumentType,
}

/// Serialized representation of one node.
///
/// The reference form carries only `id`: it is emitted whenever the sender has
/// already transmitted the node, and the receiver resolves it against its
/// registry instead of constructing anything. Full payloads carry the
/// kind-specific fields, and `children` only on first-time recursive
/// serialization.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeData {
    #[cfg_attr(feature = "serde", serde(rename = "i"))]
    pub id: MirrorId,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "nT", default, skip_serializing_if = "Option::is_none")
    )]
    pub kind: Option<NodeKind>,
    /// Document type name.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "n", default, skip_serializing_if = "Option::is_none")
    )]
    pub name: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "p", default, skip_serializing_if = "Option::is_none")
    )]
    pub public_id: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "s", default, skip_serializing_if = "Option::is_none")
    )]
    pub system_id: Option<String>,
    /// Text content; codec-encoded when `compressed` is set.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "tC", default, skip_serializing_if = "Option::is_none")
    )]
    pub text: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "tN", default, skip_serializing_if = "Option::is_none")
    )]
    pub tag: Option<String>,
    /// Attribute map; always present on element payloads, possibly empty.
    /// Values are codec-encoded when `compressed` is set.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "a", default, skip_serializing_if = "Option::is_none")
    )]
    pub attributes: Option<BTreeMap<String, String>>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "cN", default, skip_serializing_if = "Option::is_none")
    )]
    pub children: Option<Vec<NodeData>>,
    /// Set when `text` or `attributes` passed through the codec.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "c", default, skip_serializing_if = "std::ops::Not::not")
    )]
    pub compressed: bool,
}

impl NodeData {
    /// Reference form: id only, no content, no recursion.
    pub fn reference(id: MirrorId) -> Self {
        Self {
            id,
            kind: None,
            name: None,
            public_id: None,
            system_id: None,
            text: None,
            tag: None,
            attributes: None,
            children: None,
            compressed: false,
        }
    }

    /// Empty full payload of the given kind.
    pub fn new(id: MirrorId, kind: NodeKind) -> Self {
        let mut data = Self::reference(id);
        data.kind = Some(kind);
        data
    }

    pub fn is_reference(&self) -> bool {
        self.kind.is_none()
    }
}

/// A node plus its new location: the parent it now sits under and the sibling
/// it immediately follows (`None` means first child).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PositionData {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub node: NodeData,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "parentNode", default, skip_serializing_if = "Option::is_none")
    )]
    pub parent: Option<NodeData>,
    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "previousSibling",
            default,
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub previous_sibling: Option<NodeData>,
}

/// Attribute updates for one element. `None` values are tombstones: the
/// attribute was removed on the source side.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AttributeData {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub node: NodeData,
    #[cfg_attr(feature = "serde", serde(rename = "attributes"))]
    pub attributes: BTreeMap<String, Option<String>>,
}

/// New text content for one node. This channel is always raw: the content is
/// not codec-encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TextData {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub node: NodeData,
    #[cfg_attr(feature = "serde", serde(rename = "textContent"))]
    pub text_content: String,
}

/// One incremental change payload covering a single observation turn.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiffBatch {
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Vec::is_empty")
    )]
    pub removed: Vec<NodeData>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "addedOrMoved", default, skip_serializing_if = "Vec::is_empty")
    )]
    pub added_or_moved: Vec<PositionData>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Vec::is_empty")
    )]
    pub attributes: Vec<AttributeData>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Vec::is_empty")
    )]
    pub text: Vec<TextData>,
}

impl DiffBatch {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
            && self.added_or_moved.is_empty()
            && self.attributes.is_empty()
            && self.text.is_empty()
    }
}
