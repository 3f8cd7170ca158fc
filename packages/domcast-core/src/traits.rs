use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::hash::Hash;

use crate::error::Result;
use crate::ids::MirrorId;
use crate::records::{DiffBatch, NodeData, NodeKind};

/// Read access to the live tree being observed.
///
/// Handles are opaque and must stay valid (and keep comparing equal to
/// themselves) for the lifetime of the session.
pub trait SourceTree {
    type Node: Copy + Eq + Hash + fmt::Debug;

    fn kind(&self, node: Self::Node) -> NodeKind;
    /// Element tag name; `None` for non-elements.
    fn tag_name(&self, node: Self::Node) -> Option<String>;
    /// All attributes in document order. Empty for non-elements.
    fn attributes(&self, node: Self::Node) -> Vec<(String, String)>;
    /// Current value of a single attribute; `None` once it has been removed.
    fn attribute(&self, node: Self::Node, name: &str) -> Option<String>;
    /// Content of text and comment nodes.
    fn text_content(&self, node: Self::Node) -> Option<String>;
    /// Document type as (name, public id, system id).
    fn doctype(&self, node: Self::Node) -> Option<(String, String, String)>;
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;
    fn first_child(&self, node: Self::Node) -> Option<Self::Node>;
    fn next_sibling(&self, node: Self::Node) -> Option<Self::Node>;
    fn previous_sibling(&self, node: Self::Node) -> Option<Self::Node>;
}

/// Mutation access to the replica tree.
pub trait ReplicaTree {
    type Node: Copy + Eq + Hash + fmt::Debug;

    fn create_element(&mut self, tag: &str) -> Self::Node;
    fn create_text(&mut self, text: &str) -> Self::Node;
    fn create_comment(&mut self, text: &str) -> Self::Node;
    fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> Self::Node;
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;
    /// Remove `node` from its parent. No-op for detached nodes.
    fn detach(&mut self, node: Self::Node);
    fn append_child(&mut self, parent: Self::Node, node: Self::Node);
    /// Insert `node` under `parent` immediately after `previous`, or at the
    /// front when `previous` is `None`.
    fn insert_after(&mut self, parent: Self::Node, node: Self::Node, previous: Option<Self::Node>);
    fn set_attribute(&mut self, node: Self::Node, name: &str, value: &str) -> Result<()>;
    /// No-op when the attribute is already absent.
    fn remove_attribute(&mut self, node: Self::Node, name: &str);
    fn set_text(&mut self, node: Self::Node, text: &str);
}

/// Reversible transform applied to text and attribute payloads before they
/// cross the boundary, and reversed exactly once on the other side.
pub trait Codec {
    fn encode(&self, text: &str) -> String;
    fn decode(&self, text: &str) -> String;
}

/// Passthrough codec for when payload size does not matter.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityCodec;

impl Codec for IdentityCodec {
    fn encode(&self, text: &str) -> String {
        text.to_owned()
    }

    fn decode(&self, text: &str) -> String {
        text.to_owned()
    }
}

/// Optional replica-side hooks overriding element creation and attribute
/// application. Declining (`None` / `false`) falls back to the native tree
/// operation.
pub trait MirrorDelegate<T: ReplicaTree> {
    fn try_create_element(&mut self, tree: &mut T, tag: &str) -> Option<T::Node> {
        let _ = (tree, tag);
        None
    }

    fn try_set_attribute(&mut self, tree: &mut T, node: T::Node, name: &str, value: &str) -> bool {
        let _ = (tree, node, name, value);
        false
    }
}

/// Delegate that declines every hook.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopDelegate;

impl<T: ReplicaTree> MirrorDelegate<T> for NoopDelegate {}

/// One turn's worth of classified tree changes, as delivered by the
/// observation engine.
///
/// `added` lists the roots of newly inserted subtrees; their descendants are
/// embedded on first-contact serialization rather than reported separately.
/// Entries listed redundantly (a descendant alongside its ancestor) degrade
/// to reference records and are harmless.
#[derive(Clone, Debug)]
pub struct ChangeSummary<N> {
    pub added: Vec<N>,
    pub removed: Vec<N>,
    pub reparented: Vec<N>,
    pub reordered: Vec<N>,
    /// Changed elements grouped per attribute name.
    pub attribute_changed: BTreeMap<String, Vec<N>>,
    pub character_data_changed: Vec<N>,
}

impl<N> Default for ChangeSummary<N> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            reparented: Vec::new(),
            reordered: Vec::new(),
            attribute_changed: BTreeMap::new(),
            character_data_changed: Vec::new(),
        }
    }
}

/// Observation queries understood by the engine. The client always registers
/// [`All`](ObserverQuery::All) first; extra queries are passed through
/// verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObserverQuery {
    All,
    Element(String),
    Attribute(String),
    CharacterData,
}

/// The external mutation-observation engine.
///
/// Polled once per scheduling turn; summaries come out in mutation order and
/// at most one per poll, so the build/apply path for each summary runs to
/// completion before the next one is seen.
pub trait ChangeObserver {
    type Node;

    fn observe(&mut self, root: Self::Node, queries: &[ObserverQuery]);
    fn disconnect(&mut self);
    fn take_summary(&mut self) -> Option<ChangeSummary<Self::Node>>;
}

/// In-memory observer fed directly by the host; hands out queued summaries
/// one per poll. Pushes are dropped while not observing.
#[derive(Clone, Debug)]
pub struct QueuedObserver<N> {
    queue: VecDeque<ChangeSummary<N>>,
    observing: bool,
}

impl<N> QueuedObserver<N> {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            observing: false,
        }
    }

    pub fn push(&mut self, summary: ChangeSummary<N>) {
        if self.observing {
            self.queue.push_back(summary);
        }
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }
}

impl<N> Default for QueuedObserver<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> ChangeObserver for QueuedObserver<N> {
    type Node = N;

    fn observe(&mut self, _root: N, _queries: &[ObserverQuery]) {
        self.observing = true;
    }

    fn disconnect(&mut self) {
        self.observing = false;
        self.queue.clear();
    }

    fn take_summary(&mut self) -> Option<ChangeSummary<N>> {
        if self.observing {
            self.queue.pop_front()
        } else {
            None
        }
    }
}

/// Receiving end of the batch stream. [`TreeMirror`](crate::TreeMirror)
/// implements this for in-process mirroring; [`BufferedSink`] queues payloads
/// for a transport.
pub trait BatchSink {
    fn initialize(&mut self, root_id: MirrorId, children: Vec<NodeData>);
    fn apply_changed(&mut self, batch: DiffBatch);
}

/// Sink that buffers payloads until a transport drains them. Batches must be
/// delivered in the order they were buffered.
#[derive(Clone, Debug, Default)]
pub struct BufferedSink {
    init: Option<(MirrorId, Vec<NodeData>)>,
    batches: VecDeque<DiffBatch>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_init(&mut self) -> Option<(MirrorId, Vec<NodeData>)> {
        self.init.take()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = DiffBatch> + '_ {
        self.batches.drain(..)
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

impl BatchSink for BufferedSink {
    fn initialize(&mut self, root_id: MirrorId, children: Vec<NodeData>) {
        self.init = Some((root_id, children));
    }

    fn apply_changed(&mut self, batch: DiffBatch) {
        self.batches.push_back(batch);
    }
}
