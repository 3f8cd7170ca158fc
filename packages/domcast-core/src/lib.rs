#![forbid(unsafe_code)]
//! Incremental mirroring of a live, mutable document tree into a detached replica.
//! The source side assigns stable node ids, serializes nodes on first contact, and
//! compacts each turn's edits into one [`DiffBatch`]; the replica side replays
//! batches in production order and converges, best effort, to the source's exact
//! shape. Concrete trees, the payload codec, and the mutation-observation engine
//! all stay behind the traits defined here.

pub mod client;
pub mod error;
pub mod ids;
pub mod mirror;
pub mod records;
pub mod registry;
pub mod traits;
pub mod tree;

pub use client::MirrorClient;
pub use error::{Error, Result};
pub use ids::MirrorId;
pub use mirror::TreeMirror;
pub use records::{AttributeData, DiffBatch, NodeData, NodeKind, PositionData, TextData};
pub use registry::NodeRegistry;
pub use traits::{
    BatchSink, BufferedSink, ChangeObserver, ChangeSummary, Codec, IdentityCodec, MirrorDelegate,
    NoopDelegate, ObserverQuery, QueuedObserver, ReplicaTree, SourceTree,
};
pub use tree::{DomNodeId, MemoryDom, NodeExport};
