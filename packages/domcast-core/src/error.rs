use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by tree implementations. The protocol itself degrades
/// silently: unresolved references and filtered nodes are `None`, not errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("attribute rejected: {0}")]
    AttributeRejected(String),
    #[error("invalid target: {0}")]
    InvalidTarget(String),
}
