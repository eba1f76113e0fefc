use thiserror::Error;

use crate::core::models::ids::{AtomId, StructureId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetError {
    #[error("Atoms belong to {found}, expected atoms of {expected}")]
    ParentMismatch {
        expected: StructureId,
        found: StructureId,
    },

    #[error("Refusing to connect atom {atom:?} to itself")]
    SelfLoop { atom: AtomId },

    #[error("Connection {conn:?} is already registered")]
    DuplicateConnection { conn: AtomId },

    #[error("Atom {conn:?} is an endpoint and cannot act as a connection")]
    ConnectionIsEndpoint { conn: AtomId },

    #[error("Atoms {atom:?} and {neighbor:?} are bonded directly instead of through a connection")]
    DirectBond { atom: AtomId, neighbor: AtomId },

    #[error("Atom {atom:?} is not a registered connection")]
    NotAConnection { atom: AtomId },

    #[error("Atom {atom:?} is a connection where a pseudo-atom was expected")]
    UnexpectedConnection { atom: AtomId },

    #[error("Atom {atom:?} not found in structure")]
    AtomNotFound { atom: AtomId },

    #[error("Original atom {atom:?} has already been removed")]
    DeletedAtom { atom: AtomId },

    #[error("Cannot collapse an empty fragment")]
    EmptyFragment,

    #[error("Topology is inconsistent: {0}")]
    Inconsistent(String),
}

/// Fails with `ParentMismatch` unless `found` is the `expected` structure.
pub(crate) fn ensure_parent(expected: StructureId, found: StructureId) -> Result<(), NetError> {
    if expected == found {
        Ok(())
    } else {
        Err(NetError::ParentMismatch { expected, found })
    }
}
