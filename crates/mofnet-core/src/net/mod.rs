//! # Net Module
//!
//! The simplification engine. A [`topology::Topology`] owns an original
//! structure and a simplified net derived from it, in which every real
//! pseudo-atom is linked to its neighbors only through degree-2 connection
//! pseudo-atoms.
//!
//! ## Key Components
//!
//! - [`virtual_mol`] - Atom subsets of a structure and the graph queries over them
//! - [`connection`] - Bidirectional index of connection pseudo-atoms and their endpoints
//! - [`roles`] - String role labels attached to original atoms
//! - [`config`] - Element tags, connection placement weights and role coloring
//! - [`topology`] - Net construction, fragment collapse, role bookkeeping and export
//! - [`error`] - The `NetError` type shared by all of the above

pub mod config;
pub mod connection;
pub mod error;
pub mod roles;
pub mod topology;
pub mod virtual_mol;
