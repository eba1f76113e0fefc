//! # MOFnet Core Library
//!
//! Topological simplification of periodic framework materials. An atomistic
//! structure is reduced to a net of pseudo-atoms joined by explicit
//! connection sites, by repeatedly collapsing fragments (metal clusters,
//! linkers) into single points while keeping every connection that left them.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** Stateless data models: the slotmap-backed
//!   `Structure` graph, atoms, bonds, unit cells and geometric helpers.
//!
//! - **[`net`]: The Engine.** The stateful `Topology` that maintains the
//!   simplified net, the original-to-pseudo-atom maps and atom roles, and
//!   exports the result as a plain `Structure`.

pub mod core;
pub mod net;
