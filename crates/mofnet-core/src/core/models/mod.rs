//! # Core Models Module
//!
//! The atom-graph layer that the simplification engine operates on.
//!
//! ## Key Components
//!
//! - [`ids`] - Stable atom handles and per-instance structure identities
//! - [`atom`] - Atoms and pseudo-atoms (element tag plus Cartesian position)
//! - [`topology`] - Undirected bonds and bond orders
//! - [`lattice`] - Periodic unit cells with wrap / nearest-image unwrap
//! - [`system`] - The `Structure` arena tying atoms, bonds and the cell together
//!
//! ## Usage
//!
//! ```ignore
//! use mofnet::core::models::{atom::Atom, lattice::UnitCell, system::Structure};
//!
//! let mut structure = Structure::with_cell(UnitCell::cubic(10.0)?);
//! let zn = structure.add_atom(Atom::new(30, Point3::new(0.0, 0.0, 0.0)));
//! let o = structure.add_atom(Atom::new(8, Point3::new(2.0, 0.0, 0.0)));
//! structure.add_bond(zn, o, BondOrder::Single);
//! ```

pub mod atom;
pub mod ids;
pub mod lattice;
pub mod system;
pub mod topology;
