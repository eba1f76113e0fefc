use super::atom::Atom;
use super::ids::{AtomId, StructureId};
use super::lattice::UnitCell;
use super::topology::{Bond, BondOrder};
use nalgebra::Point3;
use slotmap::{SecondaryMap, SlotMap};
use std::collections::BTreeMap;

/// An atom graph, optionally embedded in a periodic unit cell.
///
/// Atoms live in a slot map, so an `AtomId` stays valid (and unique) for the
/// lifetime of its atom and is never handed out again after removal. Each
/// instance, clones included, carries its own `StructureId`.
#[derive(Debug)]
pub struct Structure {
    /// Identity of this instance.
    id: StructureId,
    /// Primary storage for atoms.
    atoms: SlotMap<AtomId, Atom>,
    /// Bonds keyed by their normalized endpoint pair.
    bonds: BTreeMap<(AtomId, AtomId), Bond>,
    /// Cached adjacency list, indexed by atom ID.
    bond_adjacency: SecondaryMap<AtomId, Vec<AtomId>>,
    /// Periodic lattice; `None` for a non-periodic structure.
    cell: Option<UnitCell>,
}

impl Default for Structure {
    fn default() -> Self {
        Self {
            id: StructureId::next(),
            atoms: SlotMap::with_key(),
            bonds: BTreeMap::new(),
            bond_adjacency: SecondaryMap::new(),
            cell: None,
        }
    }
}

impl Clone for Structure {
    fn clone(&self) -> Self {
        Self {
            id: StructureId::next(),
            atoms: self.atoms.clone(),
            bonds: self.bonds.clone(),
            bond_adjacency: self.bond_adjacency.clone(),
            cell: self.cell.clone(),
        }
    }
}

impl Structure {
    /// Creates a new, empty, non-periodic structure.
    ///
    /// The structure receives a fresh `StructureId`; atoms and bonds are added
    /// with [`Structure::add_atom`] and [`Structure::add_bond`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new, empty structure embedded in a periodic unit cell.
    ///
    /// # Arguments
    ///
    /// * `cell` - The lattice every position of this structure is interpreted in.
    pub fn with_cell(cell: UnitCell) -> Self {
        Self {
            cell: Some(cell),
            ..Self::default()
        }
    }

    /// Returns the identity of this instance.
    ///
    /// Subsets of atoms (`VirtualMol`) record this id to detect mixing atoms of
    /// different structures.
    pub fn id(&self) -> StructureId {
        self.id
    }

    /// Returns the unit cell, if the structure is periodic.
    pub fn cell(&self) -> Option<&UnitCell> {
        self.cell.as_ref()
    }

    /// Replaces the unit cell. Passing `None` makes the structure non-periodic.
    ///
    /// # Arguments
    ///
    /// * `cell` - The new lattice, or `None`.
    pub fn set_cell(&mut self, cell: Option<UnitCell>) {
        self.cell = cell;
    }

    /// Returns `true` if the structure has a unit cell.
    pub fn is_periodic(&self) -> bool {
        self.cell.is_some()
    }

    /// Retrieves an immutable reference to an atom by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The atom ID to look up.
    ///
    /// # Return
    ///
    /// Returns `Some(&Atom)` if the atom exists, otherwise `None`.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Retrieves a mutable reference to an atom by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The atom ID to look up.
    ///
    /// # Return
    ///
    /// Returns `Some(&mut Atom)` if the atom exists, otherwise `None`.
    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Checks whether an atom is still present.
    ///
    /// # Arguments
    ///
    /// * `id` - The atom ID to look up.
    ///
    /// # Return
    ///
    /// Returns `true` if the atom exists; `false` if it was never part of this
    /// structure or has been removed.
    pub fn contains_atom(&self, id: AtomId) -> bool {
        self.atoms.contains_key(id)
    }

    /// Returns the Cartesian position of an atom.
    ///
    /// # Arguments
    ///
    /// * `id` - The atom ID to look up.
    ///
    /// # Return
    ///
    /// Returns `Some(Point3)` if the atom exists, otherwise `None`.
    pub fn position(&self, id: AtomId) -> Option<Point3<f64>> {
        self.atoms.get(id).map(|a| a.position)
    }

    /// Returns an iterator over all atoms in the structure.
    ///
    /// # Return
    ///
    /// An iterator yielding `(AtomId, &Atom)` pairs.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atoms.iter()
    }

    /// Returns a mutable iterator over all atoms in the structure.
    ///
    /// # Return
    ///
    /// An iterator yielding `(AtomId, &mut Atom)` pairs.
    pub fn atoms_iter_mut(&mut self) -> impl Iterator<Item = (AtomId, &mut Atom)> {
        self.atoms.iter_mut()
    }

    /// Returns the number of atoms currently in the structure.
    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    /// Returns an iterator over all bonds.
    ///
    /// # Return
    ///
    /// An iterator yielding `&Bond`, in a stable order (sorted by endpoint ids).
    pub fn bonds_iter(&self) -> impl Iterator<Item = &Bond> {
        self.bonds.values()
    }

    /// Returns the number of bonds currently in the structure.
    pub fn num_bonds(&self) -> usize {
        self.bonds.len()
    }

    /// Adds an atom to the structure.
    ///
    /// # Arguments
    ///
    /// * `atom` - The atom to insert.
    ///
    /// # Return
    ///
    /// Returns the new atom's ID. IDs are never reused, even after removal.
    pub fn add_atom(&mut self, atom: Atom) -> AtomId {
        let atom_id = self.atoms.insert(atom);
        self.bond_adjacency.insert(atom_id, Vec::new());
        atom_id
    }

    /// Adds a bond between two atoms.
    ///
    /// Adding an existing bond succeeds without creating a duplicate; the stored
    /// order is kept.
    ///
    /// # Arguments
    ///
    /// * `atom1_id` - One endpoint.
    /// * `atom2_id` - The other endpoint.
    /// * `order` - The bond order to record.
    ///
    /// # Return
    ///
    /// Returns `Some(())` on success, or `None` if either atom is missing or the
    /// two IDs are equal.
    pub fn add_bond(&mut self, atom1_id: AtomId, atom2_id: AtomId, order: BondOrder) -> Option<()> {
        if atom1_id == atom2_id
            || !self.atoms.contains_key(atom1_id)
            || !self.atoms.contains_key(atom2_id)
        {
            return None;
        }

        let bond = Bond::new(atom1_id, atom2_id, order);
        if self.bonds.contains_key(&bond.key()) {
            return Some(());
        }

        self.bonds.insert(bond.key(), bond);
        self.bond_adjacency[atom1_id].push(atom2_id);
        self.bond_adjacency[atom2_id].push(atom1_id);
        Some(())
    }

    /// Removes the bond between two atoms.
    ///
    /// # Arguments
    ///
    /// * `atom1_id` - One endpoint.
    /// * `atom2_id` - The other endpoint.
    ///
    /// # Return
    ///
    /// Returns the removed `Bond`, or `None` if the atoms were not bonded.
    pub fn remove_bond(&mut self, atom1_id: AtomId, atom2_id: AtomId) -> Option<Bond> {
        let bond = self.bonds.remove(&Bond::new(atom1_id, atom2_id, BondOrder::Single).key())?;
        if let Some(adjacency) = self.bond_adjacency.get_mut(atom1_id) {
            adjacency.retain(|&id| id != atom2_id);
        }
        if let Some(adjacency) = self.bond_adjacency.get_mut(atom2_id) {
            adjacency.retain(|&id| id != atom1_id);
        }
        Some(bond)
    }

    /// Looks up the bond between two atoms, in either order.
    ///
    /// # Arguments
    ///
    /// * `atom1_id` - One endpoint.
    /// * `atom2_id` - The other endpoint.
    ///
    /// # Return
    ///
    /// Returns `Some(&Bond)` if the atoms are bonded, otherwise `None`.
    pub fn bond(&self, atom1_id: AtomId, atom2_id: AtomId) -> Option<&Bond> {
        self.bonds
            .get(&Bond::new(atom1_id, atom2_id, BondOrder::Single).key())
    }

    /// Removes an atom together with every bond that touches it.
    ///
    /// # Arguments
    ///
    /// * `atom_id` - The atom to remove.
    ///
    /// # Return
    ///
    /// Returns the removed `Atom`, or `None` if it did not exist.
    pub fn remove_atom(&mut self, atom_id: AtomId) -> Option<Atom> {
        let atom = self.atoms.remove(atom_id)?;

        let neighbors = self.bond_adjacency.remove(atom_id).unwrap_or_default();
        for neighbor_id in neighbors {
            self.bonds
                .remove(&Bond::new(atom_id, neighbor_id, BondOrder::Single).key());
            if let Some(adjacency) = self.bond_adjacency.get_mut(neighbor_id) {
                adjacency.retain(|&id| id != atom_id);
            }
        }

        Some(atom)
    }

    /// Returns the atoms directly bonded to an atom.
    ///
    /// # Arguments
    ///
    /// * `atom_id` - The atom whose neighbors to list.
    ///
    /// # Return
    ///
    /// Returns `Some(&[AtomId])` if the atom exists (possibly empty), otherwise
    /// `None`.
    pub fn bonded_neighbors(&self, atom_id: AtomId) -> Option<&[AtomId]> {
        self.bond_adjacency.get(atom_id).map(|v| v.as_slice())
    }

    /// Returns the number of bonds of an atom, or `0` if it does not exist.
    pub fn degree(&self, atom_id: AtomId) -> usize {
        self.bonded_neighbors(atom_id).map_or(0, <[AtomId]>::len)
    }

    /// Wraps a point into the canonical cell.
    ///
    /// # Arguments
    ///
    /// * `point` - A Cartesian position, possibly outside the cell.
    ///
    /// # Return
    ///
    /// The equivalent position with fractional coordinates in `[0, 1)`; the
    /// point itself for non-periodic structures.
    pub fn wrap(&self, point: &Point3<f64>) -> Point3<f64> {
        match &self.cell {
            Some(cell) => cell.wrap_cartesian(point),
            None => *point,
        }
    }

    /// Returns the periodic image of `point` nearest to `reference`.
    ///
    /// # Arguments
    ///
    /// * `point` - The position to move.
    /// * `reference` - The position the image should be close to.
    ///
    /// # Return
    ///
    /// The nearest image, which may lie outside the cell; `point` itself for
    /// non-periodic structures.
    pub fn unwrap_near(&self, point: &Point3<f64>, reference: &Point3<f64>) -> Point3<f64> {
        match &self.cell {
            Some(cell) => cell.unwrap_cartesian_near(point, reference),
            None => *point,
        }
    }

    /// Returns the distance between `a` and the nearest periodic image of `b`.
    ///
    /// For non-periodic structures this is the plain Euclidean distance.
    pub fn periodic_distance(&self, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
        (self.unwrap_near(b, a) - a).norm()
    }
}
