use super::error::{NetError, ensure_parent};
use crate::core::models::atom::Atom;
use crate::core::models::ids::{AtomId, StructureId};
use crate::core::models::system::Structure;
use crate::core::models::topology::BondOrder;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, warn};

/// Distance (Angstroms) under which a copied atom is considered to sit on an
/// atom of the parent structure.
pub const POSITION_MATCH_TOLERANCE: f64 = 1e-3;

/// Bonds leaving an atom subset, as `(internal, external)` pairs.
pub type ConnIntToExt = BTreeSet<(AtomId, AtomId)>;

/// A subset of the atoms of one parent `Structure`.
///
/// Membership is by handle, never by value, so positions and elements may
/// change underneath without affecting the set. A `VirtualMol` does not own
/// its atoms; dropping it has no effect on the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualMol {
    parent: StructureId,
    atoms: BTreeSet<AtomId>,
}

impl VirtualMol {
    /// An empty subset of the structure identified by `parent`.
    pub fn new(parent: StructureId) -> Self {
        Self {
            parent,
            atoms: BTreeSet::new(),
        }
    }

    /// An empty subset of `structure`.
    pub fn empty(structure: &Structure) -> Self {
        Self::new(structure.id())
    }

    /// A subset holding a single atom of `structure`.
    pub fn from_atom(structure: &Structure, atom: AtomId) -> Result<Self, NetError> {
        if !structure.contains_atom(atom) {
            return Err(NetError::AtomNotFound { atom });
        }
        let mut vmol = Self::empty(structure);
        vmol.atoms.insert(atom);
        Ok(vmol)
    }

    /// A subset holding every atom of `structure`.
    pub fn whole(structure: &Structure) -> Self {
        Self {
            parent: structure.id(),
            atoms: structure.atoms_iter().map(|(id, _)| id).collect(),
        }
    }

    pub fn from_atoms(parent: StructureId, atoms: impl IntoIterator<Item = AtomId>) -> Self {
        Self {
            parent,
            atoms: atoms.into_iter().collect(),
        }
    }

    pub fn parent(&self) -> StructureId {
        self.parent
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// The member set. Clone it to mutate the parent while iterating.
    pub fn atoms(&self) -> &BTreeSet<AtomId> {
        &self.atoms
    }

    pub fn iter(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.atoms.iter().copied()
    }

    pub fn has_atom(&self, atom: AtomId) -> bool {
        self.atoms.contains(&atom)
    }

    /// Returns `true` if the atom was not already a member.
    pub fn add_atom(&mut self, atom: AtomId) -> bool {
        self.atoms.insert(atom)
    }

    /// Returns `true` if the atom was a member.
    pub fn remove_atom(&mut self, atom: AtomId) -> bool {
        self.atoms.remove(&atom)
    }

    /// Merges `addition` into this subset and returns how many atoms were new.
    pub fn add_virtual_mol(&mut self, addition: &VirtualMol) -> Result<usize, NetError> {
        ensure_parent(self.parent, addition.parent)?;
        let before = self.atoms.len();
        self.atoms.extend(addition.atoms.iter().copied());
        Ok(self.atoms.len() - before)
    }

    fn ensure_structure(&self, structure: &Structure) -> Result<(), NetError> {
        ensure_parent(self.parent, structure.id())
    }

    /// Collects every bond that crosses the subset boundary.
    ///
    /// Bonds with both ends inside the subset are never reported.
    pub fn external_bonds_or_conns(&self, structure: &Structure) -> Result<ConnIntToExt, NetError> {
        self.ensure_structure(structure)?;
        let mut external = ConnIntToExt::new();
        for &atom in &self.atoms {
            let neighbors = structure
                .bonded_neighbors(atom)
                .ok_or(NetError::AtomNotFound { atom })?;
            external.extend(
                neighbors
                    .iter()
                    .filter(|&&n| !self.atoms.contains(&n))
                    .map(|&n| (atom, n)),
            );
        }
        Ok(external)
    }

    /// Copies the member atoms into a standalone structure sharing the
    /// parent's unit cell, for geometric work that must not touch the parent.
    ///
    /// With `export_bonds`, bonds between members are copied as well; with
    /// `copy_bonds` they keep their order, otherwise they become single bonds.
    pub fn to_structure(
        &self,
        structure: &Structure,
        export_bonds: bool,
        copy_bonds: bool,
    ) -> Result<Structure, NetError> {
        self.ensure_structure(structure)?;
        let mut copy = Structure::new();
        copy.set_cell(structure.cell().cloned());

        let mut id_map: BTreeMap<AtomId, AtomId> = BTreeMap::new();
        for &atom in &self.atoms {
            let original = structure
                .atom(atom)
                .ok_or(NetError::AtomNotFound { atom })?;
            id_map.insert(atom, copy.add_atom(original.clone()));
        }

        if export_bonds {
            for bond in structure.bonds_iter() {
                if let (Some(&a), Some(&b)) = (id_map.get(&bond.atom1_id), id_map.get(&bond.atom2_id)) {
                    let order = if copy_bonds { bond.order } else { BondOrder::Single };
                    copy.add_bond(a, b, order);
                }
            }
        }
        Ok(copy)
    }

    /// Splits the subset into its connected components, following only bonds
    /// whose both ends are members. Components are ordered by their lowest id.
    pub fn separate(&self, structure: &Structure) -> Result<Vec<VirtualMol>, NetError> {
        self.ensure_structure(structure)?;
        let mut unvisited = self.atoms.clone();
        let mut components = Vec::new();

        while let Some(seed) = unvisited.pop_first() {
            let mut component = VirtualMol::new(self.parent);
            component.add_atom(seed);
            let mut queue = VecDeque::from([seed]);

            while let Some(current) = queue.pop_front() {
                let neighbors = structure
                    .bonded_neighbors(current)
                    .ok_or(NetError::AtomNotFound { atom: current })?;
                for &n in neighbors {
                    if unvisited.remove(&n) {
                        component.add_atom(n);
                        queue.push_back(n);
                    }
                }
            }
            components.push(component);
        }

        debug!(
            atoms = self.atoms.len(),
            components = components.len(),
            "Separated atom subset into connected components."
        );
        Ok(components)
    }

    /// Absorbs the parent atoms that sit where the atoms of an out-of-band
    /// copy (`fragment`) sit, matched by element and periodic distance.
    ///
    /// Returns the number of atoms newly added to the subset. Fragment atoms
    /// without a counterpart in the parent are skipped.
    pub fn import_copied_fragment(
        &mut self,
        structure: &Structure,
        fragment: &Structure,
    ) -> Result<usize, NetError> {
        self.ensure_structure(structure)?;
        let mut added = 0;
        for (_, copied) in fragment.atoms_iter() {
            match find_matching_atom(structure, copied) {
                Some(id) => {
                    if self.add_atom(id) {
                        added += 1;
                    }
                }
                None => warn!(
                    element = copied.element,
                    position = ?copied.position,
                    "Copied atom has no counterpart in the parent structure; skipping."
                ),
            }
        }
        Ok(added)
    }
}

fn find_matching_atom(structure: &Structure, copied: &Atom) -> Option<AtomId> {
    structure
        .atoms_iter()
        .find(|(_, atom)| {
            atom.element == copied.element
                && structure.periodic_distance(&atom.position, &copied.position) < POSITION_MATCH_TOLERANCE
        })
        .map(|(id, _)| id)
}
