use super::ids::AtomId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

/// An undirected bond. Endpoints are stored in ascending id order so that
/// the same pair always produces the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub atom1_id: AtomId, // lower id of the pair
    pub atom2_id: AtomId, // higher id of the pair
    pub order: BondOrder,
}

impl Bond {
    pub fn new(a: AtomId, b: AtomId, order: BondOrder) -> Self {
        let (atom1_id, atom2_id) = if a <= b { (a, b) } else { (b, a) };
        Self {
            atom1_id,
            atom2_id,
            order,
        }
    }

    pub fn key(&self) -> (AtomId, AtomId) {
        (self.atom1_id, self.atom2_id)
    }

    pub fn contains(&self, atom_id: AtomId) -> bool {
        self.atom1_id == atom_id || self.atom2_id == atom_id
    }

    /// Returns the endpoint opposite to `atom_id`, if `atom_id` is on this bond.
    pub fn partner(&self, atom_id: AtomId) -> Option<AtomId> {
        if self.atom1_id == atom_id {
            Some(self.atom2_id)
        } else if self.atom2_id == atom_id {
            Some(self.atom1_id)
        } else {
            None
        }
    }
}
