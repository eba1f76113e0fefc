use super::config::SimplifyConfig;
use super::connection::ConnectionTable;
use super::error::{NetError, ensure_parent};
use super::roles::AtomRoles;
use super::virtual_mol::{ConnIntToExt, VirtualMol};
use crate::core::models::atom::Atom;
use crate::core::models::ids::AtomId;
use crate::core::models::system::Structure;
use crate::core::models::topology::BondOrder;
use crate::core::utils::geometry;
use nalgebra::Point3;
use slotmap::SecondaryMap;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, info, instrument, trace};

/// A connection crossing the boundary of a set of pseudo-atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BoundaryConnection {
    /// Pseudo-atom inside the set.
    pub internal: AtomId,
    /// The connection pseudo-atom that leaves the set.
    pub connection: AtomId,
    /// Pseudo-atom on the far side of the connection.
    pub external: AtomId,
}

/// The simplification engine.
///
/// Owns the original structure, the simplified net derived from it and the
/// bookkeeping that ties the two together:
///
/// - every live original atom maps to exactly one pseudo-atom, and each
///   pseudo-atom knows the group of original atoms it stands for;
/// - every bond of the net runs between a pseudo-atom and a connection
///   pseudo-atom registered in the [`ConnectionTable`];
/// - roles are attached to original atoms and follow them through collapses.
///
/// Operations validate their inputs before mutating anything. There is no
/// rollback: if a caller bypasses validation (or an internal invariant was
/// already broken) and an operation fails half way, rebuild the topology.
#[derive(Debug)]
pub struct Topology {
    original: Structure,
    simplified: Structure,
    conns: ConnectionTable,
    orig_to_pseudo: SecondaryMap<AtomId, AtomId>,
    pseudo_to_orig: BTreeMap<AtomId, VirtualMol>,
    roles: BTreeMap<AtomId, AtomRoles>,
    deleted: VirtualMol,
    config: SimplifyConfig,
}

impl Topology {
    pub fn new(original: Structure) -> Result<Self, NetError> {
        Self::with_config(original, SimplifyConfig::default())
    }

    /// Builds the initial net: one pseudo-atom per original atom (same
    /// position) and one connection per original bond.
    #[instrument(skip_all, fields(atoms = original.num_atoms(), bonds = original.num_bonds()))]
    pub fn with_config(original: Structure, config: SimplifyConfig) -> Result<Self, NetError> {
        let mut simplified = Structure::new();
        simplified.set_cell(original.cell().cloned());

        let mut topology = Self {
            conns: ConnectionTable::new(simplified.id()),
            deleted: VirtualMol::empty(&original),
            orig_to_pseudo: SecondaryMap::new(),
            pseudo_to_orig: BTreeMap::new(),
            roles: BTreeMap::new(),
            simplified,
            original,
            config,
        };

        let orig_id = topology.original.id();
        let orig_atoms: Vec<(AtomId, Point3<f64>)> = topology
            .original
            .atoms_iter()
            .map(|(id, atom)| (id, atom.position))
            .collect();
        for (orig, position) in orig_atoms {
            let pa = topology
                .simplified
                .add_atom(Atom::new(topology.config.pseudo_atom_element, position));
            topology.orig_to_pseudo.insert(orig, pa);
            topology
                .pseudo_to_orig
                .insert(pa, VirtualMol::from_atoms(orig_id, [orig]));
        }

        let bonds: Vec<(AtomId, AtomId)> = topology
            .original
            .bonds_iter()
            .map(|bond| (bond.atom1_id, bond.atom2_id))
            .collect();
        for (a, b) in bonds {
            let begin = topology.pseudo_atom_of(a).ok_or(NetError::AtomNotFound { atom: a })?;
            let end = topology.pseudo_atom_of(b).ok_or(NetError::AtomNotFound { atom: b })?;
            topology.connect_atoms(begin, end, None)?;
        }

        info!(
            pseudo_atoms = topology.num_pseudo_atoms(),
            connections = topology.num_connections(),
            "Initialized simplified net from the original structure."
        );
        Ok(topology)
    }

    pub fn original(&self) -> &Structure {
        &self.original
    }

    /// The simplified net. Mutate it only through `Topology`.
    pub fn simplified(&self) -> &Structure {
        &self.simplified
    }

    pub fn connection_table(&self) -> &ConnectionTable {
        &self.conns
    }

    pub fn config(&self) -> &SimplifyConfig {
        &self.config
    }

    pub fn is_connection(&self, atom: AtomId) -> bool {
        self.conns.is_connection(atom)
    }

    /// Number of connections touching a pseudo-atom.
    pub fn valence(&self, pseudo_atom: AtomId) -> usize {
        self.conns.valence(pseudo_atom)
    }

    pub fn num_connections(&self) -> usize {
        self.conns.num_connections()
    }

    /// Number of pseudo-atoms that are not connections.
    pub fn num_pseudo_atoms(&self) -> usize {
        self.simplified.num_atoms() - self.conns.num_connections()
    }

    pub fn pseudo_atoms(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.simplified
            .atoms_iter()
            .map(|(id, _)| id)
            .filter(|&id| self.conns.is_plain_atom(id))
    }

    /// The pseudo-atom currently standing for an original atom.
    pub fn pseudo_atom_of(&self, orig: AtomId) -> Option<AtomId> {
        self.orig_to_pseudo.get(orig).copied()
    }

    /// The original atoms merged into a pseudo-atom.
    pub fn orig_atoms_of(&self, pseudo_atom: AtomId) -> Option<&VirtualMol> {
        self.pseudo_to_orig.get(&pseudo_atom)
    }

    pub fn deleted_orig_atoms(&self) -> &VirtualMol {
        &self.deleted
    }

    /// Translates original atoms into the (deduplicated) pseudo-atoms that
    /// currently represent them.
    pub fn to_pseudo_atoms(&self, orig_atoms: &VirtualMol) -> Result<VirtualMol, NetError> {
        ensure_parent(self.original.id(), orig_atoms.parent())?;
        let mut pseudo = VirtualMol::empty(&self.simplified);
        for orig in orig_atoms.iter() {
            pseudo.add_atom(self.live_pseudo_atom(orig)?);
        }
        Ok(pseudo)
    }

    fn live_pseudo_atom(&self, orig: AtomId) -> Result<AtomId, NetError> {
        if self.deleted.has_atom(orig) {
            return Err(NetError::DeletedAtom { atom: orig });
        }
        self.pseudo_atom_of(orig)
            .ok_or(NetError::AtomNotFound { atom: orig })
    }

    fn ensure_original_atoms(&self, atoms: &VirtualMol) -> Result<(), NetError> {
        ensure_parent(self.original.id(), atoms.parent())?;
        match atoms.iter().find(|&a| !self.original.contains_atom(a)) {
            Some(atom) => Err(NetError::AtomNotFound { atom }),
            None => Ok(()),
        }
    }

    /// Fails unless `atom` is a live, non-connection pseudo-atom whose
    /// neighbors are all connections.
    fn ensure_only_connections(&self, atom: AtomId) -> Result<(), NetError> {
        if self.conns.is_connection(atom) {
            return Err(NetError::UnexpectedConnection { atom });
        }
        let neighbors = self
            .simplified
            .bonded_neighbors(atom)
            .ok_or(NetError::AtomNotFound { atom })?;
        match neighbors.iter().find(|&&n| self.conns.is_plain_atom(n)) {
            Some(&neighbor) => Err(NetError::DirectBond { atom, neighbor }),
            None => Ok(()),
        }
    }

    /// Creates a connection pseudo-atom bonded to `begin` and `end`.
    ///
    /// Without an explicit position the connection sits at the periodic
    /// midpoint of the two endpoints. Connecting an already connected pair
    /// is allowed and adds a parallel connection.
    pub fn connect_atoms(
        &mut self,
        begin: AtomId,
        end: AtomId,
        position: Option<Point3<f64>>,
    ) -> Result<AtomId, NetError> {
        if begin == end {
            return Err(NetError::SelfLoop { atom: begin });
        }
        let mut endpoint_positions = [Point3::origin(); 2];
        for (slot, atom) in endpoint_positions.iter_mut().zip([begin, end]) {
            if self.conns.is_connection(atom) {
                return Err(NetError::UnexpectedConnection { atom });
            }
            *slot = self
                .simplified
                .position(atom)
                .ok_or(NetError::AtomNotFound { atom })?;
        }

        let conn_pos = position.unwrap_or_else(|| {
            let [begin_pos, end_pos] = endpoint_positions;
            let end_pos = self.simplified.unwrap_near(&end_pos, &begin_pos);
            self.simplified.wrap(&geometry::midpoint(&begin_pos, &end_pos))
        });

        let conn = self
            .simplified
            .add_atom(Atom::new(self.config.connection_element, conn_pos));
        self.simplified.add_bond(begin, conn, BondOrder::Single);
        self.simplified.add_bond(end, conn, BondOrder::Single);
        self.conns.add_conn(conn, begin, end)?;
        trace!(?conn, ?begin, ?end, "Formed connection.");
        Ok(conn)
    }

    /// Removes a connection pseudo-atom (and with it, its two bonds).
    pub fn delete_connection(&mut self, conn: AtomId) -> Result<(), NetError> {
        self.conns
            .remove_conn(conn)
            .ok_or(NetError::NotAConnection { atom: conn })?;
        self.simplified.remove_atom(conn);
        Ok(())
    }

    /// Removes a pseudo-atom together with all of its connections.
    ///
    /// Every neighbor must be a connection; a direct bond to another
    /// pseudo-atom aborts the operation before anything is deleted. Original
    /// atoms still represented by this pseudo-atom are marked as deleted.
    pub fn delete_atom_and_conns(&mut self, atom: AtomId) -> Result<(), NetError> {
        self.ensure_only_connections(atom)?;
        self.remove_pseudo_atom(atom);

        if let Some(group) = self.pseudo_to_orig.remove(&atom) {
            for orig in group.iter() {
                self.orig_to_pseudo.remove(orig);
                self.roles.remove(&orig);
                self.deleted.add_atom(orig);
            }
        }
        Ok(())
    }

    /// Graph-side removal of an already validated pseudo-atom.
    fn remove_pseudo_atom(&mut self, atom: AtomId) {
        let conns: Vec<AtomId> = self.conns.atom_conns(atom).collect();
        for conn in conns {
            self.conns.remove_conn(conn);
            self.simplified.remove_atom(conn);
        }
        self.simplified.remove_atom(atom);
    }

    /// Every connection crossing the boundary of `internal`, resolved to the
    /// pseudo-atom on the other side. Parallel connections are kept apart.
    pub fn boundary_connections(&self, internal: &VirtualMol) -> Result<Vec<BoundaryConnection>, NetError> {
        ensure_parent(self.simplified.id(), internal.parent())?;
        if let Some(atom) = internal.iter().find(|&a| self.conns.is_connection(a)) {
            return Err(NetError::UnexpectedConnection { atom });
        }

        // With the internal connections included, only boundary-crossing
        // bonds remain external.
        let mut with_conns = internal.clone();
        with_conns.add_virtual_mol(&self.conns.internal_conns(internal)?)?;
        let crossing = with_conns.external_bonds_or_conns(&self.simplified)?;

        crossing
            .into_iter()
            .map(|(inner, conn)| {
                if self.conns.is_plain_atom(conn) {
                    return Err(NetError::DirectBond {
                        atom: inner,
                        neighbor: conn,
                    });
                }
                let external = self.conns.other_endpoint(conn, inner).ok_or_else(|| {
                    NetError::Inconsistent(format!(
                        "connection {conn:?} is bonded to {inner:?} but does not end there"
                    ))
                })?;
                Ok(BoundaryConnection {
                    internal: inner,
                    connection: conn,
                    external,
                })
            })
            .collect()
    }

    /// The next shell of pseudo-atoms around `internal`, skipping over the
    /// connection layer, as `(internal, external)` pairs.
    pub fn connected_atoms(&self, internal: &VirtualMol) -> Result<ConnIntToExt, NetError> {
        Ok(self
            .boundary_connections(internal)?
            .into_iter()
            .map(|b| (b.internal, b.external))
            .collect())
    }

    /// Positions of the pseudo-atoms in `atoms`, unwrapped into one
    /// contiguous image.
    ///
    /// Each member is unwrapped next to the member it was reached from over
    /// an internal connection, so fragments spanning more than half the cell
    /// stay in one piece. Members not reachable that way start a new
    /// traversal, unwrapped near the first member placed.
    fn unwrap_fragment(&self, atoms: &VirtualMol) -> Result<BTreeMap<AtomId, Point3<f64>>, NetError> {
        let mut unwrapped: BTreeMap<AtomId, Point3<f64>> = BTreeMap::new();
        let mut anchor: Option<Point3<f64>> = None;

        for seed in atoms.iter() {
            if unwrapped.contains_key(&seed) {
                continue;
            }
            let pos = self.pseudo_atom_position(seed)?;
            let seed_pos = match anchor {
                Some(reference) => self.simplified.unwrap_near(&pos, &reference),
                None => pos,
            };
            anchor.get_or_insert(seed_pos);
            unwrapped.insert(seed, seed_pos);

            let mut queue = VecDeque::from([seed]);
            while let Some(current) = queue.pop_front() {
                let Some(&here) = unwrapped.get(&current) else {
                    continue;
                };
                for conn in self.conns.atom_conns(current) {
                    let Some(next) = self.conns.other_endpoint(conn, current) else {
                        continue;
                    };
                    if !atoms.has_atom(next) || unwrapped.contains_key(&next) {
                        continue;
                    }
                    let pos = self.pseudo_atom_position(next)?;
                    unwrapped.insert(next, self.simplified.unwrap_near(&pos, &here));
                    queue.push_back(next);
                }
            }
        }
        Ok(unwrapped)
    }

    fn pseudo_atom_position(&self, atom: AtomId) -> Result<Point3<f64>, NetError> {
        self.simplified
            .position(atom)
            .ok_or(NetError::AtomNotFound { atom })
    }

    /// Collapses a fragment of original atoms into a single new pseudo-atom
    /// at the fragment centroid, reconnected to every external neighbor.
    ///
    /// Each connection that left the fragment is replaced by a new one whose
    /// site is a weighted average (see [`super::config::ConnectionWeights`])
    /// of the centroid, the internal atom and the external atom. Parallel
    /// connections to one neighbor get distinct sites when they left from
    /// different internal atoms; parallel connections between the same
    /// internal/external pair share a site.
    #[instrument(skip_all, fields(fragment_size = fragment.num_atoms()))]
    pub fn collapse_orig_atoms(&mut self, fragment: &VirtualMol) -> Result<AtomId, NetError> {
        ensure_parent(self.original.id(), fragment.parent())?;
        if fragment.is_empty() {
            return Err(NetError::EmptyFragment);
        }

        let orig_pa = self.to_pseudo_atoms(fragment)?;
        for pa in orig_pa.iter() {
            self.ensure_only_connections(pa)?;
        }
        let boundary = self.boundary_connections(&orig_pa)?;
        let unwrapped = self.unwrap_fragment(&orig_pa)?;
        let positions: Vec<Point3<f64>> = unwrapped.values().copied().collect();
        let raw_centroid = geometry::centroid(&positions).ok_or(NetError::EmptyFragment)?;
        let centroid = self.simplified.wrap(&raw_centroid);
        // Translation taking the unwrapped image onto the wrapped centroid.
        let shift = centroid - raw_centroid;

        let mut conn_sites = Vec::with_capacity(boundary.len());
        let weights = self.config.connection_weights;
        for b in &boundary {
            let int_loc = unwrapped
                .get(&b.internal)
                .map(|p| *p + shift)
                .ok_or(NetError::AtomNotFound { atom: b.internal })?;
            let ext_pos = self.pseudo_atom_position(b.external)?;
            let ext_loc = self.simplified.unwrap_near(&ext_pos, &int_loc);
            let site = geometry::weighted_average(&[
                (centroid, weights.centroid()),
                (int_loc, weights.internal()),
                (ext_loc, weights.external()),
            ])
            .ok_or_else(|| NetError::Inconsistent("connection weights sum to zero".to_string()))?;
            conn_sites.push((b.external, self.simplified.wrap(&site)));
        }

        // Validated: from here on nothing is expected to fail.
        let new_atom = self
            .simplified
            .add_atom(Atom::new(self.config.pseudo_atom_element, centroid));
        for (external, site) in conn_sites {
            self.connect_atoms(new_atom, external, Some(site))?;
        }

        let mut merged = VirtualMol::empty(&self.original);
        for pa in orig_pa.iter() {
            if let Some(group) = self.pseudo_to_orig.remove(&pa) {
                merged.add_virtual_mol(&group)?;
            }
            self.remove_pseudo_atom(pa);
        }
        for orig in merged.iter() {
            self.orig_to_pseudo.insert(orig, new_atom);
        }

        info!(
            original_atoms = merged.num_atoms(),
            replaced_pseudo_atoms = orig_pa.num_atoms(),
            connections = boundary.len(),
            "Collapsed fragment into a single pseudo-atom."
        );
        self.pseudo_to_orig.insert(new_atom, merged);
        Ok(new_atom)
    }

    /// Adds (`present = true`) or removes a role on a set of original atoms.
    /// Returns how many atoms actually changed.
    pub fn set_role_to_atoms(&mut self, role: &str, atoms: &VirtualMol, present: bool) -> Result<usize, NetError> {
        self.ensure_original_atoms(atoms)?;
        if let Some(atom) = atoms.iter().find(|&a| self.deleted.has_atom(a)) {
            return Err(NetError::DeletedAtom { atom });
        }

        let mut changed = 0;
        for atom in atoms.iter() {
            if present {
                if self.roles.entry(atom).or_default().add_role(role) {
                    changed += 1;
                }
            } else if let Some(roles) = self.roles.get_mut(&atom) {
                if roles.remove_role(role) {
                    changed += 1;
                }
                if roles.is_empty() {
                    self.roles.remove(&atom);
                }
            }
        }
        debug!(role, present, changed, "Updated atom roles.");
        Ok(changed)
    }

    /// All live original atoms carrying `role`.
    pub fn orig_atoms_of_role(&self, role: &str) -> VirtualMol {
        VirtualMol::from_atoms(
            self.original.id(),
            self.roles
                .iter()
                .filter(|(_, roles)| roles.has_role(role))
                .map(|(&atom, _)| atom),
        )
    }

    pub fn roles_of(&self, orig: AtomId) -> Option<&AtomRoles> {
        self.roles.get(&orig)
    }

    /// Union of the roles of the original atoms merged into a pseudo-atom.
    pub fn roles_of_pseudo_atom(&self, pseudo_atom: AtomId) -> AtomRoles {
        let mut merged = AtomRoles::new();
        let Some(group) = self.pseudo_to_orig.get(&pseudo_atom) else {
            return merged;
        };
        for role in group
            .iter()
            .filter_map(|orig| self.roles.get(&orig))
            .flat_map(AtomRoles::iter)
        {
            merged.add_role(role);
        }
        merged
    }

    /// Removes original atoms (e.g. solvent) from the topology.
    ///
    /// Each atom leaves the group of its pseudo-atom; a pseudo-atom whose
    /// group becomes empty is deleted together with its connections. Atoms
    /// already removed are ignored. Returns the number of newly removed atoms.
    #[instrument(skip_all, fields(requested = atoms.num_atoms()))]
    pub fn remove_orig_atoms(&mut self, atoms: &VirtualMol) -> Result<usize, NetError> {
        self.ensure_original_atoms(atoms)?;

        let to_remove: Vec<AtomId> = atoms.iter().filter(|&a| !self.deleted.has_atom(a)).collect();
        let mut leaving: BTreeMap<AtomId, usize> = BTreeMap::new();
        for &orig in &to_remove {
            let pa = self.live_pseudo_atom(orig)?;
            *leaving.entry(pa).or_default() += 1;
        }
        let emptied: BTreeSet<AtomId> = leaving
            .into_iter()
            .filter(|(pa, count)| self.pseudo_to_orig.get(pa).map_or(0, VirtualMol::num_atoms) == *count)
            .map(|(pa, _)| pa)
            .collect();
        for &pa in &emptied {
            self.ensure_only_connections(pa)?;
        }

        for &orig in &to_remove {
            self.deleted.add_atom(orig);
            self.roles.remove(&orig);
            if let Some(pa) = self.orig_to_pseudo.remove(orig) {
                if let Some(group) = self.pseudo_to_orig.get_mut(&pa) {
                    group.remove_atom(orig);
                }
            }
        }
        for &pa in &emptied {
            self.pseudo_to_orig.remove(&pa);
            self.remove_pseudo_atom(pa);
        }

        info!(
            removed = to_remove.len(),
            pseudo_atoms_deleted = emptied.len(),
            "Removed original atoms from the topology."
        );
        Ok(to_remove.len())
    }

    /// Checks every invariant tying the net to the original structure.
    pub fn validate(&self) -> Result<(), NetError> {
        self.conns.check_consistency(&self.simplified)?;

        for pa in self.pseudo_atoms() {
            self.ensure_only_connections(pa)?;
            let group = self.pseudo_to_orig.get(&pa).ok_or_else(|| {
                NetError::Inconsistent(format!("pseudo-atom {pa:?} represents no original atoms"))
            })?;
            if group.is_empty() {
                return Err(NetError::Inconsistent(format!(
                    "pseudo-atom {pa:?} has an empty group"
                )));
            }
            if let Some(orig) = group.iter().find(|&o| self.pseudo_atom_of(o) != Some(pa)) {
                return Err(NetError::Inconsistent(format!(
                    "original atom {orig:?} is grouped under {pa:?} but maps elsewhere"
                )));
            }
        }

        for (orig, _) in self.original.atoms_iter() {
            match (self.deleted.has_atom(orig), self.pseudo_atom_of(orig)) {
                (true, Some(pa)) => {
                    return Err(NetError::Inconsistent(format!(
                        "deleted original atom {orig:?} still maps to {pa:?}"
                    )));
                }
                (false, None) => {
                    return Err(NetError::Inconsistent(format!(
                        "original atom {orig:?} has no pseudo-atom"
                    )));
                }
                (false, Some(pa)) if !self.pseudo_to_orig.contains_key(&pa) => {
                    return Err(NetError::Inconsistent(format!(
                        "original atom {orig:?} maps to {pa:?}, which is not a live pseudo-atom"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// A standalone copy of the net for output. Pseudo-atoms are recolored
    /// by the first configured role their group carries.
    pub fn to_structure(&self) -> Structure {
        let mut exported = self.simplified.clone();
        for (&pa, group) in &self.pseudo_to_orig {
            let element = self.config.element_for_roles(|role| {
                group
                    .iter()
                    .any(|orig| self.roles.get(&orig).is_some_and(|r| r.has_role(role)))
            });
            if let (Some(element), Some(atom)) = (element, exported.atom_mut(pa)) {
                atom.element = element;
            }
        }
        exported
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::lattice::UnitCell;

    const TOL: f64 = 1e-9;

    /// A-B-C-D chain along x.
    struct Chain {
        topology: Topology,
        a: AtomId,
        b: AtomId,
        c: AtomId,
        d: AtomId,
    }

    fn chain_with(xs: [f64; 4], cell: Option<UnitCell>) -> Chain {
        let mut original = Structure::new();
        original.set_cell(cell);
        let ids: Vec<AtomId> = xs
            .iter()
            .map(|&x| original.add_atom(Atom::new(6, Point3::new(x, 1.0, 1.0))))
            .collect();
        for pair in ids.windows(2) {
            original.add_bond(pair[0], pair[1], BondOrder::Single).unwrap();
        }
        Chain {
            topology: Topology::new(original).unwrap(),
            a: ids[0],
            b: ids[1],
            c: ids[2],
            d: ids[3],
        }
    }

    fn chain() -> Chain {
        chain_with([0.0, 1.5, 3.0, 4.5], None)
    }

    fn orig(t: &Topology, atoms: &[AtomId]) -> VirtualMol {
        VirtualMol::from_atoms(t.original().id(), atoms.iter().copied())
    }

    fn pa(t: &Topology, orig: AtomId) -> AtomId {
        t.pseudo_atom_of(orig).unwrap()
    }

    fn pos(t: &Topology, atom: AtomId) -> Point3<f64> {
        t.simplified().position(atom).unwrap()
    }

    fn assert_close(t: &Topology, actual: Point3<f64>, expected: Point3<f64>) {
        let d = t.simplified().periodic_distance(&actual, &expected);
        assert!(d < TOL, "expected {expected:?}, got {actual:?} (off by {d})");
    }

    mod construction {
        use super::*;

        #[test]
        fn chain_becomes_pseudo_atoms_joined_by_connections() {
            let ch = chain();
            let t = &ch.topology;

            assert_eq!(t.num_connections(), 3);
            assert_eq!(t.num_pseudo_atoms(), 4);
            assert_eq!(t.simplified().num_atoms(), 7);
            assert_eq!(t.simplified().num_bonds(), 6);

            for (orig, valence) in [(ch.a, 1), (ch.b, 2), (ch.c, 2), (ch.d, 1)] {
                let p = pa(t, orig);
                assert_eq!(t.valence(p), valence);
                assert_eq!(t.simplified().degree(p), valence);
                assert_eq!(t.orig_atoms_of(p).unwrap().atoms().iter().copied().collect::<Vec<_>>(), vec![orig]);
                assert_eq!(t.simplified().atom(p).unwrap().element, t.config().pseudo_atom_element);
            }
            assert!(t.connection_table().has_neighbor(pa(t, ch.a), pa(t, ch.b)));
            assert!(!t.connection_table().has_neighbor(pa(t, ch.a), pa(t, ch.c)));
            assert_eq!(t.validate(), Ok(()));
        }

        #[test]
        fn pseudo_atoms_copy_original_positions() {
            let ch = chain();
            let t = &ch.topology;
            assert_close(t, pos(t, pa(t, ch.c)), Point3::new(3.0, 1.0, 1.0));
        }

        #[test]
        fn connections_sit_at_the_periodic_midpoint() {
            let cell = UnitCell::cubic(10.0).unwrap();
            let ch = chain_with([7.6, 9.0, 0.6, 2.0], Some(cell));
            let t = &ch.topology;
            assert_eq!(t.simplified().cell(), t.original().cell());

            let (pb, pc) = (pa(t, ch.b), pa(t, ch.c));
            let conn = t.connection_table().atom_conns(pb).find(|&c| {
                t.connection_table().other_endpoint(c, pb) == Some(pc)
            });
            let conn = conn.unwrap();
            assert_close(t, pos(t, conn), Point3::new(9.8, 1.0, 1.0));
            assert_eq!(t.simplified().atom(conn).unwrap().element, t.config().connection_element);
            assert_eq!(t.validate(), Ok(()));
        }
    }

    mod connections {
        use super::*;

        #[test]
        fn connect_atoms_allows_parallel_connections() {
            let mut ch = chain();
            let (pa_a, pa_b) = (pa(&ch.topology, ch.a), pa(&ch.topology, ch.b));

            let site = Point3::new(0.5, 2.0, 1.0);
            let conn = ch.topology.connect_atoms(pa_a, pa_b, Some(site)).unwrap();

            let t = &ch.topology;
            assert_eq!(t.valence(pa_a), 2);
            assert_eq!(t.num_connections(), 4);
            assert_eq!(pos(t, conn), site);
            assert_eq!(t.validate(), Ok(()));
        }

        #[test]
        fn self_loop_request_creates_nothing() {
            let mut ch = chain();
            let p = pa(&ch.topology, ch.a);
            let atoms_before = ch.topology.simplified().num_atoms();

            let result = ch.topology.connect_atoms(p, p, None);

            assert_eq!(result, Err(NetError::SelfLoop { atom: p }));
            assert_eq!(ch.topology.valence(p), 1);
            assert_eq!(ch.topology.simplified().num_atoms(), atoms_before);
        }

        #[test]
        fn connections_cannot_be_endpoints() {
            let mut ch = chain();
            let p = pa(&ch.topology, ch.a);
            let conn = ch.topology.connection_table().atom_conns(p).next().unwrap();
            assert_eq!(
                ch.topology.connect_atoms(p, conn, None),
                Err(NetError::UnexpectedConnection { atom: conn })
            );
        }

        #[test]
        fn delete_connection_detaches_both_endpoints() {
            let mut ch = chain();
            let (pb, pc) = (pa(&ch.topology, ch.b), pa(&ch.topology, ch.c));
            let conn = ch
                .topology
                .connection_table()
                .atom_conns(pb)
                .find(|&c| ch.topology.connection_table().other_endpoint(c, pb) == Some(pc))
                .unwrap();

            ch.topology.delete_connection(conn).unwrap();

            let t = &ch.topology;
            assert!(t.simplified().atom(conn).is_none());
            assert_eq!(t.valence(pb), 1);
            assert_eq!(t.valence(pc), 1);
            assert!(!t.connection_table().has_neighbor(pb, pc));
            assert_eq!(t.validate(), Ok(()));
        }

        #[test]
        fn delete_connection_rejects_plain_atoms() {
            let mut ch = chain();
            let p = pa(&ch.topology, ch.a);
            assert_eq!(
                ch.topology.delete_connection(p),
                Err(NetError::NotAConnection { atom: p })
            );
            assert!(ch.topology.simplified().contains_atom(p));
        }

        #[test]
        fn delete_atom_and_conns_removes_the_atom_and_marks_its_originals() {
            let mut ch = chain();
            let (pa_b, pa_c) = (pa(&ch.topology, ch.b), pa(&ch.topology, ch.c));

            ch.topology.delete_atom_and_conns(pa_b).unwrap();

            let t = &ch.topology;
            assert!(t.simplified().atom(pa_b).is_none());
            assert_eq!(t.num_connections(), 1);
            assert_eq!(t.valence(pa(t, ch.a)), 0);
            assert_eq!(t.valence(pa_c), 1);
            assert!(t.deleted_orig_atoms().has_atom(ch.b));
            assert!(t.pseudo_atom_of(ch.b).is_none());
            assert_eq!(t.validate(), Ok(()));
        }

        #[test]
        fn delete_atom_and_conns_aborts_on_direct_bonds() {
            let mut ch = chain();
            let (pa_a, pa_d) = (pa(&ch.topology, ch.a), pa(&ch.topology, ch.d));
            ch.topology.simplified.add_bond(pa_a, pa_d, BondOrder::Single).unwrap();
            let atoms_before = ch.topology.simplified().num_atoms();

            let result = ch.topology.delete_atom_and_conns(pa_a);

            assert_eq!(result, Err(NetError::DirectBond { atom: pa_a, neighbor: pa_d }));
            assert_eq!(ch.topology.simplified().num_atoms(), atoms_before);
            assert_eq!(ch.topology.valence(pa_a), 1);
            assert!(matches!(ch.topology.validate(), Err(NetError::DirectBond { .. })));
        }
    }

    mod neighbors {
        use super::*;

        #[test]
        fn connected_atoms_skip_over_connections() {
            let ch = chain();
            let t = &ch.topology;
            let inner = VirtualMol::from_atoms(t.simplified().id(), [pa(t, ch.b)]);

            let shell = t.connected_atoms(&inner).unwrap();

            let expected: ConnIntToExt = [(pa(t, ch.b), pa(t, ch.a)), (pa(t, ch.b), pa(t, ch.c))]
                .into_iter()
                .collect();
            assert_eq!(shell, expected);
            assert!(shell.iter().all(|&(i, e)| !t.is_connection(i) && !t.is_connection(e)));
        }

        #[test]
        fn connected_atoms_ignore_internal_connections() {
            let ch = chain();
            let t = &ch.topology;
            let inner = VirtualMol::from_atoms(t.simplified().id(), [pa(t, ch.b), pa(t, ch.c)]);

            let boundary = t.boundary_connections(&inner).unwrap();

            assert_eq!(boundary.len(), 2);
            let externals: BTreeSet<AtomId> = boundary.iter().map(|b| b.external).collect();
            assert_eq!(externals, [pa(t, ch.a), pa(t, ch.d)].into_iter().collect());
            assert!(boundary.iter().all(|b| t.is_connection(b.connection)));
        }

        #[test]
        fn connected_atoms_reject_subsets_of_other_structures() {
            let ch = chain();
            let t = &ch.topology;
            let foreign = orig(t, &[ch.b]);
            assert!(matches!(
                t.connected_atoms(&foreign),
                Err(NetError::ParentMismatch { .. })
            ));
        }
    }

    mod collapse {
        use super::*;

        #[test]
        fn collapsing_the_chain_middle_keeps_both_neighbors() {
            let mut ch = chain();
            let (old_b, old_c) = (pa(&ch.topology, ch.b), pa(&ch.topology, ch.c));
            let fragment = orig(&ch.topology, &[ch.b, ch.c]);

            let merged = ch.topology.collapse_orig_atoms(&fragment).unwrap();

            let t = &ch.topology;
            assert_eq!(t.valence(merged), 2);
            assert!(t.connection_table().has_neighbor(merged, pa(t, ch.a)));
            assert!(t.connection_table().has_neighbor(merged, pa(t, ch.d)));
            assert!(t.simplified().atom(old_b).is_none());
            assert!(t.simplified().atom(old_c).is_none());
            assert_eq!(t.num_pseudo_atoms(), 3);
            assert_eq!(t.num_connections(), 2);
            assert_eq!(t.simplified().num_atoms(), 5);
            assert_eq!(pa(t, ch.b), merged);
            assert_eq!(pa(t, ch.c), merged);
            assert_eq!(t.orig_atoms_of(merged).unwrap().num_atoms(), 2);
            assert_eq!(t.validate(), Ok(()));
        }

        #[test]
        fn collapsed_atom_and_connections_are_placed_by_weighted_average() {
            let mut ch = chain();
            let fragment = orig(&ch.topology, &[ch.b, ch.c]);
            let merged = ch.topology.collapse_orig_atoms(&fragment).unwrap();

            let t = &ch.topology;
            assert_close(t, pos(t, merged), Point3::new(2.25, 1.0, 1.0));
            let sites: Vec<Point3<f64>> = t
                .connection_table()
                .atom_conns(merged)
                .map(|c| pos(t, c))
                .collect();
            // (4 * 2.25 + 1.5 + 0.0) / 6 and (4 * 2.25 + 3.0 + 4.5) / 6
            assert!(sites.iter().any(|&s| (s - Point3::new(1.75, 1.0, 1.0)).norm() < TOL));
            assert!(sites.iter().any(|&s| (s - Point3::new(2.75, 1.0, 1.0)).norm() < TOL));
        }

        #[test]
        fn collapse_across_the_cell_boundary_unwraps_positions() {
            let cell = UnitCell::cubic(10.0).unwrap();
            let mut ch = chain_with([7.6, 9.0, 0.6, 2.0], Some(cell));
            let fragment = orig(&ch.topology, &[ch.b, ch.c]);

            let merged = ch.topology.collapse_orig_atoms(&fragment).unwrap();

            let t = &ch.topology;
            assert_close(t, pos(t, merged), Point3::new(9.8, 1.0, 1.0));
            let pa_a = pa(t, ch.a);
            for conn in t.connection_table().atom_conns(merged) {
                let expected = if t.connection_table().other_endpoint(conn, merged) == Some(pa_a) {
                    Point3::new(9.3, 1.0, 1.0)
                } else {
                    Point3::new(0.3, 1.0, 1.0)
                };
                assert_close(t, pos(t, conn), expected);
                let frac = t.simplified().cell().unwrap().to_fractional(&pos(t, conn));
                assert!(frac.iter().all(|&x| (0.0..1.0).contains(&x)));
            }
            assert_eq!(t.validate(), Ok(()));
        }

        #[test]
        fn fragments_wider_than_half_the_cell_stay_contiguous() {
            let cell = UnitCell::cubic(10.0).unwrap();
            let mut ch = chain_with([1.0, 3.0, 5.0, 7.0], Some(cell));
            let fragment = orig(&ch.topology, &[ch.a, ch.b, ch.c, ch.d]);

            let merged = ch.topology.collapse_orig_atoms(&fragment).unwrap();

            let t = &ch.topology;
            assert_close(t, pos(t, merged), Point3::new(4.0, 1.0, 1.0));
            assert_eq!(t.valence(merged), 0);
            assert_eq!(t.num_pseudo_atoms(), 1);
            assert_eq!(t.validate(), Ok(()));
        }

        #[test]
        fn wide_fragment_connections_follow_the_contiguous_image() {
            // B..D spans 5.5 A of a 10 A cell; A sits across the boundary from B.
            let cell = UnitCell::cubic(10.0).unwrap();
            let mut ch = chain_with([9.0, 1.0, 3.5, 6.5], Some(cell));
            let fragment = orig(&ch.topology, &[ch.b, ch.c, ch.d]);

            let merged = ch.topology.collapse_orig_atoms(&fragment).unwrap();

            let t = &ch.topology;
            let centroid_x = (1.0 + 3.5 + 6.5) / 3.0;
            assert_close(t, pos(t, merged), Point3::new(centroid_x, 1.0, 1.0));
            assert_eq!(t.valence(merged), 1);
            let conn = t.connection_table().atom_conns(merged).next().unwrap();
            assert_eq!(t.connection_table().other_endpoint(conn, merged), Some(pa(t, ch.a)));
            // (4 * centroid + B at 1.0 + A unwrapped to -1.0) / 6
            let site_x = (4.0 * centroid_x + 1.0 - 1.0) / 6.0;
            assert_close(t, pos(t, conn), Point3::new(site_x, 1.0, 1.0));
            assert_eq!(t.validate(), Ok(()));
        }

        #[test]
        fn parallel_connections_from_one_internal_atom_share_a_site() {
            let mut ch = chain();
            let (pa_a, pa_b) = (pa(&ch.topology, ch.a), pa(&ch.topology, ch.b));
            ch.topology.connect_atoms(pa_b, pa_a, None).unwrap();
            let fragment = orig(&ch.topology, &[ch.b, ch.c]);

            let merged = ch.topology.collapse_orig_atoms(&fragment).unwrap();

            let t = &ch.topology;
            assert_eq!(t.valence(merged), 3);
            let to_a: Vec<Point3<f64>> = t
                .connection_table()
                .atom_conns(merged)
                .filter(|&c| t.connection_table().other_endpoint(c, merged) == Some(pa_a))
                .map(|c| pos(t, c))
                .collect();
            assert_eq!(to_a.len(), 2);
            assert_close(t, to_a[0], Point3::new(1.75, 1.0, 1.0));
            assert_close(t, to_a[1], Point3::new(1.75, 1.0, 1.0));
            assert_eq!(t.validate(), Ok(()));
        }

        #[test]
        fn parallel_paths_become_parallel_connections() {
            // X bonded to Y1 and Y2, which are both bonded to Z (a four-ring)
            let mut original = Structure::new();
            let x = original.add_atom(Atom::new(29, Point3::new(0.0, 0.0, 0.0)));
            let y1 = original.add_atom(Atom::new(8, Point3::new(1.0, 1.0, 0.0)));
            let y2 = original.add_atom(Atom::new(8, Point3::new(1.0, -1.0, 0.0)));
            let z = original.add_atom(Atom::new(29, Point3::new(2.0, 0.0, 0.0)));
            for (a, b) in [(x, y1), (x, y2), (z, y1), (z, y2)] {
                original.add_bond(a, b, BondOrder::Single).unwrap();
            }
            let mut t = Topology::new(original).unwrap();
            let fragment = orig(&t, &[y1, y2]);

            let merged = t.collapse_orig_atoms(&fragment).unwrap();

            assert_eq!(t.valence(merged), 4);
            assert_eq!(t.valence(pa(&t, x)), 2);
            assert_eq!(t.valence(pa(&t, z)), 2);
            let sites: BTreeSet<(i64, i64)> = t
                .connection_table()
                .atom_conns(merged)
                .map(|c| {
                    let p = pos(&t, c);
                    ((p.x * 1e6).round() as i64, (p.y * 1e6).round() as i64)
                })
                .collect();
            assert_eq!(sites.len(), 4, "parallel connections must not coincide");
            assert_eq!(t.validate(), Ok(()));
        }

        #[test]
        fn repeated_collapse_merges_groups() {
            let mut ch = chain();
            let first = orig(&ch.topology, &[ch.b, ch.c]);
            ch.topology.collapse_orig_atoms(&first).unwrap();

            let second = orig(&ch.topology, &[ch.a, ch.b]);
            let merged = ch.topology.collapse_orig_atoms(&second).unwrap();

            let t = &ch.topology;
            assert_eq!(t.num_pseudo_atoms(), 2);
            assert_eq!(t.valence(merged), 1);
            assert!(t.connection_table().has_neighbor(merged, pa(t, ch.d)));
            let group = t.orig_atoms_of(merged).unwrap();
            assert_eq!(group.num_atoms(), 3);
            for o in [ch.a, ch.b, ch.c] {
                assert!(group.has_atom(o));
                assert_eq!(pa(t, o), merged);
            }
            assert_eq!(t.validate(), Ok(()));
        }

        #[test]
        fn collapse_rejects_foreign_fragments_without_mutation() {
            let mut ch = chain();
            let other = Structure::new();
            let fragment = VirtualMol::from_atoms(other.id(), [ch.b]);
            let atoms_before = ch.topology.simplified().num_atoms();

            let result = ch.topology.collapse_orig_atoms(&fragment);

            assert!(matches!(result, Err(NetError::ParentMismatch { .. })));
            assert_eq!(ch.topology.simplified().num_atoms(), atoms_before);
        }

        #[test]
        fn collapse_rejects_pseudo_atom_subsets() {
            let mut ch = chain();
            let simplified_id = ch.topology.simplified().id();
            let fragment = VirtualMol::from_atoms(simplified_id, [pa(&ch.topology, ch.b)]);
            assert!(matches!(
                ch.topology.collapse_orig_atoms(&fragment),
                Err(NetError::ParentMismatch { .. })
            ));
        }

        #[test]
        fn collapse_rejects_empty_and_deleted_fragments() {
            let mut ch = chain();
            let empty = VirtualMol::empty(ch.topology.original());
            assert_eq!(ch.topology.collapse_orig_atoms(&empty), Err(NetError::EmptyFragment));

            ch.topology.remove_orig_atoms(&orig(&ch.topology, &[ch.d])).unwrap();
            let atoms_before = ch.topology.simplified().num_atoms();
            let fragment = orig(&ch.topology, &[ch.c, ch.d]);
            assert_eq!(
                ch.topology.collapse_orig_atoms(&fragment),
                Err(NetError::DeletedAtom { atom: ch.d })
            );
            assert_eq!(ch.topology.simplified().num_atoms(), atoms_before);
        }

        #[test]
        fn collapse_validates_before_mutating() {
            let mut ch = chain();
            let (pa_a, pa_c) = (pa(&ch.topology, ch.a), pa(&ch.topology, ch.c));
            ch.topology.simplified.add_bond(pa_a, pa_c, BondOrder::Single).unwrap();
            let atoms_before = ch.topology.simplified().num_atoms();

            let result = ch.topology.collapse_orig_atoms(&orig(&ch.topology, &[ch.b, ch.c]));

            assert_eq!(result, Err(NetError::DirectBond { atom: pa_c, neighbor: pa_a }));
            assert_eq!(ch.topology.simplified().num_atoms(), atoms_before);
            assert!(ch.topology.simplified().contains_atom(pa_c));
        }
    }

    mod roles {
        use super::*;

        #[test]
        fn roles_are_set_queried_and_cleared() {
            let mut ch = chain();
            let nodes = orig(&ch.topology, &[ch.a, ch.b]);

            assert_eq!(ch.topology.set_role_to_atoms("node", &nodes, true), Ok(2));
            assert_eq!(ch.topology.set_role_to_atoms("node", &nodes, true), Ok(0));
            assert_eq!(ch.topology.orig_atoms_of_role("node"), nodes);
            assert!(ch.topology.orig_atoms_of_role("linker").is_empty());

            let only_a = orig(&ch.topology, &[ch.a]);
            assert_eq!(ch.topology.set_role_to_atoms("node", &only_a, false), Ok(1));
            assert_eq!(ch.topology.set_role_to_atoms("node", &only_a, false), Ok(0));
            assert_eq!(ch.topology.orig_atoms_of_role("node"), orig(&ch.topology, &[ch.b]));
            assert!(ch.topology.roles_of(ch.a).is_none());
        }

        #[test]
        fn roles_require_original_atoms() {
            let mut ch = chain();
            let pseudo = VirtualMol::from_atoms(ch.topology.simplified().id(), [pa(&ch.topology, ch.a)]);
            assert!(matches!(
                ch.topology.set_role_to_atoms("node", &pseudo, true),
                Err(NetError::ParentMismatch { .. })
            ));
        }

        #[test]
        fn roles_follow_atoms_through_collapse() {
            let mut ch = chain();
            ch.topology.set_role_to_atoms("linker", &orig(&ch.topology, &[ch.b]), true).unwrap();
            ch.topology.set_role_to_atoms("node", &orig(&ch.topology, &[ch.c]), true).unwrap();

            let merged = ch
                .topology
                .collapse_orig_atoms(&orig(&ch.topology, &[ch.b, ch.c]))
                .unwrap();

            let roles = ch.topology.roles_of_pseudo_atom(merged);
            assert!(roles.has_role("linker"));
            assert!(roles.has_role("node"));
            assert!(ch.topology.roles_of_pseudo_atom(pa(&ch.topology, ch.a)).is_empty());
            assert_eq!(ch.topology.orig_atoms_of_role("linker"), orig(&ch.topology, &[ch.b]));
        }
    }

    mod removal {
        use super::*;

        #[test]
        fn removing_an_atom_deletes_its_pseudo_atom_and_connections() {
            let mut ch = chain();
            let pa_d = pa(&ch.topology, ch.d);
            ch.topology.set_role_to_atoms("solvent", &orig(&ch.topology, &[ch.d]), true).unwrap();

            let removed = ch.topology.remove_orig_atoms(&orig(&ch.topology, &[ch.d])).unwrap();

            let t = &ch.topology;
            assert_eq!(removed, 1);
            assert!(t.simplified().atom(pa_d).is_none());
            assert!(t.pseudo_atom_of(ch.d).is_none());
            assert!(t.deleted_orig_atoms().has_atom(ch.d));
            assert_eq!(t.valence(pa(t, ch.c)), 1);
            assert_eq!(t.num_connections(), 2);
            assert!(t.orig_atoms_of_role("solvent").is_empty());
            assert_eq!(t.original().num_atoms(), 4);
            assert_eq!(t.validate(), Ok(()));
        }

        #[test]
        fn removing_twice_is_a_no_op() {
            let mut ch = chain();
            let fragment = orig(&ch.topology, &[ch.d]);
            assert_eq!(ch.topology.remove_orig_atoms(&fragment), Ok(1));
            assert_eq!(ch.topology.remove_orig_atoms(&fragment), Ok(0));
            assert_eq!(ch.topology.validate(), Ok(()));
        }

        #[test]
        fn merged_pseudo_atom_survives_until_its_group_is_empty() {
            let mut ch = chain();
            let merged = ch
                .topology
                .collapse_orig_atoms(&orig(&ch.topology, &[ch.b, ch.c]))
                .unwrap();

            ch.topology.remove_orig_atoms(&orig(&ch.topology, &[ch.b])).unwrap();
            assert!(ch.topology.simplified().contains_atom(merged));
            assert_eq!(ch.topology.orig_atoms_of(merged).unwrap().num_atoms(), 1);
            assert_eq!(ch.topology.validate(), Ok(()));

            ch.topology.remove_orig_atoms(&orig(&ch.topology, &[ch.c])).unwrap();
            let t = &ch.topology;
            assert!(!t.simplified().contains_atom(merged));
            assert_eq!(t.num_connections(), 0);
            assert_eq!(t.valence(pa(t, ch.a)), 0);
            assert_eq!(t.num_pseudo_atoms(), 2);
            assert_eq!(t.validate(), Ok(()));
        }

        #[test]
        fn removal_rejects_foreign_atoms() {
            let mut ch = chain();
            let other = Structure::new();
            let result = ch.topology.remove_orig_atoms(&VirtualMol::from_atoms(other.id(), [ch.a]));
            assert!(matches!(result, Err(NetError::ParentMismatch { .. })));
            assert!(ch.topology.deleted_orig_atoms().is_empty());
        }
    }

    mod export {
        use super::*;

        #[test]
        fn export_recolors_by_role_without_touching_the_net() {
            let mut ch = chain();
            ch.topology.set_role_to_atoms("node", &orig(&ch.topology, &[ch.b]), true).unwrap();
            ch.topology.set_role_to_atoms("linker", &orig(&ch.topology, &[ch.a, ch.c]), true).unwrap();
            let merged = ch
                .topology
                .collapse_orig_atoms(&orig(&ch.topology, &[ch.b, ch.c]))
                .unwrap();

            let t = &ch.topology;
            let exported = t.to_structure();

            assert_ne!(exported.id(), t.simplified().id());
            assert_eq!(exported.num_atoms(), t.simplified().num_atoms());
            assert_eq!(exported.atom(merged).unwrap().element, 40);
            assert_eq!(exported.atom(pa(t, ch.a)).unwrap().element, 7);
            assert_eq!(exported.atom(pa(t, ch.d)).unwrap().element, 118);
            assert_eq!(t.simplified().atom(merged).unwrap().element, 118);
            for conn in t.connection_table().atom_conns(merged) {
                assert_eq!(exported.atom(conn).unwrap().element, 0);
            }
        }

        #[test]
        fn custom_config_controls_tags() {
            let config = SimplifyConfig::builder()
                .pseudo_atom_element(54)
                .connection_element(1)
                .build()
                .unwrap();
            let mut original = Structure::new();
            let a = original.add_atom(Atom::new(6, Point3::origin()));
            let b = original.add_atom(Atom::new(6, Point3::new(1.0, 0.0, 0.0)));
            original.add_bond(a, b, BondOrder::Single).unwrap();

            let t = Topology::with_config(original, config).unwrap();

            let p = pa(&t, a);
            assert_eq!(t.simplified().atom(p).unwrap().element, 54);
            let conn = t.connection_table().atom_conns(p).next().unwrap();
            assert_eq!(t.simplified().atom(conn).unwrap().element, 1);
            assert_close(&t, pos(&t, conn), Point3::new(0.5, 0.0, 0.0));
        }
    }
}
