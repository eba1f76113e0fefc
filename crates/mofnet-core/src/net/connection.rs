use super::error::{NetError, ensure_parent};
use super::virtual_mol::VirtualMol;
use crate::core::models::ids::{AtomId, StructureId};
use crate::core::models::system::Structure;
use std::collections::{BTreeMap, BTreeSet};

/// Bookkeeping for connection pseudo-atoms of one simplified structure.
///
/// Each connection joins exactly two endpoints. The forward map
/// (`conn -> endpoints`) and the reverse map (`endpoint -> conns`) are kept
/// as exact inverses; they are only ever modified through this type.
#[derive(Debug, Clone)]
pub struct ConnectionTable {
    parent: StructureId,
    conn_endpoints: BTreeMap<AtomId, (AtomId, AtomId)>,
    endpoint_conns: BTreeMap<AtomId, BTreeSet<AtomId>>,
}

impl ConnectionTable {
    pub fn new(parent: StructureId) -> Self {
        Self {
            parent,
            conn_endpoints: BTreeMap::new(),
            endpoint_conns: BTreeMap::new(),
        }
    }

    pub fn parent(&self) -> StructureId {
        self.parent
    }

    /// Registers `conn` as the connection between `begin` and `end`.
    ///
    /// Nothing is inserted on error.
    pub fn add_conn(&mut self, conn: AtomId, begin: AtomId, end: AtomId) -> Result<(), NetError> {
        if begin == end {
            return Err(NetError::SelfLoop { atom: begin });
        }
        if self.conn_endpoints.contains_key(&conn) {
            return Err(NetError::DuplicateConnection { conn });
        }
        if conn == begin || conn == end || self.endpoint_conns.contains_key(&conn) {
            return Err(NetError::ConnectionIsEndpoint { conn });
        }
        if let Some(&atom) = [begin, end].iter().find(|a| self.is_connection(**a)) {
            return Err(NetError::UnexpectedConnection { atom });
        }

        self.conn_endpoints.insert(conn, (begin, end));
        self.endpoint_conns.entry(begin).or_default().insert(conn);
        self.endpoint_conns.entry(end).or_default().insert(conn);
        Ok(())
    }

    /// Unregisters `conn` and returns its endpoints.
    ///
    /// Only `conn` is dropped from the endpoints' buckets; other connections
    /// sharing those endpoints are untouched.
    pub fn remove_conn(&mut self, conn: AtomId) -> Option<(AtomId, AtomId)> {
        let (begin, end) = self.conn_endpoints.remove(&conn)?;
        for endpoint in [begin, end] {
            if let Some(bucket) = self.endpoint_conns.get_mut(&endpoint) {
                bucket.remove(&conn);
                if bucket.is_empty() {
                    self.endpoint_conns.remove(&endpoint);
                }
            }
        }
        Some((begin, end))
    }

    pub fn is_connection(&self, atom: AtomId) -> bool {
        self.conn_endpoints.contains_key(&atom)
    }

    /// True for any atom that is not a registered connection.
    pub fn is_plain_atom(&self, atom: AtomId) -> bool {
        !self.is_connection(atom)
    }

    pub fn atom_conns(&self, endpoint: AtomId) -> impl Iterator<Item = AtomId> + '_ {
        self.endpoint_conns
            .get(&endpoint)
            .into_iter()
            .flat_map(|bucket| bucket.iter().copied())
    }

    /// Number of connections touching `endpoint`.
    pub fn valence(&self, endpoint: AtomId) -> usize {
        self.endpoint_conns.get(&endpoint).map_or(0, BTreeSet::len)
    }

    /// True if at least one connection links `begin` and `end` directly.
    pub fn has_neighbor(&self, begin: AtomId, end: AtomId) -> bool {
        self.atom_conns(begin)
            .any(|conn| self.other_endpoint(conn, begin) == Some(end))
    }

    pub fn conn_endpoints(&self, conn: AtomId) -> Option<(AtomId, AtomId)> {
        self.conn_endpoints.get(&conn).copied()
    }

    /// The endpoint of `conn` that is not `endpoint`.
    pub fn other_endpoint(&self, conn: AtomId, endpoint: AtomId) -> Option<AtomId> {
        match self.conn_endpoints.get(&conn) {
            Some(&(a, b)) if a == endpoint => Some(b),
            Some(&(a, b)) if b == endpoint => Some(a),
            _ => None,
        }
    }

    pub fn num_connections(&self) -> usize {
        self.conn_endpoints.len()
    }

    pub fn connections(&self) -> impl Iterator<Item = (AtomId, (AtomId, AtomId))> + '_ {
        self.conn_endpoints.iter().map(|(&c, &ends)| (c, ends))
    }

    /// Connections whose two endpoints both lie inside `atoms`.
    pub fn internal_conns(&self, atoms: &VirtualMol) -> Result<VirtualMol, NetError> {
        ensure_parent(self.parent, atoms.parent())?;
        let mut internal = VirtualMol::new(self.parent);
        for atom in atoms.iter() {
            for conn in self.atom_conns(atom) {
                if let Some((a, b)) = self.conn_endpoints(conn) {
                    if atoms.has_atom(a) && atoms.has_atom(b) {
                        internal.add_atom(conn);
                    }
                }
            }
        }
        Ok(internal)
    }

    /// Checks that the two indices mirror each other and that every
    /// connection is realized in `structure` as a degree-2 node bonded to
    /// exactly its two endpoints.
    pub fn check_consistency(&self, structure: &Structure) -> Result<(), NetError> {
        ensure_parent(self.parent, structure.id())?;

        for (&conn, &(a, b)) in &self.conn_endpoints {
            for endpoint in [a, b] {
                let listed = self
                    .endpoint_conns
                    .get(&endpoint)
                    .is_some_and(|bucket| bucket.contains(&conn));
                if !listed {
                    return Err(NetError::Inconsistent(format!(
                        "connection {conn:?} missing from the bucket of endpoint {endpoint:?}"
                    )));
                }
            }

            let neighbors = structure
                .bonded_neighbors(conn)
                .ok_or(NetError::AtomNotFound { atom: conn })?;
            let bonded_to_both = neighbors.len() == 2 && neighbors.contains(&a) && neighbors.contains(&b);
            if !bonded_to_both {
                return Err(NetError::Inconsistent(format!(
                    "connection {conn:?} is bonded to {neighbors:?} instead of {a:?} and {b:?}"
                )));
            }
        }

        for (&endpoint, bucket) in &self.endpoint_conns {
            if bucket.is_empty() {
                return Err(NetError::Inconsistent(format!(
                    "endpoint {endpoint:?} has an empty connection bucket"
                )));
            }
            for conn in bucket {
                if self.other_endpoint(*conn, endpoint).is_none() {
                    return Err(NetError::Inconsistent(format!(
                        "endpoint {endpoint:?} lists {conn:?}, which does not end there"
                    )));
                }
            }
        }
        Ok(())
    }
}
