use std::collections::BTreeSet;

/// Free-form role labels (e.g. "node", "linker") attached to one original atom.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomRoles {
    roles: BTreeSet<String>,
}

impl AtomRoles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Returns `true` if the role was not present before.
    pub fn add_role(&mut self, role: &str) -> bool {
        self.roles.insert(role.to_string())
    }

    /// Returns `true` only if the role existed and was removed.
    pub fn remove_role(&mut self, role: &str) -> bool {
        self.roles.remove(role)
    }

    pub fn clear_roles(&mut self) {
        self.roles.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }
}
