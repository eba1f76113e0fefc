use nalgebra::Point3;

/// Atomic number used for dummy sites.
pub const DUMMY_ELEMENT: u8 = 0;

/// A node of a `Structure`: either a real atom of the input crystal or a
/// pseudo-atom of a simplified net.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Atomic number. Pseudo-atoms carry a configurable tag element.
    pub element: u8,
    /// Cartesian position in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    pub fn new(element: u8, position: Point3<f64>) -> Self {
        Self { element, position }
    }

    pub fn is_dummy(&self) -> bool {
        self.element == DUMMY_ELEMENT
    }
}
