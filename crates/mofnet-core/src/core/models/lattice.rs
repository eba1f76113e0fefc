use nalgebra::{Matrix3, Point3, Vector3};
use thiserror::Error;

const MIN_CELL_VOLUME: f64 = 1e-6;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LatticeError {
    #[error("Unit cell has zero or near-zero volume ({volume:.3e})")]
    Degenerate { volume: f64 },
    #[error("Invalid unit cell angles: alpha={alpha}, beta={beta}, gamma={gamma}")]
    InvalidAngles { alpha: f64, beta: f64, gamma: f64 },
}

/// A periodic unit cell.
///
/// The columns of `matrix` are the lattice vectors `a`, `b` and `c` in
/// Cartesian coordinates, so `cartesian = matrix * fractional`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitCell {
    matrix: Matrix3<f64>,
    inverse: Matrix3<f64>,
}

impl UnitCell {
    /// Creates a cell from its lattice matrix.
    ///
    /// # Arguments
    ///
    /// * `matrix` - Lattice vectors `a`, `b`, `c` as columns, in Angstroms.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::Degenerate`] if the matrix has (near-)zero volume
    /// and cannot be inverted.
    pub fn new(matrix: Matrix3<f64>) -> Result<Self, LatticeError> {
        let volume = matrix.determinant();
        if volume.abs() < MIN_CELL_VOLUME {
            return Err(LatticeError::Degenerate { volume });
        }
        let inverse = matrix
            .try_inverse()
            .ok_or(LatticeError::Degenerate { volume })?;
        Ok(Self { matrix, inverse })
    }

    /// Builds a cell from its six lattice parameters.
    ///
    /// `a` lies along x and `b` in the xy-plane.
    ///
    /// # Arguments
    ///
    /// * `a`, `b`, `c` - Edge lengths in Angstroms.
    /// * `alpha`, `beta`, `gamma` - Inter-axial angles in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::InvalidAngles`] if the angles do not describe a
    /// real cell, or [`LatticeError::Degenerate`] if the volume vanishes.
    pub fn from_parameters(
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
    ) -> Result<Self, LatticeError> {
        let (cos_a, cos_b, cos_g) = (
            alpha.to_radians().cos(),
            beta.to_radians().cos(),
            gamma.to_radians().cos(),
        );
        let sin_g = gamma.to_radians().sin();
        let term = 1.0 - cos_a.powi(2) - cos_b.powi(2) - cos_g.powi(2) + 2.0 * cos_a * cos_b * cos_g;
        if term <= 0.0 || sin_g.abs() < f64::EPSILON {
            return Err(LatticeError::InvalidAngles { alpha, beta, gamma });
        }

        let matrix = Matrix3::new(
            a,
            b * cos_g,
            c * cos_b,
            0.0,
            b * sin_g,
            c * (cos_a - cos_b * cos_g) / sin_g,
            0.0,
            0.0,
            c * term.sqrt() / sin_g,
        );
        Self::new(matrix)
    }

    /// Creates a cubic cell with the given edge length (Angstroms).
    pub fn cubic(edge: f64) -> Result<Self, LatticeError> {
        Self::new(Matrix3::from_diagonal_element(edge))
    }

    /// Returns the lattice matrix (lattice vectors as columns).
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Returns the cell volume in cubic Angstroms.
    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    /// Converts a Cartesian position to fractional coordinates.
    ///
    /// # Arguments
    ///
    /// * `cart` - A Cartesian position.
    ///
    /// # Return
    ///
    /// The fractional coordinates; values outside `[0, 1)` denote other images.
    pub fn to_fractional(&self, cart: &Point3<f64>) -> Vector3<f64> {
        self.inverse * cart.coords
    }

    /// Converts fractional coordinates to a Cartesian position.
    ///
    /// # Arguments
    ///
    /// * `frac` - Fractional coordinates.
    ///
    /// # Return
    ///
    /// The Cartesian position `matrix * frac`.
    pub fn to_cartesian(&self, frac: &Vector3<f64>) -> Point3<f64> {
        Point3::from(self.matrix * frac)
    }

    /// Maps a point into the canonical cell.
    ///
    /// # Arguments
    ///
    /// * `point` - A Cartesian position.
    ///
    /// # Return
    ///
    /// The equivalent position whose fractional coordinates lie in `[0, 1)`.
    pub fn wrap_cartesian(&self, point: &Point3<f64>) -> Point3<f64> {
        let mut frac = self.to_fractional(point);
        frac.apply(|x| {
            *x -= x.floor();
            // x - floor(x) can round up to exactly 1.0 for tiny negative x
            if *x >= 1.0 {
                *x = 0.0;
            }
        });
        self.to_cartesian(&frac)
    }

    /// Returns the periodic image of `point` closest to `reference`.
    ///
    /// The image is chosen by rounding the fractional difference, which is the
    /// nearest image for cells that are not strongly skewed.
    ///
    /// # Arguments
    ///
    /// * `point` - The position to move.
    /// * `reference` - The position the image should be close to.
    pub fn unwrap_cartesian_near(&self, point: &Point3<f64>, reference: &Point3<f64>) -> Point3<f64> {
        let ref_frac = self.to_fractional(reference);
        let mut delta = self.to_fractional(point) - ref_frac;
        delta.apply(|x| *x -= x.round());
        self.to_cartesian(&(ref_frac + delta))
    }

    /// Distance between `a` and the nearest periodic image of `b`.
    pub fn minimum_image_distance(&self, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
        (self.unwrap_cartesian_near(b, a) - a).norm()
    }
}
