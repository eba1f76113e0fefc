use nalgebra::{Point3, Vector3};

/// Unweighted centroid of a set of points. `None` for an empty input.
pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Some(Point3::from(sum / points.len() as f64))
}

/// Weighted average of points. Returns `None` if the inputs are empty or the
/// weights do not sum to a positive value.
pub fn weighted_average(points: &[(Point3<f64>, f64)]) -> Option<Point3<f64>> {
    let total: f64 = points.iter().map(|(_, w)| w).sum();
    if points.is_empty() || total <= f64::EPSILON {
        return None;
    }
    let sum: Vector3<f64> = points.iter().map(|(p, w)| p.coords * *w).sum();
    Some(Point3::from(sum / total))
}

pub fn midpoint(a: &Point3<f64>, b: &Point3<f64>) -> Point3<f64> {
    nalgebra::center(a, b)
}
