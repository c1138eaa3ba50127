use nalgebra::{Point3, Rotation3, Unit, Vector3};

/// Returns the rotation taking direction `from` onto direction `to`.
///
/// Unlike `Rotation3::rotation_between`, anti-parallel inputs are handled by a half turn
/// about an arbitrary perpendicular axis. Zero-length inputs yield the identity.
pub fn rotation_to_align(from: &Vector3<f64>, to: &Vector3<f64>) -> Rotation3<f64> {
    if let Some(rotation) = Rotation3::rotation_between(from, to) {
        return rotation;
    }
    if from.norm_squared() < f64::EPSILON || to.norm_squared() < f64::EPSILON {
        return Rotation3::identity();
    }
    let helper = if from.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    Rotation3::from_axis_angle(&Unit::new_normalize(from.cross(&helper)), std::f64::consts::PI)
}

pub fn rotation_from_axis_angle(axis: &Vector3<f64>, angle_degrees: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Unit::new_normalize(*axis), angle_degrees.to_radians())
}

/// Rotates `point` about `pivot`.
pub fn rotate_about(point: &Point3<f64>, pivot: &Point3<f64>, rotation: &Rotation3<f64>) -> Point3<f64> {
    pivot + rotation * (point - pivot)
}

/// Point at `length` from `origin` along the direction of `toward`.
pub fn point_along(origin: &Point3<f64>, toward: &Point3<f64>, length: f64) -> Point3<f64> {
    origin + (toward - origin).normalize() * length
}

pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn rotation_to_align_maps_direction() {
        let from = Vector3::new(1.0, 0.0, 0.0);
        let to = Vector3::new(0.0, 1.0, 1.0).normalize();
        let r = rotation_to_align(&from, &to);
        assert!((r * from - to).norm() < EPS);
    }

    #[test]
    fn rotation_to_align_handles_antiparallel_vectors() {
        let from = Vector3::new(0.0, 0.0, 2.0);
        let to = Vector3::new(0.0, 0.0, -1.0);
        let r = rotation_to_align(&from, &to);
        assert!((r * from.normalize() - to).norm() < EPS);
    }

    #[test]
    fn rotate_about_keeps_distance_to_pivot() {
        let pivot = Point3::new(1.0, 1.0, 1.0);
        let point = Point3::new(2.0, 1.0, 1.0);
        let r = rotation_from_axis_angle(&Vector3::z(), 90.0);
        let rotated = rotate_about(&point, &pivot, &r);
        assert!((rotated - Point3::new(1.0, 2.0, 1.0)).norm() < EPS);
    }

    #[test]
    fn point_along_places_point_at_length() {
        let origin = Point3::new(0.0, 0.0, 0.0);
        let toward = Point3::new(0.0, 3.0, 4.0);
        let p = point_along(&origin, &toward, 1.5);
        assert!((p - Point3::new(0.0, 0.9, 1.2)).norm() < EPS);
    }

    #[test]
    fn rmsd_of_identical_sets_is_zero_and_mismatch_is_none() {
        let a = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        assert_eq!(calculate_rmsd(&a, &a), Some(0.0));
        assert_eq!(calculate_rmsd(&a, &a[..1]), None);
        assert_eq!(calculate_rmsd(&[], &[]), None);
    }
}
