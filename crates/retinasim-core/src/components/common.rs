//! Geometry shared by cells and the retina volume.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// 3D position vector
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn from_size(width: f64, height: f64, depth: f64) -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::new(width, height, depth),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn depth(&self) -> f64 {
        self.max.z - self.min.z
    }

    pub fn contains(&self, point: &Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Uniform point inside the box. Draws x, then y, then z.
    pub fn random_point(&self, rng: &mut impl Rng) -> Vec3 {
        let x = rng.gen_range(self.min.x..=self.max.x);
        let y = rng.gen_range(self.min.y..=self.max.y);
        let z = rng.gen_range(self.min.z..=self.max.z);
        Vec3::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_bounding_box_contains() {
        let bb = BoundingBox::from_size(10.0, 10.0, 10.0);
        assert!(bb.contains(&Vec3::new(5.0, 5.0, 5.0)));
        assert!(bb.contains(&Vec3::new(10.0, 0.0, 10.0)));
        assert!(!bb.contains(&Vec3::new(15.0, 5.0, 5.0)));
    }

    #[test]
    fn test_random_point_inside() {
        let bb = BoundingBox::from_size(100.0, 100.0, 50.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let p = bb.random_point(&mut rng);
            assert!(bb.contains(&p), "{:?} escaped {:?}", p, bb);
        }
        assert_eq!(bb.depth(), 50.0);
    }
}
