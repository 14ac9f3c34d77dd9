//! Bounding volume hierarchy over the scene's bounded primitives.
//!
//! Laid out like the photon k-d tree: the build reorders one primitive
//! array and leaves address contiguous ranges of it. Splits are at the
//! centroid median along the widest centroid axis.

use crate::hittable::closest_hit;
use crate::split::median_split;
use crate::{HitRecord, Hittable, Ray};
use facet_math::{Aabb, Interval};

/// Primitives per leaf before splitting stops.
const LEAF_SIZE: usize = 4;

enum BvhNode {
    Leaf {
        bounds: Aabb,
        start: usize,
        end: usize,
    },
    Branch {
        bounds: Aabb,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    fn bounds(&self) -> Aabb {
        match self {
            BvhNode::Leaf { bounds, .. } | BvhNode::Branch { bounds, .. } => *bounds,
        }
    }
}

/// Acceleration structure for nearest-hit queries. Every primitive must be
/// bounded; planes are tested outside the hierarchy.
pub struct Bvh {
    primitives: Vec<Box<dyn Hittable>>,
    root: Option<BvhNode>,
}

impl Bvh {
    pub fn build(mut primitives: Vec<Box<dyn Hittable>>) -> Self {
        let root = if primitives.is_empty() {
            None
        } else {
            Some(build_node(&mut primitives, 0))
        };
        Self { primitives, root }
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    fn hit_node(&self, node: &BvhNode, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        if !node.bounds().hit(ray, ray_t) {
            return false;
        }
        match node {
            BvhNode::Leaf { start, end, .. } => {
                closest_hit(&self.primitives[*start..*end], ray, ray_t, rec)
            }
            BvhNode::Branch { left, right, .. } => {
                let hit_left = self.hit_node(left, ray, ray_t, rec);
                let right_range = if hit_left { ray_t.with_max(rec.t) } else { ray_t };
                let hit_right = self.hit_node(right, ray, right_range, rec);
                hit_left || hit_right
            }
        }
    }
}

fn build_node(primitives: &mut [Box<dyn Hittable>], offset: usize) -> BvhNode {
    let bounds = primitives
        .iter()
        .fold(Aabb::EMPTY, |acc, p| acc.union(&p.bounding_box()));

    if primitives.len() <= LEAF_SIZE {
        return BvhNode::Leaf {
            bounds,
            start: offset,
            end: offset + primitives.len(),
        };
    }

    let centroids = Aabb::enclosing_points(primitives.iter().map(|p| p.bounding_box().centroid()));
    let mid = median_split(primitives, centroids.longest_axis(), |p| {
        p.bounding_box().centroid()
    });
    let (left, right) = primitives.split_at_mut(mid);

    BvhNode::Branch {
        bounds,
        left: Box::new(build_node(left, offset)),
        right: Box::new(build_node(right, offset + mid)),
    }
}

impl Hittable for Bvh {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        match &self.root {
            Some(root) => self.hit_node(root, ray, ray_t, rec),
            None => false,
        }
    }

    fn bounding_box(&self) -> Aabb {
        self.root.as_ref().map_or(Aabb::EMPTY, BvhNode::bounds)
    }
}
