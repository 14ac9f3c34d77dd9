//! Static k-d tree over photon positions.
//!
//! Built once after emission and queried concurrently during rendering.
//! Nodes store index ranges into a single photon array that the build
//! reorders in place, so a leaf is a contiguous slice.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use facet_math::{Aabb, Vec3};

use crate::split::median_split;
use crate::Photon;

/// Photons per leaf before splitting stops.
const LEAF_SIZE: usize = 8;

/// Subtrees larger than this are built in parallel.
const PARALLEL_THRESHOLD: usize = 16_384;

#[derive(Debug, Clone)]
enum KdNode {
    Empty,
    Leaf {
        start: usize,
        end: usize,
    },
    Branch {
        axis: usize,
        split: f32,
        left: Box<KdNode>,
        right: Box<KdNode>,
    },
}

/// Spatial index for radius and k-nearest photon lookups.
#[derive(Debug, Clone)]
pub struct KdTree {
    photons: Vec<Photon>,
    root: KdNode,
    bounds: Aabb,
}

impl KdTree {
    /// Build a tree, taking ownership of the photons.
    ///
    /// Split axes cycle x, y, z with depth; each split is at the median of
    /// the node's photons along that axis.
    pub fn build(mut photons: Vec<Photon>) -> Self {
        let bounds = Aabb::enclosing_points(photons.iter().map(|p| p.position));
        let root = if photons.is_empty() {
            KdNode::Empty
        } else {
            build_recursive(&mut photons, 0, 0)
        };
        Self {
            photons,
            root,
            bounds,
        }
    }

    pub fn len(&self) -> usize {
        self.photons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photons.is_empty()
    }

    /// Tight box around every indexed photon position.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// All photons whose distance from `center` is at most `radius`.
    ///
    /// Order is unspecified. A negative or NaN radius matches nothing.
    pub fn query(&self, center: Vec3, radius: f32) -> Vec<&Photon> {
        let mut found = Vec::new();
        if radius.is_nan() || radius < 0.0 || self.is_empty() {
            return found;
        }
        if self.bounds.distance_squared_to(center) > radius * radius {
            return found;
        }
        self.query_node(&self.root, center, radius, radius * radius, &mut found);
        found
    }

    fn query_node<'a>(
        &'a self,
        node: &KdNode,
        center: Vec3,
        radius: f32,
        radius2: f32,
        found: &mut Vec<&'a Photon>,
    ) {
        match node {
            KdNode::Empty => {}
            KdNode::Leaf { start, end } => {
                found.extend(
                    self.photons[*start..*end]
                        .iter()
                        .filter(|p| p.position.distance_squared(center) <= radius2),
                );
            }
            KdNode::Branch {
                axis,
                split,
                left,
                right,
            } => {
                let delta = center[*axis] - split;
                if delta <= radius {
                    self.query_node(left, center, radius, radius2, found);
                }
                if delta >= -radius {
                    self.query_node(right, center, radius, radius2, found);
                }
            }
        }
    }

    /// The `k` photons nearest to `center` within `max_radius`, closest
    /// first, paired with their squared distance.
    pub fn nearest(&self, center: Vec3, k: usize, max_radius: f32) -> Vec<(&Photon, f32)> {
        if k == 0 || max_radius.is_nan() || max_radius < 0.0 || self.is_empty() {
            return Vec::new();
        }

        let mut heap = BinaryHeap::with_capacity(k + 1);
        self.nearest_node(&self.root, center, k, max_radius * max_radius, &mut heap);

        let mut result: Vec<(&Photon, f32)> = heap
            .into_iter()
            .map(|c| (&self.photons[c.index], c.dist2))
            .collect();
        result.sort_by(|a, b| a.1.total_cmp(&b.1));
        result
    }

    fn nearest_node(
        &self,
        node: &KdNode,
        center: Vec3,
        k: usize,
        max_dist2: f32,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        match node {
            KdNode::Empty => {}
            KdNode::Leaf { start, end } => {
                for index in *start..*end {
                    let dist2 = self.photons[index].position.distance_squared(center);
                    if dist2 > max_dist2 {
                        continue;
                    }
                    if heap.len() < k {
                        heap.push(Candidate { dist2, index });
                    } else if dist2 < prune_distance(heap, k, max_dist2) {
                        heap.pop();
                        heap.push(Candidate { dist2, index });
                    }
                }
            }
            KdNode::Branch {
                axis,
                split,
                left,
                right,
            } => {
                let delta = center[*axis] - split;
                let (near, far) = if delta <= 0.0 {
                    (left, right)
                } else {
                    (right, left)
                };
                self.nearest_node(near, center, k, max_dist2, heap);
                if delta * delta <= prune_distance(heap, k, max_dist2) {
                    self.nearest_node(far, center, k, max_dist2, heap);
                }
            }
        }
    }
}

/// Max-heap entry keyed on squared distance.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    dist2: f32,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist2
            .total_cmp(&other.dist2)
            .then(self.index.cmp(&other.index))
    }
}

/// Current pruning distance: the worst kept candidate once the heap is full.
fn prune_distance(heap: &BinaryHeap<Candidate>, k: usize, max_dist2: f32) -> f32 {
    match heap.peek() {
        Some(worst) if heap.len() == k => worst.dist2,
        _ => max_dist2,
    }
}

fn build_recursive(photons: &mut [Photon], offset: usize, depth: usize) -> KdNode {
    let len = photons.len();
    if len <= LEAF_SIZE {
        return KdNode::Leaf {
            start: offset,
            end: offset + len,
        };
    }

    let axis = depth % 3;
    let mid = median_split(photons, axis, |p| p.position);
    let split = photons[mid].position[axis];

    // Left holds [0, mid), right holds [mid, len); every left coordinate is
    // <= split and every right coordinate is >= split.
    let (left_slice, right_slice) = photons.split_at_mut(mid);
    let (left, right) = if len > PARALLEL_THRESHOLD {
        rayon::join(
            || build_recursive(left_slice, offset, depth + 1),
            || build_recursive(right_slice, offset + mid, depth + 1),
        )
    } else {
        (
            build_recursive(left_slice, offset, depth + 1),
            build_recursive(right_slice, offset + mid, depth + 1),
        )
    };

    KdNode::Branch {
        axis,
        split,
        left: Box::new(left),
        right: Box::new(right),
    }
}
