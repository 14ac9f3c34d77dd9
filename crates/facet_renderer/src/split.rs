//! Median partitioning shared by the BVH and the photon k-d tree.

use facet_math::Vec3;

/// Reorder `items` around their median along `axis` and return its index.
///
/// Afterwards nothing before the returned index has a larger coordinate
/// and nothing after it a smaller one. Runs in linear time; neither half
/// is sorted.
pub(crate) fn median_split<T>(items: &mut [T], axis: usize, position: impl Fn(&T) -> Vec3) -> usize {
    let mid = items.len() / 2;
    if !items.is_empty() {
        items.select_nth_unstable_by(mid, |a, b| position(a)[axis].total_cmp(&position(b)[axis]));
    }
    mid
}
