//! Geometric helpers for stacking relations between placed boxes.
//!
//! The packing engine works on candidate bounding boxes before they become
//! placements, so everything here takes [`BoundingBox`] values.

use crate::model::Placement;
use crate::types::BoundingBox;

/// Footprint (XY) overlap of two boxes.
#[inline]
pub fn footprint_overlap(a: &BoundingBox, b: &BoundingBox) -> f64 {
    a.overlap_area_xy(b)
}

/// Checks whether `upper` sits directly on the top face of `lower`.
///
/// # Parameters
/// * `upper` - The box that may be resting
/// * `lower` - The potential supporting box
/// * `height_epsilon` - Tolerance for matching the contact plane
/// * `epsilon` - Minimum footprint overlap that counts as contact
pub fn rests_on(
    upper: &BoundingBox,
    lower: &BoundingBox,
    height_epsilon: f64,
    epsilon: f64,
) -> bool {
    (upper.min.z - lower.max.z).abs() <= height_epsilon
        && footprint_overlap(upper, lower) > epsilon
}

/// Checks whether `upper` lies anywhere above `lower` with overlapping footprint.
///
/// Unlike [`rests_on`], this also covers boxes stacked further up.
pub fn lies_above(
    upper: &BoundingBox,
    lower: &BoundingBox,
    height_epsilon: f64,
    epsilon: f64,
) -> bool {
    upper.min.z >= lower.max.z - height_epsilon && footprint_overlap(upper, lower) > epsilon
}

/// Sums the part of `candidate`'s base that rests on top faces of `placed`.
///
/// Placed boxes never overlap each other, so their contact areas add up
/// without double counting.
pub fn support_area(candidate: &BoundingBox, placed: &[Placement], height_epsilon: f64) -> f64 {
    placed
        .iter()
        .map(|p| p.bounding_box())
        .filter(|b| (candidate.min.z - b.max.z).abs() <= height_epsilon)
        .map(|b| footprint_overlap(candidate, &b))
        .sum()
}

/// Total weight of the placements lying above `lower`.
pub fn load_above(
    lower: &BoundingBox,
    placed: &[Placement],
    height_epsilon: f64,
    epsilon: f64,
) -> f64 {
    placed
        .iter()
        .filter(|p| lies_above(&p.bounding_box(), lower, height_epsilon, epsilon))
        .map(|p| p.instance.weight)
        .sum()
}
