//! Packing engine: greedy candidate-point placement into a single container.
//!
//! The engine fills one container instance. Instances are processed in a
//! fixed order (largest volume first) and each is put at the first
//! `(orientation, anchor)` combination that passes every check:
//! - inside the container bounds
//! - no overlap with already placed boxes
//! - container payload not exceeded
//! - enough base support (floor or top faces of other boxes)
//! - stacking rules of everything below (and above) the box
//!
//! Anchor points start at the origin; every placement consumes one and
//! offers up to three new ones at its far corners. Two caps bound the work:
//! the number of placement attempts and the size of the anchor set. Once a
//! cap is hit, the remaining instances are deferred as
//! [`UnplacedReason::SearchBudgetExceeded`].
//!
//! The attempt counter may be shared across calls ([`pack_with_attempts`]),
//! so one budget covers a whole request. Apart from that counter the engine
//! keeps no state between calls; every call builds its own [`LoadSpace`].

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::error::{LoadingError, Result};
use crate::geometry::{lies_above, load_above, rests_on, support_area};
use crate::model::{ContainerType, ItemInstance, Orientation, Placement, UnplacedReason};
use crate::types::{BoundingBox, EPSILON_GENERAL, EPSILON_HEIGHT, Vec3};

/// Configuration for the packing engine.
///
/// Contains all tolerances and limits that steer the search.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PackingConfig {
    /// Minimum share of a box's base that must be supported (0.0 exclusive to 1.0)
    pub support_fraction: f64,
    /// Maximum number of `(orientation, anchor)` evaluations per request
    pub max_placement_attempts: u64,
    /// Maximum number of anchor points kept per container
    pub max_candidate_points: usize,
    /// Tolerance for height comparisons
    pub height_epsilon: f64,
    /// General numerical tolerance
    pub general_epsilon: f64,
}

impl PackingConfig {
    pub const DEFAULT_SUPPORT_FRACTION: f64 = 0.8;
    pub const DEFAULT_MAX_PLACEMENT_ATTEMPTS: u64 = 200_000;
    pub const DEFAULT_MAX_CANDIDATE_POINTS: usize = 4_096;
    pub const DEFAULT_HEIGHT_EPSILON: f64 = EPSILON_HEIGHT;
    pub const DEFAULT_GENERAL_EPSILON: f64 = EPSILON_GENERAL;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> PackingConfigBuilder {
        PackingConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.support_fraction > 0.0 && self.support_fraction <= 1.0) {
            return Err(LoadingError::InvalidConfiguration(format!(
                "Support fraction must be in (0, 1], got: {}",
                self.support_fraction
            )));
        }
        if self.max_candidate_points == 0 {
            return Err(LoadingError::InvalidConfiguration(
                "Candidate point cap must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("Height epsilon", self.height_epsilon),
            ("General epsilon", self.general_epsilon),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(LoadingError::InvalidConfiguration(format!(
                    "{} must be positive, got: {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            support_fraction: Self::DEFAULT_SUPPORT_FRACTION,
            max_placement_attempts: Self::DEFAULT_MAX_PLACEMENT_ATTEMPTS,
            max_candidate_points: Self::DEFAULT_MAX_CANDIDATE_POINTS,
            height_epsilon: Self::DEFAULT_HEIGHT_EPSILON,
            general_epsilon: Self::DEFAULT_GENERAL_EPSILON,
        }
    }
}

/// Builder for [`PackingConfig`].
#[derive(Clone, Debug, Default)]
pub struct PackingConfigBuilder {
    config: PackingConfig,
}

impl PackingConfigBuilder {
    /// Sets the minimum support fraction.
    pub fn support_fraction(mut self, fraction: f64) -> Self {
        self.config.support_fraction = fraction;
        self
    }

    /// Sets the placement attempt budget.
    pub fn max_placement_attempts(mut self, attempts: u64) -> Self {
        self.config.max_placement_attempts = attempts;
        self
    }

    /// Sets the anchor point cap.
    pub fn max_candidate_points(mut self, points: usize) -> Self {
        self.config.max_candidate_points = points;
        self
    }

    /// Sets the height tolerance.
    pub fn height_epsilon(mut self, epsilon: f64) -> Self {
        self.config.height_epsilon = epsilon;
        self
    }

    /// Sets the general tolerance.
    pub fn general_epsilon(mut self, epsilon: f64) -> Self {
        self.config.general_epsilon = epsilon;
        self
    }

    /// Builds the final configuration.
    pub fn build(self) -> PackingConfig {
        self.config
    }
}

/// Search cap that ended a container's search early.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SearchCap {
    /// The placement attempt budget is spent.
    PlacementAttempts,
    /// The container's anchor set outgrew `max_candidate_points`.
    CandidatePoints,
}

/// Result of filling one container instance.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineOutcome {
    pub placements: Vec<Placement>,
    pub unplaced: Vec<(ItemInstance, UnplacedReason)>,
    pub used_weight: f64,
    pub used_volume: f64,
    /// `(orientation, anchor)` evaluations spent in this call.
    pub attempts: u64,
    pub cap_hit: Option<SearchCap>,
}

impl EngineOutcome {
    /// Number of instances deferred because a cap was hit.
    pub fn deferred_by_budget(&self) -> usize {
        self.unplaced
            .iter()
            .filter(|(_, reason)| matches!(reason, UnplacedReason::SearchBudgetExceeded))
            .count()
    }
}

/// Sort key for loading order: volume desc, weight desc, identifier asc.
pub fn loading_order(a: &ItemInstance, b: &ItemInstance) -> Ordering {
    b.dims
        .volume()
        .total_cmp(&a.dims.volume())
        .then_with(|| b.weight.total_cmp(&a.weight))
        .then_with(|| a.instance_id.cmp(&b.instance_id))
}

/// Packs as many of `items` as possible into one empty `container`.
///
/// # Parameters
/// * `items` - Item instances to try, in any order
/// * `container` - The container type being filled
/// * `config` - Engine configuration
///
/// # Returns
/// The placements plus every instance that was not placed, each exactly once.
pub fn pack(items: &[ItemInstance], container: &ContainerType, config: &PackingConfig) -> EngineOutcome {
    let mut attempts = 0;
    pack_with_attempts(items, container, config, &mut attempts)
}

/// Like [`pack`], drawing from a caller-owned attempt counter.
///
/// `attempts` holds the evaluations already spent elsewhere; the search stops
/// once it reaches `config.max_placement_attempts`.
pub fn pack_with_attempts(
    items: &[ItemInstance],
    container: &ContainerType,
    config: &PackingConfig,
    attempts: &mut u64,
) -> EngineOutcome {
    let mut order: Vec<&ItemInstance> = items.iter().collect();
    order.sort_by(|a, b| loading_order(a, b));

    let mut space = LoadSpace::new(container);
    let mut unplaced = Vec::new();
    let spent_before = *attempts;
    let mut cap_hit = None;

    for instance in order {
        if cap_hit.is_some() {
            unplaced.push((instance.clone(), UnplacedReason::SearchBudgetExceeded));
            continue;
        }

        match space.find_slot(instance, config, attempts) {
            SlotSearch::Found(slot) => {
                space.commit(instance, slot, config);
                if space.anchors.len() > config.max_candidate_points {
                    debug!(
                        container = %container.id,
                        anchors = space.anchors.len(),
                        "candidate point cap reached"
                    );
                    cap_hit = Some(SearchCap::CandidatePoints);
                }
            }
            SlotSearch::NotFound => unplaced.push((instance.clone(), UnplacedReason::NoFit)),
            SlotSearch::BudgetExhausted => {
                debug!(container = %container.id, attempts = *attempts, "placement attempt budget reached");
                cap_hit = Some(SearchCap::PlacementAttempts);
                unplaced.push((instance.clone(), UnplacedReason::SearchBudgetExceeded));
            }
        }
    }

    EngineOutcome {
        placements: space.placements,
        unplaced,
        used_weight: space.used_weight,
        used_volume: space.used_volume,
        attempts: *attempts - spent_before,
        cap_hit,
    }
}

/// Chosen orientation and anchor for one instance.
#[derive(Clone, Copy, Debug)]
struct Slot {
    orientation: Orientation,
    anchor_index: usize,
}

enum SlotSearch {
    Found(Slot),
    NotFound,
    BudgetExhausted,
}

/// Working state of one container being filled.
struct LoadSpace {
    dims: Vec3,
    max_payload: f64,
    placements: Vec<Placement>,
    /// Kept sorted by (z, y, x).
    anchors: Vec<Vec3>,
    used_weight: f64,
    used_volume: f64,
}

impl LoadSpace {
    fn new(container: &ContainerType) -> Self {
        Self {
            dims: container.dims(),
            max_payload: container.max_payload,
            placements: Vec::new(),
            anchors: vec![Vec3::zero()],
            used_weight: 0.0,
            used_volume: 0.0,
        }
    }

    fn find_slot(
        &self,
        instance: &ItemInstance,
        config: &PackingConfig,
        attempts: &mut u64,
    ) -> SlotSearch {
        if self.used_weight + instance.weight > self.max_payload + config.general_epsilon {
            return SlotSearch::NotFound;
        }

        for orientation in orientation_priority(instance) {
            let extents = orientation.apply(instance.dims);
            if !extents.fits_within(&self.dims, config.general_epsilon) {
                continue;
            }

            for (anchor_index, anchor) in self.anchors.iter().enumerate() {
                if *attempts >= config.max_placement_attempts {
                    return SlotSearch::BudgetExhausted;
                }
                *attempts += 1;

                let candidate = BoundingBox::from_position_and_dims(*anchor, extents);
                if self.admits(instance, &candidate, config) {
                    return SlotSearch::Found(Slot {
                        orientation,
                        anchor_index,
                    });
                }
            }
        }

        SlotSearch::NotFound
    }

    /// Runs every geometric and stacking check for `candidate`.
    fn admits(&self, instance: &ItemInstance, candidate: &BoundingBox, config: &PackingConfig) -> bool {
        let eps = config.general_epsilon;
        let height_eps = config.height_epsilon;

        if !candidate.within(&self.dims, eps) {
            return false;
        }

        if self
            .placements
            .iter()
            .any(|p| p.bounding_box().intersects(candidate, eps))
        {
            return false;
        }

        if candidate.min.z > height_eps {
            let base_area = candidate.dimensions().base_area();
            let supported = support_area(candidate, &self.placements, height_eps);
            if supported + eps < base_area * config.support_fraction {
                return false;
            }
        }

        self.respects_stacking(instance, candidate, config)
    }

    /// Stacking rules in both directions: what lies below must accept the new
    /// box, and the new box must accept what already lies above it.
    fn respects_stacking(
        &self,
        instance: &ItemInstance,
        candidate: &BoundingBox,
        config: &PackingConfig,
    ) -> bool {
        let eps = config.general_epsilon;
        let height_eps = config.height_epsilon;
        let mut load_on_candidate = 0.0;

        for placed in &self.placements {
            let below = placed.bounding_box();

            if lies_above(candidate, &below, height_eps, eps) {
                let lower = &placed.instance;
                if !lower.stackable {
                    return false;
                }
                if lower.fragile && !instance.fragile && rests_on(candidate, &below, height_eps, eps)
                {
                    return false;
                }
                if let Some(max_load) = lower.max_load_on_top {
                    let load = load_above(&below, &self.placements, height_eps, eps);
                    if load + instance.weight > max_load + eps {
                        return false;
                    }
                }
            } else if lies_above(&below, candidate, height_eps, eps) {
                if !instance.stackable {
                    return false;
                }
                if instance.fragile
                    && !placed.instance.fragile
                    && rests_on(&below, candidate, height_eps, eps)
                {
                    return false;
                }
                load_on_candidate += placed.instance.weight;
            }
        }

        match instance.max_load_on_top {
            Some(max_load) => load_on_candidate <= max_load + eps,
            None => true,
        }
    }

    fn commit(&mut self, instance: &ItemInstance, slot: Slot, config: &PackingConfig) {
        let anchor = self.anchors.remove(slot.anchor_index);
        let placement = Placement::new(instance.clone(), slot.orientation, anchor);
        let bbox = placement.bounding_box();
        let eps = config.general_epsilon;

        self.used_weight += instance.weight;
        self.used_volume += placement.extents.volume();

        self.anchors.retain(|a| !bbox.covers_anchor(a, eps));

        let mut fresh = vec![
            Vec3::new(bbox.max.x, anchor.y, anchor.z),
            Vec3::new(anchor.x, bbox.max.y, anchor.z),
        ];
        if instance.stackable {
            fresh.push(Vec3::new(anchor.x, anchor.y, bbox.max.z));
        }

        self.placements.push(placement);

        for point in fresh {
            if self.accepts_anchor(&point, eps) {
                self.anchors.push(point);
            }
        }
        self.anchors.sort_by(anchor_order);
    }

    /// A new anchor must leave room inside the container, must not start
    /// inside a placed box and must not duplicate an existing anchor.
    fn accepts_anchor(&self, point: &Vec3, eps: f64) -> bool {
        if point.x >= self.dims.x - eps || point.y >= self.dims.y - eps || point.z >= self.dims.z - eps
        {
            return false;
        }
        if self
            .placements
            .iter()
            .any(|p| p.bounding_box().covers_anchor(point, eps))
        {
            return false;
        }
        !self.anchors.iter().any(|a| a.approx_eq(point, eps))
    }
}

/// Bottom-back-left preference: lowest z, then y, then x.
fn anchor_order(a: &Vec3, b: &Vec3) -> Ordering {
    a.z.total_cmp(&b.z)
        .then_with(|| a.y.total_cmp(&b.y))
        .then_with(|| a.x.total_cmp(&b.x))
}

/// Allowed orientations, largest face down first.
///
/// Orientations producing identical extents (cubes, square faces) are
/// tried only once. Ties keep the declared order.
fn orientation_priority(instance: &ItemInstance) -> Vec<Orientation> {
    let mut ranked: Vec<(Orientation, Vec3)> = Vec::with_capacity(instance.orientations.len());
    for &orientation in &instance.orientations {
        let extents = orientation.apply(instance.dims);
        if ranked.iter().all(|(_, seen)| *seen != extents) {
            ranked.push((orientation, extents));
        }
    }
    ranked.sort_by(|(_, a), (_, b)| b.base_area().total_cmp(&a.base_area()));
    ranked.into_iter().map(|(orientation, _)| orientation).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Item;

    fn instances(items: &[Item]) -> Vec<ItemInstance> {
        items.iter().flat_map(|i| i.instances()).collect()
    }

    fn find<'a>(outcome: &'a EngineOutcome, id: &str) -> &'a Placement {
        outcome
            .placements
            .iter()
            .find(|p| p.instance.instance_id == id)
            .unwrap_or_else(|| panic!("instance {} was not placed", id))
    }

    #[test]
    fn single_box_snaps_to_origin() {
        let items = instances(&[Item::new("a", (10.0, 10.0, 10.0), 10.0)]);
        let container = ContainerType::new("c", (20.0, 20.0, 20.0), 100.0);
        let outcome = pack(&items, &container, &PackingConfig::default());

        assert!(outcome.unplaced.is_empty());
        assert_eq!(find(&outcome, "a").position, Vec3::zero());
    }

    #[test]
    fn largest_volume_goes_first() {
        let items = instances(&[
            Item::new("small", (10.0, 10.0, 10.0), 50.0),
            Item::new("large", (20.0, 20.0, 20.0), 1.0),
        ]);
        let container = ContainerType::new("c", (40.0, 20.0, 20.0), 100.0);
        let outcome = pack(&items, &container, &PackingConfig::default());

        assert_eq!(outcome.placements[0].instance.instance_id, "large");
        assert_eq!(find(&outcome, "large").position, Vec3::zero());
        assert_eq!(find(&outcome, "small").position, Vec3::new(20.0, 0.0, 0.0));
    }

    #[test]
    fn largest_face_goes_down() {
        let items = instances(&[Item::new("plank", (10.0, 50.0, 100.0), 5.0)]);
        let container = ContainerType::new("c", (100.0, 100.0, 100.0), 100.0);
        let outcome = pack(&items, &container, &PackingConfig::default());

        let plank = find(&outcome, "plank");
        assert!((plank.extents.z - 10.0).abs() < EPSILON_GENERAL);
        assert!((plank.extents.base_area() - 5000.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn respects_non_rotatable_items() {
        let items = instances(&[Item::new("tall", (10.0, 10.0, 50.0), 5.0).non_rotatable()]);
        let container = ContainerType::new("c", (100.0, 100.0, 100.0), 100.0);
        let outcome = pack(&items, &container, &PackingConfig::default());
        assert_eq!(find(&outcome, "tall").orientation, Orientation::Lwh);
    }

    #[test]
    fn payload_limit_defers_items() {
        let items = instances(&[Item::new("heavy", (10.0, 10.0, 10.0), 300.0).with_quantity(3)]);
        let container = ContainerType::new("c", (20.0, 20.0, 20.0), 700.0);
        let outcome = pack(&items, &container, &PackingConfig::default());

        assert_eq!(outcome.placements.len(), 2);
        assert_eq!(outcome.unplaced.len(), 1);
        assert_eq!(outcome.unplaced[0].1, UnplacedReason::NoFit);
        assert!(outcome.used_weight <= container.max_payload);
    }

    #[test]
    fn boxes_stack_when_floor_is_full() {
        let items = instances(&[Item::new("cube", (10.0, 10.0, 10.0), 1.0).with_quantity(2)]);
        let container = ContainerType::new("c", (10.0, 10.0, 30.0), 100.0);
        let outcome = pack(&items, &container, &PackingConfig::default());

        assert!(outcome.unplaced.is_empty());
        assert_eq!(find(&outcome, "cube_2").position, Vec3::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn nothing_lands_on_non_stackable_items() {
        let items = instances(&[
            Item::new("base", (10.0, 10.0, 10.0), 5.0).non_stackable(),
            Item::new("top", (10.0, 10.0, 5.0), 1.0),
        ]);
        let container = ContainerType::new("c", (10.0, 10.0, 30.0), 100.0);
        let outcome = pack(&items, &container, &PackingConfig::default());

        assert_eq!(outcome.placements.len(), 1);
        assert_eq!(outcome.unplaced[0].0.instance_id, "top");
    }

    #[test]
    fn max_load_on_top_is_cumulative() {
        let items = instances(&[
            Item::new("base", (10.0, 10.0, 20.0), 50.0).with_max_load_on_top(15.0),
            Item::new("layer", (10.0, 10.0, 5.0), 10.0).with_quantity(2),
        ]);
        let config = PackingConfig::default();
        let container = ContainerType::new("c", (10.0, 10.0, 40.0), 1000.0);
        let outcome = pack(&items, &container, &config);

        // Only one 10 kg layer fits under the 15 kg limit of the base.
        assert_eq!(outcome.placements.len(), 2);
        assert_eq!(outcome.unplaced.len(), 1);
    }

    #[test]
    fn only_fragile_items_rest_on_fragile_items() {
        let container = ContainerType::new("c", (10.0, 10.0, 30.0), 1000.0);
        let config = PackingConfig::default();

        let sturdy_on_fragile = instances(&[
            Item::new("glass", (10.0, 10.0, 10.0), 5.0).fragile(),
            Item::new("box", (10.0, 10.0, 5.0), 1.0),
        ]);
        let outcome = pack(&sturdy_on_fragile, &container, &config);
        assert_eq!(outcome.placements.len(), 1);

        let fragile_on_fragile = instances(&[
            Item::new("glass", (10.0, 10.0, 10.0), 5.0).fragile(),
            Item::new("vase", (10.0, 10.0, 5.0), 1.0).fragile(),
        ]);
        let outcome = pack(&fragile_on_fragile, &container, &config);
        assert_eq!(outcome.placements.len(), 2);
    }

    #[test]
    fn insufficient_support_is_rejected() {
        let config = PackingConfig::default();
        let items = instances(&[
            Item::new("pillar", (10.0, 10.0, 10.0), 10.0).non_rotatable(),
            Item::new("slab", (20.0, 20.0, 2.0), 1.0).non_rotatable(),
        ]);
        // The slab can only go on top of the pillar, where just 25% is supported.
        let container = ContainerType::new("c", (20.0, 20.0, 12.0), 100.0);
        let outcome = pack(&items, &container, &config);
        let slab = outcome.placements.iter().find(|p| p.instance.instance_id == "slab");
        if let Some(slab) = slab {
            assert!(slab.position.z <= config.height_epsilon);
        }
        for p in &outcome.placements {
            if p.position.z > config.height_epsilon {
                let area = support_area(&p.bounding_box(), &outcome.placements, config.height_epsilon);
                assert!(area + EPSILON_GENERAL >= p.extents.base_area() * config.support_fraction);
            }
        }
    }

    #[test]
    fn attempt_budget_defers_remaining_items() {
        let items = instances(&[Item::new("cube", (10.0, 10.0, 10.0), 1.0).with_quantity(5)]);
        let container = ContainerType::new("c", (100.0, 100.0, 100.0), 1000.0);
        let config = PackingConfig::builder().max_placement_attempts(2).build();
        let outcome = pack(&items, &container, &config);

        assert_eq!(outcome.cap_hit, Some(SearchCap::PlacementAttempts));
        assert_eq!(outcome.placements.len() + outcome.unplaced.len(), 5);
        assert_eq!(outcome.deferred_by_budget(), outcome.unplaced.len());
        assert!(outcome.attempts <= 2);
    }

    #[test]
    fn zero_budget_places_nothing() {
        let items = instances(&[Item::new("cube", (10.0, 10.0, 10.0), 1.0)]);
        let container = ContainerType::new("c", (100.0, 100.0, 100.0), 1000.0);
        let config = PackingConfig::builder().max_placement_attempts(0).build();
        let outcome = pack(&items, &container, &config);

        assert!(outcome.placements.is_empty());
        assert_eq!(outcome.unplaced[0].1, UnplacedReason::SearchBudgetExceeded);
    }

    #[test]
    fn shared_counter_carries_spent_attempts_across_calls() {
        let items = instances(&[Item::new("cube", (10.0, 10.0, 10.0), 1.0).with_quantity(4)]);
        let container = ContainerType::new("c", (100.0, 100.0, 100.0), 1000.0);
        let config = PackingConfig::builder().max_placement_attempts(5).build();
        let mut attempts = 4;
        let outcome = pack_with_attempts(&items, &container, &config, &mut attempts);

        assert_eq!(attempts, 5);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.placements.len(), 1);
        assert_eq!(outcome.cap_hit, Some(SearchCap::PlacementAttempts));
        assert_eq!(outcome.deferred_by_budget(), 3);
    }

    #[test]
    fn candidate_cap_stops_the_search() {
        let items = instances(&[Item::new("cube", (10.0, 10.0, 10.0), 1.0).with_quantity(4)]);
        let container = ContainerType::new("c", (100.0, 100.0, 100.0), 1000.0);
        let config = PackingConfig::builder().max_candidate_points(2).build();
        let outcome = pack(&items, &container, &config);

        assert_eq!(outcome.cap_hit, Some(SearchCap::CandidatePoints));
        assert_eq!(outcome.placements.len(), 1);
        assert_eq!(outcome.deferred_by_budget(), 3);
    }

    #[test]
    fn no_overlaps_in_a_dense_load() {
        let items = instances(&[
            Item::new("a", (30.0, 20.0, 10.0), 5.0).with_quantity(6),
            Item::new("b", (15.0, 15.0, 15.0), 3.0).with_quantity(5),
            Item::new("c", (40.0, 10.0, 10.0), 8.0).with_quantity(3),
        ]);
        let container = ContainerType::new("c", (60.0, 40.0, 40.0), 1000.0);
        let config = PackingConfig::default();
        let outcome = pack(&items, &container, &config);

        for (i, a) in outcome.placements.iter().enumerate() {
            assert!(a.bounding_box().within(&container.dims(), config.general_epsilon));
            for b in outcome.placements.iter().skip(i + 1) {
                assert!(
                    !a.bounding_box().intersects(&b.bounding_box(), config.general_epsilon),
                    "{} overlaps {}",
                    a.instance.instance_id,
                    b.instance.instance_id
                );
            }
        }
        assert_eq!(outcome.placements.len() + outcome.unplaced.len(), items.len());
    }

    #[test]
    fn config_validation() {
        assert!(PackingConfig::default().validate().is_ok());
        assert!(PackingConfig::builder().support_fraction(0.0).build().validate().is_err());
        assert!(PackingConfig::builder().support_fraction(1.5).build().validate().is_err());
        assert!(PackingConfig::builder().max_candidate_points(0).build().validate().is_err());
        assert!(PackingConfig::builder().support_fraction(1.0).build().validate().is_ok());
    }
}
