//! Container selection across a catalog.
//!
//! The selector opens container instances one after another. For every new
//! instance it walks the catalog from the smallest type upwards (by internal
//! volume, ties broken by the larger payload) and takes the first type into
//! which the packing engine can put at least one remaining item. Placed
//! items leave the remaining set; the walk restarts with the smallest type.
//! When no type accepts anything, the rest is reported as unplaced.
//!
//! One placement attempt budget covers the whole request. Once it is spent,
//! no further container is opened and every remaining item is deferred as
//! [`UnplacedReason::SearchBudgetExceeded`].

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::chargeable::{self, ChargeableConfig, ShipmentChargeable};
use crate::engine::{self, PackingConfig, SearchCap};
use crate::error::{LoadingError, Result};
use crate::model::{
    ContainerType, FitBlocker, Item, ItemInstance, Orientation, Placement, UnplacedItem,
    UnplacedReason,
};
use crate::types::Vec3;
use crate::utilization::UtilizationConfig;

/// Complete configuration of one optimisation request.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoadingConfig {
    pub packing: PackingConfig,
    pub chargeable: ChargeableConfig,
    pub utilization: UtilizationConfig,
}

impl LoadingConfig {
    pub fn validate(&self) -> Result<()> {
        self.packing.validate()?;
        self.chargeable.validate()?;
        self.utilization.validate()?;
        Ok(())
    }
}

/// One opened container instance and its contents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PackedContainer {
    /// 1-based position in opening order.
    pub index: usize,
    pub container: ContainerType,
    pub placements: Vec<Placement>,
    pub used_weight: f64,
    pub used_volume: f64,
}

impl PackedContainer {
    pub fn item_count(&self) -> usize {
        self.placements.len()
    }
}

/// Advisory conditions that did not stop the computation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PackingWarning {
    /// A search cap cut a container's search short; raising the cap may
    /// place more items.
    SearchBudgetExceeded {
        container_type: String,
        cap: SearchCap,
        attempts: u64,
        deferred: usize,
    },
}

/// Result of a load optimisation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PackingResult {
    pub containers: Vec<PackedContainer>,
    pub unplaced: Vec<UnplacedItem>,
    #[serde(default)]
    pub warnings: Vec<PackingWarning>,
    /// `(orientation, anchor)` evaluations spent on the whole request.
    #[serde(default)]
    pub search_attempts: u64,
    /// Billable weight of the request's items, when computed by [`optimize_loading`].
    #[serde(default)]
    pub chargeable: Option<ShipmentChargeable>,
}

impl PackingResult {
    /// Whether all instances were packed.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn unplaced_count(&self) -> usize {
        self.unplaced.len()
    }

    pub fn placed_count(&self) -> usize {
        self.containers.iter().map(PackedContainer::item_count).sum()
    }

    /// Total weight of all packed instances.
    pub fn total_packed_weight(&self) -> f64 {
        self.containers.iter().map(|c| c.used_weight).sum()
    }
}

/// Events emitted while allocating, suitable for live visualisation.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// A new container instance was committed.
    ContainerOpened {
        index: usize,
        container_type: String,
        dims: Vec3,
        max_payload: f64,
    },
    /// An instance was placed.
    ItemPlaced {
        container_index: usize,
        instance_id: String,
        orientation: Orientation,
        position: Vec3,
        extents: Vec3,
        weight: f64,
        container_weight: f64,
    },
    /// An instance ended up unplaced.
    ItemRejected {
        instance_id: String,
        reason_code: String,
        reason_text: String,
    },
    /// A search cap was hit while trying a container type.
    BudgetExceeded {
        container_type: String,
        cap: SearchCap,
        attempts: u64,
        deferred: usize,
    },
    /// Allocation finished.
    Finished { containers: usize, unplaced: usize },
}

/// Optimises the loading of `items` into containers from `catalog`.
///
/// Validates all input eagerly, allocates containers, and annotates the
/// result with the shipment's chargeable weight in the configured mode.
///
/// # Errors
/// Malformed items, container types or configuration. Unplaceable items are
/// not errors; they are listed in [`PackingResult::unplaced`].
pub fn optimize_loading(
    items: &[Item],
    catalog: &[ContainerType],
    config: &LoadingConfig,
) -> Result<PackingResult> {
    optimize_loading_with_progress(items, catalog, config, |_| ControlFlow::Continue(()))
}

/// Like [`optimize_loading`], reporting progress through `on_event`.
///
/// Returning [`ControlFlow::Break`] from `on_event` stops the computation
/// with [`LoadingError::Cancelled`].
pub fn optimize_loading_with_progress(
    items: &[Item],
    catalog: &[ContainerType],
    config: &LoadingConfig,
    on_event: impl FnMut(&PackEvent) -> ControlFlow<()>,
) -> Result<PackingResult> {
    config.validate()?;
    let chargeable = chargeable::compute_shipment(
        items,
        config.chargeable.default_mode,
        &config.chargeable,
    )?;
    let mut result = allocate_with_progress(items, catalog, &config.packing, on_event)?;
    result.chargeable = Some(chargeable);
    Ok(result)
}

/// Allocates `items` to container instances drawn from `catalog`.
pub fn allocate(
    items: &[Item],
    catalog: &[ContainerType],
    config: &PackingConfig,
) -> Result<PackingResult> {
    allocate_with_progress(items, catalog, config, |_| ControlFlow::Continue(()))
}

/// Allocation with a live progress callback that may cancel the run.
pub fn allocate_with_progress(
    items: &[Item],
    catalog: &[ContainerType],
    config: &PackingConfig,
    mut on_event: impl FnMut(&PackEvent) -> ControlFlow<()>,
) -> Result<PackingResult> {
    config.validate()?;
    for container in catalog {
        container.validate()?;
    }
    let instances = expand_instances(items)?;
    let input_order: HashMap<String, usize> = instances
        .iter()
        .enumerate()
        .map(|(idx, instance)| (instance.instance_id.clone(), idx))
        .collect();

    let mut types: Vec<&ContainerType> = catalog.iter().collect();
    types.sort_by(|a, b| catalog_order(a, b));

    let mut result = PackingResult::default();
    let mut remaining = Vec::with_capacity(instances.len());

    for instance in instances {
        if types
            .iter()
            .any(|ty| ty.fit_blocker(&instance, config.general_epsilon).is_none())
        {
            remaining.push(instance);
        } else {
            let blocker = blocker_across_catalog(&types, &instance, config);
            result.unplaced.push(UnplacedItem {
                instance,
                reason: UnplacedReason::NoContainerFits { blocker },
            });
        }
    }

    let mut attempts = 0u64;
    while !remaining.is_empty() {
        let mut committed = false;
        let mut budget_spent = false;

        for ty in &types {
            let outcome = engine::pack_with_attempts(&remaining, ty, config, &mut attempts);

            if let Some(cap) = outcome.cap_hit {
                let deferred = outcome.deferred_by_budget();
                warn!(
                    container_type = %ty.id,
                    ?cap,
                    attempts = outcome.attempts,
                    deferred,
                    "search budget exceeded"
                );
                emit(
                    &mut on_event,
                    PackEvent::BudgetExceeded {
                        container_type: ty.id.clone(),
                        cap,
                        attempts: outcome.attempts,
                        deferred,
                    },
                )?;
                result.warnings.push(PackingWarning::SearchBudgetExceeded {
                    container_type: ty.id.clone(),
                    cap,
                    attempts: outcome.attempts,
                    deferred,
                });
                budget_spent = cap == SearchCap::PlacementAttempts;
            }

            if !outcome.placements.is_empty() {
                commit_container(&mut result, &mut remaining, ty, outcome, &mut on_event)?;
                committed = true;
            }
            if committed || budget_spent {
                break;
            }
            debug!(container_type = %ty.id, "no placement, escalating to next container type");
        }

        if budget_spent {
            result.unplaced.extend(remaining.drain(..).map(|instance| UnplacedItem {
                instance,
                reason: UnplacedReason::SearchBudgetExceeded,
            }));
        } else if !committed {
            for instance in remaining.drain(..) {
                let blocker = blocker_across_catalog(&types, &instance, config);
                result.unplaced.push(UnplacedItem {
                    instance,
                    reason: UnplacedReason::NoContainerFits { blocker },
                });
            }
        }
    }
    result.search_attempts = attempts;

    result
        .unplaced
        .sort_by_key(|entry| input_order.get(&entry.instance.instance_id).copied());
    for entry in &result.unplaced {
        emit(
            &mut on_event,
            PackEvent::ItemRejected {
                instance_id: entry.instance.instance_id.clone(),
                reason_code: entry.reason.code().to_string(),
                reason_text: entry.reason.to_string(),
            },
        )?;
    }
    emit(
        &mut on_event,
        PackEvent::Finished {
            containers: result.containers.len(),
            unplaced: result.unplaced.len(),
        },
    )?;

    Ok(result)
}

/// Records a filled container and removes its items from `remaining`.
fn commit_container(
    result: &mut PackingResult,
    remaining: &mut Vec<ItemInstance>,
    ty: &ContainerType,
    outcome: engine::EngineOutcome,
    on_event: &mut impl FnMut(&PackEvent) -> ControlFlow<()>,
) -> Result<()> {
    let index = result.containers.len() + 1;
    debug!(
        container_type = %ty.id,
        index,
        placed = outcome.placements.len(),
        "container committed"
    );
    emit(
        &mut *on_event,
        PackEvent::ContainerOpened {
            index,
            container_type: ty.id.clone(),
            dims: ty.dims(),
            max_payload: ty.max_payload,
        },
    )?;

    let mut running_weight = 0.0;
    for placement in &outcome.placements {
        running_weight += placement.instance.weight;
        emit(
            &mut *on_event,
            PackEvent::ItemPlaced {
                container_index: index,
                instance_id: placement.instance.instance_id.clone(),
                orientation: placement.orientation,
                position: placement.position,
                extents: placement.extents,
                weight: placement.instance.weight,
                container_weight: running_weight,
            },
        )?;
    }

    let placed: HashSet<&str> = outcome
        .placements
        .iter()
        .map(|p| p.instance.instance_id.as_str())
        .collect();
    remaining.retain(|instance| !placed.contains(instance.instance_id.as_str()));

    result.containers.push(PackedContainer {
        index,
        container: ty.clone(),
        placements: outcome.placements,
        used_weight: outcome.used_weight,
        used_volume: outcome.used_volume,
    });
    Ok(())
}

/// Hands one event to the consumer; a break cancels the run.
fn emit(on_event: &mut impl FnMut(&PackEvent) -> ControlFlow<()>, event: PackEvent) -> Result<()> {
    match on_event(&event) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(()) => Err(LoadingError::Cancelled),
    }
}

/// Runs the eager validation pass of [`optimize_loading`] without packing.
pub fn validate_input(items: &[Item], catalog: &[ContainerType], config: &LoadingConfig) -> Result<()> {
    config.validate()?;
    for container in catalog {
        container.validate()?;
    }
    expand_instances(items).map(|_| ())
}

/// Validates every item and expands quantities into unit instances.
fn expand_instances(items: &[Item]) -> Result<Vec<ItemInstance>> {
    for item in items {
        item.validate()?;
    }

    let mut seen = HashSet::new();
    let mut instances = Vec::new();
    for item in items {
        for instance in item.instances() {
            if !seen.insert(instance.instance_id.clone()) {
                return Err(LoadingError::DuplicateItem(instance.instance_id));
            }
            instances.push(instance);
        }
    }
    Ok(instances)
}

/// Smallest volume first; equal volumes prefer the larger payload.
fn catalog_order(a: &ContainerType, b: &ContainerType) -> Ordering {
    a.volume()
        .total_cmp(&b.volume())
        .then_with(|| b.max_payload.total_cmp(&a.max_payload))
        .then_with(|| a.id.cmp(&b.id))
}

fn blocker_across_catalog(
    types: &[&ContainerType],
    instance: &ItemInstance,
    config: &PackingConfig,
) -> FitBlocker {
    let weight_blocked = !types.is_empty()
        && types
            .iter()
            .all(|ty| instance.weight > ty.max_payload + config.general_epsilon);
    if weight_blocked {
        FitBlocker::Weight
    } else {
        FitBlocker::Dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_yields_empty_result() {
        let catalog = vec![ContainerType::new("c", (10.0, 10.0, 10.0), 100.0)];
        let result = allocate(&[], &catalog, &PackingConfig::default()).unwrap();
        assert!(result.containers.is_empty());
        assert!(result.is_complete());
    }

    #[test]
    fn empty_catalog_rejects_everything() {
        let items = vec![Item::new("a", (1.0, 1.0, 1.0), 1.0).with_quantity(2)];
        let result = allocate(&items, &[], &PackingConfig::default()).unwrap();
        assert!(result.containers.is_empty());
        assert_eq!(result.unplaced.len(), 2);
        assert!(result.unplaced.iter().all(|u| u.reason
            == UnplacedReason::NoContainerFits {
                blocker: FitBlocker::Dimensions
            }));
    }

    #[test]
    fn opens_additional_containers_when_payload_is_exceeded() {
        let items = vec![Item::new("heavy", (10.0, 10.0, 10.0), 300.0).with_quantity(3)];
        let catalog = vec![ContainerType::new("c", (20.0, 20.0, 20.0), 400.0)];
        let result = allocate(&items, &catalog, &PackingConfig::default()).unwrap();

        assert_eq!(result.container_count(), 3);
        assert!(result.is_complete());
        for container in &result.containers {
            assert_eq!(container.item_count(), 1);
        }
        let indices: Vec<_> = result.containers.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn escalates_to_larger_type_for_oversized_items() {
        let catalog = vec![
            ContainerType::new("large", (40.0, 40.0, 40.0), 100.0),
            ContainerType::new("small", (12.0, 12.0, 12.0), 30.0),
        ];
        let items = vec![
            Item::new("big", (30.0, 30.0, 20.0), 90.0),
            Item::new("cube", (10.0, 10.0, 10.0), 15.0),
        ];
        let result = allocate(&items, &catalog, &PackingConfig::default()).unwrap();

        // The small type takes the cube first; the big item needs the large type.
        assert!(result.is_complete());
        assert_eq!(result.container_count(), 2);
        assert_eq!(result.containers[0].container.id, "small");
        assert_eq!(result.containers[1].container.id, "large");
    }

    #[test]
    fn equal_volume_prefers_larger_payload() {
        let catalog = vec![
            ContainerType::new("light", (10.0, 10.0, 10.0), 50.0),
            ContainerType::new("strong", (10.0, 10.0, 10.0), 500.0),
        ];
        let items = vec![Item::new("a", (5.0, 5.0, 5.0), 10.0)];
        let result = allocate(&items, &catalog, &PackingConfig::default()).unwrap();
        assert_eq!(result.containers[0].container.id, "strong");
    }

    #[test]
    fn too_heavy_for_every_type_is_reported_with_weight_blocker() {
        let catalog = vec![ContainerType::new("c", (10.0, 10.0, 10.0), 10.0)];
        let items = vec![Item::new("anvil", (5.0, 5.0, 5.0), 25.0)];
        let result = allocate(&items, &catalog, &PackingConfig::default()).unwrap();

        assert!(result.containers.is_empty());
        assert_eq!(
            result.unplaced[0].reason,
            UnplacedReason::NoContainerFits {
                blocker: FitBlocker::Weight
            }
        );
    }

    #[test]
    fn duplicate_identifiers_are_rejected() {
        let catalog = vec![ContainerType::new("c", (10.0, 10.0, 10.0), 100.0)];
        let items = vec![
            Item::new("a", (1.0, 1.0, 1.0), 1.0).with_quantity(2),
            Item::new("a_1", (1.0, 1.0, 1.0), 1.0),
        ];
        assert_eq!(
            allocate(&items, &catalog, &PackingConfig::default()),
            Err(LoadingError::DuplicateItem("a_1".to_string()))
        );
    }

    #[test]
    fn invalid_catalog_entry_fails_the_request() {
        let catalog = vec![ContainerType::new("broken", (10.0, -1.0, 10.0), 100.0)];
        let items = vec![Item::new("a", (1.0, 1.0, 1.0), 1.0)];
        assert!(matches!(
            allocate(&items, &catalog, &PackingConfig::default()),
            Err(LoadingError::InvalidContainer { .. })
        ));
    }

    #[test]
    fn exhausted_budget_is_surfaced_as_warning() {
        let catalog = vec![ContainerType::new("c", (100.0, 100.0, 100.0), 1000.0)];
        let items = vec![Item::new("cube", (10.0, 10.0, 10.0), 1.0).with_quantity(3)];
        let config = PackingConfig::builder().max_placement_attempts(0).build();
        let result = allocate(&items, &catalog, &config).unwrap();

        assert!(result.containers.is_empty());
        assert_eq!(result.unplaced.len(), 3);
        assert!(
            result
                .unplaced
                .iter()
                .all(|u| u.reason == UnplacedReason::SearchBudgetExceeded)
        );
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn attempt_budget_covers_the_whole_request() {
        let catalog = vec![ContainerType::new("c", (100.0, 100.0, 100.0), 1000.0)];
        let items = vec![Item::new("cube", (10.0, 10.0, 10.0), 1.0).with_quantity(20)];
        let config = PackingConfig::builder().max_placement_attempts(3).build();
        let result = allocate(&items, &catalog, &config).unwrap();

        assert!(result.search_attempts <= config.max_placement_attempts);
        assert_eq!(result.container_count(), 1);
        assert_eq!(result.placed_count(), 3);
        assert!(!result.is_complete());
        assert_eq!(result.unplaced.len(), 17);
        assert!(
            result
                .unplaced
                .iter()
                .all(|u| u.reason == UnplacedReason::SearchBudgetExceeded)
        );
        assert_eq!(
            result.warnings,
            vec![PackingWarning::SearchBudgetExceeded {
                container_type: "c".to_string(),
                cap: SearchCap::PlacementAttempts,
                attempts: 3,
                deferred: 17,
            }]
        );
    }

    #[test]
    fn candidate_cap_defers_to_a_fresh_container() {
        let catalog = vec![ContainerType::new("c", (100.0, 100.0, 100.0), 1000.0)];
        let items = vec![Item::new("cube", (10.0, 10.0, 10.0), 1.0).with_quantity(3)];
        let config = PackingConfig::builder().max_candidate_points(2).build();
        let result = allocate(&items, &catalog, &config).unwrap();

        // The anchor cap is per container, so the search resumes in the next one.
        assert!(result.is_complete());
        assert_eq!(result.container_count(), 3);
        assert!(result.warnings.iter().all(|w| matches!(
            w,
            PackingWarning::SearchBudgetExceeded {
                cap: SearchCap::CandidatePoints,
                ..
            }
        )));
    }

    #[test]
    fn progress_events_cover_every_instance() {
        let catalog = vec![ContainerType::new("c", (20.0, 20.0, 20.0), 100.0)];
        let items = vec![
            Item::new("a", (10.0, 10.0, 10.0), 5.0).with_quantity(2),
            Item::new("huge", (50.0, 50.0, 50.0), 5.0),
        ];
        let mut placed = 0;
        let mut rejected = 0;
        let mut finished = false;
        allocate_with_progress(&items, &catalog, &PackingConfig::default(), |evt| {
            match evt {
                PackEvent::ItemPlaced { .. } => placed += 1,
                PackEvent::ItemRejected { .. } => rejected += 1,
                PackEvent::Finished { .. } => finished = true,
                _ => {}
            }
            ControlFlow::Continue(())
        })
        .unwrap();

        assert_eq!(placed, 2);
        assert_eq!(rejected, 1);
        assert!(finished);
    }

    #[test]
    fn optimize_loading_annotates_chargeable_weight() {
        let catalog = vec![ContainerType::new("c", (200.0, 200.0, 200.0), 1000.0)];
        let items = vec![Item::new("carton", (60.0, 40.0, 138.0), 40.0)];
        let result = optimize_loading(&items, &catalog, &LoadingConfig::default()).unwrap();

        let chargeable = result.chargeable.expect("chargeable weight is attached");
        assert_eq!(chargeable.items.len(), 1);
        assert!((chargeable.total.chargeable_weight - 55.5).abs() < 1e-9);
    }

    #[test]
    fn invalid_item_fails_before_any_search() {
        let catalog = vec![ContainerType::new("c", (200.0, 200.0, 200.0), 1000.0)];
        let items = vec![
            Item::new("ok", (10.0, 10.0, 10.0), 1.0),
            Item::new("flat", (10.0, 0.0, 10.0), 1.0),
        ];
        let mut events = 0;
        let outcome =
            optimize_loading_with_progress(&items, &catalog, &LoadingConfig::default(), |_| {
                events += 1;
                ControlFlow::Continue(())
            });
        assert!(matches!(outcome, Err(LoadingError::InvalidDimensions { .. })));
        assert_eq!(events, 0);
    }

    #[test]
    fn breaking_the_progress_stream_cancels_the_run() {
        let catalog = vec![ContainerType::new("c", (20.0, 20.0, 20.0), 100.0)];
        let items = vec![Item::new("a", (10.0, 10.0, 10.0), 5.0).with_quantity(20)];
        let mut seen = Vec::new();
        let outcome = allocate_with_progress(&items, &catalog, &PackingConfig::default(), |evt| {
            seen.push(evt.clone());
            match evt {
                PackEvent::ContainerOpened { .. } => ControlFlow::Break(()),
                _ => ControlFlow::Continue(()),
            }
        });

        assert_eq!(outcome, Err(LoadingError::Cancelled));
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], PackEvent::ContainerOpened { index: 1, .. }));
    }
}
