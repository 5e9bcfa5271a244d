//! Utilization statistics and consolidation hints for a finished packing.
//!
//! The analysis is a one-shot pass over an existing [`PackingResult`]; it
//! never calls back into the packing engine. Figures are derived from the
//! placements themselves, so a result received over the wire is analysed on
//! what it actually contains.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{LoadingError, Result};
use crate::optimizer::{PackedContainer, PackingResult};

/// Tunables of the analyzer.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UtilizationConfig {
    /// Volume fraction in `[0, 1]` below which a container is a
    /// consolidation candidate.
    pub consolidation_threshold: f64,
}

impl UtilizationConfig {
    pub const DEFAULT_CONSOLIDATION_THRESHOLD: f64 = 0.40;

    pub fn validate(&self) -> Result<()> {
        let threshold = self.consolidation_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(LoadingError::InvalidConfiguration(format!(
                "Consolidation threshold must be within [0, 1], got: {}",
                threshold
            )));
        }
        Ok(())
    }
}

impl Default for UtilizationConfig {
    fn default() -> Self {
        Self {
            consolidation_threshold: Self::DEFAULT_CONSOLIDATION_THRESHOLD,
        }
    }
}

/// Figures of one container instance. Percentages lie in `[0, 100]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContainerUtilization {
    pub index: usize,
    pub container_type: String,
    pub item_count: usize,
    pub used_weight: f64,
    pub used_volume: f64,
    pub remaining_weight: f64,
    pub remaining_volume: f64,
    pub weight_utilization: f64,
    pub volume_utilization: f64,
}

/// Advisory: the contents of `source` would fit into the spare capacity of `target`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConsolidationHint {
    pub source: usize,
    pub target: usize,
    /// Volume utilization of the source in percent.
    pub source_volume_utilization: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UtilizationReport {
    pub containers: Vec<ContainerUtilization>,
    pub overall_weight_utilization: f64,
    pub overall_volume_utilization: f64,
    pub items_placed: usize,
    pub items_total: usize,
    /// Share of instances that were placed, in percent.
    pub placement_efficiency: f64,
    pub consolidation_hints: Vec<ConsolidationHint>,
}

/// Summarises `result`.
pub fn analyze(result: &PackingResult, config: &UtilizationConfig) -> Result<UtilizationReport> {
    config.validate()?;

    let containers: Vec<ContainerUtilization> =
        result.containers.iter().map(container_utilization).collect();

    let total_volume: f64 = result.containers.iter().map(|c| c.container.volume()).sum();
    let total_payload: f64 = result.containers.iter().map(|c| c.container.max_payload).sum();
    let used_volume: f64 = containers.iter().map(|c| c.used_volume).sum();
    let used_weight: f64 = containers.iter().map(|c| c.used_weight).sum();

    let items_placed: usize = containers.iter().map(|c| c.item_count).sum();
    let items_total = items_placed + result.unplaced.len();
    let placement_efficiency = if items_total == 0 {
        100.0
    } else {
        percent(items_placed as f64, items_total as f64)
    };

    let consolidation_hints = consolidation_hints(&containers, config);

    Ok(UtilizationReport {
        overall_weight_utilization: percent(used_weight, total_payload),
        overall_volume_utilization: percent(used_volume, total_volume),
        items_placed,
        items_total,
        placement_efficiency,
        consolidation_hints,
        containers,
    })
}

fn container_utilization(packed: &PackedContainer) -> ContainerUtilization {
    let used_weight: f64 = packed.placements.iter().map(|p| p.instance.weight).sum();
    let used_volume: f64 = packed.placements.iter().map(|p| p.extents.volume()).sum();
    let volume = packed.container.volume();
    let payload = packed.container.max_payload;

    ContainerUtilization {
        index: packed.index,
        container_type: packed.container.id.clone(),
        item_count: packed.placements.len(),
        used_weight,
        used_volume,
        remaining_weight: (payload - used_weight).max(0.0),
        remaining_volume: (volume - used_volume).max(0.0),
        weight_utilization: percent(used_weight, payload),
        volume_utilization: percent(used_volume, volume),
    }
}

/// Pairs each underfilled container with the instance that has the most
/// spare volume able to take its whole contents. Two underfilled containers
/// may each be suggested as the other's target.
fn consolidation_hints(
    containers: &[ContainerUtilization],
    config: &UtilizationConfig,
) -> Vec<ConsolidationHint> {
    let threshold = config.consolidation_threshold * 100.0;
    let mut hints = Vec::new();

    for source in containers {
        if source.volume_utilization >= threshold {
            continue;
        }

        let best = containers
            .iter()
            .filter(|target| target.index != source.index)
            .filter(|target| {
                target.remaining_volume >= source.used_volume
                    && target.remaining_weight >= source.used_weight
            })
            // Reversed index order makes the lowest index win ties.
            .max_by(|a, b| {
                a.remaining_volume
                    .total_cmp(&b.remaining_volume)
                    .then_with(|| b.index.cmp(&a.index))
            });

        if let Some(target) = best {
            hints.push(ConsolidationHint {
                source: source.index,
                target: target.index,
                source_volume_utilization: source.volume_utilization,
            });
        }
    }

    hints
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 || !part.is_finite() {
        return 0.0;
    }
    (part / whole * 100.0).clamp(0.0, 100.0)
}
