//! Freight load planning: chargeable weight, container loading and
//! utilization analysis.
//!
//! The three operations below are the crate's entry points; the modules
//! expose the building blocks for callers that need finer control.
//!
//! ```
//! use load_planner::model::{ContainerType, Item};
//!
//! let catalog = vec![ContainerType::new("box", (100.0, 100.0, 100.0), 1000.0)];
//! let items = vec![Item::new("crate", (50.0, 50.0, 50.0), 100.0).with_quantity(2)];
//!
//! let result = load_planner::optimize_loading(&items, &catalog).unwrap();
//! assert!(result.is_complete());
//!
//! let report = load_planner::analyze_utilization(&result).unwrap();
//! assert_eq!(report.containers[0].weight_utilization, 20.0);
//! ```

pub mod api;
pub mod chargeable;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod model;
pub mod optimizer;
pub mod types;
pub mod utilization;

pub use chargeable::{ChargeableConfig, ChargeableWeight, ShipmentChargeable, TransportMode};
pub use engine::PackingConfig;
pub use error::{LoadingError, Result};
pub use model::{ContainerType, Item, Orientation, Placement, UnplacedReason};
pub use optimizer::{LoadingConfig, PackEvent, PackingResult};
pub use utilization::{UtilizationConfig, UtilizationReport};

/// Chargeable weight of one item line under the default configuration.
pub fn compute_chargeable_weight(item: &Item, mode: TransportMode) -> Result<ChargeableWeight> {
    chargeable::compute(item, mode, &ChargeableConfig::default())
}

pub fn compute_chargeable_weight_with_config(
    item: &Item,
    mode: TransportMode,
    config: &ChargeableConfig,
) -> Result<ChargeableWeight> {
    chargeable::compute(item, mode, config)
}

/// Allocates `items` to containers from `catalog` under the default configuration.
pub fn optimize_loading(items: &[Item], catalog: &[ContainerType]) -> Result<PackingResult> {
    optimizer::optimize_loading(items, catalog, &LoadingConfig::default())
}

pub fn optimize_loading_with_config(
    items: &[Item],
    catalog: &[ContainerType],
    config: &LoadingConfig,
) -> Result<PackingResult> {
    optimizer::optimize_loading(items, catalog, config)
}

/// Utilization report of a packing under the default configuration.
pub fn analyze_utilization(result: &PackingResult) -> Result<UtilizationReport> {
    utilization::analyze(result, &UtilizationConfig::default())
}

pub fn analyze_utilization_with_config(
    result: &PackingResult,
    config: &UtilizationConfig,
) -> Result<UtilizationReport> {
    utilization::analyze(result, config)
}
