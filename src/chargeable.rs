//! Chargeable (billable) weight calculation.
//!
//! Carriers bill the greater of actual weight and volumetric weight, where
//! volumetric weight is the volume (cm³) divided by a per-mode divisor.
//! The result is always rounded *up* to the configured granularity.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{LoadingError, Result};
use crate::model::Item;

/// Cubic centimetres per cubic metre.
const CM3_PER_M3: f64 = 1_000_000.0;

/// Slack for floating-point noise when snapping to the granularity grid,
/// relative to one grid step.
const ROUNDING_SLACK: f64 = 1e-9;

/// Transport mode selecting the volumetric divisor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Air,
    Road,
    Sea,
}

impl TransportMode {
    pub const ALL: [TransportMode; 3] = [TransportMode::Air, TransportMode::Road, TransportMode::Sea];

    /// Parses a mode name case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "air" => Some(TransportMode::Air),
            "road" | "truck" => Some(TransportMode::Road),
            "sea" | "ocean" => Some(TransportMode::Sea),
            _ => None,
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Air => write!(f, "air"),
            TransportMode::Road => write!(f, "road"),
            TransportMode::Sea => write!(f, "sea"),
        }
    }
}

/// Divisors (cm³ per kg) and rounding policy.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChargeableConfig {
    pub air_divisor: f64,
    pub road_divisor: f64,
    pub sea_divisor: f64,
    /// Chargeable weight is rounded up to a multiple of this value.
    pub rounding_granularity: f64,
    /// Mode used when the optimizer annotates items.
    pub default_mode: TransportMode,
}

impl ChargeableConfig {
    pub const DEFAULT_AIR_DIVISOR: f64 = 6000.0;
    pub const DEFAULT_ROAD_DIVISOR: f64 = 3000.0;
    pub const DEFAULT_SEA_DIVISOR: f64 = 1000.0;
    pub const DEFAULT_ROUNDING_GRANULARITY: f64 = 0.5;

    /// Divisor configured for `mode`.
    pub fn divisor(&self, mode: TransportMode) -> f64 {
        match mode {
            TransportMode::Air => self.air_divisor,
            TransportMode::Road => self.road_divisor,
            TransportMode::Sea => self.sea_divisor,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for mode in TransportMode::ALL {
            let divisor = self.divisor(mode);
            if !(divisor.is_finite() && divisor > 0.0) {
                return Err(LoadingError::InvalidConfiguration(format!(
                    "{} divisor must be positive, got: {}",
                    mode, divisor
                )));
            }
        }
        if !(self.rounding_granularity.is_finite() && self.rounding_granularity > 0.0) {
            return Err(LoadingError::InvalidConfiguration(format!(
                "Rounding granularity must be positive, got: {}",
                self.rounding_granularity
            )));
        }
        Ok(())
    }
}

impl Default for ChargeableConfig {
    fn default() -> Self {
        Self {
            air_divisor: Self::DEFAULT_AIR_DIVISOR,
            road_divisor: Self::DEFAULT_ROAD_DIVISOR,
            sea_divisor: Self::DEFAULT_SEA_DIVISOR,
            rounding_granularity: Self::DEFAULT_ROUNDING_GRANULARITY,
            default_mode: TransportMode::default(),
        }
    }
}

/// Billable weight of an item line or a whole shipment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChargeableWeight {
    pub mode: TransportMode,
    pub divisor: f64,
    pub actual_weight: f64,
    pub volumetric_weight: f64,
    /// `max(actual, volumetric)` rounded up to the granularity.
    pub chargeable_weight: f64,
    /// Volume in cubic metres.
    pub cbm: f64,
}

impl ChargeableWeight {
    fn from_totals(
        actual_weight: f64,
        volume_cm3: f64,
        mode: TransportMode,
        config: &ChargeableConfig,
    ) -> Self {
        let divisor = config.divisor(mode);
        let volumetric_weight = volume_cm3 / divisor;
        let chargeable_weight =
            round_up(actual_weight.max(volumetric_weight), config.rounding_granularity);
        Self {
            mode,
            divisor,
            actual_weight,
            volumetric_weight,
            chargeable_weight,
            cbm: volume_cm3 / CM3_PER_M3,
        }
    }

    /// Whether the volumetric weight drives the bill.
    pub fn is_volumetric(&self) -> bool {
        self.volumetric_weight > self.actual_weight
    }
}

/// Chargeable weight of every item line plus the shipment total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShipmentChargeable {
    pub items: Vec<ItemChargeable>,
    pub total: ChargeableWeight,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ItemChargeable {
    pub item_id: String,
    pub weight: ChargeableWeight,
}

/// Computes the chargeable weight of one item line (all of its pieces).
///
/// # Errors
/// `InvalidDimensions` when any dimension or the weight is not positive;
/// `InvalidItem` for the other item checks, such as a zero quantity.
///
/// # Examples
/// ```
/// use load_planner::chargeable::{ChargeableConfig, TransportMode, compute};
/// use load_planner::model::Item;
///
/// let item = Item::new("carton", (60.0, 40.0, 138.0), 40.0);
/// let weight = compute(&item, TransportMode::Air, &ChargeableConfig::default()).unwrap();
/// assert!((weight.volumetric_weight - 55.2).abs() < 1e-9);
/// assert!((weight.chargeable_weight - 55.5).abs() < 1e-9);
/// ```
pub fn compute(
    item: &Item,
    mode: TransportMode,
    config: &ChargeableConfig,
) -> Result<ChargeableWeight> {
    item.validate()?;
    let pieces = f64::from(item.quantity);
    let volume = item.length * item.width * item.height * pieces;
    Ok(ChargeableWeight::from_totals(
        item.weight * pieces,
        volume,
        mode,
        config,
    ))
}

/// Computes the shipment-level chargeable weight.
///
/// Actual and volumetric weight are summed over all lines first; the
/// maximum is taken and rounded once, as carriers bill a consignment.
pub fn compute_shipment(
    items: &[Item],
    mode: TransportMode,
    config: &ChargeableConfig,
) -> Result<ShipmentChargeable> {
    let mut lines = Vec::with_capacity(items.len());
    let mut actual = 0.0;
    let mut volume = 0.0;

    for item in items {
        let weight = compute(item, mode, config)?;
        actual += weight.actual_weight;
        volume += item.length * item.width * item.height * f64::from(item.quantity);
        lines.push(ItemChargeable {
            item_id: item.id.clone(),
            weight,
        });
    }

    Ok(ShipmentChargeable {
        items: lines,
        total: ChargeableWeight::from_totals(actual, volume, mode, config),
    })
}

/// Rounds `value` up to the next multiple of `granularity`.
///
/// Values already on the grid (up to floating-point noise) stay put.
pub fn round_up(value: f64, granularity: f64) -> f64 {
    let steps = value / granularity;
    let nearest = steps.round();
    if (steps - nearest).abs() <= ROUNDING_SLACK {
        nearest * granularity
    } else {
        steps.ceil() * granularity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn volumetric_weight_rounds_up_to_half_unit() {
        let item = Item::new("carton", (60.0, 40.0, 138.0), 40.0);
        let weight = compute(&item, TransportMode::Air, &ChargeableConfig::default()).unwrap();
        assert_close(weight.actual_weight, 40.0);
        assert_close(weight.volumetric_weight, 55.2);
        assert_close(weight.chargeable_weight, 55.5);
        assert!(weight.is_volumetric());
    }

    #[test]
    fn dense_cargo_bills_actual_weight() {
        let item = Item::new("steel", (10.0, 10.0, 10.0), 12.3);
        let weight = compute(&item, TransportMode::Air, &ChargeableConfig::default()).unwrap();
        assert_close(weight.chargeable_weight, 12.5);
        assert!(!weight.is_volumetric());
    }

    #[test]
    fn values_on_the_grid_are_not_bumped() {
        assert_close(round_up(55.0, 0.5), 55.0);
        assert_close(round_up(0.1 + 0.2, 0.1), 0.3);
        assert_close(round_up(55.01, 0.5), 55.5);
        assert_close(round_up(7.0, 1.0), 7.0);
    }

    #[test]
    fn each_mode_uses_its_divisor() {
        let config = ChargeableConfig::default();
        let item = Item::new("bulky", (100.0, 100.0, 100.0), 1.0);
        let air = compute(&item, TransportMode::Air, &config).unwrap();
        let road = compute(&item, TransportMode::Road, &config).unwrap();
        let sea = compute(&item, TransportMode::Sea, &config).unwrap();
        assert_close(air.volumetric_weight, 1_000_000.0 / 6000.0);
        assert_close(road.volumetric_weight, 1_000_000.0 / 3000.0);
        assert_close(sea.volumetric_weight, 1000.0);
        assert_close(sea.cbm, 1.0);
    }

    #[test]
    fn quantity_scales_actual_and_volumetric_weight() {
        let config = ChargeableConfig::default();
        let single = compute(
            &Item::new("p", (50.0, 40.0, 30.0), 4.0),
            TransportMode::Air,
            &config,
        )
        .unwrap();
        let triple = compute(
            &Item::new("p", (50.0, 40.0, 30.0), 4.0).with_quantity(3),
            TransportMode::Air,
            &config,
        )
        .unwrap();
        assert_close(triple.actual_weight, single.actual_weight * 3.0);
        assert_close(triple.volumetric_weight, single.volumetric_weight * 3.0);
    }

    #[test]
    fn invalid_dimensions_are_rejected() {
        let config = ChargeableConfig::default();
        for item in [
            Item::new("a", (0.0, 1.0, 1.0), 1.0),
            Item::new("b", (1.0, -1.0, 1.0), 1.0),
            Item::new("c", (1.0, 1.0, 1.0), 0.0),
        ] {
            assert!(matches!(
                compute(&item, TransportMode::Sea, &config),
                Err(LoadingError::InvalidDimensions { .. })
            ));
        }
    }

    #[test]
    fn zero_quantity_is_rejected_like_the_optimiser_does() {
        let item = Item::new("carton", (60.0, 40.0, 138.0), 40.0).with_quantity(0);
        let err = compute(&item, TransportMode::Air, &ChargeableConfig::default()).unwrap_err();
        assert!(matches!(err, LoadingError::InvalidItem { .. }));

        let shipment = compute_shipment(&[item], TransportMode::Air, &ChargeableConfig::default());
        assert_eq!(shipment.unwrap_err(), err);
    }

    #[test]
    fn shipment_rounds_once_over_summed_lines() {
        let config = ChargeableConfig::default();
        let items = vec![
            Item::new("a", (60.0, 40.0, 138.0), 40.0),
            Item::new("b", (10.0, 10.0, 10.0), 12.3),
        ];
        let shipment = compute_shipment(&items, TransportMode::Air, &config).unwrap();
        assert_eq!(shipment.items.len(), 2);
        assert_close(shipment.total.actual_weight, 52.3);
        // 331_200 + 1_000 cm³ / 6000 = 55.3666..
        assert_close(shipment.total.volumetric_weight, 332_200.0 / 6000.0);
        assert_close(shipment.total.chargeable_weight, 55.5);
    }

    #[test]
    fn config_validation_rejects_bad_values() {
        let config = ChargeableConfig {
            sea_divisor: 0.0,
            ..ChargeableConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ChargeableConfig {
            rounding_granularity: -0.5,
            ..ChargeableConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(ChargeableConfig::default().validate().is_ok());
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!(TransportMode::parse(" AIR "), Some(TransportMode::Air));
        assert_eq!(TransportMode::parse("ocean"), Some(TransportMode::Sea));
        assert_eq!(TransportMode::parse("rail"), None);
    }
}
