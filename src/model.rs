//! Data models for container load planning.
//!
//! This module defines the fundamental data structures:
//! - `Item`: a cargo line with dimensions, weight, quantity and handling rules
//! - `ItemInstance`: one physical unit of an item, the unit the engine places
//! - `ContainerType`: an immutable catalog record describing a container's capacity
//! - `Placement`: an item instance with its orientation and anchor in a container
//! - `UnplacedReason`: why an instance ended up unplaced

use std::fmt;

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::error::{LoadingError, Result};
use crate::types::{BoundingBox, Vec3, validation};

/// One of the six axis-aligned rotations of a box.
///
/// The tag lists which item dimension lies along the container's
/// x (length), y (width) and z (height) axis: `Whl` puts the item's width
/// along x, its height along y and its length upright.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Lwh,
    Lhw,
    Wlh,
    Whl,
    Hlw,
    Hwl,
}

impl Orientation {
    /// All six rotations.
    pub const ALL: [Orientation; 6] = [
        Orientation::Lwh,
        Orientation::Lhw,
        Orientation::Wlh,
        Orientation::Whl,
        Orientation::Hlw,
        Orientation::Hwl,
    ];

    /// Rotations that keep the item's height vertical ("this side up").
    pub const UPRIGHT: [Orientation; 2] = [Orientation::Lwh, Orientation::Wlh];

    /// Maps item dimensions `(length, width, height)` to placed extents along x, y, z.
    pub fn apply(self, dims: Vec3) -> Vec3 {
        let (l, w, h) = dims.as_tuple();
        match self {
            Orientation::Lwh => Vec3::new(l, w, h),
            Orientation::Lhw => Vec3::new(l, h, w),
            Orientation::Wlh => Vec3::new(w, l, h),
            Orientation::Whl => Vec3::new(w, h, l),
            Orientation::Hlw => Vec3::new(h, l, w),
            Orientation::Hwl => Vec3::new(h, w, l),
        }
    }

    fn all_vec() -> Vec<Orientation> {
        Self::ALL.to_vec()
    }
}

fn default_quantity() -> u32 {
    1
}

fn default_stackable() -> bool {
    true
}

/// A cargo line as supplied by the caller.
///
/// Dimensions are in centimetres and weight in kilograms. `quantity` is
/// expanded into individual [`ItemInstance`]s before packing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "pallet-a",
    "length": 120.0,
    "width": 80.0,
    "height": 100.0,
    "weight": 250.0,
    "quantity": 4,
    "stackable": true,
    "orientations": ["lwh", "wlh"],
    "max_load_on_top": 500.0,
    "fragile": false
}))]
pub struct Item {
    pub id: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default = "default_stackable")]
    pub stackable: bool,
    #[serde(default = "Orientation::all_vec")]
    pub orientations: Vec<Orientation>,
    /// Maximum weight (kg) this item may bear on top; `None` means unlimited.
    #[serde(default)]
    pub max_load_on_top: Option<f64>,
    #[serde(default)]
    pub fragile: bool,
}

impl Item {
    /// Creates a stackable, freely rotatable item with quantity 1.
    ///
    /// # Examples
    /// ```
    /// use load_planner::model::Item;
    ///
    /// let item = Item::new("crate", (120.0, 80.0, 60.0), 40.0).with_quantity(3);
    /// assert!(item.validate().is_ok());
    /// assert_eq!(item.instances().count(), 3);
    /// ```
    pub fn new(id: impl Into<String>, dims: (f64, f64, f64), weight: f64) -> Self {
        Self {
            id: id.into(),
            length: dims.0,
            width: dims.1,
            height: dims.2,
            weight,
            quantity: 1,
            stackable: true,
            orientations: Orientation::all_vec(),
            max_load_on_top: None,
            fragile: false,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Marks the item as non-stackable: nothing may be placed above it.
    pub fn non_stackable(mut self) -> Self {
        self.stackable = false;
        self
    }

    /// Forbids any rotation.
    pub fn non_rotatable(mut self) -> Self {
        self.orientations = vec![Orientation::Lwh];
        self
    }

    pub fn with_orientations(mut self, orientations: &[Orientation]) -> Self {
        self.orientations = orientations.to_vec();
        self
    }

    pub fn with_max_load_on_top(mut self, max_load: f64) -> Self {
        self.max_load_on_top = Some(max_load);
        self
    }

    pub fn fragile(mut self) -> Self {
        self.fragile = true;
        self
    }

    /// Checks dimensions and weight only.
    ///
    /// This is all the chargeable-weight calculation needs.
    pub fn validate_dimensions(&self) -> Result<()> {
        let invalid = |reason: String| LoadingError::InvalidDimensions {
            item: self.id.clone(),
            reason,
        };
        validation::validate_dimensions_3d((self.length, self.width, self.height))
            .map_err(invalid)?;
        validation::validate_weight(self.weight, "Weight").map_err(invalid)?;
        Ok(())
    }

    /// Full validation, run before any placement attempt.
    pub fn validate(&self) -> Result<()> {
        self.validate_dimensions()?;
        let invalid = |reason: &str| LoadingError::InvalidItem {
            item: self.id.clone(),
            reason: reason.to_string(),
        };
        if self.id.trim().is_empty() {
            return Err(invalid("Identifier must not be empty"));
        }
        if self.quantity == 0 {
            return Err(invalid("Quantity must be at least 1"));
        }
        if self.orientations.is_empty() {
            return Err(invalid("At least one orientation must be allowed"));
        }
        if let Some(max_load) = self.max_load_on_top {
            validation::validate_non_negative(max_load, "Max load on top")
                .map_err(|reason| invalid(&reason))?;
        }
        Ok(())
    }

    /// Expands the item into `quantity` unit instances.
    ///
    /// A single item keeps its identifier; otherwise instances are named
    /// `"{id}_{k}"` with `k` counting from 1.
    pub fn instances(&self) -> impl Iterator<Item = ItemInstance> + '_ {
        let mut orientations = Vec::with_capacity(self.orientations.len());
        for orientation in &self.orientations {
            if !orientations.contains(orientation) {
                orientations.push(*orientation);
            }
        }

        (1..=self.quantity).map(move |ordinal| ItemInstance {
            instance_id: if self.quantity > 1 {
                format!("{}_{}", self.id, ordinal)
            } else {
                self.id.clone()
            },
            item_id: self.id.clone(),
            dims: Vec3::new(self.length, self.width, self.height),
            weight: self.weight,
            stackable: self.stackable,
            orientations: orientations.clone(),
            max_load_on_top: self.max_load_on_top,
            fragile: self.fragile,
        })
    }
}

/// A single physical unit of an [`Item`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ItemInstance {
    pub instance_id: String,
    pub item_id: String,
    pub dims: Vec3,
    pub weight: f64,
    pub stackable: bool,
    pub orientations: Vec<Orientation>,
    pub max_load_on_top: Option<f64>,
    pub fragile: bool,
}

impl ItemInstance {
    /// Allowed orientations whose extents fit inside `bounds`.
    pub fn fitting_orientations<'a>(
        &'a self,
        bounds: &'a Vec3,
        tolerance: f64,
    ) -> impl Iterator<Item = Orientation> + 'a {
        self.orientations
            .iter()
            .copied()
            .filter(move |o| o.apply(self.dims).fits_within(bounds, tolerance))
    }
}

/// A container type from the equipment catalog.
///
/// Internal dimensions are in centimetres, weights in kilograms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "20ft-dry",
    "length": 589.8,
    "width": 235.2,
    "height": 239.3,
    "max_payload": 28200.0,
    "tare_weight": 2200.0
}))]
pub struct ContainerType {
    pub id: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub max_payload: f64,
    #[serde(default)]
    pub tare_weight: f64,
}

impl ContainerType {
    pub fn new(id: impl Into<String>, dims: (f64, f64, f64), max_payload: f64) -> Self {
        Self {
            id: id.into(),
            length: dims.0,
            width: dims.1,
            height: dims.2,
            max_payload,
            tare_weight: 0.0,
        }
    }

    pub fn with_tare(mut self, tare_weight: f64) -> Self {
        self.tare_weight = tare_weight;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| LoadingError::InvalidContainer {
            container: self.id.clone(),
            reason,
        };
        validation::validate_dimensions_3d((self.length, self.width, self.height))
            .map_err(invalid)?;
        validation::validate_weight(self.max_payload, "Max payload").map_err(invalid)?;
        validation::validate_non_negative(self.tare_weight, "Tare weight").map_err(invalid)?;
        Ok(())
    }

    /// Internal dimensions as a vector.
    #[inline]
    pub fn dims(&self) -> Vec3 {
        Vec3::new(self.length, self.width, self.height)
    }

    /// Internal volume.
    pub fn volume(&self) -> f64 {
        self.dims().volume()
    }

    /// Checks whether the instance could fit into an empty container of this type.
    ///
    /// Returns the first blocking constraint, weight before dimensions.
    pub fn fit_blocker(&self, instance: &ItemInstance, tolerance: f64) -> Option<FitBlocker> {
        if instance.weight > self.max_payload + tolerance {
            return Some(FitBlocker::Weight);
        }
        let dims = self.dims();
        if instance.fitting_orientations(&dims, tolerance).next().is_none() {
            return Some(FitBlocker::Dimensions);
        }
        None
    }
}

/// An item instance fixed inside a container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Placement {
    pub instance: ItemInstance,
    pub orientation: Orientation,
    /// Minimum corner of the bounding box.
    pub position: Vec3,
    /// Extents along x, y, z after applying the orientation.
    pub extents: Vec3,
}

impl Placement {
    pub fn new(instance: ItemInstance, orientation: Orientation, position: Vec3) -> Self {
        let extents = orientation.apply(instance.dims);
        Self {
            instance,
            orientation,
            position,
            extents,
        }
    }

    /// Calculates the bounding box of the placed instance.
    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_position_and_dims(self.position, self.extents)
    }
}

/// Which constraint excludes an item from every container type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FitBlocker {
    Dimensions,
    Weight,
}

/// Reasons why an item instance could not be placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum UnplacedReason {
    /// No orientation/anchor combination worked in the container being filled.
    NoFit,
    /// The engine's attempt or candidate cap was reached before the item was tried.
    SearchBudgetExceeded,
    /// No catalog container type can ever hold the item on its own.
    NoContainerFits { blocker: FitBlocker },
}

impl UnplacedReason {
    pub fn code(&self) -> &'static str {
        match self {
            UnplacedReason::NoFit => "no_fit",
            UnplacedReason::SearchBudgetExceeded => "search_budget_exceeded",
            UnplacedReason::NoContainerFits { .. } => "no_container_fits",
        }
    }
}

impl fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnplacedReason::NoFit => {
                write!(f, "No stable position found in the container being filled")
            }
            UnplacedReason::SearchBudgetExceeded => {
                write!(
                    f,
                    "Search budget exhausted before the item could be placed; raise the budget and retry"
                )
            }
            UnplacedReason::NoContainerFits {
                blocker: FitBlocker::Weight,
            } => write!(f, "Item exceeds the payload of every container type"),
            UnplacedReason::NoContainerFits {
                blocker: FitBlocker::Dimensions,
            } => write!(
                f,
                "Item does not fit any container type in any allowed orientation"
            ),
        }
    }
}

/// An instance that ended up outside every container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UnplacedItem {
    pub instance: ItemInstance,
    pub reason: UnplacedReason,
}
