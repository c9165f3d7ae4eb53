//! # Spoke Length Calculation
//!
//! Computes left and right spoke lengths from parsed wheel geometry.
//!
//! ## Method
//!
//! For each side, with `A` the flange radius and `B` the rim radius:
//!
//! ```text
//! θ      = 2π · crossings / (spokes / 2)
//! C      = sqrt(A² + B² − 2·A·B·cos θ)        (C = |A − B| when radial)
//! length = sqrt(C² + flange_distance²) − spoke_hole / 2
//! ```
//!
//! The length is then truncated (never rounded up) to 0.1 mm.
//!
//! ## Example
//!
//! ```rust
//! use spoke_core::calculations::spoke::compute;
//! use spoke_core::inputs::{CalculationInputs, Field};
//!
//! let inputs = CalculationInputs::default()
//!     .with(Field::Erd, "590")
//!     .with(Field::PitchCircleLeft, "45")
//!     .with(Field::PitchCircleRight, "45")
//!     .with(Field::FlangeDistanceLeft, "35")
//!     .with(Field::FlangeDistanceRight, "20")
//!     .with(Field::SpokeHoleDiameter, "2.6")
//!     .with(Field::NumberOfSpokes, "32")
//!     .with(Field::CrossingsLeft, "3")
//!     .with(Field::CrossingsRight, "3");
//!
//! let result = compute(&inputs).unwrap();
//! assert_eq!(result.left, Some(287.9));
//! assert_eq!(result.right, Some(286.5));
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::{CalcError, CalcResult};
use crate::inputs::{CalculationInputs, SideGeometry, WheelGeometry};

/// Which flange a spoke is laced into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn display_name(&self) -> &'static str {
        match self {
            Side::Left => "Left",
            Side::Right => "Right",
        }
    }
}

/// Spoke lengths in mm, truncated to 0.1 mm. `None` until calculated.
///
/// ## JSON Example
///
/// ```json
/// { "left": 287.9, "right": 286.5 }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    #[serde(default, deserialize_with = "lenient_length")]
    pub left: Option<f64>,
    #[serde(default, deserialize_with = "lenient_length")]
    pub right: Option<f64>,
}

/// Reads anything other than a finite number as "not calculated".
fn lenient_length<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()).filter(|v| v.is_finite()))
}

impl CalculationResult {
    /// Result with both sides present
    pub fn both(left: f64, right: f64) -> Self {
        CalculationResult {
            left: Some(left),
            right: Some(right),
        }
    }

    /// True when both sides have a length
    pub fn is_complete(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    /// Length for one side
    pub fn side(&self, side: Side) -> Option<f64> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Both lengths, or an IncompleteResult error naming `action`
    pub fn require_complete(&self, action: &str) -> CalcResult<(f64, f64)> {
        match (self.left, self.right) {
            (Some(left), Some(right)) => Ok((left, right)),
            _ => Err(CalcError::incomplete_result(action)),
        }
    }
}

/// Intermediate values of one side's calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideBreakdown {
    pub side: Side,
    /// Flange radius A = PCD / 2 (mm)
    pub flange_radius_mm: f64,
    /// Rim radius B = ERD / 2 (mm)
    pub rim_radius_mm: f64,
    pub spokes_per_side: u32,
    pub crossings: u32,
    /// Angle between flange hole and rim hole (rad)
    pub angle_rad: f64,
    /// Planar distance flange hole to rim hole (mm)
    pub chord_mm: f64,
    /// Length before truncation (mm)
    pub raw_length_mm: f64,
    /// Length truncated to 0.1 mm
    pub length_mm: f64,
}

/// Both sides' intermediate values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpokeBreakdown {
    pub left: SideBreakdown,
    pub right: SideBreakdown,
}

impl SpokeBreakdown {
    pub fn result(&self) -> CalculationResult {
        CalculationResult::both(self.left.length_mm, self.right.length_mm)
    }
}

/// Truncate a length to the 0.1 mm below it.
pub fn floor_to_tenth(length_mm: f64) -> f64 {
    (length_mm * 10.0).floor() / 10.0
}

/// Planar flange-hole to rim-hole distance.
///
/// A radial spoke (`crossings == 0`) is `|A − B|` exactly.
fn chord_length(flange_radius: f64, rim_radius: f64, angle_rad: f64, crossings: u32) -> f64 {
    if crossings == 0 {
        return (flange_radius - rim_radius).abs();
    }
    // Rounding can push the law-of-cosines term just below zero
    (flange_radius.powi(2) + rim_radius.powi(2) - 2.0 * flange_radius * rim_radius * angle_rad.cos())
        .max(0.0)
        .sqrt()
}

fn side_breakdown(side: Side, geometry: &WheelGeometry, flange: &SideGeometry) -> SideBreakdown {
    let flange_radius_mm = flange.pcd_mm / 2.0;
    let rim_radius_mm = geometry.erd_mm / 2.0;
    let spokes_per_side = geometry.spokes_per_side();

    let angle_rad = 2.0 * PI * f64::from(flange.crossings) / f64::from(spokes_per_side);
    let chord_mm = chord_length(flange_radius_mm, rim_radius_mm, angle_rad, flange.crossings);

    let raw_length_mm =
        (chord_mm.powi(2) + flange.flange_distance_mm.powi(2)).sqrt() - geometry.spoke_hole_mm / 2.0;

    SideBreakdown {
        side,
        flange_radius_mm,
        rim_radius_mm,
        spokes_per_side,
        crossings: flange.crossings,
        angle_rad,
        chord_mm,
        raw_length_mm,
        length_mm: floor_to_tenth(raw_length_mm),
    }
}

/// Guard against geometry that did not come through [`CalculationInputs::parse`].
fn check_geometry(geometry: &WheelGeometry) -> CalcResult<()> {
    if geometry.spokes == 0 || geometry.spokes % 2 != 0 {
        return Err(CalcError::invalid_input(
            "numberOfSpokes",
            geometry.spokes.to_string(),
            "Must be a positive even number",
        ));
    }
    let reals = [
        ("erd", geometry.erd_mm),
        ("spokeHoleDiameter", geometry.spoke_hole_mm),
        ("pitchCircleLeft", geometry.left.pcd_mm),
        ("pitchCircleRight", geometry.right.pcd_mm),
        ("flangeDistanceLeft", geometry.left.flange_distance_mm),
        ("flangeDistanceRight", geometry.right.flange_distance_mm),
    ];
    for (field, value) in reals {
        if !value.is_finite() || value <= 0.0 {
            return Err(CalcError::invalid_input(
                field,
                value.to_string(),
                "Must be a finite number greater than zero",
            ));
        }
    }
    Ok(())
}

/// A side whose spoke would be zero or negative once the hole is taken off.
fn check_length(breakdown: &SideBreakdown, geometry: &WheelGeometry) -> CalcResult<()> {
    if breakdown.raw_length_mm.is_finite() && breakdown.length_mm > 0.0 {
        return Ok(());
    }
    Err(CalcError::invalid_input(
        "spokeHoleDiameter",
        geometry.spoke_hole_mm.to_string(),
        format!(
            "{} spoke length would be {:.1} mm; geometry is not a buildable wheel",
            breakdown.side.display_name(),
            breakdown.raw_length_mm
        ),
    ))
}

/// Calculate with all intermediate values.
pub fn calculate_breakdown(geometry: &WheelGeometry) -> CalcResult<SpokeBreakdown> {
    check_geometry(geometry)?;
    let left = side_breakdown(Side::Left, geometry, &geometry.left);
    let right = side_breakdown(Side::Right, geometry, &geometry.right);
    check_length(&left, geometry)?;
    check_length(&right, geometry)?;
    Ok(SpokeBreakdown { left, right })
}

/// Calculate spoke lengths from parsed geometry.
///
/// # Returns
///
/// * `Ok(CalculationResult)` - Both sides present
/// * `Err(CalcError::InvalidInput)` - Geometry is not a buildable wheel
pub fn calculate(geometry: &WheelGeometry) -> CalcResult<CalculationResult> {
    calculate_breakdown(geometry).map(|b| b.result())
}

/// Parse raw inputs and calculate.
///
/// Fails with a validation error if any of the nine fields is missing or
/// unparseable. No side effects.
pub fn compute(inputs: &CalculationInputs) -> CalcResult<CalculationResult> {
    let geometry = inputs.parse()?;
    calculate(&geometry)
}
