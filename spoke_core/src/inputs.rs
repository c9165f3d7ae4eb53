//! # Wheel Inputs
//!
//! Two representations of the same nine measurements:
//!
//! - [`CalculationInputs`] - the working form, every field a string so a
//!   half-typed value ("35.", "") can be held without loss. This is also the
//!   shape used in saved calculations, exports and presets.
//! - [`WheelGeometry`] - the parsed, numeric form. The calculator only ever
//!   sees this.
//!
//! ## Example
//!
//! ```rust
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
//! let geometry = inputs.parse().unwrap();
//! assert_eq!(geometry.spokes, 32);
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::{CalcError, CalcResult};

/// Spoke counts hub and rim makers drill for
pub const CONVENTIONAL_SPOKE_COUNTS: [u32; 4] = [24, 28, 32, 36];

/// Usual spoke-hole diameter range in mm
pub const CONVENTIONAL_SPOKE_HOLE_MM: (f64, f64) = (1.0, 3.0);

/// Highest crossing count seen in ordinary lacing patterns
pub const CONVENTIONAL_MAX_CROSSINGS: u32 = 4;

/// The nine input fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Erd,
    PitchCircleLeft,
    PitchCircleRight,
    FlangeDistanceLeft,
    FlangeDistanceRight,
    SpokeHoleDiameter,
    NumberOfSpokes,
    CrossingsLeft,
    CrossingsRight,
}

impl Field {
    /// All fields in form order
    pub const ALL: [Field; 9] = [
        Field::Erd,
        Field::PitchCircleLeft,
        Field::PitchCircleRight,
        Field::FlangeDistanceLeft,
        Field::FlangeDistanceRight,
        Field::SpokeHoleDiameter,
        Field::NumberOfSpokes,
        Field::CrossingsLeft,
        Field::CrossingsRight,
    ];

    /// Key used in JSON documents
    pub fn key(&self) -> &'static str {
        match self {
            Field::Erd => "erd",
            Field::PitchCircleLeft => "pitchCircleLeft",
            Field::PitchCircleRight => "pitchCircleRight",
            Field::FlangeDistanceLeft => "flangeDistanceLeft",
            Field::FlangeDistanceRight => "flangeDistanceRight",
            Field::SpokeHoleDiameter => "spokeHoleDiameter",
            Field::NumberOfSpokes => "numberOfSpokes",
            Field::CrossingsLeft => "crossingsLeft",
            Field::CrossingsRight => "crossingsRight",
        }
    }

    /// Human-readable label with unit
    pub fn label(&self) -> &'static str {
        match self {
            Field::Erd => "Effective rim diameter (mm)",
            Field::PitchCircleLeft => "Pitch circle diameter, left (mm)",
            Field::PitchCircleRight => "Pitch circle diameter, right (mm)",
            Field::FlangeDistanceLeft => "Flange distance, left (mm)",
            Field::FlangeDistanceRight => "Flange distance, right (mm)",
            Field::SpokeHoleDiameter => "Spoke hole diameter (mm)",
            Field::NumberOfSpokes => "Number of spokes",
            Field::CrossingsLeft => "Crossings, left",
            Field::CrossingsRight => "Crossings, right",
        }
    }

    /// Look a field up by its JSON key
    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.key() == key)
    }
}

/// Raw, string-typed calculation inputs.
///
/// Deserialization is lenient: a missing field reads as an empty string and
/// a JSON number is stringified. Problems surface when [`parse`](Self::parse)
/// runs, not when a document is read.
///
/// ## JSON Example
///
/// ```json
/// {
///   "erd": "590",
///   "pitchCircleLeft": "45",
///   "pitchCircleRight": "45",
///   "flangeDistanceLeft": "35",
///   "flangeDistanceRight": "20",
///   "spokeHoleDiameter": "2.6",
///   "numberOfSpokes": "32",
///   "crossingsLeft": "3",
///   "crossingsRight": "3"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationInputs {
    #[serde(default, deserialize_with = "lenient_string")]
    pub erd: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pitch_circle_left: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pitch_circle_right: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub flange_distance_left: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub flange_distance_right: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub spoke_hole_diameter: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub number_of_spokes: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub crossings_left: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub crossings_right: String,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

impl CalculationInputs {
    /// Builder-style setter
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Current text of a field
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Erd => &self.erd,
            Field::PitchCircleLeft => &self.pitch_circle_left,
            Field::PitchCircleRight => &self.pitch_circle_right,
            Field::FlangeDistanceLeft => &self.flange_distance_left,
            Field::FlangeDistanceRight => &self.flange_distance_right,
            Field::SpokeHoleDiameter => &self.spoke_hole_diameter,
            Field::NumberOfSpokes => &self.number_of_spokes,
            Field::CrossingsLeft => &self.crossings_left,
            Field::CrossingsRight => &self.crossings_right,
        }
    }

    /// Replace the text of a field
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::Erd => &mut self.erd,
            Field::PitchCircleLeft => &mut self.pitch_circle_left,
            Field::PitchCircleRight => &mut self.pitch_circle_right,
            Field::FlangeDistanceLeft => &mut self.flange_distance_left,
            Field::FlangeDistanceRight => &mut self.flange_distance_right,
            Field::SpokeHoleDiameter => &mut self.spoke_hole_diameter,
            Field::NumberOfSpokes => &mut self.number_of_spokes,
            Field::CrossingsLeft => &mut self.crossings_left,
            Field::CrossingsRight => &mut self.crossings_right,
        };
        *slot = value.into();
    }

    /// Fields that are empty (after trimming)
    pub fn missing_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.get(*f).trim().is_empty())
            .collect()
    }

    /// True when all nine fields hold some text
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Parse into numeric geometry, failing on the first bad field.
    pub fn parse(&self) -> CalcResult<WheelGeometry> {
        let erd_mm = self.positive_real(Field::Erd)?;
        let pcd_left = self.positive_real(Field::PitchCircleLeft)?;
        let pcd_right = self.positive_real(Field::PitchCircleRight)?;
        let flange_left = self.positive_real(Field::FlangeDistanceLeft)?;
        let flange_right = self.positive_real(Field::FlangeDistanceRight)?;
        let spoke_hole_mm = self.positive_real(Field::SpokeHoleDiameter)?;
        let spokes = self.spoke_count()?;
        let crossings_left = self.crossings(Field::CrossingsLeft)?;
        let crossings_right = self.crossings(Field::CrossingsRight)?;

        Ok(WheelGeometry {
            erd_mm,
            spoke_hole_mm,
            spokes,
            left: SideGeometry {
                pcd_mm: pcd_left,
                flange_distance_mm: flange_left,
                crossings: crossings_left,
            },
            right: SideGeometry {
                pcd_mm: pcd_right,
                flange_distance_mm: flange_right,
                crossings: crossings_right,
            },
        })
    }

    /// Every field-level problem, in form order. Empty when `parse` would succeed.
    pub fn validate_all(&self) -> Vec<CalcError> {
        Field::ALL
            .into_iter()
            .filter_map(|field| self.check_field(field).err())
            .collect()
    }

    /// Validate a single field
    pub fn check_field(&self, field: Field) -> CalcResult<()> {
        match field {
            Field::NumberOfSpokes => self.spoke_count().map(|_| ()),
            Field::CrossingsLeft | Field::CrossingsRight => self.crossings(field).map(|_| ()),
            _ => self.positive_real(field).map(|_| ()),
        }
    }

    /// Round the spoke-hole diameter to one decimal if it parses. Ties round
    /// away from zero (`2.25` becomes `2.3`).
    ///
    /// This is what happens when the user leaves the field; values loaded from
    /// saved calculations, imports or presets are kept as written.
    pub fn normalize_spoke_hole(&mut self) {
        if let Ok(value) = self.spoke_hole_diameter.trim().parse::<f64>() {
            if value.is_finite() {
                self.spoke_hole_diameter = format!("{:.1}", (value * 10.0).round() / 10.0);
            }
        }
    }

    fn present(&self, field: Field) -> CalcResult<&str> {
        let text = self.get(field).trim();
        if text.is_empty() {
            return Err(CalcError::missing_field(field.key()));
        }
        Ok(text)
    }

    fn positive_real(&self, field: Field) -> CalcResult<f64> {
        let text = self.present(field)?;
        let value: f64 = text
            .parse()
            .map_err(|_| CalcError::invalid_input(field.key(), text, "Not a number"))?;
        if !value.is_finite() {
            return Err(CalcError::invalid_input(field.key(), text, "Must be a finite number"));
        }
        if value <= 0.0 {
            return Err(CalcError::invalid_input(field.key(), text, "Must be greater than zero"));
        }
        Ok(value)
    }

    fn spoke_count(&self) -> CalcResult<u32> {
        let field = Field::NumberOfSpokes;
        let text = self.present(field)?;
        let value: u32 = text
            .parse()
            .map_err(|_| CalcError::invalid_input(field.key(), text, "Must be a positive whole number"))?;
        if value == 0 {
            return Err(CalcError::invalid_input(field.key(), text, "Must be greater than zero"));
        }
        if value % 2 != 0 {
            return Err(CalcError::invalid_input(
                field.key(),
                text,
                "Must be even (spokes are split between two flanges)",
            ));
        }
        Ok(value)
    }

    fn crossings(&self, field: Field) -> CalcResult<u32> {
        let text = self.present(field)?;
        text.parse()
            .map_err(|_| CalcError::invalid_input(field.key(), text, "Must be a non-negative whole number"))
    }
}

/// One flange's geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideGeometry {
    /// Pitch circle diameter in mm
    pub pcd_mm: f64,
    /// Flange to center-plane distance in mm
    pub flange_distance_mm: f64,
    /// Number of spokes crossed (0 = radial)
    pub crossings: u32,
}

/// Fully parsed wheel geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelGeometry {
    /// Effective rim diameter in mm
    pub erd_mm: f64,
    /// Flange spoke-hole diameter in mm
    pub spoke_hole_mm: f64,
    /// Total spoke count (even)
    pub spokes: u32,
    pub left: SideGeometry,
    pub right: SideGeometry,
}

impl WheelGeometry {
    /// Spokes laced into each flange
    pub fn spokes_per_side(&self) -> u32 {
        self.spokes / 2
    }

    /// Values that are legal but unusual for a real wheel.
    pub fn warnings(&self) -> Vec<InputWarning> {
        let mut warnings = Vec::new();

        let (min_hole, max_hole) = CONVENTIONAL_SPOKE_HOLE_MM;
        if self.spoke_hole_mm < min_hole || self.spoke_hole_mm > max_hole {
            warnings.push(InputWarning::new(
                Field::SpokeHoleDiameter,
                format!(
                    "{} mm is outside the usual {:.1}-{:.1} mm range",
                    self.spoke_hole_mm, min_hole, max_hole
                ),
            ));
        }
        if !CONVENTIONAL_SPOKE_COUNTS.contains(&self.spokes) {
            warnings.push(InputWarning::new(
                Field::NumberOfSpokes,
                format!("{} spokes is not a common drilling (24, 28, 32 or 36)", self.spokes),
            ));
        }
        for (field, side) in [(Field::CrossingsLeft, &self.left), (Field::CrossingsRight, &self.right)] {
            if side.crossings > CONVENTIONAL_MAX_CROSSINGS {
                warnings.push(InputWarning::new(
                    field,
                    format!("{}-cross lacing is unusual", side.crossings),
                ));
            }
        }
        warnings
    }
}

/// A value that does not block calculation but deserves a second look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputWarning {
    pub field: Field,
    pub message: String,
}

impl InputWarning {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        InputWarning {
            field,
            message: message.into(),
        }
    }
}
