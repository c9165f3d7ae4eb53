//! # Preset Catalog
//!
//! Read-only reference wheels compiled into the binary. Each preset is an
//! export document with an optional `displayName`, `category` and
//! `description`.
//!
//! The list of documents is explicit ([`BUNDLED_PRESETS`]). Entries that fail
//! validation are skipped and logged; the rest of the catalog still loads.
//!
//! ## Example
//!
//! ```rust
//! use spoke_core::presets::PresetCatalog;
//!
//! let catalog = PresetCatalog::bundled();
//! let touring = catalog.find("Touring rear 36H 3-cross").unwrap();
//! assert_eq!(touring.inputs.number_of_spokes, "36");
//! ```

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::calculations::CalculationResult;
use crate::errors::{CalcError, CalcResult};
use crate::exchange::ExportMetadata;
use crate::inputs::{CalculationInputs, Field};
use crate::notify::{Notifier, Severity};

/// A bundled preset document
#[derive(Debug, Clone, Copy)]
pub struct PresetSource {
    /// File name, used in logs and as the fallback display name
    pub name: &'static str,
    pub json: &'static str,
}

macro_rules! preset {
    ($file:literal) => {
        PresetSource {
            name: $file,
            json: include_str!(concat!("../presets/", $file)),
        }
    };
}

/// All documents shipped with the crate
pub const BUNDLED_PRESETS: &[PresetSource] = &[
    preset!("road-rear-32h-3x.json"),
    preset!("road-front-28h-radial.json"),
    preset!("disc-front-32h-3x.json"),
    preset!("mtb-27-rear-28h-2x.json"),
    preset!("touring-rear-36h-3x.json"),
    preset!("kids-24h-2x.json"),
];

static BUNDLED_CATALOG: Lazy<PresetCatalog> = Lazy::new(|| PresetCatalog::load(BUNDLED_PRESETS));

/// A validated preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetRecord {
    pub display_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub inputs: CalculationInputs,
    pub results: CalculationResult,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub metadata: Option<ExportMetadata>,
}

/// A document that did not make it into the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPreset {
    pub source: String,
    /// Why it was rejected
    pub reason: CalcError,
}

/// Loaded presets plus the entries that were rejected.
#[derive(Debug, Clone, Default)]
pub struct PresetCatalog {
    presets: Vec<PresetRecord>,
    skipped: Vec<SkippedPreset>,
}

impl PresetCatalog {
    /// Catalog of [`BUNDLED_PRESETS`], built on first use.
    pub fn bundled() -> &'static PresetCatalog {
        &BUNDLED_CATALOG
    }

    /// Validate every source, keeping the good ones in order.
    pub fn load(sources: &[PresetSource]) -> PresetCatalog {
        let mut catalog = PresetCatalog::default();
        for source in sources {
            match parse_preset(source.name, source.json) {
                Ok(preset) => catalog.presets.push(preset),
                Err(error) => {
                    tracing::warn!(preset = source.name, %error, "skipping invalid preset");
                    catalog.skipped.push(SkippedPreset {
                        source: source.name.to_string(),
                        reason: error,
                    });
                }
            }
        }
        tracing::debug!(
            loaded = catalog.presets.len(),
            skipped = catalog.skipped.len(),
            "preset catalog loaded"
        );
        catalog
    }

    pub fn presets(&self) -> &[PresetRecord] {
        &self.presets
    }

    pub fn skipped(&self) -> &[SkippedPreset] {
        &self.skipped
    }

    pub fn has_skipped(&self) -> bool {
        !self.skipped.is_empty()
    }

    /// Send one warning if anything was skipped. Returns whether it did.
    pub fn notify_skipped(&self, notifier: &mut dyn Notifier) -> bool {
        if self.skipped.is_empty() {
            return false;
        }
        let names: Vec<&str> = self.skipped.iter().map(|s| s.source.as_str()).collect();
        notifier.notify(
            &format!(
                "{} preset(s) could not be loaded and were skipped: {}",
                names.len(),
                names.join(", ")
            ),
            Severity::Warning,
        );
        true
    }

    /// Look a preset up by display name, ignoring case.
    pub fn find(&self, display_name: &str) -> CalcResult<&PresetRecord> {
        let wanted = display_name.trim();
        self.presets
            .iter()
            .find(|p| p.display_name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CalcError::not_found("Preset", display_name))
    }

    /// Distinct categories in catalog order
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for category in self.presets.iter().filter_map(|p| p.category.as_deref()) {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
        categories
    }

    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a PresetRecord> + 'a {
        self.presets
            .iter()
            .filter(move |p| p.category.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(category)))
    }
}

/// Validate and parse one preset document.
///
/// Requires an `inputs` object with all nine fields non-empty and a `results`
/// object whose `left` and `right` are numbers.
pub fn parse_preset(source_name: &str, json: &str) -> CalcResult<PresetRecord> {
    let fail = |reason: String| CalcError::preset_load(source_name, reason);

    let mut value: Value = serde_json::from_str(json).map_err(|e| fail(format!("not valid JSON ({})", e)))?;
    let document = value
        .as_object_mut()
        .ok_or_else(|| fail("top level must be a JSON object".to_string()))?;

    let inputs = document
        .get("inputs")
        .and_then(Value::as_object)
        .ok_or_else(|| fail("missing 'inputs' object".to_string()))?;
    for field in Field::ALL {
        let present = match inputs.get(field.key()) {
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Number(_)) => true,
            _ => false,
        };
        if !present {
            return Err(fail(format!("missing input '{}'", field.key())));
        }
    }

    let results = document
        .get("results")
        .and_then(Value::as_object)
        .ok_or_else(|| fail("missing 'results' object".to_string()))?;
    for side in ["left", "right"] {
        if !results.get(side).is_some_and(Value::is_number) {
            return Err(fail(format!("result '{}' must be a number", side)));
        }
    }

    if !document.contains_key("displayName") {
        let stem = source_name.trim_end_matches(".json").to_string();
        document.insert("displayName".to_string(), Value::String(stem));
    }

    serde_json::from_value(value).map_err(|e| fail(e.to_string()))
}
