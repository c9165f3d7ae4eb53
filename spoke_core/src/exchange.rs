//! # Export / Import
//!
//! A calculation travels between machines as a single JSON document:
//!
//! ```json
//! {
//!   "inputs": { "erd": "590", "pitchCircleLeft": "45", ... },
//!   "results": { "left": 287.9, "right": 286.5 },
//!   "timestamp": "2026-10-14T09:30:00.000Z",
//!   "metadata": { "calculator": "Spoke Length Calculator", "version": "0.1.0" }
//! }
//! ```
//!
//! Import only insists on the two top-level objects `inputs` and `results`;
//! individual fields are read leniently and checked when the calculator runs.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::calculations::CalculationResult;
use crate::errors::{CalcError, CalcResult};
use crate::inputs::CalculationInputs;
use crate::saved::now_timestamp;

/// Producer name written into exported documents
pub const CALCULATOR_NAME: &str = "Spoke Length Calculator";

/// Version written into exported documents
pub const CALCULATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Who produced an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMetadata {
    #[serde(default)]
    pub calculator: String,
    #[serde(default)]
    pub version: String,
}

impl Default for ExportMetadata {
    fn default() -> Self {
        ExportMetadata {
            calculator: CALCULATOR_NAME.to_string(),
            version: CALCULATOR_VERSION.to_string(),
        }
    }
}

/// Export document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub inputs: CalculationInputs,
    pub results: CalculationResult,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub metadata: ExportMetadata,
}

impl ExportDocument {
    /// Pretty-printed JSON
    pub fn to_json(&self) -> CalcResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CalcError::serialization(e.to_string()))
    }
}

/// What an import yields: the working pair to adopt, plus the document's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedCalculation {
    pub inputs: CalculationInputs,
    pub results: CalculationResult,
    pub timestamp: Option<String>,
    pub metadata: Option<ExportMetadata>,
}

/// Build an export document from a fully computed calculation.
///
/// # Returns
///
/// * `Ok(ExportDocument)` - Stamped with the current time
/// * `Err(CalcError::IncompleteResult)` - A side has no length
pub fn export(
    inputs: &CalculationInputs,
    results: &CalculationResult,
    metadata: &ExportMetadata,
) -> CalcResult<ExportDocument> {
    results.require_complete("export")?;
    Ok(ExportDocument {
        inputs: inputs.clone(),
        results: *results,
        timestamp: now_timestamp(),
        metadata: metadata.clone(),
    })
}

/// Parse an import document.
///
/// # Returns
///
/// * `Ok(ImportedCalculation)` - `inputs` and `results` were both objects
/// * `Err(CalcError::Format)` - Not JSON, not an object, or a key is missing
pub fn import(json: &str) -> CalcResult<ImportedCalculation> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| CalcError::format(format!("not valid JSON ({})", e)))?;
    import_value(value)
}

/// Same as [`import`] for an already-parsed value.
pub fn import_value(value: Value) -> CalcResult<ImportedCalculation> {
    let Value::Object(mut document) = value else {
        return Err(CalcError::format("top level must be a JSON object"));
    };

    let inputs = take_object(&mut document, "inputs")?;
    let results = take_object(&mut document, "results")?;

    let inputs: CalculationInputs =
        serde_json::from_value(inputs).map_err(|e| CalcError::format(format!("inputs: {}", e)))?;
    let results: CalculationResult =
        serde_json::from_value(results).map_err(|e| CalcError::format(format!("results: {}", e)))?;

    let timestamp = document
        .get("timestamp")
        .and_then(Value::as_str)
        .map(str::to_string);
    let metadata = document
        .remove("metadata")
        .and_then(|m| serde_json::from_value(m).ok());

    Ok(ImportedCalculation {
        inputs,
        results,
        timestamp,
        metadata,
    })
}

fn take_object(document: &mut serde_json::Map<String, Value>, key: &str) -> CalcResult<Value> {
    match document.remove(key) {
        Some(value @ Value::Object(_)) => Ok(value),
        Some(_) => Err(CalcError::format(format!("'{}' must be an object", key))),
        None => Err(CalcError::format(format!("missing '{}'", key))),
    }
}

/// File name offered for an export made at `when`
pub fn suggested_file_name(when: DateTime<Utc>) -> String {
    format!("spoke-calculation-{}.json", when.format("%Y-%m-%d"))
}

/// Write an export document to disk atomically.
#[cfg(not(target_arch = "wasm32"))]
pub fn export_to_file(document: &ExportDocument, path: &Path) -> CalcResult<()> {
    let json = document.to_json()?;
    crate::storage::write_atomic(path, json.as_bytes())?;
    tracing::info!(path = %path.display(), "exported calculation");
    Ok(())
}

/// Read and parse an import document from disk.
pub fn import_from_file(path: &Path) -> CalcResult<ImportedCalculation> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| CalcError::file_error("read", path.display().to_string(), e.to_string()))?;
    import(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::Field;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn inputs() -> CalculationInputs {
        CalculationInputs::default()
            .with(Field::Erd, "590")
            .with(Field::PitchCircleLeft, "45")
            .with(Field::PitchCircleRight, "45")
            .with(Field::FlangeDistanceLeft, "35")
            .with(Field::FlangeDistanceRight, "20")
            .with(Field::SpokeHoleDiameter, "2.6")
            .with(Field::NumberOfSpokes, "32")
            .with(Field::CrossingsLeft, "3")
            .with(Field::CrossingsRight, "3")
    }

    #[test]
    fn test_export_shape() {
        let doc = export(&inputs(), &CalculationResult::both(287.9, 286.5), &ExportMetadata::default()).unwrap();
        let json: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();

        assert_eq!(json["inputs"]["erd"], "590");
        assert_eq!(json["inputs"]["numberOfSpokes"], "32");
        assert_eq!(json["results"]["left"], 287.9);
        assert_eq!(json["metadata"]["calculator"], CALCULATOR_NAME);
        assert_eq!(json["metadata"]["version"], CALCULATOR_VERSION);
        let timestamp = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn test_export_requires_complete_result() {
        let partial = CalculationResult {
            left: Some(287.9),
            right: None,
        };
        let err = export(&inputs(), &partial, &ExportMetadata::default()).unwrap_err();
        assert_eq!(err, CalcError::incomplete_result("export"));
    }

    #[test]
    fn test_export_import_roundtrip() {
        let results = CalculationResult::both(287.9, 286.5);
        let json = export(&inputs(), &results, &ExportMetadata::default())
            .unwrap()
            .to_json()
            .unwrap();

        let imported = import(&json).unwrap();
        assert_eq!(imported.inputs, inputs());
        assert_eq!(imported.results, results);
        assert_eq!(imported.metadata, Some(ExportMetadata::default()));
    }

    #[test]
    fn test_import_without_results_is_format_error() {
        let err = import(r#"{"inputs": {"erd": "590"}}"#).unwrap_err();
        assert_eq!(err, CalcError::format("missing 'results'"));
    }

    #[test]
    fn test_import_without_inputs_is_format_error() {
        let err = import(r#"{"results": {"left": 1, "right": 2}}"#).unwrap_err();
        assert_eq!(err, CalcError::format("missing 'inputs'"));
    }

    #[test]
    fn test_import_rejects_non_objects() {
        assert!(matches!(import("not json"), Err(CalcError::Format { .. })));
        assert!(matches!(import("[1, 2]"), Err(CalcError::Format { .. })));
        assert!(matches!(
            import(r#"{"inputs": "590", "results": {}}"#),
            Err(CalcError::Format { .. })
        ));
        assert!(matches!(
            import(r#"{"inputs": {}, "results": null}"#),
            Err(CalcError::Format { .. })
        ));
    }

    #[test]
    fn test_import_is_lenient_about_fields() {
        let imported = import(
            r#"{
                "inputs": {"erd": 590, "extra": true},
                "results": {"left": null},
                "somethingElse": 42
            }"#,
        )
        .unwrap();
        assert_eq!(imported.inputs.erd, "590");
        assert_eq!(imported.inputs.spoke_hole_diameter, "");
        assert_eq!(imported.results, CalculationResult::default());
        assert_eq!(imported.timestamp, None);
        assert_eq!(imported.metadata, None);
    }

    #[test]
    fn test_suggested_file_name() {
        let when = Utc.with_ymd_and_hms(2026, 10, 14, 9, 30, 0).unwrap();
        assert_eq!(suggested_file_name(when), "spoke-calculation-2026-10-14.json");
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wheel.json");
        let doc = export(&inputs(), &CalculationResult::both(287.9, 286.5), &ExportMetadata::default()).unwrap();

        export_to_file(&doc, &path).unwrap();
        let imported = import_from_file(&path).unwrap();
        assert_eq!(imported.inputs, doc.inputs);
        assert_eq!(imported.timestamp.as_deref(), Some(doc.timestamp.as_str()));
    }

    #[test]
    fn test_import_missing_file() {
        let err = import_from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, CalcError::FileError { .. }));
    }
}
