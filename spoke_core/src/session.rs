//! # Session
//!
//! The application state a front end owns: the working inputs, the working
//! result, and the saved collection with the store it persists to.
//!
//! Rules kept here:
//!
//! - Editing any input clears the working result, so a shown length always
//!   belongs to the shown inputs.
//! - A failed action leaves the state exactly as it was.
//! - Loading a saved calculation, import or preset copies it in; nothing is
//!   shared with the source.
//!
//! ## Example
//!
//! ```rust
//! use spoke_core::exchange::ExportMetadata;
//! use spoke_core::presets::PresetCatalog;
//! use spoke_core::session::Session;
//! use spoke_core::storage::MemoryStore;
//!
//! let mut session = Session::open(MemoryStore::new(), ExportMetadata::default())?;
//! let preset = PresetCatalog::bundled().find("Kids 24H 2-cross")?;
//! session.apply_preset(preset);
//! session.calculate()?;
//! let id = session.save("Daughter's bike")?;
//! assert!(session.saved().contains(&id));
//! # Ok::<(), spoke_core::errors::CalcError>(())
//! ```

use uuid::Uuid;

use crate::calculations::{self, CalculationResult, SpokeBreakdown};
use crate::errors::{CalcError, CalcResult};
use crate::exchange::{self, ExportDocument, ExportMetadata, ImportedCalculation};
use crate::inputs::{CalculationInputs, Field, InputWarning};
use crate::notify::Confirm;
use crate::presets::PresetRecord;
use crate::saved::{SavedCalculation, SavedCollection};
use crate::storage::{self, KeyValueStore};

pub struct Session<S: KeyValueStore> {
    inputs: CalculationInputs,
    results: CalculationResult,
    saved: SavedCollection,
    store: S,
    metadata: ExportMetadata,
}

impl<S: KeyValueStore> Session<S> {
    /// Start a session on `store`, reading its saved collection.
    pub fn open(store: S, metadata: ExportMetadata) -> CalcResult<Self> {
        let saved = storage::load_collection(&store)?;
        tracing::debug!(saved = saved.len(), "session opened");
        Ok(Session {
            inputs: CalculationInputs::default(),
            results: CalculationResult::default(),
            saved,
            store,
            metadata,
        })
    }

    pub fn inputs(&self) -> &CalculationInputs {
        &self.inputs
    }

    pub fn results(&self) -> &CalculationResult {
        &self.results
    }

    pub fn saved(&self) -> &SavedCollection {
        &self.saved
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn metadata(&self) -> &ExportMetadata {
        &self.metadata
    }

    /// Raw edit of one field (a keystroke). Clears the working result.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        self.inputs.set(field, value);
        self.results = CalculationResult::default();
    }

    /// Edit of one field that the user has finished with.
    ///
    /// Same as [`set_field`](Self::set_field), except the spoke-hole diameter
    /// is rounded to one decimal.
    pub fn commit_field(&mut self, field: Field, value: impl Into<String>) {
        self.set_field(field, value);
        if field == Field::SpokeHoleDiameter {
            self.inputs.normalize_spoke_hole();
        }
    }

    /// Replace all working inputs. Clears the working result.
    pub fn set_inputs(&mut self, inputs: CalculationInputs) {
        self.inputs = inputs;
        self.results = CalculationResult::default();
    }

    /// Run the calculator on the working inputs and keep the result.
    pub fn calculate(&mut self) -> CalcResult<CalculationResult> {
        let results = calculations::compute(&self.inputs)?;
        self.results = results;
        tracing::info!(left = ?results.left, right = ?results.right, "calculated spoke lengths");
        Ok(results)
    }

    /// Like [`calculate`](Self::calculate) but returns every intermediate value.
    pub fn calculate_breakdown(&mut self) -> CalcResult<SpokeBreakdown> {
        let geometry = self.inputs.parse()?;
        let breakdown = calculations::calculate_breakdown(&geometry)?;
        self.results = breakdown.result();
        Ok(breakdown)
    }

    /// Unusual-but-legal values in the working inputs. Empty if they do not parse.
    pub fn warnings(&self) -> Vec<InputWarning> {
        self.inputs
            .parse()
            .map(|geometry| geometry.warnings())
            .unwrap_or_default()
    }

    /// Save the working calculation under `name` and persist the collection.
    pub fn save(&mut self, name: &str) -> CalcResult<Uuid> {
        let mut updated = self.saved.clone();
        let id = updated.add(name, &self.inputs, &self.results)?;
        storage::persist_collection(&mut self.store, &updated)?;
        self.saved = updated;
        tracing::info!(%id, name = name.trim(), "saved calculation");
        Ok(id)
    }

    /// Copy a saved calculation into the working state.
    pub fn load(&mut self, id: &Uuid) -> CalcResult<&SavedCalculation> {
        let entry = self
            .saved
            .get(id)
            .ok_or_else(|| CalcError::not_found("Saved calculation", id.to_string()))?;
        self.inputs = entry.inputs.clone();
        self.results = entry.results;
        tracing::info!(%id, "loaded saved calculation");
        Ok(entry)
    }

    /// Remove a saved calculation and persist. Absent ids change nothing.
    ///
    /// Irreversible; callers confirm first (see [`delete_confirmed`](Self::delete_confirmed)).
    pub fn delete(&mut self, id: &Uuid) -> CalcResult<Option<SavedCalculation>> {
        if !self.saved.contains(id) {
            return Ok(None);
        }
        let mut updated = self.saved.clone();
        let removed = updated.remove(id);
        storage::persist_collection(&mut self.store, &updated)?;
        self.saved = updated;
        tracing::info!(%id, "deleted saved calculation");
        Ok(removed)
    }

    /// Ask `confirm` before deleting. Returns whether an entry was removed.
    pub fn delete_confirmed(&mut self, id: &Uuid, confirm: &mut dyn Confirm) -> CalcResult<bool> {
        let Some(entry) = self.saved.get(id) else {
            return Ok(false);
        };
        let prompt = format!("Delete saved calculation '{}'? This cannot be undone.", entry.name);
        if !confirm.confirm(&prompt) {
            return Ok(false);
        }
        Ok(self.delete(id)?.is_some())
    }

    /// Export document for the working calculation.
    pub fn export_document(&self) -> CalcResult<ExportDocument> {
        exchange::export(&self.inputs, &self.results, &self.metadata)
    }

    /// Parse `json` and adopt its inputs and results.
    pub fn import_json(&mut self, json: &str) -> CalcResult<ImportedCalculation> {
        let imported = exchange::import(json)?;
        self.apply_import(&imported);
        Ok(imported)
    }

    /// Adopt an already-parsed import.
    pub fn apply_import(&mut self, imported: &ImportedCalculation) {
        self.inputs = imported.inputs.clone();
        self.results = imported.results;
        tracing::info!("imported calculation");
    }

    /// Adopt a preset's inputs and results as written.
    pub fn apply_preset(&mut self, preset: &PresetRecord) {
        self.inputs = preset.inputs.clone();
        self.results = preset.results;
        tracing::info!(preset = %preset.display_name, "applied preset");
    }

    /// Clear the working inputs and result. The saved collection is untouched.
    pub fn reset(&mut self) {
        self.inputs = CalculationInputs::default();
        self.results = CalculationResult::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::FixedAnswer;
    use crate::storage::MemoryStore;

    /// Store whose writes always fail
    #[derive(Default)]
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> CalcResult<Option<String>> {
            Ok(None)
        }

        fn set(&mut self, key: &str, _value: &str) -> CalcResult<()> {
            Err(CalcError::file_error("write", key, "read-only"))
        }
    }

    fn front_wheel() -> CalculationInputs {
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

    fn session() -> Session<MemoryStore> {
        let mut session = Session::open(MemoryStore::new(), ExportMetadata::default()).unwrap();
        session.set_inputs(front_wheel());
        session
    }

    #[test]
    fn test_calculate_sets_result() {
        let mut session = session();
        let result = session.calculate().unwrap();
        assert_eq!(result, CalculationResult::both(287.9, 286.5));
        assert_eq!(*session.results(), result);
    }

    #[test]
    fn test_failed_calculate_keeps_state() {
        let mut session = session();
        session.calculate().unwrap();
        session.inputs.set(Field::Erd, "");
        assert!(session.calculate().is_err());
        assert_eq!(*session.results(), CalculationResult::both(287.9, 286.5));
    }

    #[test]
    fn test_edit_clears_result() {
        let mut session = session();
        session.calculate().unwrap();
        session.set_field(Field::Erd, "600");
        assert_eq!(*session.results(), CalculationResult::default());
    }

    #[test]
    fn test_commit_rounds_spoke_hole_but_preset_does_not() {
        let mut session = session();
        session.commit_field(Field::SpokeHoleDiameter, "2.56");
        assert_eq!(session.inputs().spoke_hole_diameter, "2.6");

        let preset = PresetRecord {
            display_name: "Odd hole".to_string(),
            category: None,
            description: None,
            inputs: front_wheel().with(Field::SpokeHoleDiameter, "2.56"),
            results: CalculationResult::both(287.9, 286.5),
            timestamp: None,
            metadata: None,
        };
        session.apply_preset(&preset);
        assert_eq!(session.inputs().spoke_hole_diameter, "2.56");
        assert_eq!(*session.results(), preset.results);
    }

    #[test]
    fn test_save_requires_result_and_name() {
        let mut session = session();
        assert_eq!(
            session.save("Front").unwrap_err(),
            CalcError::incomplete_result("save")
        );
        session.calculate().unwrap();
        assert_eq!(session.save(" ").unwrap_err(), CalcError::EmptyName);
        assert!(session.saved().is_empty());
    }

    #[test]
    fn test_save_persists_whole_collection() {
        let mut session = session();
        session.calculate().unwrap();
        session.save("Front").unwrap();
        session.save("Front again").unwrap();

        let stored = storage::load_collection(session.store()).unwrap();
        assert_eq!(stored, *session.saved());
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn test_failed_persist_leaves_collection_unchanged() {
        let mut session = Session::open(ReadOnlyStore, ExportMetadata::default()).unwrap();
        session.set_inputs(front_wheel());
        session.calculate().unwrap();

        assert!(matches!(session.save("Front"), Err(CalcError::FileError { .. })));
        assert!(session.saved().is_empty());
    }

    #[test]
    fn test_load_copies_saved_entry() {
        let mut session = session();
        session.calculate().unwrap();
        let id = session.save("Front").unwrap();

        session.reset();
        session.load(&id).unwrap();
        assert_eq!(*session.inputs(), front_wheel());
        assert_eq!(*session.results(), CalculationResult::both(287.9, 286.5));

        session.set_field(Field::Erd, "700");
        let stored = session.saved().get(&id).unwrap();
        assert_eq!(stored.inputs.erd, "590");
        assert!(stored.results.is_complete());
    }

    #[test]
    fn test_load_unknown_id() {
        let mut session = session();
        assert!(matches!(
            session.load(&Uuid::new_v4()),
            Err(CalcError::NotFound { .. })
        ));
        assert_eq!(*session.inputs(), front_wheel());
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let mut session = session();
        session.calculate().unwrap();
        session.save("Front").unwrap();
        let before = session.saved().clone();

        assert_eq!(session.delete(&Uuid::new_v4()).unwrap(), None);
        assert_eq!(*session.saved(), before);
    }

    #[test]
    fn test_delete_confirmation() {
        let mut session = session();
        session.calculate().unwrap();
        let id = session.save("Front").unwrap();

        assert!(!session.delete_confirmed(&id, &mut FixedAnswer(false)).unwrap());
        assert!(session.saved().contains(&id));

        assert!(session.delete_confirmed(&id, &mut FixedAnswer(true)).unwrap());
        assert!(session.saved().is_empty());
        assert!(storage::load_collection(session.store()).unwrap().is_empty());
    }

    #[test]
    fn test_export_requires_result() {
        let session = session();
        assert_eq!(
            session.export_document().unwrap_err(),
            CalcError::incomplete_result("export")
        );
    }

    #[test]
    fn test_failed_import_keeps_state() {
        let mut session = session();
        session.calculate().unwrap();
        assert!(session.import_json(r#"{"inputs": {}}"#).is_err());
        assert_eq!(*session.inputs(), front_wheel());
        assert!(session.results().is_complete());
    }

    #[test]
    fn test_warnings() {
        let mut session = session();
        assert!(session.warnings().is_empty());
        session.set_field(Field::NumberOfSpokes, "20");
        assert_eq!(session.warnings().len(), 1);
        session.set_field(Field::NumberOfSpokes, "");
        assert!(session.warnings().is_empty());
    }
}
