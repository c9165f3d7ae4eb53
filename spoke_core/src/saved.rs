//! # Saved Calculations
//!
//! The user's named calculations. The collection is an ordered list (insertion
//! order is display order) and serializes as a plain JSON array:
//!
//! ```text
//! SavedCollection
//! └── [SavedCalculation]
//!     ├── id: Uuid (unique within the collection)
//!     ├── name
//!     ├── inputs: CalculationInputs
//!     ├── results: CalculationResult
//!     └── timestamp (RFC 3339)
//! ```
//!
//! Entries are never edited in place. Loading one hands out a copy.

use std::collections::HashSet;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::calculations::CalculationResult;
use crate::errors::{CalcError, CalcResult};
use crate::inputs::CalculationInputs;

/// Current time as an ISO-8601 / RFC 3339 string with millisecond precision
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A named calculation in the saved collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCalculation {
    pub id: Uuid,
    pub name: String,
    pub inputs: CalculationInputs,
    pub results: CalculationResult,
    pub timestamp: String,
}

/// Ordered collection of saved calculations with unique ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SavedCollection {
    entries: Vec<SavedCalculation>,
}

impl<'de> Deserialize<'de> for SavedCollection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<SavedCalculation>::deserialize(deserializer)?;
        SavedCollection::from_entries(entries).map_err(serde::de::Error::custom)
    }
}

impl SavedCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored entries, rejecting duplicate ids.
    pub fn from_entries(entries: Vec<SavedCalculation>) -> CalcResult<Self> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.id) {
                return Err(CalcError::serialization(format!(
                    "duplicate saved calculation id {}",
                    entry.id
                )));
            }
        }
        Ok(SavedCollection { entries })
    }

    /// Append a new entry. Returns its id.
    ///
    /// The name must be non-empty after trimming and both result sides must
    /// be present.
    pub fn add(
        &mut self,
        name: &str,
        inputs: &CalculationInputs,
        results: &CalculationResult,
    ) -> CalcResult<Uuid> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CalcError::EmptyName);
        }
        results.require_complete("save")?;

        let mut id = Uuid::new_v4();
        while self.contains(&id) {
            id = Uuid::new_v4();
        }

        self.entries.push(SavedCalculation {
            id,
            name: name.to_string(),
            inputs: inputs.clone(),
            results: *results,
            timestamp: now_timestamp(),
        });
        Ok(id)
    }

    /// Remove the entry with this id, if any.
    pub fn remove(&mut self, id: &Uuid) -> Option<SavedCalculation> {
        let index = self.entries.iter().position(|e| e.id == *id)?;
        Some(self.entries.remove(index))
    }

    pub fn get(&self, id: &Uuid) -> Option<&SavedCalculation> {
        self.entries.iter().find(|e| e.id == *id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.get(id).is_some()
    }

    /// Find an entry by full id or unique id prefix (as typed on the command line).
    pub fn find(&self, id_or_prefix: &str) -> CalcResult<&SavedCalculation> {
        let needle = id_or_prefix.trim().to_ascii_lowercase();
        if let Ok(id) = Uuid::parse_str(&needle) {
            return self
                .get(&id)
                .ok_or_else(|| CalcError::not_found("Saved calculation", id_or_prefix));
        }
        let mut matches = self
            .entries
            .iter()
            .filter(|e| !needle.is_empty() && e.id.to_string().starts_with(&needle));
        match (matches.next(), matches.next()) {
            (Some(entry), None) => Ok(entry),
            (Some(_), Some(_)) => Err(CalcError::invalid_input(
                "id",
                id_or_prefix,
                "Prefix matches more than one saved calculation",
            )),
            _ => Err(CalcError::not_found("Saved calculation", id_or_prefix)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SavedCalculation> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::Field;

    fn inputs() -> CalculationInputs {
        CalculationInputs::default()
            .with(Field::Erd, "590")
            .with(Field::NumberOfSpokes, "32")
    }

    #[test]
    fn test_add_and_get() {
        let mut collection = SavedCollection::new();
        let id = collection
            .add("  Front wheel ", &inputs(), &CalculationResult::both(287.9, 286.5))
            .unwrap();

        assert_eq!(collection.len(), 1);
        let entry = collection.get(&id).unwrap();
        assert_eq!(entry.name, "Front wheel");
        assert_eq!(entry.inputs, inputs());
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
    }

    #[test]
    fn test_add_rejects_empty_name() {
        let mut collection = SavedCollection::new();
        let err = collection
            .add("   ", &inputs(), &CalculationResult::both(1.0, 2.0))
            .unwrap_err();
        assert_eq!(err, CalcError::EmptyName);
        assert!(collection.is_empty());
    }

    #[test]
    fn test_add_rejects_incomplete_result() {
        let mut collection = SavedCollection::new();
        let err = collection
            .add("Rear", &inputs(), &CalculationResult::default())
            .unwrap_err();
        assert_eq!(err, CalcError::incomplete_result("save"));
        assert!(collection.is_empty());
    }

    #[test]
    fn test_ids_are_unique_and_order_preserved() {
        let mut collection = SavedCollection::new();
        let result = CalculationResult::both(1.0, 2.0);
        let ids: Vec<Uuid> = (0..20)
            .map(|i| collection.add(&format!("wheel {}", i), &inputs(), &result).unwrap())
            .collect();

        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 20);

        let names: Vec<&str> = collection.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names[0], "wheel 0");
        assert_eq!(names[19], "wheel 19");
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut collection = SavedCollection::new();
        collection
            .add("Front", &inputs(), &CalculationResult::both(1.0, 2.0))
            .unwrap();
        let before = collection.clone();

        assert!(collection.remove(&Uuid::new_v4()).is_none());
        assert_eq!(collection, before);
    }

    #[test]
    fn test_remove_exactly_one() {
        let mut collection = SavedCollection::new();
        let result = CalculationResult::both(1.0, 2.0);
        let first = collection.add("A", &inputs(), &result).unwrap();
        let second = collection.add("B", &inputs(), &result).unwrap();

        let removed = collection.remove(&first).unwrap();
        assert_eq!(removed.name, "A");
        assert_eq!(collection.len(), 1);
        assert!(collection.contains(&second));
    }

    #[test]
    fn test_find_by_prefix() {
        let mut collection = SavedCollection::new();
        let id = collection
            .add("A", &inputs(), &CalculationResult::both(1.0, 2.0))
            .unwrap();
        let full = id.to_string();

        assert_eq!(collection.find(&full).unwrap().id, id);
        assert_eq!(collection.find(&full[..8]).unwrap().id, id);
        assert!(matches!(
            collection.find(&Uuid::new_v4().to_string()),
            Err(CalcError::NotFound { .. })
        ));
        assert!(collection.find("").is_err());
    }

    #[test]
    fn test_serializes_as_array() {
        let mut collection = SavedCollection::new();
        collection
            .add("A", &inputs(), &CalculationResult::both(1.0, 2.0))
            .unwrap();
        let json = serde_json::to_value(&collection).unwrap();
        assert!(json.is_array());

        let roundtrip: SavedCollection = serde_json::from_value(json).unwrap();
        assert_eq!(roundtrip, collection);
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let mut collection = SavedCollection::new();
        collection
            .add("A", &inputs(), &CalculationResult::both(1.0, 2.0))
            .unwrap();
        let entry = collection.iter().next().unwrap().clone();
        let json = serde_json::to_string(&vec![entry.clone(), entry]).unwrap();

        assert!(serde_json::from_str::<SavedCollection>(&json).is_err());
    }
}
