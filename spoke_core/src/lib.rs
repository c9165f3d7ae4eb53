//! # spoke_core - Spoke Length Calculation Engine
//!
//! `spoke_core` computes bicycle spoke lengths from hub and rim geometry and
//! manages the calculations a user keeps: a saved collection in durable
//! key-value storage, JSON export/import, and a bundled preset catalog.
//!
//! ## Design Philosophy
//!
//! - **Stateless calculator**: pure functions from parsed geometry to lengths
//! - **Parse, then compute**: string form fields are validated into
//!   [`inputs::WheelGeometry`] before the formula ever runs
//! - **JSON-First**: inputs, results and documents are Serialize/Deserialize
//! - **Rich Errors**: structured error types, not just strings
//!
//! ## Quick Start
//!
//! ```rust
//! use spoke_core::calculations::compute;
//! use spoke_core::inputs::{CalculationInputs, Field};
//!
//! let inputs = CalculationInputs::default()
//!     .with(Field::Erd, "602")
//!     .with(Field::PitchCircleLeft, "44")
//!     .with(Field::PitchCircleRight, "44")
//!     .with(Field::FlangeDistanceLeft, "40")
//!     .with(Field::FlangeDistanceRight, "18")
//!     .with(Field::SpokeHoleDiameter, "2.6")
//!     .with(Field::NumberOfSpokes, "28")
//!     .with(Field::CrossingsLeft, "0")
//!     .with(Field::CrossingsRight, "2");
//!
//! let result = compute(&inputs).unwrap();
//! assert_eq!(result.left, Some(280.5));
//! assert_eq!(result.right, Some(287.0));
//! ```
//!
//! ## Modules
//!
//! - [`inputs`] - Raw form inputs and parsed wheel geometry
//! - [`calculations`] - The spoke length formula
//! - [`saved`] - Saved calculation collection
//! - [`storage`] - Key-value stores with atomic saves and locking
//! - [`exchange`] - JSON export/import documents
//! - [`presets`] - Bundled reference wheels
//! - [`session`] - Working state owned by a front end
//! - [`notify`] - Notification and confirmation collaborators
//! - [`config`] - Settings file
//! - [`errors`] - Structured error types

pub mod calculations;
pub mod config;
pub mod errors;
pub mod exchange;
pub mod inputs;
pub mod notify;
pub mod presets;
pub mod saved;
pub mod session;
pub mod storage;

// Re-export commonly used types at crate root for convenience
pub use calculations::{compute, CalculationResult};
pub use config::Settings;
pub use errors::{CalcError, CalcResult, ErrorKind};
pub use exchange::{export, import, ExportDocument, ExportMetadata};
pub use inputs::{CalculationInputs, Field, WheelGeometry};
pub use notify::{Confirm, Notifier, Severity};
pub use presets::{PresetCatalog, PresetRecord};
pub use saved::{SavedCalculation, SavedCollection};
pub use session::Session;
#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStore;
pub use storage::{KeyValueStore, MemoryStore};
