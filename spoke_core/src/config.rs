//! # Settings
//!
//! Application settings, read from an optional JSON file. Every field has a
//! default so a missing file, or a file with only some keys, is fine.
//!
//! ```json
//! {
//!   "data_dir": "/home/me/.local/share/spokecalc",
//!   "calculator_name": "Spoke Length Calculator",
//!   "user_id": "me",
//!   "log_filter": "info"
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::exchange::{ExportMetadata, CALCULATOR_NAME, CALCULATOR_VERSION};

/// Directory name used under the platform data/config dirs
pub const APP_DIR_NAME: &str = "spokecalc";

/// Settings file name inside the platform config dir
pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where the saved collection lives. `None` means the platform default.
    pub data_dir: Option<PathBuf>,

    /// Producer name written into exports
    pub calculator_name: String,

    /// Recorded in the store lock so a second process can say who holds it
    pub user_id: String,

    /// tracing filter directive used when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: None,
            calculator_name: CALCULATOR_NAME.to_string(),
            user_id: default_user_id(),
            log_filter: "warn".to_string(),
        }
    }
}

fn default_user_id() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

impl Settings {
    /// Platform settings path, e.g. `~/.config/spokecalc/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    /// Read settings from `path`.
    pub fn load(path: &Path) -> CalcResult<Settings> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CalcError::file_error("read settings", path.display().to_string(), e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| {
            CalcError::serialization(format!("Invalid settings in {}: {}", path.display(), e))
        })
    }

    /// Read `explicit` if given (it must exist), otherwise the platform file
    /// if present, otherwise defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> CalcResult<Settings> {
        if let Some(path) = explicit {
            return Settings::load(path);
        }
        match Settings::default_path() {
            Some(path) if path.exists() => Settings::load(&path),
            _ => Ok(Settings::default()),
        }
    }

    /// Effective data directory
    pub fn resolved_data_dir(&self) -> CalcResult<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .map(|base| base.join(APP_DIR_NAME))
            .ok_or_else(|| CalcError::Internal {
                message: "Could not find a data directory; set data_dir".to_string(),
            })
    }

    /// Metadata stamped on exports
    pub fn export_metadata(&self) -> ExportMetadata {
        ExportMetadata {
            calculator: self.calculator_name.clone(),
            version: CALCULATOR_VERSION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"log_filter": "debug"}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.log_filter, "debug");
        assert_eq!(settings.calculator_name, CALCULATOR_NAME);
        assert_eq!(settings.data_dir, None);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = Settings::load_or_default(Some(Path::new("/no/such/settings.json"))).unwrap_err();
        assert!(matches!(err, CalcError::FileError { .. }));
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(CalcError::SerializationError { .. })
        ));
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let settings = Settings {
            data_dir: Some(PathBuf::from("/tmp/wheels")),
            ..Settings::default()
        };
        assert_eq!(settings.resolved_data_dir().unwrap(), PathBuf::from("/tmp/wheels"));
    }

    #[test]
    fn test_export_metadata() {
        let settings = Settings {
            calculator_name: "Shop Calc".to_string(),
            ..Settings::default()
        };
        let metadata = settings.export_metadata();
        assert_eq!(metadata.calculator, "Shop Calc");
        assert_eq!(metadata.version, CALCULATOR_VERSION);
    }
}
