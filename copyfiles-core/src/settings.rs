//! Settings record decoded from `copyfiles_settings.json`.
//!
//! ```json
//! { "SourceDir": "/tmp/in", "DestDir": "/tmp/out", "CopyOn": "any" }
//! ```
//!
//! The document must be a JSON object. Keys match case-insensitively, an exact
//! match wins over a folded one, and unknown keys are ignored. A missing
//! `SourceDir` or `DestDir` decodes as an empty path; `CopyOn` defaults to
//! [`CopyFilter::Any`]. Paths are not validated here: a missing source
//! directory surfaces when the watch is registered.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SettingsError;

/// Settings file looked up in the working directory.
pub const SETTINGS_FILE_NAME: &str = "copyfiles_settings.json";

const KEYS: [&str; 3] = ["SourceDir", "DestDir", "CopyOn"];

/// Which watch events trigger a copy attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyFilter {
    /// Every event that names a path triggers a copy.
    #[default]
    Any,
    /// Only content-write events trigger a copy.
    Write,
}

impl fmt::Display for CopyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyFilter::Any => f.write_str("any"),
            CopyFilter::Write => f.write_str("write"),
        }
    }
}

/// Immutable service settings, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "SourceDir", default)]
    pub source_dir: PathBuf,

    #[serde(rename = "DestDir", default)]
    pub dest_dir: PathBuf,

    #[serde(rename = "CopyOn", default)]
    pub copy_on: CopyFilter,
}

impl Settings {
    /// Read and decode the settings file at `path`.
    ///
    /// Returns [`SettingsError::Read`] if the file cannot be read and
    /// [`SettingsError::Parse`] if it is not a settings object.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let contents = std::fs::read(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let object = match serde_json::from_slice(bytes)? {
            Value::Object(object) => object,
            other => {
                return Err(serde_json::Error::invalid_type(
                    unexpected(&other),
                    &"a settings object",
                ))
            }
        };
        serde_json::from_value(Value::Object(fold_keys(object)))
    }
}

/// Rename keys that match a known field case-insensitively to the field's
/// canonical spelling. Exact spellings are inserted last so they win.
fn fold_keys(object: Map<String, Value>) -> Map<String, Value> {
    let mut folded = Map::with_capacity(object.len());
    let mut exact = Vec::new();
    for (key, value) in object {
        match KEYS.iter().find(|known| known.eq_ignore_ascii_case(&key)) {
            Some(known) if **known == key => exact.push((key, value)),
            Some(known) => {
                folded.insert((*known).to_string(), value);
            }
            None => {
                folded.insert(key, value);
            }
        }
    }
    folded.extend(exact);
    folded
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}
