//! Saving and restoring container state.
//!
//! State is a JSON document mapping widget names to values. Values that
//! cannot be serialized are left out; enum values are stored by the label of
//! their choice and looked up again on load.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use horizon_autogui_core::Value;
use horizon_autogui_core::logging::targets;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::container::Container;
use crate::error::PersistError;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StoredValue {
    Value(Value),
    /// Label of a categorical choice.
    Choice(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    values: IndexMap<String, StoredValue>,
}

/// Per-user cache directory for persisted widget state.
pub fn user_cache_dir() -> Result<PathBuf, PersistError> {
    let dirs =
        ProjectDirs::from("org", "horizon", "horizon-autogui").ok_or(PersistError::NoCacheDir)?;
    Ok(dirs.cache_dir().join("persist"))
}

/// Where the state of the function GUI named `name` is kept.
pub fn persist_path(name: &str) -> Result<PathBuf, PersistError> {
    let file: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    Ok(user_cache_dir()?.join(format!("{file}.json")))
}

impl Container {
    /// Write the values of all named, non-gui-only children to `path`.
    pub fn dump(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let path = path.as_ref();
        let mut state = StateFile::default();
        for widget in self.widgets() {
            if widget.name().is_empty() || widget.gui_only() {
                continue;
            }
            let Some(value) = widget.as_value().map(|v| v.value()).transpose()? else {
                continue;
            };
            let stored = match value {
                Value::Enum(member) => StoredValue::Choice(member.name().to_string()),
                other if serde_json::to_value(&other).is_ok() => StoredValue::Value(other),
                _ => continue,
            };
            state.values.insert(widget.name().to_string(), stored);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PersistError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(&state)?;
        fs::write(path, json).map_err(|e| PersistError::io(path, e))?;
        tracing::debug!(
            target: targets::PERSIST,
            path = %path.display(),
            count = state.values.len(),
            "dumped widget state"
        );
        Ok(())
    }

    /// Restore values saved by [`dump`](Self::dump).
    ///
    /// With `quiet`, a missing file is ignored and an unreadable one is
    /// deleted. Values that no longer fit their widget are skipped.
    pub fn load(&self, path: impl AsRef<Path>, quiet: bool) -> Result<(), PersistError> {
        let path = path.as_ref();
        if !path.exists() {
            if quiet {
                return Ok(());
            }
            return Err(PersistError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|e| PersistError::io(path, e))?;
        let state: StateFile = match serde_json::from_str(&text) {
            Ok(state) => state,
            Err(err) if quiet => {
                tracing::debug!(target: targets::PERSIST, %err, "discarding unreadable state");
                if let Err(err) = fs::remove_file(path) {
                    tracing::debug!(target: targets::PERSIST, %err, "could not remove state file");
                }
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        for (name, stored) in state.values {
            let Some(widget) = self.try_get(&name) else {
                continue;
            };
            let value = match stored {
                StoredValue::Value(value) => Some(value),
                StoredValue::Choice(label) => widget
                    .as_categorical()
                    .and_then(|c| c.get_choice(&label).ok()),
            };
            let (Some(value), Some(target)) = (value, widget.as_value()) else {
                continue;
            };
            if let Err(err) = target.set_value(value) {
                tracing::debug!(target: targets::PERSIST, name, %err, "skipped restoring value");
            }
        }
        Ok(())
    }
}
