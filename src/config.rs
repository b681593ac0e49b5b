//! Core configuration, read from a JSON file. Every field has a default.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::element::FormInput;
use crate::model::{Alignment, PageSpec, RefPoint};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("Invalid config {path}: {source}")]
    Parse { path: String, source: serde_json::Error },
}

/// What loading a page does with elements whose type cannot be resolved.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnknownTypePolicy {
    /// Drop the element from the loaded page.
    Skip,
    /// Keep an inert placeholder in its place.
    #[default]
    Placeholder,
}

/// Initial values of a new element's form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ElementDefaults {
    pub font: String,
    pub fontsize: i64,
    pub colour: String,
    pub width: i64,
    pub refpoint: RefPoint,
    pub alignment: Alignment,
}

impl Default for ElementDefaults {
    fn default() -> Self {
        Self {
            font: "times".into(),
            fontsize: 12,
            colour: "#000000".into(),
            width: 0,
            refpoint: RefPoint::TopLeft,
            alignment: Alignment::Left,
        }
    }
}

impl ElementDefaults {
    /// Fill visual fields the form leaves out.
    pub fn fill_form(&self, form: &mut FormInput) {
        let defaults = [
            ("width", Value::from(self.width)),
            ("font", Value::from(self.font.clone())),
            ("fontsize", Value::from(self.fontsize)),
            ("colour", Value::from(self.colour.clone())),
        ];
        for (key, value) in defaults {
            if form.get(key).map_or(true, Value::is_null) {
                form.insert(key.into(), value);
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    pub unknown_type_policy: UnknownTypePolicy,
    pub page_defaults: PageSpec,
    pub element_defaults: ElementDefaults,
}

impl CoreConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&content)
            .map_err(|source| ConfigError::Parse { path: display, source })
    }

    /// Like [`CoreConfig::load`], but a missing file means defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
