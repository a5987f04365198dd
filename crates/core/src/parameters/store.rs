//! JSON-backed configuration store
//!
//! The configuration file holds one object per component, keyed by the
//! component name:
//!
//! ```json
//! {
//!     "JSONBackend": { "addr": "127.0.0.1", "port": 9002, "telem_timeout": 10 }
//! }
//! ```
//!
//! `//` and `/* */` comments are ignored when parsing.
//!
//! Lookups never fail. A missing or `null` key yields the caller's default and
//! a value of the wrong type yields the default plus a log line.

use std::path::Path;

use json_comments::StripComments;
use log::info;
use serde_json::{Map, Value};

use super::error::ParameterError;

/// Key-value configuration grouped into named sections.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    sections: Map<String, Value>,
}

impl ConfigStore {
    /// Create an empty store. Every lookup returns its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParameterError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ParameterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parse a store from JSON text, skipping comments.
    pub fn from_json_str(text: &str) -> Result<Self, ParameterError> {
        match serde_json::from_reader(StripComments::new(text.as_bytes()))? {
            Value::Object(sections) => Ok(Self { sections }),
            _ => Err(ParameterError::NotAnObject),
        }
    }

    /// Borrow the section for a component. Unknown sections are empty.
    pub fn section<'a>(&'a self, name: &'a str) -> ConfigSection<'a> {
        ConfigSection {
            name,
            values: self.sections.get(name).and_then(Value::as_object),
        }
    }

    /// Names of all sections in the store.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Override a numeric value, creating the section if needed.
    pub fn set_num(&mut self, section: &str, key: &str, value: f64) {
        self.set(section, key, Value::from(value));
    }

    /// Override a string value, creating the section if needed.
    pub fn set_str(&mut self, section: &str, key: &str, value: &str) {
        self.set(section, key, Value::from(value));
    }

    fn set(&mut self, section: &str, key: &str, value: Value) {
        let entry = self
            .sections
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(values) = entry {
            values.insert(key.to_string(), value);
        }
    }
}

/// Read-only view of one component's configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConfigSection<'a> {
    name: &'a str,
    values: Option<&'a Map<String, Value>>,
}

impl<'a> ConfigSection<'a> {
    /// Section name.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Whether `key` is present with a non-null value.
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Numeric value for `key`, or `default`.
    pub fn num(&self, key: &str, default: f64) -> f64 {
        match self.lookup(key) {
            Some(value) => value.as_f64().unwrap_or_else(|| {
                info!(
                    "Failed to parse {}.{} as a number, using {default}",
                    self.name, key
                );
                default
            }),
            None => default,
        }
    }

    /// String value for `key`, or `default`.
    pub fn str(&self, key: &str, default: &str) -> String {
        match self.lookup(key) {
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                info!(
                    "Failed to parse {}.{} as a string, using \"{default}\"",
                    self.name, key
                );
                default.to_string()
            }
            None => default.to_string(),
        }
    }

    fn lookup(&self, key: &str) -> Option<&'a Value> {
        self.values?.get(key).filter(|v| !v.is_null())
    }
}
