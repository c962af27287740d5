// open attribute set carried by nodes and edges
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Toggle marking a specified architecture edge as optional: it becomes
/// `AllowedAbsent` instead of `Absent` when no implementation traffic uses it.
pub const OPTIONAL_TOGGLE: &str = "Architecture.Is_Optional";

/// Int attribute holding the weight of an implementation dependency.
/// Missing means 1.
pub const WEIGHT_ATTRIBUTE: &str = "Edge.Weight";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    ints: BTreeMap<String, i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    floats: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    strings: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    toggles: BTreeSet<String>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.ints.get(key).copied()
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i64) {
        self.ints.insert(key.into(), value);
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.floats.get(key).copied()
    }

    pub fn set_float(&mut self, key: impl Into<String>, value: f64) {
        self.floats.insert(key.into(), value);
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(key.into(), value.into());
    }

    pub fn has_toggle(&self, key: &str) -> bool {
        self.toggles.contains(key)
    }

    pub fn set_toggle(&mut self, key: impl Into<String>) {
        self.toggles.insert(key.into());
    }

    pub fn unset_toggle(&mut self, key: &str) -> bool {
        self.toggles.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.ints.is_empty()
            && self.floats.is_empty()
            && self.strings.is_empty()
            && self.toggles.is_empty()
    }
}
