//! Scenario and block definitions
//!
//! A Scenario is an ordered list of steps as authored. Entries may be typed
//! [`Step`]s built in Rust or raw JSON objects loaded from a document; the
//! compiler parses and shape-checks the latter.

use crate::step::Step;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One authored scenario entry
#[derive(Debug, Clone)]
pub enum Entry {
    /// Already typed step
    Step(Step),
    /// Unchecked data, validated at compile time
    Raw(Value),
}

impl From<Step> for Entry {
    fn from(step: Step) -> Self {
        Entry::Step(step)
    }
}

impl From<Value> for Entry {
    fn from(value: Value) -> Self {
        Entry::Raw(value)
    }
}

impl<'de> Deserialize<'de> for Entry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Entry::Raw)
    }
}

/// An ordered, immutable sequence of steps
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Scenario {
    entries: Vec<Entry>,
}

impl Scenario {
    /// Create an empty scenario
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw JSON entries
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        values.into_iter().map(Entry::Raw).collect()
    }

    /// Append an entry
    pub fn push(&mut self, entry: impl Into<Entry>) {
        self.entries.push(entry.into());
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<Step>> for Scenario {
    fn from(steps: Vec<Step>) -> Self {
        steps.into_iter().collect()
    }
}

impl FromIterator<Step> for Scenario {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Entry::Step).collect(),
        }
    }
}

impl FromIterator<Entry> for Scenario {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Scenario {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Named reusable scenarios, inserted with `use` steps
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct BlockRegistry {
    blocks: IndexMap<String, Scenario>,
}

impl BlockRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block, returning any block it replaced
    pub fn insert(&mut self, name: impl Into<String>, scenario: impl Into<Scenario>) -> Option<Scenario> {
        self.blocks.insert(name.into(), scenario.into())
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_block(mut self, name: impl Into<String>, scenario: impl Into<Scenario>) -> Self {
        self.insert(name, scenario);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.blocks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    /// Block names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
