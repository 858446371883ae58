//! Persisted signature corpus for family classification.
//!
//! The on-disk format is a JSON object keyed by family name; each family
//! maps sub-category names to `{"SIZE": total, "<elem_id>": size, ...}` and
//! carries one reserved `"NAME"` key holding a regex that tests whether an
//! external class name belongs to the family. The format must stay
//! interoperable, so (de)serialization goes through `serde_json::Value`
//! rather than a derive.
//!
//! The store is a non-atomic read-modify-write resource: load, mutate in
//! memory, save as a whole. Concurrent writers are the caller's problem.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// Error type for store mutations and persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write corpus file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode corpus: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid family name pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Reserved key: the family's class-name regex.
const NAME_KEY: &str = "NAME";
/// Reserved key: accumulated element size of a sub-category.
const SIZE_KEY: &str = "SIZE";

#[derive(Debug, Default)]
struct Group {
    size: u64,
    elements: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
struct Family {
    name_pattern: Option<Regex>,
    groups: BTreeMap<String, Group>,
}

/// Coverage of one sub-category against a set of element ids.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageRecord {
    pub family: String,
    pub group: String,
    /// Elements of the sub-category present in the queried set.
    pub present: usize,
    /// Total elements the sub-category holds.
    pub total: usize,
    pub percent: f64,
    /// Accumulated size of the present elements.
    pub present_size: u64,
}

/// In-memory signature corpus.
#[derive(Debug, Default)]
pub struct SignatureStore {
    families: BTreeMap<String, Family>,
}

impl SignatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a corpus from disk.
    ///
    /// A missing, unreadable or malformed file degrades to an empty corpus
    /// with a warning; it is never fatal.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corpus unreadable, starting empty");
                return Self::default();
            }
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corpus malformed, starting empty");
                Self::default()
            }
        }
    }

    fn from_value(value: &Value) -> Self {
        let mut store = Self::default();
        let Some(families) = value.as_object() else {
            warn!("corpus root is not an object, starting empty");
            return store;
        };
        for (family_name, entry) in families {
            let Some(entry) = entry.as_object() else { continue };
            let family = store.families.entry(family_name.clone()).or_default();
            for (key, val) in entry {
                if key == NAME_KEY {
                    match val.as_str().map(Regex::new) {
                        Some(Ok(re)) => family.name_pattern = Some(re),
                        _ => warn!(family = %family_name, "ignoring invalid NAME pattern"),
                    }
                    continue;
                }
                let Some(group_obj) = val.as_object() else { continue };
                let group = family.groups.entry(key.clone()).or_default();
                for (elem, size) in group_obj {
                    let size = size.as_u64().unwrap_or(0);
                    if elem == SIZE_KEY {
                        group.size = size;
                    } else {
                        group.elements.insert(elem.clone(), size);
                    }
                }
            }
        }
        store
    }

    fn to_value(&self) -> Value {
        let mut families = Map::new();
        for (family_name, family) in &self.families {
            let mut entry = Map::new();
            if let Some(re) = &family.name_pattern {
                entry.insert(NAME_KEY.into(), Value::String(re.as_str().to_string()));
            }
            for (group_name, group) in &family.groups {
                let mut group_obj = Map::new();
                group_obj.insert(SIZE_KEY.into(), Value::from(group.size));
                for (elem, size) in &group.elements {
                    group_obj.insert(elem.clone(), Value::from(*size));
                }
                entry.insert(group_name.clone(), Value::Object(group_obj));
            }
            families.insert(family_name.clone(), Value::Object(entry));
        }
        Value::Object(families)
    }

    /// Write the whole corpus back to disk.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let text = serde_json::to_string(&self.to_value())?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Set the class-name regex of a family, creating the family if needed.
    pub fn add_name(&mut self, family: &str, pattern: &str) -> Result<(), StoreError> {
        let compiled = Regex::new(pattern)?;
        self.families.entry(family.to_string()).or_default().name_pattern = Some(compiled);
        Ok(())
    }

    /// Record one element under `family`/`group`, accumulating the
    /// sub-category size. Re-adding a known element is a no-op.
    pub fn add_element(&mut self, family: &str, group: &str, elem_id: &str, size: u64) {
        let group = self
            .families
            .entry(family.to_string())
            .or_default()
            .groups
            .entry(group.to_string())
            .or_default();
        if group.elements.insert(elem_id.to_string(), size).is_none() {
            group.size += size;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn family_names(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }

    /// Families whose NAME regex matches at least one of the given class
    /// names.
    pub fn matching_families<'a, I>(&self, class_names: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut matched = BTreeSet::new();
        let names: Vec<&str> = class_names.into_iter().collect();
        for (family_name, family) in &self.families {
            let Some(re) = &family.name_pattern else { continue };
            if names.iter().any(|n| re.is_match(n)) {
                matched.insert(family_name.clone());
            }
        }
        matched
    }

    /// Intersect a set of element ids against every sub-category and report
    /// which corpus entries the set covers. Sub-categories with no overlap
    /// are omitted.
    pub fn coverage(&self, elems: &BTreeSet<String>) -> Vec<CoverageRecord> {
        let mut records = Vec::new();
        for (family_name, family) in &self.families {
            for (group_name, group) in &family.groups {
                let total = group.elements.len();
                if total == 0 {
                    continue;
                }
                let mut present = 0usize;
                let mut present_size = 0u64;
                for (elem, size) in &group.elements {
                    if elems.contains(elem) {
                        present += 1;
                        present_size += size;
                    }
                }
                if present == 0 {
                    continue;
                }
                records.push(CoverageRecord {
                    family: family_name.clone(),
                    group: group_name.clone(),
                    present,
                    total,
                    percent: present as f64 / total as f64 * 100.0,
                    present_size,
                });
            }
        }
        records
    }
}
