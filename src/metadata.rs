//! Derived metadata: advisory values pulled from a fully absorbed instance tree.

use crate::instance::InstanceTree;
use crate::value::Value;
use std::collections::BTreeMap;

pub type DerivedMetadata = BTreeMap<String, Value>;

/// Runs after a successful absorption. Returning `None` records an empty metadata set; it never
/// changes the absorption outcome.
pub trait PostAbsorbHook {
    fn derive(&self, tree: &InstanceTree<'_>) -> Option<DerivedMetadata>;
}

/// Extracts the scalar value at each configured path (first match) under a key.
#[derive(Debug, Clone, Default)]
pub struct PathExtractor {
    entries: Vec<(String, String)>,
}

impl PathExtractor {
    pub fn new() -> Self {
        PathExtractor::default()
    }

    pub fn entry(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.entries.push((key.into(), path.into()));
        self
    }
}

impl PostAbsorbHook for PathExtractor {
    fn derive(&self, tree: &InstanceTree<'_>) -> Option<DerivedMetadata> {
        self.entries
            .iter()
            .map(|(key, path)| {
                let v = tree.value(path).filter(|v| v.is_scalar())?;
                Some((key.clone(), v.clone()))
            })
            .collect()
    }
}
