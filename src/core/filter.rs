//! Exclusion rules evaluated before any network access.

use std::collections::HashSet;

use crate::domain::EntityKey;

/// Skip-list by id plus name substrings
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    skip_ids: HashSet<u32>,
    exclude_names: Vec<String>,
}

impl ExclusionFilter {
    /// Build a filter; empty name patterns are dropped (they would match everything)
    pub fn new<I, S>(skip_ids: impl IntoIterator<Item = u32>, exclude_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip_ids: skip_ids.into_iter().collect(),
            exclude_names: exclude_names
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }

    /// True if the entity must not be processed
    pub fn excludes(&self, key: &EntityKey) -> bool {
        self.skip_ids.contains(&key.id)
            || self
                .exclude_names
                .iter()
                .any(|pattern| key.name.contains(pattern.as_str()))
    }
}
