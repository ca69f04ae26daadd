//! Tag map and its list-of-pairs API representation

use crate::api::Tag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource tags as a flat key/value map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }

    /// API representation, ordered by key
    pub fn to_api(&self) -> Vec<Tag> {
        self.0.iter().map(|(k, v)| Tag::new(k, v)).collect()
    }

    /// Build from the API representation; a repeated key keeps the last value
    pub fn from_api(tags: &[Tag]) -> Self {
        tags.iter()
            .map(|t| (t.key.clone(), t.value.clone()))
            .collect()
    }

    /// What must be sent to turn `self` into `target`
    pub fn diff(&self, target: &Tags) -> TagDiff {
        let upsert = target
            .0
            .iter()
            .filter(|(k, v)| self.0.get(*k) != Some(*v))
            .map(|(k, v)| Tag::new(k, v))
            .collect();
        let remove = self
            .0
            .keys()
            .filter(|k| !target.0.contains_key(*k))
            .cloned()
            .collect();
        TagDiff { upsert, remove }
    }
}

impl From<BTreeMap<String, String>> for Tags {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Tag mutations: add or overwrite `upsert`, then drop `remove`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDiff {
    pub upsert: Vec<Tag>,
    pub remove: Vec<String>,
}

impl TagDiff {
    pub fn is_empty(&self) -> bool {
        self.upsert.is_empty() && self.remove.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_transcoding() {
        let tags: Tags = [("Name", "web"), ("Env", "prod")].into_iter().collect();

        let api = tags.to_api();
        assert_eq!(api, vec![Tag::new("Env", "prod"), Tag::new("Name", "web")]);
        assert_eq!(Tags::from_api(&api), tags);
        assert!(Tags::from_api(&[]).is_empty());
    }

    #[test]
    fn test_diff() {
        let old: Tags = [("Name", "web"), ("Env", "stg"), ("Owner", "ops")]
            .into_iter()
            .collect();
        let new: Tags = [("Name", "web"), ("Env", "prod"), ("Team", "edge")]
            .into_iter()
            .collect();

        let diff = old.diff(&new);
        assert_eq!(
            diff.upsert,
            vec![Tag::new("Env", "prod"), Tag::new("Team", "edge")]
        );
        assert_eq!(diff.remove, vec!["Owner".to_string()]);
        assert!(new.diff(&new).is_empty());
    }
}
