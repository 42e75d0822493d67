//! Unordered sets of directory object identifiers (owners, members)

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An unordered set of remote object identifiers.
///
/// Equality ignores input order and duplicates. Serialized as a sorted list;
/// deserialized through `Vec<String>` so empty ids never enter the set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct RelationshipSet(BTreeSet<String>);

impl RelationshipSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.0.insert(id.into())
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.0.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    /// Identifiers in `self` that are not in `other`, in sorted order.
    pub fn difference(&self, other: &RelationshipSet) -> Vec<String> {
        self.0.difference(&other.0).cloned().collect()
    }

    pub fn union(&self, other: &RelationshipSet) -> RelationshipSet {
        Self(self.0.union(&other.0).cloned().collect())
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for RelationshipSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(Into::into)
                .filter(|id: &String| !id.is_empty())
                .collect(),
        )
    }
}

impl From<Vec<String>> for RelationshipSet {
    fn from(ids: Vec<String>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<&[String]> for RelationshipSet {
    fn from(ids: &[String]) -> Self {
        ids.iter().cloned().collect()
    }
}

impl IntoIterator for RelationshipSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
