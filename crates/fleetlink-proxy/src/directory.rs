//! Priority buckets of linked backend names.

use std::collections::BTreeMap;

/// Backend names grouped by priority.
///
/// Iteration visits priorities from highest to lowest and, inside one
/// priority, names in the order they were linked. A name lives in at most
/// one bucket; linking it again moves it.
///
/// ```text
/// 20 → ["L2", "L3"]
/// 10 → ["L1"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityDirectory {
    buckets: BTreeMap<i32, Vec<String>>,
}

impl PriorityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `name` to the `priority` bucket.
    ///
    /// If the name was already present it is removed from its old position
    /// first, and the old priority is returned.
    pub fn insert(&mut self, name: impl Into<String>, priority: i32) -> Option<i32> {
        let name = name.into();
        let previous = self.remove(&name);
        self.buckets.entry(priority).or_default().push(name);
        previous
    }

    /// Removes `name` from whichever bucket holds it, returning that
    /// bucket's priority. Buckets left empty are dropped.
    pub fn remove(&mut self, name: &str) -> Option<i32> {
        let priority = self.priority_of(name)?;
        if let Some(bucket) = self.buckets.get_mut(&priority) {
            bucket.retain(|n| n != name);
            if bucket.is_empty() {
                self.buckets.remove(&priority);
            }
        }
        Some(priority)
    }

    /// The priority `name` is linked at, if any.
    pub fn priority_of(&self, name: &str) -> Option<i32> {
        self.buckets
            .iter()
            .find(|(_, bucket)| bucket.iter().any(|n| n == name))
            .map(|(priority, _)| *priority)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.priority_of(name).is_some()
    }

    /// The names in one bucket, in link order.
    pub fn bucket(&self, priority: i32) -> &[String] {
        self.buckets.get(&priority).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every `(priority, name)` pair, highest priority first.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &str)> + '_ {
        self.buckets
            .iter()
            .rev()
            .flat_map(|(priority, bucket)| bucket.iter().map(move |n| (*priority, n.as_str())))
    }

    /// The first name in iteration order accepted by `pred`.
    pub fn first_where(&self, mut pred: impl FnMut(&str) -> bool) -> Option<&str> {
        self.iter().map(|(_, name)| name).find(|name| pred(name))
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
