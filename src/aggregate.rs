//! Counting, averaging and "most common value" reductions.
//!
//! Empty input never faults. Each reduction that can see an empty sequence
//! states what it returns in that case, and call sites pick the variant their
//! result shape asks for.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::store::KeyHasher;

/// `100 * matching / total`, or 0 when there is nothing to take a share of.
pub fn percentage(matching: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    matching as f64 / total as f64 * 100.0
}

/// Arithmetic mean, `None` on empty input.
pub fn mean_or_null<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Arithmetic mean, 0 on empty input.
pub fn mean_or_zero<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    mean_or_null(values).unwrap_or(0.0)
}

/// `numerator / denominator`, 0 when the denominator is 0.
pub fn ratio_or_zero(numerator: f64, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

// ------------- Tally -------------
/// A frequency map that remembers the order keys were first seen in.
///
/// The leader is updated while counting: a key takes the lead only when its
/// count goes strictly above the current leader's. On ties the key that got
/// to the maximum count first therefore keeps the lead.
#[derive(Debug, Clone)]
pub struct Tally<K> {
    counts: Vec<(K, usize)>,
    index: HashMap<K, usize, KeyHasher>,
    leader: Option<usize>,
}
impl<K: Eq + Hash + Clone> Tally<K> {
    pub fn new() -> Self {
        Self {
            counts: Vec::new(),
            index: HashMap::default(),
            leader: None,
        }
    }
    pub fn add(&mut self, key: K) {
        let slot = match self.index.get(&key) {
            Some(slot) => *slot,
            None => {
                let slot = self.counts.len();
                self.index.insert(key.clone(), slot);
                self.counts.push((key, 0));
                slot
            }
        };
        self.counts[slot].1 += 1;
        let count = self.counts[slot].1;
        match self.leader {
            Some(leader) if self.counts[leader].1 >= count => (),
            _ => self.leader = Some(slot),
        }
    }
    pub fn count(&self, key: &K) -> usize {
        self.index.get(key).map_or(0, |slot| self.counts[*slot].1)
    }
    /// The most frequent key, `None` when nothing was counted.
    pub fn most_common(&self) -> Option<&K> {
        self.leader.map(|slot| &self.counts[slot].0)
    }
    pub fn into_most_common(mut self) -> Option<K> {
        let slot = self.leader?;
        Some(self.counts.swap_remove(slot).0)
    }
    /// Keys with their counts, in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, usize)> {
        self.counts.iter().map(|(key, count)| (key, *count))
    }
    pub fn len(&self) -> usize {
        self.counts.len()
    }
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
impl<K: Eq + Hash + Clone> Default for Tally<K> {
    fn default() -> Self {
        Self::new()
    }
}
impl<K: Eq + Hash + Clone> FromIterator<K> for Tally<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tally = Self::new();
        for key in iter {
            tally.add(key);
        }
        tally
    }
}
impl<K: Eq + Hash + Clone> IntoIterator for Tally<K> {
    type Item = (K, usize);
    type IntoIter = std::vec::IntoIter<(K, usize)>;
    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}

/// The most common value. Callers drop nulls before counting.
pub fn mode<K, I>(values: I) -> Option<K>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    values.into_iter().collect::<Tally<K>>().into_most_common()
}

// ------------- Grouping -------------
/// Partitions `items` by `key`, keeping groups in first-seen order and items
/// in input order within a group. Items without a key are left out.
pub fn group_by<K, T, I, F>(items: I, mut key: F) -> Vec<(K, Vec<T>)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
    F: FnMut(&T) -> Option<K>,
{
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();
    let mut index: HashMap<K, usize, KeyHasher> = HashMap::default();
    for item in items {
        let Some(k) = key(&item) else { continue };
        match index.get(&k) {
            Some(slot) => groups[*slot].1.push(item),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![item]));
            }
        }
    }
    groups
}

/// Distinct values in first-seen order.
pub fn distinct<K, I>(values: I) -> Vec<K>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut seen: HashSet<K, KeyHasher> = HashSet::default();
    let mut kept = Vec::new();
    for value in values {
        if seen.insert(value.clone()) {
            kept.push(value);
        }
    }
    kept
}
