//! Snapshot differ.
//!
//! Classifies every property of a fresh fetch against the previously
//! stored snapshot. Each current key lands in exactly one of `added`,
//! `modified` or `retained`; keys that disappeared land in `removed`.

use vigil_types::{Property, PropertyMap, RESPONSE_TIME_KEY};

/// Classified property changes for one service and one check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotDiff {
    /// Keys present now but not in the previous snapshot.
    pub added: PropertyMap,

    /// Watched keys whose value changed.
    pub modified: PropertyMap,

    /// Keys present previously but not now. Only the key survives.
    pub removed: Vec<String>,

    /// Everything else, followed by the synthetic response time.
    pub retained: Vec<(String, Property)>,
}

impl SnapshotDiff {
    /// Diff `current` against `previous`.
    ///
    /// With no previous snapshot every current key is added.
    pub fn compute(
        previous: Option<&PropertyMap>,
        current: &PropertyMap,
        response_time: Property,
    ) -> Self {
        let empty = PropertyMap::new();
        let previous = previous.unwrap_or(&empty);

        let mut diff = SnapshotDiff::default();

        for (key, property) in current {
            match previous.get(key) {
                None => {
                    diff.added.insert(key.clone(), property.clone());
                }
                Some(before) if is_modified(before, property) => {
                    diff.modified.insert(key.clone(), property.clone());
                }
                Some(_) => diff.retained.push((key.clone(), property.clone())),
            }
        }

        diff.removed = previous
            .keys()
            .filter(|key| !current.contains_key(*key))
            .cloned()
            .collect();

        diff.retained
            .push((RESPONSE_TIME_KEY.to_string(), response_time));
        diff
    }

    /// Outcome for a fetch that produced no structured properties.
    pub fn without_properties(response_time: Property) -> Self {
        Self {
            retained: vec![(RESPONSE_TIME_KEY.to_string(), response_time)],
            ..Default::default()
        }
    }

    /// Whether anything was added, modified or removed.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.modified.is_empty() || !self.removed.is_empty()
    }
}

fn is_modified(before: &Property, now: &Property) -> bool {
    if !now.watch_for_change {
        return false;
    }
    match (&now.value, &before.value) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(now), Some(before)) => !now.structurally_equals(before),
    }
}
