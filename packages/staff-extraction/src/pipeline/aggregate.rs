//! Result aggregator: dedup by identity key, first-seen order.

use indexmap::IndexMap;

use crate::types::record::{IdentityKey, StaffRecord};

/// Running, deduplicated record set for one traversal.
#[derive(Debug, Default)]
pub struct Aggregator {
    records: IndexMap<IdentityKey, StaffRecord>,
}

/// What one [`Aggregator::merge`] call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Records whose identity key was not seen before
    pub added: usize,

    /// Existing records that gained a previously absent field
    pub filled: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge incoming records.
    ///
    /// A known identity keeps its existing record; absent fields are filled
    /// from the incoming one, present fields are never overwritten.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = StaffRecord>) -> MergeSummary {
        let mut summary = MergeSummary::default();

        for record in incoming {
            match self.records.get_mut(&record.identity_key()) {
                Some(existing) => {
                    if existing.fill_from(&record) {
                        summary.filled += 1;
                    }
                }
                None => {
                    self.records.insert(record.identity_key(), record);
                    summary.added += 1;
                }
            }
        }

        summary
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &StaffRecord> {
        self.records.values()
    }

    /// Consume into records, in first-seen order.
    pub fn into_records(self) -> Vec<StaffRecord> {
        self.records.into_values().collect()
    }
}

/// Merge two record lists into one deduplicated list.
pub fn merge(existing: Vec<StaffRecord>, incoming: Vec<StaffRecord>) -> Vec<StaffRecord> {
    let mut aggregator = Aggregator::new();
    aggregator.merge(existing);
    aggregator.merge(incoming);
    aggregator.into_records()
}
