//! In-memory record collection kept in sync with the backend.
//!
//! The snapshot from `GET /api/objects` and the push events are merged over
//! the record id, so the resulting collection does not depend on whether the
//! snapshot or an event is observed first. Every event is numbered as it is
//! applied; a snapshot carries the [`SnapshotMark`] taken when it was
//! requested and is authoritative for everything learned before that mark.

use crate::record::Record;
use std::collections::{HashMap, HashSet};

/// Position in the event stream at the time a snapshot was requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct SnapshotMark(u64);

#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<Record>,
    events: u64,
    // ids learned from push events that no snapshot has confirmed yet
    unconfirmed: HashMap<String, u64>,
    tombstones: HashMap<String, u64>,
    deleting: HashSet<String>,
}

impl RecordSet {
    pub fn new() -> Self {
        RecordSet::default()
    }

    /// Visible records, newest first.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Take this right before requesting a snapshot.
    pub fn mark(&self) -> SnapshotMark {
        SnapshotMark(self.events)
    }

    fn next_event(&mut self) -> u64 {
        self.events += 1;
        self.events
    }

    /// Merges a snapshot requested at `mark`.
    ///
    /// Records learned from events after `mark` are kept in front even when
    /// the snapshot lacks them; those learned before it are dropped unless
    /// the snapshot still lists them. Tombstones older than `mark` whose id
    /// the snapshot no longer lists are forgotten.
    pub fn apply_snapshot(&mut self, mark: SnapshotMark, snapshot: Vec<Record>) {
        let SnapshotMark(mark) = mark;
        let listed = snapshot
            .iter()
            .map(|record| record.id.clone())
            .collect::<HashSet<_>>();

        self.tombstones
            .retain(|id, &mut seq| seq > mark || listed.contains(id));
        self.unconfirmed
            .retain(|id, &mut seq| seq > mark && !listed.contains(id));

        let tombstones = &self.tombstones;
        let mut seen = HashSet::new();
        let snapshot = snapshot
            .into_iter()
            .filter(|record| !tombstones.contains_key(&record.id))
            .filter(|record| seen.insert(record.id.clone()))
            .collect::<Vec<_>>();

        let unconfirmed = &self.unconfirmed;
        let mut merged = self
            .records
            .drain(..)
            .filter(|record| unconfirmed.contains_key(&record.id))
            .collect::<Vec<_>>();
        merged.extend(snapshot);
        self.records = merged;

        let records = &self.records;
        self.deleting
            .retain(|id| records.iter().any(|record| &record.id == id));
    }

    /// Returns `true` if the visible collection changed.
    pub fn apply_created(&mut self, record: Record) -> bool {
        if self.tombstones.contains_key(&record.id) {
            return false;
        }
        let seq = self.next_event();

        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                if *existing == record {
                    return false;
                }
                if let Some(learned) = self.unconfirmed.get_mut(&record.id) {
                    *learned = seq;
                }
                *existing = record;
            }
            None => {
                self.unconfirmed.insert(record.id.clone(), seq);
                self.records.insert(0, record);
            }
        }
        true
    }

    /// Returns `true` if a record was removed. Unknown ids are still tombstoned.
    pub fn apply_deleted(&mut self, id: &str) -> bool {
        let seq = self.next_event();
        self.tombstones.insert(id.to_string(), seq);
        self.unconfirmed.remove(id);
        self.deleting.remove(id);

        let before = self.records.len();
        self.records.retain(|record| record.id != id);
        self.records.len() != before
    }

    /// Marks `id` as waiting for its delete confirmation. Returns `false` when
    /// the record is unknown or a delete for it is already outstanding.
    pub fn begin_delete(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.deleting.insert(id.to_string())
    }

    pub fn is_deleting(&self, id: &str) -> bool {
        self.deleting.contains(id)
    }

    pub fn delete_failed(&mut self, id: &str) {
        self.deleting.remove(id);
    }

    /// The delete request went through but no confirming event arrived in
    /// time. Returns `true` if the record is still visible.
    pub fn delete_unconfirmed(&mut self, id: &str) -> bool {
        self.deleting.remove(id) && self.contains(id)
    }
}
