//! Content-addressed grouping of sequence records.
//!
//! Records are keyed by the SHA-256 of their residues. Each group keeps every
//! member in arrival order and one representative: the first record seen,
//! replaced at most once by the first record whose id matches a type marker.

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::Serialize;
use tracing::debug;

use crate::domain::{Member, Priority, SequenceDigest, SequenceRecord, TypeMarkers};
use crate::error::SeqDedupError;

#[derive(Debug, Clone)]
pub struct SequenceGroup {
    digest: SequenceDigest,
    representative: SequenceRecord,
    priority: Priority,
    members: Vec<Member>,
}

impl SequenceGroup {
    fn new(digest: SequenceDigest, record: SequenceRecord, priority: Priority) -> Self {
        Self {
            digest,
            members: vec![record.as_member()],
            representative: record,
            priority,
        }
    }

    /// Records the candidate as a member and promotes it when it outranks the
    /// current representative. Returns whether a promotion happened.
    fn absorb(&mut self, record: SequenceRecord, priority: Priority) -> bool {
        self.members.push(record.as_member());
        if priority > self.priority {
            self.representative = record;
            self.priority = priority;
            return true;
        }
        false
    }

    pub fn digest(&self) -> SequenceDigest {
        self.digest
    }

    pub fn representative(&self) -> &SequenceRecord {
        &self.representative
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Pinned groups never change representative again.
    pub fn is_type_selected(&self) -> bool {
        self.priority == Priority::TypeStrain
    }

    /// Compact JSON array of `{"acc":..,"descr":..}` in arrival order.
    pub fn manifest_json(&self) -> Result<String, SeqDedupError> {
        serde_json::to_string(&self.members).map_err(|err| SeqDedupError::Encode(err.to_string()))
    }

    /// The record emitted for this group: representative id and residues,
    /// description = header remainder followed by the membership manifest.
    pub fn to_output_record(&self) -> Result<SequenceRecord, SeqDedupError> {
        let description = format!(
            "{} {}",
            self.representative.description_remainder(),
            self.manifest_json()?
        );
        Ok(SequenceRecord::new(
            self.representative.id.clone(),
            description,
            self.representative.sequence.clone(),
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    pub records: usize,
    pub groups: usize,
    pub duplicates: usize,
    pub type_selected: usize,
    pub promotions: usize,
}

#[derive(Debug, Default)]
pub struct Deduplicator {
    markers: TypeMarkers,
    groups: IndexMap<SequenceDigest, SequenceGroup>,
    records: usize,
    promotions: usize,
}

impl Deduplicator {
    pub fn new(markers: TypeMarkers) -> Self {
        Self {
            markers,
            ..Self::default()
        }
    }

    pub fn push(&mut self, record: SequenceRecord) {
        self.records += 1;
        let digest = record.digest();
        let priority = self.markers.priority(&record.id);
        match self.groups.entry(digest) {
            Entry::Vacant(slot) => {
                slot.insert(SequenceGroup::new(digest, record, priority));
            }
            Entry::Occupied(mut slot) => {
                let id = record.id.clone();
                if slot.get_mut().absorb(record, priority) {
                    self.promotions += 1;
                    debug!(digest = %digest, representative = %id, "promoted type strain");
                }
            }
        }
    }

    /// Feeds every record, stopping at the first error. Nothing already
    /// absorbed is emitted on failure since the caller drops `self`.
    pub fn extend_from<I, E>(&mut self, records: I) -> Result<(), E>
    where
        I: IntoIterator<Item = Result<SequenceRecord, E>>,
    {
        for record in records {
            self.push(record?);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups in first-seen order.
    pub fn groups(&self) -> impl Iterator<Item = &SequenceGroup> {
        self.groups.values()
    }

    pub fn stats(&self) -> DedupStats {
        DedupStats {
            records: self.records,
            groups: self.groups.len(),
            duplicates: self.records - self.groups.len(),
            type_selected: self
                .groups
                .values()
                .filter(|group| group.is_type_selected())
                .count(),
            promotions: self.promotions,
        }
    }

    pub fn output_records(
        &self,
    ) -> impl Iterator<Item = Result<SequenceRecord, SeqDedupError>> + '_ {
        self.groups.values().map(SequenceGroup::to_output_record)
    }
}

/// Groups `records` and returns one output record per distinct sequence, in
/// first-seen order.
pub fn deduplicate<I>(
    records: I,
    markers: TypeMarkers,
) -> Result<Vec<SequenceRecord>, SeqDedupError>
where
    I: IntoIterator<Item = SequenceRecord>,
{
    let mut dedup = Deduplicator::new(markers);
    for record in records {
        dedup.push(record);
    }
    dedup.output_records().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TypeMarker;

    fn markers(values: &[&str]) -> TypeMarkers {
        values
            .iter()
            .map(|value| value.parse::<TypeMarker>().unwrap())
            .collect()
    }

    fn record(id: &str, sequence: &str) -> SequenceRecord {
        SequenceRecord::new(id, format!("{id} hypothetical protein"), sequence)
    }

    #[test]
    fn first_record_represents_by_default() {
        let out = deduplicate(
            vec![record("X_1", "MKT"), record("X_2", "MKT")],
            TypeMarkers::new(),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "X_1");
        assert_eq!(
            out[0].description,
            r#"hypothetical protein [{"acc":"X_1","descr":"X_1 hypothetical protein"},{"acc":"X_2","descr":"X_2 hypothetical protein"}]"#
        );
    }

    #[test]
    fn type_strain_is_promoted_without_reordering_members() {
        let mut dedup = Deduplicator::new(markers(&["X_2"]));
        dedup.push(record("X_1", "MKT"));
        dedup.push(record("X_2", "MKT"));
        let group = dedup.groups().next().unwrap();
        assert_eq!(group.representative().id, "X_2");
        assert!(group.is_type_selected());
        let accs: Vec<_> = group.members().iter().map(|m| m.acc.as_str()).collect();
        assert_eq!(accs, ["X_1", "X_2"]);
        assert_eq!(dedup.stats().promotions, 1);
    }

    #[test]
    fn pinned_group_keeps_first_type_match() {
        let mut dedup = Deduplicator::new(markers(&["T"]));
        dedup.push(record("A", "MKT"));
        dedup.push(record("T1", "MKT"));
        dedup.push(record("T2", "MKT"));
        dedup.push(record("B", "MKT"));
        let group = dedup.groups().next().unwrap();
        assert_eq!(group.representative().id, "T1");
        assert_eq!(group.members().len(), 4);
    }

    #[test]
    fn type_match_at_creation_pins_immediately() {
        let mut dedup = Deduplicator::new(markers(&["T"]));
        dedup.push(record("T1", "MKT"));
        dedup.push(record("T2", "MKT"));
        let group = dedup.groups().next().unwrap();
        assert!(group.is_type_selected());
        assert_eq!(group.representative().id, "T1");
        assert_eq!(dedup.stats().promotions, 0);
    }

    #[test]
    fn bare_header_yields_leading_space() {
        let out = deduplicate(
            vec![SequenceRecord::new("X_1", "X_1", "MKT")],
            TypeMarkers::new(),
        )
        .unwrap();
        assert_eq!(out[0].description, r#" [{"acc":"X_1","descr":"X_1"}]"#);
    }

    #[test]
    fn stats_count_duplicates() {
        let mut dedup = Deduplicator::new(TypeMarkers::new());
        dedup.push(record("a", "AAA"));
        dedup.push(record("b", "AAA"));
        dedup.push(record("c", "CCC"));
        let stats = dedup.stats();
        assert_eq!(stats.records, 3);
        assert_eq!(stats.groups, 2);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.type_selected, 0);
    }

    #[test]
    fn manifest_json_is_compact_and_ordered() {
        let mut dedup = Deduplicator::new(markers(&["X_2"]));
        dedup.push(record("X_1", "MKT"));
        dedup.push(record("X_2", "MKT"));
        let group = dedup.groups().next().unwrap();
        assert_eq!(
            group.manifest_json().unwrap(),
            r#"[{"acc":"X_1","descr":"X_1 hypothetical protein"},{"acc":"X_2","descr":"X_2 hypothetical protein"}]"#
        );
    }
}
