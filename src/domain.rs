use std::fmt;
use std::str::FromStr;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest as _, Sha256};

use crate::error::SeqDedupError;

/// One FASTA entry: accession, full header text and residues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub id: String,
    pub description: String,
    pub sequence: String,
}

impl SequenceRecord {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        sequence: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            sequence: sequence.into(),
        }
    }

    /// Builds a record from header text (without the leading `>`). The id is
    /// the first whitespace-delimited token, the description the whole header.
    pub fn from_header(header: &str, sequence: impl Into<String>) -> Self {
        let description = header.trim();
        let id = description.split_whitespace().next().unwrap_or("");
        Self::new(id, description, sequence)
    }

    /// Header text following the identifier token, or `""` when there is none.
    pub fn description_remainder(&self) -> &str {
        let trimmed = self.description.trim_start();
        match trimmed.split_once(char::is_whitespace) {
            Some((_, rest)) => rest.trim_start(),
            None => "",
        }
    }

    pub fn digest(&self) -> SequenceDigest {
        SequenceDigest::of(&self.sequence)
    }

    pub fn as_member(&self) -> Member {
        Member {
            acc: self.id.clone(),
            descr: self.description.clone(),
        }
    }
}

/// Entry of a group's membership manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub acc: String,
    pub descr: String,
}

/// SHA-256 of a residue string; displayed and serialized as 64 lowercase hex
/// characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceDigest([u8; 32]);

impl SequenceDigest {
    pub fn of(sequence: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(sequence.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for SequenceDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for SequenceDigest {
    type Err = SeqDedupError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(trimmed, &mut bytes)
            .map_err(|_| SeqDedupError::InvalidDigest(value.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for SequenceDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Substring identifying a reference ("type") strain, e.g. `BU_ATCC8492`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeMarker(String);

impl TypeMarker {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, id: &str) -> bool {
        id.contains(self.0.as_str())
    }
}

impl fmt::Display for TypeMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TypeMarker {
    type Err = SeqDedupError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        if normalized.is_empty() || normalized.chars().any(char::is_whitespace) {
            return Err(SeqDedupError::InvalidTypeMarker(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

/// Selection priority of a candidate representative. Higher wins; equal
/// priorities keep the earlier arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Ordinary,
    TypeStrain,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeMarkers(IndexSet<TypeMarker>);

impl TypeMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, marker: TypeMarker) -> bool {
        self.0.insert(marker)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeMarker> {
        self.0.iter()
    }

    /// Substring containment, not equality: `BU_ATCC8492` matches
    /// `BU_ATCC8492_CDS1`.
    pub fn matches(&self, id: &str) -> bool {
        self.0.iter().any(|marker| marker.matches(id))
    }

    pub fn priority(&self, id: &str) -> Priority {
        if self.matches(id) {
            Priority::TypeStrain
        } else {
            Priority::Ordinary
        }
    }
}

impl FromIterator<TypeMarker> for TypeMarkers {
    fn from_iter<I: IntoIterator<Item = TypeMarker>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn header_splits_id_from_description() {
        let record = SequenceRecord::from_header("WP_0001.1 DNA gyrase [Bacteroides]", "MKT");
        assert_eq!(record.id, "WP_0001.1");
        assert_eq!(record.description, "WP_0001.1 DNA gyrase [Bacteroides]");
        assert_eq!(record.description_remainder(), "DNA gyrase [Bacteroides]");
    }

    #[test]
    fn remainder_of_bare_header_is_empty() {
        let record = SequenceRecord::from_header("X_1", "");
        assert_eq!(record.description_remainder(), "");
    }

    #[test]
    fn digest_is_sha256_hex() {
        let digest = SequenceDigest::of("");
        assert_eq!(
            digest.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(digest.to_string().len(), 64);
    }

    #[test]
    fn digest_is_case_sensitive() {
        assert_ne!(SequenceDigest::of("mkt"), SequenceDigest::of("MKT"));
    }

    #[test]
    fn parse_digest_invalid() {
        let err = "abc".parse::<SequenceDigest>().unwrap_err();
        assert_matches!(err, SeqDedupError::InvalidDigest(_));
    }

    #[test]
    fn marker_matches_substring() {
        let markers: TypeMarkers = ["BU_ATCC8492".parse::<TypeMarker>().unwrap()]
            .into_iter()
            .collect();
        assert!(markers.matches("BU_ATCC8492_CDS1"));
        assert!(!markers.matches("BU_DSM2079_CDS1"));
        assert_eq!(markers.priority("xBU_ATCC8492"), Priority::TypeStrain);
    }

    #[test]
    fn parse_marker_blank() {
        let err = "  ".parse::<TypeMarker>().unwrap_err();
        assert_matches!(err, SeqDedupError::InvalidTypeMarker(_));
    }
}
