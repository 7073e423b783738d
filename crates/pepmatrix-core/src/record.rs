use crate::membership::{Namespace, UniquenessFlags};
use serde::Serialize;

/// Evidence for a peptide within one protein group
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GroupEvidence {
    pub group: String,
    pub accessions: Vec<String>,
    pub scores: Vec<f64>,
    pub spectral_count: u32,
}

impl GroupEvidence {
    pub fn new<S: Into<String>>(group: S) -> Self {
        GroupEvidence {
            group: group.into(),
            ..Default::default()
        }
    }

    /// Highest score reported for this group, 0.0 if none were reported
    pub fn best_score(&self) -> f64 {
        self.scores.iter().copied().fold(0.0, f64::max)
    }
}

/// One identification record: a peptide sequence from one sample, with the
/// protein groups it was assigned to
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProteinGroupMatch {
    pub sequence: String,
    pub groups: Vec<GroupEvidence>,
    /// Sample identifier, e.g. `Control_2`
    pub sample: String,
    /// Matrix column of `sample`
    pub sample_index: usize,
    pub dataset: String,
    pub mass: f64,
    pub length: usize,
    pub flags: UniquenessFlags,
}

impl ProteinGroupMatch {
    pub fn new<S: Into<String>>(sequence: S, sample: S, sample_index: usize) -> Self {
        let sequence = sequence.into();
        ProteinGroupMatch {
            length: sequence.len(),
            sequence,
            sample: sample.into(),
            sample_index,
            ..Default::default()
        }
    }

    /// Add evidence for a protein group. Evidence for a group that is already
    /// present is folded into the existing entry.
    pub fn push_group(&mut self, evidence: GroupEvidence) {
        match self.groups.iter_mut().find(|g| g.group == evidence.group) {
            Some(existing) => {
                existing.accessions.extend(evidence.accessions);
                existing.scores.extend(evidence.scores);
                existing.spectral_count = existing.spectral_count.max(evidence.spectral_count);
            }
            None => self.groups.push(evidence),
        }
    }

    pub fn unique_to_group(&self) -> bool {
        self.groups.len() == 1
    }

    pub fn unique_to_sample_database(&self) -> bool {
        self.flags.is_unique(Namespace::Individual)
    }

    pub fn best_score(&self) -> f64 {
        self.groups
            .iter()
            .map(GroupEvidence::best_score)
            .fold(0.0, f64::max)
    }

    /// Spectral count of the record as a whole. Groups of one record report
    /// the same spectra, so the counts are not summed.
    pub fn spectral_count(&self) -> u32 {
        self.groups
            .iter()
            .map(|g| g.spectral_count)
            .max()
            .unwrap_or(0)
    }

    pub fn group(&self, group: &str) -> Option<&GroupEvidence> {
        self.groups.iter().find(|g| g.group == group)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn push_group_folds_duplicates() {
        let mut record = ProteinGroupMatch::new("AAAGGG", "Control_1", 0);
        record.push_group(GroupEvidence {
            group: "G1".into(),
            accessions: vec!["P1".into()],
            scores: vec![10.0],
            spectral_count: 2,
        });
        record.push_group(GroupEvidence {
            group: "G1".into(),
            accessions: vec!["P2".into()],
            scores: vec![30.0],
            spectral_count: 1,
        });
        assert!(record.unique_to_group());
        assert_eq!(record.groups[0].accessions, vec!["P1", "P2"]);
        assert_eq!(record.best_score(), 30.0);
        assert_eq!(record.spectral_count(), 2);
        assert_eq!(record.length, 6);

        record.push_group(GroupEvidence::new("G2"));
        assert!(!record.unique_to_group());
        assert_eq!(record.group("G2").map(|g| g.best_score()), Some(0.0));
    }
}
