//! Merge per-sample identification records into matrix rows.
//!
//! Rows are keyed either by peptide sequence alone, or by sequence and
//! protein group. Per-sample spectral counts are summed, per-sample scores
//! only ever rise, and uniqueness flags are never downgraded by a later record.

use crate::error::Error;
use crate::membership::UniquenessFlags;
use crate::projector::SampleCells;
use crate::record::{GroupEvidence, ProteinGroupMatch};
use fnv::FnvHashMap;
use itertools::Itertools;
use log::info;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Records sharing a sequence merge, even across protein groups
    #[default]
    Sequence,
    SequenceAndGroup,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub sequence: String,
    pub group: Option<String>,
}

impl RowKey {
    fn new(mode: AggregationMode, record: &ProteinGroupMatch, evidence: &GroupEvidence) -> Self {
        RowKey {
            sequence: record.sequence.clone(),
            group: match mode {
                AggregationMode::Sequence => None,
                AggregationMode::SequenceAndGroup => Some(evidence.group.clone()),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatrixRow {
    pub sequence: String,
    pub groups: Vec<String>,
    /// Deduplicated, sorted
    pub accessions: Vec<String>,
    /// Summed spectral counts, one per sample column
    pub counts: Vec<u32>,
    /// Best score, one per sample column
    pub scores: Vec<f64>,
    pub unique_to_protein_group: bool,
    pub unique_to_sample_database: bool,
    pub flags: UniquenessFlags,
    pub dataset: String,
    pub mass: f64,
    pub length: usize,
    /// Filled in by [`crate::projector::project`]
    pub cells: SampleCells,
}

impl MatrixRow {
    fn new(sample_count: usize, record: &ProteinGroupMatch, evidence: &GroupEvidence) -> Self {
        MatrixRow {
            sequence: record.sequence.clone(),
            groups: vec![evidence.group.clone()],
            accessions: evidence
                .accessions
                .iter()
                .cloned()
                .sorted()
                .dedup()
                .collect(),
            counts: vec![0; sample_count],
            scores: vec![0.0; sample_count],
            unique_to_protein_group: record.unique_to_group(),
            unique_to_sample_database: record.unique_to_sample_database(),
            flags: record.flags,
            dataset: record.dataset.clone(),
            mass: record.mass,
            length: record.length,
            cells: SampleCells::default(),
        }
    }

    /// The protein group of a row built in [`AggregationMode::SequenceAndGroup`]
    pub fn group(&self) -> Option<&str> {
        self.groups.first().map(String::as_str)
    }

    fn merge_group(&mut self, evidence: &GroupEvidence) {
        if !self.groups.contains(&evidence.group) {
            self.groups.push(evidence.group.clone());
        }
        if evidence
            .accessions
            .iter()
            .any(|acc| self.accessions.binary_search(acc).is_err())
        {
            self.accessions.extend(evidence.accessions.iter().cloned());
            self.accessions.sort();
            self.accessions.dedup();
        }
    }

    fn add_evidence(&mut self, sample_index: usize, count: u32, score: f64) {
        self.counts[sample_index] = self.counts[sample_index].saturating_add(count);
        if score > self.scores[sample_index] {
            self.scores[sample_index] = score;
        }
    }
}

pub struct Aggregator {
    mode: AggregationMode,
    sample_count: usize,
    rows: Vec<MatrixRow>,
    index: FnvHashMap<RowKey, usize>,
}

impl Aggregator {
    pub fn new(sample_count: usize, mode: AggregationMode) -> Self {
        Aggregator {
            mode,
            sample_count,
            rows: Vec::new(),
            index: FnvHashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Merge one record into the matrix
    pub fn add(&mut self, record: &ProteinGroupMatch) -> Result<(), Error> {
        if record.sample_index >= self.sample_count {
            return Err(Error::SampleIndexOutOfRange {
                sample: record.sample.clone(),
                index: record.sample_index,
                sample_count: self.sample_count,
            });
        }

        // Rows this record has already contributed to. In `Sequence` mode,
        // every group of a record maps to the same row.
        let mut touched: Vec<usize> = Vec::with_capacity(record.groups.len());

        for evidence in &record.groups {
            let key = RowKey::new(self.mode, record, evidence);
            match self.index.get(&key) {
                None => {
                    let ix = self.rows.len();
                    let mut row = MatrixRow::new(self.sample_count, record, evidence);
                    contribute(self.mode, &mut row, record, evidence);
                    self.rows.push(row);
                    self.index.insert(key, ix);
                    touched.push(ix);
                }
                Some(&ix) if touched.contains(&ix) => {
                    self.rows[ix].merge_group(evidence);
                }
                Some(&ix) => {
                    let row = &mut self.rows[ix];
                    contribute(self.mode, row, record, evidence);
                    row.merge_group(evidence);
                    // Backed by more than one record now
                    row.unique_to_protein_group = false;
                    row.unique_to_sample_database |= record.unique_to_sample_database();
                    row.flags.merge(&record.flags);
                    touched.push(ix);
                }
            }
        }
        Ok(())
    }

    /// Rows in the order their keys were first encountered
    pub fn finish(self) -> Vec<MatrixRow> {
        self.rows
    }
}

fn contribute(
    mode: AggregationMode,
    row: &mut MatrixRow,
    record: &ProteinGroupMatch,
    evidence: &GroupEvidence,
) {
    let (count, score) = match mode {
        AggregationMode::Sequence => (record.spectral_count(), record.best_score()),
        AggregationMode::SequenceAndGroup => (evidence.spectral_count, evidence.best_score()),
    };
    row.add_evidence(record.sample_index, count, score);
}

/// Aggregate `records` into one row per key. Records are visited in a stable
/// order sorted by sequence, so the output is reproducible for identical input.
pub fn aggregate(
    records: &[ProteinGroupMatch],
    sample_count: usize,
    mode: AggregationMode,
) -> Result<Vec<MatrixRow>, Error> {
    let start = Instant::now();
    let mut ordered = records.iter().collect::<Vec<_>>();
    ordered.sort_by(|a, b| a.sequence.cmp(&b.sequence));

    let mut aggregator = Aggregator::new(sample_count, mode);
    for record in ordered {
        if record.groups.is_empty() {
            log::trace!(
                "`{}` from {} has no protein groups, skipping",
                record.sequence,
                record.sample
            );
            continue;
        }
        aggregator.add(record)?;
    }

    info!(
        "aggregated {} records into {} rows in {}ms",
        records.len(),
        aggregator.len(),
        start.elapsed().as_millis()
    );
    Ok(aggregator.finish())
}
