//! Per-sample cell projection.
//!
//! After aggregation, every row gets a block of per-sample cells: a projected
//! spectral count, the coverage/score text of each contributing record, and a
//! counter per dataset label. Sample columns come from the sample identifier
//! through a [`SampleLayout`], not from the index stored on the record.

use crate::aggregate::{AggregationMode, MatrixRow};
use crate::error::Error;
use crate::record::ProteinGroupMatch;
use fnv::FnvHashMap;
use log::info;
use serde::Serialize;
use std::time::Instant;

/// Separator between coverage values written to the same cell
pub const COVERAGE_SEPARATOR: char = ';';

/// Maps sample identifiers such as `Control_2` onto matrix columns: the label
/// prefix selects a block of `replicates` columns, the trailing 1-based
/// integer selects the slot within the block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SampleLayout {
    conditions: Vec<String>,
    replicates: usize,
}

impl SampleLayout {
    pub fn new(conditions: Vec<String>, replicates: usize) -> Result<Self, Error> {
        if conditions.is_empty() {
            return Err(Error::Configuration(
                "at least one condition label is required".into(),
            ));
        }
        if replicates == 0 {
            return Err(Error::Configuration(
                "replicates per condition must be at least 1".into(),
            ));
        }
        if let Some(empty) = conditions.iter().position(|c| c.trim().is_empty()) {
            return Err(Error::Configuration(format!(
                "condition label #{} is empty",
                empty + 1
            )));
        }
        Ok(SampleLayout {
            conditions,
            replicates,
        })
    }

    pub fn sample_count(&self) -> usize {
        self.conditions.len() * self.replicates
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    pub fn replicates(&self) -> usize {
        self.replicates
    }

    /// Column for a sample identifier, always within `[0, sample_count)`
    pub fn column(&self, sample: &str) -> Result<usize, Error> {
        // Longest matching label wins, so `Treated10` is not read as `Treated1` + `0`
        let (block, label) = self
            .conditions
            .iter()
            .enumerate()
            .filter(|(_, label)| sample.starts_with(label.as_str()))
            .max_by_key(|(_, label)| label.len())
            .ok_or_else(|| Error::UnknownSample(sample.into()))?;

        let slot = sample[label.len()..]
            .trim_start_matches(|c: char| c == '_' || c == '-' || c == '.' || c == ' ')
            .parse::<usize>()
            .map_err(|_| Error::UnknownSample(sample.into()))?;

        if slot == 0 || slot > self.replicates {
            return Err(Error::UnknownSample(sample.into()));
        }
        Ok(block * self.replicates + slot - 1)
    }

    /// Canonical identifier for a column, used for output headers
    pub fn sample_name(&self, column: usize) -> Option<String> {
        let label = self.conditions.get(column / self.replicates)?;
        Some(format!("{}_{}", label, column % self.replicates + 1))
    }

    pub fn sample_names(&self) -> Vec<String> {
        (0..self.sample_count())
            .filter_map(|column| self.sample_name(column))
            .collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SampleCells {
    pub counts: Vec<u32>,
    /// `None` until a record writes to the column
    pub coverage: Vec<Option<String>>,
    /// Contributing records per dataset label
    pub datasets: Vec<u32>,
}

impl SampleCells {
    pub fn new(sample_count: usize, dataset_count: usize) -> Self {
        SampleCells {
            counts: vec![0; sample_count],
            coverage: vec![None; sample_count],
            datasets: vec![0; dataset_count],
        }
    }

    /// Add a spectral count to a column, and record its coverage text.
    /// Repeated writes append, keeping every contributing value.
    pub fn write(&mut self, column: usize, count: u32, coverage: &str) {
        self.counts[column] = self.counts[column].saturating_add(count);
        match &mut self.coverage[column] {
            Some(text) => {
                text.push(COVERAGE_SEPARATOR);
                text.push_str(coverage);
            }
            empty => *empty = Some(coverage.to_string()),
        }
    }
}

/// Fill the [`SampleCells`] of every row from the records that contributed to
/// it. Rows built by sequence collect every record with that sequence; rows
/// built by sequence and group only records carrying the row's group.
pub fn project(
    rows: &mut [MatrixRow],
    records: &[ProteinGroupMatch],
    layout: &SampleLayout,
    datasets: &[String],
    mode: AggregationMode,
) -> Result<(), Error> {
    let start = Instant::now();
    let mut by_sequence: FnvHashMap<&str, Vec<&ProteinGroupMatch>> = FnvHashMap::default();
    for record in records {
        by_sequence
            .entry(record.sequence.as_str())
            .or_default()
            .push(record);
    }

    let dataset_index = datasets
        .iter()
        .enumerate()
        .map(|(ix, label)| (label.as_str(), ix))
        .collect::<FnvHashMap<_, _>>();

    for row in rows.iter_mut() {
        let mut cells = SampleCells::new(layout.sample_count(), datasets.len());
        for record in by_sequence
            .get(row.sequence.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            let (count, score) = match mode {
                AggregationMode::Sequence => (record.spectral_count(), record.best_score()),
                AggregationMode::SequenceAndGroup => {
                    match row.group().and_then(|group| record.group(group)) {
                        Some(evidence) => (evidence.spectral_count, evidence.best_score()),
                        None => continue,
                    }
                }
            };

            let column = layout.column(&record.sample)?;
            cells.write(column, count, ryu::Buffer::new().format(score));

            let ix = dataset_index
                .get(record.dataset.as_str())
                .ok_or_else(|| Error::UnknownDataset(record.dataset.clone()))?;
            cells.datasets[*ix] += 1;
        }
        row.cells = cells;
    }

    info!(
        "projected {} records onto {} rows in {}ms",
        records.len(),
        rows.len(),
        start.elapsed().as_millis()
    );
    Ok(())
}
