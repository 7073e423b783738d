//! Read per-sample identification tables.
//!
//! Expected tab-separated columns (by header name, in any order):
//! `peptide`, `protein_group`, `accessions` (`;`-separated), `score`,
//! `spectral_count` and, optionally, `mass` and `length`. One row per
//! peptide/protein group pair; rows sharing a peptide are folded into a single
//! [`ProteinGroupMatch`].

use crate::input::Sample;
use fnv::FnvHashMap;
use pepmatrix_core::peptide::strip_modifications;
use pepmatrix_core::record::{GroupEvidence, ProteinGroupMatch};
use pepmatrix_core::Error;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const REQUIRED_COLUMNS: [&str; 5] = [
    "peptide",
    "protein_group",
    "accessions",
    "score",
    "spectral_count",
];

#[derive(Deserialize)]
struct Row {
    peptide: String,
    protein_group: String,
    accessions: String,
    score: f64,
    spectral_count: u32,
    #[serde(default)]
    mass: Option<f64>,
    #[serde(default)]
    length: Option<usize>,
}

/// Records read from one sample, plus the rows that had to be skipped
pub struct SampleRecords {
    pub records: Vec<ProteinGroupMatch>,
    pub malformed: Vec<Error>,
}

pub struct IdentificationReader {
    strip_modifications: bool,
}

impl IdentificationReader {
    pub fn new(strip_modifications: bool) -> Self {
        IdentificationReader {
            strip_modifications,
        }
    }

    /// Read all records of a sample. Errors returned here mean the whole
    /// sample is unusable; single bad rows end up in [`SampleRecords::malformed`].
    pub fn read(&self, sample: &Sample) -> Result<SampleRecords, Error> {
        let path = PathBuf::from(&sample.path);
        let file = std::fs::File::open(&path).map_err(|source| Error::InputUnavailable {
            path: path.clone(),
            source,
        })?;
        self.read_from(file, &path, sample)
    }

    pub fn read_from<R: std::io::Read>(
        &self,
        rdr: R,
        path: &Path,
        sample: &Sample,
    ) -> Result<SampleRecords, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .trim(csv::Trim::All)
            .from_reader(rdr);

        let headers = reader
            .headers()
            .map_err(|e| malformed(path, 1, e.to_string()))?
            .clone();
        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|column| !headers.iter().any(|h| h == **column))
        {
            return Err(malformed(path, 1, format!("missing column `{}`", missing)));
        }

        let mut records: Vec<ProteinGroupMatch> = Vec::new();
        let mut index: FnvHashMap<String, usize> = FnvHashMap::default();
        let mut bad = Vec::new();

        let mut raw = csv::StringRecord::new();
        loop {
            match reader.read_record(&mut raw) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) if e.is_io_error() => {
                    return Err(Error::InputUnavailable {
                        path: path.to_path_buf(),
                        source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                    })
                }
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or_default();
                    bad.push(malformed(path, line, e.to_string()));
                    continue;
                }
            }
            let line = raw.position().map(|p| p.line()).unwrap_or_default();

            let row = match raw.deserialize::<Row>(Some(&headers)) {
                Ok(row) => row,
                Err(e) => {
                    bad.push(malformed(path, line, e.to_string()));
                    continue;
                }
            };
            match self.evidence(&row) {
                Ok((sequence, evidence)) => {
                    let ix = *index.entry(sequence.clone()).or_insert_with(|| {
                        let mut record =
                            ProteinGroupMatch::new(sequence.as_str(), sample.sample.as_str(), sample.index);
                        record.dataset = sample.dataset.clone();
                        record.mass = row.mass.unwrap_or_default();
                        if let Some(length) = row.length {
                            record.length = length;
                        }
                        records.push(record);
                        records.len() - 1
                    });
                    records[ix].push_group(evidence);
                }
                Err(reason) => bad.push(malformed(path, line, reason)),
            }
        }

        log::trace!(
            "- {}: {} records, {} malformed rows",
            path.display(),
            records.len(),
            bad.len()
        );
        Ok(SampleRecords {
            records,
            malformed: bad,
        })
    }

    fn evidence(&self, row: &Row) -> Result<(String, GroupEvidence), String> {
        let sequence = match self.strip_modifications {
            true => strip_modifications(&row.peptide),
            false => row.peptide.clone(),
        };
        if sequence.is_empty() {
            return Err("empty `peptide`".into());
        }
        if row.protein_group.is_empty() {
            return Err("empty `protein_group`".into());
        }
        let accessions = row
            .accessions
            .split(';')
            .map(str::trim)
            .filter(|acc| !acc.is_empty())
            .map(String::from)
            .collect::<Vec<_>>();
        if accessions.is_empty() {
            return Err("empty `accessions`".into());
        }
        if !row.score.is_finite() {
            return Err(format!("score `{}` is not a finite number", row.score));
        }

        Ok((
            sequence,
            GroupEvidence {
                group: row.protein_group.clone(),
                accessions,
                scores: vec![row.score],
                spectral_count: row.spectral_count,
            },
        ))
    }
}

fn malformed<S: Into<String>>(path: &Path, line: u64, reason: S) -> Error {
    Error::MalformedRecord {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Sample {
        Sample {
            path: "control_2.tsv".into(),
            sample: "Control_2".into(),
            dataset: "discovery".into(),
            database: None,
            index: 1,
        }
    }

    const TABLE: &str = "peptide\tprotein_group\taccessions\tscore\tspectral_count\tmass\tlength
AAAGGG\tG1\tP1;P2\t50.5\t2\t500.25\t
AAAGGG\tG2\tP3\t40\t2\t500.25\t
AAAM[+15.995]GGG\tG1\tP1\t12\t1\t647.3\t7
PEPTIDE\tG3\tP4\tnot-a-number\t1\t799.36\t
PEPTIDE\t\tP4\t1\t1\t799.36\t
PEPTIDE\tG3
";

    #[test]
    fn fold_rows_and_report_malformed() {
        let reader = IdentificationReader::new(true);
        let out = reader
            .read_from(TABLE.as_bytes(), Path::new("control_2.tsv"), &sample())
            .unwrap();

        assert_eq!(out.records.len(), 2);
        let first = &out.records[0];
        assert_eq!(first.sequence, "AAAGGG");
        assert_eq!(first.sample, "Control_2");
        assert_eq!(first.sample_index, 1);
        assert_eq!(first.dataset, "discovery");
        assert_eq!(first.groups.len(), 2);
        assert_eq!(first.groups[0].accessions, vec!["P1", "P2"]);
        assert_eq!(first.length, 6);
        assert!(!first.unique_to_group());

        let second = &out.records[1];
        assert_eq!(second.sequence, "AAAMGGG");
        assert_eq!(second.length, 7);
        assert!(second.unique_to_group());

        let lines = out
            .malformed
            .iter()
            .map(|e| match e {
                Error::MalformedRecord { line, .. } => *line,
                _ => 0,
            })
            .collect::<Vec<_>>();
        assert_eq!(lines, vec![5, 6, 7]);
    }

    #[test]
    fn keep_modifications() {
        let reader = IdentificationReader::new(false);
        let out = reader
            .read_from(TABLE.as_bytes(), Path::new("control_2.tsv"), &sample())
            .unwrap();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[1].sequence, "AAAM[+15.995]GGG");
    }

    #[test]
    fn missing_column_rejects_file() {
        let table = "peptide\tprotein_group\tscore\nAAAGGG\tG1\t1\n";
        let reader = IdentificationReader::new(true);
        match reader.read_from(table.as_bytes(), Path::new("x.tsv"), &sample()) {
            Err(Error::MalformedRecord { line, reason, .. }) => {
                assert_eq!(line, 1);
                assert!(reason.contains("accessions"));
            }
            _ => panic!("expected a malformed file"),
        }
    }

    #[test]
    fn missing_file_is_unavailable() {
        let mut sample = sample();
        sample.path = "/no/such/file.tsv".into();
        assert!(matches!(
            IdentificationReader::new(true).read(&sample),
            Err(Error::InputUnavailable { .. })
        ));
    }
}
