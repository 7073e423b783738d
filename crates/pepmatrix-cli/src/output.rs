use crate::Runner;
use pepmatrix_core::aggregate::MatrixRow;
use pepmatrix_core::membership::{Namespace, Uniqueness};
use rayon::prelude::*;
use std::path::PathBuf;

/// Rendered for values never written
pub const MISSING: &str = "N/A";

fn yes_no(value: bool) -> &'static [u8] {
    match value {
        true => b"Y",
        false => b"N",
    }
}

fn uniqueness(value: Option<Uniqueness>) -> &'static [u8] {
    match value {
        Some(Uniqueness::Unique) => b"Y",
        Some(Uniqueness::NotUnique) => b"N",
        None => MISSING.as_bytes(),
    }
}

impl Runner {
    // Create a path for `file_name` in the output directory
    pub(crate) fn make_path<S: AsRef<str>>(&self, file_name: S) -> PathBuf {
        let mut path = self.parameters.output_directory.clone();
        path.push(file_name.as_ref());
        path
    }

    pub fn matrix_headers(&self) -> csv::ByteRecord {
        let mut headers = csv::ByteRecord::from(vec![
            "sequence",
            "protein_groups",
            "accessions",
            "unique_to_protein_group",
            "unique_to_sample_database",
        ]);
        for namespace in Namespace::ALL {
            headers.push_field(format!("{}_unique", namespace).as_bytes());
        }
        headers.push_field(b"dataset");
        headers.push_field(b"mass");
        headers.push_field(b"length");

        let samples = self.parameters.layout.sample_names();
        for suffix in ["count", "score", "coverage"] {
            for sample in &samples {
                headers.push_field(format!("{}_{}", sample, suffix).as_bytes());
            }
        }
        for dataset in &self.parameters.datasets {
            headers.push_field(format!("{}_count", dataset).as_bytes());
        }
        headers
    }

    pub fn serialize_row(&self, row: &MatrixRow) -> csv::ByteRecord {
        let mut record = csv::ByteRecord::new();
        record.push_field(row.sequence.as_bytes());
        record.push_field(row.groups.join(";").as_bytes());
        record.push_field(row.accessions.join(";").as_bytes());
        record.push_field(yes_no(row.unique_to_protein_group));
        record.push_field(yes_no(row.unique_to_sample_database));
        for namespace in Namespace::ALL {
            record.push_field(uniqueness(row.flags.get(namespace)));
        }
        record.push_field(row.dataset.as_bytes());
        record.push_field(ryu::Buffer::new().format(row.mass).as_bytes());
        record.push_field(itoa::Buffer::new().format(row.length).as_bytes());

        let cells = &row.cells;
        for count in &cells.counts {
            record.push_field(itoa::Buffer::new().format(*count).as_bytes());
        }
        // A column nothing was projected onto has no score
        for (score, coverage) in row.scores.iter().zip(&cells.coverage) {
            match coverage {
                Some(_) => record.push_field(ryu::Buffer::new().format(*score).as_bytes()),
                None => record.push_field(MISSING.as_bytes()),
            }
        }
        for coverage in &cells.coverage {
            record.push_field(coverage.as_deref().unwrap_or(MISSING).as_bytes());
        }
        for count in &cells.datasets {
            record.push_field(itoa::Buffer::new().format(*count).as_bytes());
        }
        record
    }

    pub fn serialize_matrix(&self, rows: &[MatrixRow]) -> anyhow::Result<Vec<u8>> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(vec![]);

        wtr.write_byte_record(&self.matrix_headers())?;
        for record in rows
            .par_iter()
            .map(|row| self.serialize_row(row))
            .collect::<Vec<_>>()
        {
            wtr.write_byte_record(&record)?;
        }

        wtr.flush()?;
        Ok(wtr.into_inner()?)
    }

    pub fn write_matrix(&self, rows: &[MatrixRow]) -> anyhow::Result<String> {
        let path = self.make_path("matrix.pepmatrix.tsv");
        let bytes = self.serialize_matrix(rows)?;
        std::fs::write(&path, bytes)?;
        Ok(path.display().to_string())
    }
}
