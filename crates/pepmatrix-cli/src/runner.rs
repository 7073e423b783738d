use crate::input::Settings;
use crate::reader::IdentificationReader;
use anyhow::Context;
use fnv::{FnvHashMap, FnvHashSet};
use log::info;
use pepmatrix_core::aggregate::aggregate;
use pepmatrix_core::coordinator::Coordinator;
use pepmatrix_core::fasta::ProteinCollection;
use pepmatrix_core::membership::Namespace;
use pepmatrix_core::projector::project;
use pepmatrix_core::record::ProteinGroupMatch;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

pub struct Runner {
    pub parameters: Settings,
    databases: Databases,
    start: Instant,
}

struct Databases {
    public: Option<ProteinCollection>,
    reference: Option<ProteinCollection>,
    /// Keyed by sample identifier. Samples sharing a FASTA file share the collection
    individual: FnvHashMap<String, Arc<ProteinCollection>>,
    /// Matrix columns of samples whose own database could not be read
    unavailable: FnvHashSet<usize>,
}

#[derive(Serialize, Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub samples_read: usize,
    pub samples_skipped: usize,
    pub malformed_rows: usize,
    pub dropped_public: usize,
    pub records: usize,
    pub rows: usize,
    pub runtime_secs: u64,
}

impl Runner {
    pub fn new(parameters: Settings) -> anyhow::Result<Self> {
        let start = Instant::now();
        let tag = parameters.exclude_accession_tag.as_deref();

        let load = |path: &str| -> anyhow::Result<ProteinCollection> {
            let collection = pepmatrix_core::read_fasta(path, tag)
                .with_context(|| format!("Failed to build database from `{}`", path))?;
            info!("- {}: {} proteins", path, collection.len());
            Ok(collection)
        };

        let public = parameters.public_database.as_deref().map(load).transpose()?;
        let reference = parameters
            .reference_database
            .as_deref()
            .map(load)
            .transpose()?;

        // Per-sample databases: an unreadable file only takes its samples out
        let paths = parameters
            .samples
            .iter()
            .filter_map(|s| s.database.as_deref())
            .collect::<FnvHashSet<_>>();
        let loaded = paths
            .into_par_iter()
            .map(|path| (path, pepmatrix_core::read_fasta(path, tag)))
            .collect::<Vec<_>>();

        let mut by_path = FnvHashMap::default();
        for (path, result) in loaded {
            match result {
                Ok(collection) => {
                    log::trace!("- {}: {} proteins", path, collection.len());
                    by_path.insert(path, Arc::new(collection));
                }
                Err(e) => log::error!("{}", e),
            }
        }

        let mut individual = FnvHashMap::default();
        let mut unavailable = FnvHashSet::default();
        for sample in &parameters.samples {
            if let Some(path) = sample.database.as_deref() {
                match by_path.get(path) {
                    Some(collection) => {
                        individual.insert(sample.sample.clone(), Arc::clone(collection));
                    }
                    None => {
                        log::error!(
                            "skipping sample `{}`: its database `{}` is unavailable",
                            sample.sample,
                            path
                        );
                        unavailable.insert(sample.index);
                    }
                }
            }
        }

        info!(
            "loaded {} individual databases in {}ms",
            by_path.len(),
            start.elapsed().as_millis()
        );

        Ok(Self {
            parameters,
            databases: Databases {
                public,
                reference,
                individual,
                unavailable,
            },
            start,
        })
    }

    /// Read every sample in parallel. Unreadable samples are skipped and
    /// counted; malformed rows are logged and counted.
    fn read_samples(&self, summary: &mut RunSummary) -> Vec<ProteinGroupMatch> {
        let reader = IdentificationReader::new(self.parameters.strip_modifications);
        let results = self
            .parameters
            .samples
            .par_iter()
            .filter(|sample| !self.databases.unavailable.contains(&sample.index))
            .map(|sample| reader.read(sample))
            .collect::<Vec<_>>();

        summary.samples_skipped = self.databases.unavailable.len();

        let mut records = Vec::new();
        for result in results {
            match result {
                Ok(sample) => {
                    for err in &sample.malformed {
                        log::error!("{}", err);
                    }
                    summary.malformed_rows += sample.malformed.len();
                    summary.samples_read += 1;
                    records.extend(sample.records);
                }
                Err(e) => {
                    log::error!("skipping sample: {}", e);
                    summary.samples_skipped += 1;
                }
            }
        }
        records
    }

    pub fn run(mut self) -> anyhow::Result<RunSummary> {
        let mut summary = RunSummary::default();
        let coordinator = Coordinator::new(self.parameters.threads)?;

        let mut records = self.read_samples(&mut summary);
        info!(
            "read {} records from {} samples ({} skipped, {} malformed rows)",
            records.len(),
            summary.samples_read,
            summary.samples_skipped,
            summary.malformed_rows
        );

        if let Some(public) = &self.databases.public {
            let (retained, dropped) = coordinator
                .exclusion_pass(records, public, self.parameters.drop_public_matches)
                .context("Public database pass failed")?;
            records = retained;
            summary.dropped_public = dropped;
        }

        if let Some(reference) = &self.databases.reference {
            coordinator
                .flag_pass(&mut records, reference, Namespace::Reference)
                .context("Reference database pass failed")?;
        }

        if !self.databases.individual.is_empty() {
            let combined = ProteinCollection::union(
                self.databases.individual.values().map(|c| c.as_ref()),
            );
            coordinator
                .flag_pass(&mut records, &combined, Namespace::Combined)
                .context("Combined database pass failed")?;
            coordinator
                .flag_individual(&mut records, &self.databases.individual)
                .context("Individual database pass failed")?;
        }

        let mode = self.parameters.aggregation;
        let mut rows = aggregate(&records, self.parameters.sample_count(), mode)?;
        project(
            &mut rows,
            &records,
            &self.parameters.layout,
            &self.parameters.datasets,
            mode,
        )?;

        let mismatched = rows.iter().filter(|row| row.counts != row.cells.counts).count();
        if mismatched > 0 {
            log::warn!(
                "{} rows have projected spectral counts that differ from aggregated counts",
                mismatched
            );
        }

        summary.records = records.len();
        summary.rows = rows.len();
        log::trace!("writing outputs");

        let path = self.write_matrix(&rows)?;
        self.parameters.output_paths.push(path);

        let path = self.make_path("pepmatrix.json");
        self.parameters
            .output_paths
            .push(path.display().to_string());
        println!("{}", serde_json::to_string_pretty(&self.parameters)?);

        let bytes = serde_json::to_vec_pretty(&self.parameters)?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write `{}`", path.display()))?;

        summary.runtime_secs = self.start.elapsed().as_secs();
        info!(
            "wrote {} rows from {} records in {}s",
            summary.rows, summary.records, summary.runtime_secs
        );
        Ok(summary)
    }
}
