use anyhow::{ensure, Context};
use clap::ArgMatches;
use fnv::FnvHashSet;
use pepmatrix_core::{aggregate::AggregationMode, projector::SampleLayout, Error};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dataset label assigned to samples that do not name one
pub const DEFAULT_DATASET: &str = "default";

#[derive(Serialize, Deserialize, Clone, Debug)]
/// One identification file, as listed in the parameter file
pub struct SampleInput {
    pub path: String,
    pub sample: String,
    pub dataset: Option<String>,
    /// FASTA database built for this sample
    pub database: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct Sample {
    pub path: String,
    pub sample: String,
    pub dataset: String,
    pub database: Option<String>,
    /// Matrix column
    pub index: usize,
}

#[derive(Serialize, Clone, Debug)]
/// Actual run parameters - may include overrides or default values not set by user
pub struct Settings {
    pub version: String,
    pub samples: Vec<Sample>,
    pub layout: SampleLayout,
    pub datasets: Vec<String>,
    pub public_database: Option<String>,
    pub reference_database: Option<String>,
    pub exclude_accession_tag: Option<String>,
    pub drop_public_matches: bool,
    pub strip_modifications: bool,
    pub aggregation: AggregationMode,
    pub threads: usize,
    pub output_paths: Vec<String>,

    #[serde(skip_serializing)]
    pub output_directory: PathBuf,
}

impl Settings {
    pub fn sample_count(&self) -> usize {
        self.layout.sample_count()
    }
}

#[derive(Deserialize)]
/// Input parameters deserialized from JSON file
pub struct Input {
    samples: Option<Vec<SampleInput>>,
    conditions: Option<Vec<String>>,
    replicates: Option<usize>,
    datasets: Option<Vec<String>>,
    public_database: Option<String>,
    reference_database: Option<String>,
    exclude_accession_tag: Option<String>,
    drop_public_matches: Option<bool>,
    strip_modifications: Option<bool>,
    aggregation: Option<AggregationMode>,
    threads: Option<usize>,
    output_directory: Option<String>,
}

fn invalid<S: Into<String>>(msg: S) -> anyhow::Error {
    Error::Configuration(msg.into()).into()
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let path = matches
            .get_one::<String>("parameters")
            .expect("required parameters");
        let mut input = Input::load(path)
            .with_context(|| format!("Failed to read parameters from `{path}`"))?;

        // Handle JSON configuration overrides
        if let Some(output_directory) = matches.get_one::<String>("output_directory") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(output_directory.into());
        }
        if let Some(threads) = matches.get_one::<u16>("threads").copied() {
            log::trace!("overriding `threads` parameter.");
            input.threads = Some(threads as usize);
        }
        if matches.get_flag("by-group") {
            log::trace!("overriding `aggregation` parameter.");
            input.aggregation = Some(AggregationMode::SequenceAndGroup);
        }
        if matches.get_flag("keep-public-matches") {
            log::trace!("overriding `drop_public_matches` parameter.");
            input.drop_public_matches = Some(false);
        }

        ensure!(
            input.samples.as_ref().is_some_and(|s| !s.is_empty()),
            "`samples` must list at least one identification file. For more information try '--help'"
        );
        ensure!(
            input.conditions.is_some(),
            "`conditions` must be set. For more information try '--help'"
        );

        Ok(input)
    }

    pub fn load<S: AsRef<str>>(path: S) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        serde_json::from_reader(std::io::BufReader::new(file)).map_err(anyhow::Error::from)
    }

    pub fn build(self) -> anyhow::Result<Settings> {
        let layout = SampleLayout::new(
            self.conditions.unwrap_or_default(),
            self.replicates.unwrap_or(1),
        )?;

        let threads = self
            .threads
            .unwrap_or_else(|| num_cpus::get().clamp(1, pepmatrix_core::coordinator::DEFAULT_THREADS));
        if threads == 0 {
            return Err(invalid("`threads` must be at least 1"));
        }

        let mut seen = FnvHashSet::default();
        let mut samples = Vec::new();
        for input in self.samples.unwrap_or_default() {
            let index = layout.column(&input.sample).map_err(|_| {
                invalid(format!(
                    "sample `{}` does not match conditions {:?} with {} replicates",
                    input.sample,
                    layout.conditions(),
                    layout.replicates()
                ))
            })?;
            if !seen.insert(index) {
                return Err(invalid(format!(
                    "sample `{}` is listed twice (matrix column {})",
                    input.sample, index
                )));
            }
            samples.push(Sample {
                path: input.path,
                sample: input.sample,
                dataset: input.dataset.unwrap_or_else(|| DEFAULT_DATASET.into()),
                database: input.database,
                index,
            });
        }

        let datasets = match self.datasets {
            Some(datasets) => {
                if let Some(sample) = samples.iter().find(|s| !datasets.contains(&s.dataset)) {
                    return Err(invalid(format!(
                        "dataset `{}` of sample `{}` is missing from `datasets`",
                        sample.dataset, sample.sample
                    )));
                }
                datasets
            }
            None => {
                let mut datasets: Vec<String> = Vec::new();
                for sample in &samples {
                    if !datasets.contains(&sample.dataset) {
                        datasets.push(sample.dataset.clone());
                    }
                }
                datasets
            }
        };

        if self.public_database.is_none() {
            log::warn!("no `public_database` given, nothing will be excluded");
        }

        let output_directory = match self.output_directory {
            Some(path) => {
                let path = PathBuf::from(path);
                std::fs::create_dir_all(&path).map_err(|e| {
                    invalid(format!(
                        "unable to create output directory `{}`: {}",
                        path.display(),
                        e
                    ))
                })?;
                path
            }
            None => std::env::current_dir()?,
        };

        Ok(Settings {
            version: clap::crate_version!().into(),
            samples,
            layout,
            datasets,
            public_database: self.public_database,
            reference_database: self.reference_database,
            exclude_accession_tag: self.exclude_accession_tag.filter(|t| !t.is_empty()),
            drop_public_matches: self.drop_public_matches.unwrap_or(true),
            strip_modifications: self.strip_modifications.unwrap_or(true),
            aggregation: self.aggregation.unwrap_or_default(),
            threads,
            output_paths: Vec::new(),
            output_directory,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn input(json: &str) -> Input {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn defaults() {
        let dir = tempfile::tempdir().unwrap();
        let json = format!(
            r#"{{
                "samples": [
                    {{ "path": "a.tsv", "sample": "Control_1" }},
                    {{ "path": "b.tsv", "sample": "Treated_2", "dataset": "validation" }}
                ],
                "conditions": ["Control", "Treated"],
                "replicates": 2,
                "output_directory": "{}"
            }}"#,
            dir.path().display()
        );
        let settings = input(&json).build().unwrap();
        assert_eq!(settings.sample_count(), 4);
        assert_eq!(settings.samples[0].index, 0);
        assert_eq!(settings.samples[1].index, 3);
        assert_eq!(settings.datasets, vec!["default", "validation"]);
        assert_eq!(settings.aggregation, AggregationMode::Sequence);
        assert!(settings.drop_public_matches);
        assert!(settings.strip_modifications);
        assert!(settings.threads >= 1);
    }

    #[test]
    fn aggregation_mode_from_json() {
        let input = input(r#"{ "aggregation": "sequence_and_group", "conditions": ["A"] }"#);
        assert_eq!(input.aggregation, Some(AggregationMode::SequenceAndGroup));
    }

    #[test]
    fn configuration_errors() {
        let bad_sample = input(
            r#"{ "samples": [{ "path": "a.tsv", "sample": "Other_1" }], "conditions": ["A"] }"#,
        );
        assert!(bad_sample.build().is_err());

        let zero_threads = input(r#"{ "conditions": ["A"], "threads": 0 }"#);
        let err = zero_threads.build().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Configuration(_))
        ));

        let duplicate = input(
            r#"{ "samples": [{ "path": "a.tsv", "sample": "A_1" }, { "path": "b.tsv", "sample": "A-1" }], "conditions": ["A"] }"#,
        );
        assert!(duplicate.build().is_err());

        let missing_dataset = input(
            r#"{ "samples": [{ "path": "a.tsv", "sample": "A_1", "dataset": "x" }], "conditions": ["A"], "datasets": ["y"] }"#,
        );
        assert!(missing_dataset.build().is_err());
    }
}
