//! Parallel membership testing against a single protein collection.
//!
//! Every pass gets its own rayon pool of a fixed size, which is torn down
//! before the pass returns. Units only read the shared collection, so there is
//! no locking; the pass either yields one result per query, in order, or the
//! first failure.

use crate::error::Error;
use crate::fasta::ProteinCollection;
use crate::membership::{count_matches, Namespace, Uniqueness};
use crate::peptide::strip_modifications;
use crate::record::ProteinGroupMatch;
use fnv::FnvHashMap;
use log::info;
use rayon::prelude::*;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

pub const DEFAULT_THREADS: usize = 4;

#[derive(Copy, Clone, Debug)]
pub struct Coordinator {
    threads: usize,
}

impl Default for Coordinator {
    fn default() -> Self {
        Coordinator {
            threads: DEFAULT_THREADS,
        }
    }
}

impl Coordinator {
    pub fn new(threads: usize) -> Result<Self, Error> {
        if threads == 0 {
            return Err(Error::Configuration(
                "the worker pool needs at least one thread".into(),
            ));
        }
        Ok(Coordinator { threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Apply `unit` to every item on a dedicated pool, returning results in
    /// input order. A unit that fails or panics aborts the whole pass.
    pub fn run<S, R, F>(&self, pass: &str, items: &[S], unit: F) -> Result<Vec<R>, Error>
    where
        S: AsRef<str> + Sync,
        R: Send,
        F: Fn(&str) -> Result<R, Error> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|idx| format!("pepmatrix-match-{}", idx))
            .build()
            .map_err(|e| pool_failure(pass, e))?;

        pool.install(|| {
            items
                .par_iter()
                .map(|item| {
                    let item = item.as_ref();
                    match catch_unwind(AssertUnwindSafe(|| unit(item))) {
                        Ok(result) => result,
                        Err(payload) => Err(Error::MatchingFailure {
                            pass: pass.into(),
                            sequence: item.into(),
                            reason: panic_message(payload.as_ref()),
                        }),
                    }
                })
                .collect::<Result<Vec<R>, Error>>()
        })
    }

    /// Number of distinct proteins in `collection` containing each query
    pub fn count_pass<S>(
        &self,
        pass: &str,
        queries: &[S],
        collection: &ProteinCollection,
    ) -> Result<Vec<usize>, Error>
    where
        S: AsRef<str> + Sync,
    {
        self.run(pass, queries, |sequence| {
            Ok(count_matches(sequence, collection))
        })
    }

    /// Classify every record against the public database. If `drop_matches`
    /// is set, records whose sequence occurs in any public protein are removed.
    /// Returns the retained records and the number dropped.
    pub fn exclusion_pass(
        &self,
        mut records: Vec<ProteinGroupMatch>,
        public: &ProteinCollection,
        drop_matches: bool,
    ) -> Result<(Vec<ProteinGroupMatch>, usize), Error> {
        let start = Instant::now();
        let queries = Worklist::new(records.iter().map(|r| r.sequence.as_str()));
        let counts = self.count_pass(Namespace::Public.as_str(), &queries.sequences, public)?;

        for (record, &query) in records.iter_mut().zip(&queries.lookup) {
            set_flag(record, Namespace::Public, Uniqueness::classify(counts[query]));
        }

        let before = records.len();
        if drop_matches {
            records = records
                .into_iter()
                .zip(queries.lookup)
                .filter_map(|(record, query)| match counts[query] {
                    0 => Some(record),
                    _ => None,
                })
                .collect();
        }
        let dropped = before - records.len();

        info!(
            "- public: {} queries against {} proteins, dropped {} records in {}ms",
            queries.sequences.len(),
            public.len(),
            dropped,
            start.elapsed().as_millis()
        );
        Ok((records, dropped))
    }

    /// Classify every record against `collection` under `namespace`
    pub fn flag_pass(
        &self,
        records: &mut [ProteinGroupMatch],
        collection: &ProteinCollection,
        namespace: Namespace,
    ) -> Result<usize, Error> {
        let mut refs = records.iter_mut().collect::<Vec<_>>();
        self.flag_records(&mut refs, collection, namespace)
    }

    /// Classify each sample's records against that sample's own database.
    /// Samples without a database are left unclassified.
    pub fn flag_individual<D>(
        &self,
        records: &mut [ProteinGroupMatch],
        databases: &FnvHashMap<String, D>,
    ) -> Result<usize, Error>
    where
        D: Borrow<ProteinCollection>,
    {
        let mut by_sample: BTreeMap<String, Vec<&mut ProteinGroupMatch>> = BTreeMap::new();
        for record in records.iter_mut() {
            by_sample.entry(record.sample.clone()).or_default().push(record);
        }

        let mut unique = 0;
        // One pool per sample database, strictly one after another
        for (sample, mut subset) in by_sample {
            match databases.get(&sample) {
                Some(collection) => {
                    let collection: &ProteinCollection = collection.borrow();
                    unique += self.flag_records(&mut subset, collection, Namespace::Individual)?
                }
                None => log::warn!("no individual database for sample `{}`", sample),
            }
        }
        Ok(unique)
    }

    fn flag_records(
        &self,
        records: &mut [&mut ProteinGroupMatch],
        collection: &ProteinCollection,
        namespace: Namespace,
    ) -> Result<usize, Error> {
        let start = Instant::now();
        let queries = Worklist::new(records.iter().map(|r| r.sequence.as_str()));
        let counts = self.count_pass(namespace.as_str(), &queries.sequences, collection)?;

        let mut unique = 0;
        for (record, &query) in records.iter_mut().zip(&queries.lookup) {
            let value = Uniqueness::classify(counts[query]);
            unique += value.is_unique() as usize;
            set_flag(record, namespace, value);
        }

        info!(
            "- {}: {} queries against {} proteins, {} unique records in {}ms",
            namespace,
            queries.sequences.len(),
            collection.len(),
            unique,
            start.elapsed().as_millis()
        );
        Ok(unique)
    }
}

/// Distinct, modification-stripped query sequences for a set of records
struct Worklist {
    sequences: Vec<String>,
    /// Index into `sequences` for each record
    lookup: Vec<usize>,
}

impl Worklist {
    fn new<'a, I: Iterator<Item = &'a str>>(raw: I) -> Self {
        let mut index: FnvHashMap<String, usize> = FnvHashMap::default();
        let mut sequences = Vec::new();
        let lookup = raw
            .map(|sequence| {
                let bare = strip_modifications(sequence);
                *index.entry(bare).or_insert_with_key(|bare| {
                    sequences.push(bare.clone());
                    sequences.len() - 1
                })
            })
            .collect();
        Worklist { sequences, lookup }
    }
}

fn set_flag(record: &mut ProteinGroupMatch, namespace: Namespace, value: Uniqueness) {
    if let Some(previous) = record.flags.set(namespace, value) {
        log::warn!(
            "{} classification of `{}` ({}) set twice: {:?} -> {:?}",
            namespace,
            record.sequence,
            record.sample,
            previous,
            value
        );
    }
}

fn pool_failure<E: std::fmt::Display>(pass: &str, err: E) -> Error {
    Error::Configuration(format!(
        "unable to start the worker pool for the {} pass: {}",
        pass, err
    ))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unit panicked".into()
    }
}
