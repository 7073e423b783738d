use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    /// A required source (identification file, FASTA database) could not be opened
    InputUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A single row with missing, extra or unparsable fields
    MalformedRecord {
        path: PathBuf,
        line: u64,
        reason: String,
    },
    /// A unit inside a parallel matching pass failed; the whole pass is aborted
    MatchingFailure {
        pass: String,
        sequence: String,
        reason: String,
    },
    Configuration(String),
    SampleIndexOutOfRange {
        sample: String,
        index: usize,
        sample_count: usize,
    },
    UnknownSample(String),
    UnknownDataset(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InputUnavailable { path, source } => {
                write!(f, "unable to read `{}`: {}", path.display(), source)
            }
            Self::MalformedRecord { path, line, reason } => {
                write!(f, "{}:{}: malformed record: {}", path.display(), line, reason)
            }
            Self::MatchingFailure {
                pass,
                sequence,
                reason,
            } => write!(
                f,
                "{} pass aborted while matching `{}`: {}",
                pass, sequence, reason
            ),
            Self::Configuration(msg) => write!(f, "invalid configuration: {}", msg),
            Self::SampleIndexOutOfRange {
                sample,
                index,
                sample_count,
            } => write!(
                f,
                "sample `{}` has index {}, but the matrix only has {} sample columns",
                sample, index, sample_count
            ),
            Self::UnknownSample(sample) => {
                write!(f, "sample identifier `{}` does not map to a matrix column", sample)
            }
            Self::UnknownDataset(dataset) => write!(f, "unknown dataset label `{}`", dataset),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InputUnavailable { source, .. } => Some(source),
            _ => None,
        }
    }
}
