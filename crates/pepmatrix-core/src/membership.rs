//! Database membership tests and per-namespace uniqueness classification

use crate::fasta::ProteinCollection;
use crate::matcher::Pattern;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Uniqueness {
    Unique,
    NotUnique,
}

impl Uniqueness {
    /// Exactly one matching protein makes a sequence unique; zero or several do not
    pub fn classify(count: usize) -> Self {
        match count {
            1 => Uniqueness::Unique,
            _ => Uniqueness::NotUnique,
        }
    }

    pub fn is_unique(self) -> bool {
        self == Uniqueness::Unique
    }
}

/// Reference universe a classification was computed against
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Public database used as the exclusion filter
    Public,
    Reference,
    /// Union of all individual (per-sample) databases
    Combined,
    /// The database built for the sample a record came from
    Individual,
}

impl Namespace {
    pub const ALL: [Namespace; 4] = [
        Namespace::Public,
        Namespace::Reference,
        Namespace::Combined,
        Namespace::Individual,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Public => "public",
            Namespace::Reference => "reference",
            Namespace::Combined => "combined",
            Namespace::Individual => "individual",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// At most one classification per namespace. Setting one namespace never
/// touches another.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniquenessFlags([Option<Uniqueness>; 4]);

impl UniquenessFlags {
    pub fn get(&self, namespace: Namespace) -> Option<Uniqueness> {
        self.0[namespace.index()]
    }

    /// Record the classification for `namespace`. Returns the previous value,
    /// if this namespace had already been classified.
    pub fn set(&mut self, namespace: Namespace, value: Uniqueness) -> Option<Uniqueness> {
        self.0[namespace.index()].replace(value)
    }

    pub fn is_unique(&self, namespace: Namespace) -> bool {
        matches!(self.get(namespace), Some(Uniqueness::Unique))
    }

    /// Fold another set of flags into this one. `Unique` is never downgraded;
    /// an unclassified namespace takes the incoming value.
    pub fn merge(&mut self, other: &UniquenessFlags) {
        for (mine, theirs) in self.0.iter_mut().zip(other.0.iter()) {
            *mine = match (*mine, *theirs) {
                (Some(Uniqueness::Unique), _) => Some(Uniqueness::Unique),
                (_, Some(Uniqueness::Unique)) => Some(Uniqueness::Unique),
                (Some(a), _) => Some(a),
                (None, b) => b,
            };
        }
    }
}

/// Count the distinct proteins in `collection` that contain `sequence`.
///
/// Every protein is tested: the count, not mere existence, drives the
/// classification.
pub fn count_matches(sequence: &str, collection: &ProteinCollection) -> usize {
    let pattern = Pattern::new(sequence);
    collection
        .iter()
        .filter(|protein| pattern.found_in(&protein.sequence))
        .count()
}

pub fn classify(sequence: &str, collection: &ProteinCollection) -> Uniqueness {
    Uniqueness::classify(count_matches(sequence, collection))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fasta::Fasta;

    fn collection() -> ProteinCollection {
        Fasta::parse::<String>(
            ">p1\nMAAAGGGK\n>p2\nMAAAGGGR\n>p3\nMCCCDDDK\n>p4\nMAAAGGGK\n",
            None,
        )
        .into()
    }

    #[test]
    fn classification_table() {
        assert_eq!(Uniqueness::classify(0), Uniqueness::NotUnique);
        assert_eq!(Uniqueness::classify(1), Uniqueness::Unique);
        assert_eq!(Uniqueness::classify(2), Uniqueness::NotUnique);
        assert_eq!(Uniqueness::classify(17), Uniqueness::NotUnique);
    }

    #[test]
    fn count_distinct_proteins() {
        let db = collection();
        // p4 duplicates p1 and is not counted twice
        assert_eq!(count_matches("AAAGGG", &db), 2);
        assert_eq!(count_matches("CCCDDD", &db), 1);
        assert_eq!(count_matches("WWW", &db), 0);
        assert_eq!(classify("CCCDDD", &db), Uniqueness::Unique);
        assert_eq!(classify("AAAGGG", &db), Uniqueness::NotUnique);
    }

    #[test]
    fn count_is_pure() {
        let db = collection();
        let first = count_matches("GGG", &db);
        for _ in 0..10 {
            assert_eq!(count_matches("GGG", &db), first);
        }
    }

    #[test]
    fn namespaces_are_independent() {
        let mut flags = UniquenessFlags::default();
        assert_eq!(flags.set(Namespace::Individual, Uniqueness::Unique), None);
        assert_eq!(flags.set(Namespace::Public, Uniqueness::NotUnique), None);
        assert!(flags.is_unique(Namespace::Individual));
        assert!(!flags.is_unique(Namespace::Public));
        assert_eq!(flags.get(Namespace::Reference), None);
    }

    #[test]
    fn merge_never_downgrades() {
        let mut row = UniquenessFlags::default();
        row.set(Namespace::Individual, Uniqueness::Unique);
        row.set(Namespace::Combined, Uniqueness::NotUnique);

        let mut incoming = UniquenessFlags::default();
        incoming.set(Namespace::Individual, Uniqueness::NotUnique);
        incoming.set(Namespace::Combined, Uniqueness::Unique);
        incoming.set(Namespace::Reference, Uniqueness::NotUnique);

        row.merge(&incoming);
        assert_eq!(row.get(Namespace::Individual), Some(Uniqueness::Unique));
        assert_eq!(row.get(Namespace::Combined), Some(Uniqueness::Unique));
        assert_eq!(row.get(Namespace::Reference), Some(Uniqueness::NotUnique));
        assert_eq!(row.get(Namespace::Public), None);
    }
}
