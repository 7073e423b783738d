use fnv::FnvHashSet;
use std::sync::Arc;

pub struct Fasta {
    pub targets: Vec<(Arc<str>, String)>,
    // Accessions containing this tag are left out of the uniqueness universe
    exclude_tag: Option<String>,
    excluded: usize,
}

impl Fasta {
    // Parse a string into a fasta database
    pub fn parse<S: Into<String>>(contents: &str, exclude_tag: Option<S>) -> Fasta {
        let exclude_tag = exclude_tag.map(Into::into).filter(|tag| !tag.is_empty());

        let mut fasta = Fasta {
            targets: Vec::new(),
            exclude_tag,
            excluded: 0,
        };
        let mut last_id = "";
        let mut s = String::new();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(id) = line.strip_prefix('>') {
                if !s.is_empty() {
                    let seq = std::mem::take(&mut s);
                    fasta.push(last_id, seq);
                }
                last_id = id;
            } else {
                // Translated databases often carry a trailing stop codon
                s.push_str(line.trim_end_matches('*'));
            }
        }

        if !s.is_empty() {
            fasta.push(last_id, s);
        }

        fasta
    }

    fn push(&mut self, header: &str, sequence: String) {
        let acc = header.split_ascii_whitespace().next().unwrap_or_default();
        match &self.exclude_tag {
            Some(tag) if acc.contains(tag.as_str()) => self.excluded += 1,
            _ => self
                .targets
                .push((Arc::from(acc), sequence.to_ascii_uppercase())),
        }
    }

    /// Number of entries dropped because their accession carried the exclusion tag
    pub fn excluded(&self) -> usize {
        self.excluded
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protein {
    pub accession: Arc<str>,
    pub sequence: String,
}

/// A set of protein sequences. Identical sequences under different accessions
/// are stored once, so each entry counts as one distinct protein when matching.
#[derive(Debug, Clone, Default)]
pub struct ProteinCollection {
    proteins: Vec<Protein>,
}

impl ProteinCollection {
    pub fn len(&self) -> usize {
        self.proteins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proteins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Protein> + '_ {
        self.proteins.iter()
    }

    /// Combine several collections into one, deduplicating by sequence
    pub fn union<'a, I>(collections: I) -> Self
    where
        I: IntoIterator<Item = &'a ProteinCollection>,
    {
        collections
            .into_iter()
            .flat_map(|c| c.proteins.iter().cloned())
            .collect()
    }
}

impl FromIterator<Protein> for ProteinCollection {
    fn from_iter<I: IntoIterator<Item = Protein>>(iter: I) -> Self {
        let mut seen = FnvHashSet::default();
        let proteins = iter
            .into_iter()
            .filter(|protein| seen.insert(protein.sequence.clone()))
            .collect();
        ProteinCollection { proteins }
    }
}

impl From<Fasta> for ProteinCollection {
    fn from(fasta: Fasta) -> Self {
        fasta
            .targets
            .into_iter()
            .map(|(accession, sequence)| Protein {
                accession,
                sequence,
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const FASTA: &str = r#"
>sp|P00001|ONE_HUMAN first protein
MKTAYIAKQR
QISFVKSHFS
>sp|P00002|TWO_HUMAN second protein
MKTAYIAKQRQISFVKSHFS
>CONTAM_P00003 contaminant
AAAGGGCCC
>sp|P00004|FOUR_HUMAN translated
peptidek*
"#;

    #[test]
    fn parse_and_exclude() {
        let fasta = Fasta::parse(FASTA, Some("CONTAM_"));
        assert_eq!(fasta.targets.len(), 3);
        assert_eq!(fasta.excluded(), 1);
        assert_eq!(&*fasta.targets[0].0, "sp|P00001|ONE_HUMAN");
        assert_eq!(fasta.targets[0].1, "MKTAYIAKQRQISFVKSHFS");
        assert_eq!(fasta.targets[2].1, "PEPTIDEK");
    }

    #[test]
    fn empty_tag_excludes_nothing() {
        let fasta = Fasta::parse(FASTA, Some(""));
        assert_eq!(fasta.targets.len(), 4);
        let fasta = Fasta::parse::<String>(FASTA, None);
        assert_eq!(fasta.targets.len(), 4);
    }

    #[test]
    fn collection_dedups_by_sequence() {
        let collection = ProteinCollection::from(Fasta::parse::<String>(FASTA, None));
        assert_eq!(collection.len(), 3);
        let accessions = collection
            .iter()
            .map(|p| p.accession.to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            accessions,
            vec![
                "sp|P00001|ONE_HUMAN",
                "CONTAM_P00003",
                "sp|P00004|FOUR_HUMAN"
            ]
        );
    }

    #[test]
    fn union_of_collections() {
        let a = ProteinCollection::from(Fasta::parse::<String>(">a\nAAAA\n>b\nCCCC", None));
        let b = ProteinCollection::from(Fasta::parse::<String>(">c\nCCCC\n>d\nDDDD", None));
        let combined = ProteinCollection::union([&a, &b]);
        assert_eq!(combined.len(), 3);
    }
}
