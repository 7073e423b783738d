use regex::Regex;
use std::sync::OnceLock;

fn modification_regex() -> &'static Regex {
    static MODS: OnceLock<Regex> = OnceLock::new();
    // `[+57.021]`, `(ox)` and `{...}` style annotations
    MODS.get_or_init(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)|\{[^}]*\}").expect("valid regex"))
}

/// Remove modification annotations from a peptide sequence, returning the
/// bare, upper-cased amino acid string.
///
/// ```
/// use pepmatrix_core::peptide::strip_modifications;
/// assert_eq!(strip_modifications("[+42.011]-PEPT[+79.966]IDEk"), "PEPTIDEK");
/// assert_eq!(strip_modifications("n.M(ox)SDER.c"), "MSDER");
/// ```
pub fn strip_modifications(sequence: &str) -> String {
    let bare = modification_regex().replace_all(sequence, "");
    let bare = strip_flanking(&bare);
    bare.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// `K.PEPTIDE.R` notation carries the flanking residues; only the middle part
/// belongs to the peptide
fn strip_flanking(sequence: &str) -> &str {
    let mut parts = sequence.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(middle), Some(_), None) => middle,
        _ => sequence,
    }
}
