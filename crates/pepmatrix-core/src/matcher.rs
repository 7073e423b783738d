//! Substring search using the Boyer-Moore bad-character rule.
//!
//! Peptides are short and protein sequences are long, so a single [`Pattern`]
//! is built once per peptide and then tested against every protein in a
//! collection.

const ALPHABET: usize = 256;

#[derive(Clone)]
pub struct Pattern<'a> {
    bytes: &'a [u8],
    /// Rightmost index of each byte value in the pattern, -1 if absent
    last: [isize; ALPHABET],
}

impl<'a> Pattern<'a> {
    pub fn new(pattern: &'a str) -> Self {
        let bytes = pattern.as_bytes();
        let mut last = [-1isize; ALPHABET];
        for (idx, &b) in bytes.iter().enumerate() {
            last[b as usize] = idx as isize;
        }
        Pattern { bytes, last }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Does `haystack` contain this pattern?
    pub fn found_in(&self, haystack: &str) -> bool {
        let text = haystack.as_bytes();
        let m = self.bytes.len();
        let n = text.len();
        if m == 0 {
            return true;
        }
        if m > n {
            return false;
        }

        let mut skip = 0;
        while skip <= n - m {
            // Compare the window right-to-left
            let mut j = m as isize - 1;
            while j >= 0 && self.bytes[j as usize] == text[skip + j as usize] {
                j -= 1;
            }
            if j < 0 {
                return true;
            }
            let mismatched = text[skip + j as usize] as usize;
            skip += (j - self.last[mismatched]).max(1) as usize;
        }
        false
    }
}

impl std::fmt::Debug for Pattern<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Pattern")
            .field(&String::from_utf8_lossy(self.bytes))
            .finish()
    }
}

/// Does `haystack` contain `pattern`? An empty pattern is always found.
pub fn contains(haystack: &str, pattern: &str) -> bool {
    Pattern::new(pattern).found_in(haystack)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trivial_cases() {
        assert!(contains("PEPTIDE", ""));
        assert!(contains("", ""));
        assert!(!contains("", "A"));
        assert!(!contains("PEP", "PEPTIDE"));
        assert!(contains("PEPTIDE", "PEPTIDE"));
    }

    #[test]
    fn finds_windows() {
        let protein = "MSDEREVAEAATGEDASSPPPKTEAASDPQHPAASEGAAAAAASPPLLR";
        assert!(contains(protein, "MSDER"));
        assert!(contains(protein, "SPPLLR"));
        assert!(contains(protein, "AAAAAASPP"));
        assert!(!contains(protein, "AAAAAAAA"));
        assert!(!contains(protein, "LLRK"));
    }

    #[test]
    fn mismatch_shift_is_at_least_one() {
        // Mismatched byte occurs to the right of `j` in the pattern, which
        // would give a negative bad-character shift
        assert!(contains("AABAB", "ABAB"));
        assert!(contains("BBBBBA", "BA"));
        assert!(!contains("BBBBBB", "BA"));
    }

    #[test]
    fn pattern_reuse() {
        let pattern = Pattern::new("GGG");
        assert_eq!(pattern.len(), 3);
        assert!(pattern.found_in("AAAGGG"));
        assert!(!pattern.found_in("AAAGG"));
        assert!(pattern.found_in("GGGAAA"));
    }
}
