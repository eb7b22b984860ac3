use crate::peptide::{is_protein_terminus, AnnotatedPeptide};

/// Cleavage rule used to count the enzymatic termini of a peptide
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Enzyme {
    /// Residues after which the enzyme cleaves
    pub cleave: &'static str,
    // Skip cleaving if the site is followed by this AA
    pub skip_suffix: Option<char>,
}

impl Default for Enzyme {
    fn default() -> Self {
        Enzyme::trypsin()
    }
}

impl Enzyme {
    pub fn trypsin() -> Self {
        Enzyme {
            cleave: "KR",
            skip_suffix: Some('P'),
        }
    }

    fn cleaves(&self, before: char, after: char) -> bool {
        if is_protein_terminus(before) || is_protein_terminus(after) {
            return true;
        }
        self.cleave.contains(before) && self.skip_suffix != Some(after)
    }

    /// Number of termini (0, 1 or 2) of `peptide` that are consistent with
    /// cleavage by this enzyme. Protein termini always count.
    pub fn termini(&self, peptide: &AnnotatedPeptide) -> u8 {
        let residues = peptide.clean_sequence();
        let (first, last) = match (residues.chars().next(), residues.chars().last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0,
        };

        let mut ntt = 0;
        if let Some(prefix) = peptide.prefix {
            if self.cleaves(prefix, first) {
                ntt += 1;
            }
        }
        if let Some(suffix) = peptide.suffix {
            if self.cleaves(last, suffix) {
                ntt += 1;
            }
        }
        ntt
    }
}
