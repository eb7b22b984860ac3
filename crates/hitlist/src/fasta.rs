/// Protein accessions of a FASTA database, in file order
pub struct Fasta {
    pub accessions: Vec<String>,
    /// Number of residues read for each accession
    pub lengths: Vec<usize>,
}

impl Fasta {
    // Parse a string into a fasta database. Only the accession (the first
    // whitespace-delimited token of each header) and sequence length are kept
    pub fn parse<S: AsRef<str>>(contents: S) -> Fasta {
        let mut accessions = Vec::new();
        let mut lengths = Vec::new();
        let mut current: Option<&str> = None;
        let mut len = 0;

        for line in contents.as_ref().lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(id) = line.strip_prefix('>') {
                if let Some(acc) = current.take() {
                    accessions.push(acc.to_string());
                    lengths.push(std::mem::take(&mut len));
                }
                current = Some(id.split_ascii_whitespace().next().unwrap_or_default());
                len = 0;
            } else {
                len += line.len();
            }
        }

        if let Some(acc) = current {
            accessions.push(acc.to_string());
            lengths.push(len);
        }

        Fasta {
            accessions,
            lengths,
        }
    }

    pub fn len(&self) -> usize {
        self.accessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessions.is_empty()
    }
}
