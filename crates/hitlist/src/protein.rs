//! Pick a representative protein for peptides that map to several accessions

use fnv::FnvHashMap;

use crate::fasta::Fasta;

/// Position of each accession's first appearance in the protein database
#[derive(Clone, Debug, Default)]
pub struct ProteinOrder {
    index: FnvHashMap<String, usize>,
}

impl ProteinOrder {
    pub fn new<I, S>(accessions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = FnvHashMap::default();
        for (ix, acc) in accessions.into_iter().enumerate() {
            index.entry(acc.into()).or_insert(ix);
        }
        Self { index }
    }

    /// Order index of `accession`; accessions missing from the database sort last
    pub fn rank(&self, accession: &str) -> usize {
        self.index.get(accession).copied().unwrap_or(usize::MAX)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl From<&Fasta> for ProteinOrder {
    fn from(fasta: &Fasta) -> Self {
        ProteinOrder::new(fasta.accessions.iter().cloned())
    }
}

/// Keep `current` unless `candidate` appears strictly earlier in the database
pub fn pick<'a>(
    current: &'a str,
    current_rank: usize,
    candidate: &'a str,
    order: &ProteinOrder,
) -> (&'a str, usize) {
    let candidate_rank = order.rank(candidate);
    if candidate_rank < current_rank {
        (candidate, candidate_rank)
    } else {
        (current, current_rank)
    }
}

/// Fold [`pick`] over every candidate, starting from `first`
pub fn best_protein<'a, I>(first: &'a str, candidates: I, order: &ProteinOrder) -> &'a str
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .fold((first, order.rank(first)), |(name, rank), candidate| {
            pick(name, rank, candidate, order)
        })
        .0
}
