//! Per-scan ranking and the two result filters: the synopsis score filter and
//! first-hit selection

use std::cmp::Ordering;

use fnv::FnvHashSet;
use serde::{Deserialize, Serialize};

use crate::protein::{best_protein, ProteinOrder};
use crate::psm::Psm;

/// Score thresholds for the synopsis file. A result is kept if any one of
/// them is met.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub evalue_threshold: f64,
    pub spec_evalue_threshold: f64,
    /// Exclusive upper bound; a q-value of zero means "not reported"
    pub q_value_threshold: f64,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            evalue_threshold: 0.75,
            spec_evalue_threshold: 5e-7,
            q_value_threshold: 0.01,
        }
    }
}

impl FilterSettings {
    pub fn accepts(&self, evalue: f64, spec_evalue: f64, q_value: f64) -> bool {
        evalue <= self.evalue_threshold
            || spec_evalue <= self.spec_evalue_threshold
            || (q_value > 0.0 && q_value < self.q_value_threshold)
    }
}

fn peptide_order(a: &Psm, b: &Psm) -> Ordering {
    (a.peptide.prefix, &a.peptide.core, a.peptide.suffix).cmp(&(
        b.peptide.prefix,
        &b.peptide.core,
        b.peptide.suffix,
    ))
}

/// (scan, charge, primary score, peptide, protein)
pub fn scan_order(a: &Psm, b: &Psm) -> Ordering {
    a.raw
        .scan_num
        .cmp(&b.raw.scan_num)
        .then(a.raw.charge.cmp(&b.raw.charge))
        .then(a.spec_evalue().total_cmp(&b.spec_evalue()))
        .then_with(|| peptide_order(a, b))
        .then_with(|| a.raw.protein.cmp(&b.raw.protein))
}

/// (primary score, scan, charge, peptide, protein)
pub fn score_order(a: &Psm, b: &Psm) -> Ordering {
    a.spec_evalue()
        .total_cmp(&b.spec_evalue())
        .then(a.raw.scan_num.cmp(&b.raw.scan_num))
        .then(a.raw.charge.cmp(&b.raw.charge))
        .then_with(|| peptide_order(a, b))
        .then_with(|| a.raw.protein.cmp(&b.raw.protein))
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs())
}

/// Dense ranks for `scores`, returned in input order. The smallest score has
/// rank 1, and a score within machine epsilon (relative to its magnitude) of
/// the previous one shares its rank.
pub fn dense_ranks(scores: &[f64]) -> Vec<u32> {
    let mut order = (0..scores.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0; scores.len()];
    let mut rank = 0;
    let mut previous = f64::NAN;
    for ix in order {
        let score = scores[ix];
        if rank == 0 || !approx_eq(score, previous) {
            rank += 1;
        }
        previous = score;
        ranks[ix] = rank;
    }
    ranks
}

/// Runs of `psms` that share a scan number. `psms` must be sorted by scan.
fn scan_slices(psms: &[Psm]) -> impl Iterator<Item = std::ops::Range<usize>> + '_ {
    let mut start = 0;
    std::iter::from_fn(move || {
        if start >= psms.len() {
            return None;
        }
        let scan = psms[start].raw.scan_num;
        let end = psms[start..]
            .iter()
            .position(|p| p.raw.scan_num != scan)
            .map(|n| start + n)
            .unwrap_or(psms.len());
        let range = start..end;
        start = end;
        Some(range)
    })
}

/// Assign scan-wide dense ranks by primary score. Every charge state of a
/// scan competes in the same ranking.
pub fn assign_ranks(psms: &mut [Psm]) {
    let slices = scan_slices(psms).collect::<Vec<_>>();
    for range in slices {
        let slice = &mut psms[range];
        let scores = slice.iter().map(|p| p.spec_evalue()).collect::<Vec<_>>();
        for (psm, rank) in slice.iter_mut().zip(dense_ranks(&scores)) {
            psm.raw.rank = rank;
        }
    }
}

/// Results passing `settings`, with exact duplicates within a scan removed,
/// ordered by primary score
pub fn synopsis(psms: &[Psm], settings: &FilterSettings) -> Vec<Psm> {
    let mut passing = Vec::new();
    for range in scan_slices(psms) {
        let mut seen = FnvHashSet::default();
        for psm in &psms[range] {
            if !settings.accepts(psm.raw.evalue, psm.raw.spec_evalue, psm.raw.q_value) {
                continue;
            }
            let key = (
                psm.peptide.to_string(),
                psm.raw.protein.as_str(),
                psm.mh.to_bits(),
                psm.raw.spec_evalue.to_bits(),
            );
            if seen.insert(key) {
                passing.push(psm.clone());
            }
        }
    }
    passing.sort_by(score_order);
    passing
}

/// The best result for each (scan, charge). `psms` must be sorted with
/// [`scan_order`]. When the chosen peptide was also matched to other
/// proteins, the one listed first in the protein database is reported.
pub fn first_hits(psms: &[Psm], proteins: &ProteinOrder) -> Vec<Psm> {
    let mut hits = Vec::new();
    let mut start = 0;
    while start < psms.len() {
        let key = (psms[start].raw.scan_num, psms[start].raw.charge);
        let end = psms[start..]
            .iter()
            .position(|p| (p.raw.scan_num, p.raw.charge) != key)
            .map(|n| start + n)
            .unwrap_or(psms.len());

        let mut best = psms[start].clone();
        let sequence = best.peptide.clean_sequence();
        let protein = best_protein(
            &psms[start].raw.protein,
            psms[start + 1..end]
                .iter()
                .filter(|p| p.peptide.clean_sequence() == sequence)
                .map(|p| p.raw.protein.as_str()),
            proteins,
        );
        if protein != best.raw.protein {
            log::trace!(
                "scan {}: reporting {} instead of {}",
                key.0,
                protein,
                best.raw.protein
            );
            best.raw.protein = protein.to_string();
        }
        hits.push(best);
        start = end;
    }
    hits
}
