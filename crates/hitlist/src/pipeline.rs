//! Processing of one search result file, from parsed records to the
//! synopsis and first-hits tables

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::columns::RecordError;
use crate::enzyme::Enzyme;
use crate::errors::ErrorAccumulator;
use crate::mass::{delta_mass_ppm, precursor_mh, MassCalculator};
use crate::modification::ModificationCatalog;
use crate::peptide::annotate;
use crate::protein::ProteinOrder;
use crate::psm::{ColumnFlags, Psm, RawSearchResult};
use crate::ranking::{assign_ranks, first_hits, scan_order, synopsis, FilterSettings};
use crate::scan_group::{ScanGroupAssembler, ScanGroupRecord};

/// One line of the modification summary
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModSummaryRow {
    pub symbol: char,
    pub mass: f64,
    pub residues: String,
    pub mod_type: &'static str,
    pub occurrences: usize,
}

pub struct ProcessedFile {
    pub flags: ColumnFlags,
    /// Results passing the score filter, ordered by primary score
    pub synopsis: Vec<Psm>,
    /// Best result for each (scan, charge), ordered by scan and charge
    pub first_hits: Vec<Psm>,
    /// Empty unless a merged scan was reported by more than one merge event
    pub scan_groups: Vec<ScanGroupRecord>,
    pub mod_summary: Vec<ModSummaryRow>,
    pub errors: ErrorAccumulator,
}

pub struct FileProcessor<'a> {
    catalog: &'a ModificationCatalog,
    proteins: &'a ProteinOrder,
    flags: ColumnFlags,
    settings: FilterSettings,
    enzyme: Enzyme,
    scan_groups: ScanGroupAssembler,
    errors: ErrorAccumulator,
    psms: Vec<Psm>,
}

impl<'a> FileProcessor<'a> {
    pub fn new(
        catalog: &'a ModificationCatalog,
        proteins: &'a ProteinOrder,
        flags: ColumnFlags,
        settings: FilterSettings,
    ) -> Self {
        FileProcessor {
            catalog,
            proteins,
            flags,
            settings,
            enzyme: Enzyme::default(),
            scan_groups: ScanGroupAssembler::default(),
            errors: ErrorAccumulator::default(),
            psms: Vec::new(),
        }
    }

    /// Expand, annotate and store one parsed record. Records whose peptide
    /// carries an unresolved modification mass are counted and dropped.
    pub fn push(&mut self, raw: RawSearchResult) {
        let calculator = MassCalculator::new(self.catalog);

        for raw in self.scan_groups.expand(raw) {
            let mut peptide = match annotate(&raw.peptide, self.catalog, self.flags.variant) {
                Ok(peptide) => peptide,
                Err(err) => {
                    self.errors.record_error(raw.scan_num, &err);
                    continue;
                }
            };
            peptide.normalize_terminus();

            let (mh, unknown) = calculator.mh(&peptide);
            if unknown > 0 {
                self.errors.push_message(format!(
                    "scan {}: {} residue(s) without a known mass in {}",
                    raw.scan_num, unknown, peptide
                ));
            }
            let delta_mass = precursor_mh(raw.precursor_mz, raw.charge) - mh;
            let ntt = self.enzyme.termini(&peptide);

            self.psms.push(Psm {
                result_id: 0,
                delta_mass,
                delta_mass_ppm: delta_mass_ppm(delta_mass, raw.isotope_error, mh),
                mh,
                ntt,
                peptide,
                raw,
            });
        }
    }

    /// Note a line that could not be parsed
    pub fn push_error(&mut self, line: usize, err: &RecordError) {
        self.errors.record_malformed(line, err);
    }

    pub fn len(&self) -> usize {
        self.psms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.psms.is_empty()
    }

    fn mod_summary(&self, synopsis: &[Psm]) -> Vec<ModSummaryRow> {
        let mut counts = vec![0; self.catalog.len()];
        for psm in synopsis {
            for m in &psm.peptide.modifications {
                if let Some(count) = counts.get_mut(m.catalog_index) {
                    *count += 1;
                }
            }
        }

        self.catalog
            .entries()
            .iter()
            .zip(counts)
            .map(|(entry, occurrences)| ModSummaryRow {
                symbol: entry.symbol,
                mass: entry.mass,
                residues: entry.residues.clone(),
                mod_type: entry.mod_class.code(),
                occurrences,
            })
            .collect()
    }

    /// Rank, filter and number every stored result
    pub fn finish(mut self) -> ProcessedFile {
        self.psms.sort_by(scan_order);
        assign_ranks(&mut self.psms);

        let mut synopsis = synopsis(&self.psms, &self.settings);
        let mut first_hits = first_hits(&self.psms, self.proteins);
        for (ix, psm) in synopsis.iter_mut().enumerate() {
            psm.result_id = ix + 1;
        }
        for (ix, psm) in first_hits.iter_mut().enumerate() {
            psm.result_id = ix + 1;
        }

        log::trace!(
            "{} results: {} pass filter, {} first hits",
            self.psms.len(),
            synopsis.len(),
            first_hits.len()
        );

        ProcessedFile {
            flags: self.flags,
            mod_summary: self.mod_summary(&synopsis),
            scan_groups: self.scan_groups.records(),
            synopsis,
            first_hits,
            errors: self.errors,
        }
    }

    /// Feed parsed lines, given as (line number, parse result), until the
    /// input is exhausted or `abort` is set. Returns `None` on abort; nothing
    /// collected so far is kept.
    pub fn run<I>(mut self, lines: I, abort: &AtomicBool) -> Option<ProcessedFile>
    where
        I: IntoIterator<Item = (usize, Result<Vec<RawSearchResult>, RecordError>)>,
    {
        for (line, parsed) in lines {
            if abort.load(Ordering::Relaxed) {
                log::trace!("aborted at line {}", line);
                return None;
            }
            match parsed {
                Ok(records) => records.into_iter().for_each(|raw| self.push(raw)),
                Err(err) => self.push_error(line, &err),
            }
        }
        Some(self.finish())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::modification::{ModClass, ModificationEntry, STATIC_SYMBOL};

    fn catalog() -> ModificationCatalog {
        ModificationCatalog::new(vec![
            ModificationEntry::new(57.021464, STATIC_SYMBOL, "C", ModClass::StaticResidue),
            ModificationEntry::new(15.994915, '*', "M", ModClass::DynamicResidue),
        ])
    }

    fn raw(scan: &str, charge: i16, peptide: &str, spec_evalue: f64) -> RawSearchResult {
        RawSearchResult {
            scan: scan.into(),
            scan_num: scan.split('/').next().unwrap().parse().unwrap(),
            charge,
            peptide: peptide.into(),
            protein: "P1".into(),
            precursor_mz: 500.0,
            spec_evalue,
            evalue: spec_evalue * 1e5,
            ..Default::default()
        }
    }

    #[test]
    fn unresolved_records_are_rejected() {
        let catalog = catalog();
        let proteins = ProteinOrder::default();
        let mut processor =
            FileProcessor::new(&catalog, &proteins, ColumnFlags::default(), FilterSettings::default());
        processor.push(raw("1", 2, "K.PEPM+15.995TIDE.R", 1e-10));
        processor.push(raw("2", 2, "K.PEPM+120.5TIDE.R", 1e-10));
        assert_eq!(processor.len(), 1);

        let out = processor.finish();
        assert_eq!(out.errors.unresolved_count(), 1);
        assert_eq!(out.synopsis.len(), 1);
        assert_eq!(out.synopsis[0].peptide.to_string(), "K.PEPM*TIDE.R");
        assert_eq!(out.synopsis[0].result_id, 1);
    }

    #[test]
    fn mod_summary_counts_synopsis() {
        let catalog = catalog();
        let proteins = ProteinOrder::default();
        let mut processor =
            FileProcessor::new(&catalog, &proteins, ColumnFlags::default(), FilterSettings::default());
        processor.push(raw("1", 2, "K.PEPM+15.995TIDE.R", 1e-10));
        processor.push(raw("2", 2, "K.M+15.995PEPM+15.995.R", 1e-10));
        // fails the score filter
        processor.push(raw("3", 2, "K.M+15.995AAA.R", 1.0));

        let out = processor.finish();
        assert_eq!(out.synopsis.len(), 2);
        assert_eq!(out.first_hits.len(), 3);
        assert_eq!(out.mod_summary.len(), 2);
        assert_eq!(out.mod_summary[0].occurrences, 0);
        assert_eq!(out.mod_summary[1].symbol, '*');
        assert_eq!(out.mod_summary[1].occurrences, 3);
        assert_eq!(out.mod_summary[1].mod_type, "D");
    }

    #[test]
    fn rewritten_duplicates_are_suppressed() {
        let mut catalog = catalog().entries().to_vec();
        catalog.push(ModificationEntry::new(
            42.010565,
            '#',
            "*",
            ModClass::DynNTermPeptide,
        ));
        let catalog = ModificationCatalog::new(catalog);
        let proteins = ProteinOrder::default();
        let mut processor =
            FileProcessor::new(&catalog, &proteins, ColumnFlags::default(), FilterSettings::default());
        processor.push(raw("7", 2, "K.+42.011MDH.R", 1e-10));
        processor.push(raw("7", 2, "K.M+42.011DH.R", 1e-10));

        let out = processor.finish();
        assert_eq!(out.synopsis.len(), 1);
        assert_eq!(out.synopsis[0].peptide.to_string(), "K.M#DH.R");
        assert_eq!(out.synopsis[0].result_id, 1);
    }

    #[test]
    fn merged_scans() {
        let catalog = catalog();
        let proteins = ProteinOrder::default();
        let mut processor =
            FileProcessor::new(&catalog, &proteins, ColumnFlags::default(), FilterSettings::default());
        processor.push(raw("100/101/102", 2, "K.PEPTIDE.R", 1e-10));
        let out = processor.finish();
        assert_eq!(out.first_hits.len(), 3);
        assert!(out.scan_groups.is_empty());
    }

    #[test]
    fn abort_discards_everything() {
        let catalog = catalog();
        let proteins = ProteinOrder::default();
        let processor =
            FileProcessor::new(&catalog, &proteins, ColumnFlags::default(), FilterSettings::default());
        let abort = AtomicBool::new(true);
        let lines = vec![(2, Ok(vec![raw("1", 2, "K.PEPTIDE.R", 1e-10)]))];
        assert!(processor.run(lines, &abort).is_none());
    }

    #[test]
    fn run_counts_malformed_lines() {
        let catalog = catalog();
        let proteins = ProteinOrder::default();
        let processor =
            FileProcessor::new(&catalog, &proteins, ColumnFlags::default(), FilterSettings::default());
        let abort = AtomicBool::new(false);
        let lines = vec![
            (2, Ok(vec![raw("1", 2, "K.PEPTIDE.R", 1e-10)])),
            (
                3,
                Err(RecordError::WrongColumnCount {
                    expected: 14,
                    found: 3,
                }),
            ),
        ];
        let out = processor.run(lines, &abort).unwrap();
        assert_eq!(out.synopsis.len(), 1);
        assert_eq!(out.errors.malformed_count(), 1);
        assert!(out.errors.log().starts_with("line 3"));
    }
}
