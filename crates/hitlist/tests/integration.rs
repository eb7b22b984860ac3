//! Process the sample MSGF+ result file end to end, and check the ranking and
//! rewriting properties that must hold for arbitrary input

use std::sync::atomic::AtomicBool;

use hitlist_core::columns::ColumnMap;
use hitlist_core::matcher::resolve;
use hitlist_core::modification::{ModClass, ModificationCatalog, ModificationEntry};
use hitlist_core::peptide::rewrite;
use hitlist_core::pipeline::{FileProcessor, ProcessedFile};
use hitlist_core::protein::ProteinOrder;
use hitlist_core::psm::{EngineVariant, RawSearchResult};
use hitlist_core::ranking::{dense_ranks, FilterSettings};
use hitlist_core::scan_group::ScanGroupAssembler;
use quickcheck_macros::quickcheck;

fn process_sample() -> ProcessedFile {
    let catalog = hitlist_core::read_catalog("../../tests/MSGFPlus_Mods.txt").unwrap();
    let fasta = hitlist_core::read_fasta("../../tests/sample.fasta").unwrap();
    let proteins = ProteinOrder::from(&fasta);
    let contents = std::fs::read_to_string("../../tests/sample_msgfplus.tsv").unwrap();

    let mut lines = contents.lines();
    let headers = lines.next().unwrap().split('\t');
    let columns = ColumnMap::from_headers(headers, None).unwrap();

    let processor = FileProcessor::new(
        &catalog,
        &proteins,
        columns.flags(),
        FilterSettings::default(),
    );
    let parsed = lines.enumerate().map(|(ix, line)| {
        let fields = line.split('\t').collect::<Vec<_>>();
        (ix + 2, columns.parse(&fields))
    });
    processor.run(parsed, &AtomicBool::new(false)).unwrap()
}

#[test]
fn sample_synopsis() {
    let out = process_sample();
    assert_eq!(out.flags.variant, EngineVariant::MsgfPlus);
    assert_eq!(out.errors.unresolved_count(), 1);
    assert_eq!(out.errors.malformed_count(), 0);

    let rows = out
        .synopsis
        .iter()
        .map(|p| {
            (
                p.result_id,
                p.raw.scan_num,
                p.peptide.to_string(),
                p.raw.protein.as_str(),
                p.raw.rank,
            )
        })
        .collect::<Vec<_>>();

    assert_eq!(
        rows,
        vec![
            (1, 60, "K.LAGVNDK.R".into(), "sp|P00001|ALPHA", 1),
            (2, 61, "K.LAGVNDK.R".into(), "sp|P00001|ALPHA", 1),
            (3, 61, "K.VSTYLK.N".into(), "sp|P00003|GAMMA", 2),
            (4, 50, "-.M#DHTPQSQLK.A".into(), "sp|P00001|ALPHA", 1),
            (5, 50, "-.M#DHTPQSQLK.A".into(), "sp|P00002|BETA", 1),
            (6, 50, "K.AGVCDLIK.R".into(), "sp|P00002|BETA", 1),
            (7, 50, "R.S@PEPTIDEK.A".into(), "sp|P00002|BETA", 2),
        ]
    );

    // merged spectra keep their own spec index and fragmentation method
    assert_eq!(out.synopsis[0].raw.spec_index, "59");
    assert_eq!(out.synopsis[0].raw.frag_method, "CID");
    assert_eq!(out.synopsis[1].raw.spec_index, "60");
    assert_eq!(out.synopsis[1].raw.frag_method, "ETD");

    // the static carbamidomethyl mass is counted without a symbol
    let static_mod = &out.synopsis[5];
    assert_eq!(static_mod.peptide.modifications.len(), 1);
    assert!((static_mod.peptide.total_mod_mass - 57.021464).abs() < 1e-5);
}

#[test]
fn sample_first_hits() {
    let out = process_sample();
    let rows = out
        .first_hits
        .iter()
        .map(|p| {
            (
                p.result_id,
                p.raw.scan_num,
                p.raw.charge,
                p.peptide.clean_sequence(),
                p.raw.protein.as_str(),
            )
        })
        .collect::<Vec<_>>();

    assert_eq!(
        rows,
        vec![
            (1, 50, 2, "MDHTPQSQLK".into(), "sp|P00002|BETA"),
            (2, 50, 3, "SPEPTIDEK".into(), "sp|P00002|BETA"),
            (3, 51, 2, "PEPTIDEK".into(), "sp|P00001|ALPHA"),
            (4, 60, 2, "LAGVNDK".into(), "sp|P00001|ALPHA"),
            (5, 61, 2, "LAGVNDK".into(), "sp|P00001|ALPHA"),
        ]
    );
    // rank of the best hit for scan 51, which failed the score filter
    assert_eq!(out.first_hits[2].raw.rank, 1);
    assert_eq!(out.first_hits[1].raw.rank, 2);
    assert_eq!(out.first_hits[0].ntt, 2);
}

#[test]
fn sample_scan_groups_and_summary() {
    let out = process_sample();
    let groups = out
        .scan_groups
        .iter()
        .map(|g| (g.scan_group_id, g.charge, g.scan))
        .collect::<Vec<_>>();
    assert_eq!(groups, vec![(1, 2, 60), (1, 2, 61)]);

    let counts = out
        .mod_summary
        .iter()
        .map(|row| (row.symbol, row.occurrences))
        .collect::<Vec<_>>();
    assert_eq!(counts, vec![('-', 1), ('*', 0), ('#', 2), ('@', 1)]);
}

#[test]
fn ranks_are_scan_wide() {
    // two charge 2 results tied at 1e-8, and a charge 3 result at 1e-5
    assert_eq!(dense_ranks(&[1e-8, 1e-8, 1e-5]), vec![1, 1, 2]);
}

#[test]
fn tolerance_boundary() {
    let catalog = ModificationCatalog::new(vec![ModificationEntry::new(
        15.994915,
        '*',
        "M",
        ModClass::DynamicResidue,
    )]);
    let inside = resolve('M', "+16.244815", false, false, &catalog);
    assert!(inside.is_resolved());
    assert_eq!(inside.symbols(), "*");

    let outside = resolve('M', "+16.245015", false, false, &catalog);
    assert!(!outside.is_resolved());
}

#[test]
fn n_terminal_relocation() {
    let catalog = hitlist_core::read_catalog("../../tests/MSGFPlus_Mods.txt").unwrap();
    let peptide = rewrite("_.+42.011MDHTPQSQLK._", &catalog, EngineVariant::MsgfPlus);
    assert_eq!(peptide.core, "M#DHTPQSQLK");
    assert_eq!(peptide.to_string(), "_.M#DHTPQSQLK._");
    assert!(peptide.unresolved.is_empty());
}

#[test]
fn scan_group_threshold() {
    let raw = |scan: &str| RawSearchResult {
        scan: scan.into(),
        scan_num: scan.split('/').next().unwrap().parse().unwrap(),
        spec_index: scan.into(),
        frag_method: "HCD/HCD/HCD".into(),
        charge: 2,
        ..Default::default()
    };

    let mut asm = ScanGroupAssembler::default();
    assert_eq!(asm.expand(raw("100/101/102")).len(), 3);
    assert!(asm.records().is_empty());

    asm.expand(raw("101"));
    let records = asm.records();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.scan_group_id == 1));
}

#[test]
fn synopsis_filter_examples() {
    let settings = FilterSettings::default();
    assert!(settings.accepts(0.5, 1e-3, 0.0));
    assert!(!settings.accepts(0.9, 1e-3, 0.0));
    assert!(settings.accepts(0.9, 1.0, 0.005));
}

#[quickcheck]
fn rank_monotonicity(scores: Vec<u16>) -> bool {
    let mut scores = scores
        .into_iter()
        .map(|s| s as f64 * 1e-30)
        .collect::<Vec<_>>();
    scores.sort_by(|a, b| a.total_cmp(b));
    let ranks = dense_ranks(&scores);

    let mut distinct = scores.clone();
    distinct.dedup();

    let starts_at_one = ranks.first().map(|r| *r == 1).unwrap_or(true);
    let non_decreasing = ranks.windows(2).all(|w| w[0] <= w[1]);
    let ties_share = scores
        .windows(2)
        .zip(ranks.windows(2))
        .all(|(s, r)| (s[0] == s[1]) == (r[0] == r[1]));
    let clusters = ranks.last().copied().unwrap_or(0) as usize == distinct.len();

    starts_at_one && non_decreasing && ties_share && clusters
}

#[quickcheck]
fn rewrite_is_idempotent(residues: Vec<u8>, symbols: Vec<u8>) -> bool {
    const RESIDUES: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";
    const SYMBOLS: &[u8] = b"*#@$&!%~^=";

    let catalog = hitlist_core::read_catalog("../../tests/MSGFPlus_Mods.txt").unwrap();

    let mut peptide = String::new();
    for (ix, r) in residues.iter().enumerate() {
        peptide.push(RESIDUES[*r as usize % RESIDUES.len()] as char);
        if let Some(s) = symbols.get(ix) {
            if s % 3 == 0 {
                peptide.push(SYMBOLS[*s as usize % SYMBOLS.len()] as char);
            }
        }
    }

    let once = rewrite(&peptide, &catalog, EngineVariant::MsgfPlus);
    let twice = rewrite(&once.to_string(), &catalog, EngineVariant::MsgfPlus);
    once.to_string() == peptide && once.total_mod_mass == 0.0 && twice == once
}
