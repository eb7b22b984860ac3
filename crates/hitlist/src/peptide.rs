use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::AnnotationError;
use crate::matcher::{resolve_token, MassMatch, TokenContext, TokenResolution, SIGNED_NUMBER};
use crate::modification::{ModClass, ModificationCatalog};
use crate::psm::EngineVariant;

/// Protein terminus marker written to output peptides
pub const PROTEIN_TERMINUS: char = '-';
/// Protein terminus marker used by MSGF+
pub const MSGF_PROTEIN_TERMINUS: char = '_';

static N_TERMINAL_MASSES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[+-](?:\d+\.?\d*|\.\d+))+").expect("valid N-terminal mass regex")
});

pub fn is_protein_terminus(c: char) -> bool {
    c == PROTEIN_TERMINUS || c == MSGF_PROTEIN_TERMINUS
}

fn is_residue(c: char) -> bool {
    c.is_ascii_alphabetic()
}

/// A catalog entry that was applied while annotating a peptide
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AppliedModification {
    pub catalog_index: usize,
    /// 1-based position of the residue carrying the modification
    pub residue_position: usize,
    pub mass: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnnotatedPeptide {
    pub prefix: Option<char>,
    /// Residues and modification symbols, without numeric mass tokens once
    /// every mass was resolved
    pub core: String,
    pub suffix: Option<char>,
    /// Summed mass of every applied modification, including static ones that
    /// have no visible symbol
    pub total_mod_mass: f64,
    pub modifications: Vec<AppliedModification>,
    /// Masses that could not be matched to the catalog
    pub unresolved: Vec<f64>,
}

impl AnnotatedPeptide {
    /// Residues only, without modification symbols
    pub fn clean_sequence(&self) -> String {
        self.core.chars().filter(|c| is_residue(*c)).collect()
    }

    pub fn len(&self) -> usize {
        self.core.chars().filter(|c| is_residue(*c)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reject peptides that still carry numeric text
    pub fn validate(self) -> Result<Self, AnnotationError> {
        if self.unresolved.is_empty() && !self.core.chars().any(|c| c.is_ascii_digit()) {
            Ok(self)
        } else {
            Err(AnnotationError::UnresolvedModification {
                peptide: self.to_string(),
                masses: self.unresolved,
            })
        }
    }

    /// Replace the MSGF+ protein terminus marker with the one used in output
    pub fn normalize_terminus(&mut self) {
        for c in [&mut self.prefix, &mut self.suffix].into_iter().flatten() {
            if *c == MSGF_PROTEIN_TERMINUS {
                *c = PROTEIN_TERMINUS;
            }
        }
    }
}

impl std::fmt::Display for AnnotatedPeptide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(prefix) = self.prefix {
            write!(f, "{}.", prefix)?;
        }
        f.write_str(&self.core)?;
        if let Some(suffix) = self.suffix {
            write!(f, ".{}", suffix)?;
        }
        Ok(())
    }
}

/// Split `K.PEPTIDE.R` into its flanking residues and the core sequence
pub fn split_flanking(peptide: &str) -> (Option<char>, &str, Option<char>) {
    let bytes = peptide.as_bytes();
    let n = bytes.len();
    let flank = |b: u8| b.is_ascii_alphabetic() || b == b'-' || b == b'_';
    if n >= 4 && bytes[1] == b'.' && bytes[n - 2] == b'.' && flank(bytes[0]) && flank(bytes[n - 1])
    {
        (
            Some(bytes[0] as char),
            &peptide[2..n - 2],
            Some(bytes[n - 1] as char),
        )
    } else {
        (None, peptide, None)
    }
}

struct Rewriter<'a> {
    catalog: &'a ModificationCatalog,
    inline_statics: bool,
    prefix: Option<char>,
    suffix: Option<char>,
    residue_count: usize,
    first_residue: char,
    out: String,
    total_mod_mass: f64,
    modifications: Vec<AppliedModification>,
    unresolved: Vec<f64>,
}

impl<'a> Rewriter<'a> {
    fn apply(&mut self, resolution: &TokenResolution, residue_position: usize) {
        for m in &resolution.matches {
            match m {
                MassMatch::Resolved { index, mass, .. } => {
                    self.total_mod_mass += mass;
                    self.modifications.push(AppliedModification {
                        catalog_index: *index,
                        residue_position,
                        mass: *mass,
                    });
                }
                MassMatch::Unresolved { mass, .. } => self.unresolved.push(*mass),
            }
        }
        self.out.push_str(&resolution.symbols());
    }

    fn apply_static(&mut self, class: ModClass, residue: char, residue_position: usize) {
        let catalog = self.catalog;
        for index in catalog.statics_for(class, residue) {
            let mass = catalog.entries()[index].mass;
            self.total_mod_mass += mass;
            self.modifications.push(AppliedModification {
                catalog_index: index,
                residue_position,
                mass,
            });
        }
    }

    /// Static modifications the engine did not write into the peptide
    fn out_of_band_statics(&mut self, residue: char, position: usize) {
        self.apply_static(ModClass::StaticResidue, residue, position);
        if position == 1 {
            self.apply_static(ModClass::StaticNTermPeptide, residue, position);
            if self.prefix.map(is_protein_terminus).unwrap_or(false) {
                self.apply_static(ModClass::StaticNTermProtein, residue, position);
            }
        }
        if position == self.residue_count {
            self.apply_static(ModClass::StaticCTermPeptide, residue, position);
            if self.suffix.map(is_protein_terminus).unwrap_or(false) {
                self.apply_static(ModClass::StaticCTermProtein, residue, position);
            }
        }
    }

    /// Replace each signed number in `run` by its symbols; other characters
    /// in the run are kept as they are
    fn splice(&mut self, run: &str, residue: char, context: TokenContext, position: usize) {
        let mut cursor = 0;
        for number in SIGNED_NUMBER.find_iter(run) {
            self.out.push_str(&run[cursor..number.start()]);
            let resolution = resolve_token(residue, number.as_str(), context, self.catalog);
            self.apply(&resolution, position);
            cursor = number.end();
        }
        self.out.push_str(&run[cursor..]);
    }

    /// A mass before the first residue of a single-residue peptide may also
    /// be C-terminal
    fn n_terminal_context(&self) -> TokenContext {
        TokenContext::new(true, self.residue_count <= 1)
    }

    fn walk(&mut self, core: &str) {
        let mut rest = core;
        if let Some(m) = N_TERMINAL_MASSES.find(core) {
            let resolution = resolve_token(
                self.first_residue,
                m.as_str(),
                self.n_terminal_context(),
                self.catalog,
            );
            self.apply(&resolution, 1);
            rest = &core[m.end()..];
        }

        let mut position = 0;
        let mut last_residue = None;
        let mut iter = rest.char_indices().peekable();
        while let Some((start, c)) = iter.next() {
            if is_residue(c) {
                position += 1;
                last_residue = Some(c);
                self.out.push(c);
                if !self.inline_statics {
                    self.out_of_band_statics(c, position);
                }
                continue;
            }

            let mut end = start + c.len_utf8();
            while let Some(&(next, d)) = iter.peek() {
                if is_residue(d) {
                    break;
                }
                end = next + d.len_utf8();
                iter.next();
            }
            let run = &rest[start..end];

            match last_residue {
                None => self.splice(run, self.first_residue, self.n_terminal_context(), 1),
                Some(residue) => {
                    let context = TokenContext::new(false, position == self.residue_count);
                    self.splice(run, residue, context, position);
                }
            }
        }
    }

    /// Move anything written before the first residue to just after it
    fn relocate_n_terminus(&mut self) {
        if let Some(first) = self.out.find(is_residue) {
            if first > 0 {
                let residue = self.out[first..].chars().next().unwrap_or_default();
                let leading = self.out[..first].to_string();
                let tail = self.out[first + residue.len_utf8()..].to_string();
                self.out.clear();
                self.out.push(residue);
                self.out.push_str(&leading);
                self.out.push_str(&tail);
            }
        }
    }
}

/// Replace the numeric modification masses in `peptide` with catalog symbols
///
/// Masses that cannot be resolved are left in place as numeric text, and
/// reported in [`AnnotatedPeptide::unresolved`]. N-terminal symbols are moved
/// after the first residue.
pub fn rewrite(
    peptide: &str,
    catalog: &ModificationCatalog,
    variant: EngineVariant,
) -> AnnotatedPeptide {
    let (prefix, core, suffix) = split_flanking(peptide);

    let mut rewriter = Rewriter {
        catalog,
        inline_statics: variant.reports_static_mods_inline(),
        prefix,
        suffix,
        residue_count: core.chars().filter(|c| is_residue(*c)).count(),
        first_residue: core.chars().find(|c| is_residue(*c)).unwrap_or_default(),
        out: String::with_capacity(core.len()),
        total_mod_mass: 0.0,
        modifications: Vec::new(),
        unresolved: Vec::new(),
    };
    rewriter.walk(core);
    rewriter.relocate_n_terminus();

    AnnotatedPeptide {
        prefix,
        core: rewriter.out,
        suffix,
        total_mod_mass: rewriter.total_mod_mass,
        modifications: rewriter.modifications,
        unresolved: rewriter.unresolved,
    }
}

/// [`rewrite`], rejecting peptides with unresolved masses
pub fn annotate(
    peptide: &str,
    catalog: &ModificationCatalog,
    variant: EngineVariant,
) -> Result<AnnotatedPeptide, AnnotationError> {
    rewrite(peptide, catalog, variant).validate()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::modification::{ModificationEntry, STATIC_SYMBOL};

    fn catalog() -> ModificationCatalog {
        ModificationCatalog::new(vec![
            ModificationEntry::new(57.021464, STATIC_SYMBOL, "C", ModClass::StaticResidue),
            ModificationEntry::new(15.994915, '*', "M", ModClass::DynamicResidue),
            ModificationEntry::new(42.010565, '#', "*", ModClass::DynNTermProtein),
            ModificationEntry::new(79.966331, '@', "STY", ModClass::DynamicResidue),
            ModificationEntry::new(0.984016, '!', "*", ModClass::DynCTermPeptide),
        ])
    }

    #[test]
    fn flanking() {
        assert_eq!(
            split_flanking("K.PEPTIDE.R"),
            (Some('K'), "PEPTIDE", Some('R'))
        );
        assert_eq!(
            split_flanking("_.+42.011MDH._"),
            (Some('_'), "+42.011MDH", Some('_'))
        );
        assert_eq!(split_flanking("PEPTIDE"), (None, "PEPTIDE", None));
        // A trailing mass with a decimal point is not a suffix
        assert_eq!(
            split_flanking("PEPTK+1.0"),
            (None, "PEPTK+1.0", None)
        );
    }

    #[test]
    fn n_terminal_relocation() {
        let catalog = catalog();
        let pep = rewrite("_.+42.011MDHTPQSQLK._", &catalog, EngineVariant::MsgfPlus);
        assert_eq!(pep.core, "M#DHTPQSQLK");
        assert_eq!(pep.to_string(), "_.M#DHTPQSQLK._");
        assert!((pep.total_mod_mass - 42.010565).abs() < 1e-9);
        assert_eq!(pep.modifications.len(), 1);
        assert_eq!(pep.modifications[0].residue_position, 1);
    }

    #[test]
    fn n_terminal_and_residue_mods() {
        let catalog = catalog();
        let pep = rewrite("K.+42.011M+15.995DHTPQ.S", &catalog, EngineVariant::MsgfPlus);
        assert_eq!(pep.core, "M#*DHTPQ");
        assert!((pep.total_mod_mass - (42.010565 + 15.994915)).abs() < 1e-9);
    }

    #[test]
    fn inline_static_mods_are_hidden() {
        let catalog = catalog();
        let pep = rewrite(
            "R.AC+57.021DEM+15.995K.L",
            &catalog,
            EngineVariant::MsgfPlus,
        );
        assert_eq!(pep.core, "ACDEM*K");
        assert!((pep.total_mod_mass - (57.021464 + 15.994915)).abs() < 1e-9);
        assert_eq!(pep.modifications.len(), 2);
        assert_eq!(pep.modifications[0].residue_position, 2);
        assert_eq!(pep.modifications[1].residue_position, 5);
    }

    #[test]
    fn out_of_band_static_mods() {
        let catalog = catalog();
        let pep = rewrite("R.ACDECK.L", &catalog, EngineVariant::Msgfdb);
        assert_eq!(pep.core, "ACDECK");
        assert!((pep.total_mod_mass - 2.0 * 57.021464).abs() < 1e-9);
        assert_eq!(pep.modifications.len(), 2);
    }

    #[test]
    fn static_and_dynamic_on_same_residue() {
        let catalog = ModificationCatalog::new(vec![
            ModificationEntry::new(57.021464, STATIC_SYMBOL, "C", ModClass::StaticResidue),
            ModificationEntry::new(-17.026549, '*', "C", ModClass::DynNTermPeptide),
        ]);
        let pep = rewrite(
            "K.-17.027C+57.021PEPTIDE.R",
            &catalog,
            EngineVariant::MsgfPlus,
        );
        assert_eq!(pep.core, "C*PEPTIDE");
        assert!((pep.total_mod_mass - (57.021464 - 17.026549)).abs() < 1e-9);
    }

    #[test]
    fn protein_terminal_statics() {
        let catalog = ModificationCatalog::new(vec![
            ModificationEntry::new(229.162932, STATIC_SYMBOL, "*", ModClass::StaticNTermPeptide),
            ModificationEntry::new(42.010565, STATIC_SYMBOL, "*", ModClass::StaticNTermProtein),
            ModificationEntry::new(0.984016, STATIC_SYMBOL, "*", ModClass::StaticCTermProtein),
        ]);
        let internal = rewrite("K.PEPTIDE.R", &catalog, EngineVariant::Msgfdb);
        assert!((internal.total_mod_mass - 229.162932).abs() < 1e-9);

        let terminal = rewrite("-.PEPTIDE.-", &catalog, EngineVariant::Msgfdb);
        assert!((terminal.total_mod_mass - (229.162932 + 42.010565 + 0.984016)).abs() < 1e-9);
        assert_eq!(terminal.core, "PEPTIDE");
    }

    #[test]
    fn c_terminal_context() {
        let catalog = catalog();
        let pep = rewrite("K.PEPTIDEK+0.984.R", &catalog, EngineVariant::MsgfPlus);
        assert_eq!(pep.core, "PEPTIDEK!");
        assert!(pep.unresolved.is_empty());

        // Internal position relaxes once, so the C-terminal entry is still found
        let pep = rewrite("K.PEP+0.984TIDEK.R", &catalog, EngineVariant::MsgfPlus);
        assert_eq!(pep.core, "PEP!TIDEK");
    }

    #[test]
    fn multiple_numbers_in_one_token() {
        let catalog = catalog();
        let pep = rewrite(
            "K.S+79.966+15.995PEK.R",
            &catalog,
            EngineVariant::MsgfPlus,
        );
        assert_eq!(pep.core, "S@*PEK");
    }

    #[test]
    fn unresolved_masses_are_kept() {
        let catalog = catalog();
        let pep = rewrite("K.PEP+120.5TIDE.R", &catalog, EngineVariant::MsgfPlus);
        assert_eq!(pep.core, "PEP+120.5TIDE");
        assert_eq!(pep.unresolved, vec![120.5]);
        assert_eq!(pep.total_mod_mass, 0.0);

        match pep.validate() {
            Err(AnnotationError::UnresolvedModification { peptide, masses }) => {
                assert_eq!(peptide, "K.PEP+120.5TIDE.R");
                assert_eq!(masses, vec![120.5]);
            }
            other => panic!("expected unresolved modification, got {:?}", other),
        }

        assert!(annotate("K.PEPM+15.995.R", &catalog, EngineVariant::MsgfPlus).is_ok());
    }

    #[test]
    fn idempotent_on_symbolic_peptides() {
        let catalog = catalog();
        for raw in ["K.M#DHT*PQ.R", "-.PEPTIDE.-", "ACD@EF", "K.PEPTIDEK!.R"] {
            let pep = rewrite(raw, &catalog, EngineVariant::MsgfPlus);
            assert_eq!(pep.to_string(), raw);
            assert_eq!(pep.total_mod_mass, 0.0);
            let again = rewrite(&pep.to_string(), &catalog, EngineVariant::MsgfPlus);
            assert_eq!(again, pep);
        }
    }

    #[test]
    fn clean_sequence_and_terminus() {
        let catalog = catalog();
        let mut pep = rewrite("_.+42.011MDHTPQSQLK._", &catalog, EngineVariant::MsgfPlus);
        assert_eq!(pep.clean_sequence(), "MDHTPQSQLK");
        assert_eq!(pep.len(), 10);
        pep.normalize_terminus();
        assert_eq!(pep.to_string(), "-.M#DHTPQSQLK.-");
    }
}
