use serde::{Deserialize, Serialize};

use crate::peptide::AnnotatedPeptide;

/// Search engine family that produced the input file
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineVariant {
    /// Static modifications are applied silently and never written into peptides
    Msgfdb,
    /// Static modification masses are written into peptides like dynamic ones
    MsgfPlus,
}

impl EngineVariant {
    pub fn reports_static_mods_inline(self) -> bool {
        matches!(self, EngineVariant::MsgfPlus)
    }

    /// Column header names for (primary score, secondary score, q-value, peptide q-value)
    pub fn score_headers(self) -> [&'static str; 4] {
        match self {
            EngineVariant::Msgfdb => ["MSGFDB_SpecProb", "PValue", "FDR", "PepFDR"],
            EngineVariant::MsgfPlus => ["MSGFPlus_SpecEValue", "EValue", "QValue", "PepQValue"],
        }
    }
}

/// Which optional columns the input file carries
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnFlags {
    pub variant: EngineVariant,
    pub has_q_value: bool,
    pub has_pep_q_value: bool,
    pub has_efdr: bool,
    pub has_isotope_error: bool,
    pub has_ims: bool,
}

impl Default for ColumnFlags {
    fn default() -> Self {
        Self {
            variant: EngineVariant::MsgfPlus,
            has_q_value: true,
            has_pep_q_value: true,
            has_efdr: false,
            has_isotope_error: true,
            has_ims: false,
        }
    }
}

/// One candidate peptide-spectrum match, as read from the engine output
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawSearchResult {
    pub spec_file: String,
    pub spec_index: String,
    /// Scan number text; merged spectra list several scans separated by `/`
    pub scan: String,
    pub scan_num: i32,
    pub frag_method: String,
    pub precursor_mz: f64,
    pub precursor_error: f64,
    pub isotope_error: i32,
    pub charge: i16,
    /// Peptide with flanking residues and numeric modification masses
    pub peptide: String,
    pub protein: String,
    pub de_novo_score: i32,
    pub msgf_score: i32,
    /// Primary score, smaller is better
    pub spec_evalue: f64,
    /// Secondary score, smaller is better
    pub evalue: f64,
    /// QValue (or FDR, or EFDR)
    pub q_value: f64,
    pub pep_q_value: f64,
    pub ims_scan: String,
    pub ims_drift_time: String,
    /// Dense rank of `spec_evalue` among all results for this scan
    pub rank: u32,
}

/// A search result whose peptide has been annotated
#[derive(Clone, Debug, PartialEq)]
pub struct Psm {
    pub result_id: usize,
    pub raw: RawSearchResult,
    pub peptide: AnnotatedPeptide,
    /// Calculated singly-protonated mass
    pub mh: f64,
    /// Observed precursor MH minus calculated MH
    pub delta_mass: f64,
    pub delta_mass_ppm: f64,
    /// Number of tryptic termini
    pub ntt: u8,
}

impl Psm {
    pub fn spec_evalue(&self) -> f64 {
        self.raw.spec_evalue
    }
}
