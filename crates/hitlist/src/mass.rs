use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::modification::ModificationCatalog;
use crate::peptide::AnnotatedPeptide;

pub const H2O: f64 = 18.0105646837;
pub const PROTON: f64 = 1.00727649;
/// Mass difference between C13 and C12
pub const C13_SPACING: f64 = 1.00335483;

pub const VALID_AA: [u8; 22] = [
    b'A', b'C', b'D', b'E', b'F', b'G', b'H', b'I', b'K', b'L', b'M', b'N', b'P', b'Q', b'R', b'S',
    b'T', b'V', b'W', b'Y', b'U', b'O',
];

/// Monoisotopic residue mass of one of the standard amino acids
pub fn residue_mass(residue: u8) -> Option<f64> {
    let mass = match residue {
        b'A' => 71.0371137878,
        b'R' => 156.1011110281,
        b'N' => 114.0429274472,
        b'D' => 115.0269430320,
        b'C' => 103.0091844778,
        b'E' => 129.0425930962,
        b'Q' => 128.0585775114,
        b'G' => 57.0214637236,
        b'H' => 137.0589118624,
        b'I' => 113.0840639804,
        b'L' => 113.0840639804,
        b'K' => 128.0949630177,
        b'M' => 131.0404846062,
        b'F' => 147.0684139162,
        b'P' => 97.0527638520,
        b'S' => 87.0320284099,
        b'T' => 101.0476784741,
        b'W' => 186.0793129535,
        b'Y' => 163.0633285383,
        b'V' => 99.0684139162,
        b'U' => 150.9536355878,
        b'O' => 237.1477268900,
        _ => return None,
    };
    Some(mass)
}

fn element_mass(symbol: &str) -> Option<f64> {
    let mass = match symbol {
        "H" => 1.0078250321,
        "C" => 12.0,
        "N" => 14.0030740052,
        "O" => 15.9949146221,
        "S" => 31.97207069,
        "P" => 30.97376151,
        "Se" => 79.9165218,
        "Br" => 78.9183376,
        "Cl" => 34.96885271,
        "Fe" => 55.9349421,
        "Na" => 22.98976967,
        "K" => 38.9637069,
        "I" => 126.904468,
        _ => return None,
    };
    Some(mass)
}

static ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z][a-z]?)(-?\d*)").expect("valid element regex"));

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InvalidComposition {
    Empty,
    UnknownElement(String),
    Unparsed(String),
}

impl std::fmt::Display for InvalidComposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidComposition::Empty => f.write_str("empty elemental composition"),
            InvalidComposition::UnknownElement(e) => write!(f, "unknown element `{}`", e),
            InvalidComposition::Unparsed(s) => write!(f, "could not parse composition `{}`", s),
        }
    }
}

/// An elemental composition, e.g. `C2H3N1O1` or `H-1N-1O1`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Composition {
    pub elements: Vec<(String, i32)>,
}

impl Composition {
    pub fn parse(s: &str) -> Result<Self, InvalidComposition> {
        let s = s.trim();
        if s.is_empty() {
            return Err(InvalidComposition::Empty);
        }

        let mut elements = Vec::new();
        let mut consumed = 0;
        for cap in ELEMENT.captures_iter(s) {
            let whole = cap.get(0).expect("capture group 0 always exists");
            if whole.start() != consumed {
                return Err(InvalidComposition::Unparsed(s.into()));
            }
            consumed = whole.end();

            let symbol = &cap[1];
            if element_mass(symbol).is_none() {
                return Err(InvalidComposition::UnknownElement(symbol.into()));
            }
            let count = match &cap[2] {
                "" => 1,
                n => n
                    .parse::<i32>()
                    .map_err(|_| InvalidComposition::Unparsed(s.into()))?,
            };
            elements.push((symbol.to_string(), count));
        }

        if consumed != s.len() {
            return Err(InvalidComposition::Unparsed(s.into()));
        }
        Ok(Composition { elements })
    }

    pub fn monoisotopic(&self) -> f64 {
        self.elements
            .iter()
            .filter_map(|(symbol, count)| element_mass(symbol).map(|m| m * *count as f64))
            .sum()
    }
}

impl std::fmt::Display for Composition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (symbol, count) in &self.elements {
            f.write_str(symbol)?;
            write!(f, "{}", count)?;
        }
        Ok(())
    }
}

/// Computes peptide masses from annotated sequences. Custom amino acids are
/// looked up in the modification catalog.
pub struct MassCalculator<'a> {
    catalog: &'a ModificationCatalog,
}

impl<'a> MassCalculator<'a> {
    pub fn new(catalog: &'a ModificationCatalog) -> Self {
        Self { catalog }
    }

    fn mass_of(&self, residue: u8) -> Option<f64> {
        self.catalog
            .custom_amino_acid(residue as char)
            .map(|entry| entry.mass)
            .or_else(|| residue_mass(residue))
    }

    /// Monoisotopic mass of the peptide, including all applied modifications.
    /// Returns the mass and the number of residues that had no known mass.
    pub fn monoisotopic(&self, peptide: &AnnotatedPeptide) -> (f64, usize) {
        let mut unknown = 0;
        let mut mass = H2O + peptide.total_mod_mass;
        for residue in peptide.clean_sequence().bytes() {
            match self.mass_of(residue) {
                Some(m) => mass += m,
                None => unknown += 1,
            }
        }
        (mass, unknown)
    }

    /// Singly-protonated peptide mass
    pub fn mh(&self, peptide: &AnnotatedPeptide) -> (f64, usize) {
        let (mass, unknown) = self.monoisotopic(peptide);
        (mass + PROTON, unknown)
    }
}

/// Convert an observed precursor m/z into a singly-protonated mass
pub fn precursor_mh(precursor_mz: f64, charge: i16) -> f64 {
    let charge = charge.max(1) as f64;
    (precursor_mz - PROTON) * charge + PROTON
}

/// Mass error in ppm after removing the isotope offset chosen by the engine
pub fn delta_mass_ppm(delta_mass: f64, isotope_error: i32, theoretical_mh: f64) -> f64 {
    if theoretical_mh <= 0.0 {
        return 0.0;
    }
    let corrected = delta_mass - isotope_error as f64 * C13_SPACING;
    corrected / theoretical_mh * 1_000_000.0
}
