//! Match numeric modification masses embedded in peptide strings against the
//! modification catalog

use once_cell::sync::Lazy;
use regex::Regex;

use crate::modification::{ModClass, ModificationCatalog};

/// Maximum absolute difference between an observed mass token and a catalog mass
pub const MASS_TOLERANCE: f64 = 0.25;

/// Two mass differences closer than this are considered tied
const TIE_EPSILON: f64 = 1e-9;

/// One signed decimal number; a token such as `+79.9663+14.0157` holds several
pub(crate) static SIGNED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[+-]?(?:\d+\.?\d*|\.\d+)").expect("valid number regex"));

/// Position of a mass token within the peptide, which decides the
/// modification classes that are eligible to explain it
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenContext {
    /// Token precedes the first residue. It may also be C-terminal when the
    /// peptide is a single residue.
    NTerminalCandidate { possible_c_terminal: bool },
    /// Token follows a residue that is not the last one
    InternalResidue,
    /// Token follows the last residue
    CTerminalCandidate,
}

impl TokenContext {
    pub fn new(n_terminal: bool, possible_c_terminal: bool) -> Self {
        match (n_terminal, possible_c_terminal) {
            (true, possible_c_terminal) => TokenContext::NTerminalCandidate {
                possible_c_terminal,
            },
            (false, false) => TokenContext::InternalResidue,
            (false, true) => TokenContext::CTerminalCandidate,
        }
    }

    /// The single relaxation attempted when nothing matched in `self`
    ///
    /// An N-terminal mass may really be a plain dynamic modification on the
    /// first residue, and an internal mass may be a C-terminal modification
    /// the engine placed one residue early. Relaxing an N-terminal context
    /// keeps its C-terminal flag.
    pub fn relaxed(self) -> Option<Self> {
        match self {
            TokenContext::NTerminalCandidate {
                possible_c_terminal,
            } => Some(TokenContext::new(false, possible_c_terminal)),
            TokenContext::InternalResidue => Some(TokenContext::CTerminalCandidate),
            TokenContext::CTerminalCandidate => None,
        }
    }

    pub fn is_eligible(self, class: ModClass) -> bool {
        if class == ModClass::CustomAminoAcid {
            return false;
        }
        match self {
            TokenContext::NTerminalCandidate { .. } => class.is_n_terminal(),
            TokenContext::InternalResidue => !class.is_c_terminal(),
            TokenContext::CTerminalCandidate => true,
        }
    }
}

/// Outcome of resolving one signed number
#[derive(Clone, Debug, PartialEq)]
pub enum MassMatch {
    Resolved {
        /// Index into the catalog
        index: usize,
        symbol: char,
        mass: f64,
        is_static: bool,
    },
    Unresolved {
        /// The numeric text exactly as it appeared in the peptide
        text: String,
        mass: f64,
    },
}

/// Resolution of a whole mass token, one entry per signed number
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenResolution {
    pub matches: Vec<MassMatch>,
}

impl TokenResolution {
    /// Symbols to splice into the peptide. Static matches contribute mass but
    /// no symbol; unresolved numbers are kept verbatim.
    pub fn symbols(&self) -> String {
        let mut s = String::new();
        for m in &self.matches {
            match m {
                MassMatch::Resolved {
                    is_static: false,
                    symbol,
                    ..
                } => s.push(*symbol),
                MassMatch::Resolved { .. } => {}
                MassMatch::Unresolved { text, .. } => s.push_str(text),
            }
        }
        s
    }

    pub fn mass_found(&self) -> f64 {
        self.matches
            .iter()
            .map(|m| match m {
                MassMatch::Resolved { mass, .. } => *mass,
                MassMatch::Unresolved { .. } => 0.0,
            })
            .sum()
    }

    pub fn is_static_match(&self) -> bool {
        self.matches
            .iter()
            .any(|m| matches!(m, MassMatch::Resolved { is_static: true, .. }))
    }

    pub fn is_resolved(&self) -> bool {
        self.matches
            .iter()
            .all(|m| matches!(m, MassMatch::Resolved { .. }))
    }

    pub fn unresolved(&self) -> impl Iterator<Item = f64> + '_ {
        self.matches.iter().filter_map(|m| match m {
            MassMatch::Unresolved { mass, .. } => Some(*mass),
            MassMatch::Resolved { .. } => None,
        })
    }
}

/// Single pass over the catalog in `context`: the closest eligible entry
/// within tolerance, or `None`
///
/// Ties keep the entry seen first, except that a dynamic modification
/// replaces a static placeholder when only the dynamic one targets `residue`.
pub fn best_candidate(
    residue: char,
    mass: f64,
    context: TokenContext,
    catalog: &ModificationCatalog,
) -> Option<usize> {
    let entries = catalog.entries();
    let mut best: Option<(usize, f64)> = None;

    for (ix, entry) in entries.iter().enumerate() {
        if !context.is_eligible(entry.mod_class) {
            continue;
        }
        let delta = (entry.mass - mass).abs();
        if delta > MASS_TOLERANCE {
            continue;
        }

        best = match best {
            None => Some((ix, delta)),
            Some((_, held_delta)) if delta < held_delta - TIE_EPSILON => Some((ix, delta)),
            Some((held_ix, held_delta)) if (delta - held_delta).abs() <= TIE_EPSILON => {
                let held = &entries[held_ix];
                if held.is_placeholder()
                    && !entry.is_placeholder()
                    && !held.targets(residue)
                    && entry.targets(residue)
                {
                    Some((ix, delta))
                } else {
                    Some((held_ix, held_delta))
                }
            }
            held => held,
        };
    }

    best.map(|(ix, _)| ix)
}

/// Resolve one signed number, relaxing the context once if nothing matched
pub fn find_match(
    residue: char,
    mass: f64,
    context: TokenContext,
    catalog: &ModificationCatalog,
) -> Option<usize> {
    best_candidate(residue, mass, context, catalog).or_else(|| {
        context
            .relaxed()
            .and_then(|relaxed| best_candidate(residue, mass, relaxed, catalog))
    })
}

/// Resolve one signed number as it appears in the peptide. Text that does
/// not parse as a number is kept as unresolved.
fn resolve_number(
    residue: char,
    text: &str,
    context: TokenContext,
    catalog: &ModificationCatalog,
) -> MassMatch {
    let mass = match text.parse::<f64>() {
        Ok(mass) => mass,
        Err(_) => {
            return MassMatch::Unresolved {
                text: text.into(),
                mass: f64::NAN,
            }
        }
    };
    match find_match(residue, mass, context, catalog) {
        Some(index) => {
            let entry = &catalog.entries()[index];
            MassMatch::Resolved {
                index,
                symbol: entry.symbol,
                mass: entry.mass,
                is_static: entry.mod_class.is_static(),
            }
        }
        None => MassMatch::Unresolved {
            text: text.into(),
            mass,
        },
    }
}

/// Resolve every signed number in `token` independently
pub fn resolve_token(
    residue: char,
    token: &str,
    context: TokenContext,
    catalog: &ModificationCatalog,
) -> TokenResolution {
    let matches = SIGNED_NUMBER
        .find_iter(token)
        .map(|number| resolve_number(residue, number.as_str(), context, catalog))
        .collect();

    TokenResolution { matches }
}

/// Resolve a token using boolean positional flags
pub fn resolve(
    residue: char,
    token: &str,
    is_n_terminal: bool,
    is_possible_c_terminal: bool,
    catalog: &ModificationCatalog,
) -> TokenResolution {
    resolve_token(
        residue,
        token,
        TokenContext::new(is_n_terminal, is_possible_c_terminal),
        catalog,
    )
}
