use std::{fmt::Display, str::FromStr};

use serde::Serialize;

use crate::mass::{Composition, InvalidComposition};

/// Symbol used in the catalog for modifications that never appear in
/// annotated peptides (static and fixed terminal modifications)
pub const STATIC_SYMBOL: char = '-';

/// Symbols handed out to dynamic modifications, in declaration order
pub const DYNAMIC_SYMBOLS: &str = "*#@$&!%~^+=";

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ModClass {
    StaticResidue,
    StaticNTermPeptide,
    StaticNTermProtein,
    StaticCTermPeptide,
    StaticCTermProtein,
    DynamicResidue,
    DynNTermPeptide,
    DynNTermProtein,
    DynCTermPeptide,
    DynCTermProtein,
    CustomAminoAcid,
}

impl ModClass {
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            ModClass::StaticResidue
                | ModClass::StaticNTermPeptide
                | ModClass::StaticNTermProtein
                | ModClass::StaticCTermPeptide
                | ModClass::StaticCTermProtein
        )
    }

    pub fn is_n_terminal(&self) -> bool {
        matches!(
            self,
            ModClass::StaticNTermPeptide
                | ModClass::StaticNTermProtein
                | ModClass::DynNTermPeptide
                | ModClass::DynNTermProtein
        )
    }

    pub fn is_c_terminal(&self) -> bool {
        matches!(
            self,
            ModClass::StaticCTermPeptide
                | ModClass::StaticCTermProtein
                | ModClass::DynCTermPeptide
                | ModClass::DynCTermProtein
        )
    }

    /// Short code written to the modification summary
    pub fn code(&self) -> &'static str {
        match self {
            ModClass::StaticResidue => "S",
            ModClass::StaticNTermPeptide | ModClass::StaticCTermPeptide => "T",
            ModClass::StaticNTermProtein | ModClass::StaticCTermProtein => "P",
            ModClass::DynamicResidue => "D",
            ModClass::DynNTermPeptide | ModClass::DynCTermPeptide => "D",
            ModClass::DynNTermProtein | ModClass::DynCTermProtein => "D",
            ModClass::CustomAminoAcid => "C",
        }
    }
}

/// Where in a peptide a modification definition may be applied
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModPosition {
    Any,
    PeptideN,
    PeptideC,
    ProteinN,
    ProteinC,
}

impl FromStr for ModPosition {
    type Err = InvalidModification;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(ModPosition::Any),
            "n-term" | "nterm" => Ok(ModPosition::PeptideN),
            "c-term" | "cterm" => Ok(ModPosition::PeptideC),
            "prot-n-term" | "protnterm" => Ok(ModPosition::ProteinN),
            "prot-c-term" | "protcterm" => Ok(ModPosition::ProteinC),
            _ => Err(InvalidModification::UnknownPosition(s.trim().into())),
        }
    }
}

impl Display for ModPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ModPosition::Any => "any",
            ModPosition::PeptideN => "N-term",
            ModPosition::PeptideC => "C-term",
            ModPosition::ProteinN => "Prot-N-term",
            ModPosition::ProteinC => "Prot-C-term",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InvalidModification {
    Empty,
    WrongFieldCount(usize),
    InvalidMass(InvalidComposition),
    InvalidResidue(char),
    UnknownType(String),
    UnknownPosition(String),
    SymbolsExhausted,
}

impl Display for InvalidModification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidModification::Empty => f.write_str("empty modification definition"),
            InvalidModification::WrongFieldCount(n) => write!(
                f,
                "expected 5 comma-separated fields (mass,residues,type,position,name), found {}",
                n
            ),
            InvalidModification::InvalidMass(e) => write!(f, "invalid mass: {}", e),
            InvalidModification::InvalidResidue(c) => write!(f, "unrecognized residue ({})", c),
            InvalidModification::UnknownType(s) => {
                write!(f, "unknown modification type `{}` (expected fix, opt or custom)", s)
            }
            InvalidModification::UnknownPosition(s) => {
                write!(f, "unknown modification position `{}`", s)
            }
            InvalidModification::SymbolsExhausted => write!(
                f,
                "more than {} dynamic modifications defined",
                DYNAMIC_SYMBOLS.chars().count()
            ),
        }
    }
}

/// A modification definition that could not be loaded, with the offending line
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogError {
    pub line: usize,
    pub text: String,
    pub kind: InvalidModification,
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {} (`{}`): {}", self.line, self.text, self.kind)
    }
}

impl std::error::Error for CatalogError {}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModificationEntry {
    pub mass: f64,
    pub symbol: char,
    /// Target residues; `*` targets every residue
    pub residues: String,
    pub mod_class: ModClass,
    pub name: String,
    /// Only retained for custom amino acids
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composition: Option<Composition>,
}

impl ModificationEntry {
    pub fn new<S: Into<String>>(mass: f64, symbol: char, residues: S, mod_class: ModClass) -> Self {
        Self {
            mass,
            symbol,
            residues: residues.into(),
            mod_class,
            name: String::new(),
            composition: None,
        }
    }

    pub fn targets(&self, residue: char) -> bool {
        self.residues.contains('*') || self.residues.contains(residue)
    }

    /// True if this entry carries the static placeholder symbol rather than
    /// a symbol that is written into peptides
    pub fn is_placeholder(&self) -> bool {
        self.symbol == STATIC_SYMBOL
    }
}

/// Ordered, read-only list of known modifications
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ModificationCatalog {
    entries: Vec<ModificationEntry>,
}

impl ModificationCatalog {
    pub fn new(entries: Vec<ModificationEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ModificationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn custom_amino_acid(&self, residue: char) -> Option<&ModificationEntry> {
        self.entries
            .iter()
            .find(|e| e.mod_class == ModClass::CustomAminoAcid && e.symbol == residue)
    }

    /// Indices of all static entries of class `class` that apply to `residue`
    pub fn statics_for(&self, class: ModClass, residue: char) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.mod_class == class && e.targets(residue))
            .map(|(ix, _)| ix)
    }

    /// Parse modification definitions from either a full MSGF+ parameter
    /// file (`StaticMod=`, `DynamicMod=`, `CustomAA=` keys) or a bare mods
    /// file with one `mass,residues,type,position,name` per line
    pub fn parse(contents: &str) -> Result<Self, CatalogError> {
        let mut builder = CatalogBuilder::default();

        for (ix, line) in contents.lines().enumerate() {
            let text = match line.split_once('#') {
                Some((before, _)) => before,
                None => line,
            }
            .trim();
            if text.is_empty() {
                continue;
            }

            let definition = match text.split_once('=') {
                Some((key, value)) => {
                    let key = key.trim();
                    if key.eq_ignore_ascii_case("StaticMod")
                        || key.eq_ignore_ascii_case("DynamicMod")
                        || key.eq_ignore_ascii_case("CustomAA")
                    {
                        value.trim()
                    } else {
                        log::trace!("ignoring parameter `{}`", key);
                        continue;
                    }
                }
                None => text,
            };

            if definition.eq_ignore_ascii_case("none") {
                continue;
            }

            builder.push(definition).map_err(|kind| CatalogError {
                line: ix + 1,
                text: line.trim().into(),
                kind,
            })?;
        }

        Ok(builder.build())
    }
}

#[derive(Default)]
struct CatalogBuilder {
    entries: Vec<ModificationEntry>,
    dynamic: usize,
}

impl CatalogBuilder {
    fn next_symbol(&mut self) -> Result<char, InvalidModification> {
        let symbol = DYNAMIC_SYMBOLS
            .chars()
            .nth(self.dynamic)
            .ok_or(InvalidModification::SymbolsExhausted)?;
        self.dynamic += 1;
        Ok(symbol)
    }

    fn push(&mut self, definition: &str) -> Result<(), InvalidModification> {
        let fields = definition.split(',').map(str::trim).collect::<Vec<_>>();
        if fields.len() < 4 || fields.len() > 5 {
            return Err(InvalidModification::WrongFieldCount(fields.len()));
        }
        if fields[0].is_empty() {
            return Err(InvalidModification::Empty);
        }

        let (mass, composition) = match fields[0].parse::<f64>() {
            Ok(mass) => (mass, None),
            Err(_) => {
                let composition =
                    Composition::parse(fields[0]).map_err(InvalidModification::InvalidMass)?;
                (composition.monoisotopic(), Some(composition))
            }
        };

        let residues = fields[1].to_string();
        if residues.is_empty() {
            return Err(InvalidModification::Empty);
        }
        if let Some(c) = residues
            .chars()
            .find(|c| *c != '*' && !c.is_ascii_uppercase())
        {
            return Err(InvalidModification::InvalidResidue(c));
        }

        let name = fields.get(4).copied().unwrap_or_default().to_string();

        let (mod_class, symbol) = match fields[2].to_ascii_lowercase().as_str() {
            "custom" => {
                let mut chars = residues.chars();
                let residue = match (chars.next(), chars.next()) {
                    (Some(r), None) if r != '*' => r,
                    _ => return Err(InvalidModification::InvalidResidue('*')),
                };
                (ModClass::CustomAminoAcid, residue)
            }
            "fix" => {
                let class = match fields[3].parse::<ModPosition>()? {
                    ModPosition::Any => ModClass::StaticResidue,
                    ModPosition::PeptideN => ModClass::StaticNTermPeptide,
                    ModPosition::ProteinN => ModClass::StaticNTermProtein,
                    ModPosition::PeptideC => ModClass::StaticCTermPeptide,
                    ModPosition::ProteinC => ModClass::StaticCTermProtein,
                };
                (class, STATIC_SYMBOL)
            }
            "opt" => {
                let class = match fields[3].parse::<ModPosition>()? {
                    ModPosition::Any => ModClass::DynamicResidue,
                    ModPosition::PeptideN => ModClass::DynNTermPeptide,
                    ModPosition::ProteinN => ModClass::DynNTermProtein,
                    ModPosition::PeptideC => ModClass::DynCTermPeptide,
                    ModPosition::ProteinC => ModClass::DynCTermProtein,
                };
                (class, self.next_symbol()?)
            }
            other => return Err(InvalidModification::UnknownType(other.into())),
        };

        self.entries.push(ModificationEntry {
            mass,
            symbol,
            residues,
            mod_class,
            name,
            composition: match mod_class {
                ModClass::CustomAminoAcid => composition,
                _ => None,
            },
        });
        Ok(())
    }

    fn build(self) -> ModificationCatalog {
        log::trace!("loaded {} modification definitions", self.entries.len());
        ModificationCatalog {
            entries: self.entries,
        }
    }
}
