//! Map the column headers of MSGFDB and MSGF+ result files, and parse data
//! lines into [`RawSearchResult`]s

use once_cell::sync::Lazy;
use regex::Regex;
use std::{fmt::Display, str::FromStr};

use crate::psm::{ColumnFlags, EngineVariant, RawSearchResult};

static PROTEIN_FLANKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(pre=[^,()]*,post=[^,()]*\)$").expect("valid protein flank regex")
});

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    SpecFile,
    SpecId,
    ScanNum,
    FragMethod,
    Precursor,
    IsotopeError,
    PrecursorError,
    Charge,
    Peptide,
    Protein,
    DeNovoScore,
    MsgfScore,
    SpecEValue,
    EValue,
    QValue,
    PepQValue,
    Efdr,
    ImsScan,
    ImsDriftTime,
}

const COLUMN_COUNT: usize = 19;

const REQUIRED: [Column; 6] = [
    Column::ScanNum,
    Column::Charge,
    Column::Peptide,
    Column::Protein,
    Column::SpecEValue,
    Column::EValue,
];

impl Column {
    /// Recognize a header name, along with the engine it implies, if any
    fn from_header(name: &str) -> Option<(Column, Option<EngineVariant>)> {
        use EngineVariant::*;
        let name = name.trim().trim_start_matches('#');
        let column = match name {
            "SpecFile" => (Column::SpecFile, None),
            "SpecIndex" => (Column::SpecId, Some(Msgfdb)),
            "SpecID" => (Column::SpecId, Some(MsgfPlus)),
            "Scan#" => (Column::ScanNum, Some(Msgfdb)),
            "ScanNum" | "Scan" => (Column::ScanNum, None),
            "FragMethod" => (Column::FragMethod, None),
            "Precursor" | "PrecursorMZ" => (Column::Precursor, None),
            "IsotopeError" => (Column::IsotopeError, None),
            "PMError(Da)" | "PMError(ppm)" => (Column::PrecursorError, Some(Msgfdb)),
            "PrecursorError(ppm)" | "PrecursorError(Da)" => (Column::PrecursorError, None),
            "Charge" => (Column::Charge, None),
            "Peptide" => (Column::Peptide, None),
            "Protein" => (Column::Protein, None),
            "DeNovoScore" => (Column::DeNovoScore, None),
            "MSGFScore" => (Column::MsgfScore, None),
            "SpecProb" => (Column::SpecEValue, Some(Msgfdb)),
            "SpecEValue" => (Column::SpecEValue, Some(MsgfPlus)),
            "P-value" | "PValue" => (Column::EValue, Some(Msgfdb)),
            "EValue" => (Column::EValue, Some(MsgfPlus)),
            "FDR" | "QValue" => (Column::QValue, None),
            "PepFDR" | "PepQValue" => (Column::PepQValue, None),
            "EFDR" => (Column::Efdr, None),
            "IMS_Scan" | "IMSScan" => (Column::ImsScan, None),
            "IMS_Drift_Time" | "IMSDriftTime" => (Column::ImsDriftTime, None),
            _ => return None,
        };
        Some(column)
    }

    pub fn name(self) -> &'static str {
        match self {
            Column::SpecFile => "SpecFile",
            Column::SpecId => "SpecID",
            Column::ScanNum => "ScanNum",
            Column::FragMethod => "FragMethod",
            Column::Precursor => "Precursor",
            Column::IsotopeError => "IsotopeError",
            Column::PrecursorError => "PrecursorError",
            Column::Charge => "Charge",
            Column::Peptide => "Peptide",
            Column::Protein => "Protein",
            Column::DeNovoScore => "DeNovoScore",
            Column::MsgfScore => "MSGFScore",
            Column::SpecEValue => "SpecEValue",
            Column::EValue => "EValue",
            Column::QValue => "QValue",
            Column::PepQValue => "PepQValue",
            Column::Efdr => "EFDR",
            Column::ImsScan => "IMS_Scan",
            Column::ImsDriftTime => "IMS_Drift_Time",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordError {
    MissingColumn(&'static str),
    WrongColumnCount { expected: usize, found: usize },
    InvalidField { column: &'static str, value: String },
}

impl Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::MissingColumn(c) => write!(f, "required column `{}` not found", c),
            RecordError::WrongColumnCount { expected, found } => write!(
                f,
                "expected at least {} columns, found {}",
                expected, found
            ),
            RecordError::InvalidField { column, value } => {
                write!(f, "invalid value for {}: `{}`", column, value)
            }
        }
    }
}

impl std::error::Error for RecordError {}

/// Positions of known columns in one input file
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnMap {
    positions: [Option<usize>; COLUMN_COUNT],
    width: usize,
    flags: ColumnFlags,
}

impl ColumnMap {
    /// Build the column map from a header line. `variant` overrides the engine
    /// family implied by the header names.
    pub fn from_headers<I, S>(headers: I, variant: Option<EngineVariant>) -> Result<Self, RecordError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut positions = [None; COLUMN_COUNT];
        let mut detected = None;
        let mut width = 0;

        for (ix, header) in headers.into_iter().enumerate() {
            match Column::from_header(header.as_ref()) {
                Some((column, implied)) => {
                    if positions[column as usize].is_none() {
                        positions[column as usize] = Some(ix);
                        width = width.max(ix + 1);
                    }
                    if detected.is_none() {
                        detected = implied;
                    }
                }
                None => log::trace!("ignoring column `{}`", header.as_ref()),
            }
        }

        for column in REQUIRED {
            if positions[column as usize].is_none() {
                return Err(RecordError::MissingColumn(column.name()));
            }
        }

        let has = |c: Column| positions[c as usize].is_some();
        let flags = ColumnFlags {
            variant: variant.or(detected).unwrap_or(EngineVariant::MsgfPlus),
            has_q_value: has(Column::QValue),
            has_pep_q_value: has(Column::PepQValue),
            has_efdr: has(Column::Efdr) && !has(Column::QValue),
            has_isotope_error: has(Column::IsotopeError),
            has_ims: has(Column::ImsScan) || has(Column::ImsDriftTime),
        };

        Ok(ColumnMap {
            positions,
            width,
            flags,
        })
    }

    pub fn flags(&self) -> ColumnFlags {
        self.flags
    }

    fn field<'a>(&self, fields: &[&'a str], column: Column) -> Option<&'a str> {
        self.positions[column as usize]
            .and_then(|ix| fields.get(ix))
            .map(|s| s.trim())
    }

    fn parse_field<T: FromStr>(
        &self,
        fields: &[&str],
        column: Column,
    ) -> Result<Option<T>, RecordError> {
        match self.field(fields, column) {
            None | Some("") => Ok(None),
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .map_err(|_| RecordError::InvalidField {
                    column: column.name(),
                    value: value.into(),
                }),
        }
    }

    fn required<T: FromStr>(&self, fields: &[&str], column: Column) -> Result<T, RecordError> {
        self.parse_field(fields, column)?
            .ok_or(RecordError::InvalidField {
                column: column.name(),
                value: String::new(),
            })
    }

    /// Parse one data line. A line listing several proteins yields one
    /// result per protein.
    pub fn parse(&self, fields: &[&str]) -> Result<Vec<RawSearchResult>, RecordError> {
        if fields.len() < self.width {
            return Err(RecordError::WrongColumnCount {
                expected: self.width,
                found: fields.len(),
            });
        }

        let spec_id = self.field(fields, Column::SpecId).unwrap_or_default();
        let mut scan = self
            .field(fields, Column::ScanNum)
            .unwrap_or_default()
            .to_string();

        let mut scans = Vec::new();
        for segment in scan.split('/') {
            let n = segment
                .trim()
                .parse::<i32>()
                .map_err(|_| RecordError::InvalidField {
                    column: Column::ScanNum.name(),
                    value: scan.clone(),
                })?;
            scans.push(n);
        }

        let mut scan_num = scans[0];
        if scan_num < 0 && scans.len() == 1 {
            if let Some(n) = scan_from_spec_id(spec_id) {
                scan_num = n;
                scan = n.to_string();
            }
        }

        let peptide = self.field(fields, Column::Peptide).unwrap_or_default();
        if peptide.is_empty() {
            return Err(RecordError::InvalidField {
                column: Column::Peptide.name(),
                value: String::new(),
            });
        }

        let q_value = match self.flags.has_efdr {
            true => self.parse_field(fields, Column::Efdr)?,
            false => self.parse_field(fields, Column::QValue)?,
        };

        let template = RawSearchResult {
            spec_file: self
                .field(fields, Column::SpecFile)
                .unwrap_or_default()
                .to_string(),
            spec_index: spec_index_from_id(spec_id),
            scan,
            scan_num,
            frag_method: self
                .field(fields, Column::FragMethod)
                .unwrap_or_default()
                .to_string(),
            precursor_mz: self.parse_field(fields, Column::Precursor)?.unwrap_or(0.0),
            precursor_error: self
                .parse_field(fields, Column::PrecursorError)?
                .unwrap_or(0.0),
            isotope_error: self.parse_field(fields, Column::IsotopeError)?.unwrap_or(0),
            charge: self.required(fields, Column::Charge)?,
            peptide: peptide.to_string(),
            protein: String::new(),
            de_novo_score: self.parse_field(fields, Column::DeNovoScore)?.unwrap_or(0),
            msgf_score: self.parse_field(fields, Column::MsgfScore)?.unwrap_or(0),
            spec_evalue: self.required(fields, Column::SpecEValue)?,
            evalue: self.required(fields, Column::EValue)?,
            q_value: q_value.unwrap_or(0.0),
            pep_q_value: self.parse_field(fields, Column::PepQValue)?.unwrap_or(0.0),
            ims_scan: self
                .field(fields, Column::ImsScan)
                .unwrap_or_default()
                .to_string(),
            ims_drift_time: self
                .field(fields, Column::ImsDriftTime)
                .unwrap_or_default()
                .to_string(),
            rank: 0,
        };

        let proteins = split_proteins(self.field(fields, Column::Protein).unwrap_or_default());
        if proteins.is_empty() {
            return Err(RecordError::InvalidField {
                column: Column::Protein.name(),
                value: String::new(),
            });
        }

        Ok(proteins
            .into_iter()
            .map(|protein| RawSearchResult {
                protein,
                ..template.clone()
            })
            .collect())
    }
}

/// Split a `;`-separated protein list, removing `(pre=K,post=R)` annotations
pub fn split_proteins(s: &str) -> Vec<String> {
    s.split(';')
        .map(|p| PROTEIN_FLANKS.replace(p.trim(), "").trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn number_after(s: &str, key: &str) -> Option<i32> {
    let start = s.find(key)? + key.len();
    let digits = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>();
    digits.parse().ok()
}

/// Recover a scan number from a native spectrum ID such as
/// `controllerType=0 controllerNumber=1 scan=1234`
pub fn scan_from_spec_id(spec_id: &str) -> Option<i32> {
    number_after(spec_id, "scan=")
}

/// Spectrum index from a native ID (`index=12`), or the ID itself
pub fn spec_index_from_id(spec_id: &str) -> String {
    match number_after(spec_id, "index=") {
        Some(n) => n.to_string(),
        None => spec_id.to_string(),
    }
}
