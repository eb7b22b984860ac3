pub mod columns;
pub mod enzyme;
pub mod errors;
pub mod fasta;
pub mod mass;
pub mod matcher;
pub mod modification;
pub mod peptide;
pub mod pipeline;
pub mod protein;
pub mod psm;
pub mod ranking;
pub mod scan_group;

use std::path::Path;

use modification::{CatalogError, ModificationCatalog};

#[derive(Debug)]
pub enum Error {
    IO(std::io::Error),
    Json(serde_json::Error),
    Catalog(CatalogError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IO(e) => e.fmt(f),
            Self::Json(e) => e.fmt(f),
            Self::Catalog(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IO(e)
    }
}

/// Read modification definitions from an MSGF+ parameter file or mods file
pub fn read_catalog<P: AsRef<Path>>(path: P) -> Result<ModificationCatalog, Error> {
    let contents = std::fs::read_to_string(path)?;
    ModificationCatalog::parse(&contents).map_err(Error::Catalog)
}

pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<fasta::Fasta, Error> {
    let contents = std::fs::read_to_string(path)?;
    Ok(fasta::Fasta::parse(contents))
}

pub fn read_json<P, T>(path: P) -> Result<T, Error>
where
    P: AsRef<Path>,
    T: for<'de> serde::Deserialize<'de>,
{
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(Error::Json)
}
