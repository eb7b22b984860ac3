use std::path::PathBuf;

use anyhow::{ensure, Context};
use clap::ArgMatches;
use hitlist_core::psm::EngineVariant;
use hitlist_core::ranking::FilterSettings;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
/// Actual run parameters - may include overrides or default values not set by user
pub struct Search {
    pub version: String,
    pub mod_definitions: String,
    pub fasta: Option<String>,
    pub engine: Option<EngineVariant>,
    pub filter: FilterSettings,
    pub write_synopsis: bool,
    pub write_first_hits: bool,
    pub write_mod_summary: bool,
    pub input_paths: Vec<String>,
    pub output_paths: Vec<String>,

    #[serde(skip_serializing)]
    pub output_directory: PathBuf,
}

#[derive(Deserialize)]
/// Input parameters deserialized from JSON file
pub struct Input {
    mod_definitions: Option<String>,
    fasta: Option<String>,
    engine: Option<EngineVariant>,
    filter: Option<FilterOptions>,
    write_synopsis: Option<bool>,
    write_first_hits: Option<bool>,
    write_mod_summary: Option<bool>,
    output_directory: Option<String>,
    input_paths: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Default, Debug)]
pub struct FilterOptions {
    evalue_threshold: Option<f64>,
    spec_evalue_threshold: Option<f64>,
    q_value_threshold: Option<f64>,
}

impl From<FilterOptions> for FilterSettings {
    fn from(value: FilterOptions) -> FilterSettings {
        let default = FilterSettings::default();
        let settings = FilterSettings {
            evalue_threshold: value.evalue_threshold.unwrap_or(default.evalue_threshold).abs(),
            spec_evalue_threshold: value
                .spec_evalue_threshold
                .unwrap_or(default.spec_evalue_threshold)
                .abs(),
            q_value_threshold: value
                .q_value_threshold
                .unwrap_or(default.q_value_threshold)
                .abs(),
        };
        if settings.q_value_threshold > 0.1 {
            log::warn!("filter.q_value_threshold is higher than expected");
        }
        if settings.spec_evalue_threshold > 1e-3 {
            log::warn!("filter.spec_evalue_threshold is higher than expected");
        }
        settings
    }
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let path = matches
            .get_one::<String>("parameters")
            .expect("required parameters");
        let mut input = Input::load(path)
            .with_context(|| format!("Failed to read parameters from `{path}`"))?;

        // Handle JSON configuration overrides
        if let Some(output_directory) = matches.get_one::<String>("output_directory") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(output_directory.into());
        }
        if let Some(fasta) = matches.get_one::<String>("fasta") {
            log::trace!("overriding `fasta` parameter.");
            input.fasta = Some(fasta.into());
        }
        if let Some(mods) = matches.get_one::<String>("mods") {
            log::trace!("overriding `mod_definitions` parameter.");
            input.mod_definitions = Some(mods.into());
        }
        if let Some(input_paths) = matches.get_many::<String>("input_paths") {
            log::trace!("overriding `input_paths` parameter.");
            input.input_paths = Some(input_paths.into_iter().map(|p| p.into()).collect());
        }

        input.validate()?;
        Ok(input)
    }

    /// Fail early on parameters that have no default
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.mod_definitions.is_some(),
            "`mod_definitions` must be set. For more information try '--help'"
        );
        ensure!(
            self.input_paths.as_ref().map(|p| !p.is_empty()).unwrap_or(false),
            "`input_paths` must be set. For more information try '--help'"
        );
        Ok(())
    }

    pub fn load<S: AsRef<str>>(path: S) -> anyhow::Result<Self> {
        hitlist_core::read_json(path.as_ref()).map_err(anyhow::Error::from)
    }

    pub fn build(self) -> anyhow::Result<Search> {
        self.validate()?;

        let output_directory = match self.output_directory {
            Some(path) => {
                let path = PathBuf::from(path);
                std::fs::create_dir_all(&path).with_context(|| {
                    format!("Failed to create output directory `{}`", path.display())
                })?;
                path
            }
            None => std::env::current_dir()?,
        };

        Ok(Search {
            version: clap::crate_version!().into(),
            mod_definitions: self.mod_definitions.unwrap_or_default(),
            fasta: self.fasta,
            engine: self.engine,
            filter: self.filter.map(Into::into).unwrap_or_default(),
            write_synopsis: self.write_synopsis.unwrap_or(true),
            write_first_hits: self.write_first_hits.unwrap_or(true),
            write_mod_summary: self.write_mod_summary.unwrap_or(true),
            input_paths: self.input_paths.unwrap_or_default(),
            output_paths: Vec::new(),
            output_directory,
        })
    }
}
