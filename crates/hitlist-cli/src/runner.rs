use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::Context;
use hitlist_core::columns::ColumnMap;
use hitlist_core::modification::ModificationCatalog;
use hitlist_core::pipeline::{FileProcessor, ProcessedFile};
use hitlist_core::protein::ProteinOrder;
use log::info;
use rayon::prelude::*;

use super::input::Search;

pub struct Runner {
    pub parameters: Search,
    catalog: ModificationCatalog,
    proteins: ProteinOrder,
    start: Instant,
}

/// Output file prefix for an input path: the file name without extension
pub fn base_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

impl Runner {
    pub fn new(parameters: Search) -> anyhow::Result<Self> {
        let start = Instant::now();

        let catalog = hitlist_core::read_catalog(&parameters.mod_definitions).with_context(|| {
            format!(
                "Failed to load modification definitions from `{}`",
                parameters.mod_definitions
            )
        })?;
        info!("loaded {} modification definitions", catalog.len());

        let proteins = match &parameters.fasta {
            Some(path) => {
                let fasta = hitlist_core::read_fasta(path)
                    .with_context(|| format!("Failed to read FASTA from `{}`", path))?;
                info!("read {} proteins from {}", fasta.len(), path);
                ProteinOrder::from(&fasta)
            }
            None => {
                log::warn!("no FASTA file given: first-hits proteins are reported as listed");
                ProteinOrder::default()
            }
        };

        Ok(Self {
            parameters,
            catalog,
            proteins,
            start,
        })
    }

    pub(crate) fn make_path<S: AsRef<str>>(&self, file_name: S) -> PathBuf {
        self.parameters.output_directory.join(file_name.as_ref())
    }

    /// Read and process one result file. Returns `Ok(None)` if `abort` was set
    /// before the file was finished.
    pub fn process_file(&self, path: &str, abort: &AtomicBool) -> anyhow::Result<Option<ProcessedFile>> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read search results from `{}`", path))?;

        let mut lines = contents.lines().enumerate().filter(|(_, line)| !line.trim().is_empty());
        let headers = match lines.next() {
            Some((_, line)) => line.split('\t'),
            None => anyhow::bail!("`{}` is empty", path),
        };
        let columns = ColumnMap::from_headers(headers, self.parameters.engine)
            .with_context(|| format!("Unsupported column layout in `{}`", path))?;
        log::trace!("{}: {:?}", path, columns.flags());

        let processor = FileProcessor::new(
            &self.catalog,
            &self.proteins,
            columns.flags(),
            self.parameters.filter,
        );
        let parsed = lines.map(|(ix, line)| {
            let fields = line.split('\t').collect::<Vec<_>>();
            (ix + 1, columns.parse(&fields))
        });
        Ok(processor.run(parsed, abort))
    }

    fn write_outputs(&self, path: &str, processed: &ProcessedFile) -> anyhow::Result<Vec<String>> {
        let base = base_name(path);
        let mut outputs = Vec::new();

        if self.parameters.write_synopsis {
            outputs.push(self.write_psms(&base, "syn", &processed.synopsis, &processed.flags)?);
        }
        if self.parameters.write_first_hits {
            outputs.push(self.write_psms(&base, "fht", &processed.first_hits, &processed.flags)?);
        }
        if !processed.scan_groups.is_empty() {
            outputs.push(self.write_scan_groups(&base, &processed.scan_groups)?);
        }
        if self.parameters.write_mod_summary {
            outputs.push(self.write_mod_summary(&base, &processed.mod_summary)?);
        }
        Ok(outputs)
    }

    fn convert_file(&self, path: &str, abort: &AtomicBool) -> anyhow::Result<Vec<String>> {
        let file_start = Instant::now();
        let processed = match self.process_file(path, abort)? {
            Some(processed) => processed,
            None => {
                log::trace!("{}: aborted", path);
                return Ok(Vec::new());
            }
        };

        if let Some(summary) = processed.errors.summary() {
            log::warn!("{}:\n{}", path, summary.trim_end());
        }
        info!(
            "{}: {} results pass the filter, {} first hits in {:#?}",
            path,
            processed.synopsis.len(),
            processed.first_hits.len(),
            file_start.elapsed()
        );

        self.write_outputs(path, &processed)
    }

    pub fn run(mut self, parallel: usize) -> anyhow::Result<Search> {
        let abort = AtomicBool::new(false);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallel.max(1))
            .build()?;

        let results = pool.install(|| {
            self.parameters
                .input_paths
                .par_iter()
                .map(|path| {
                    let result = self.convert_file(path, &abort);
                    if result.is_err() {
                        abort.store(true, Ordering::Relaxed);
                    }
                    result
                })
                .collect::<Vec<_>>()
        });

        for outputs in results {
            self.parameters.output_paths.extend(outputs?);
        }

        let path = self.make_path("results.json");
        self.parameters.output_paths.push(path.display().to_string());
        println!("{}", serde_json::to_string_pretty(&self.parameters)?);

        let bytes = serde_json::to_vec_pretty(&self.parameters)?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write `{}`", path.display()))?;

        info!("finished in {}s", self.start.elapsed().as_secs());
        Ok(self.parameters)
    }
}
