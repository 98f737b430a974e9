use anyhow::{Context, Result, anyhow};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::app_config::Config;
use crate::errors::{AppError, PipelineResult};
use crate::file_utils::FileManager;
use crate::srx::{SrxStore, default_rules};
use crate::translation::{Extractor, MemoryCatalog, Segmenter, Translator, Unit};
use crate::xml::event::coalesce_text;
use crate::xml::namespaces::{self, NamespaceRegistry};
use crate::xml::parser::EventReader;
use crate::xml::serializer::{declared_encoding, serialize};

// @module: Application controller for document extraction and translation

/// An input that could not be processed
#[derive(Debug, Clone)]
pub struct FileFailure {
    // @field: Input file
    pub path: PathBuf,
    // @field: What went wrong
    pub error: AppError,
}

/// Outcome of an extraction run
#[derive(Debug, Default)]
pub struct ExtractionReport {
    // @field: Units of every successful input, in input order
    pub catalog: MemoryCatalog,
    // @field: Number of inputs extracted
    pub processed: usize,
    pub failures: Vec<FileFailure>,
}

/// A translated document ready to be written
#[derive(Debug, Clone)]
pub struct TranslatedDocument {
    pub input: PathBuf,
    pub content: String,
    // @field: Encoding named in the XML declaration
    pub encoding: Option<String>,
}

/// Outcome of a translation run
#[derive(Debug, Default)]
pub struct TranslationReport {
    pub documents: Vec<TranslatedDocument>,
    pub failures: Vec<FileFailure>,
}

impl ExtractionReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

impl TranslationReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Main application controller for document extraction and translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Installed namespace registry
    registry: Arc<NamespaceRegistry>,
    // @field: Segmenter for the configured language
    segmenter: Segmenter,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;

        let mut registry = NamespaceRegistry::with_builtins();
        match &config.bare_namespace {
            Some(uri) => registry
                .register_alias(None, uri)
                .with_context(|| format!("Cannot use '{}' as the bare namespace", uri))?,
            None => registry.clear_bare_namespace(),
        }
        let registry = namespaces::install(registry);

        let store = match &config.srx_file {
            Some(path) => Arc::new(
                SrxStore::load(path)
                    .with_context(|| format!("Failed to load SRX file: {:?}", path))?,
            ),
            None => default_rules().context("Failed to load the built-in SRX rules")?,
        };
        let segmenter = Segmenter::for_language(&store, &config.language)
            .with_context(|| format!("No usable segmentation rules for '{}'", config.language))?;

        Ok(Self {
            config,
            registry,
            segmenter,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Extract the units of every input into one catalog
    pub async fn extract(&self, inputs: &[PathBuf]) -> Result<ExtractionReport> {
        let start_time = Instant::now();
        let files = FileManager::collect_inputs(inputs, &self.config.extensions)?;
        if files.is_empty() {
            return Err(anyhow!("No input documents found"));
        }

        let registry = Arc::clone(&self.registry);
        let segmenter = self.segmenter.clone();
        let results = self
            .process_files(&files, move |path| {
                extract_file(path, Arc::clone(&registry), segmenter.clone())
            })
            .await;

        let mut report = ExtractionReport::default();
        for (path, result) in results {
            match result {
                Ok(units) => {
                    info!("Extracted {} units from {}", units.len(), path.display());
                    report.catalog.add_units(&units);
                    report.processed += 1;
                }
                Err(e) => report.failures.push(Self::failure(path, e)),
            }
        }

        info!(
            "Extraction complete: {} messages from {} files in {}",
            report.catalog.len(),
            report.processed,
            Self::format_duration(start_time.elapsed())
        );
        Ok(report)
    }

    /// Translate every input with `catalog`
    pub async fn translate(
        &self,
        inputs: &[PathBuf],
        catalog: Arc<MemoryCatalog>,
    ) -> Result<TranslationReport> {
        let start_time = Instant::now();
        let files = FileManager::collect_inputs(inputs, &self.config.extensions)?;
        if files.is_empty() {
            return Err(anyhow!("No input documents found"));
        }

        let registry = Arc::clone(&self.registry);
        let segmenter = self.segmenter.clone();
        let results = self
            .process_files(&files, move |path| {
                translate_file(path, Arc::clone(&registry), segmenter.clone(), &catalog)
            })
            .await;

        let mut report = TranslationReport::default();
        for (path, result) in results {
            match result {
                Ok(document) => report.documents.push(document),
                Err(e) => report.failures.push(Self::failure(path, e)),
            }
        }

        info!(
            "Translation complete: {} files in {}",
            report.documents.len(),
            Self::format_duration(start_time.elapsed())
        );
        Ok(report)
    }

    /// Write translated documents: into `output` as a directory, or as the file itself for one document
    pub fn write_documents(
        &self,
        documents: &[TranslatedDocument],
        output: &Path,
    ) -> Result<Vec<PathBuf>> {
        let single_file = documents.len() == 1 && !FileManager::dir_exists(output);
        let mut written = Vec::with_capacity(documents.len());

        for document in documents {
            let path = if single_file {
                output.to_path_buf()
            } else {
                FileManager::generate_output_path(&document.input, output)
            };
            FileManager::write_document(&path, &document.content, document.encoding.as_deref())?;
            info!("Success: {}", path.display());
            written.push(path);
        }
        Ok(written)
    }

    /// Run `task` over every file on blocking threads, at most `max_concurrent_files` at a time
    async fn process_files<T, F>(&self, files: &[PathBuf], task: F) -> Vec<(PathBuf, Result<T>)>
    where
        F: Fn(&Path) -> Result<T> + Clone + Send + 'static,
        T: Send + 'static,
    {
        let max_concurrent = self.config.max_concurrent_files;
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let progress_bar = Self::progress_bar(files.len());

        let results = stream::iter(files.iter().cloned())
            .map(|path| {
                let semaphore = Arc::clone(&semaphore);
                let task = task.clone();
                let progress_bar = progress_bar.clone();

                async move {
                    let input = path.clone();
                    let result = async move {
                        let _permit = semaphore
                            .acquire_owned()
                            .await
                            .context("File semaphore closed")?;
                        tokio::task::spawn_blocking(move || task(&input))
                            .await
                            .context("File task panicked")?
                    }
                    .await;

                    progress_bar.inc(1);
                    (path, result)
                }
            })
            .buffered(max_concurrent)
            .collect::<Vec<_>>()
            .await;

        progress_bar.finish_and_clear();
        results
    }

    fn progress_bar(files: usize) -> ProgressBar {
        if files <= 1 {
            return ProgressBar::hidden();
        }
        let progress_bar = ProgressBar::new(files as u64);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar
    }

    fn failure(path: PathBuf, e: anyhow::Error) -> FileFailure {
        error!("Error processing file {}: {:#}", path.display(), e);
        FileFailure {
            path,
            error: AppError::from(e),
        }
    }

    // Format duration in a human-readable format
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;

        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

fn extract_file(
    path: &Path,
    registry: Arc<NamespaceRegistry>,
    segmenter: Segmenter,
) -> Result<Vec<Unit>> {
    let source = FileManager::read_document(path)?;
    let filename = path.to_string_lossy();
    Extractor::new(EventReader::new(&source), registry, segmenter)
        .with_filename(&filename)
        .collect::<PipelineResult<Vec<_>>>()
        .with_context(|| format!("Failed to extract {}", path.display()))
}

fn translate_file(
    path: &Path,
    registry: Arc<NamespaceRegistry>,
    segmenter: Segmenter,
    catalog: &MemoryCatalog,
) -> Result<TranslatedDocument> {
    let source = FileManager::read_document(path)?;
    let events = Translator::new(
        EventReader::new(&source),
        Arc::clone(&registry),
        segmenter,
        catalog,
    )
    .collect::<PipelineResult<Vec<_>>>()
    .with_context(|| format!("Failed to translate {}", path.display()))?;
    let events = coalesce_text(events);
    let content = serialize(&events, &registry)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(TranslatedDocument {
        input: path.to_path_buf(),
        encoding: declared_encoding(&events).map(str::to_string),
        content,
    })
}
