//! Merge job configuration: a fluent builder and the JSON job file format.

use crate::error::JobError;
use docunion_pdf_composer::{MergeOptions, MergeReport, PagePlacement, append_document};
use log::info;
use lopdf::Document;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The on-disk job description. Every field is optional so a file can hold
/// just the shared settings and leave the paths to the command line.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
struct JobFile {
    target: Option<PathBuf>,
    sources: Vec<PathBuf>,
    output: Option<PathBuf>,
    placement: Option<PagePlacement>,
    options: Option<MergeOptions>,
}

/// A builder for creating a [`MergeJob`].
#[derive(Debug, Default)]
pub struct MergeJobBuilder {
    target: Option<PathBuf>,
    sources: Vec<PathBuf>,
    output: Option<PathBuf>,
    options: MergeOptions,
    placement: PagePlacement,
}

impl MergeJobBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Loads settings from a JSON job file.
    ///
    /// Relative paths in the file are resolved against the file's directory.
    /// Settings present in the file replace what the builder holds so far;
    /// builder calls made afterwards override the file.
    pub fn with_config_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, JobError> {
        let path_ref = path.as_ref();
        let base = path_ref.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let text = fs::read_to_string(path_ref).map_err(|e| {
            JobError::Io(io::Error::new(
                e.kind(),
                format!("Failed to read job file '{}': {}", path_ref.display(), e),
            ))
        })?;
        let file: JobFile = serde_json::from_str(&text)?;

        if let Some(target) = file.target {
            self.target = Some(base.join(target));
        }
        if !file.sources.is_empty() {
            self.sources = file.sources.into_iter().map(|source| base.join(source)).collect();
        }
        if let Some(output) = file.output {
            self.output = Some(base.join(output));
        }
        if let Some(placement) = file.placement {
            self.placement = placement;
        }
        if let Some(options) = file.options {
            self.options = options;
        }
        Ok(self)
    }

    /// The document every source is merged into.
    pub fn with_target<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.target = Some(path.into());
        self
    }

    /// Adds one source document. Sources are merged in the order they are added.
    pub fn with_source<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.sources.push(path.into());
        self
    }

    /// Replaces the source list.
    pub fn with_sources<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn with_options(mut self, options: MergeOptions) -> Self {
        self.options = options;
        self
    }

    /// Merges the tagged-PDF structure trees as well.
    pub fn with_accessibility_tags(mut self, enabled: bool) -> Self {
        self.options.copy_accessibility_tags = enabled;
        self
    }

    pub fn with_placement(mut self, placement: PagePlacement) -> Self {
        self.placement = placement;
        self
    }

    /// Consumes the builder and creates the `MergeJob`.
    pub fn build(self) -> Result<MergeJob, JobError> {
        let target = self.target.ok_or_else(|| {
            JobError::Config("No target document has been configured. Use `with_target`.".to_string())
        })?;
        if self.sources.is_empty() {
            return Err(JobError::Config(
                "No source documents have been configured. Use `with_source` or `with_sources`.".to_string(),
            ));
        }
        let output = self.output.ok_or_else(|| {
            JobError::Config("No output path has been configured. Use `with_output`.".to_string())
        })?;

        Ok(MergeJob {
            target,
            sources: self.sources,
            output,
            options: self.options,
            placement: self.placement,
        })
    }
}

/// A configured merge: one target, its sources in merge order, and an output path.
#[derive(Debug, Clone)]
pub struct MergeJob {
    target: PathBuf,
    sources: Vec<PathBuf>,
    output: PathBuf,
    options: MergeOptions,
    placement: PagePlacement,
}

impl MergeJob {
    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    pub fn placement(&self) -> PagePlacement {
        self.placement
    }

    /// Loads every document, merges the sources into the target in order, and
    /// saves the result. Nothing is written unless every merge succeeds.
    pub fn run(&self) -> Result<Vec<MergeReport>, JobError> {
        info!("[JOB] Loading target {}", self.target.display());
        let mut target = load(&self.target)?;
        let mut sources = Vec::with_capacity(self.sources.len());
        for path in &self.sources {
            info!("[JOB] Loading source {}", path.display());
            sources.push(load(path)?);
        }

        let reports = self.merge_in_memory(&mut target, &sources)?;

        target.save(&self.output)?;
        info!("[JOB] Wrote {}", self.output.display());
        Ok(reports)
    }

    /// Merges already loaded documents with this job's options and placement.
    pub fn merge_in_memory(&self, target: &mut Document, sources: &[Document]) -> Result<Vec<MergeReport>, JobError> {
        let mut reports = Vec::with_capacity(sources.len());
        for (index, source) in sources.iter().enumerate() {
            let report = append_document(target, source, &self.options, self.placement)?;
            info!(
                "[JOB] Source {} merged: {} pages, {} objects adopted.",
                index + 1,
                report.pages.len(),
                report.objects_adopted
            );
            reports.push(report);
        }
        Ok(reports)
    }
}

fn load(path: &Path) -> Result<Document, JobError> {
    Document::load(path).map_err(|e| match e {
        lopdf::Error::IO(io_error) => JobError::Io(io::Error::new(
            io_error.kind(),
            format!("Failed to read '{}': {}", path.display(), io_error),
        )),
        other => JobError::Pdf(other),
    })
}
