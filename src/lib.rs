//! Object-level PDF merging.
//!
//! The merge engine lives in `docunion-pdf-composer`; this crate wraps it in a
//! file-based job with a JSON configuration format and a command-line front
//! end.
//!
//! # Example
//!
//! ```ignore
//! use docunion::{MergeJobBuilder, PagePlacement};
//!
//! let job = MergeJobBuilder::new()
//!     .with_target("report.pdf")
//!     .with_source("appendix.pdf")
//!     .with_accessibility_tags(true)
//!     .with_output("merged.pdf")
//!     .build()?;
//!
//! job.run()?;
//! ```

pub mod config;
pub mod error;

pub use config::{MergeJob, MergeJobBuilder};
pub use error::JobError;

pub use docunion_pdf_composer::{
    ComposerError, MergeOptions, MergeReport, ObjectAdopter, PagePlacement, STRUCT_TREE_MERGED,
    StructTreeOutcome, append_document, merge, merge_pages, union_global_objects,
};
