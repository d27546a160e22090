#![allow(dead_code)]

pub mod fixtures;
pub mod pdf_assertions;

use std::path::Path;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Write a document to `path`, as a job input.
pub fn save(doc: &mut lopdf::Document, path: &Path) -> std::io::Result<()> {
    doc.save(path).map(|_| ())
}
