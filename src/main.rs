use clap::Parser;
use docunion::{JobError, MergeJobBuilder, PagePlacement};
use std::env;
use std::path::PathBuf;

/// Merges PDF documents into a target at the object level.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Document the sources are merged into
    target: Option<PathBuf>,

    /// Documents to merge, in order
    sources: Vec<PathBuf>,

    /// Where to write the merged document
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Merge the tagged-PDF structure trees as well
    #[arg(long, default_value_t = false)]
    tags: bool,

    /// Put the source pages before the target's own pages
    #[arg(long, default_value_t = false)]
    prepend: bool,

    /// JSON job file; command-line arguments override its settings
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), JobError> {
    if env::var("RUST_LOG").is_err() {
        unsafe {
            env::set_var("RUST_LOG", "docunion=info,docunion_pdf_composer=info");
        }
    }
    env_logger::init();

    let args = Args::parse();

    let mut builder = MergeJobBuilder::new();
    if let Some(config) = &args.config {
        builder = builder.with_config_file(config)?;
    }
    if let Some(target) = args.target {
        builder = builder.with_target(target);
    }
    if !args.sources.is_empty() {
        builder = builder.with_sources(args.sources);
    }
    if let Some(output) = args.output {
        builder = builder.with_output(output);
    }
    if args.tags {
        builder = builder.with_accessibility_tags(true);
    }
    if args.prepend {
        builder = builder.with_placement(PagePlacement::Prepend);
    }
    let job = builder.build()?;

    let reports = job.run()?;
    let pages: usize = reports.iter().map(|report| report.pages.len()).sum();
    println!(
        "Merged {} document(s), {} page(s), into {}",
        reports.len(),
        pages,
        job.output().display()
    );
    Ok(())
}
