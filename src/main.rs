use anyhow::Result;
use clap::Parser;

use famsplit::cli::Args;
use famsplit::{FamilySplitter, Pedigree};

fn main() -> Result<()> {
    // Diagnostics go to stdout, RUST_LOG overrides the level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();

    let args = Args::parse();

    log::info!("=== famsplit: split VCF by family ===");
    log::info!("Input VCF: {}", args.vcf.display());
    log::info!("Pedigree file: {}", args.ped.display());
    log::info!("Output directory: {}", args.outdir.display());
    log::info!("Pedigree encoding: {}", args.encoding);

    // Load pedigree
    let pedigree = Pedigree::load(&args.ped, args.encoding)?;
    if pedigree.is_empty() {
        log::warn!("No families found in pedigree file");
    }

    // Write one VCF per family
    log::info!("Splitting VCF by family...");
    let splitter = FamilySplitter::new(&args.outdir);
    let report = splitter.split(&args.vcf, &pedigree)?.into_result()?;

    // Summary
    log::info!("=== SUCCESS ===");
    log::info!("All families processed successfully!");
    log::info!("Families written: {}", report.n_written());
    log::info!("Families skipped: {}", report.n_skipped());

    Ok(())
}
