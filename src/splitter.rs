use crate::error::{FamsplitError, Result};
use crate::pedigree::{Family, Pedigree};
use crate::vcf::{ColumnSelection, VcfHeader};
use csv::{ByteRecord, QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Shown in place of a trio member that has no column in the VCF
const NOT_AVAILABLE: &str = "N/A";

/// What happened to one family during a split
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FamilyOutcome {
    /// `<family_id>.vcf` was written
    Written {
        path: PathBuf,
        samples: Vec<String>,
        rows: u64,
    },
    /// None of the family's members is a sample of the VCF
    SkippedNoSamples,
    /// A data row lacked a column the family needs; no file was kept
    FailedMalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyReport {
    pub family_id: String,
    pub outcome: FamilyOutcome,
}

/// Per-family outcomes of a split, in pedigree order
#[derive(Debug, Clone, Default)]
pub struct SplitReport {
    families: Vec<FamilyReport>,
    rows: u64,
}

impl SplitReport {
    pub fn families(&self) -> &[FamilyReport] {
        &self.families
    }

    pub fn outcome(&self, family_id: &str) -> Option<&FamilyOutcome> {
        self.families
            .iter()
            .find(|r| r.family_id == family_id)
            .map(|r| &r.outcome)
    }

    /// Number of data rows read from the VCF
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn n_written(&self) -> usize {
        self.count(|o| matches!(o, FamilyOutcome::Written { .. }))
    }

    pub fn n_skipped(&self) -> usize {
        self.count(|o| matches!(o, FamilyOutcome::SkippedNoSamples))
    }

    pub fn n_failed(&self) -> usize {
        self.count(|o| matches!(o, FamilyOutcome::FailedMalformedRow { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.n_failed() == 0
    }

    /// Turn failed families into an error for callers that need all-or-nothing
    pub fn into_result(self) -> Result<Self> {
        match self.n_failed() {
            0 => Ok(self),
            failed => Err(FamsplitError::FamilyFailures { failed }),
        }
    }

    fn count(&self, pred: impl Fn(&FamilyOutcome) -> bool) -> usize {
        self.families.iter().filter(|r| pred(&r.outcome)).count()
    }
}

struct MalformedRow {
    line: u64,
    expected: usize,
    found: usize,
}

/// Families whose output files are open at the same time during one
/// pass over the data rows
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Suffix of a family file while its rows are still being written
const PARTIAL_SUFFIX: &str = ".partial";

/// Output file of one family, open for the duration of one pass.
///
/// Rows go to `<family_id>.vcf.partial`, which is renamed over
/// `<family_id>.vcf` only once the family completed.
struct FamilyWriter {
    family_id: String,
    path: PathBuf,
    partial_path: PathBuf,
    selection: ColumnSelection,
    writer: csv::Writer<BufWriter<File>>,
    rows: u64,
    failure: Option<MalformedRow>,
}

impl FamilyWriter {
    /// Create the partial file for `family_id` and write the header to it
    fn create(outdir: &Path, family_id: &str, header: &VcfHeader, selection: ColumnSelection) -> Result<Self> {
        let path = family_path(outdir, family_id);
        let partial_path = outdir.join(format!("{}.vcf{}", family_id, PARTIAL_SUFFIX));
        let mut out = BufWriter::new(File::create(&partial_path)?);

        for meta in header.meta_lines() {
            writeln!(out, "{}", meta)?;
        }

        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(out);
        writer.write_record(selection.header_record(header))?;

        Ok(Self {
            family_id: family_id.to_string(),
            path,
            partial_path,
            selection,
            writer,
            rows: 0,
            failure: None,
        })
    }

    fn write_row(&mut self, row: &ByteRecord, line: u64, scratch: &mut ByteRecord) -> Result<()> {
        if self.failure.is_some() {
            return Ok(());
        }
        match self.selection.project(row, scratch) {
            Ok(()) => {
                self.writer.write_byte_record(scratch)?;
                self.rows += 1;
            }
            Err(found) => {
                let expected = self.selection.required_len();
                log::error!(
                    "Family {}: line {} has {} fields, expected at least {}",
                    self.family_id,
                    line,
                    found,
                    expected
                );
                self.failure = Some(MalformedRow { line, expected, found });
            }
        }
        Ok(())
    }

    /// Move the finished file into place, or drop it if the family failed
    fn finish(mut self) -> Result<FamilyReport> {
        let outcome = match self.failure.take() {
            Some(MalformedRow { line, expected, found }) => {
                drop(self.writer);
                fs::remove_file(&self.partial_path)?;
                log::error!("Failed to write VCF for family {}", self.family_id);
                FamilyOutcome::FailedMalformedRow { line, expected, found }
            }
            None => {
                self.writer.flush()?;
                drop(self.writer);
                fs::rename(&self.partial_path, &self.path)?;
                log::info!(
                    "Successfully wrote VCF for family {}: {} ({} rows)",
                    self.family_id,
                    self.path.display(),
                    self.rows
                );
                FamilyOutcome::Written {
                    path: self.path,
                    samples: self.selection.samples().to_vec(),
                    rows: self.rows,
                }
            }
        };
        Ok(FamilyReport {
            family_id: self.family_id,
            outcome,
        })
    }

    /// Remove the partial file of a pass that was cut short
    fn abandon(self) {
        let partial_path = self.partial_path.clone();
        drop(self);
        if let Err(e) = fs::remove_file(&partial_path) {
            log::warn!("Could not remove {}: {}", partial_path.display(), e);
        }
    }
}

fn family_path(outdir: &Path, family_id: &str) -> PathBuf {
    outdir.join(format!("{}.vcf", family_id))
}

/// `Proband=.., Father=.., Mother=..`, with members missing from the VCF shown as N/A
pub fn trio_summary(family: &Family, header: &VcfHeader) -> String {
    let trio = family.trio();
    let shown = |id: Option<&str>| match id {
        Some(id) if header.has_sample(id) => id.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    };
    format!(
        "Proband={}, Father={}, Mother={}",
        shown(Some(trio.proband.as_str())),
        shown(trio.father.as_deref()),
        shown(trio.mother.as_deref())
    )
}

/// A family with at least one sample column to write
struct Planned<'a> {
    slot: usize,
    family: &'a Family,
    selection: ColumnSelection,
}

/// Splits a multi-sample VCF into one VCF per pedigree family
pub struct FamilySplitter {
    outdir: PathBuf,
    batch_size: usize,
}

impl FamilySplitter {
    pub fn new<P: AsRef<Path>>(outdir: P) -> Self {
        Self {
            outdir: outdir.as_ref().to_path_buf(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Limit how many family files are open at once (minimum 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Write `<family_id>.vcf` into the output directory for every family
    /// with at least one sample in the VCF.
    ///
    /// Families are written in pedigree order, at most `batch_size` at a
    /// time; the data rows are streamed once per batch. Structural and
    /// I/O problems are returned as errors, per-family problems are
    /// recorded in the report.
    pub fn split<P: AsRef<Path>>(&self, vcf_path: P, pedigree: &Pedigree) -> Result<SplitReport> {
        let vcf_path = vcf_path.as_ref();
        if !vcf_path.exists() {
            return Err(FamsplitError::FileNotFound {
                path: vcf_path.display().to_string(),
            });
        }

        let start_time = Instant::now();
        let header = VcfHeader::read(&mut BufReader::new(File::open(vcf_path)?))?;
        log::info!(
            "VCF header: {} metadata lines, {} samples",
            header.meta_lines().len(),
            header.n_samples()
        );

        let mut slots: Vec<Option<FamilyReport>> = Vec::with_capacity(pedigree.n_families());
        let mut planned = Vec::new();
        for family in pedigree.families() {
            let selection = header.select(family);
            if selection.is_empty() {
                log::warn!("Skipping family {}: no valid samples in VCF", family.id());
                slots.push(Some(FamilyReport {
                    family_id: family.id().to_string(),
                    outcome: FamilyOutcome::SkippedNoSamples,
                }));
            } else {
                planned.push(Planned { slot: slots.len(), family, selection });
                slots.push(None);
            }
        }

        fs::create_dir_all(&self.outdir)?;
        self.check_input_not_overwritten(vcf_path, &planned)?;

        let mut n_rows = 0u64;
        let mut planned = planned.into_iter().peekable();
        while planned.peek().is_some() {
            let batch: Vec<Planned> = planned.by_ref().take(self.batch_size).collect();
            let (rows, reports) = self.write_batch(vcf_path, &header, batch)?;
            n_rows = rows;
            for (slot, family_report) in reports {
                slots[slot] = Some(family_report);
            }
        }

        let report = SplitReport {
            families: slots.into_iter().flatten().collect(),
            rows: n_rows,
        };

        log::info!(
            "VCF splitting completed in {:.2} seconds: {} variants, {} written, {} skipped, {} failed",
            start_time.elapsed().as_secs_f64(),
            report.rows(),
            report.n_written(),
            report.n_skipped(),
            report.n_failed()
        );

        Ok(report)
    }

    /// Refuse to run when a family file would replace the input VCF
    fn check_input_not_overwritten(&self, vcf_path: &Path, planned: &[Planned]) -> Result<()> {
        let input = fs::canonicalize(vcf_path)?;
        for plan in planned {
            let output = family_path(&self.outdir, plan.family.id());
            if output.exists() && fs::canonicalize(&output)? == input {
                return Err(FamsplitError::OutputOverwritesInput {
                    path: output.display().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Open the files of one batch, stream every data row into them and
    /// move them into place. Returns the row count and each family's report.
    fn write_batch(
        &self,
        vcf_path: &Path,
        header: &VcfHeader,
        batch: Vec<Planned>,
    ) -> Result<(u64, Vec<(usize, FamilyReport)>)> {
        let mut writers: Vec<(usize, FamilyWriter)> = Vec::with_capacity(batch.len());
        for plan in batch {
            log::info!(
                "Processing family {}: {}",
                plan.family.id(),
                trio_summary(plan.family, header)
            );
            match FamilyWriter::create(&self.outdir, plan.family.id(), header, plan.selection) {
                Ok(writer) => writers.push((plan.slot, writer)),
                Err(e) => {
                    abandon_all(writers);
                    return Err(e);
                }
            }
        }

        let n_rows = match stream_rows(vcf_path, &mut writers) {
            Ok(n_rows) => n_rows,
            Err(e) => {
                abandon_all(writers);
                return Err(e);
            }
        };

        let mut reports = Vec::with_capacity(writers.len());
        let mut writers = writers.into_iter();
        while let Some((slot, writer)) = writers.next() {
            match writer.finish() {
                Ok(family_report) => reports.push((slot, family_report)),
                Err(e) => {
                    abandon_all(writers.collect());
                    return Err(e);
                }
            }
        }
        Ok((n_rows, reports))
    }
}

fn abandon_all(writers: Vec<(usize, FamilyWriter)>) {
    for (_, writer) in writers {
        writer.abandon();
    }
}

/// Project every data row of the VCF onto each writer of the batch
fn stream_rows(vcf_path: &Path, writers: &mut [(usize, FamilyWriter)]) -> Result<u64> {
    let mut reader = BufReader::new(File::open(vcf_path)?);
    let header = VcfHeader::read(&mut reader)?;

    let mut rows = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .comment(Some(b'#'))
        .from_reader(reader);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Splitting variants for {} families...", writers.len()));

    let mut record = ByteRecord::new();
    let mut scratch = ByteRecord::new();
    let mut n_rows = 0u64;
    while rows.read_byte_record(&mut record)? {
        n_rows += 1;
        let line = header.lines_consumed() + record.position().map_or(n_rows, |pos| pos.line());
        for (_, writer) in writers.iter_mut() {
            writer.write_row(&record, line, &mut scratch)?;
        }
        if n_rows % 10_000 == 0 {
            pb.set_message(format!("Processed {} variants", n_rows));
            pb.tick();
        }
    }
    pb.finish_and_clear();

    Ok(n_rows)
}
