use crate::error::{FamsplitError, Result};
use crate::pedigree::Family;
use csv::ByteRecord;
use std::collections::{HashMap, HashSet};
use std::io::BufRead;

/// Number of fixed columns before the first sample column
/// (CHROM POS ID REF ALT QUAL FILTER INFO FORMAT)
pub const FIXED_COLUMNS: usize = 9;

/// Prefix of the column header record
pub const HEADER_MARKER: &str = "#CHROM";

/// Prefix of meta-information lines
pub const META_PREFIX: &str = "##";

/// Meta-information lines and column header of a VCF
#[derive(Debug, Clone)]
pub struct VcfHeader {
    meta_lines: Vec<String>,
    columns: Vec<String>,
    sample_columns: HashMap<String, usize>,
    lines_consumed: u64,
}

impl VcfHeader {
    /// Read meta lines up to and including the `#CHROM` record.
    ///
    /// The reader is left positioned on the first data row.
    pub fn read<R: BufRead>(reader: &mut R) -> Result<Self> {
        let mut meta_lines = Vec::new();
        let mut lines_consumed = 0u64;
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(FamsplitError::MissingHeader);
            }
            lines_consumed += 1;
            let content = line.trim_end_matches(&['\n', '\r'][..]);

            if content.starts_with(META_PREFIX) {
                meta_lines.push(content.to_string());
            } else if content.starts_with(HEADER_MARKER) {
                let columns: Vec<String> =
                    content.trim_end().split('\t').map(str::to_string).collect();
                return Self::from_parts(meta_lines, columns, lines_consumed);
            } else if content.starts_with('#') || content.trim().is_empty() {
                log::debug!("Ignoring header line {}", lines_consumed);
            } else {
                return Err(FamsplitError::MissingHeader);
            }
        }
    }

    fn from_parts(meta_lines: Vec<String>, columns: Vec<String>, lines_consumed: u64) -> Result<Self> {
        if columns.len() < FIXED_COLUMNS {
            return Err(FamsplitError::InvalidFormat(format!(
                "header record has {} columns, expected at least {}",
                columns.len(),
                FIXED_COLUMNS
            )));
        }

        let mut sample_columns = HashMap::with_capacity(columns.len() - FIXED_COLUMNS);
        for (idx, sample) in columns.iter().enumerate().skip(FIXED_COLUMNS) {
            sample_columns.entry(sample.clone()).or_insert(idx);
        }

        Ok(Self {
            meta_lines,
            columns,
            sample_columns,
            lines_consumed,
        })
    }

    pub fn meta_lines(&self) -> &[String] {
        &self.meta_lines
    }

    pub fn fixed_columns(&self) -> &[String] {
        &self.columns[..FIXED_COLUMNS]
    }

    /// Sample ids in column order
    pub fn samples(&self) -> &[String] {
        &self.columns[FIXED_COLUMNS..]
    }

    pub fn n_samples(&self) -> usize {
        self.columns.len() - FIXED_COLUMNS
    }

    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.sample_columns.contains_key(sample_id)
    }

    /// Number of lines read up to and including the `#CHROM` record
    pub fn lines_consumed(&self) -> u64 {
        self.lines_consumed
    }

    /// Resolve the columns written for `family`: the fixed columns, then
    /// every sample column whose id is a family member, in column order.
    pub fn select(&self, family: &Family) -> ColumnSelection {
        let wanted: HashSet<&str> = family.members().iter().map(String::as_str).collect();

        let mut indices: Vec<usize> = (0..FIXED_COLUMNS).collect();
        let mut samples = Vec::new();
        for (idx, sample) in self.columns.iter().enumerate().skip(FIXED_COLUMNS) {
            if wanted.contains(sample.as_str()) {
                indices.push(idx);
                samples.push(sample.clone());
            }
        }

        ColumnSelection { indices, samples }
    }
}

/// Column indices projected out of every row for one family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    indices: Vec<usize>,
    samples: Vec<String>,
}

impl ColumnSelection {
    /// True when no sample column was selected
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    #[cfg(test)]
    fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Minimum number of fields a row needs for this projection
    pub fn required_len(&self) -> usize {
        self.indices.iter().max().map_or(0, |&max| max + 1)
    }

    /// Header record: fixed columns followed by the selected samples
    pub fn header_record<'a>(&'a self, header: &'a VcfHeader) -> Vec<&'a str> {
        header
            .fixed_columns()
            .iter()
            .chain(self.samples.iter())
            .map(String::as_str)
            .collect()
    }

    /// Project `row` into `out`. Returns the row's field count as the
    /// error when a selected column is missing.
    pub fn project(&self, row: &ByteRecord, out: &mut ByteRecord) -> std::result::Result<(), usize> {
        out.clear();
        for &idx in &self.indices {
            match row.get(idx) {
                Some(field) => out.push_field(field),
                None => return Err(row.len()),
            }
        }
        Ok(())
    }
}
