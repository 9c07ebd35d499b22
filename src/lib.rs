//! Split a multi-sample VCF into one VCF per family.
//!
//! A [`Pedigree`] is loaded from a PED file and handed to a
//! [`FamilySplitter`], which writes `<family_id>.vcf` for every family
//! with at least one sample in the input VCF.

pub mod cli;
pub mod encoding;
pub mod error;
pub mod pedigree;
pub mod splitter;
pub mod vcf;

pub use encoding::EncodingChoice;
pub use error::{FamsplitError, Result};
pub use pedigree::{Family, Pedigree, PedigreeEntry, Trio};
pub use splitter::{FamilyOutcome, FamilyReport, FamilySplitter, SplitReport};
pub use vcf::{ColumnSelection, VcfHeader};
