use thiserror::Error;

#[derive(Error, Debug)]
pub enum FamsplitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Unknown encoding label: {0}")]
    UnknownEncoding(String),

    #[error("Failed to decode pedigree file as {encoding}")]
    Decode { encoding: String },

    #[error("Missing header record: no #CHROM line found before variant data")]
    MissingHeader,

    #[error("Output file {path} would overwrite the input VCF")]
    OutputOverwritesInput { path: String },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("{failed} family file(s) could not be written due to malformed rows")]
    FamilyFailures { failed: usize },
}

pub type Result<T> = std::result::Result<T, FamsplitError>;
