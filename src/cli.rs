use crate::encoding::EncodingChoice;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "famsplit",
    version,
    about = "Split a multi-sample VCF into one VCF per family using a PED file",
    long_about = r#"
famsplit - split a multi-sample VCF by family

Every family of the pedigree file gets its own VCF containing the
meta-information lines, the 9 fixed columns and the sample columns of
the family members present in the input VCF (in input column order).
Families without any sample in the VCF are skipped.

Pedigree file format (whitespace separated, '#' lines are comments):
  FamilyID  SampleID  FatherID  MotherID  Sex  Phenotype
  Lines with fewer than 6 fields are ignored. Use 0 for unknown parents.

Output: <outdir>/<FamilyID>.vcf (overwritten if present)

Example:
  famsplit --vcf all.samples.vcf --ped ped.txt --outdir ./family
"#
)]
pub struct Args {
    /// Input multi-sample VCF
    #[arg(
        short = 'v',
        long = "vcf",
        value_name = "FILE",
        help = "Path to input VCF file (uncompressed)"
    )]
    pub vcf: PathBuf,

    /// Pedigree file
    #[arg(
        short = 'p',
        long = "ped",
        value_name = "FILE",
        help = "Path to pedigree (PED) file"
    )]
    pub ped: PathBuf,

    /// Output directory for per-family VCFs
    #[arg(
        short = 'o',
        long = "outdir",
        value_name = "DIR",
        help = "Output directory, created if missing"
    )]
    pub outdir: PathBuf,

    /// Pedigree file encoding
    #[arg(
        short = 'e',
        long = "encoding",
        value_name = "LABEL",
        default_value = "auto",
        help = "Pedigree file encoding: 'auto' to detect, or a label such as utf-8, gbk, windows-1252"
    )]
    pub encoding: EncodingChoice,
}
