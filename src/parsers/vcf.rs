// ==============================================================================
// parsers/vcf.rs - Somatic VCF parser
// ==============================================================================
// Description: Reads paired tumor/normal VCF rows with their FORMAT evidence
//              using noodles-vcf
// Author: Matt Barham
// Created: 2026-09-14
// Modified: 2026-10-18
// Version: 1.2.0
// ==============================================================================
// FORMAT evidence is read by key: GT, AD (ref,alt,...), DP
// `.vcf.gz` inputs must be BGZF-compressed (bgzip), as variant callers emit them
// References:
// - VCF 4.2 Spec: https://samtools.github.io/hts-specs/VCFv4.2.pdf
// - noodles-vcf: https://docs.rs/noodles-vcf/0.81.0/noodles_vcf/
// ==============================================================================

use noodles_vcf as vcf;
use noodles_vcf::variant::record::AlternateBases;
use std::io::BufRead;
use std::path::Path;
use thiserror::Error;

use crate::models::GenotypeCall;

/// VCF parsing errors
#[derive(Error, Debug)]
pub enum VcfParseError {
    #[error("Failed to open VCF file: {0}")]
    FileOpenError(String),

    #[error("Failed to read VCF header: {0}")]
    HeaderError(String),

    #[error("Failed to read VCF record at row {row}: {details}")]
    RecordError { row: usize, details: String },

    #[error("No sample columns after FORMAT")]
    NoSamples,

    #[error("Invalid position at row {row}: {details}")]
    InvalidPosition { row: usize, details: String },

    #[error("Missing {field} at row {row}")]
    MissingField { row: usize, field: String },

    #[error("FORMAT key {0} not present")]
    MissingFormatKey(String),

    #[error("FORMAT has {keys} keys but sample has {values} values")]
    FormatLengthMismatch { keys: usize, values: usize },

    #[error("Invalid {field} value '{value}'")]
    InvalidNumber { field: String, value: String },
}

/// One VCF data row
#[derive(Debug, Clone, PartialEq)]
pub struct VcfRow {
    pub chromosome: String,
    pub position: u64,
    pub ref_allele: String,
    pub alt_allele: String,
    pub filter: String,
    pub format: String,
    /// Raw sample column values, in header order
    pub samples: Vec<String>,
}

impl VcfRow {
    /// CHROM:POS:REF:ALT
    pub fn variant_id(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.chromosome, self.position, self.ref_allele, self.alt_allele
        )
    }
}

/// Parsed VCF body
#[derive(Debug, Clone, Default)]
pub struct VcfTable {
    pub sample_names: Vec<String>,
    pub rows: Vec<VcfRow>,
}

/// Parser for caller VCFs (Mutect-style, one normal and one tumor column)
#[derive(Debug, Clone, Default)]
pub struct VcfParser;

impl VcfParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a `.vcf` or bgzipped `.vcf.gz` file
    pub fn parse(&self, path: impl AsRef<Path>) -> Result<VcfTable, VcfParseError> {
        let path = path.as_ref();

        let reader = vcf::io::reader::Builder::default()
            .build_from_path(path)
            .map_err(|e| VcfParseError::FileOpenError(format!("{}: {}", path.display(), e)))?;

        self.read_table(reader)
    }

    /// Parse uncompressed VCF text from any buffered reader
    pub fn parse_reader(&self, reader: impl BufRead) -> Result<VcfTable, VcfParseError> {
        self.read_table(vcf::io::Reader::new(reader))
    }

    fn read_table<R: BufRead>(&self, mut reader: vcf::io::Reader<R>) -> Result<VcfTable, VcfParseError> {
        let header = reader
            .read_header()
            .map_err(|e| VcfParseError::HeaderError(e.to_string()))?;

        let sample_names: Vec<String> = header.sample_names().iter().cloned().collect();
        if sample_names.is_empty() {
            return Err(VcfParseError::NoSamples);
        }

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let row = idx + 1;
            let record = result.map_err(|e| VcfParseError::RecordError {
                row,
                details: e.to_string(),
            })?;
            rows.push(self.parse_record(&record, row)?);
        }

        Ok(VcfTable { sample_names, rows })
    }

    fn parse_record(&self, record: &vcf::Record, row: usize) -> Result<VcfRow, VcfParseError> {
        let position = match record.variant_start() {
            Some(Ok(pos)) => pos.get() as u64,
            Some(Err(e)) => {
                return Err(VcfParseError::InvalidPosition {
                    row,
                    details: e.to_string(),
                })
            }
            None => {
                return Err(VcfParseError::MissingField {
                    row,
                    field: "POS".to_string(),
                })
            }
        };

        let alternate_bases = record.alternate_bases();
        let alt_alleles = alternate_bases
            .iter()
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| VcfParseError::RecordError {
                row,
                details: format!("Failed to get ALT allele: {}", e),
            })?;
        if alt_alleles.is_empty() {
            return Err(VcfParseError::MissingField {
                row,
                field: "ALT".to_string(),
            });
        }

        // FORMAT followed by one column per sample
        let samples = record.samples();
        let mut columns = samples.as_ref().split('\t');
        let format = columns.next().unwrap_or_default().to_string();
        if format.is_empty() {
            return Err(VcfParseError::MissingField {
                row,
                field: "FORMAT".to_string(),
            });
        }

        Ok(VcfRow {
            chromosome: record.reference_sequence_name().to_string(),
            position,
            ref_allele: record.reference_bases().to_string(),
            alt_allele: alt_alleles.join(","),
            filter: record.filters().as_ref().to_string(),
            format,
            samples: columns.map(str::to_string).collect(),
        })
    }
}

/// Read GT, AD and DP from one sample column using the FORMAT key order
///
/// # Example
/// ```
/// use snv_discovery::parsers::parse_genotype_call;
///
/// let call = parse_genotype_call("GT:AD:AF:DP", "0/1:109,20:0.155:129").unwrap();
/// assert_eq!(call.genotype, "0/1");
/// assert_eq!(call.alt_count, 20);
/// assert_eq!(call.depth, 129);
/// ```
pub fn parse_genotype_call(format: &str, sample: &str) -> Result<GenotypeCall, VcfParseError> {
    let keys: Vec<&str> = format.split(':').collect();
    let values: Vec<&str> = sample.split(':').collect();

    if values.len() < keys.len() {
        return Err(VcfParseError::FormatLengthMismatch {
            keys: keys.len(),
            values: values.len(),
        });
    }

    let value_of = |key: &str| {
        keys.iter()
            .position(|k| *k == key)
            .map(|idx| values[idx])
            .ok_or_else(|| VcfParseError::MissingFormatKey(key.to_string()))
    };

    let genotype = value_of("GT")?;
    let allele_depths = value_of("AD")?;
    let depth_str = value_of("DP")?;

    let alt_str = allele_depths
        .split(',')
        .nth(1)
        .ok_or_else(|| VcfParseError::InvalidNumber {
            field: "AD".to_string(),
            value: allele_depths.to_string(),
        })?;

    let alt_count = alt_str.parse::<u32>().map_err(|_| VcfParseError::InvalidNumber {
        field: "AD".to_string(),
        value: allele_depths.to_string(),
    })?;

    let depth = depth_str.parse::<u32>().map_err(|_| VcfParseError::InvalidNumber {
        field: "DP".to_string(),
        value: depth_str.to_string(),
    })?;

    Ok(GenotypeCall::new(genotype, depth, alt_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VCF: &str = "\
##fileformat=VCFv4.2
##source=Mutect2
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNORMAL\tTUMOR
1\t12345\t.\tA\tG\t.\tPASS\tDP=120\tGT:AD:AF:DP\t0/0:40,0:0.0:40\t0/1:60,20:0.25:80
17\t7577120\trs28934576\tC\tT\t.\tREJECT\t.\tGT:AD:AF:DP\t0/0:30,1:0.03:31\t0/1:50,10:0.16:60
";

    #[test]
    fn test_parse_rows() {
        let table = VcfParser::new().parse_reader(VCF.as_bytes()).unwrap();

        assert_eq!(table.sample_names, vec!["NORMAL", "TUMOR"]);
        assert_eq!(table.rows.len(), 2);

        let first = &table.rows[0];
        assert_eq!(first.variant_id(), "1:12345:A:G");
        assert_eq!(first.filter, "PASS");
        assert_eq!(first.format, "GT:AD:AF:DP");
        assert_eq!(first.samples, vec!["0/0:40,0:0.0:40", "0/1:60,20:0.25:80"]);

        assert_eq!(table.rows[1].variant_id(), "17:7577120:C:T");
        assert_eq!(table.rows[1].filter, "REJECT");
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tumor.vcf");
        std::fs::write(&path, VCF).unwrap();

        let table = VcfParser::new().parse(&path).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].samples[0], "0/0:30,1:0.03:31");
    }

    #[test]
    fn test_missing_file() {
        let result = VcfParser::new().parse("/nonexistent/tumor.vcf");
        assert!(matches!(result, Err(VcfParseError::FileOpenError(_))));
    }

    #[test]
    fn test_sites_only_vcf_has_no_samples() {
        let text = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n1\t5\t.\tA\tG\t.\tPASS\t.\n";
        let result = VcfParser::new().parse_reader(text.as_bytes());
        assert!(matches!(result, Err(VcfParseError::NoSamples)));
    }

    #[test]
    fn test_invalid_position() {
        let text = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS\n1\tabc\t.\tA\tG\t.\tPASS\t.\tGT\t0/1\n";
        let result = VcfParser::new().parse_reader(text.as_bytes());
        assert!(matches!(
            result,
            Err(VcfParseError::InvalidPosition { row: 1, .. }) | Err(VcfParseError::RecordError { row: 1, .. })
        ));
    }

    #[test]
    fn test_parse_genotype_call_by_key() {
        let call = parse_genotype_call("GT:AD:AF:DP", "0/1:109,20:80:70").unwrap();
        assert_eq!(call, GenotypeCall::new("0/1", 70, 20));

        // Key order differs from the Mutect default
        let call = parse_genotype_call("DP:GT:AD", "33:0/0:33,0").unwrap();
        assert_eq!(call, GenotypeCall::new("0/0", 33, 0));
    }

    #[test]
    fn test_parse_genotype_call_malformed() {
        assert!(matches!(
            parse_genotype_call("GT:AD", "0/1:10,2"),
            Err(VcfParseError::MissingFormatKey(k)) if k == "DP"
        ));
        assert!(matches!(
            parse_genotype_call("GT:AD:DP", "0/1:10:12"),
            Err(VcfParseError::InvalidNumber { field, .. }) if field == "AD"
        ));
        assert!(matches!(
            parse_genotype_call("GT:AD:DP", "0/1:10,2:."),
            Err(VcfParseError::InvalidNumber { field, .. }) if field == "DP"
        ));
        assert!(matches!(
            parse_genotype_call("GT:AD:DP", "0/1:10,2"),
            Err(VcfParseError::FormatLengthMismatch { keys: 3, values: 2 })
        ));
    }
}
