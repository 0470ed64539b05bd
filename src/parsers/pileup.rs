// ==============================================================================
// parsers/pileup.rs - samtools mpileup text parser
// ==============================================================================
// Description: Reads per-position mpileup rows and scans read-base strings
// Author: Matt Barham
// Created: 2026-09-22
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Format (samtools mpileup -s -O, tab-delimited, no header):
//   CHROM  POS  REF  DP  BASES  BASEQ  MAPQ  [POS_ON_READS]
// Base string markers removed before counting:
//   ^X   read start followed by its mapping-quality char
//   $    read end
//   *    deletion placeholder
//   +Nseq / -Nseq   indel of exactly N bases
// ==============================================================================

use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use super::open_text;

const PHRED_OFFSET: u8 = 33;

/// Errors that can occur during pileup parsing
#[derive(Error, Debug)]
pub enum PileupParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid line format at line {line}: {details}")]
    InvalidFormat { line: usize, details: String },

    #[error("Invalid {field} at line {line}: {value}")]
    InvalidNumber {
        line: usize,
        field: String,
        value: String,
    },

    #[error("Quality character {0:?} is below the phred offset")]
    InvalidQuality(char),

    #[error("Quality string for {position} is shorter than its bases ({bases} bases, {qualities} qualities)")]
    QualityLengthMismatch {
        position: String,
        bases: usize,
        qualities: usize,
    },
}

/// One mpileup row
#[derive(Debug, Clone, PartialEq)]
pub struct PileupRecord {
    pub chromosome: String,
    pub position: u64,
    pub reference_base: String,
    pub depth: u32,
    /// Raw read-base string including markers
    pub bases: String,
    pub base_qualities: String,
    pub mapping_qualities: String,
}

impl PileupRecord {
    /// "CHROM:POS", the key used to join pileups to variant lists
    pub fn locus(&self) -> String {
        format!("{}:{}", self.chromosome, self.position)
    }

    /// Read bases with every marker and deletion placeholder removed
    pub fn clean_bases(&self) -> String {
        strip_markers(&self.bases)
    }

    /// One char per read, `*` placeholders kept, aligned with the quality strings
    pub fn read_bases(&self) -> String {
        read_aligned_bases(&self.bases)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PileupParser;

impl PileupParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, path: impl AsRef<Path>) -> Result<Vec<PileupRecord>, PileupParseError> {
        let reader = open_text(path.as_ref())?;
        self.parse_reader(reader)
    }

    pub fn parse_reader(&self, reader: impl Read) -> Result<Vec<PileupRecord>, PileupParseError> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quoting(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = Vec::new();
        for (idx, result) in csv_reader.records().enumerate() {
            let line = idx + 1;
            let row = result?;

            // Zero-coverage rows may drop the trailing columns
            if row.len() < 4 {
                return Err(PileupParseError::InvalidFormat {
                    line,
                    details: format!("Expected at least 4 tab-delimited fields, found {}", row.len()),
                });
            }

            let field = |i: usize| row.get(i).unwrap_or_default().to_string();

            let position_str = field(1);
            let position = position_str.parse::<u64>().map_err(|_| PileupParseError::InvalidNumber {
                line,
                field: "position".to_string(),
                value: position_str.clone(),
            })?;

            let depth_str = field(3);
            let depth = depth_str.parse::<u32>().map_err(|_| PileupParseError::InvalidNumber {
                line,
                field: "depth".to_string(),
                value: depth_str.clone(),
            })?;

            records.push(PileupRecord {
                chromosome: field(0),
                position,
                reference_base: field(2),
                depth,
                bases: field(4),
                base_qualities: field(5),
                mapping_qualities: field(6),
            });
        }

        Ok(records)
    }
}

/// Remove read start/end markers, deletion placeholders and indel runs
pub fn strip_markers(bases: &str) -> String {
    scan_bases(bases, false)
}

/// Remove read start/end markers and indel runs but keep `*`, so index i
/// is the i-th read of the base and mapping quality strings
pub fn read_aligned_bases(bases: &str) -> String {
    scan_bases(bases, true)
}

fn scan_bases(bases: &str, keep_placeholders: bool) -> String {
    let bytes = bases.as_bytes();
    let mut cleaned = String::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            // Read start: skip the marker and its mapping-quality char
            b'^' => i += 2,
            b'*' if keep_placeholders => {
                cleaned.push('*');
                i += 1;
            }
            b'$' | b'*' => i += 1,
            b'+' | b'-' => {
                let digits_start = i + 1;
                let mut j = digits_start;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                let length = bases[digits_start..j].parse::<usize>().unwrap_or(0);
                i = j + length;
            }
            b => {
                cleaned.push(b as char);
                i += 1;
            }
        }
    }

    cleaned
}

/// Occurrences of `alt` in either case among the read bases
pub fn count_alt(clean_bases: &str, alt: &str) -> u32 {
    let Some(alt_base) = single_base(alt) else {
        return 0;
    };
    clean_bases
        .chars()
        .filter(|c| c.to_ascii_uppercase() == alt_base)
        .count() as u32
}

/// Read indices whose base matches `alt` in either case; pass read-aligned
/// bases to index the quality strings
pub fn alt_base_indices(read_bases: &str, alt: &str) -> Vec<usize> {
    let Some(alt_base) = single_base(alt) else {
        return Vec::new();
    };
    read_bases
        .chars()
        .enumerate()
        .filter(|(_, c)| c.to_ascii_uppercase() == alt_base)
        .map(|(i, _)| i)
        .collect()
}

fn single_base(allele: &str) -> Option<char> {
    let mut chars = allele.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c.to_ascii_uppercase()),
        _ => None,
    }
}

/// Phred score of one Sanger-encoded quality character
pub fn phred_score(quality: char) -> Result<u8, PileupParseError> {
    let code = u32::from(quality);
    if !(u32::from(PHRED_OFFSET)..=126).contains(&code) {
        return Err(PileupParseError::InvalidQuality(quality));
    }
    Ok(code as u8 - PHRED_OFFSET)
}
