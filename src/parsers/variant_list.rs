// ==============================================================================
// parsers/variant_list.rs - Union variant list reader
// ==============================================================================
// Description: Reads the headerless SNV[\tSYMBOL] lists written by discovery
// Author: Matt Barham
// Created: 2026-09-22
// Modified: 2026-10-06
// Version: 1.0.0
// ==============================================================================

use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::models::{split_variant_id, UnionEntry};
use super::open_text;

#[derive(Error, Debug)]
pub enum UnionFileError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid variant identifier at line {line}: '{value}' (expected CHROM:POS:REF:ALT)")]
    InvalidVariantId { line: usize, value: String },
}

/// Read a union file; a missing SYMBOL column yields empty symbols
pub fn read_union_file(path: impl AsRef<Path>) -> Result<Vec<UnionEntry>, UnionFileError> {
    let reader = open_text(path.as_ref())?;
    read_union_entries(reader)
}

pub(crate) fn read_union_entries(reader: impl Read) -> Result<Vec<UnionEntry>, UnionFileError> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .from_reader(reader);

    let mut entries = Vec::new();
    for (idx, result) in csv_reader.records().enumerate() {
        let record = result?;
        let variant_id = record.get(0).unwrap_or_default().trim();

        if variant_id.is_empty() {
            continue;
        }
        if split_variant_id(variant_id).is_none() {
            return Err(UnionFileError::InvalidVariantId {
                line: idx + 1,
                value: variant_id.to_string(),
            });
        }

        entries.push(UnionEntry {
            variant_id: variant_id.to_string(),
            gene_symbol: record.get(1).unwrap_or_default().trim().to_string(),
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_with_symbols() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "1:12345:A:G\tGENE1\n17:7577120:C:T\tTP53\n").unwrap();

        let entries = read_union_file(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].variant_id, "1:12345:A:G");
        assert_eq!(entries[1].gene_symbol, "TP53");
    }

    #[test]
    fn test_read_without_symbols() {
        let entries = read_union_entries("chr2:100:G:A\n\nchr3:5:T:C\n".as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].gene_symbol, "");
        assert_eq!(entries[1].variant_id, "chr3:5:T:C");
    }

    #[test]
    fn test_invalid_identifier() {
        let result = read_union_entries("1:12345:A:G\tG\n1.200\tX\n".as_bytes());
        match result {
            Err(UnionFileError::InvalidVariantId { line, value }) => {
                assert_eq!(line, 2);
                assert_eq!(value, "1.200");
            }
            other => panic!("Expected InvalidVariantId, got {:?}", other),
        }
    }
}
