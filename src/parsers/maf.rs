// ==============================================================================
// parsers/maf.rs - Mutation Annotation Format (MAF) parser
// ==============================================================================
// Description: Reads the annotation columns the discovery pipeline needs from
//              vcf2maf/VEP output
// Author: Matt Barham
// Created: 2026-09-14
// Modified: 2026-10-06
// Version: 1.0.0
// ==============================================================================
// Format: tab-delimited with '#' comment lines and a header row. Only the
// named columns below are read; everything else is ignored.
//   Chromosome, Variant_Classification, t_depth, t_alt_count,
//   SYMBOL (VEP) or Hugo_Symbol
// ==============================================================================

use csv::ReaderBuilder;
use serde::Deserialize;
use std::io::BufRead;
use std::path::Path;
use thiserror::Error;

use super::open_text;

/// Errors that can occur during MAF parsing
#[derive(Error, Debug)]
pub enum MafParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),
}

/// Annotation columns of one MAF row
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MafRow {
    #[serde(rename = "Chromosome", default)]
    pub chromosome: Option<String>,

    #[serde(rename = "Variant_Classification", default)]
    pub variant_classification: Option<String>,

    /// Kept as text so malformed values can be reported with context
    #[serde(rename = "t_depth", default)]
    pub t_depth: Option<String>,

    #[serde(rename = "t_alt_count", default)]
    pub t_alt_count: Option<String>,

    #[serde(rename = "SYMBOL", default)]
    pub symbol: Option<String>,

    #[serde(rename = "Hugo_Symbol", default)]
    pub hugo_symbol: Option<String>,
}

impl MafRow {
    /// VEP SYMBOL when present, otherwise Hugo_Symbol, otherwise empty
    pub fn gene_symbol(&self) -> &str {
        self.symbol
            .as_deref()
            .or(self.hugo_symbol.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default)]
pub struct MafParser;

impl MafParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a `.maf` or `.maf.gz` file
    pub fn parse(&self, path: impl AsRef<Path>) -> Result<Vec<MafRow>, MafParseError> {
        let reader = open_text(path.as_ref())?;
        self.parse_reader(reader)
    }

    pub fn parse_reader(&self, reader: impl BufRead) -> Result<Vec<MafRow>, MafParseError> {
        let mut body = String::new();
        for line in reader.lines() {
            let line = line?;
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            body.push_str(&line);
            body.push('\n');
        }

        let mut csv_reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .quoting(false)
            .flexible(true)
            .from_reader(body.as_bytes());

        let headers = csv_reader.headers()?.clone();
        for required in ["Variant_Classification", "t_depth", "t_alt_count"] {
            if !headers.iter().any(|h| h == required) {
                return Err(MafParseError::MissingColumn(required.to_string()));
            }
        }

        let mut rows = Vec::new();
        for result in csv_reader.deserialize() {
            let row: MafRow = result?;
            rows.push(row);
        }

        Ok(rows)
    }
}
