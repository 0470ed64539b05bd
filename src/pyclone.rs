// ==============================================================================
// pyclone.rs - PyClone input builder
// ==============================================================================
// Description: Combines pileup read counts, union gene symbols and TitanCNA
//              copy-number segments into a PyClone mutation table
// Author: Matt Barham
// Created: 2026-09-25
// Modified: 2026-10-11
// Version: 1.0.0
// ==============================================================================
// Copy number per mutation:
//   default               normal 2, minor 1, major 1
//   chromosome X          normal 1, minor 0, major 1
//   autosomes 1-22        major/minor from the first segment containing POS
//                         (inclusive), otherwise 1/1
// ==============================================================================

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::models::{split_variant_id, UnionEntry};
use crate::parsers::read_union_file;

const AUTOSOMES: std::ops::RangeInclusive<u32> = 1..=22;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PycloneError {
    #[error("Invalid variant identifier '{0}' (expected CHROM:POS:REF:ALT)")]
    InvalidVariantId(String),

    #[error("Variant {variant_id}: alt count {alt_count} exceeds depth {depth}")]
    AltExceedsDepth {
        variant_id: String,
        alt_count: u32,
        depth: u32,
    },
}

/// Row of a `<name>_samtools_result.tsv` file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SamtoolsResult {
    #[serde(rename = "SNV")]
    pub variant_id: String,

    #[serde(rename = "DP")]
    pub depth: u32,

    #[serde(rename = "ALT_COUNT")]
    pub alt_count: u32,

    #[serde(rename = "VAF")]
    pub vaf: Option<f64>,
}

/// TitanCNA segment (segs.txt); other columns are ignored
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TitanSegment {
    #[serde(rename = "Chromosome")]
    pub chromosome: String,

    #[serde(rename = "Start_Position.bp.")]
    pub start: u64,

    #[serde(rename = "End_Position.bp.")]
    pub end: u64,

    #[serde(rename = "MajorCN")]
    pub major_cn: u32,

    #[serde(rename = "MinorCN")]
    pub minor_cn: u32,
}

impl TitanSegment {
    fn contains(&self, chrom: &str, position: u64) -> bool {
        normalize_chromosome(&self.chromosome) == chrom && (self.start..=self.end).contains(&position)
    }
}

/// One PyClone mutation row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PycloneMutation {
    pub mutation_id: String,
    pub ref_counts: u32,
    pub var_counts: u32,
    pub normal_cn: u32,
    pub minor_cn: u32,
    pub major_cn: u32,
    pub variant_freq: Option<f64>,
}

fn normalize_chromosome(chrom: &str) -> &str {
    chrom.strip_prefix("chr").unwrap_or(chrom)
}

/// (normal, minor, major) copy number for a locus
pub fn copy_number(chrom: &str, position: u64, segments: &[TitanSegment]) -> (u32, u32, u32) {
    let chrom = normalize_chromosome(chrom);

    if chrom == "X" {
        return (1, 0, 1);
    }

    let is_autosome = chrom
        .parse::<u32>()
        .map(|n| AUTOSOMES.contains(&n))
        .unwrap_or(false);
    if !is_autosome {
        return (2, 1, 1);
    }

    match segments.iter().find(|s| s.contains(chrom, position)) {
        Some(segment) => (2, segment.minor_cn, segment.major_cn),
        None => (2, 1, 1),
    }
}

/// Join read counts with union symbols (samtools row order, unmatched rows
/// dropped) and annotate copy number
pub fn build_mutations(
    counts: &[SamtoolsResult],
    union: &[UnionEntry],
    segments: &[TitanSegment],
) -> Result<Vec<PycloneMutation>, PycloneError> {
    let mut symbols: HashMap<&str, &str> = HashMap::new();
    for entry in union {
        symbols
            .entry(entry.variant_id.as_str())
            .or_insert(entry.gene_symbol.as_str());
    }

    let mut mutations = Vec::new();
    for row in counts {
        let Some(symbol) = symbols.get(row.variant_id.as_str()) else {
            continue;
        };

        let (chrom, position, _, _) = split_variant_id(&row.variant_id)
            .ok_or_else(|| PycloneError::InvalidVariantId(row.variant_id.clone()))?;

        let ref_counts = row
            .depth
            .checked_sub(row.alt_count)
            .ok_or_else(|| PycloneError::AltExceedsDepth {
                variant_id: row.variant_id.clone(),
                alt_count: row.alt_count,
                depth: row.depth,
            })?;

        let (normal_cn, minor_cn, major_cn) = copy_number(chrom, position, segments);

        mutations.push(PycloneMutation {
            mutation_id: format!("{}:{}:{}", symbol, chrom, position),
            ref_counts,
            var_counts: row.alt_count,
            normal_cn,
            minor_cn,
            major_cn,
            variant_freq: row.vaf,
        });
    }

    Ok(mutations)
}

fn read_tsv<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: T = result.with_context(|| format!("Failed to parse {}", path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_samtools_results(path: &Path) -> Result<Vec<SamtoolsResult>> {
    read_tsv(path)
}

pub fn read_titan_segments(path: &Path) -> Result<Vec<TitanSegment>> {
    read_tsv(path)
}

/// Driver: read inputs and write `<sample>_pyclone.tsv`
pub fn run_pyclone(
    sample_name: &str,
    union_symbols: &Path,
    samtools_snv: &Path,
    titan_segs: &Path,
    output_dir: &Path,
) -> Result<PathBuf> {
    let union = read_union_file(union_symbols)
        .with_context(|| format!("Failed to read union file {}", union_symbols.display()))?;
    let counts = read_samtools_results(samtools_snv)?;
    let segments = read_titan_segments(titan_segs)?;

    let mutations = build_mutations(&counts, &union, &segments)
        .with_context(|| format!("Sample '{}': failed to build PyClone input", sample_name))?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let path = output_dir.join(format!("{}_pyclone.tsv", sample_name));
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for mutation in &mutations {
        writer.serialize(mutation)?;
    }
    writer.flush()?;

    info!(
        "PyClone input for {}: {} mutations, {} segments",
        sample_name,
        mutations.len(),
        segments.len()
    );
    Ok(path)
}
