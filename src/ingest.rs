// ==============================================================================
// ingest.rs - Sample ingestion
// ==============================================================================
// Description: Joins a sample's VCF and MAF into a SampleVariantSet
// Author: Matt Barham
// Created: 2026-09-15
// Modified: 2026-10-09
// Version: 1.1.0
// ==============================================================================
// VCF row i and MAF row i describe the same variant. The VCF supplies the
// identifier, FILTER and per-channel genotype evidence; the MAF supplies the
// tumor depth/alt counts, functional class and gene symbol.
// ==============================================================================

use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{vaf_percent, FilterStatus, SampleVariantSet, VariantCall};
use crate::parsers::{parse_genotype_call, MafParseError, MafParser, MafRow, VcfParseError, VcfParser, VcfTable};

/// Contigs whose name starts with this prefix (GL/unplaced scaffolds) are dropped
const UNPLACED_CONTIG_PREFIX: char = 'G';

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Sample '{sample}': failed to read VCF: {source}")]
    Vcf {
        sample: String,
        #[source]
        source: VcfParseError,
    },

    #[error("Sample '{sample}': failed to read MAF: {source}")]
    Maf {
        sample: String,
        #[source]
        source: MafParseError,
    },

    #[error("Sample '{sample}': VCF has {vcf_rows} rows but MAF has {maf_rows}")]
    RowCountMismatch {
        sample: String,
        vcf_rows: usize,
        maf_rows: usize,
    },

    #[error("Sample '{sample}': row {row} is on chromosome {vcf} in the VCF but {maf} in the MAF")]
    ChromosomeMismatch {
        sample: String,
        row: usize,
        vcf: String,
        maf: String,
    },

    #[error("Sample '{sample}', variant {variant_id}: invalid {field} '{value}'")]
    InvalidCount {
        sample: String,
        variant_id: String,
        field: String,
        value: String,
    },

    #[error("Sample '{sample}', variant {variant_id}: alt count {alt_count} exceeds depth {depth}")]
    AltExceedsDepth {
        sample: String,
        variant_id: String,
        alt_count: u32,
        depth: u32,
    },

    #[error("Sample '{sample}', variant {variant_id}: bad genotype evidence: {source}")]
    Genotype {
        sample: String,
        variant_id: String,
        #[source]
        source: VcfParseError,
    },
}

/// Read and join one sample's VCF and MAF
pub fn load_sample(
    name: &str,
    vcf_path: impl AsRef<Path>,
    maf_path: impl AsRef<Path>,
) -> Result<SampleVariantSet, IngestError> {
    let vcf = VcfParser::new()
        .parse(vcf_path.as_ref())
        .map_err(|source| IngestError::Vcf {
            sample: name.to_string(),
            source,
        })?;

    let maf = MafParser::new()
        .parse(maf_path.as_ref())
        .map_err(|source| IngestError::Maf {
            sample: name.to_string(),
            source,
        })?;

    let sample = join_sample(name, &vcf, &maf)?;
    info!(
        "Ingested sample {}: {} variants ({} channels)",
        name,
        sample.len(),
        vcf.sample_names.len()
    );
    Ok(sample)
}

/// Join parsed VCF and MAF rows position by position
pub fn join_sample(name: &str, vcf: &VcfTable, maf: &[MafRow]) -> Result<SampleVariantSet, IngestError> {
    if vcf.rows.len() != maf.len() {
        return Err(IngestError::RowCountMismatch {
            sample: name.to_string(),
            vcf_rows: vcf.rows.len(),
            maf_rows: maf.len(),
        });
    }

    let mut calls = Vec::with_capacity(vcf.rows.len());
    let mut dropped = 0usize;

    for (idx, (vcf_row, maf_row)) in vcf.rows.iter().zip(maf.iter()).enumerate() {
        if let Some(maf_chrom) = maf_row.chromosome.as_deref() {
            if normalize_chromosome(&vcf_row.chromosome) != normalize_chromosome(maf_chrom) {
                return Err(IngestError::ChromosomeMismatch {
                    sample: name.to_string(),
                    row: idx + 1,
                    vcf: vcf_row.chromosome.clone(),
                    maf: maf_chrom.to_string(),
                });
            }
        }

        if vcf_row.chromosome.starts_with(UNPLACED_CONTIG_PREFIX) {
            dropped += 1;
            continue;
        }

        let variant_id = vcf_row.variant_id();
        let depth = parse_count(name, &variant_id, "t_depth", maf_row.t_depth.as_deref())?;
        let alt_count = parse_count(name, &variant_id, "t_alt_count", maf_row.t_alt_count.as_deref())?;

        if alt_count > depth {
            return Err(IngestError::AltExceedsDepth {
                sample: name.to_string(),
                variant_id,
                alt_count,
                depth,
            });
        }

        let channels = vcf_row
            .samples
            .iter()
            .map(|column| parse_genotype_call(&vcf_row.format, column))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| IngestError::Genotype {
                sample: name.to_string(),
                variant_id: variant_id.clone(),
                source,
            })?;

        calls.push(VariantCall {
            variant_id,
            gene_symbol: maf_row.gene_symbol().to_string(),
            depth,
            alt_count,
            vaf: vaf_percent(alt_count, depth),
            filter_status: FilterStatus::parse(&vcf_row.filter),
            variant_classification: maf_row.variant_classification.clone(),
            channels,
        });
    }

    if dropped > 0 {
        debug!("Sample {}: dropped {} rows on unplaced contigs", name, dropped);
    }

    Ok(SampleVariantSet::new(name, calls))
}

fn normalize_chromosome(chrom: &str) -> &str {
    chrom.strip_prefix("chr").unwrap_or(chrom)
}

fn parse_count(sample: &str, variant_id: &str, field: &str, value: Option<&str>) -> Result<u32, IngestError> {
    let raw = value.unwrap_or("");
    raw.trim().parse::<u32>().map_err(|_| IngestError::InvalidCount {
        sample: sample.to_string(),
        variant_id: variant_id.to_string(),
        field: field.to_string(),
        value: raw.to_string(),
    })
}
