// ==============================================================================
// overlap.rs - Cross-sample pileup overlap report
// ==============================================================================
// Description: Re-counts union variants in per-sample mpileups and reports
//              read support, VAF statistics and overlap with a reference sample
// Author: Matt Barham
// Created: 2026-09-23
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Outputs (output directory, default rapports_<min_alt>):
//   <name>_samtools_result.tsv   SNV DP ALT_COUNT VAF
//   rapport.tsv                  GENE:POS, alt/depth per sample, vaf-<name>
//   stats.tsv                    per-sample VAF statistics over alt > min_alt
//   upset_<min_alt>.tsv          membership pattern counts (alt >= min_alt)
// ==============================================================================

use anyhow::{Context, Result};
use csv::WriterBuilder;
use rayon::prelude::*;
use statrs::statistics::{Data, Distribution, Max, Median, Min};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::models::{split_variant_id, vaf_percent, UnionEntry};
use crate::parsers::pileup::{count_alt, PileupRecord};
use crate::parsers::{read_union_file, sample_name_from_path, PileupParser};

pub const DEFAULT_MIN_ALT: u32 = 2;

/// Sample whose name marks the matched normal in the report filter
pub const NORMAL_SAMPLE: &str = "normal";

/// Rows need at least this many alt reads in one sample to be reported
const MIN_SUPPORTING_READS: u32 = 2;

/// Rows are dropped when the normal sample has more alt reads than this
const MAX_NORMAL_ALT: u32 = 1;

/// Pileup support for one union variant in one sample
#[derive(Debug, Clone, PartialEq)]
pub struct SupportRow {
    pub variant_id: String,
    pub gene_symbol: String,
    pub depth: u32,
    pub alt_count: u32,
}

impl SupportRow {
    pub fn vaf(&self) -> Option<f64> {
        vaf_percent(self.alt_count, self.depth)
    }

    /// "SYMBOL|CHROM:POS"
    pub fn report_key(&self) -> String {
        match split_variant_id(&self.variant_id) {
            Some((chrom, pos, _, _)) => format!("{}|{}:{}", self.gene_symbol, chrom, pos),
            None => format!("{}|{}", self.gene_symbol, self.variant_id),
        }
    }

    /// "alt/depth" as shown in the report
    pub fn support(&self) -> String {
        format!("{}/{}", self.alt_count, self.depth)
    }
}

/// One sample's support rows, one per union entry in union order
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSupport {
    pub name: String,
    pub rows: Vec<SupportRow>,
}

/// Join pileup rows to union variants by CHROM:POS and count alt reads.
/// A variant without a pileup row has depth 0 and alt 0.
pub fn sample_support(name: &str, union: &[UnionEntry], pileup: &[PileupRecord]) -> SampleSupport {
    let mut by_locus: HashMap<(&str, u64), &PileupRecord> = HashMap::new();
    for record in pileup {
        by_locus
            .entry((record.chromosome.as_str(), record.position))
            .or_insert(record);
    }

    let rows = union
        .iter()
        .map(|entry| {
            let (depth, alt_count) = split_variant_id(&entry.variant_id)
                .and_then(|(chrom, pos, _, alt)| {
                    by_locus
                        .get(&(chrom, pos))
                        .map(|record| (record.depth, count_alt(&record.clean_bases(), alt)))
                })
                .unwrap_or((0, 0));

            SupportRow {
                variant_id: entry.variant_id.clone(),
                gene_symbol: entry.gene_symbol.clone(),
                depth,
                alt_count,
            }
        })
        .collect();

    SampleSupport {
        name: name.to_string(),
        rows,
    }
}

/// One report row across all samples
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub key: String,
    pub variant_id: String,
    /// (alt, depth) per sample, in report sample order
    pub counts: Vec<(u32, u32)>,
}

/// Cross-sample support table, reference sample first
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapReport {
    pub names: Vec<String>,
    pub rows: Vec<ReportRow>,
}

impl OverlapReport {
    /// Build the report, dropping rows without support in any sample and,
    /// when a normal sample is present, rows the normal supports
    pub fn build(samples: &[SampleSupport]) -> Self {
        let names: Vec<String> = samples.iter().map(|s| s.name.clone()).collect();
        let normal_idx = names.iter().position(|n| n == NORMAL_SAMPLE);
        let row_count = samples.first().map(|s| s.rows.len()).unwrap_or(0);

        let rows = (0..row_count)
            .filter_map(|i| {
                let first = &samples[0].rows[i];
                let counts: Vec<(u32, u32)> = samples
                    .iter()
                    .map(|s| (s.rows[i].alt_count, s.rows[i].depth))
                    .collect();

                if counts.iter().all(|(alt, _)| *alt < MIN_SUPPORTING_READS) {
                    return None;
                }
                if let Some(idx) = normal_idx {
                    if counts[idx].0 > MAX_NORMAL_ALT {
                        return None;
                    }
                }

                Some(ReportRow {
                    key: first.report_key(),
                    variant_id: first.variant_id.clone(),
                    counts,
                })
            })
            .collect();

        Self { names, rows }
    }

    /// Membership patterns (alt >= min_alt) and their counts, largest first.
    /// Rows where no sample reaches min_alt are not counted.
    pub fn upset_counts(&self, min_alt: u32) -> Vec<(Vec<bool>, usize)> {
        let mut patterns: BTreeMap<Vec<bool>, usize> = BTreeMap::new();
        for row in &self.rows {
            let pattern: Vec<bool> = row.counts.iter().map(|(alt, _)| *alt >= min_alt).collect();
            if pattern.iter().any(|present| *present) {
                *patterns.entry(pattern).or_insert(0) += 1;
            }
        }

        let mut counts: Vec<(Vec<bool>, usize)> = patterns.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }

    /// Per-sample statistics over rows with alt > min_alt
    pub fn sample_stats(&self, min_alt: u32) -> Vec<SampleStats> {
        let supported: Vec<HashSet<usize>> = (0..self.names.len())
            .map(|s| {
                self.rows
                    .iter()
                    .enumerate()
                    .filter(|(_, row)| row.counts[s].0 > min_alt)
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();

        let mut stats: Vec<SampleStats> = self
            .names
            .iter()
            .enumerate()
            .map(|(s, name)| {
                let vafs: Vec<f64> = self
                    .rows
                    .iter()
                    .filter(|row| row.counts[s].0 > min_alt)
                    .filter_map(|row| vaf_percent(row.counts[s].0, row.counts[s].1))
                    .collect();

                let summary = VafSummary::of(vafs);
                let count = supported[s].len();
                let overlap = supported[s].intersection(&supported[0]).count();
                let percent = if count == 0 || overlap == 0 {
                    0.0
                } else {
                    round_to(overlap as f64 / count as f64 * 100.0, 1)
                };

                SampleStats {
                    name: name.clone(),
                    count,
                    overlap,
                    percent_overlap: percent,
                    mean: summary.mean,
                    median: summary.median,
                    std: summary.std,
                    min: summary.min,
                    max: summary.max,
                    rank_overlap: 0.0,
                    rank_percent_overlap: 0.0,
                }
            })
            .collect();

        let overlap_ranks = average_ranks_descending(&stats.iter().map(|s| s.overlap as f64).collect::<Vec<_>>());
        let percent_ranks = average_ranks_descending(&stats.iter().map(|s| s.percent_overlap).collect::<Vec<_>>());
        for (i, s) in stats.iter_mut().enumerate() {
            s.rank_overlap = overlap_ranks[i];
            s.rank_percent_overlap = percent_ranks[i];
        }

        stats
    }
}

/// VAF statistics for one sample
#[derive(Debug, Clone, PartialEq)]
pub struct SampleStats {
    pub name: String,
    pub count: usize,
    pub overlap: usize,
    pub percent_overlap: f64,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub rank_overlap: f64,
    pub rank_percent_overlap: f64,
}

impl SampleStats {
    /// "min-max", empty when the sample has no supported rows
    pub fn range(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("{:.1}-{:.1}", min, max),
            _ => String::new(),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// VAF summary rounded to one decimal; undefined values (empty input,
/// std of a single value) are None
#[derive(Debug, Default)]
struct VafSummary {
    mean: Option<f64>,
    median: Option<f64>,
    std: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
}

impl VafSummary {
    fn of(vafs: Vec<f64>) -> Self {
        if vafs.is_empty() {
            return Self::default();
        }

        let defined = |v: f64| Some(v).filter(|v| v.is_finite()).map(|v| round_to(v, 1));
        let data = Data::new(vafs);

        Self {
            mean: data.mean().and_then(defined),
            median: defined(data.median()),
            // statrs uses the n - 1 denominator
            std: data.std_dev().and_then(defined),
            min: defined(data.min()),
            max: defined(data.max()),
        }
    }
}

/// 1-based ranks, largest value first, ties share their average rank
fn average_ranks_descending(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        // Positions start..=end share ranks start+1..=end+1
        let average = (start + end) as f64 / 2.0 + 1.0;
        for &idx in &order[start..=end] {
            ranks[idx] = average;
        }
        start = end + 1;
    }
    ranks
}

fn format_opt(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_default()
}

/// Summary of an overlap run
#[derive(Debug, Clone)]
pub struct OverlapRun {
    pub report: OverlapReport,
    pub stats: Vec<SampleStats>,
    pub written: Vec<PathBuf>,
}

/// Driver: read inputs, compute support and write every overlap output
pub fn run_overlap(
    union_path: &Path,
    reference_pileup: &Path,
    pileups: &[PathBuf],
    min_alt: u32,
    output_dir: &Path,
) -> Result<OverlapRun> {
    let union = read_union_file(union_path)
        .with_context(|| format!("Failed to read union file {}", union_path.display()))?;
    info!("Loaded {} union variants from {}", union.len(), union_path.display());

    let mut inputs: Vec<(String, &Path)> = vec![(sample_name_from_path(reference_pileup), reference_pileup)];
    for path in pileups {
        let name = sample_name_from_path(path);
        if inputs.iter().any(|(seen, _)| *seen == name) {
            warn!("Skipping pileup {}: sample '{}' already loaded", path.display(), name);
            continue;
        }
        inputs.push((name, path.as_path()));
    }

    let samples = inputs
        .par_iter()
        .map(|(name, path)| {
            let records = PileupParser::new()
                .parse(path)
                .with_context(|| format!("Failed to read pileup {}", path.display()))?;
            Ok(sample_support(name, &union, &records))
        })
        .collect::<Result<Vec<_>>>()?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let mut written = Vec::new();
    for sample in &samples {
        written.push(write_samtools_result(output_dir, sample)?);
    }

    let report = OverlapReport::build(&samples);
    let stats = report.sample_stats(min_alt);
    info!(
        "Overlap report: {} of {} variants supported across {} samples",
        report.rows.len(),
        union.len(),
        samples.len()
    );

    written.push(write_report(output_dir, &report)?);
    written.push(write_stats(output_dir, &report.names[0], &stats)?);
    written.push(write_upset(output_dir, &report, min_alt)?);

    Ok(OverlapRun { report, stats, written })
}

/// `<name>_samtools_result.tsv`
pub fn write_samtools_result(output_dir: &Path, sample: &SampleSupport) -> Result<PathBuf> {
    let path = output_dir.join(format!("{}_samtools_result.tsv", sample.name));
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(["SNV", "DP", "ALT_COUNT", "VAF"])?;
    for row in &sample.rows {
        writer.write_record([
            row.variant_id.clone(),
            row.depth.to_string(),
            row.alt_count.to_string(),
            row.vaf().map(|v| v.to_string()).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;

    Ok(path)
}

/// `rapport.tsv`
pub fn write_report(output_dir: &Path, report: &OverlapReport) -> Result<PathBuf> {
    let path = output_dir.join("rapport.tsv");
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut header = vec!["GENE:POS".to_string()];
    header.extend(report.names.iter().cloned());
    header.extend(report.names.iter().map(|n| format!("vaf-{}", n)));
    writer.write_record(&header)?;

    for row in &report.rows {
        let mut record = vec![row.key.clone()];
        record.extend(row.counts.iter().map(|(alt, depth)| format!("{}/{}", alt, depth)));
        record.extend(
            row.counts
                .iter()
                .map(|(alt, depth)| format_opt(vaf_percent(*alt, *depth), 2)),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;

    Ok(path)
}

/// `stats.tsv`
pub fn write_stats(output_dir: &Path, reference_name: &str, stats: &[SampleStats]) -> Result<PathBuf> {
    let path = output_dir.join("stats.tsv");
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record([
        "sample".to_string(),
        "Total snv".to_string(),
        format!("snv overlap with {}", reference_name),
        format!("% overlap with {}", reference_name),
        "mean VAF%".to_string(),
        "median VAF%".to_string(),
        "range VAF%".to_string(),
        "std VAF%".to_string(),
        "rank snv overlap".to_string(),
        "rank % overlap".to_string(),
    ])?;

    for s in stats {
        writer.write_record([
            s.name.clone(),
            s.count.to_string(),
            s.overlap.to_string(),
            format!("{:.1}", s.percent_overlap),
            format_opt(s.mean, 1),
            format_opt(s.median, 1),
            s.range(),
            format_opt(s.std, 1),
            format!("{:.1}", s.rank_overlap),
            format!("{:.1}", s.rank_percent_overlap),
        ])?;
    }
    writer.flush()?;

    Ok(path)
}

/// `upset_<min_alt>.tsv`
pub fn write_upset(output_dir: &Path, report: &OverlapReport, min_alt: u32) -> Result<PathBuf> {
    let path = output_dir.join(format!("upset_{}.tsv", min_alt));
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut header = report.names.clone();
    header.push("count".to_string());
    writer.write_record(&header)?;

    for (pattern, count) in report.upset_counts(min_alt) {
        let mut record: Vec<String> = pattern.iter().map(|p| p.to_string()).collect();
        record.push(count.to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;

    Ok(path)
}
