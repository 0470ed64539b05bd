// ==============================================================================
// quality.rs - Alt-read quality analysis
// ==============================================================================
// Description: Collects base and mapping qualities of alt-supporting reads,
//              builds phred histograms and derives per-variant thresholds
// Author: Matt Barham
// Created: 2026-09-24
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Threshold per union variant over the alt scores of every sample:
//   no alt reads        -> 60
//   max score >= 30     -> 5
//   otherwise           -> 20
// ==============================================================================

use anyhow::{Context, Result};
use csv::WriterBuilder;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::{split_variant_id, UnionEntry};
use crate::parsers::pileup::{alt_base_indices, phred_score, PileupParseError, PileupRecord};
use crate::parsers::{read_union_file, sample_name_from_path, PileupParser};

pub const THRESHOLD_NO_ALT_READS: u8 = 60;
pub const THRESHOLD_HIGH_QUALITY: u8 = 5;
pub const THRESHOLD_LOW_QUALITY: u8 = 20;
const HIGH_QUALITY_SCORE: u8 = 30;

pub const ALL_SAMPLES_NAME: &str = "across_all_samples";

/// Phred score -> number of alt reads
pub type Histogram = BTreeMap<u8, usize>;

/// Phred scores of the alt reads covering one variant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AltScores {
    pub base: Vec<u8>,
    pub mapping: Vec<u8>,
}

/// One sample's alt scores, one entry per union variant in union order
#[derive(Debug, Clone, PartialEq)]
pub struct SampleQualities {
    pub name: String,
    pub variants: Vec<AltScores>,
}

impl SampleQualities {
    pub fn base_histogram(&self) -> Histogram {
        histogram(self.variants.iter().flat_map(|v| v.base.iter().copied()))
    }

    pub fn mapping_histogram(&self) -> Histogram {
        histogram(self.variants.iter().flat_map(|v| v.mapping.iter().copied()))
    }
}

fn histogram(scores: impl Iterator<Item = u8>) -> Histogram {
    let mut counts = Histogram::new();
    for score in scores {
        *counts.entry(score).or_insert(0) += 1;
    }
    counts
}

/// Sum histograms over all samples
pub fn combine_histograms<'a>(histograms: impl IntoIterator<Item = &'a Histogram>) -> Histogram {
    let mut combined = Histogram::new();
    for h in histograms {
        for (score, count) in h {
            *combined.entry(*score).or_insert(0) += count;
        }
    }
    combined
}

/// Alt scores for one pileup row
pub fn alt_scores(record: &PileupRecord, alt: &str) -> Result<AltScores, PileupParseError> {
    let indices = alt_base_indices(&record.read_bases(), alt);
    Ok(AltScores {
        base: select_scores(record, &record.base_qualities, &indices)?,
        mapping: select_scores(record, &record.mapping_qualities, &indices)?,
    })
}

fn select_scores(record: &PileupRecord, qualities: &str, indices: &[usize]) -> Result<Vec<u8>, PileupParseError> {
    let chars: Vec<char> = qualities.chars().collect();
    indices
        .iter()
        .map(|&i| {
            let quality = chars.get(i).ok_or_else(|| PileupParseError::QualityLengthMismatch {
                position: record.locus(),
                bases: i + 1,
                qualities: chars.len(),
            })?;
            phred_score(*quality)
        })
        .collect()
}

/// Join pileup rows to union variants by CHROM:POS and collect alt scores
pub fn sample_qualities(
    name: &str,
    union: &[UnionEntry],
    pileup: &[PileupRecord],
) -> Result<SampleQualities, PileupParseError> {
    let mut by_locus: HashMap<(&str, u64), &PileupRecord> = HashMap::new();
    for record in pileup {
        by_locus
            .entry((record.chromosome.as_str(), record.position))
            .or_insert(record);
    }

    let mut variants = Vec::with_capacity(union.len());
    for entry in union {
        let scores = match split_variant_id(&entry.variant_id) {
            Some((chrom, pos, _, alt)) => match by_locus.get(&(chrom, pos)) {
                Some(record) => alt_scores(record, alt)?,
                None => AltScores::default(),
            },
            None => AltScores::default(),
        };
        variants.push(scores);
    }

    Ok(SampleQualities {
        name: name.to_string(),
        variants,
    })
}

/// Threshold for one variant given every sample's alt scores
pub fn quality_threshold(scores: &[u8]) -> u8 {
    match scores.iter().max() {
        None => THRESHOLD_NO_ALT_READS,
        Some(&max) if max >= HIGH_QUALITY_SCORE => THRESHOLD_HIGH_QUALITY,
        Some(_) => THRESHOLD_LOW_QUALITY,
    }
}

/// Per-variant (baseQ, mapQ) thresholds pooled over all samples
pub fn variant_thresholds(samples: &[SampleQualities], variant_count: usize) -> Vec<(u8, u8)> {
    (0..variant_count)
        .map(|i| {
            let base: Vec<u8> = samples
                .iter()
                .filter_map(|s| s.variants.get(i))
                .flat_map(|v| v.base.iter().copied())
                .collect();
            let mapping: Vec<u8> = samples
                .iter()
                .filter_map(|s| s.variants.get(i))
                .flat_map(|v| v.mapping.iter().copied())
                .collect();
            (quality_threshold(&base), quality_threshold(&mapping))
        })
        .collect()
}

/// Summary of a quality run
#[derive(Debug, Clone)]
pub struct QualityRun {
    pub samples: Vec<SampleQualities>,
    pub thresholds: Vec<(u8, u8)>,
    pub written: Vec<PathBuf>,
}

/// Driver: read inputs, collect scores and write every quality output
pub fn run_quality(union_path: &Path, pileups: &[PathBuf], output_dir: &Path) -> Result<QualityRun> {
    let union = read_union_file(union_path)
        .with_context(|| format!("Failed to read union file {}", union_path.display()))?;

    let samples = pileups
        .par_iter()
        .map(|path| {
            let name = sample_name_from_path(path);
            let records = PileupParser::new()
                .parse(path)
                .with_context(|| format!("Failed to read pileup {}", path.display()))?;
            let qualities = sample_qualities(&name, &union, &records)
                .with_context(|| format!("Sample '{}': bad quality string", name))?;
            Ok(qualities)
        })
        .collect::<Result<Vec<_>>>()?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let mut written = Vec::new();
    let mut base_histograms = Vec::with_capacity(samples.len());
    let mut mapping_histograms = Vec::with_capacity(samples.len());

    for sample in &samples {
        let base = sample.base_histogram();
        let mapping = sample.mapping_histogram();
        written.push(write_histogram(output_dir, &format!("{}_baseQ_freq.tsv", sample.name), &base)?);
        written.push(write_histogram(output_dir, &format!("{}_mapQ_freq.tsv", sample.name), &mapping)?);
        base_histograms.push(base);
        mapping_histograms.push(mapping);
    }

    written.push(write_histogram(
        output_dir,
        &format!("{}_baseQ_freq.tsv", ALL_SAMPLES_NAME),
        &combine_histograms(&base_histograms),
    )?);
    written.push(write_histogram(
        output_dir,
        &format!("{}_mapQ_freq.tsv", ALL_SAMPLES_NAME),
        &combine_histograms(&mapping_histograms),
    )?);

    let thresholds = variant_thresholds(&samples, union.len());
    written.push(write_thresholds(output_dir, "baseQ_values.tsv", thresholds.iter().map(|t| t.0))?);
    written.push(write_thresholds(output_dir, "mapQ_values.tsv", thresholds.iter().map(|t| t.1))?);

    info!(
        "Quality thresholds written for {} variants over {} samples",
        union.len(),
        samples.len()
    );

    Ok(QualityRun {
        samples,
        thresholds,
        written,
    })
}

/// Score/count table with a header row
pub fn write_histogram(output_dir: &Path, file_name: &str, histogram: &Histogram) -> Result<PathBuf> {
    let path = output_dir.join(file_name);
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(["score", "count"])?;
    for (score, count) in histogram {
        writer.write_record([score.to_string(), count.to_string()])?;
    }
    writer.flush()?;

    Ok(path)
}

/// One threshold per line, union order, no header
pub fn write_thresholds(output_dir: &Path, file_name: &str, thresholds: impl Iterator<Item = u8>) -> Result<PathBuf> {
    let path = output_dir.join(file_name);
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for threshold in thresholds {
        writer.write_record([threshold.to_string()])?;
    }
    writer.flush()?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(chrom: &str, pos: u64, bases: &str, base_q: &str, map_q: &str) -> PileupRecord {
        PileupRecord {
            chromosome: chrom.to_string(),
            position: pos,
            reference_base: "A".to_string(),
            depth: base_q.len() as u32,
            bases: bases.to_string(),
            base_qualities: base_q.to_string(),
            mapping_qualities: map_q.to_string(),
        }
    }

    fn union() -> Vec<UnionEntry> {
        vec![
            UnionEntry { variant_id: "1:100:A:G".to_string(), gene_symbol: "G1".to_string() },
            UnionEntry { variant_id: "2:200:C:T".to_string(), gene_symbol: "G2".to_string() },
        ]
    }

    #[test]
    fn test_alt_scores_follow_read_indices() {
        // Read bases: ".G,g" -> alt reads at 1 and 3
        let rec = record("1", 100, "^].G$,+1Ag", "!5+I", "]]!]");
        let scores = alt_scores(&rec, "G").unwrap();
        assert_eq!(scores.base, vec![20, 40]);
        assert_eq!(scores.mapping, vec![60, 60]);
    }

    #[test]
    fn test_deletion_placeholder_keeps_quality_alignment() {
        // Reads: ref, deletion, alt; the alt read owns the third quality char
        let rec = record("1", 100, ".*G", "!+I", "!!]");
        let scores = alt_scores(&rec, "G").unwrap();
        assert_eq!(scores.base, vec![40]);
        assert_eq!(scores.mapping, vec![60]);
    }

    #[test]
    fn test_short_quality_string_is_error() {
        let rec = record("1", 100, "..G", "II", "]]]");
        assert!(matches!(
            alt_scores(&rec, "G"),
            Err(PileupParseError::QualityLengthMismatch { qualities: 2, .. })
        ));
    }

    #[test]
    fn test_quality_threshold_rules() {
        assert_eq!(quality_threshold(&[]), 60);
        assert_eq!(quality_threshold(&[12, 30]), 5);
        assert_eq!(quality_threshold(&[12, 29]), 20);
    }

    #[test]
    fn test_histograms_sum_every_sample() {
        let pileup_a = vec![record("1", 100, ".G", "II", "]]")];
        let pileup_b = vec![record("1", 100, "GG", "I5", "]]"), record("2", 200, "t", "5", "!")];
        let pileup_c = vec![record("2", 200, "T", "I", "]")];

        let samples = vec![
            sample_qualities("a", &union(), &pileup_a).unwrap(),
            sample_qualities("b", &union(), &pileup_b).unwrap(),
            sample_qualities("c", &union(), &pileup_c).unwrap(),
        ];

        let base: Vec<Histogram> = samples.iter().map(|s| s.base_histogram()).collect();
        let combined = combine_histograms(&base);
        assert_eq!(combined.get(&40), Some(&3));
        assert_eq!(combined.get(&20), Some(&2));
        assert_eq!(combined.values().sum::<usize>(), 5);

        let thresholds = variant_thresholds(&samples, 2);
        assert_eq!(thresholds[0], (5, 5));
        // Variant 2: base scores 20 and 40, mapping scores 0 and 60
        assert_eq!(thresholds[1], (5, 5));
    }

    #[test]
    fn test_variant_without_alt_reads() {
        let samples = vec![sample_qualities("a", &union(), &[record("1", 100, "..", "II", "]]")]).unwrap()];
        let thresholds = variant_thresholds(&samples, 2);
        assert_eq!(thresholds, vec![(60, 60), (60, 60)]);
    }

    #[test]
    fn test_run_quality_writes_outputs() {
        let dir = tempdir().unwrap();
        let union_path = dir.path().join("union.tsv");
        std::fs::write(&union_path, "1:100:A:G\n2:200:C:T\n").unwrap();

        let tumor = dir.path().join("tumor.txt");
        std::fs::write(&tumor, "1\t100\tA\t3\t.Gg\tI+5\t]]5\n").unwrap();

        let out = dir.path().join("q_scores");
        let run = run_quality(&union_path, &[tumor], &out).unwrap();
        assert_eq!(run.written.len(), 6);

        let base_values = std::fs::read_to_string(out.join("baseQ_values.tsv")).unwrap();
        assert_eq!(base_values, "20\n60\n");
        let map_values = std::fs::read_to_string(out.join("mapQ_values.tsv")).unwrap();
        assert_eq!(map_values, "5\n60\n");

        let freq = std::fs::read_to_string(out.join("tumor_baseQ_freq.tsv")).unwrap();
        assert_eq!(freq, "score\tcount\n10\t1\n20\t1\n");
        assert!(out.join("across_all_samples_mapQ_freq.tsv").exists());
    }
}
