// ==============================================================================
// output.rs - Discovery Output Generation
// ==============================================================================
// Description: Writes per-sample filtered calls, unions, false-positive lists
//              and the JSON run summary to the results directory
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-10-10
// Version: 1.1.0
// ==============================================================================
// Files:
//   <sample>_strict.tsv, <sample>_loose.tsv     header: SNV t_depth t_alt_count VAF SYMBOL
//   false_positives_strict.tsv                  no header: SNV SYMBOL
//   false_positives_loose.tsv                   header: SNV SYMBOL
//   union_strict_with_symbol.tsv, union_strict.tsv
//   union_loose_with_symbol.tsv, union_loose.tsv (combined union)
//   discovery_summary.json
// ==============================================================================

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::discovery::DiscoveryOutcome;
use crate::filter::FilterThresholds;
use crate::models::{FalsePositiveSet, FilteredCall, UnionSet};

pub const FALSE_POSITIVES_STRICT_FILE: &str = "false_positives_strict.tsv";
pub const FALSE_POSITIVES_LOOSE_FILE: &str = "false_positives_loose.tsv";
pub const UNION_STRICT_WITH_SYMBOL_FILE: &str = "union_strict_with_symbol.tsv";
pub const UNION_STRICT_FILE: &str = "union_strict.tsv";
pub const UNION_LOOSE_WITH_SYMBOL_FILE: &str = "union_loose_with_symbol.tsv";
pub const UNION_LOOSE_FILE: &str = "union_loose.tsv";
pub const SUMMARY_FILE: &str = "discovery_summary.json";

/// Per-sample counts in the summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleSummary {
    pub name: String,
    pub strict_snvs: usize,
    pub loose_snvs: usize,
}

/// JSON summary of one discovery run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySummary {
    pub generated_at: String,
    pub strict_filter: FilterThresholds,
    pub loose_filter: FilterThresholds,
    pub samples: Vec<SampleSummary>,
    pub union_strict: usize,
    pub union_loose: usize,
    pub false_positives_strict: usize,
    pub false_positives_loose: usize,
    pub union_strict_no_false_positives: usize,
    pub union_combined: usize,
}

impl DiscoverySummary {
    pub fn new(outcome: &DiscoveryOutcome, strict: &FilterThresholds, loose: &FilterThresholds) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            strict_filter: *strict,
            loose_filter: *loose,
            samples: outcome
                .samples
                .iter()
                .map(|s| SampleSummary {
                    name: s.name.clone(),
                    strict_snvs: s.strict.len(),
                    loose_snvs: s.loose.len(),
                })
                .collect(),
            union_strict: outcome.union_strict.len(),
            union_loose: outcome.union_loose.len(),
            false_positives_strict: outcome.false_positives_strict.len(),
            false_positives_loose: outcome.false_positives_loose.len(),
            union_strict_no_false_positives: outcome.union_strict_no_fp.len(),
            union_combined: outcome.union_combined.len(),
        }
    }
}

/// Writer for the discovery results directory
pub struct OutputGenerator {
    output_dir: PathBuf,
}

impl OutputGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every discovery artifact; returns the paths written, in order
    pub fn write_all(&self, outcome: &DiscoveryOutcome, summary: &DiscoverySummary) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Failed to create results directory {}", self.output_dir.display()))?;

        let mut written = Vec::new();

        for sample in &outcome.samples {
            written.push(self.write_filtered_calls(&format!("{}_strict.tsv", sample.name), &sample.strict)?);
            written.push(self.write_filtered_calls(&format!("{}_loose.tsv", sample.name), &sample.loose)?);
        }

        written.push(self.write_false_positives(FALSE_POSITIVES_STRICT_FILE, &outcome.false_positives_strict, false)?);
        written.push(self.write_false_positives(FALSE_POSITIVES_LOOSE_FILE, &outcome.false_positives_loose, true)?);

        written.push(self.write_union(UNION_STRICT_WITH_SYMBOL_FILE, &outcome.union_strict_no_fp, true)?);
        written.push(self.write_union(UNION_STRICT_FILE, &outcome.union_strict_no_fp, false)?);
        written.push(self.write_union(UNION_LOOSE_WITH_SYMBOL_FILE, &outcome.union_combined, true)?);
        written.push(self.write_union(UNION_LOOSE_FILE, &outcome.union_combined, false)?);

        written.push(self.write_summary(summary)?);

        info!(
            "Wrote {} result files to {}",
            written.len(),
            self.output_dir.display()
        );
        Ok(written)
    }

    /// Per-sample filtered calls with a header row
    pub fn write_filtered_calls(&self, file_name: &str, calls: &[FilteredCall]) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        if calls.is_empty() {
            writer.write_record(["SNV", "t_depth", "t_alt_count", "VAF", "SYMBOL"])?;
        }
        for call in calls {
            writer.serialize(call)?;
        }
        writer.flush()?;

        Ok(path)
    }

    /// Union as SNV[\tSYMBOL] lines without a header
    pub fn write_union(&self, file_name: &str, union: &UnionSet, with_symbol: bool) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        for entry in union.iter() {
            if with_symbol {
                writer.write_record([entry.variant_id.as_str(), entry.gene_symbol.as_str()])?;
            } else {
                writer.write_record([entry.variant_id.as_str()])?;
            }
        }
        writer.flush()?;

        Ok(path)
    }

    /// False positives as SNV\tSYMBOL lines, optionally with a header
    pub fn write_false_positives(&self, file_name: &str, false_positives: &FalsePositiveSet, with_header: bool) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        if with_header {
            writer.write_record(["SNV", "SYMBOL"])?;
        }
        for (variant_id, fp) in false_positives.iter() {
            writer.write_record([variant_id, fp.gene_symbol.as_str()])?;
        }
        writer.flush()?;

        Ok(path)
    }

    pub fn write_summary(&self, summary: &DiscoverySummary) -> Result<PathBuf> {
        let path = self.output_dir.join(SUMMARY_FILE);
        info!("Generating JSON summary: {:?}", path);

        let file = std::fs::File::create(&path)
            .context("Failed to create JSON summary file")?;

        serde_json::to_writer_pretty(file, summary)
            .context("Failed to write JSON summary")?;

        Ok(path)
    }
}
