// ==============================================================================
// processor.rs - Discovery Run Driver
// ==============================================================================
// Description: Loads configuration, validates and ingests every sample, runs
//              two-tier discovery and writes results plus the run manifest
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-18
// Version: 2.1.0
// ==============================================================================

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::{DiscoveryConfig, SampleInputs};
use crate::discovery::{discover, DiscoveryOutcome};
use crate::ingest::load_sample;
use crate::manifest::{LogSeverity, RunEvent, RunEventType, RunManifest};
use crate::models::{SampleVariantSet, Tier};
use crate::output::{DiscoverySummary, OutputGenerator};
use crate::validator::InputValidator;

pub const MANIFEST_FILE: &str = "run_manifest.json";

/// Result of a completed discovery run
#[derive(Debug)]
pub struct DiscoveryReport {
    pub outcome: DiscoveryOutcome,
    pub results_dir: PathBuf,
    pub written: Vec<PathBuf>,
    pub manifest_path: PathBuf,
}

pub struct DiscoveryProcessor {
    config: DiscoveryConfig,
    validator: InputValidator,
}

impl DiscoveryProcessor {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self {
            config,
            validator: InputValidator::new(),
        }
    }

    pub fn from_config_file(path: &Path) -> Result<Self> {
        let config = DiscoveryConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?;
        Ok(Self::new(config))
    }

    /// Main processing pipeline
    pub fn process(&self) -> Result<DiscoveryReport> {
        let results_dir = self.config.results_path();
        std::fs::create_dir_all(&results_dir)
            .with_context(|| format!("Failed to create results directory {}", results_dir.display()))?;

        let manifest_path = results_dir.join(MANIFEST_FILE);
        let mut manifest = RunManifest::new();

        info!(
            "Starting discovery run {} over {} samples",
            manifest.run_id,
            self.config.samples.len()
        );

        let result = self.run(&results_dir, &mut manifest);

        match &result {
            Ok(_) => manifest.finish(Ok(())),
            Err(e) => {
                error!("Discovery run failed: {:#}", e);
                manifest.finish(Err(format!("{:#}", e)));
            }
        }
        manifest
            .write(&manifest_path)
            .with_context(|| format!("Failed to write {}", manifest_path.display()))?;

        let (outcome, written) = result?;
        info!("Discovery run {} complete", manifest.run_id);

        Ok(DiscoveryReport {
            outcome,
            results_dir,
            written,
            manifest_path,
        })
    }

    fn run(&self, results_dir: &Path, manifest: &mut RunManifest) -> Result<(DiscoveryOutcome, Vec<PathBuf>)> {
        let inputs = self.config.sample_inputs();
        if inputs.is_empty() {
            warn!("No samples configured; writing empty results");
        }

        // 1. Validate inputs
        for input in &inputs {
            for path in [&input.vcf_file, &input.maf_file] {
                let validated = self
                    .validator
                    .validate(path)
                    .with_context(|| format!("Sample '{}': invalid input {}", input.name, path.display()))?;
                manifest.record_input(&input.name, &validated);
            }
        }

        // 2. Ingest samples
        let samples = self.ingest(&inputs)?;
        for (input, sample) in inputs.iter().zip(samples.iter()) {
            manifest.record(RunEvent::new(
                RunEventType::SampleIngested,
                Some(sample.name().to_string()),
                Some(input.vcf_file.display().to_string()),
                serde_json::json!({
                    "variants": sample.len(),
                    "type": input.sample_type,
                }),
            ));
        }

        // 3. Discovery
        let strict = self.config.thresholds(Tier::Strict);
        let loose = self.config.thresholds(Tier::Loose);
        let outcome = discover(&samples, strict, loose).context("Discovery failed")?;
        self.record_outcome(manifest, &outcome);

        // 4. Outputs
        let summary = DiscoverySummary::new(&outcome, strict, loose);
        let written = OutputGenerator::new(results_dir).write_all(&outcome, &summary)?;
        for path in &written {
            manifest.record(RunEvent::new(
                RunEventType::OutputWritten,
                None,
                Some(path.display().to_string()),
                serde_json::json!({}),
            ));
        }

        Ok((outcome, written))
    }

    fn ingest(&self, inputs: &[SampleInputs]) -> Result<Vec<SampleVariantSet>> {
        info!("Ingesting {} samples", inputs.len());

        let samples = inputs
            .par_iter()
            .map(|input| load_sample(&input.name, &input.vcf_file, &input.maf_file))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(samples)
    }

    fn record_outcome(&self, manifest: &mut RunManifest, outcome: &DiscoveryOutcome) {
        for sample in &outcome.samples {
            let event = RunEvent::new(
                RunEventType::SampleFiltered,
                Some(sample.name.clone()),
                None,
                serde_json::json!({
                    "strict": sample.strict.len(),
                    "loose": sample.loose.len(),
                }),
            );

            if sample.strict.is_empty() && sample.loose.is_empty() {
                warn!("Sample '{}' has no calls left after filtering", sample.name);
                manifest.record(event.with_severity(LogSeverity::Warning));
            } else {
                manifest.record(event);
            }
        }

        for (tier, union) in [(Tier::Strict, &outcome.union_strict), (Tier::Loose, &outcome.union_loose)] {
            manifest.record(RunEvent::new(
                RunEventType::UnionBuilt,
                None,
                None,
                serde_json::json!({ "tier": tier, "variants": union.len() }),
            ));
        }

        for (tier, fps) in [
            (Tier::Strict, &outcome.false_positives_strict),
            (Tier::Loose, &outcome.false_positives_loose),
        ] {
            let variants: Vec<&str> = fps.variant_ids().collect();
            manifest.record(RunEvent::new(
                RunEventType::FalsePositivesFound,
                None,
                None,
                serde_json::json!({ "tier": tier, "count": variants.len(), "variants": variants }),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const VCF_HEADER: &str = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNORMAL\tTUMOR\n";
    const MAF_HEADER: &str = "#version 2.4\nHugo_Symbol\tChromosome\tVariant_Classification\tt_depth\tt_alt_count\tSYMBOL\n";

    fn write_sample(dir: &Path, name: &str, vcf_rows: &str, maf_rows: &str) {
        std::fs::write(dir.join(format!("{}.vcf", name)), format!("{}{}", VCF_HEADER, vcf_rows)).unwrap();
        std::fs::write(dir.join(format!("{}.maf", name)), format!("{}{}", MAF_HEADER, maf_rows)).unwrap();
    }

    const TWO_SAMPLES: &str = "
  sample1: {vcf_file: sample1.vcf, maf_file: sample1.maf, type: tumor}
  sample2: {vcf_file: sample2.vcf, maf_file: sample2.maf, type: tumor}
";

    fn config(working_dir: &Path) -> DiscoveryConfig {
        config_with_samples(working_dir, TWO_SAMPLES)
    }

    fn config_with_samples(working_dir: &Path, samples: &str) -> DiscoveryConfig {
        let yaml = format!(
            r#"
working_dir: {}
results_dir: results
strict_filter:
  minimum_tumor_coverage: 15
  minimum_alt_read_tumor: 5
  minimum_vaf_tumor: 5
  minimum_normal_coverage: 10
  maximum_alt_read_normal: 1
loose_filter:
  minimum_tumor_coverage: 8
  minimum_alt_read_tumor: 3
  minimum_vaf_tumor: 3
  minimum_normal_coverage: 6
  maximum_alt_read_normal: 2
samples: {}
"#,
            working_dir.display(),
            samples
        );
        DiscoveryConfig::from_yaml(&yaml).unwrap()
    }

    #[test]
    fn test_process_end_to_end() {
        let dir = tempdir().unwrap();

        // sample1 passes X and Y; sample2 passes Y and Z but rejects X at 30% VAF
        write_sample(
            dir.path(),
            "sample1",
            "1\t100\t.\tA\tG\t.\tPASS\t.\tGT:AD:DP\t0/0:40,0:40\t0/1:60,20:80\n\
             2\t200\t.\tC\tT\t.\tPASS\t.\tGT:AD:DP\t0/0:40,0:40\t0/1:60,20:80\n",
            "GX\t1\tMissense_Mutation\t80\t20\tGX\n\
             GY\t2\tNonsense_Mutation\t80\t20\tGY\n",
        );
        write_sample(
            dir.path(),
            "sample2",
            "2\t200\t.\tC\tT\t.\tPASS\t.\tGT:AD:DP\t0/0:40,0:40\t0/1:60,20:80\n\
             3\t300\t.\tG\tA\t.\tPASS\t.\tGT:AD:DP\t0/0:40,0:40\t0/1:60,20:80\n\
             1\t100\t.\tA\tG\t.\tREJECT\t.\tGT:AD:DP\t0/0:40,0:40\t0/1:70,30:100\n",
            "GY\t2\tNonsense_Mutation\t80\t20\tGY\n\
             GZ\t3\tMissense_Mutation\t80\t20\tGZ\n\
             GX\t1\tMissense_Mutation\t100\t30\tGX\n",
        );

        let report = DiscoveryProcessor::new(config(dir.path())).process().unwrap();

        assert!(report.outcome.false_positives_strict.contains("1:100:A:G"));
        assert_eq!(report.results_dir, dir.path().join("results"));

        let union = std::fs::read_to_string(report.results_dir.join("union_strict.tsv")).unwrap();
        assert_eq!(union, "2:200:C:T\n3:300:G:A\n");

        let fps = std::fs::read_to_string(report.results_dir.join("false_positives_strict.tsv")).unwrap();
        assert_eq!(fps, "1:100:A:G\tGX\n");

        let sample1 = std::fs::read_to_string(report.results_dir.join("sample1_strict.tsv")).unwrap();
        assert_eq!(sample1, "SNV\tt_depth\tt_alt_count\tVAF\tSYMBOL\n2:200:C:T\t80\t20\t25.0\tGY\n");

        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report.manifest_path).unwrap()).unwrap();
        assert_eq!(manifest["inputs"].as_array().unwrap().len(), 4);
        let events = manifest["events"].as_array().unwrap();
        assert_eq!(events.last().unwrap()["event_type"], "run_completed");
    }

    #[test]
    fn test_empty_samples_writes_empty_results() {
        let dir = tempdir().unwrap();

        let report = DiscoveryProcessor::new(config_with_samples(dir.path(), "{}"))
            .process()
            .unwrap();

        assert!(report.outcome.samples.is_empty());
        assert!(report.outcome.union_combined.is_empty());
        let union = std::fs::read_to_string(report.results_dir.join("union_strict.tsv")).unwrap();
        assert_eq!(union, "");

        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report.manifest_path).unwrap()).unwrap();
        let events = manifest["events"].as_array().unwrap();
        assert_eq!(events.last().unwrap()["event_type"], "run_completed");
    }

    #[test]
    fn test_sample_without_calls_is_flagged_in_manifest() {
        let dir = tempdir().unwrap();
        write_sample(
            dir.path(),
            "sample1",
            "1\t100\t.\tA\tG\t.\tPASS\t.\tGT:AD:DP\t0/0:40,0:40\t0/1:60,20:80\n",
            "GX\t1\tMissense_Mutation\t80\t20\tGX\n",
        );
        write_sample(
            dir.path(),
            "sample2",
            "2\t200\t.\tC\tT\t.\tPASS\t.\tGT:AD:DP\t0/0:40,0:40\t0/1:60,20:80\n",
            "GY\t2\tIntron\t80\t20\tGY\n",
        );

        let report = DiscoveryProcessor::new(config(dir.path())).process().unwrap();

        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report.manifest_path).unwrap()).unwrap();
        let filtered: Vec<&serde_json::Value> = manifest["events"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|e| e["event_type"] == "sample_filtered")
            .collect();

        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0]["sample"], "sample1");
        assert_eq!(filtered[0]["severity"], "info");
        assert_eq!(filtered[1]["sample"], "sample2");
        assert_eq!(filtered[1]["severity"], "warning");
    }

    #[test]
    fn test_failed_run_still_writes_manifest() {
        let dir = tempdir().unwrap();
        write_sample(
            dir.path(),
            "sample1",
            "1\t100\t.\tA\tG\t.\tPASS\t.\tGT:AD:DP\t0/0:40,0:40\t0/1:60,20:80\n",
            "",
        );
        write_sample(dir.path(), "sample2", "", "");

        let result = DiscoveryProcessor::new(config(dir.path())).process();
        assert!(result.is_err());

        let manifest_path = dir.path().join("results").join(MANIFEST_FILE);
        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(manifest_path).unwrap()).unwrap();
        let events = manifest["events"].as_array().unwrap();
        assert_eq!(events.last().unwrap()["event_type"], "run_failed");
        assert_eq!(events.last().unwrap()["severity"], "error");
    }
}
