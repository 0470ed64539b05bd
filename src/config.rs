// ==============================================================================
// config.rs - Discovery run configuration
// ==============================================================================
// Description: YAML configuration for filter tiers, directories and samples
// Author: Matt Barham
// Created: 2026-09-15
// Modified: 2026-10-18
// Version: 1.1.0
// ==============================================================================
// Example:
//   working_dir: /data/study
//   results_dir: results
//   strict_filter:
//     minimum_tumor_coverage: 15
//     minimum_alt_read_tumor: 5
//     minimum_vaf_tumor: 5
//     minimum_normal_coverage: 10
//     maximum_alt_read_normal: 1
//   loose_filter: { ... }
//   samples:
//     sample_a: { vcf_file: a.vcf, maf_file: a.maf, type: tumor }
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::filter::{FilterThresholds, ThresholdError};
use crate::models::Tier;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid {tier} filter: {source}")]
    Thresholds {
        tier: &'static str,
        #[source]
        source: ThresholdError,
    },
}

/// Input files for one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleConfig {
    pub vcf_file: PathBuf,
    pub maf_file: PathBuf,

    /// Free-form sample type (e.g. "tumor", "cfdna"), recorded only
    #[serde(rename = "type", default)]
    pub sample_type: Option<String>,
}

/// Resolved input paths for one sample
#[derive(Debug, Clone, PartialEq)]
pub struct SampleInputs {
    pub name: String,
    pub vcf_file: PathBuf,
    pub maf_file: PathBuf,
    pub sample_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub working_dir: PathBuf,
    pub results_dir: PathBuf,
    pub strict_filter: FilterThresholds,
    pub loose_filter: FilterThresholds,

    /// Sorted by sample name
    pub samples: BTreeMap<String, SampleConfig>,
}

impl DiscoveryConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Parse and validate YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: DiscoveryConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (tier, thresholds) in [(Tier::Strict, &self.strict_filter), (Tier::Loose, &self.loose_filter)] {
            thresholds.validate().map_err(|source| ConfigError::Thresholds {
                tier: tier.as_str(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn thresholds(&self, tier: Tier) -> &FilterThresholds {
        match tier {
            Tier::Strict => &self.strict_filter,
            Tier::Loose => &self.loose_filter,
        }
    }

    /// working_dir/results_dir
    pub fn results_path(&self) -> PathBuf {
        self.working_dir.join(&self.results_dir)
    }

    /// Samples in name order with their input paths resolved
    pub fn sample_inputs(&self) -> Vec<SampleInputs> {
        self.samples
            .iter()
            .map(|(name, sample)| SampleInputs {
                name: name.clone(),
                vcf_file: self.resolve(&sample.vcf_file),
                maf_file: self.resolve(&sample.maf_file),
                sample_type: sample.sample_type.clone(),
            })
            .collect()
    }

    /// A path that exists as given is used verbatim, otherwise it is taken
    /// relative to working_dir
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.exists() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CONFIG: &str = r#"
working_dir: /data/study
results_dir: results
strict_filter:
  minimum_tumor_coverage: 15
  minimum_alt_read_tumor: 5
  minimum_vaf_tumor: 5
  minimum_normal_coverage: 10
  maksimum_alt_read_normal: 1
loose_filter:
  minimum_tumor_coverage: 8
  minimum_alt_read_tumor: 3
  minimum_vaf_tumor: 2.5
  minimum_normal_coverage: 6
  maximum_alt_read_normal: 2
samples:
  zeta:
    vcf_file: zeta.vcf
    maf_file: zeta.maf
    type: cfdna
  alpha:
    vcf_file: alpha.vcf
    maf_file: alpha.maf
"#;

    #[test]
    fn test_parse_config() {
        let config = DiscoveryConfig::from_yaml(CONFIG).unwrap();

        assert_eq!(config.strict_filter.maximum_alt_read_normal, 1);
        assert_eq!(config.thresholds(Tier::Loose).minimum_vaf_tumor, 2.5);
        assert_eq!(config.results_path(), PathBuf::from("/data/study/results"));

        let inputs = config.sample_inputs();
        let names: Vec<&str> = inputs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(inputs[0].vcf_file, PathBuf::from("/data/study/alpha.vcf"));
        assert_eq!(inputs[0].sample_type, None);
        assert_eq!(inputs[1].sample_type.as_deref(), Some("cfdna"));
    }

    #[test]
    fn test_existing_path_used_verbatim() {
        let dir = tempdir().unwrap();
        let vcf = dir.path().join("alpha.vcf");
        std::fs::write(&vcf, "##fileformat=VCFv4.2\n").unwrap();

        let yaml = CONFIG.replace("vcf_file: alpha.vcf", &format!("vcf_file: {}", vcf.display()));
        let config = DiscoveryConfig::from_yaml(&yaml).unwrap();

        let inputs = config.sample_inputs();
        assert_eq!(inputs[0].vcf_file, vcf);
        assert_eq!(inputs[0].maf_file, PathBuf::from("/data/study/alpha.maf"));
    }

    #[test]
    fn test_invalid_vaf_threshold() {
        let yaml = CONFIG.replace("minimum_vaf_tumor: 2.5", "minimum_vaf_tumor: 250");
        match DiscoveryConfig::from_yaml(&yaml) {
            Err(ConfigError::Thresholds { tier, source }) => {
                assert_eq!(tier, "loose");
                assert_eq!(source, ThresholdError::VafOutOfRange(250.0));
            }
            other => panic!("Expected Thresholds error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_filter_is_error() {
        let yaml = "working_dir: .\nresults_dir: r\nsamples: {}\n";
        assert!(matches!(DiscoveryConfig::from_yaml(yaml), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_empty_samples_config() {
        let (head, _) = CONFIG.split_once("samples:").unwrap();
        let yaml = format!("{}samples: {{}}\n", head);

        let config = DiscoveryConfig::from_yaml(&yaml).unwrap();
        assert!(config.samples.is_empty());
        assert!(config.sample_inputs().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let result = DiscoveryConfig::from_file("/nonexistent/config.yaml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
