// ==============================================================================
// filter.rs - SNV Filter Predicates
// ==============================================================================
// Description: Strict/loose coverage, alt-read and VAF thresholds applied to a
//              single genotype call, plus exonic and rejected-call predicates
// Author: Matt Barham
// Created: 2026-09-14
// Modified: 2026-10-02
// Version: 1.1.0
// ==============================================================================
// Rules:
//   - Genotype "0/1" (tumor pattern):
//       DP >= minimum_tumor_coverage
//       ALT >= minimum_alt_read_tumor
//       VAF >= minimum_vaf_tumor        (no VAF when DP = 0 -> fails)
//   - Any other genotype (normal pattern):
//       DP >= minimum_normal_coverage
//       ALT <= maximum_alt_read_normal
// ==============================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{FilterStatus, GenotypeCall};

/// Variant classifications that do not count as exonic
pub const NON_EXONIC_CLASSIFICATIONS: [&str; 7] = [
    "5'Flank", "Intron", "RNA", "3'Flank", "3'UTR", "5'UTR", "IGR",
];

/// Invalid threshold configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("minimum_vaf_tumor must be between 0 and 100, got {0}")]
    VafOutOfRange(f64),
}

/// One filter tier's thresholds (strict or loose)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterThresholds {
    pub minimum_tumor_coverage: u32,
    pub minimum_alt_read_tumor: u32,
    /// Percent (0-100)
    pub minimum_vaf_tumor: f64,
    pub minimum_normal_coverage: u32,
    #[serde(alias = "maksimum_alt_read_normal")]
    pub maximum_alt_read_normal: u32,
}

impl FilterThresholds {
    pub fn validate(&self) -> Result<(), ThresholdError> {
        if !(0.0..=100.0).contains(&self.minimum_vaf_tumor) {
            return Err(ThresholdError::VafOutOfRange(self.minimum_vaf_tumor));
        }
        Ok(())
    }
}

/// Test one genotype call against a tier's thresholds
///
/// Tumor-pattern calls without coverage have no VAF and never pass; the
/// comparison is skipped rather than evaluated against NaN.
pub fn passes_snv_filter(call: &GenotypeCall, thresholds: &FilterThresholds) -> bool {
    if call.is_tumor_pattern() {
        match call.vaf() {
            Some(vaf) => {
                call.depth >= thresholds.minimum_tumor_coverage
                    && call.alt_count >= thresholds.minimum_alt_read_tumor
                    && vaf >= thresholds.minimum_vaf_tumor
            }
            None => false,
        }
    } else {
        call.depth >= thresholds.minimum_normal_coverage
            && call.alt_count <= thresholds.maximum_alt_read_normal
    }
}

/// True unless the classification is in the closed non-exonic set
pub fn is_exonic(variant_classification: &str) -> bool {
    !NON_EXONIC_CLASSIFICATIONS.contains(&variant_classification)
}

/// Raw call rejected by the caller even though its VAF clears the threshold
pub fn is_rejected_with_high_vaf(vaf: Option<f64>, status: &FilterStatus, vaf_threshold: f64) -> bool {
    match vaf {
        Some(vaf) => *status == FilterStatus::Reject && vaf > vaf_threshold,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> FilterThresholds {
        FilterThresholds {
            minimum_tumor_coverage: 15,
            minimum_alt_read_tumor: 5,
            minimum_vaf_tumor: 5.0,
            minimum_normal_coverage: 10,
            maximum_alt_read_normal: 1,
        }
    }

    #[test]
    fn test_tumor_pattern_pass_and_fail() {
        let t = thresholds();
        let call = GenotypeCall::new("0/1", 80, 20);
        assert_eq!(call.vaf(), Some(25.0));
        assert!(passes_snv_filter(&call, &t));

        let low_alt = GenotypeCall::new("0/1", 80, 3);
        assert!(!passes_snv_filter(&low_alt, &t));
    }

    #[test]
    fn test_tumor_pattern_boundaries() {
        let t = thresholds();
        // Exactly at every minimum: 15 reads, 5 alt, VAF 33.3
        assert!(passes_snv_filter(&GenotypeCall::new("0/1", 15, 5), &t));
        // Coverage one short
        assert!(!passes_snv_filter(&GenotypeCall::new("0/1", 14, 5), &t));
        // VAF below 5%: 5 / 200 = 2.5%
        assert!(!passes_snv_filter(&GenotypeCall::new("0/1", 200, 5), &t));
    }

    #[test]
    fn test_tumor_pattern_without_coverage_fails() {
        let t = FilterThresholds {
            minimum_tumor_coverage: 0,
            minimum_alt_read_tumor: 0,
            minimum_vaf_tumor: 0.0,
            ..thresholds()
        };
        assert!(!passes_snv_filter(&GenotypeCall::new("0/1", 0, 0), &t));
    }

    #[test]
    fn test_normal_pattern() {
        let t = thresholds();
        assert!(passes_snv_filter(&GenotypeCall::new("0/0", 10, 1), &t));
        assert!(!passes_snv_filter(&GenotypeCall::new("0/0", 10, 2), &t));
        assert!(!passes_snv_filter(&GenotypeCall::new("0/0", 9, 0), &t));
        // Anything that is not "0/1" uses the normal rule
        assert!(passes_snv_filter(&GenotypeCall::new("1/1", 30, 0), &t));
    }

    #[test]
    fn test_is_exonic() {
        assert!(!is_exonic("Intron"));
        assert!(!is_exonic("IGR"));
        assert!(!is_exonic("3'UTR"));
        assert!(is_exonic("Missense_Mutation"));
        assert!(is_exonic("Something_New"));
        assert!(is_exonic(""));
    }

    #[test]
    fn test_is_rejected_with_high_vaf() {
        assert!(is_rejected_with_high_vaf(Some(40.0), &FilterStatus::Reject, 5.0));
        assert!(!is_rejected_with_high_vaf(Some(5.0), &FilterStatus::Reject, 5.0));
        assert!(!is_rejected_with_high_vaf(Some(40.0), &FilterStatus::Pass, 5.0));
        assert!(!is_rejected_with_high_vaf(
            Some(40.0),
            &FilterStatus::Other("LowQual".to_string()),
            5.0
        ));
        assert!(!is_rejected_with_high_vaf(None, &FilterStatus::Reject, 5.0));
    }

    #[test]
    fn test_threshold_validation() {
        assert!(thresholds().validate().is_ok());

        let bad = FilterThresholds {
            minimum_vaf_tumor: 150.0,
            ..thresholds()
        };
        assert_eq!(bad.validate(), Err(ThresholdError::VafOutOfRange(150.0)));
    }

    #[test]
    fn test_thresholds_accept_misspelled_alias() {
        let yaml = "minimum_tumor_coverage: 15\n\
                    minimum_alt_read_tumor: 5\n\
                    minimum_vaf_tumor: 5\n\
                    minimum_normal_coverage: 10\n\
                    maksimum_alt_read_normal: 1\n";
        let parsed: FilterThresholds = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed, thresholds());
    }
}
