// ==============================================================================
// discovery.rs - SNV Discovery Pipeline (in-memory)
// ==============================================================================
// Description: Runs filtering, union building, false-positive reconciliation
//              and exclusion over already-ingested samples
// Author: Matt Barham
// Created: 2026-09-16
// Modified: 2026-10-09
// Version: 1.1.0
// ==============================================================================

use std::collections::HashSet;
use thiserror::Error;
use tracing::info;

use crate::filter::FilterThresholds;
use crate::models::{FalsePositiveSet, FinalizedSample, SampleVariantSet, Tier, UnionSet};
use crate::reconcile::{finalize_sample, find_false_positives};
use crate::sample_filter::filter_samples;
use crate::union::{build_union, combine_unions};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscoveryError {
    #[error("Sample '{0}' was supplied more than once")]
    DuplicateSample(String),
}

/// Everything the discovery pipeline produces
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    /// Per-sample outputs, in input order
    pub samples: Vec<FinalizedSample>,
    pub union_strict: UnionSet,
    pub union_loose: UnionSet,
    pub false_positives_strict: FalsePositiveSet,
    pub false_positives_loose: FalsePositiveSet,
    /// union_strict minus strict false positives
    pub union_strict_no_fp: UnionSet,
    /// Strict survivors followed by the loose-only survivors
    pub union_combined: UnionSet,
}

/// Run the two-tier discovery pipeline over ingested samples
pub fn discover(
    samples: &[SampleVariantSet],
    strict: &FilterThresholds,
    loose: &FilterThresholds,
) -> Result<DiscoveryOutcome, DiscoveryError> {
    let mut names = HashSet::new();
    for sample in samples {
        if !names.insert(sample.name()) {
            return Err(DiscoveryError::DuplicateSample(sample.name().to_string()));
        }
    }

    let views = filter_samples(samples, strict, loose);

    let union_strict = build_union(&views, Tier::Strict);
    let union_loose = build_union(&views, Tier::Loose);
    info!(
        "Unions built: {} strict, {} loose variants",
        union_strict.len(),
        union_loose.len()
    );

    let false_positives_strict = find_false_positives(samples, &union_strict, strict.minimum_vaf_tumor);
    let false_positives_loose = find_false_positives(samples, &union_loose, loose.minimum_vaf_tumor);
    info!(
        "False positives: {} strict, {} loose",
        false_positives_strict.len(),
        false_positives_loose.len()
    );

    let finalized = samples
        .iter()
        .zip(views.iter())
        .map(|(sample, view)| {
            finalize_sample(sample.name(), view, &false_positives_strict, &false_positives_loose)
        })
        .collect();

    let union_strict_no_fp = union_strict.without(&false_positives_strict);
    let union_loose_no_fp = union_loose.without(&false_positives_loose);
    let union_combined = combine_unions(&union_strict_no_fp, &union_loose_no_fp);

    Ok(DiscoveryOutcome {
        samples: finalized,
        union_strict,
        union_loose,
        false_positives_strict,
        false_positives_loose,
        union_strict_no_fp,
        union_combined,
    })
}
