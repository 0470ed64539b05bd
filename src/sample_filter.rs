// ==============================================================================
// sample_filter.rs - Per-Sample Two-Tier Filtering
// ==============================================================================
// Description: Builds the strict and loose filtered views for one sample
// Author: Matt Barham
// Created: 2026-09-15
// Modified: 2026-10-02
// Version: 1.1.0
// ==============================================================================
// Pipeline (per sample):
//   1. FILTER == PASS
//   2. classification present and exonic
//   3. strict: every genotype channel passes strict thresholds
//   4. loose: PASS+exonic minus strict ids, every channel passes loose thresholds
// ==============================================================================

use rayon::prelude::*;
use std::collections::HashSet;
use tracing::debug;

use crate::filter::{is_exonic, passes_snv_filter, FilterThresholds};
use crate::models::{FilterStatus, FilteredCall, FilteredViews, SampleVariantSet, VariantCall};

/// PASS calls with a present, exonic classification
pub fn passed_exonic(sample: &SampleVariantSet) -> Vec<&VariantCall> {
    sample
        .calls()
        .iter()
        .filter(|call| call.filter_status == FilterStatus::Pass)
        .filter(|call| {
            call.variant_classification
                .as_deref()
                .map(is_exonic)
                .unwrap_or(false)
        })
        .collect()
}

fn passes_all_channels(call: &VariantCall, thresholds: &FilterThresholds) -> bool {
    call.channels
        .iter()
        .all(|channel| passes_snv_filter(channel, thresholds))
}

/// Strict then loose-excluding-strict filtering for one sample
pub fn filter_sample(
    sample: &SampleVariantSet,
    strict: &FilterThresholds,
    loose: &FilterThresholds,
) -> FilteredViews {
    let candidates = passed_exonic(sample);

    let strict_calls: Vec<FilteredCall> = candidates
        .iter()
        .filter(|call| passes_all_channels(call, strict))
        .map(|call| FilteredCall::from(*call))
        .collect();

    let strict_ids: HashSet<&str> = strict_calls
        .iter()
        .map(|c| c.variant_id.as_str())
        .collect();

    let loose_calls: Vec<FilteredCall> = candidates
        .iter()
        .filter(|call| !strict_ids.contains(call.variant_id.as_str()))
        .filter(|call| passes_all_channels(call, loose))
        .map(|call| FilteredCall::from(*call))
        .collect();

    debug!(
        "Sample {}: {} calls, {} PASS+exonic, {} strict, {} loose",
        sample.name(),
        sample.len(),
        candidates.len(),
        strict_calls.len(),
        loose_calls.len()
    );

    FilteredViews {
        strict: strict_calls,
        loose: loose_calls,
    }
}

/// Filter every sample independently; output order follows input order
pub fn filter_samples(
    samples: &[SampleVariantSet],
    strict: &FilterThresholds,
    loose: &FilterThresholds,
) -> Vec<FilteredViews> {
    samples
        .par_iter()
        .map(|sample| filter_sample(sample, strict, loose))
        .collect()
}
