// ==============================================================================
// reconcile.rs - Cross-Sample False-Positive Reconciliation
// ==============================================================================
// Description: Finds union variants that some sample rejected despite a high
//              VAF and removes them from unions and per-sample outputs
// Author: Matt Barham
// Created: 2026-09-16
// Modified: 2026-10-09
// Version: 1.2.0
// ==============================================================================
// Algorithm:
//   For every sample S and every union variant V:
//     - S has no raw call for V        -> no signal
//     - S rejected V and VAF > threshold -> V flagged by S
//   A variant flagged by any sample is excluded for that tier.
//   Signals are collected per sample in parallel and folded into an
//   ordered set.
// ==============================================================================

use rayon::prelude::*;
use std::collections::HashSet;
use tracing::debug;

use crate::filter::is_rejected_with_high_vaf;
use crate::models::{FalsePositiveSet, FilteredCall, FilteredViews, FinalizedSample, SampleVariantSet, UnionSet};

/// One (sample, variant) pair that raised a false-positive signal
#[derive(Debug, Clone, PartialEq)]
struct Signal<'a> {
    sample: &'a str,
    variant_id: &'a str,
    gene_symbol: &'a str,
}

fn sample_signals<'a>(sample: &'a SampleVariantSet, union: &'a UnionSet, vaf_threshold: f64) -> Vec<Signal<'a>> {
    union
        .iter()
        .filter_map(|entry| {
            let call = sample.get(&entry.variant_id)?;
            if is_rejected_with_high_vaf(call.vaf, &call.filter_status, vaf_threshold) {
                Some(Signal {
                    sample: sample.name(),
                    variant_id: &entry.variant_id,
                    gene_symbol: &entry.gene_symbol,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Union variants rejected with VAF above `vaf_threshold` in any sample's raw calls
pub fn find_false_positives(samples: &[SampleVariantSet], union: &UnionSet, vaf_threshold: f64) -> FalsePositiveSet {
    let signals: Vec<Signal> = samples
        .par_iter()
        .flat_map_iter(|sample| sample_signals(sample, union, vaf_threshold))
        .collect();

    let mut false_positives = FalsePositiveSet::new();
    for signal in &signals {
        debug!(
            "{} rejected in {} with VAF above {}",
            signal.variant_id, signal.sample, vaf_threshold
        );
        false_positives.flag(signal.variant_id, signal.gene_symbol, signal.sample);
    }

    false_positives
}

fn without(calls: &[FilteredCall], false_positives: &FalsePositiveSet) -> Vec<FilteredCall> {
    calls
        .iter()
        .filter(|c| !false_positives.contains(&c.variant_id))
        .cloned()
        .collect()
}

/// Apply both tiers' exclusions to one sample's filtered views
///
/// The loose output is the loose survivors followed by the strict survivors,
/// so every strict-passing call also appears in the loose list.
pub fn finalize_sample(
    name: &str,
    views: &FilteredViews,
    fp_strict: &FalsePositiveSet,
    fp_loose: &FalsePositiveSet,
) -> FinalizedSample {
    let strict = without(&views.strict, fp_strict);
    let mut loose = without(&views.loose, fp_loose);

    let present: HashSet<String> = loose.iter().map(|c| c.variant_id.clone()).collect();
    loose.extend(
        strict
            .iter()
            .filter(|c| !present.contains(&c.variant_id))
            .cloned(),
    );

    FinalizedSample {
        name: name.to_string(),
        strict,
        loose,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{vaf_percent, FilterStatus, UnionEntry, VariantCall};

    fn raw(id: &str, status: FilterStatus, depth: u32, alt: u32) -> VariantCall {
        VariantCall {
            variant_id: id.to_string(),
            gene_symbol: "G".to_string(),
            depth,
            alt_count: alt,
            vaf: vaf_percent(alt, depth),
            filter_status: status,
            variant_classification: Some("Missense_Mutation".to_string()),
            channels: Vec::new(),
        }
    }

    fn union_of(ids: &[&str]) -> UnionSet {
        ids.iter()
            .map(|id| UnionEntry {
                variant_id: id.to_string(),
                gene_symbol: format!("SYM_{}", id),
            })
            .collect()
    }

    fn filtered(id: &str) -> FilteredCall {
        FilteredCall {
            variant_id: id.to_string(),
            depth: 50,
            alt_count: 10,
            vaf: Some(20.0),
            gene_symbol: "G".to_string(),
        }
    }

    #[test]
    fn test_rejected_high_vaf_is_flagged() {
        let a = SampleVariantSet::new("A", vec![raw("X", FilterStatus::Reject, 50, 20)]);
        let b = SampleVariantSet::new("B", vec![raw("Y", FilterStatus::Pass, 50, 20)]);

        let fps = find_false_positives(&[a, b], &union_of(&["X", "Y"]), 5.0);

        assert_eq!(fps.variant_ids().collect::<Vec<_>>(), vec!["X"]);
        let evidence = fps.get("X").unwrap();
        assert_eq!(evidence.gene_symbol, "SYM_X");
        assert_eq!(evidence.flagged_by.iter().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn test_low_vaf_and_zero_depth_rejections_are_ignored() {
        let a = SampleVariantSet::new(
            "A",
            vec![
                raw("X", FilterStatus::Reject, 100, 5),
                raw("Y", FilterStatus::Reject, 0, 0),
            ],
        );

        let fps = find_false_positives(&[a], &union_of(&["X", "Y"]), 5.0);
        assert!(fps.is_empty());
    }

    #[test]
    fn test_last_union_variant_is_checked() {
        let a = SampleVariantSet::new(
            "A",
            vec![
                raw("X", FilterStatus::Pass, 50, 20),
                raw("Z", FilterStatus::Reject, 50, 20),
            ],
        );

        let fps = find_false_positives(&[a], &union_of(&["X", "Y", "Z"]), 5.0);
        assert!(fps.contains("Z"));
    }

    #[test]
    fn test_sample_order_does_not_matter() {
        let samples = vec![
            SampleVariantSet::new("A", vec![raw("X", FilterStatus::Reject, 50, 20)]),
            SampleVariantSet::new("B", vec![raw("Y", FilterStatus::Reject, 40, 30)]),
            SampleVariantSet::new(
                "C",
                vec![raw("X", FilterStatus::Reject, 10, 9), raw("Z", FilterStatus::Pass, 10, 9)],
            ),
        ];
        let union = union_of(&["X", "Y", "Z"]);
        let forward = find_false_positives(&samples, &union, 5.0);

        let mut reversed = samples.clone();
        reversed.reverse();
        assert_eq!(forward, find_false_positives(&reversed, &union, 5.0));

        let rotated = vec![samples[1].clone(), samples[2].clone(), samples[0].clone()];
        assert_eq!(forward, find_false_positives(&rotated, &union, 5.0));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(find_false_positives(&[], &union_of(&["X"]), 5.0).is_empty());

        let a = SampleVariantSet::new("A", vec![raw("X", FilterStatus::Reject, 50, 20)]);
        assert!(find_false_positives(&[a], &UnionSet::new(), 5.0).is_empty());
    }

    #[test]
    fn test_finalize_sample() {
        let views = FilteredViews {
            strict: vec![filtered("S1"), filtered("S2")],
            loose: vec![filtered("L1"), filtered("L2")],
        };

        let mut fp_strict = FalsePositiveSet::new();
        fp_strict.flag("S2", "G", "A");
        let mut fp_loose = FalsePositiveSet::new();
        fp_loose.flag("L1", "G", "A");

        let finalized = finalize_sample("s1", &views, &fp_strict, &fp_loose);

        let strict: Vec<&str> = finalized.strict.iter().map(|c| c.variant_id.as_str()).collect();
        let loose: Vec<&str> = finalized.loose.iter().map(|c| c.variant_id.as_str()).collect();
        assert_eq!(strict, vec!["S1"]);
        assert_eq!(loose, vec!["L2", "S1"]);
    }
}
