// ==============================================================================
// union.rs - Cross-Sample Variant Unions
// ==============================================================================
// Description: Deduplicated strict/loose unions of per-sample filtered calls
// Author: Matt Barham
// Created: 2026-09-15
// Modified: 2026-10-02
// Version: 1.1.0
// ==============================================================================

use crate::models::{FilteredViews, Tier, UnionSet};

/// Concatenate every sample's filtered calls for `tier` and keep the first
/// occurrence of each variant_id (sample order = slice order).
pub fn build_union(views: &[FilteredViews], tier: Tier) -> UnionSet {
    let mut union = UnionSet::new();
    for call in views.iter().flat_map(|v| v.tier(tier)) {
        union.insert(&call.variant_id, &call.gene_symbol);
    }
    union
}

/// Strict entries first, then loose entries not already present
pub fn combine_unions(strict: &UnionSet, loose: &UnionSet) -> UnionSet {
    strict.iter().chain(loose.iter()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilteredCall;

    fn filtered(id: &str, symbol: &str) -> FilteredCall {
        FilteredCall {
            variant_id: id.to_string(),
            depth: 40,
            alt_count: 10,
            vaf: Some(25.0),
            gene_symbol: symbol.to_string(),
        }
    }

    fn views() -> Vec<FilteredViews> {
        vec![
            FilteredViews {
                strict: vec![filtered("X", "GX"), filtered("Y", "GY1")],
                loose: vec![filtered("L1", "GL1")],
            },
            FilteredViews {
                strict: vec![filtered("Y", "GY2"), filtered("Z", "GZ")],
                loose: vec![filtered("L1", "GL1b"), filtered("X", "GX")],
            },
        ]
    }

    fn ids(union: &UnionSet) -> Vec<&str> {
        union.iter().map(|e| e.variant_id.as_str()).collect()
    }

    #[test]
    fn test_build_union_first_wins() {
        let union = build_union(&views(), Tier::Strict);
        assert_eq!(ids(&union), vec!["X", "Y", "Z"]);
        assert_eq!(union.entries()[1].gene_symbol, "GY1");
    }

    #[test]
    fn test_build_union_is_idempotent() {
        let v = views();
        assert_eq!(build_union(&v, Tier::Loose), build_union(&v, Tier::Loose));
        assert_eq!(build_union(&v, Tier::Strict), build_union(&v, Tier::Strict));
    }

    #[test]
    fn test_empty_input_gives_empty_union() {
        assert!(build_union(&[], Tier::Strict).is_empty());
    }

    #[test]
    fn test_combine_prefers_strict() {
        let v = views();
        let strict = build_union(&v, Tier::Strict);
        let loose = build_union(&v, Tier::Loose);
        let combined = combine_unions(&strict, &loose);

        assert_eq!(ids(&combined), vec!["X", "Y", "Z", "L1"]);
        assert_eq!(combined.entries()[3].gene_symbol, "GL1");
    }
}
