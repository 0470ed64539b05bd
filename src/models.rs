// ==============================================================================
// models.rs - Somatic Variant Data Models
// ==============================================================================
// Description: Data structures for per-sample SNV calls, filtered views,
//              unions and false-positive sets
// Author: Matt Barham
// Created: 2026-09-14
// Modified: 2026-10-09
// Version: 1.1.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

/// Genotype string that marks a heterozygous tumor-pattern call
pub const TUMOR_PATTERN_GENOTYPE: &str = "0/1";

/// Raw FILTER column value from the variant caller
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterStatus {
    Pass,
    Reject,
    /// Any other caller flag (e.g. "LowQual", ".")
    Other(String),
}

impl FilterStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PASS" => FilterStatus::Pass,
            "REJECT" => FilterStatus::Reject,
            other => FilterStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FilterStatus::Pass => "PASS",
            FilterStatus::Reject => "REJECT",
            FilterStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for FilterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter tier a set of thresholds or a derived artifact belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Strict,
    Loose,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Strict => "strict",
            Tier::Loose => "loose",
        }
    }
}

/// Variant allele frequency in percent, `None` when there is no coverage
pub fn vaf_percent(alt_count: u32, depth: u32) -> Option<f64> {
    if depth == 0 {
        None
    } else {
        Some(f64::from(alt_count) * 100.0 / f64::from(depth))
    }
}

/// Genotype evidence from one sample column of a VCF row (GT, AD, DP)
#[derive(Debug, Clone, PartialEq)]
pub struct GenotypeCall {
    /// Diploid genotype (e.g., "0/1", "0/0")
    pub genotype: String,

    /// Read depth (DP)
    pub depth: u32,

    /// Reads supporting the first alternate allele (second AD entry)
    pub alt_count: u32,
}

impl GenotypeCall {
    pub fn new(genotype: impl Into<String>, depth: u32, alt_count: u32) -> Self {
        Self {
            genotype: genotype.into(),
            depth,
            alt_count,
        }
    }

    pub fn is_tumor_pattern(&self) -> bool {
        self.genotype == TUMOR_PATTERN_GENOTYPE
    }

    pub fn vaf(&self) -> Option<f64> {
        vaf_percent(self.alt_count, self.depth)
    }
}

/// One row of evidence for a (sample, locus) pair
#[derive(Debug, Clone, PartialEq)]
pub struct VariantCall {
    /// CHROM:POS:REF:ALT, the join key across samples
    pub variant_id: String,

    /// Gene symbol from the MAF annotation (may be empty)
    pub gene_symbol: String,

    /// Tumor read depth (MAF t_depth)
    pub depth: u32,

    /// Tumor alternate read count (MAF t_alt_count)
    pub alt_count: u32,

    /// 100 * alt_count / depth, None when depth is zero
    pub vaf: Option<f64>,

    pub filter_status: FilterStatus,

    /// Functional annotation (e.g., "Missense_Mutation"), None when absent
    pub variant_classification: Option<String>,

    /// Genotype evidence per VCF sample column, in column order
    pub channels: Vec<GenotypeCall>,
}

/// Full, immutable call collection for one named sample
#[derive(Debug, Clone)]
pub struct SampleVariantSet {
    name: String,
    calls: Vec<VariantCall>,
    index: HashMap<String, usize>,
}

impl SampleVariantSet {
    /// Build the set and its variant_id index. Duplicate ids keep the first row.
    pub fn new(name: impl Into<String>, calls: Vec<VariantCall>) -> Self {
        let mut index = HashMap::with_capacity(calls.len());
        for (idx, call) in calls.iter().enumerate() {
            index.entry(call.variant_id.clone()).or_insert(idx);
        }

        Self {
            name: name.into(),
            calls,
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn calls(&self) -> &[VariantCall] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn get(&self, variant_id: &str) -> Option<&VariantCall> {
        self.index.get(variant_id).map(|&idx| &self.calls[idx])
    }

    pub fn contains(&self, variant_id: &str) -> bool {
        self.index.contains_key(variant_id)
    }
}

/// Filtered call as written to the per-sample outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredCall {
    #[serde(rename = "SNV")]
    pub variant_id: String,

    #[serde(rename = "t_depth")]
    pub depth: u32,

    #[serde(rename = "t_alt_count")]
    pub alt_count: u32,

    #[serde(rename = "VAF")]
    pub vaf: Option<f64>,

    #[serde(rename = "SYMBOL")]
    pub gene_symbol: String,
}

impl From<&VariantCall> for FilteredCall {
    fn from(call: &VariantCall) -> Self {
        Self {
            variant_id: call.variant_id.clone(),
            depth: call.depth,
            alt_count: call.alt_count,
            vaf: call.vaf,
            gene_symbol: call.gene_symbol.clone(),
        }
    }
}

/// Strict and loose filtered views of one sample, disjoint by construction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredViews {
    pub strict: Vec<FilteredCall>,
    pub loose: Vec<FilteredCall>,
}

impl FilteredViews {
    pub fn tier(&self, tier: Tier) -> &[FilteredCall] {
        match tier {
            Tier::Strict => &self.strict,
            Tier::Loose => &self.loose,
        }
    }
}

/// Per-sample result after false-positive exclusion
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedSample {
    pub name: String,
    pub strict: Vec<FilteredCall>,
    /// Loose survivors followed by the strict survivors
    pub loose: Vec<FilteredCall>,
}

/// Union entry as written to the union outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionEntry {
    #[serde(rename = "SNV")]
    pub variant_id: String,

    #[serde(rename = "SYMBOL")]
    pub gene_symbol: String,
}

/// Ordered, deduplicated variant_id -> gene_symbol mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnionSet {
    entries: Vec<UnionEntry>,
    seen: HashSet<String>,
}

impl UnionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the variant is already present (first occurrence wins).
    /// Returns true when the entry was added.
    pub fn insert(&mut self, variant_id: &str, gene_symbol: &str) -> bool {
        if self.seen.contains(variant_id) {
            return false;
        }
        self.seen.insert(variant_id.to_string());
        self.entries.push(UnionEntry {
            variant_id: variant_id.to_string(),
            gene_symbol: gene_symbol.to_string(),
        });
        true
    }

    pub fn contains(&self, variant_id: &str) -> bool {
        self.seen.contains(variant_id)
    }

    pub fn entries(&self) -> &[UnionEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnionEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of this union without the given false positives, order preserved
    pub fn without(&self, false_positives: &FalsePositiveSet) -> UnionSet {
        let mut kept = UnionSet::new();
        for entry in self
            .entries
            .iter()
            .filter(|e| !false_positives.contains(&e.variant_id))
        {
            kept.insert(&entry.variant_id, &entry.gene_symbol);
        }
        kept
    }
}

impl FromIterator<UnionEntry> for UnionSet {
    fn from_iter<I: IntoIterator<Item = UnionEntry>>(iter: I) -> Self {
        let mut union = UnionSet::new();
        for entry in iter {
            union.insert(&entry.variant_id, &entry.gene_symbol);
        }
        union
    }
}

/// Evidence behind one false-positive exclusion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FalsePositive {
    pub gene_symbol: String,
    /// Samples whose raw call was rejected despite a high VAF
    pub flagged_by: BTreeSet<String>,
}

/// Variants excluded genome-wide for one tier; compared as a set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FalsePositiveSet {
    variants: BTreeMap<String, FalsePositive>,
}

impl FalsePositiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&mut self, variant_id: &str, gene_symbol: &str, sample: &str) {
        self.variants
            .entry(variant_id.to_string())
            .or_insert_with(|| FalsePositive {
                gene_symbol: gene_symbol.to_string(),
                flagged_by: BTreeSet::new(),
            })
            .flagged_by
            .insert(sample.to_string());
    }

    pub fn contains(&self, variant_id: &str) -> bool {
        self.variants.contains_key(variant_id)
    }

    pub fn get(&self, variant_id: &str) -> Option<&FalsePositive> {
        self.variants.get(variant_id)
    }

    pub fn variant_ids(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FalsePositive)> {
        self.variants.iter().map(|(id, fp)| (id.as_str(), fp))
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// Split a CHROM:POS:REF:ALT identifier into its parts
pub fn split_variant_id(variant_id: &str) -> Option<(&str, u64, &str, &str)> {
    let mut parts = variant_id.split(':');
    let chrom = parts.next()?;
    let position = parts.next()?.parse::<u64>().ok()?;
    let ref_allele = parts.next()?;
    let alt_allele = parts.next()?;
    if parts.next().is_some() || chrom.is_empty() {
        return None;
    }
    Some((chrom, position, ref_allele, alt_allele))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str, symbol: &str) -> VariantCall {
        VariantCall {
            variant_id: id.to_string(),
            gene_symbol: symbol.to_string(),
            depth: 50,
            alt_count: 10,
            vaf: vaf_percent(10, 50),
            filter_status: FilterStatus::Pass,
            variant_classification: Some("Missense_Mutation".to_string()),
            channels: Vec::new(),
        }
    }

    #[test]
    fn test_filter_status_parse() {
        assert_eq!(FilterStatus::parse("PASS"), FilterStatus::Pass);
        assert_eq!(FilterStatus::parse("REJECT"), FilterStatus::Reject);
        assert_eq!(
            FilterStatus::parse("LowQual"),
            FilterStatus::Other("LowQual".to_string())
        );
        assert_eq!(FilterStatus::parse("LowQual").as_str(), "LowQual");
    }

    #[test]
    fn test_vaf_percent() {
        assert_eq!(vaf_percent(20, 80), Some(25.0));
        assert_eq!(vaf_percent(0, 10), Some(0.0));
        assert_eq!(vaf_percent(3, 0), None);
    }

    #[test]
    fn test_sample_set_lookup_keeps_first_duplicate() {
        let sample = SampleVariantSet::new(
            "s1",
            vec![call("1:100:A:T", "TP53"), call("1:100:A:T", "OTHER"), call("2:5:C:G", "KRAS")],
        );

        assert_eq!(sample.len(), 3);
        assert_eq!(sample.get("1:100:A:T").unwrap().gene_symbol, "TP53");
        assert!(sample.contains("2:5:C:G"));
        assert!(sample.get("3:1:G:A").is_none());
    }

    #[test]
    fn test_union_first_occurrence_wins() {
        let mut union = UnionSet::new();
        assert!(union.insert("1:100:A:T", "TP53"));
        assert!(!union.insert("1:100:A:T", "OTHER"));
        assert!(union.insert("2:5:C:G", "KRAS"));

        assert_eq!(union.len(), 2);
        assert_eq!(union.entries()[0].gene_symbol, "TP53");
    }

    #[test]
    fn test_union_without_false_positives() {
        let union: UnionSet = vec![
            UnionEntry { variant_id: "a".into(), gene_symbol: "A".into() },
            UnionEntry { variant_id: "b".into(), gene_symbol: "B".into() },
            UnionEntry { variant_id: "c".into(), gene_symbol: "C".into() },
        ]
        .into_iter()
        .collect();

        let mut fps = FalsePositiveSet::new();
        fps.flag("b", "B", "s1");

        let kept = union.without(&fps);
        let ids: Vec<&str> = kept.iter().map(|e| e.variant_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_false_positive_set_merges_samples() {
        let mut fps = FalsePositiveSet::new();
        fps.flag("1:100:A:T", "TP53", "s2");
        fps.flag("1:100:A:T", "TP53", "s1");

        assert_eq!(fps.len(), 1);
        let evidence = fps.get("1:100:A:T").unwrap();
        let samples: Vec<&str> = evidence.flagged_by.iter().map(String::as_str).collect();
        assert_eq!(samples, vec!["s1", "s2"]);
    }

    #[test]
    fn test_split_variant_id() {
        assert_eq!(split_variant_id("chr1:12345:A:G"), Some(("chr1", 12345, "A", "G")));
        assert_eq!(split_variant_id("chr1:abc:A:G"), None);
        assert_eq!(split_variant_id("chr1:12345:A"), None);
        assert_eq!(split_variant_id("chr1:1:A:G:T"), None);
    }
}
