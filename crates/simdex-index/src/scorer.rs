//! Weighted feature-wise similarity between two [`FeatureSet`]s.
//!
//! Each feature present on both sides contributes a similarity in [0, 1],
//! weighted by a fixed table that sums to 1. Features missing on either
//! side are left out of both the numerator and the denominator.
//!
//! Features are visited in a fixed order and every per-feature comparison
//! is symmetric, so `score(a, b)` and `score(b, a)` are bit-identical and
//! `score(a, a)` is exactly 1.

use std::collections::BTreeMap;

use crate::features::{Feature, FeatureSet, FeatureValue};

/// Weight of `feature` in the combined score.
pub fn weight(feature: Feature) -> f64 {
    match feature {
        Feature::CommonWords => 0.30,
        Feature::WordFrequency => 0.20,
        Feature::SemanticKeywords => 0.15,
        Feature::TopicWords => 0.10,
        Feature::SentimentScore => 0.03,
        Feature::WordCount
        | Feature::UniqueWords
        | Feature::AvgWordLength
        | Feature::VocabularyRichness
        | Feature::CjkRatio
        | Feature::LatinRatio => 0.02,
        Feature::CharCount
        | Feature::SentenceCount
        | Feature::ParagraphCount
        | Feature::DigitRatio
        | Feature::HasNumbers
        | Feature::HasUrls
        | Feature::HasEmails
        | Feature::HasPhone
        | Feature::HasTime
        | Feature::HasDate => 0.01,
    }
}

/// Closeness of two numbers: `1 - |a-b| / max(|a|,|b|)`, 1 when both are 0.
pub fn numeric_similarity(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        return 1.0;
    }
    (1.0 - (a - b).abs() / scale).clamp(0.0, 1.0)
}

/// Key overlap plus value closeness for term mappings.
///
/// Both empty → 1. Exactly one empty → 0. Otherwise the mean of the key
/// Jaccard index and the average numeric closeness over shared keys.
pub fn terms_similarity(a: &BTreeMap<String, f64>, b: &BTreeMap<String, f64>) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }

    let mut shared = 0usize;
    let mut closeness = 0.0;
    for (key, va) in a {
        if let Some(vb) = b.get(key) {
            shared += 1;
            closeness += numeric_similarity(*va, *vb);
        }
    }
    let union = a.len() + b.len() - shared;
    let jaccard = shared as f64 / union as f64;
    let value = if shared == 0 {
        0.0
    } else {
        closeness / shared as f64
    };

    (jaccard + value) / 2.0
}

fn value_similarity(a: &FeatureValue, b: &FeatureValue) -> f64 {
    match (a, b) {
        (FeatureValue::Number(x), FeatureValue::Number(y)) => numeric_similarity(*x, *y),
        (FeatureValue::Terms(x), FeatureValue::Terms(y)) => terms_similarity(x, y),
        _ => {
            if a == b {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Similarity of two feature sets, in [0, 1].
///
/// Two sets with no feature in common score 0, except that two empty sets
/// are identical and score 1.
pub fn score(a: &FeatureSet, b: &FeatureSet) -> f64 {
    let mut total = 0.0;
    let mut total_weight = 0.0;

    for feature in Feature::ALL {
        let (Some(va), Some(vb)) = (a.get(feature), b.get(feature)) else {
            continue;
        };
        let w = weight(feature);
        total += value_similarity(va, vb) * w;
        total_weight += w;
    }

    if total_weight == 0.0 {
        return if a.is_empty() && b.is_empty() { 1.0 } else { 0.0 };
    }
    (total / total_weight).clamp(0.0, 1.0)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extract;

    fn terms(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    // ------------------------------------------------------------------------
    // Weights
    // ------------------------------------------------------------------------

    #[test]
    fn test_weights_sum_to_one() {
        let sum: f64 = Feature::ALL.iter().map(|f| weight(*f)).sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum = {sum}");
    }

    #[test]
    fn test_rankings_weighted_most() {
        let heavy = weight(Feature::CommonWords)
            + weight(Feature::WordFrequency)
            + weight(Feature::SemanticKeywords)
            + weight(Feature::TopicWords);
        assert!((heavy - 0.75).abs() < 1e-9);
    }

    // ------------------------------------------------------------------------
    // Per-feature similarity
    // ------------------------------------------------------------------------

    #[test]
    fn test_numeric_similarity() {
        assert_eq!(numeric_similarity(0.0, 0.0), 1.0);
        assert_eq!(numeric_similarity(5.0, 5.0), 1.0);
        assert_eq!(numeric_similarity(10.0, 5.0), 0.5);
        assert_eq!(numeric_similarity(0.0, 3.0), 0.0);
        assert_eq!(numeric_similarity(-1.0, 1.0), 0.0);
    }

    #[test]
    fn test_terms_similarity_empty_cases() {
        let empty = BTreeMap::new();
        let one = terms(&[("fox", 1.0)]);
        assert_eq!(terms_similarity(&empty, &empty), 1.0);
        assert_eq!(terms_similarity(&empty, &one), 0.0);
        assert_eq!(terms_similarity(&one, &empty), 0.0);
    }

    #[test]
    fn test_terms_similarity_disjoint_is_zero() {
        let a = terms(&[("fox", 1.0)]);
        let b = terms(&[("cooking", 1.0)]);
        assert_eq!(terms_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_terms_similarity_partial_overlap() {
        // jaccard = 1/3, closeness over the shared key = 0.5
        let a = terms(&[("fox", 2.0), ("quick", 1.0)]);
        let b = terms(&[("fox", 1.0), ("lazy", 1.0)]);
        let expected = (1.0 / 3.0 + 0.5) / 2.0;
        assert!((terms_similarity(&a, &b) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_mismatched_kinds_compare_by_equality() {
        assert_eq!(
            value_similarity(&FeatureValue::Flag(true), &FeatureValue::Number(1.0)),
            0.0
        );
        assert_eq!(
            value_similarity(&FeatureValue::Flag(true), &FeatureValue::Flag(true)),
            1.0
        );
    }

    // ------------------------------------------------------------------------
    // Combined score
    // ------------------------------------------------------------------------

    #[test]
    fn test_self_similarity_is_one() {
        for text in ["", "The quick brown fox", "今天很开心 2024-01-01 https://x.io"] {
            let f = extract(text);
            assert_eq!(score(&f, &f), 1.0, "text = {text:?}");
        }
    }

    #[test]
    fn test_missing_features_are_skipped() {
        let full = extract("alpha beta gamma");
        let mut partial = full.clone();
        partial.remove(Feature::CommonWords);
        partial.remove(Feature::SentimentScore);

        // Every remaining feature is identical, so the score stays maximal
        // instead of being dragged down by the missing ones.
        assert_eq!(score(&full, &partial), 1.0);
    }

    #[test]
    fn test_disjoint_sets_score_zero() {
        let mut a = FeatureSet::new();
        a.insert(Feature::WordCount, FeatureValue::Number(3.0));
        let mut b = FeatureSet::new();
        b.insert(Feature::HasUrls, FeatureValue::Flag(true));
        assert_eq!(score(&a, &b), 0.0);
        assert_eq!(score(&FeatureSet::new(), &FeatureSet::new()), 1.0);
    }

    #[test]
    fn test_related_text_outscores_unrelated() {
        let query = extract("The quick brown fox leaps");
        let near = extract("The quick brown fox jumps");
        let far = extract("A completely unrelated sentence about cooking");

        let s_near = score(&query, &near);
        let s_far = score(&query, &far);
        assert!(s_near > s_far, "near = {s_near}, far = {s_far}");
        assert!(s_near > 0.3);
        assert!(s_far < 0.3);
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    mod props {
        use crate::features::extract;
        use crate::scorer::score;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn self_similarity_is_maximal(text in any::<String>()) {
                let f = extract(&text);
                prop_assert_eq!(score(&f, &f), 1.0);
            }

            #[test]
            fn score_is_symmetric(a in any::<String>(), b in any::<String>()) {
                let (fa, fb) = (extract(&a), extract(&b));
                prop_assert_eq!(score(&fa, &fb), score(&fb, &fa));
            }

            #[test]
            fn score_is_bounded(a in "[a-z ]{0,60}", b in "[a-z ]{0,60}") {
                let s = score(&extract(&a), &extract(&b));
                prop_assert!((0.0..=1.0).contains(&s));
            }
        }
    }
}
