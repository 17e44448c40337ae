/// Similarity scoring over named feature vectors.
///
/// Cosine similarity is computed over the intersection of keys only; a key one
/// side omits contributes nothing. Norms are likewise restricted to the shared
/// keys, so an omitted card attribute (fee, income band) neither helps nor
/// hurts that card.
use crate::features::FeatureVector;

/// How many cards a ranking returns by default.
pub const DEFAULT_TOP_N: usize = 10;

/// Weight of the content similarity in the hybrid blend.
pub const HYBRID_CONTENT_WEIGHT: f64 = 0.7;
/// Weight of the collaborative signal in the hybrid blend.
pub const HYBRID_COLLABORATIVE_WEIGHT: f64 = 0.3;

/// Cosine similarity restricted to the key intersection.
///
/// Returns 0.0 when the intersection is empty or either restricted norm is
/// zero; never divides by zero and never returns NaN.
pub fn cosine_similarity(a: &FeatureVector, b: &FeatureVector) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (key, value_a) in a.iter() {
        if let Some(value_b) = b.get(key) {
            dot += value_a * value_b;
            norm_a += value_a * value_a;
            norm_b += value_b * value_b;
        }
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// A card scored against one customer vector.
#[derive(Debug, Clone)]
pub struct ScoredCard {
    pub card_name: String,
    pub content: String,
    pub similarity: f64,
    /// Present only when the hybrid blend ran.
    pub hybrid_score: Option<f64>,
}

impl ScoredCard {
    /// The value rankings sort by.
    fn ranking_score(&self) -> f64 {
        self.hybrid_score.unwrap_or(self.similarity)
    }
}

/// Sorts scored cards descending and keeps the top `n`.
///
/// The sort is stable: equal scores keep catalog order, so rankings are
/// reproducible run to run.
pub fn rank_top_n(mut cards: Vec<ScoredCard>, n: usize) -> Vec<ScoredCard> {
    cards.sort_by(|a, b| {
        b.ranking_score()
            .partial_cmp(&a.ranking_score())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    cards.truncate(n);
    cards
}

/// Blends content similarity with a collaborative rating (on a 0-5 scale).
pub fn hybrid_score(similarity: f64, collaborative_rating: f64) -> f64 {
    HYBRID_CONTENT_WEIGHT * similarity
        + HYBRID_COLLABORATIVE_WEIGHT * (collaborative_rating / 5.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(pairs: &[(&str, f64)]) -> FeatureVector {
        let mut v = FeatureVector::new();
        for (key, value) in pairs {
            v.set(key, *value);
        }
        v
    }

    #[test]
    fn identical_vectors_score_one() {
        let v = vector(&[("a", 0.5), ("b", 1.0)]);
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn disjoint_keys_score_zero() {
        let a = vector(&[("x", 1.0)]);
        let b = vector(&[("y", 1.0)]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn zero_norm_on_shared_keys_scores_zero() {
        let a = vector(&[("x", 0.0), ("y", 1.0)]);
        let b = vector(&[("x", 1.0)]);
        // only "x" is shared and a's value there is zero
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn empty_vectors_score_zero() {
        let empty = FeatureVector::new();
        let v = vector(&[("a", 1.0)]);
        assert_eq!(cosine_similarity(&empty, &v), 0.0);
        assert_eq!(cosine_similarity(&empty, &empty), 0.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = vector(&[("a", 0.3), ("b", 0.9), ("c", 1.0)]);
        let b = vector(&[("b", 0.5), ("c", 0.2), ("d", 1.0)]);
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn omitted_key_neither_helps_nor_hurts() {
        let customer = vector(&[("fee_tolerance", 0.5), ("reward_travel", 1.0)]);
        let with_fee = vector(&[("reward_travel", 1.0), ("fee_tolerance", 0.5)]);
        let without_fee = vector(&[("reward_travel", 1.0)]);
        // The card omitting fee_tolerance is scored on the remaining shared key
        // alone, which matches perfectly.
        assert!((cosine_similarity(&customer, &without_fee) - 1.0).abs() < 1e-12);
        assert!((cosine_similarity(&customer, &with_fee) - 1.0).abs() < 1e-12);
    }

    fn card(name: &str, similarity: f64) -> ScoredCard {
        ScoredCard {
            card_name: name.to_string(),
            content: String::new(),
            similarity,
            hybrid_score: None,
        }
    }

    #[test]
    fn ranking_is_descending_and_truncated() {
        let ranked = rank_top_n(
            vec![card("low", 0.1), card("high", 0.9), card("mid", 0.5)],
            2,
        );
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].card_name, "high");
        assert_eq!(ranked[1].card_name, "mid");
    }

    #[test]
    fn ties_keep_catalog_order() {
        let ranked = rank_top_n(
            vec![card("first", 0.5), card("second", 0.5), card("third", 0.5)],
            10,
        );
        assert_eq!(ranked[0].card_name, "first");
        assert_eq!(ranked[1].card_name, "second");
        assert_eq!(ranked[2].card_name, "third");
    }

    #[test]
    fn hybrid_score_sorts_ahead_of_similarity_when_present() {
        let mut boosted = card("boosted", 0.2);
        boosted.hybrid_score = Some(0.8);
        let ranked = rank_top_n(vec![card("plain", 0.5), boosted], 10);
        assert_eq!(ranked[0].card_name, "boosted");
    }

    #[test]
    fn hybrid_blend_weights() {
        // 0.7 * 0.5 + 0.3 * (4.0 / 5.0)
        assert!((hybrid_score(0.5, 4.0) - 0.59).abs() < 1e-12);
        assert_eq!(hybrid_score(0.0, 0.0), 0.0);
    }
}
