/// Recommendation composition.
///
/// The pipeline is: encode the customer, score every catalog card, rank, then
/// dress the top cards with explanations. Explanations come from the LLM when
/// one is configured and replies with usable JSON; without usable advice the
/// composer serves a single deterministic recommendation tagged `fallback`.
/// Scores themselves are never produced by the LLM.
use crate::catalog::CardCatalogEntry;
use crate::features;
use crate::models::{
    CustomerProfile, RecommendationItem, RecommendationMode, RecommendationSource,
};
use crate::scoring::{self, ScoredCard};
use serde::Deserialize;

/// Mock peer ratings (0-5) for the collaborative half of the hybrid blend,
/// keyed by card-name substring. First match wins.
const PEER_RATINGS: &[(&str, f64)] = &[
    ("platinum", 4.5),
    ("travel", 4.4),
    ("gold", 4.2),
    ("cashback", 4.0),
    ("basic", 3.2),
];

const DEFAULT_PEER_RATING: f64 = 3.5;

/// Scores the whole catalog snapshot against one customer profile and returns
/// the ranked top `n`.
pub fn score_catalog(
    profile: &CustomerProfile,
    snapshot: &[CardCatalogEntry],
    mode: RecommendationMode,
    n: usize,
) -> Vec<ScoredCard> {
    let customer = features::encode_customer(profile);

    let scored: Vec<ScoredCard> = snapshot
        .iter()
        .map(|entry| {
            let similarity = scoring::cosine_similarity(&customer, &entry.feature_vector);
            let hybrid_score = match mode {
                RecommendationMode::Content => None,
                RecommendationMode::Hybrid => Some(scoring::hybrid_score(
                    similarity,
                    peer_rating(&entry.card_name),
                )),
            };
            ScoredCard {
                card_name: entry.card_name.clone(),
                content: entry.content.clone(),
                similarity,
                hybrid_score,
            }
        })
        .collect();

    scoring::rank_top_n(scored, n)
}

fn peer_rating(card_name: &str) -> f64 {
    let name = card_name.to_lowercase();
    PEER_RATINGS
        .iter()
        .find(|(marker, _)| name.contains(marker))
        .map(|(_, rating)| *rating)
        .unwrap_or(DEFAULT_PEER_RATING)
}

// ---- LLM reply handling ----

/// Per-card explanation block expected from the LLM.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmCardAdvice {
    pub card_name: String,
    pub why_recommended: String,
    #[serde(default)]
    pub key_benefits: Vec<String>,
    #[serde(default)]
    pub fees_and_charges: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmAdvice {
    pub recommendations: Vec<LlmCardAdvice>,
}

/// Builds the explanation prompt for the ranked cards.
///
/// The LLM is asked to explain the given ranking, not to produce one; the
/// response schema mirrors `LlmAdvice`.
pub fn build_prompt(profile: &CustomerProfile, ranked: &[ScoredCard]) -> String {
    let mut prompt = String::from(
        "You are a credit card advisor. Explain why each of the following cards \
         suits this customer. Do not reorder or drop cards.\n\nCustomer profile:\n",
    );
    if let Some(income) = profile.income {
        prompt.push_str(&format!("- Annual income: Rs. {}\n", income));
    }
    if let Some(age) = profile.age {
        prompt.push_str(&format!("- Age: {}\n", age));
    }
    if !profile.spending_categories.is_empty() {
        prompt.push_str(&format!(
            "- Spends on: {}\n",
            profile.spending_categories.join(", ")
        ));
    }
    if !profile.preferred_rewards.is_empty() {
        prompt.push_str(&format!(
            "- Prefers rewards: {}\n",
            profile.preferred_rewards.join(", ")
        ));
    }

    prompt.push_str("\nCards, in ranked order:\n");
    for (index, card) in ranked.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {} (match {:.0}%): {}\n",
            index + 1,
            card.card_name,
            card.similarity.max(0.0) * 100.0,
            truncate(&card.content, 400)
        ));
    }

    prompt.push_str(
        "\nReply with JSON only, in this exact shape:\n\
         {\"recommendations\": [{\"cardName\": \"...\", \"whyRecommended\": \"...\", \
         \"keyBenefits\": [\"...\"], \"feesAndCharges\": \"...\"}]}",
    );
    prompt
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Scrapes the first JSON object out of a raw LLM reply and parses it.
///
/// Models wrap JSON in prose and code fences; everything from the first `{`
/// to the last `}` is taken as the candidate document. Any parse failure
/// yields `None` and the caller falls back to deterministic explanations.
pub fn parse_llm_reply(raw: &str) -> Option<LlmAdvice> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    let advice: LlmAdvice = serde_json::from_str(&raw[start..=end]).ok()?;
    if advice.recommendations.is_empty() {
        return None;
    }
    // Reject blocks with empty card names or explanations rather than
    // surfacing half-filled advice.
    if advice
        .recommendations
        .iter()
        .any(|r| r.card_name.trim().is_empty() || r.why_recommended.trim().is_empty())
    {
        return None;
    }
    Some(advice)
}

// ---- Composition ----

/// Dresses ranked cards into response items.
///
/// When `advice` is present, each card is matched to its advice block by name
/// (case-insensitive); a card the LLM skipped gets the deterministic text for
/// that one card. When `advice` is absent entirely (LLM down, unconfigured, or
/// its reply unusable) the composer answers with a single deterministic
/// recommendation, preferring a basic or fee-free card, tagged `fallback`.
pub fn compose(
    ranked: Vec<ScoredCard>,
    advice: Option<&LlmAdvice>,
    mode: RecommendationMode,
) -> Vec<RecommendationItem> {
    let explained_source = match mode {
        RecommendationMode::Content => RecommendationSource::ContentBased,
        RecommendationMode::Hybrid => RecommendationSource::Hybrid,
    };

    if advice.is_none() {
        return fallback_item(ranked).into_iter().collect();
    }

    ranked
        .into_iter()
        .enumerate()
        .map(|(index, card)| {
            let block = advice.and_then(|a| {
                a.recommendations
                    .iter()
                    .find(|r| r.card_name.eq_ignore_ascii_case(&card.card_name))
            });

            let (why, benefits, fees, source) = match block {
                Some(block) => (
                    block.why_recommended.clone(),
                    if block.key_benefits.is_empty() {
                        derive_benefits(&card.content)
                    } else {
                        block.key_benefits.clone()
                    },
                    if block.fees_and_charges.trim().is_empty() {
                        derive_fees(&card.content)
                    } else {
                        block.fees_and_charges.clone()
                    },
                    explained_source,
                ),
                None => (
                    derive_explanation(&card),
                    derive_benefits(&card.content),
                    derive_fees(&card.content),
                    RecommendationSource::Fallback,
                ),
            };

            RecommendationItem {
                rank: (index + 1) as u32,
                match_score: format!("{:.0}%", card.similarity.max(0.0) * 100.0),
                similarity_score: card.similarity,
                why_recommended: why,
                key_benefits: benefits,
                fees_and_charges: fees,
                recommendation_source: source,
                hybrid_score: card.hybrid_score,
                card_name: card.card_name,
            }
        })
        .collect()
}

/// Markers a safe default card should carry.
const FALLBACK_MARKERS: &[&str] = &["no annual fee", "zero fee", "basic"];

///// The one deterministic recommendation served when no LLM advice is usable:
/// the best-ranked basic or fee-free card, or failing that the top card.
fn fallback_item(ranked: Vec<ScoredCard>) -> Option<RecommendationItem> {
    let index = ranked
        .iter()
        .position(|card| {
            let content = card.content.to_lowercase();
            FALLBACK_MARKERS.iter().any(|m| content.contains(m))
        })
        .unwrap_or(0);
    let card = ranked.into_iter().nth(index)?;

    Some(RecommendationItem {
        rank: 1,
        match_score: format!("{:.0}%", card.similarity.max(0.0) * 100.0),
        similarity_score: card.similarity,
        why_recommended: format!(
            "{} is a safe all-round choice while detailed advice is unavailable.",
            card.card_name
        ),
        key_benefits: derive_benefits(&card.content),
        fees_and_charges: derive_fees(&card.content),
        recommendation_source: RecommendationSource::Fallback,
        hybrid_score: card.hybrid_score,
        card_name: card.card_name,
    })
}

/// Deterministic one-line explanation from the similarity score.
fn derive_explanation(card: &ScoredCard) -> String {
    let strength = if card.similarity >= 0.7 {
        "a strong"
    } else if card.similarity >= 0.4 {
        "a good"
    } else {
        "a partial"
    };
    format!(
        "{} is {} match for your spending pattern and preferences.",
        card.card_name, strength
    )
}

/// Benefit bullets pulled straight from the card content keywords.
fn derive_benefits(content: &str) -> Vec<String> {
    let content = content.to_lowercase();
    let mut benefits = Vec::new();
    let markers: &[(&str, &str)] = &[
        ("cashback", "Cashback on eligible spends"),
        ("lounge", "Airport lounge access"),
        ("travel", "Travel rewards and benefits"),
        ("dining", "Dining offers"),
        ("fuel", "Fuel surcharge benefits"),
        ("insurance", "Complimentary insurance cover"),
        ("welcome", "Welcome bonus on joining"),
        ("points", "Reward points on purchases"),
    ];
    for (marker, benefit) in markers {
        if content.contains(marker) {
            benefits.push(benefit.to_string());
        }
    }
    if benefits.is_empty() {
        benefits.push("General purpose credit card".to_string());
    }
    benefits
}

fn derive_fees(content: &str) -> String {
    let content = content.to_lowercase();
    if content.contains("no annual fee") || content.contains("zero fee") {
        "No annual fee".to_string()
    } else if content.contains("annual fee") || content.contains("yearly fee") {
        "Annual fee applies; see card terms".to_string()
    } else {
        "See card terms for fee details".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CardCatalog;
    use crate::models::CardRecord;

    fn catalog_with(cards: &[(&str, &str)]) -> CardCatalog {
        let catalog = CardCatalog::new();
        catalog.replace(
            cards
                .iter()
                .map(|(name, content)| CardRecord {
                    card_name: name.to_string(),
                    content: content.to_string(),
                })
                .collect(),
        );
        catalog
    }

    fn travel_profile() -> CustomerProfile {
        CustomerProfile {
            income: Some(1_200_000.0),
            spending_categories: vec!["travel".to_string(), "dining".to_string()],
            preferred_rewards: vec!["travel".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn matching_card_outranks_unrelated_card() {
        let catalog = catalog_with(&[
            ("Basic Saver", "basic entry card, no rewards"),
            (
                "Travel Platinum",
                "platinum travel card, dining rewards, airport lounge, no annual fee",
            ),
        ]);
        let ranked = score_catalog(
            &travel_profile(),
            &catalog.snapshot(),
            RecommendationMode::Content,
            10,
        );
        assert_eq!(ranked[0].card_name, "Travel Platinum");
        assert!(ranked[0].similarity > ranked[1].similarity);
    }

    #[test]
    fn hybrid_mode_attaches_blended_score() {
        let catalog = catalog_with(&[("Travel Platinum", "platinum travel card")]);
        let ranked = score_catalog(
            &travel_profile(),
            &catalog.snapshot(),
            RecommendationMode::Hybrid,
            10,
        );
        let card = &ranked[0];
        let expected = scoring::hybrid_score(card.similarity, 4.5);
        assert!((card.hybrid_score.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn content_mode_has_no_hybrid_score() {
        let catalog = catalog_with(&[("Travel Platinum", "travel card")]);
        let ranked = score_catalog(
            &travel_profile(),
            &catalog.snapshot(),
            RecommendationMode::Content,
            10,
        );
        assert!(ranked[0].hybrid_score.is_none());
    }

    #[test]
    fn llm_reply_json_is_scraped_out_of_prose() {
        let raw = r#"Sure! Here are the recommendations:
```json
{"recommendations": [{"cardName": "Travel Platinum", "whyRecommended": "Fits your travel spend.", "keyBenefits": ["Lounge access"], "feesAndCharges": "Rs. 2000 yearly"}]}
```
Hope this helps."#;
        let advice = parse_llm_reply(raw).expect("advice parsed");
        assert_eq!(advice.recommendations[0].card_name, "Travel Platinum");
    }

    #[test]
    fn garbage_llm_reply_yields_none() {
        assert!(parse_llm_reply("I cannot answer that.").is_none());
        assert!(parse_llm_reply("{not json}").is_none());
        assert!(parse_llm_reply(r#"{"recommendations": []}"#).is_none());
        assert!(parse_llm_reply("").is_none());
    }

    #[test]
    fn half_filled_advice_is_rejected() {
        let raw = r#"{"recommendations": [{"cardName": "", "whyRecommended": "x"}]}"#;
        assert!(parse_llm_reply(raw).is_none());
    }

    fn scored(name: &str, similarity: f64) -> ScoredCard {
        ScoredCard {
            card_name: name.to_string(),
            content: "travel card with lounge access and annual fee".to_string(),
            similarity,
            hybrid_score: None,
        }
    }

    #[test]
    fn compose_without_advice_serves_a_single_fallback_item() {
        let items = compose(
            vec![scored("Card A", 0.8), scored("Card B", 0.5)],
            None,
            RecommendationMode::Content,
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].recommendation_source, RecommendationSource::Fallback);
        assert_eq!(items[0].rank, 1);
        assert_eq!(items[0].match_score, "80%");
        assert!(!items[0].key_benefits.is_empty());
    }

    #[test]
    fn fallback_prefers_a_fee_free_or_basic_card() {
        let mut fee_free = scored("Everyday Saver", 0.4);
        fee_free.content = "simple card with no annual fee".to_string();
        let items = compose(
            vec![scored("Premium Travel", 0.9), fee_free],
            None,
            RecommendationMode::Content,
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].card_name, "Everyday Saver");
        assert_eq!(items[0].fees_and_charges, "No annual fee");
    }

    #[test]
    fn fallback_on_empty_ranking_is_empty() {
        let items = compose(Vec::new(), None, RecommendationMode::Content);
        assert!(items.is_empty());
    }

    #[test]
    fn compose_matches_advice_by_name_case_insensitively() {
        let advice = LlmAdvice {
            recommendations: vec![LlmCardAdvice {
                card_name: "card a".to_string(),
                why_recommended: "Matches your travel habits.".to_string(),
                key_benefits: vec!["Lounge".to_string()],
                fees_and_charges: "Rs. 500".to_string(),
            }],
        };
        let items = compose(
            vec![scored("Card A", 0.8), scored("Card B", 0.5)],
            Some(&advice),
            RecommendationMode::Content,
        );
        assert_eq!(
            items[0].recommendation_source,
            RecommendationSource::ContentBased
        );
        assert_eq!(items[0].why_recommended, "Matches your travel habits.");
        // Card B was skipped by the LLM and falls back per-card.
        assert_eq!(items[1].recommendation_source, RecommendationSource::Fallback);
    }

    #[test]
    fn negative_similarity_displays_as_zero_percent() {
        let items = compose(vec![scored("Card A", -0.2)], None, RecommendationMode::Content);
        assert_eq!(items[0].match_score, "0%");
        assert_eq!(items[0].similarity_score, -0.2);
    }

    #[test]
    fn prompt_lists_cards_in_rank_order() {
        let prompt = build_prompt(
            &travel_profile(),
            &[scored("First Card", 0.9), scored("Second Card", 0.4)],
        );
        let first = prompt.find("First Card").unwrap();
        let second = prompt.find("Second Card").unwrap();
        assert!(first < second);
        assert!(prompt.contains("recommendations"));
    }
}
