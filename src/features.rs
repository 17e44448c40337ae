/// Customer and card feature encoding.
///
/// Both encoders emit vectors over a shared vocabulary: `reward_*`, `spend_*`,
/// `fee_tolerance` and `income` keys appear on both sides and drive the
/// similarity score; customer-only keys (`age`, `credit_score`,
/// `employment_*`) and card-only keys (`tier_*`, `perk_*`) are ignored by the
/// scorer but kept for explanations.
///
/// Card features come from fixed keyword rule tables: a keyword present
/// anywhere in the (case-folded) content sets the flag. Only the fee group has
/// negation handling; every other group is a plain presence check.
use crate::models::{CustomerProfile, EmploymentType, FeeTolerance};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---- Card keyword rule tables ----

const TIER_BASIC: &[&str] = &["basic", "starter", "entry"];
const TIER_GOLD: &[&str] = &["gold", "premium"];
const TIER_PLATINUM: &[&str] = &["platinum", "exclusive"];

const REWARD_CASHBACK: &[&str] = &["cashback", "cash back"];
const REWARD_POINTS: &[&str] = &["points", "reward points"];
const REWARD_TRAVEL: &[&str] = &["travel", "miles", "airline"];

const BONUS_DINING: &[&str] = &["dining", "restaurant", "food"];
const BONUS_SHOPPING: &[&str] = &["shopping", "retail", "online"];
const BONUS_FUEL: &[&str] = &["fuel", "petrol", "gas"];
const BONUS_TRAVEL: &[&str] = &["travel", "hotel", "flight"];

const FEE_CHARGED: &[&str] = &["annual fee", "yearly fee"];
const FEE_FREE: &[&str] = &["no annual fee", "zero fee", "free"];

const INCOME_LOW: &[&str] = &["minimum income", "low income", "25000", "30000"];
const INCOME_MEDIUM: &[&str] = &["50000", "75000", "1 lakh"];
const INCOME_HIGH: &[&str] = &["5 lakh", "10 lakh", "high income"];

const PERK_LOUNGE: &[&str] = &["lounge", "airport lounge"];
const PERK_INSURANCE: &[&str] = &["insurance", "protection"];
const PERK_WELCOME: &[&str] = &["welcome", "joining bonus"];

/// Income requirement bands mapped onto the customer income scale.
const INCOME_BAND_LOW: f64 = 0.15;
const INCOME_BAND_MEDIUM: f64 = 0.4;
const INCOME_BAND_HIGH: f64 = 0.8;

/// Sparse named feature vector. `BTreeMap` keeps iteration deterministic so
/// rankings are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(BTreeMap<String, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn set(&mut self, key: &str, value: f64) {
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Encodes a customer profile into a normalized feature vector.
///
/// Missing numeric inputs default to neutral values (income 0, age 30, credit
/// score 650, fee tolerance 0.5) so the vector stays dense enough for
/// similarity to be meaningful. These are deliberate defaults, not silent data
/// loss.
pub fn encode_customer(profile: &CustomerProfile) -> FeatureVector {
    let mut vector = FeatureVector::new();

    vector.set("income", normalize_income(profile.income.unwrap_or(0.0)));
    vector.set("age", normalize_age(profile.age.unwrap_or(30)));
    vector.set(
        "credit_score",
        normalize_credit_score(profile.credit_score.unwrap_or(650)),
    );

    vector.set("spend_dining", has_entry(&profile.spending_categories, "dining"));
    vector.set(
        "spend_shopping",
        has_entry(&profile.spending_categories, "shopping"),
    );
    vector.set("spend_travel", has_entry(&profile.spending_categories, "travel"));
    vector.set("spend_fuel", has_entry(&profile.spending_categories, "fuel"));
    vector.set(
        "spend_grocery",
        has_entry(&profile.spending_categories, "grocery"),
    );

    vector.set(
        "reward_cashback",
        has_entry(&profile.preferred_rewards, "cashback"),
    );
    vector.set("reward_points", has_entry(&profile.preferred_rewards, "points"));
    vector.set("reward_travel", has_entry(&profile.preferred_rewards, "travel"));

    vector.set(
        "fee_tolerance",
        normalize_fee_tolerance(profile.annual_fee_tolerance),
    );

    vector.set(
        "employment_salaried",
        flag(profile.employment_type == Some(EmploymentType::Salaried)),
    );
    vector.set(
        "employment_self_employed",
        flag(profile.employment_type == Some(EmploymentType::SelfEmployed)),
    );

    vector
}

/// Encodes card text content into a feature vector via the keyword tables.
pub fn encode_card(content: &str) -> FeatureVector {
    let content = content.to_lowercase();
    let mut vector = FeatureVector::new();

    vector.set("tier_basic", keyword_flag(&content, TIER_BASIC));
    vector.set("tier_gold", keyword_flag(&content, TIER_GOLD));
    vector.set("tier_platinum", keyword_flag(&content, TIER_PLATINUM));

    vector.set("reward_cashback", keyword_flag(&content, REWARD_CASHBACK));
    vector.set("reward_points", keyword_flag(&content, REWARD_POINTS));
    vector.set("reward_travel", keyword_flag(&content, REWARD_TRAVEL));

    vector.set("spend_dining", keyword_flag(&content, BONUS_DINING));
    vector.set("spend_shopping", keyword_flag(&content, BONUS_SHOPPING));
    vector.set("spend_fuel", keyword_flag(&content, BONUS_FUEL));
    vector.set("spend_travel", keyword_flag(&content, BONUS_TRAVEL));

    // Fee group is the only one with negation handling: an explicit fee-free
    // phrase wins over a bare "annual fee" mention. No marker at all means the
    // key is omitted rather than guessed.
    let fee_free = has_keyword(&content, FEE_FREE);
    let fee_charged = has_keyword(&content, FEE_CHARGED);
    if fee_free {
        vector.set("fee_tolerance", 0.0);
    } else if fee_charged {
        vector.set("fee_tolerance", 1.0);
    }

    // Income requirement band, highest marker wins; omitted without a marker.
    if has_keyword(&content, INCOME_HIGH) {
        vector.set("income", INCOME_BAND_HIGH);
    } else if has_keyword(&content, INCOME_MEDIUM) {
        vector.set("income", INCOME_BAND_MEDIUM);
    } else if has_keyword(&content, INCOME_LOW) {
        vector.set("income", INCOME_BAND_LOW);
    }

    vector.set("perk_lounge", keyword_flag(&content, PERK_LOUNGE));
    vector.set("perk_insurance", keyword_flag(&content, PERK_INSURANCE));
    vector.set("perk_welcome", keyword_flag(&content, PERK_WELCOME));

    vector
}

/// Annual income normalized to [0, 1] against a 20 lakh ceiling.
pub fn normalize_income(income: f64) -> f64 {
    (income / 2_000_000.0).clamp(0.0, 1.0)
}

/// Age 18-65 normalized to [0, 1].
pub fn normalize_age(age: u32) -> f64 {
    ((age as f64 - 18.0) / 47.0).clamp(0.0, 1.0)
}

/// Credit score 300-850 normalized to [0, 1].
pub fn normalize_credit_score(score: u32) -> f64 {
    ((score as f64 - 300.0) / 550.0).clamp(0.0, 1.0)
}

/// Fee tolerance score; unset defaults to the neutral 0.5.
pub fn normalize_fee_tolerance(tolerance: Option<FeeTolerance>) -> f64 {
    match tolerance {
        Some(FeeTolerance::None) => 0.0,
        Some(FeeTolerance::Low) => 0.3,
        Some(FeeTolerance::Moderate) => 0.6,
        Some(FeeTolerance::High) => 1.0,
        None => 0.5,
    }
}

fn has_entry(entries: &[String], wanted: &str) -> f64 {
    flag(entries.iter().any(|e| e.eq_ignore_ascii_case(wanted)))
}

fn has_keyword(content: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| content.contains(keyword))
}

fn keyword_flag(content: &str, keywords: &[&str]) -> f64 {
    flag(has_keyword(content, keywords))
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn income_normalization_caps_at_one() {
        assert_eq!(normalize_income(0.0), 0.0);
        assert_eq!(normalize_income(1_000_000.0), 0.5);
        assert_eq!(normalize_income(5_000_000.0), 1.0);
    }

    #[test]
    fn age_normalization_clamps_to_unit_interval() {
        assert_eq!(normalize_age(18), 0.0);
        assert_eq!(normalize_age(65), 1.0);
        assert_eq!(normalize_age(90), 1.0);
        assert_eq!(normalize_age(10), 0.0);
    }

    #[test]
    fn credit_score_normalization() {
        assert_eq!(normalize_credit_score(300), 0.0);
        assert_eq!(normalize_credit_score(850), 1.0);
        assert!((normalize_credit_score(650) - 0.63636).abs() < 1e-4);
    }

    #[test]
    fn customer_defaults_are_neutral_not_missing() {
        let vector = encode_customer(&CustomerProfile::default());
        assert_eq!(vector.get("income"), Some(0.0));
        assert_eq!(vector.get("age"), Some(normalize_age(30)));
        assert_eq!(vector.get("credit_score"), Some(normalize_credit_score(650)));
        assert_eq!(vector.get("fee_tolerance"), Some(0.5));
    }

    #[test]
    fn customer_binary_features_are_zero_or_one() {
        let profile = CustomerProfile {
            spending_categories: vec!["Dining".to_string(), "travel".to_string()],
            preferred_rewards: vec!["cashback".to_string()],
            employment_type: Some(EmploymentType::Salaried),
            ..Default::default()
        };
        let vector = encode_customer(&profile);
        assert_eq!(vector.get("spend_dining"), Some(1.0));
        assert_eq!(vector.get("spend_travel"), Some(1.0));
        assert_eq!(vector.get("spend_shopping"), Some(0.0));
        assert_eq!(vector.get("reward_cashback"), Some(1.0));
        assert_eq!(vector.get("reward_points"), Some(0.0));
        assert_eq!(vector.get("employment_salaried"), Some(1.0));
        assert_eq!(vector.get("employment_self_employed"), Some(0.0));
    }

    #[test]
    fn card_keyword_flags() {
        let vector = encode_card(
            "Platinum travel card with airport lounge access and dining rewards",
        );
        assert_eq!(vector.get("tier_platinum"), Some(1.0));
        assert_eq!(vector.get("reward_travel"), Some(1.0));
        assert_eq!(vector.get("spend_dining"), Some(1.0));
        assert_eq!(vector.get("perk_lounge"), Some(1.0));
        assert_eq!(vector.get("tier_basic"), Some(0.0));
    }

    #[test]
    fn fee_free_phrase_wins_over_bare_fee_mention() {
        // "no annual fee" contains "annual fee"; the fee-free phrase must win.
        let vector = encode_card("Premium card with no annual fee");
        assert_eq!(vector.get("fee_tolerance"), Some(0.0));

        let vector = encode_card("Annual fee of Rs. 500 applies");
        assert_eq!(vector.get("fee_tolerance"), Some(1.0));
    }

    #[test]
    fn fee_key_omitted_without_marker() {
        let vector = encode_card("Simple rewards card");
        assert_eq!(vector.get("fee_tolerance"), None);
    }

    #[test]
    fn income_band_highest_marker_wins() {
        let vector = encode_card("Requires 10 lakh annual income, minimum income proof");
        assert_eq!(vector.get("income"), Some(INCOME_BAND_HIGH));

        let vector = encode_card("minimum income 25000 per month");
        assert_eq!(vector.get("income"), Some(INCOME_BAND_LOW));

        let vector = encode_card("a card");
        assert_eq!(vector.get("income"), None);
    }

    #[test]
    fn boolean_origin_values_stay_binary() {
        let vector = encode_card("gold card with cashback and fuel surcharge waiver");
        for (key, value) in vector.iter() {
            if key != "income" && key != "fee_tolerance" {
                assert!(value == 0.0 || value == 1.0, "{} = {}", key, value);
            }
        }
    }
}
