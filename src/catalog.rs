/// In-memory card catalog.
///
/// Card records are encoded once at load time into feature vectors; scoring a
/// request reads a shared snapshot. Reindexing builds a whole new snapshot and
/// swaps it atomically, so a concurrent scorer sees either the old catalog or
/// the new one, never a mix.
use crate::errors::AppError;
use crate::features::{self, FeatureVector};
use crate::models::CardRecord;
use std::sync::{Arc, RwLock};

/// One card, encoded and ready to score.
#[derive(Debug, Clone)]
pub struct CardCatalogEntry {
    pub card_name: String,
    pub content: String,
    pub feature_vector: FeatureVector,
}

#[derive(Debug, Default)]
pub struct CardCatalog {
    entries: RwLock<Arc<Vec<CardCatalogEntry>>>,
}

impl CardCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot. Cheap to clone; holders keep scoring against it even
    /// while a reindex swaps in a replacement.
    pub fn snapshot(&self) -> Arc<Vec<CardCatalogEntry>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Encodes the records and atomically replaces the whole catalog.
    /// Returns the new catalog size.
    pub fn replace(&self, records: Vec<CardRecord>) -> usize {
        let entries: Vec<CardCatalogEntry> = records
            .into_iter()
            .map(|record| CardCatalogEntry {
                feature_vector: features::encode_card(&record.content),
                card_name: record.card_name,
                content: record.content,
            })
            .collect();
        let count = entries.len();

        let mut guard = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(entries);
        count
    }
}

/// Loads card records from a local JSON file (an array of card objects).
pub async fn load_card_file(path: &str) -> Result<Vec<CardRecord>, AppError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::InternalError(format!("Failed to read card data file {}: {}", path, e))
    })?;
    let records: Vec<CardRecord> = serde_json::from_str(&raw).map_err(|e| {
        AppError::InternalError(format!("Invalid card data file {}: {}", path, e))
    })?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, content: &str) -> CardRecord {
        CardRecord {
            card_name: name.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn replace_encodes_and_swaps_whole_snapshot() {
        let catalog = CardCatalog::new();
        assert!(catalog.is_empty());

        let count = catalog.replace(vec![
            record("Travel Platinum", "platinum travel card with lounge access"),
            record("Everyday Cashback", "cashback on shopping, no annual fee"),
        ]);
        assert_eq!(count, 2);

        let snapshot = catalog.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].card_name, "Travel Platinum");
        assert_eq!(snapshot[0].feature_vector.get("tier_platinum"), Some(1.0));
        assert_eq!(snapshot[1].feature_vector.get("fee_tolerance"), Some(0.0));
    }

    #[test]
    fn old_snapshot_survives_a_swap() {
        let catalog = CardCatalog::new();
        catalog.replace(vec![record("Old Card", "basic card")]);
        let old = catalog.snapshot();

        catalog.replace(vec![record("New Card", "gold card")]);

        assert_eq!(old[0].card_name, "Old Card");
        assert_eq!(catalog.snapshot()[0].card_name, "New Card");
    }

    #[tokio::test]
    async fn card_file_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cards.json");
        tokio::fs::write(
            &path,
            r#"[{"cardName": "Test Card", "content": "cashback card"}]"#,
        )
        .await
        .unwrap();

        let records = load_card_file(path.to_str().unwrap()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].card_name, "Test Card");
    }

    #[tokio::test]
    async fn missing_card_file_is_an_error() {
        let result = load_card_file("/nonexistent/cards.json").await;
        assert!(result.is_err());
    }
}
