use hex;
use sha2::{Digest, Sha256};

/// Integrity checking for cached vendor responses.
///
/// OCR text (keyed by file checksum) and CIBIL reports (keyed by PAN) are
/// cached as JSON strings with a SHA-256 checksum stored alongside. A
/// checksum mismatch on read means the entry is discarded and the vendor is
/// called again; a poisoned cache never reaches validation or a client.

/// Cached JSON payload with its checksum.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ValidatedCacheEntry {
    /// The cached payload (JSON string).
    pub data: String,
    /// SHA-256 checksum of the payload (hex encoded).
    pub checksum: String,
}

impl ValidatedCacheEntry {
    pub fn new(data: String) -> Self {
        let checksum = Self::compute_checksum(&data);
        Self { data, checksum }
    }

    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// True when the stored checksum matches the payload.
    pub fn is_valid(&self) -> bool {
        let computed = Self::compute_checksum(&self.data);
        computed == self.checksum
    }

    /// Serializes the entry for storage in cache.
    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Deserializes a cache entry and returns the payload only when the
    /// checksum still matches. `None` means the caller must refetch.
    pub fn deserialize_and_validate(serialized: &str) -> Option<String> {
        let entry: ValidatedCacheEntry = serde_json::from_str(serialized).ok()?;

        if entry.is_valid() {
            Some(entry.data)
        } else {
            tracing::warn!(
                "Cache validation failed: checksum mismatch. Expected: {}, Data length: {}",
                entry.checksum,
                entry.data.len()
            );
            None
        }
    }
}

/// SHA-256 checksum of raw file bytes, hex encoded.
///
/// Used as the OCR cache key: the same bytes always map to the same OCR
/// result no matter what the client named the file.
pub fn file_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_entry_round_trips() {
        let data = r#"{"text": "Name: Ravi Kumar", "confidence": 0.93}"#.to_string();
        let entry = ValidatedCacheEntry::new(data.clone());

        assert!(entry.is_valid());

        let serialized = entry.serialize();
        assert_eq!(
            ValidatedCacheEntry::deserialize_and_validate(&serialized),
            Some(data)
        );
    }

    #[test]
    fn tampered_payload_fails_validation() {
        let entry = ValidatedCacheEntry::new(r#"{"cibilScore": 780}"#.to_string());

        let mut tampered = entry;
        tampered.data = r#"{"cibilScore": 850}"#.to_string();

        assert!(!tampered.is_valid());
    }

    #[test]
    fn tampered_serialized_entry_returns_none() {
        let entry = ValidatedCacheEntry::new(r#"{"cibilScore": 640}"#.to_string());
        let serialized = entry.serialize();

        let tampered = serialized.replace("640", "840");

        assert_eq!(ValidatedCacheEntry::deserialize_and_validate(&tampered), None);
    }

    #[test]
    fn garbage_serialized_entry_returns_none() {
        assert_eq!(ValidatedCacheEntry::deserialize_and_validate("not json"), None);
    }

    #[test]
    fn file_checksum_depends_on_bytes_only() {
        let a = file_checksum(b"scanned aadhaar bytes");
        let b = file_checksum(b"scanned aadhaar bytes");
        let c = file_checksum(b"different bytes");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
