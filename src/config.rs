use serde::Deserialize;

/// Default PAN registry stub used when `PAN_REGISTRY` is not configured.
///
/// Stand-in for a real PAN-registry lookup; the three entries come from the demo
/// dataset and are only consulted by the fallback validation tier.
const DEFAULT_PAN_REGISTRY: &[&str] = &["ABCDE1234F", "BNZPM2501F", "BODPM4264E"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub upload_dir: String,
    /// OCR vendor endpoint. When unset, OCR is disabled and validation relies on the fallback tier.
    pub ocr_base_url: Option<String>,
    pub ocr_api_key: Option<String>,
    /// LLM endpoint for recommendation explanations. When unset, the composer
    /// always answers with the deterministic fallback.
    pub llm_base_url: Option<String>,
    pub llm_api_key: Option<String>,
    /// Vector-search capability for card retrieval and catalog indexing.
    pub vector_base_url: Option<String>,
    /// Local card-record JSON file, used to build the catalog when no vector store is configured.
    pub card_data_file: Option<String>,
    /// Credit bureau endpoint; mock mode when the API key is absent.
    pub cibil_base_url: Option<String>,
    pub cibil_api_key: Option<String>,
    /// File-hosting endpoint for uploaded documents. When unset, local paths are used as URLs.
    pub file_host_url: Option<String>,
    /// Notification webhook for application status emails (fire-and-forget).
    pub notify_url: Option<String>,
    /// PAN registry stub for the fallback validation tier.
    pub pan_registry: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            upload_dir: std::env::var("UPLOAD_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "./uploads".to_string()),
            ocr_base_url: optional_http_url("OCR_BASE_URL")?,
            ocr_api_key: std::env::var("OCR_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            llm_base_url: optional_http_url("LLM_BASE_URL")?,
            llm_api_key: std::env::var("LLM_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            vector_base_url: optional_http_url("VECTOR_BASE_URL")?,
            card_data_file: std::env::var("CARD_DATA_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            cibil_base_url: optional_http_url("CIBIL_BASE_URL")?,
            cibil_api_key: std::env::var("CIBIL_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            file_host_url: optional_http_url("FILE_HOST_URL")?,
            notify_url: optional_http_url("NOTIFY_URL")?,
            pan_registry: std::env::var("PAN_REGISTRY")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| {
                    s.split(',')
                        .map(|p| p.trim().to_uppercase())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| {
                    DEFAULT_PAN_REGISTRY
                        .iter()
                        .map(|s| s.to_string())
                        .collect()
                }),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("Upload dir: {}", config.upload_dir);
        if let Some(ref url) = config.ocr_base_url {
            tracing::info!("OCR vendor configured: {}", url);
        } else {
            tracing::warn!("OCR disabled; document validation will use the fallback tier only");
        }
        if let Some(ref url) = config.llm_base_url {
            tracing::info!("LLM endpoint configured: {}", url);
        }
        if let Some(ref url) = config.vector_base_url {
            tracing::info!("Vector search configured: {}", url);
        } else if let Some(ref file) = config.card_data_file {
            tracing::info!("Card catalog will load from file: {}", file);
        } else {
            tracing::warn!("No card catalog source configured; recommendations start empty");
        }
        if config.cibil_api_key.is_none() {
            tracing::info!("CIBIL running in mock mode (no API key)");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// True when a CIBIL vendor is fully configured; otherwise the mock path is used.
    pub fn cibil_mock_mode(&self) -> bool {
        self.cibil_base_url.is_none() || self.cibil_api_key.is_none()
    }
}

/// Reads an optional env var that must be a well-formed http(s) URL when present.
fn optional_http_url(name: &str) -> anyhow::Result<Option<String>> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            let parsed = url::Url::parse(raw.trim())
                .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
            // Keep the trimmed original rather than the re-serialized form so
            // base URLs without a trailing slash stay joinable with format!().
            Ok(Some(raw.trim().trim_end_matches('/').to_string()))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_http_url_rejects_bad_schemes() {
        std::env::set_var("TEST_CFG_FTP_URL", "ftp://files.example.com");
        assert!(optional_http_url("TEST_CFG_FTP_URL").is_err());
        std::env::remove_var("TEST_CFG_FTP_URL");
    }

    #[test]
    fn optional_http_url_strips_trailing_slash() {
        std::env::set_var("TEST_CFG_OK_URL", "https://ocr.example.com/ ");
        let url = optional_http_url("TEST_CFG_OK_URL").unwrap();
        assert_eq!(url.as_deref(), Some("https://ocr.example.com"));
        std::env::remove_var("TEST_CFG_OK_URL");
    }

    #[test]
    fn optional_http_url_treats_blank_as_absent() {
        std::env::set_var("TEST_CFG_BLANK_URL", "   ");
        assert_eq!(optional_http_url("TEST_CFG_BLANK_URL").unwrap(), None);
        std::env::remove_var("TEST_CFG_BLANK_URL");
    }
}
