use crate::cache_validator::{self, ValidatedCacheEntry};
use crate::config::Config;
use crate::errors::AppError;
use crate::extraction;
use crate::models::{
    ApplicationRecord, ApplicationStatus, DocumentType, ServiceType, UploadForm, UploadResponse,
    ValidationResult, ValidationStatus,
};
use crate::services::{FileHostService, NotificationService, OcrOutput, OcrService};
use crate::storage::ApplicationStore;
use crate::validation;
use chrono::Utc;
use moka::future::Cache;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// One uploaded document: the multipart field name declares the document type.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub document_type: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Runs the submission workflow: store files, OCR, validate, aggregate,
/// persist, notify.
pub struct ApplicationService {
    store: ApplicationStore,
    ocr: OcrService,
    files: FileHostService,
    notifier: Arc<NotificationService>,
    /// OCR results keyed by file checksum, so re-uploads of the same bytes
    /// skip the vendor.
    ocr_cache: Cache<String, String>,
    pan_registry: Vec<String>,
}

impl ApplicationService {
    pub fn new(config: &Config, pool: PgPool, ocr_cache: Cache<String, String>) -> Self {
        Self {
            store: ApplicationStore::new(pool),
            ocr: OcrService::new(config),
            files: FileHostService::new(config),
            notifier: Arc::new(NotificationService::new(config)),
            ocr_cache,
            pan_registry: config.pan_registry.clone(),
        }
    }

    pub fn store(&self) -> &ApplicationStore {
        &self.store
    }

    /// Processes one application submission end to end.
    ///
    /// Per-document vendor failures (OCR down, unreadable scan) degrade that
    /// document to the fallback validation tier; they never abort the
    /// submission. Storage failures do abort it.
    pub async fn submit(
        &self,
        form: UploadForm,
        documents: Vec<UploadedDocument>,
    ) -> Result<UploadResponse, AppError> {
        if documents.is_empty() {
            return Err(AppError::BadRequest("No documents uploaded".to_string()));
        }
        let service_type = ServiceType::from(
            form.service_type
                .clone()
                .ok_or_else(|| AppError::BadRequest("serviceType is required".to_string()))?,
        );
        if let Some(ref mobile) = form.mobile {
            let (valid, normalized) = validation::validate_in_mobile(mobile);
            if !valid {
                return Err(AppError::BadRequest("Invalid mobile number".to_string()));
            }
            tracing::debug!("Mobile normalized to {}", normalized);
        }

        let user_id = form
            .email
            .clone()
            .unwrap_or_else(|| "anonymous".to_string());

        tracing::info!(
            "Step 1: Processing {} document(s) for {} application",
            documents.len(),
            service_type.as_str()
        );

        let mut document_urls = Vec::with_capacity(documents.len());
        let mut validation_results = Vec::with_capacity(documents.len());

        for document in documents {
            let checksum = cache_validator::file_checksum(&document.bytes);

            let url = self
                .files
                .store(&document.file_name, document.bytes.clone())
                .await?;
            document_urls.push(url);

            tracing::info!(
                "Step 2: Stored {} ({} bytes), running OCR",
                document.file_name,
                document.bytes.len()
            );

            let ocr_output = self
                .ocr_text(&checksum, &document.file_name, document.bytes)
                .await;

            let extracted = match (&ocr_output, DocumentType::parse(&document.document_type)) {
                (Some(output), Some(document_type)) => {
                    Some(extraction::extract_fields(&output.text, document_type))
                }
                _ => None,
            };

            let result = validation::validate_document(
                &document.document_type,
                &document.file_name,
                &form,
                extracted.as_ref(),
                &self.pan_registry,
            );
            tracing::info!(
                "Step 3: Validated {} as {}: {} ({})",
                document.file_name,
                document.document_type,
                result.status.as_str(),
                result.reason_code
            );
            validation_results.push(result);
        }

        let overall_status = derive_overall_status(&validation_results);
        tracing::info!("Step 4: Overall status {}", overall_status.as_str());

        let record = self
            .persist(user_id, service_type, document_urls, validation_results)
            .await?;
        tracing::info!(
            "Step 5: Persisted application {} ({})",
            record.application_number,
            record.id
        );

        if let Some(email) = form.email {
            let notifier = self.notifier.clone();
            let application_number = record.application_number.clone();
            let status = record.overall_status;
            tokio::spawn(async move {
                if let Err(e) = notifier
                    .send_status_email(&email, &application_number, status)
                    .await
                {
                    tracing::warn!(
                        "Status email for {} failed: {}",
                        application_number,
                        e
                    );
                }
            });
        }

        Ok(UploadResponse {
            application_number: record.application_number,
            application_status: record.overall_status,
            validation_results: record.validation_results,
            document_urls: record.document_urls,
        })
    }

    /// OCR with checksum-keyed caching. Any failure returns `None` and the
    /// document is validated on the fallback tier.
    async fn ocr_text(
        &self,
        checksum: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Option<OcrOutput> {
        if !self.ocr.is_configured() {
            return None;
        }

        if let Some(cached) = self.ocr_cache.get(checksum).await {
            if let Some(data) = ValidatedCacheEntry::deserialize_and_validate(&cached) {
                if let Ok(output) = serde_json::from_str::<OcrOutput>(&data) {
                    tracing::debug!("OCR cache hit for {}", file_name);
                    return Some(output);
                }
            }
            // Corrupt entry, drop it and refetch.
            self.ocr_cache.invalidate(checksum).await;
        }

        match self.ocr.recognize(file_name, bytes).await {
            Ok(output) => {
                if let Ok(data) = serde_json::to_string(&output) {
                    self.ocr_cache
                        .insert(checksum.to_string(), ValidatedCacheEntry::new(data).serialize())
                        .await;
                }
                Some(output)
            }
            Err(e) => {
                tracing::warn!(
                    "OCR failed for {}, validating on fallback tier: {}",
                    file_name,
                    e
                );
                None
            }
        }
    }

    /// Persists with one retry: a duplicate application number gets a fresh
    /// number exactly once before the conflict surfaces.
    async fn persist(
        &self,
        user_id: String,
        service_type: ServiceType,
        document_urls: Vec<String>,
        validation_results: Vec<ValidationResult>,
    ) -> Result<ApplicationRecord, AppError> {
        let overall_status = derive_overall_status(&validation_results);
        let mut record = ApplicationRecord {
            id: Uuid::new_v4(),
            application_number: generate_application_number(&service_type),
            user_id,
            service_type,
            document_urls,
            validation_results,
            overall_status,
            created_at: Utc::now(),
        };

        match self.store.insert(&record).await {
            Ok(()) => Ok(record),
            Err(AppError::Conflict(_)) => {
                tracing::warn!(
                    "Application number {} collided, regenerating",
                    record.application_number
                );
                record.application_number = generate_application_number(&record.service_type);
                self.store.insert(&record).await?;
                Ok(record)
            }
            Err(e) => Err(e),
        }
    }
}

/// Rejected iff any document failed validation; Unknown outcomes do not
/// reject on their own.
pub fn derive_overall_status(results: &[ValidationResult]) -> ApplicationStatus {
    if results
        .iter()
        .any(|r| r.status == ValidationStatus::Failed)
    {
        ApplicationStatus::Rejected
    } else {
        ApplicationStatus::Approved
    }
}

/// `<PREFIX>-<6 digits>`, entropy drawn from a fresh UUID.
pub fn generate_application_number(service_type: &ServiceType) -> String {
    let bytes = Uuid::new_v4().into_bytes();
    let x = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    format!("{}-{}", service_type.number_prefix(), 100_000 + x % 900_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: ValidationStatus) -> ValidationResult {
        ValidationResult {
            file_name: "doc.pdf".to_string(),
            document_type: "aadhaar".to_string(),
            status,
            reason_code: "Test".to_string(),
        }
    }

    #[test]
    fn any_failed_document_rejects_the_application() {
        let results = vec![
            result(ValidationStatus::Passed),
            result(ValidationStatus::Failed),
            result(ValidationStatus::Passed),
        ];
        assert_eq!(derive_overall_status(&results), ApplicationStatus::Rejected);
    }

    #[test]
    fn all_passed_approves() {
        let results = vec![result(ValidationStatus::Passed)];
        assert_eq!(derive_overall_status(&results), ApplicationStatus::Approved);
    }

    #[test]
    fn unknown_alone_does_not_reject() {
        let results = vec![
            result(ValidationStatus::Passed),
            result(ValidationStatus::Unknown),
        ];
        assert_eq!(derive_overall_status(&results), ApplicationStatus::Approved);
    }

    #[test]
    fn application_number_format() {
        for (service, prefix) in [
            (ServiceType::CreditCard, "CC"),
            (ServiceType::Loan, "PF"),
            (ServiceType::Account, "BA"),
            (ServiceType::Other("mortgage".to_string()), "XX"),
        ] {
            let number = generate_application_number(&service);
            let (got_prefix, digits) = number.split_once('-').expect("has dash");
            assert_eq!(got_prefix, prefix);
            assert_eq!(digits.len(), 6);
            let value: u32 = digits.parse().expect("six digits");
            assert!((100_000..1_000_000).contains(&value));
        }
    }
}
