use crate::circuit_breaker::{create_vendor_circuit_breaker, VendorCircuitBreaker};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::*;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

/// One timeout for every outbound vendor call.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Chat model requested from the LLM endpoint.
const LLM_MODEL: &str = "llama-3.1-8b-instant";

fn http_client() -> Client {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string())
}

// ============ OCR vendor ============

/// OCR vendor client. Unconfigured OCR is a supported state: the caller checks
/// `is_configured` and validation degrades to its fallback tier.
pub struct OcrService {
    client: Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct OcrOutput {
    pub text: String,
    #[serde(default)]
    pub confidence: f64,
}

impl OcrService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(),
            base_url: config.ocr_base_url.clone(),
            api_key: config.ocr_api_key.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Runs OCR over one uploaded file.
    pub async fn recognize(&self, file_name: &str, bytes: Vec<u8>) -> Result<OcrOutput, AppError> {
        let base_url = self
            .base_url
            .as_ref()
            .ok_or_else(|| AppError::ExternalApiError("OCR vendor not configured".to_string()))?;
        let url = format!("{}/ocr", base_url);

        tracing::info!("Running OCR for file: {}", file_name);

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut request = self.client.post(&url).multipart(form);
        if let Some(ref key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("OCR request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = error_body(response).await;
            tracing::error!("OCR vendor returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "OCR vendor returned status {}: {}",
                status, error_text
            )));
        }

        let output: OcrOutput = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse OCR response: {}", e))
        })?;

        tracing::info!(
            "OCR completed for {} (confidence {:.2})",
            file_name,
            output.confidence
        );
        Ok(output)
    }
}

// ============ Vector search ============

/// Vector-search capability: card retrieval by text query plus whole-catalog
/// fetch and reindex.
pub struct VectorSearchService {
    client: Client,
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<ScoredDocument>,
}

#[derive(Debug, Deserialize)]
struct DocumentsResponse {
    documents: Vec<CardRecord>,
}

impl VectorSearchService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(),
            base_url: config.vector_base_url.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    fn require_base_url(&self) -> Result<&str, AppError> {
        self.base_url.as_deref().ok_or_else(|| {
            AppError::ExternalApiError("Vector search not configured".to_string())
        })
    }

    /// Free-text similarity search over indexed card documents.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredDocument>, AppError> {
        let url = format!("{}/search", self.require_base_url()?);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "query": query, "limit": limit }))
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Vector search failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = error_body(response).await;
            return Err(AppError::ExternalApiError(format!(
                "Vector store returned status {}: {}",
                status, error_text
            )));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse search response: {}", e))
        })?;
        Ok(parsed.results)
    }

    /// Pulls every card record from the store, used to build the local catalog.
    pub async fn fetch_all_cards(&self) -> Result<Vec<CardRecord>, AppError> {
        let url = format!("{}/documents", self.require_base_url()?);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Card fetch failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = error_body(response).await;
            return Err(AppError::ExternalApiError(format!(
                "Vector store returned status {}: {}",
                status, error_text
            )));
        }

        let parsed: DocumentsResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse documents response: {}", e))
        })?;
        Ok(parsed.documents)
    }

    /// Rebuilds the remote index from the given records.
    pub async fn index_cards(&self, records: &[CardRecord]) -> Result<usize, AppError> {
        let url = format!("{}/index", self.require_base_url()?);

        tracing::info!("Reindexing {} card records", records.len());

        let response = self
            .client
            .post(&url)
            .json(&json!({ "documents": records }))
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Reindex failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = error_body(response).await;
            return Err(AppError::ExternalApiError(format!(
                "Vector store returned status {}: {}",
                status, error_text
            )));
        }

        Ok(records.len())
    }
}

// ============ LLM explanations ============

/// LLM client for recommendation explanations. Never on the scoring path;
/// every failure here degrades to the deterministic fallback.
pub struct LlmService {
    client: Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl LlmService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(),
            base_url: config.llm_base_url.clone(),
            api_key: config.llm_api_key.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Sends one prompt and returns the raw reply text.
    pub async fn complete(&self, prompt: &str) -> Result<String, AppError> {
        let base_url = self
            .base_url
            .as_ref()
            .ok_or_else(|| AppError::ExternalApiError("LLM not configured".to_string()))?;
        let url = format!("{}/v1/chat/completions", base_url);

        let mut request = self.client.post(&url).json(&json!({
            "model": LLM_MODEL,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.2,
        }));
        if let Some(ref key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("LLM request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = error_body(response).await;
            return Err(AppError::ExternalApiError(format!(
                "LLM returned status {}: {}",
                status, error_text
            )));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse LLM response: {}", e))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::ExternalApiError("LLM reply had no choices".to_string()))
    }
}

// ============ Credit bureau ============

/// Credit bureau client. Without a vendor key it answers from a deterministic
/// mock so the rest of the flow can be exercised end to end; mock reports are
/// always flagged `is_mock`.
pub struct CibilService {
    client: Client,
    base_url: Option<String>,
    api_key: Option<String>,
    breaker: VendorCircuitBreaker,
}

impl CibilService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(),
            base_url: config.cibil_base_url.clone(),
            api_key: config.cibil_api_key.clone(),
            breaker: create_vendor_circuit_breaker(),
        }
    }

    pub fn mock_mode(&self) -> bool {
        self.base_url.is_none() || self.api_key.is_none()
    }

    pub async fn fetch_report(&self, request: &CibilRequest) -> Result<CibilReport, AppError> {
        if self.mock_mode() {
            tracing::info!("Serving mock CIBIL report for PAN ending {}", pan_suffix(&request.pan_number));
            return Ok(mock_report(request));
        }

        use failsafe::futures::CircuitBreaker;
        match self.breaker.call(self.fetch_remote(request)).await {
            Ok(report) => Ok(report),
            Err(failsafe::Error::Inner(e)) => {
                // Credit data must stay available; a dead vendor degrades to
                // the mock, and the report is flagged is_mock.
                tracing::warn!("Credit bureau call failed, serving mock report: {}", e);
                Ok(mock_report(request))
            }
            Err(failsafe::Error::Rejected) => {
                tracing::warn!("Credit bureau circuit open, serving mock report");
                Ok(mock_report(request))
            }
        }
    }

    async fn fetch_remote(&self, request: &CibilRequest) -> Result<CibilReport, AppError> {
        // mock_mode() was checked by the caller, both are present here
        let base_url = self
            .base_url
            .as_ref()
            .ok_or_else(|| AppError::ExternalApiError("CIBIL not configured".to_string()))?;
        let url = format!("{}/credit-report", base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.as_deref().unwrap_or_default()),
            )
            .json(&json!({
                "panNumber": request.pan_number,
                "fullName": request.full_name,
                "dob": request.dob,
                "mobile": request.mobile,
            }))
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("CIBIL request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = error_body(response).await;
            return Err(AppError::ExternalApiError(format!(
                "CIBIL returned status {}: {}",
                status, error_text
            )));
        }

        response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse CIBIL response: {}", e))
        })
    }
}

fn pan_suffix(pan: &str) -> &str {
    if pan.is_ascii() && pan.len() >= 4 {
        &pan[pan.len() - 4..]
    } else {
        pan
    }
}

/// Deterministic mock credit report derived from the PAN and declared income.
/// Same input always yields the same score.
pub fn mock_report(request: &CibilRequest) -> CibilReport {
    let score = mock_score(request);
    let range = score_range(score);

    let mut positive = Vec::new();
    let mut negative = Vec::new();
    if score >= 700 {
        positive.push("Long credit history with timely repayments".to_string());
        positive.push("Low credit utilization ratio".to_string());
    } else {
        negative.push("Limited or uneven repayment history".to_string());
    }
    match request.income {
        Some(income) if income > 500_000.0 => {
            positive.push("Stable declared income".to_string());
        }
        Some(_) => {
            negative.push("Declared income on the lower side".to_string());
        }
        None => {}
    }
    if request.employment_type == Some(EmploymentType::Salaried) {
        positive.push("Salaried employment".to_string());
    }

    let recommendations = match range {
        "Excellent" | "Good" => vec![
            "You qualify for most premium credit products".to_string(),
            "Maintain current repayment discipline".to_string(),
        ],
        "Fair" => vec![
            "Pay all EMIs and bills on time to improve your score".to_string(),
            "Keep credit utilization below 30%".to_string(),
        ],
        _ => vec![
            "Clear overdue payments before applying for new credit".to_string(),
            "Avoid multiple credit applications in a short period".to_string(),
        ],
    };

    CibilReport {
        cibil_score: score,
        score_range: range.to_string(),
        factors: CibilFactors { positive, negative },
        recommendations,
        last_updated: Utc::now(),
        report_id: format!("MOCK-{}", Uuid::new_v4().simple()),
        is_mock: true,
    }
}

fn mock_score(request: &CibilRequest) -> u32 {
    let pan = request.pan_number.trim().to_uppercase();
    let char_sum: u32 = pan.bytes().map(u32::from).sum();
    let mut score = 300 + char_sum % 551;

    score += match request.income {
        Some(income) if income > 1_000_000.0 => 50,
        Some(income) if income > 500_000.0 => 30,
        Some(income) if income > 300_000.0 => 15,
        _ => 0,
    };
    score += match request.employment_type {
        Some(EmploymentType::Salaried) => 20,
        Some(EmploymentType::SelfEmployed) => 10,
        None => 0,
    };

    score.clamp(300, 850)
}

pub fn score_range(score: u32) -> &'static str {
    if score >= 750 {
        "Excellent"
    } else if score >= 700 {
        "Good"
    } else if score >= 650 {
        "Fair"
    } else if score >= 600 {
        "Poor"
    } else {
        "Very Poor"
    }
}

/// Product buckets a score qualifies for.
pub fn eligibility(score: u32) -> CreditEligibility {
    if score >= 750 {
        CreditEligibility {
            credit_cards: vec![
                "Premium travel cards".to_string(),
                "Cashback cards".to_string(),
                "Rewards cards".to_string(),
            ],
            loans: vec![
                "Home loans at best rates".to_string(),
                "Personal loans at low interest".to_string(),
            ],
            overall_rating: "Excellent credit profile".to_string(),
        }
    } else if score >= 700 {
        CreditEligibility {
            credit_cards: vec![
                "Rewards cards".to_string(),
                "Cashback cards".to_string(),
            ],
            loans: vec![
                "Home loans".to_string(),
                "Personal loans".to_string(),
            ],
            overall_rating: "Good credit profile".to_string(),
        }
    } else if score >= 650 {
        CreditEligibility {
            credit_cards: vec!["Entry-level cards".to_string()],
            loans: vec!["Secured loans".to_string()],
            overall_rating: "Fair credit profile".to_string(),
        }
    } else {
        CreditEligibility {
            credit_cards: vec!["Secured cards against fixed deposit".to_string()],
            loans: vec!["Loans against collateral only".to_string()],
            overall_rating: "Needs improvement".to_string(),
        }
    }
}

// ============ File hosting ============

/// Stores uploaded documents, either on the configured file host or on local
/// disk under the upload directory.
pub struct FileHostService {
    client: Client,
    base_url: Option<String>,
    upload_dir: String,
}

#[derive(Debug, Deserialize)]
struct UploadResult {
    url: String,
}

impl FileHostService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(),
            base_url: config.file_host_url.clone(),
            upload_dir: config.upload_dir.clone(),
        }
    }

    /// Persists one file and returns its URL (or local path when no host is
    /// configured).
    pub async fn store(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        match self.base_url {
            Some(ref base_url) => self.store_remote(base_url, file_name, bytes).await,
            None => self.store_local(file_name, &bytes).await,
        }
    }

    async fn store_remote(
        &self,
        base_url: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        let url = format!("{}/upload", base_url);
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("File upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = error_body(response).await;
            return Err(AppError::ExternalApiError(format!(
                "File host returned status {}: {}",
                status, error_text
            )));
        }

        let result: UploadResult = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse upload response: {}", e))
        })?;
        Ok(result.url)
    }

    async fn store_local(&self, file_name: &str, bytes: &[u8]) -> Result<String, AppError> {
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create upload dir: {}", e))
            })?;

        let path = format!(
            "{}/{}_{}",
            self.upload_dir.trim_end_matches('/'),
            Uuid::new_v4().simple(),
            sanitize_file_name(file_name)
        );
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to write {}: {}", path, e)))?;
        Ok(path)
    }
}

/// Strips path separators and shell-hostile characters from client file names.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

// ============ Notifications ============

/// Fire-and-forget status notifications. Never on the request path.
pub struct NotificationService {
    client: Client,
    notify_url: Option<String>,
}

impl NotificationService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(),
            notify_url: config.notify_url.clone(),
        }
    }

    pub async fn send_status_email(
        &self,
        email: &str,
        application_number: &str,
        status: ApplicationStatus,
    ) -> Result<(), AppError> {
        let Some(ref url) = self.notify_url else {
            tracing::debug!(
                "Notification webhook not configured, skipping email for {}",
                application_number
            );
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(&json!({
                "to": email,
                "subject": format!("Application {} update", application_number),
                "body": format!(
                    "Your application {} is now {}.",
                    application_number,
                    status.as_str()
                ),
            }))
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Notification failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "Notification webhook returned status {}",
                response.status()
            )));
        }

        tracing::info!("Status email queued for application {}", application_number);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(pan: &str) -> CibilRequest {
        CibilRequest {
            pan_number: pan.to_string(),
            full_name: None,
            dob: None,
            mobile: None,
            income: None,
            employment_type: None,
        }
    }

    #[test]
    fn mock_score_is_deterministic_and_case_insensitive() {
        let upper = mock_score(&request("ABCDE1234F"));
        let lower = mock_score(&request("abcde1234f"));
        assert_eq!(upper, lower);
        assert_eq!(upper, mock_score(&request("ABCDE1234F")));
    }

    #[test]
    fn mock_score_stays_in_cibil_band() {
        for pan in ["ABCDE1234F", "ZZZZZ9999Z", "AAAAA0000A", ""] {
            let mut req = request(pan);
            req.income = Some(5_000_000.0);
            req.employment_type = Some(EmploymentType::Salaried);
            let score = mock_score(&req);
            assert!((300..=850).contains(&score), "{} -> {}", pan, score);
        }
    }

    #[test]
    fn income_and_employment_raise_the_mock_score() {
        let base = mock_score(&request("ABCDE1234F"));

        let mut rich = request("ABCDE1234F");
        rich.income = Some(1_200_000.0);
        rich.employment_type = Some(EmploymentType::Salaried);
        let boosted = mock_score(&rich);

        assert!(boosted >= base);
    }

    #[test]
    fn score_range_boundaries() {
        assert_eq!(score_range(750), "Excellent");
        assert_eq!(score_range(749), "Good");
        assert_eq!(score_range(700), "Good");
        assert_eq!(score_range(650), "Fair");
        assert_eq!(score_range(600), "Poor");
        assert_eq!(score_range(599), "Very Poor");
    }

    #[test]
    fn mock_report_is_flagged() {
        let report = mock_report(&request("ABCDE1234F"));
        assert!(report.is_mock);
        assert!(report.report_id.starts_with("MOCK-"));
        assert!(!report.recommendations.is_empty());
    }

    #[test]
    fn eligibility_buckets_widen_with_score() {
        let excellent = eligibility(800);
        let poor = eligibility(550);
        assert!(excellent.credit_cards.len() > poor.credit_cards.len());
        assert_eq!(poor.overall_rating, "Needs improvement");
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "______etc_passwd");
        assert_eq!(sanitize_file_name("payslip (1).pdf"), "payslip__1_.pdf");
        assert_eq!(sanitize_file_name(""), "upload");
    }
}
