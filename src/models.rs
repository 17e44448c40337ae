use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============ Document Models ============

/// KYC document categories accepted by the upload flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentType {
    Aadhaar,
    Pan,
    Passport,
    VoterId,
    Payslip,
    BankStatement,
}

impl DocumentType {
    /// Parses a form field name into a document type (case-insensitive).
    ///
    /// Returns `None` for unknown types; the validator maps those to a Failed
    /// result rather than an error.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "aadhaar" => Some(Self::Aadhaar),
            "pan" => Some(Self::Pan),
            "passport" => Some(Self::Passport),
            "voterid" => Some(Self::VoterId),
            "payslip" => Some(Self::Payslip),
            "bankstatement" => Some(Self::BankStatement),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aadhaar => "aadhaar",
            Self::Pan => "pan",
            Self::Passport => "passport",
            Self::VoterId => "voterId",
            Self::Payslip => "payslip",
            Self::BankStatement => "bankStatement",
        }
    }
}

/// A single `(date, amount)` pair pulled from a bank statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: String,
    pub amount: f64,
}

/// Fields the extractor may recover from OCR text.
///
/// Every field is optional: a missing pattern degrades confidence downstream,
/// it never fails extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aadhaar_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pan_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passport_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voter_id_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub father_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_salary: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_salary: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_salary: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<Transaction>>,
}

/// Output of one OCR pass over an uploaded file. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub document_type: DocumentType,
    pub raw_text: String,
    pub extracted_fields: ExtractedFields,
    /// OCR engine confidence in [0, 1].
    pub confidence: f64,
}

// ============ Validation Models ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    Passed,
    Failed,
    Unknown,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }
}

/// Per-file validation outcome. Status is always derived from an explicit
/// comparison; reason codes identify which rule decided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub file_name: String,
    /// Declared document type field name, kept raw so unknown types flow through.
    pub document_type: String,
    pub status: ValidationStatus,
    pub reason_code: String,
}

// ============ Application Models ============

/// Banking service the application is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceType {
    CreditCard,
    Loan,
    Account,
    /// Unknown service types are accepted and numbered with the `XX` prefix.
    Other(String),
}

impl ServiceType {
    /// Application number prefix per service.
    pub fn number_prefix(&self) -> &str {
        match self {
            Self::CreditCard => "CC",
            Self::Loan => "PF",
            Self::Account => "BA",
            Self::Other(_) => "XX",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::CreditCard => "credit_card",
            Self::Loan => "loan",
            Self::Account => "account",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for ServiceType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "credit_card" => Self::CreditCard,
            "loan" => Self::Loan,
            "account" => Self::Account,
            _ => Self::Other(raw),
        }
    }
}

impl From<ServiceType> for String {
    fn from(value: ServiceType) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Approved,
    Rejected,
    Pending,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Pending => "Pending",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Approved" => Some(Self::Approved),
            "Rejected" => Some(Self::Rejected),
            "Pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

/// One persisted application submission. Created once; `overall_status` is
/// always derived from the validation results, never set independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub id: Uuid,
    /// Unique business key, format `<PREFIX>-<6 digits>`.
    pub application_number: String,
    pub user_id: String,
    pub service_type: ServiceType,
    pub document_urls: Vec<String>,
    pub validation_results: Vec<ValidationResult>,
    pub overall_status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

/// Form fields submitted alongside the document files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadForm {
    pub service_type: Option<String>,
    pub email: Option<String>,
    pub fullname: Option<String>,
    pub aadhaar_number: Option<String>,
    pub pan_number: Option<String>,
    pub passport_number: Option<String>,
    pub voter_id: Option<String>,
    pub dob: Option<String>,
    pub salary: Option<f64>,
    pub mobile: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub application_number: String,
    pub application_status: ApplicationStatus,
    pub validation_results: Vec<ValidationResult>,
    pub document_urls: Vec<String>,
}

// ============ Recommendation Models ============

/// Annual-fee appetite declared by the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeTolerance {
    None,
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmploymentType {
    #[serde(rename = "salaried")]
    Salaried,
    #[serde(rename = "self-employed")]
    SelfEmployed,
}

/// Transient customer profile built per recommendation request; not persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    #[serde(default)]
    pub income: Option<f64>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub credit_score: Option<u32>,
    #[serde(default)]
    pub spending_categories: Vec<String>,
    #[serde(default)]
    pub preferred_rewards: Vec<String>,
    #[serde(default)]
    pub annual_fee_tolerance: Option<FeeTolerance>,
    #[serde(default)]
    pub employment_type: Option<EmploymentType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationMode {
    #[default]
    Content,
    Hybrid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    #[serde(flatten)]
    pub profile: CustomerProfile,
    #[serde(default)]
    pub mode: RecommendationMode,
    /// Optional PAN; when present the response embeds a credit-score report.
    #[serde(default)]
    pub pan_number: Option<String>,
}

/// Which pipeline produced a recommendation, kept for downstream analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationSource {
    #[serde(rename = "content-based")]
    ContentBased,
    #[serde(rename = "hybrid")]
    Hybrid,
    #[serde(rename = "fallback")]
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationItem {
    pub rank: u32,
    pub card_name: String,
    /// Human-readable match strength, e.g. "87%".
    pub match_score: String,
    /// Raw cosine similarity in [-1, 1].
    pub similarity_score: f64,
    pub why_recommended: String,
    pub key_benefits: Vec<String>,
    pub fees_and_charges: String,
    pub recommendation_source: RecommendationSource,
    /// Blended score, present only for hybrid results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub recommendations: Vec<RecommendationItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cibil_data: Option<CibilReport>,
}

/// Structured card record consumed from the vector store or a local data file.
/// How these are scraped/assembled is outside this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub card_name: String,
    pub content: String,
}

/// A scored document returned by the vector-search capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardExcerpt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_name: Option<String>,
    pub content: String,
    pub score: f64,
}

// ============ Credit Bureau Models ============

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CibilRequest {
    pub pan_number: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub income: Option<f64>,
    #[serde(default)]
    pub employment_type: Option<EmploymentType>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CibilFactors {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CibilReport {
    pub cibil_score: u32,
    pub score_range: String,
    pub factors: CibilFactors,
    pub recommendations: Vec<String>,
    pub last_updated: DateTime<Utc>,
    pub report_id: String,
    pub is_mock: bool,
}

/// Card and loan buckets a given score qualifies for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditEligibility {
    pub credit_cards: Vec<String>,
    pub loans: Vec<String>,
    pub overall_rating: String,
}
