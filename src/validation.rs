/// Two-tier document validation.
///
/// Tier 1 compares OCR-extracted fields against the submitted form values.
/// Tier 2 is a weaker per-type fallback used when OCR produced nothing usable.
/// Validation never errors: malformed or missing input produces a Failed
/// result with a reason code, not an exception.
use crate::models::{DocumentType, ExtractedFields, UploadForm, ValidationResult, ValidationStatus};
use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use regex::Regex;

/// Relative tolerance for payslip salary comparison.
pub const SALARY_TOLERANCE: f64 = 0.10;

/// Minimum declared salary accepted by the payslip fallback rule.
pub const MIN_DECLARED_SALARY: f64 = 10_000.0;

/// Uppercases and trims a PAN for comparison. Idempotent.
pub fn normalize_pan(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Structural PAN check: `[A-Z]{5}[0-9]{4}[A-Z]` after normalization.
pub fn is_valid_pan(raw: &str) -> bool {
    let normalized = normalize_pan(raw);
    Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$")
        .map(|re| re.is_match(&normalized))
        .unwrap_or(false)
}

/// Case- and space-insensitive normalization for identity numbers.
fn normalize_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// True when `extracted` is within the relative salary tolerance of `declared`.
pub fn salary_within_tolerance(extracted: f64, declared: f64) -> bool {
    if declared <= 0.0 {
        return false;
    }
    ((extracted - declared).abs() / declared) < SALARY_TOLERANCE
}

/// Validates one uploaded document against the submitted form.
///
/// `extracted` is the OCR extraction output when OCR succeeded; `None` means
/// OCR was unavailable or failed and only the fallback tier applies.
/// Deterministic: the same inputs always produce the same result.
pub fn validate_document(
    declared_type: &str,
    file_name: &str,
    form: &UploadForm,
    extracted: Option<&ExtractedFields>,
    pan_registry: &[String],
) -> ValidationResult {
    let (status, reason_code) = match DocumentType::parse(declared_type) {
        Some(DocumentType::Aadhaar) => validate_aadhaar(file_name, form, extracted),
        Some(DocumentType::Pan) => validate_pan(form, extracted, pan_registry),
        Some(DocumentType::Passport) => validate_passport(form, extracted),
        Some(DocumentType::VoterId) => validate_voter_id(form, extracted),
        Some(DocumentType::Payslip) => validate_payslip(form, extracted),
        Some(DocumentType::BankStatement) => validate_bank_statement(file_name, extracted),
        None => (ValidationStatus::Failed, "UnknownType"),
    };

    tracing::debug!(
        "Validated {} ({}): {} [{}]",
        file_name,
        declared_type,
        status.as_str(),
        reason_code
    );

    ValidationResult {
        file_name: file_name.to_string(),
        document_type: declared_type.to_string(),
        status,
        reason_code: reason_code.to_string(),
    }
}

fn validate_aadhaar(
    file_name: &str,
    form: &UploadForm,
    extracted: Option<&ExtractedFields>,
) -> (ValidationStatus, &'static str) {
    let declared = form.aadhaar_number.as_deref().filter(|s| !s.is_empty());

    // Tier 1: exact match (space-insensitive) between OCR number and form number.
    if let (Some(found), Some(declared)) = (
        extracted.and_then(|e| e.aadhaar_number.as_deref()),
        declared,
    ) {
        return if normalize_id(found) == normalize_id(declared) {
            (ValidationStatus::Passed, "AadhaarOcrMatch")
        } else {
            (ValidationStatus::Failed, "AadhaarOcrMismatch")
        };
    }

    // Tier 2: filename carries the declared number, or a full name was supplied.
    if let Some(declared) = declared {
        if file_name.contains(declared) {
            return (ValidationStatus::Passed, "AadhaarFilenameMatch");
        }
    }
    if form.fullname.as_deref().is_some_and(|n| !n.is_empty()) {
        return (ValidationStatus::Passed, "AadhaarNameSupplied");
    }

    (ValidationStatus::Failed, "AadhaarUnverified")
}

fn validate_pan(
    form: &UploadForm,
    extracted: Option<&ExtractedFields>,
    pan_registry: &[String],
) -> (ValidationStatus, &'static str) {
    let declared = form.pan_number.as_deref().filter(|s| !s.is_empty());

    // Tier 1: structural check plus uppercase-normalized comparison.
    if let (Some(found), Some(declared)) = (
        extracted.and_then(|e| e.pan_number.as_deref()),
        declared,
    ) {
        let declared = normalize_pan(declared);
        return if is_valid_pan(&declared) && normalize_pan(found) == declared {
            (ValidationStatus::Passed, "PanOcrMatch")
        } else {
            (ValidationStatus::Failed, "PanOcrMismatch")
        };
    }

    // Tier 2: registry stub membership (stand-in for a real PAN-registry check).
    match declared {
        Some(declared) if pan_registry.contains(&normalize_pan(declared)) => {
            (ValidationStatus::Passed, "PanRegistryMatch")
        }
        Some(_) => (ValidationStatus::Failed, "PanNotInRegistry"),
        None => (ValidationStatus::Failed, "PanMissing"),
    }
}

fn validate_passport(
    form: &UploadForm,
    extracted: Option<&ExtractedFields>,
) -> (ValidationStatus, &'static str) {
    let declared = form.passport_number.as_deref().filter(|s| !s.is_empty());

    if let (Some(found), Some(declared)) = (
        extracted.and_then(|e| e.passport_number.as_deref()),
        declared,
    ) {
        return if normalize_id(found) == normalize_id(declared) {
            (ValidationStatus::Passed, "PassportOcrMatch")
        } else {
            (ValidationStatus::Failed, "PassportOcrMismatch")
        };
    }

    // Tier 2: both passport number and DOB must be present on the form.
    let has_dob = form.dob.as_deref().is_some_and(|d| !d.is_empty());
    if declared.is_some() && has_dob {
        (ValidationStatus::Passed, "PassportDetailsSupplied")
    } else {
        (ValidationStatus::Failed, "PassportDetailsMissing")
    }
}

fn validate_voter_id(
    form: &UploadForm,
    extracted: Option<&ExtractedFields>,
) -> (ValidationStatus, &'static str) {
    let declared = form.voter_id.as_deref().filter(|s| !s.is_empty());

    if let (Some(found), Some(declared)) = (
        extracted.and_then(|e| e.voter_id_number.as_deref()),
        declared,
    ) {
        return if normalize_id(found) == normalize_id(declared) {
            (ValidationStatus::Passed, "VoterIdOcrMatch")
        } else {
            (ValidationStatus::Failed, "VoterIdOcrMismatch")
        };
    }

    if declared.is_some() {
        (ValidationStatus::Passed, "VoterIdSupplied")
    } else {
        (ValidationStatus::Failed, "VoterIdMissing")
    }
}

fn validate_payslip(
    form: &UploadForm,
    extracted: Option<&ExtractedFields>,
) -> (ValidationStatus, &'static str) {
    let declared = form.salary.filter(|s| *s > 0.0);

    // Tier 1: tolerance comparison against the best extracted amount.
    // Net salary is the closest to take-home pay, so it wins over gross/basic.
    let found = extracted.and_then(|e| e.net_salary.or(e.gross_salary).or(e.basic_salary));
    if let (Some(found), Some(declared)) = (found, declared) {
        return if salary_within_tolerance(found, declared) {
            (ValidationStatus::Passed, "SalaryWithinTolerance")
        } else {
            (ValidationStatus::Failed, "SalaryToleranceExceeded")
        };
    }

    // Tier 2: declared salary must clear the fixed minimum.
    match declared {
        Some(declared) if declared >= MIN_DECLARED_SALARY => {
            (ValidationStatus::Passed, "SalaryAboveMinimum")
        }
        Some(_) => (ValidationStatus::Failed, "SalaryBelowMinimum"),
        None => (ValidationStatus::Failed, "SalaryMissing"),
    }
}

fn validate_bank_statement(
    file_name: &str,
    extracted: Option<&ExtractedFields>,
) -> (ValidationStatus, &'static str) {
    // Tier 1: the statement header named a known bank (allow-list applied at extraction).
    if extracted.and_then(|e| e.bank_name.as_deref()).is_some() {
        return (ValidationStatus::Passed, "BankNameRecognized");
    }

    if file_name.to_lowercase().contains("bank") {
        (ValidationStatus::Passed, "BankFilenameMatch")
    } else {
        (ValidationStatus::Failed, "BankStatementUnverified")
    }
}

/// Validate and normalize an Indian mobile number.
///
/// Uses the phonenumber library (port of Google's libphonenumber) to parse
/// with the IN region and format to E.164 (+919876543210).
///
/// Returns: (is_valid, normalized_phone_or_error_msg)
pub fn validate_in_mobile(raw: &str) -> (bool, String) {
    if raw.trim().is_empty() || raw.len() < 8 {
        return (false, "Phone too short".to_string());
    }

    match phonenumber::parse(Some(CountryId::IN), raw) {
        Ok(number) => {
            if phonenumber::is_valid(&number) {
                let formatted = number.format().mode(Mode::E164).to_string();
                tracing::debug!("Valid IN mobile: {} -> {}", raw, formatted);
                (true, formatted)
            } else {
                tracing::warn!("Invalid IN mobile number: {}", raw);
                (false, "Invalid Indian mobile number".to_string())
            }
        }
        Err(e) => {
            tracing::warn!("Failed to parse IN mobile '{}': {:?}", raw, e);
            (false, format!("Parse error: {:?}", e))
        }
    }
}
