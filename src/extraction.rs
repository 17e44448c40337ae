/// Field extraction from raw OCR text.
///
/// Each document type has its own set of pattern rules. Extraction is
/// best-effort: a pattern that does not match yields `None` for that field and
/// the validator falls back to its weaker rule tier. Extraction itself never
/// fails a document.
use crate::models::{DocumentType, ExtractedFields, Transaction};
use regex::Regex;

/// Banks recognized on statement headers. Fixed allow-list, matched case-insensitively.
pub const KNOWN_BANKS: &[&str] = &[
    "ICICI Bank",
    "HDFC Bank",
    "State Bank of India",
    "Axis Bank",
    "Kotak Mahindra Bank",
];

/// Extracts the typed fields for a document type from raw OCR text.
pub fn extract_fields(text: &str, document_type: DocumentType) -> ExtractedFields {
    let mut fields = ExtractedFields::default();

    match document_type {
        DocumentType::Aadhaar => {
            fields.aadhaar_number = extract_aadhaar_number(text);
            fields.name = extract_name(text);
            fields.dob = extract_date_of_birth(text);
            fields.address = extract_address(text);
        }
        DocumentType::Pan => {
            fields.pan_number = extract_pan_number(text);
            fields.name = extract_name(text);
            fields.father_name = extract_father_name(text);
            fields.dob = extract_date_of_birth(text);
        }
        DocumentType::Passport => {
            fields.passport_number = extract_passport_number(text);
            fields.name = extract_name(text);
            fields.nationality = first_capture(text, r"(?i)Nationality[:\s]+([A-Z][a-z]+)");
            fields.dob = extract_date_of_birth(text);
            fields.issue_date = first_capture(
                text,
                r"(?i)(?:Issue Date|Date of Issue)[:\s]+(\d{1,2}[/\-]\d{1,2}[/\-]\d{4})",
            );
            fields.expiry_date = first_capture(
                text,
                r"(?i)(?:Expiry Date|Date of Expiry)[:\s]+(\d{1,2}[/\-]\d{1,2}[/\-]\d{4})",
            );
        }
        DocumentType::VoterId => {
            fields.voter_id_number = first_match(text, r"[A-Z]{3}[0-9]{7}");
            fields.name = extract_name(text);
            fields.father_name = extract_father_name(text);
            fields.dob = extract_date_of_birth(text);
        }
        DocumentType::Payslip => {
            fields.name = extract_name(text);
            fields.employee_id =
                first_capture(text, r"(?i)(?:Employee ID|Emp ID)[:\s]+([A-Z0-9]+)");
            fields.basic_salary = extract_amount(text, "Basic");
            fields.gross_salary = extract_amount(text, "Gross");
            fields.net_salary = extract_amount(text, "Net");
            fields.pay_period =
                first_capture(text, r"(?i)(?:Pay Period|Month)[:\s]+([A-Za-z]+\s+\d{4})");
        }
        DocumentType::BankStatement => {
            fields.account_number =
                first_capture(text, r"(?i)(?:Account No|A/c No)[:\s]+(\d+)");
            fields.name = extract_name(text);
            fields.bank_name = extract_bank_name(text);
            fields.statement_period = extract_statement_period(text);
            fields.transactions = extract_transactions(text);
        }
    }

    fields
}

/// 12-digit Aadhaar number, possibly grouped 4-4-4 with spaces. Spaces are
/// stripped so the result always compares as a plain 12-digit string.
/// Grouping is spaces only; crossing a line break would glue a date year to
/// the digits below it.
pub fn extract_aadhaar_number(text: &str) -> Option<String> {
    first_match(text, r"\b\d{4} ?\d{4} ?\d{4}\b").map(|m| m.replace(' ', ""))
}

/// PAN structural pattern `[A-Z]{5}[0-9]{4}[A-Z]`. OCR text may come back
/// mixed-case, so the scan runs over the uppercased text.
pub fn extract_pan_number(text: &str) -> Option<String> {
    first_match(&text.to_uppercase(), r"[A-Z]{5}[0-9]{4}[A-Z]")
}

pub fn extract_passport_number(text: &str) -> Option<String> {
    first_match(text, r"[A-Z][0-9]{7}")
}

/// Best-effort name extraction: a `Name:` label wins, otherwise the first
/// capitalized two-to-four word run.
pub fn extract_name(text: &str) -> Option<String> {
    // Label is matched case-insensitively; the captured name stays
    // case-sensitive and single-line so it cannot swallow following lines.
    first_capture(text, r"(?i:name)[: \t]+([A-Z][a-z]+(?: [A-Z][a-z]+)*)")
        .or_else(|| first_capture(text, r"([A-Z][a-z]+(?: [A-Z][a-z]+){1,3})"))
}

pub fn extract_date_of_birth(text: &str) -> Option<String> {
    first_capture(
        text,
        r"(?i)(?:DOB|Date of Birth)[:\s]+(\d{1,2}[/\-]\d{1,2}[/\-]\d{4})",
    )
    .or_else(|| first_capture(text, r"(\d{1,2}[/\-]\d{1,2}[/\-]\d{4})"))
}

fn extract_address(text: &str) -> Option<String> {
    first_capture(text, r"(?i)Address[:\s]+(.*)")
}

fn extract_father_name(text: &str) -> Option<String> {
    first_capture(
        text,
        r"(?i:father|father's name)[: \t]+([A-Z][a-z]+(?: [A-Z][a-z]+)*)",
    )
}

/// Salary amount following a label, with thousands separators and an optional
/// `Rs.` marker stripped to a plain number.
fn extract_amount(text: &str, label: &str) -> Option<f64> {
    let pattern = format!(
        r"(?i){}[:\s]+(?:Rs\.?\s*)?(\d+(?:,\d+)*(?:\.\d{{2}})?)",
        label
    );
    first_capture(text, &pattern).and_then(|raw| parse_amount(&raw))
}

pub fn extract_bank_name(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    KNOWN_BANKS
        .iter()
        .find(|bank| lower.contains(&bank.to_lowercase()))
        .map(|bank| bank.to_string())
}

fn extract_statement_period(text: &str) -> Option<String> {
    let re = Regex::new(
        r"(?i)Statement Period[:\s]+(\d{1,2}[/\-]\d{1,2}[/\-]\d{4})\s+to\s+(\d{1,2}[/\-]\d{1,2}[/\-]\d{4})",
    )
    .ok()?;
    let caps = re.captures(text)?;
    Some(format!("{} to {}", &caps[1], &caps[2]))
}

/// Transaction rows as `(date, amount)` pairs; `None` when nothing matches.
fn extract_transactions(text: &str) -> Option<Vec<Transaction>> {
    let re = Regex::new(
        r"(\d{1,2}[/\-]\d{1,2}[/\-]\d{4})\s+.*?\s+(\d+(?:,\d+)*(?:\.\d{2})?)",
    )
    .ok()?;

    let transactions: Vec<Transaction> = re
        .captures_iter(text)
        .filter_map(|caps| {
            let amount = parse_amount(caps.get(2)?.as_str())?;
            Some(Transaction {
                date: caps.get(1)?.as_str().to_string(),
                amount,
            })
        })
        .collect();

    if transactions.is_empty() {
        None
    } else {
        Some(transactions)
    }
}

/// Parses an amount string with comma separators into a plain number.
pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

fn first_match(text: &str, pattern: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.find(text).map(|m| m.as_str().to_string())
}

fn first_capture(text: &str, pattern: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.captures(text)?
        .get(1)
        .map(|m| m.as_str().trim().to_string())
}
