/// End-to-end tests over the extraction and validation pipeline, driven by
/// realistic OCR text for each document type.
use rust_kyc_api::extraction::extract_fields;
use rust_kyc_api::models::{DocumentType, UploadForm, ValidationStatus};
use rust_kyc_api::validation::{validate_document, validate_in_mobile};

fn registry() -> Vec<String> {
    vec!["ABCDE1234F".to_string(), "BNZPM2501F".to_string()]
}

mod aadhaar_pipeline {
    use super::*;

    const AADHAAR_OCR: &str = "\
Government of India
Unique Identification Authority
Name: Ravi Kumar
DOB: 15/08/1990
1234 5678 9012";

    #[test]
    fn extracted_number_matches_form_and_passes() {
        let fields = extract_fields(AADHAAR_OCR, DocumentType::Aadhaar);
        assert_eq!(fields.aadhaar_number.as_deref(), Some("123456789012"));
        assert_eq!(fields.name.as_deref(), Some("Ravi Kumar"));

        let form = UploadForm {
            aadhaar_number: Some("1234 5678 9012".to_string()),
            ..Default::default()
        };
        let result =
            validate_document("aadhaar", "aadhaar.png", &form, Some(&fields), &registry());
        assert_eq!(result.status, ValidationStatus::Passed);
        assert_eq!(result.reason_code, "AadhaarOcrMatch");
    }

    #[test]
    fn wrong_form_number_fails_even_with_name_present() {
        let fields = extract_fields(AADHAAR_OCR, DocumentType::Aadhaar);
        let form = UploadForm {
            aadhaar_number: Some("999988887777".to_string()),
            fullname: Some("Ravi Kumar".to_string()),
            ..Default::default()
        };
        let result =
            validate_document("aadhaar", "aadhaar.png", &form, Some(&fields), &registry());
        assert_eq!(result.status, ValidationStatus::Failed);
        assert_eq!(result.reason_code, "AadhaarOcrMismatch");
    }

    #[test]
    fn ocr_unavailable_falls_back_to_filename() {
        let form = UploadForm {
            aadhaar_number: Some("123456789012".to_string()),
            ..Default::default()
        };
        let result = validate_document(
            "aadhaar",
            "aadhaar_123456789012.jpg",
            &form,
            None,
            &registry(),
        );
        assert_eq!(result.status, ValidationStatus::Passed);
        assert_eq!(result.reason_code, "AadhaarFilenameMatch");
    }
}

mod pan_pipeline {
    use super::*;

    const PAN_OCR: &str = "\
INCOME TAX DEPARTMENT
Permanent Account Number Card
ABCDE1234F
Name: Ravi Kumar
Father's Name: Suresh Kumar
DOB: 15/08/1990";

    #[test]
    fn extracted_pan_matches_form_case_insensitively() {
        let fields = extract_fields(PAN_OCR, DocumentType::Pan);
        assert_eq!(fields.pan_number.as_deref(), Some("ABCDE1234F"));
        assert_eq!(fields.father_name.as_deref(), Some("Suresh Kumar"));

        let form = UploadForm {
            pan_number: Some("abcde1234f".to_string()),
            ..Default::default()
        };
        let result = validate_document("pan", "pan.png", &form, Some(&fields), &registry());
        assert_eq!(result.status, ValidationStatus::Passed);
        assert_eq!(result.reason_code, "PanOcrMatch");
    }

    #[test]
    fn registry_fallback_when_ocr_found_nothing() {
        let fields = extract_fields("blurred unreadable scan", DocumentType::Pan);
        assert!(fields.pan_number.is_none());

        let form = UploadForm {
            pan_number: Some("bnzpm2501f".to_string()),
            ..Default::default()
        };
        let result = validate_document("pan", "pan.png", &form, Some(&fields), &registry());
        assert_eq!(result.status, ValidationStatus::Passed);
        assert_eq!(result.reason_code, "PanRegistryMatch");
    }
}

mod payslip_pipeline {
    use super::*;

    const PAYSLIP_OCR: &str = "\
ACME Technologies Pvt Ltd
Pay Period: March 2026
Employee ID: EMP-4471
Basic: Rs. 40,000.00
Gross: Rs. 62,000.00
Net: Rs. 52,000.00";

    #[test]
    fn net_salary_wins_the_tolerance_comparison() {
        let fields = extract_fields(PAYSLIP_OCR, DocumentType::Payslip);
        assert_eq!(fields.net_salary, Some(52_000.0));
        assert_eq!(fields.gross_salary, Some(62_000.0));

        // Declared 50k vs extracted net 52k is a 4% gap; gross would have failed.
        let form = UploadForm {
            salary: Some(50_000.0),
            ..Default::default()
        };
        let result =
            validate_document("payslip", "slip.pdf", &form, Some(&fields), &registry());
        assert_eq!(result.status, ValidationStatus::Passed);
        assert_eq!(result.reason_code, "SalaryWithinTolerance");
    }

    #[test]
    fn inflated_declared_salary_is_caught() {
        let fields = extract_fields(PAYSLIP_OCR, DocumentType::Payslip);
        let form = UploadForm {
            salary: Some(90_000.0),
            ..Default::default()
        };
        let result =
            validate_document("payslip", "slip.pdf", &form, Some(&fields), &registry());
        assert_eq!(result.status, ValidationStatus::Failed);
        assert_eq!(result.reason_code, "SalaryToleranceExceeded");
    }
}

mod bank_statement_pipeline {
    use super::*;

    const STATEMENT_OCR: &str = "\
HDFC Bank
Account Statement
Account No: 50100123456789
Name: Ravi Kumar
Statement Period: 01/03/2026 to 31/03/2026";

    #[test]
    fn known_bank_header_passes_validation() {
        let fields = extract_fields(STATEMENT_OCR, DocumentType::BankStatement);
        assert_eq!(fields.bank_name.as_deref(), Some("HDFC Bank"));
        assert_eq!(fields.account_number.as_deref(), Some("50100123456789"));

        let result = validate_document(
            "bankStatement",
            "statement.pdf",
            &UploadForm::default(),
            Some(&fields),
            &registry(),
        );
        assert_eq!(result.status, ValidationStatus::Passed);
        assert_eq!(result.reason_code, "BankNameRecognized");
    }

    #[test]
    fn unknown_bank_needs_the_filename_hint() {
        let fields = extract_fields(
            "Some Unknown Cooperative\nAccount No: 123",
            DocumentType::BankStatement,
        );
        assert!(fields.bank_name.is_none());

        let result = validate_document(
            "bankStatement",
            "statement.pdf",
            &UploadForm::default(),
            Some(&fields),
            &registry(),
        );
        assert_eq!(result.status, ValidationStatus::Failed);
        assert_eq!(result.reason_code, "BankStatementUnverified");
    }
}

mod passport_and_voter_pipeline {
    use super::*;

    #[test]
    fn passport_number_extracted_and_matched() {
        let text = "REPUBLIC OF INDIA\nPassport\nM1234567\nName: Ravi Kumar";
        let fields = extract_fields(text, DocumentType::Passport);
        assert_eq!(fields.passport_number.as_deref(), Some("M1234567"));

        let form = UploadForm {
            passport_number: Some("m1234567".to_string()),
            ..Default::default()
        };
        let result =
            validate_document("passport", "pp.jpg", &form, Some(&fields), &registry());
        assert_eq!(result.status, ValidationStatus::Passed);
        assert_eq!(result.reason_code, "PassportOcrMatch");
    }

    #[test]
    fn voter_id_fallback_accepts_supplied_id() {
        let form = UploadForm {
            voter_id: Some("ABC1234567".to_string()),
            ..Default::default()
        };
        let result = validate_document("voterId", "voter.png", &form, None, &registry());
        assert_eq!(result.status, ValidationStatus::Passed);
        assert_eq!(result.reason_code, "VoterIdSupplied");
    }
}

mod mobile_validation {
    use super::*;

    #[test]
    fn plain_ten_digit_mobile_normalizes_to_e164() {
        let (valid, normalized) = validate_in_mobile("9876543210");
        assert!(valid);
        assert_eq!(normalized, "+919876543210");
    }

    #[test]
    fn already_prefixed_number_is_accepted() {
        let (valid, normalized) = validate_in_mobile("+91 98765 43210");
        assert!(valid);
        assert_eq!(normalized, "+919876543210");
    }

    #[test]
    fn landline_length_inputs_are_rejected() {
        let (valid, _) = validate_in_mobile("12345");
        assert!(!valid);

        let (valid, _) = validate_in_mobile("");
        assert!(!valid);
    }
}
