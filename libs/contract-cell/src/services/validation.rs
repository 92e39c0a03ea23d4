// libs/contract-cell/src/services/validation.rs
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::models::{ContractError, SubmitContractRequest};

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
    })
}

fn bic_regex() -> &'static Regex {
    static BIC: OnceLock<Regex> = OnceLock::new();
    BIC.get_or_init(|| {
        Regex::new(r"^[A-Z]{6}[A-Z0-9]{2}([A-Z0-9]{3})?$").expect("BIC pattern compiles")
    })
}

/// Removes blanks and upper-cases, the form IBAN and BIC are stored in.
pub fn compact(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase()
}

/// ISO 13616 check: rearranged, letter-expanded number mod 97 must equal 1.
pub fn is_valid_iban(raw: &str) -> bool {
    let iban = compact(raw);
    if !(15..=34).contains(&iban.len()) || !iban.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    let (country, rest) = iban.split_at(2);
    if !country.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }

    let rearranged = format!("{}{}", &rest[2..], &iban[..4]);
    let mut remainder: u32 = 0;
    for c in rearranged.chars() {
        let value = match c.to_digit(36) {
            Some(v) => v,
            None => return false,
        };
        remainder = if value >= 10 {
            (remainder * 100 + value) % 97
        } else {
            (remainder * 10 + value) % 97
        };
    }
    remainder == 1
}

pub fn is_valid_bic(raw: &str) -> bool {
    bic_regex().is_match(&compact(raw))
}

/// German tax identification number: eleven digits, no leading zero.
pub fn is_valid_tax_id(raw: &str) -> bool {
    let digits: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    digits.len() == 11
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0')
}

pub fn is_valid_email(raw: &str) -> bool {
    raw.len() <= 254 && email_regex().is_match(raw.trim())
}

fn invalid(field: &'static str, reason: &str) -> ContractError {
    ContractError::InvalidField { field, reason: reason.to_string() }
}

pub fn validate_submission(request: &SubmitContractRequest, today: NaiveDate) -> Result<(), ContractError> {
    let required = [
        ("first_name", &request.first_name),
        ("last_name", &request.last_name),
        ("street", &request.street),
        ("postal_code", &request.postal_code),
        ("city", &request.city),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(invalid(field, "must not be empty"));
        }
    }

    if !is_valid_email(&request.email) {
        return Err(invalid("email", "not a valid email address"));
    }
    if request.date_of_birth >= today || today.year() - request.date_of_birth.year() > 120 {
        return Err(invalid("date_of_birth", "not a plausible date of birth"));
    }
    if !is_valid_tax_id(&request.tax_id) {
        return Err(invalid("tax_id", "must be 11 digits"));
    }
    if !is_valid_iban(&request.iban) {
        return Err(invalid("iban", "checksum does not match"));
    }
    if !is_valid_bic(&request.bic) {
        return Err(invalid("bic", "must be 8 or 11 characters"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn submission() -> SubmitContractRequest {
        SubmitContractRequest {
            appointment_id: None,
            first_name: "Max".to_string(),
            last_name: "Muster".to_string(),
            email: "max@example.com".to_string(),
            phone: None,
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 1).unwrap(),
            street: "Hauptstr. 1".to_string(),
            postal_code: "10115".to_string(),
            city: "Berlin".to_string(),
            tax_id: "12345678901".to_string(),
            social_security_number: None,
            health_insurance: Some("TK".to_string()),
            iban: "DE89 3704 0044 0532 0130 00".to_string(),
            bic: "COBADEFFXXX".to_string(),
            id_front_path: None,
            id_back_path: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    #[test]
    fn known_good_ibans_pass() {
        assert!(is_valid_iban("DE89370400440532013000"));
        assert!(is_valid_iban("de89 3704 0044 0532 0130 00"));
        assert!(is_valid_iban("GB82WEST12345698765432"));
        assert!(is_valid_iban("AT611904300234573201"));
    }

    #[test]
    fn tampered_ibans_fail() {
        assert!(!is_valid_iban("DE89370400440532013001"));
        assert!(!is_valid_iban("DE8937040044"));
        assert!(!is_valid_iban("1289370400440532013000"));
        assert!(!is_valid_iban("DE89-3704-0044-0532-0130-00"));
    }

    #[test]
    fn bic_accepts_eight_or_eleven_characters() {
        assert!(is_valid_bic("COBADEFF"));
        assert!(is_valid_bic("cobadeffxxx"));
        assert!(!is_valid_bic("COBADEF"));
        assert!(!is_valid_bic("COBADEFFXX"));
        assert!(!is_valid_bic("12BADEFFXXX"));
    }

    #[test]
    fn tax_id_is_eleven_digits() {
        assert!(is_valid_tax_id("12345678901"));
        assert!(is_valid_tax_id("12 345 678 901"));
        assert!(!is_valid_tax_id("02345678901"));
        assert!(!is_valid_tax_id("1234567890"));
        assert!(!is_valid_tax_id("1234567890A"));
    }

    #[test]
    fn complete_submission_validates() {
        assert!(validate_submission(&submission(), today()).is_ok());
    }

    #[test]
    fn first_invalid_field_is_named() {
        let mut request = submission();
        request.iban = "DE00370400440532013000".to_string();
        assert_matches!(
            validate_submission(&request, today()),
            Err(ContractError::InvalidField { field: "iban", .. })
        );

        let mut request = submission();
        request.city = " ".to_string();
        assert_matches!(
            validate_submission(&request, today()),
            Err(ContractError::InvalidField { field: "city", .. })
        );

        let mut request = submission();
        request.date_of_birth = today();
        assert_matches!(
            validate_submission(&request, today()),
            Err(ContractError::InvalidField { field: "date_of_birth", .. })
        );
    }
}
