//! Schema-validation collaborator contract.
//!
//! Field-level rules are owned outside this core. The pipeline only needs a
//! narrow contract: validate a parsed payload and get back either the typed
//! form or structured issues. Any concrete schema engine plugs in behind
//! [`PayloadValidator`]; [`BasicValidator`] ships so the binary runs
//! standalone.

use serde_json::Value;

use crate::error::FieldIssue;

/// A validated lead/contact submission.
#[derive(Debug, Clone)]
pub struct LeadForm {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub message: Option<String>,
    pub form_type: String,
}

/// Result of validating a raw payload.
pub enum Outcome {
    Valid(LeadForm),
    Invalid(Vec<FieldIssue>),
}

/// The pluggable validation seam.
pub trait PayloadValidator: Send + Sync {
    fn validate(&self, raw: &Value) -> Outcome;
}

/// Minimal built-in validator: required non-empty name, a plausible phone,
/// a known form type, and a well-formed optional email.
pub struct BasicValidator;

const KNOWN_TYPES: &[&str] = &["quick-quote", "brochure", "contact"];

impl BasicValidator {
    fn issue(msg: &str, param: &str) -> FieldIssue {
        FieldIssue {
            msg: msg.to_string(),
            param: param.to_string(),
        }
    }
}

fn str_field<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key).and_then(Value::as_str)
}

fn plausible_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    (8..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

impl PayloadValidator for BasicValidator {
    fn validate(&self, raw: &Value) -> Outcome {
        let mut issues = Vec::new();

        let name = str_field(raw, "name").map(str::trim).unwrap_or("");
        if name.is_empty() {
            issues.push(Self::issue("Name is required", "name"));
        }

        let phone = str_field(raw, "phone").map(str::trim).unwrap_or("");
        if !plausible_phone(phone) {
            issues.push(Self::issue("A valid phone number is required", "phone"));
        }

        let form_type = str_field(raw, "type").unwrap_or("");
        if !KNOWN_TYPES.contains(&form_type) {
            issues.push(Self::issue("Unknown form type", "type"));
        }

        let email = str_field(raw, "email").map(str::trim).filter(|e| !e.is_empty());
        if let Some(email) = email {
            if !email.contains('@') {
                issues.push(Self::issue("Email address is invalid", "email"));
            }
        }

        if !issues.is_empty() {
            return Outcome::Invalid(issues);
        }

        Outcome::Valid(LeadForm {
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.map(str::to_string),
            message: str_field(raw, "message").map(str::to_string),
            form_type: form_type.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_well_formed_lead() {
        let raw = json!({"name": "Asha Rao", "phone": "+919090000000", "type": "quick-quote"});
        match BasicValidator.validate(&raw) {
            Outcome::Valid(form) => {
                assert_eq!(form.name, "Asha Rao");
                assert_eq!(form.form_type, "quick-quote");
            }
            Outcome::Invalid(issues) => panic!("unexpected issues: {:?}", issues),
        }
    }

    #[test]
    fn reports_every_failing_field() {
        let raw = json!({"name": "", "phone": "abc", "type": "mystery"});
        match BasicValidator.validate(&raw) {
            Outcome::Invalid(issues) => {
                let params: Vec<&str> = issues.iter().map(|i| i.param.as_str()).collect();
                assert_eq!(params, vec!["name", "phone", "type"]);
            }
            Outcome::Valid(_) => panic!("should not validate"),
        }
    }

    #[test]
    fn optional_email_must_be_plausible_when_present() {
        let raw = json!({"name": "A", "phone": "12345678", "type": "contact", "email": "nope"});
        assert!(matches!(
            BasicValidator.validate(&raw),
            Outcome::Invalid(_)
        ));
    }

    #[test]
    fn phone_shapes() {
        assert!(plausible_phone("+919090000000"));
        assert!(plausible_phone("08012345678"));
        assert!(!plausible_phone("123"));
        assert!(!plausible_phone("12345678901234567890"));
        assert!(!plausible_phone("90-900-000"));
    }
}
