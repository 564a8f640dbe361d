use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex")
});

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-]{6,19}$").expect("phone regex"));

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Collects field errors for one request body.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.error(field, message);
        }
    }

    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize, message: &str) {
        let len = value.trim().chars().count();
        self.check(len >= min && len <= max, field, message);
    }

    pub fn optional_length(
        &mut self,
        field: &str,
        value: Option<&str>,
        min: usize,
        max: usize,
        message: &str,
    ) {
        if let Some(value) = value {
            self.length(field, value, min, max, message);
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        self.check(
            is_valid_email(value),
            field,
            "Please provide a valid email address",
        );
    }

    pub fn phone(&mut self, field: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.check(
                is_valid_phone(value),
                field,
                "Please provide a valid phone number",
            );
        }
    }

    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str], message: &str) {
        self.check(allowed.contains(&value), field, message);
    }

    pub fn finish(self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

pub fn is_valid_email(value: &str) -> bool {
    value.len() <= 254 && EMAIL_RE.is_match(value)
}

pub fn is_valid_phone(value: &str) -> bool {
    PHONE_RE.is_match(value.trim())
}

/// At least 8 characters with one letter and one digit.
pub fn is_strong_password(value: &str) -> bool {
    value.chars().count() >= 8
        && value.chars().any(|c| c.is_ascii_alphabetic())
        && value.chars().any(|c| c.is_ascii_digit())
}

pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format() {
        assert!(is_valid_email("test@shopmart.com"));
        assert!(!is_valid_email("test@shopmart"));
        assert!(!is_valid_email("no spaces@shopmart.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn phone_format() {
        assert!(is_valid_phone("+1234567890"));
        assert!(is_valid_phone("(555) 123-4567"));
        assert!(!is_valid_phone("call me"));
        assert!(!is_valid_phone("12"));
    }

    #[test]
    fn password_strength() {
        assert!(is_strong_password("Test@123"));
        assert!(!is_strong_password("short1"));
        assert!(!is_strong_password("onlyletters"));
        assert!(!is_strong_password("12345678"));
    }

    #[test]
    fn collects_every_failure() {
        let mut v = Validator::new();
        v.length("first_name", " a ", 2, 50, "First name must be between 2 and 50 characters");
        v.email("email", "nope");
        v.one_of("gender", "X", &["MALE", "FEMALE", "OTHER"], "bad gender");
        v.phone("phone", None);

        match v.finish() {
            Err(AppError::Validation(fields)) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, ["first_name", "email", "gender"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn passes_when_clean() {
        let mut v = Validator::new();
        v.length("city", "New York", 2, 50, "City must be between 2 and 50 characters");
        v.phone("phone", Some("+1234567890"));
        assert!(v.finish().is_ok());
    }
}
