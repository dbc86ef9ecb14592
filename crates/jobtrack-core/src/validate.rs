//! Field validators.
//!
//! Each validator maps a raw field value to an error message, or to an empty
//! string when the value is acceptable. They are pure: the same input always
//! yields the same message, and an empty optional field is always valid.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use reqwest::Url;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("username regex"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));
static MOBILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[6-9][0-9]{9}$").expect("mobile regex"));
static PERSON_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s]+$").expect("person name regex"));
static CONTACT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s.]+$").expect("contact name regex"));

pub const COMPANY_NAME_MIN: usize = 2;
pub const COMPANY_NAME_MAX: usize = 100;
pub const JOB_TITLE_MAX: usize = 200;
pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 20;
pub const PERSON_NAME_MIN: usize = 2;
pub const PERSON_NAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;

pub const PASSWORD_MISMATCH: &str = "Passwords don't match";

fn len(value: &str) -> usize {
    value.chars().count()
}

/// A required free-text field bounded by `min..=max` characters.
pub fn validate_required_text(value: &str, field: &str, min: usize, max: usize) -> String {
    if value.is_empty() {
        return format!("{field} is required");
    }
    let n = len(value);
    if n < min {
        return format!("{field} must be at least {min} characters");
    }
    if n > max {
        return format!("{field} is too long");
    }
    String::new()
}

pub fn validate_company_name(value: &str) -> String {
    validate_required_text(value, "Company name", COMPANY_NAME_MIN, COMPANY_NAME_MAX)
}

pub fn validate_job_title(value: &str) -> String {
    validate_required_text(value, "Job title", 1, JOB_TITLE_MAX)
}

/// Application dates are required and use the `YYYY-MM-DD` form.
pub fn validate_application_date(value: &str) -> String {
    if value.is_empty() {
        return "Application date is required".to_owned();
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(_) => String::new(),
        Err(_) => "Enter a valid date (YYYY-MM-DD)".to_owned(),
    }
}

/// Optional name made of letters and spaces; contact names may also use periods.
pub fn validate_name_like(value: &str, allow_periods: bool) -> String {
    if value.is_empty() {
        return String::new();
    }
    if allow_periods {
        if !CONTACT_NAME_RE.is_match(value) {
            return "Name can only contain letters, spaces, and periods".to_owned();
        }
    } else if !PERSON_NAME_RE.is_match(value) {
        return "Name should only contain letters and spaces".to_owned();
    }
    String::new()
}

pub fn validate_contact_name(value: &str) -> String {
    validate_name_like(value, true)
}

/// Optional first/last name on the registration form.
pub fn validate_person_name(value: &str, field: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    if !PERSON_NAME_RE.is_match(value) {
        return format!("{field} should only contain letters and spaces");
    }
    let n = len(value);
    if n < PERSON_NAME_MIN {
        return format!("{field} must be at least {PERSON_NAME_MIN} characters");
    }
    if n > PERSON_NAME_MAX {
        return format!("{field} must not exceed {PERSON_NAME_MAX} characters");
    }
    String::new()
}

pub fn validate_username(value: &str) -> String {
    if value.is_empty() {
        return "Username is required".to_owned();
    }
    if !USERNAME_RE.is_match(value) {
        return "Username can only contain letters, numbers, underscores, and hyphens".to_owned();
    }
    let n = len(value);
    if n < USERNAME_MIN {
        return format!("Username must be at least {USERNAME_MIN} characters");
    }
    if n > USERNAME_MAX {
        return format!("Username must not exceed {USERNAME_MAX} characters");
    }
    String::new()
}

/// Optional `local@domain.tld` address.
pub fn validate_email(value: &str) -> String {
    if value.is_empty() || EMAIL_RE.is_match(value) {
        String::new()
    } else {
        "Enter a valid email address".to_owned()
    }
}

/// The account email on the registration form is mandatory.
pub fn validate_account_email(value: &str) -> String {
    if value.is_empty() {
        return "Email is required".to_owned();
    }
    if !EMAIL_RE.is_match(value) {
        return "Please enter a valid email address".to_owned();
    }
    String::new()
}

pub fn validate_password(value: &str) -> String {
    if value.is_empty() {
        return "Password is required".to_owned();
    }
    if len(value) < PASSWORD_MIN {
        return format!("Password must be at least {PASSWORD_MIN} characters");
    }
    if !value.chars().any(|c| c.is_ascii_uppercase()) {
        return "Password must contain at least one uppercase letter".to_owned();
    }
    if !value.chars().any(|c| c.is_ascii_lowercase()) {
        return "Password must contain at least one lowercase letter".to_owned();
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return "Password must contain at least one number".to_owned();
    }
    String::new()
}

pub fn validate_password_confirmation(value: &str, password: &str) -> String {
    if value == password {
        String::new()
    } else {
        PASSWORD_MISMATCH.to_owned()
    }
}

/// Strip spaces, hyphens and plus signs, then an `91` country code when the
/// remainder is longer than a local number.
pub fn normalize_phone(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '+')
        .collect();
    match cleaned.strip_prefix("91") {
        Some(local) if cleaned.len() > 10 => local.to_owned(),
        _ => cleaned,
    }
}

fn is_mobile(value: &str) -> bool {
    value.is_empty() || MOBILE_RE.is_match(&normalize_phone(value))
}

/// Optional 10-digit mobile number starting with 6–9, for an application contact.
pub fn validate_phone(value: &str) -> String {
    if is_mobile(value) {
        String::new()
    } else {
        "Enter valid 10-digit Indian mobile number (e.g., 9876543210)".to_owned()
    }
}

/// Same rule as [`validate_phone`], worded for the account holder.
pub fn validate_mobile_number(value: &str) -> String {
    if is_mobile(value) {
        String::new()
    } else {
        "Enter a valid 10-digit Indian mobile number (e.g., 9876543210)".to_owned()
    }
}

/// Optional absolute URL (scheme and host).
pub fn validate_url(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    match Url::parse(value) {
        Ok(url) if url.has_host() => String::new(),
        _ => "Enter a valid URL (e.g., https://example.com)".to_owned(),
    }
}
