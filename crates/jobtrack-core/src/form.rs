//! Form drafts: raw user input, validated field by field as it changes and
//! exhaustively before submission.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::records::{ApplicationPayload, ApplicationRecord, Status};
use crate::validate;

/// Field name → message. Only fields with a non-empty message are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `field`; an empty message clears the field.
    pub fn set(&mut self, field: &str, message: String) {
        if message.is_empty() {
            self.0.remove(field);
        } else {
            self.0.insert(field.to_owned(), message);
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Fold a field-keyed server rejection into these errors. Server messages
    /// may be a string or a list of strings; lists are joined.
    pub fn merge_server(&mut self, payload: &Value) {
        let Some(fields) = payload.as_object() else {
            return;
        };
        for (field, messages) in fields {
            let message = match messages {
                Value::String(s) => s.clone(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" "),
                other => other.to_string(),
            };
            self.set(field, message);
        }
    }
}

// ── Application form ─────────────────────────────────────────────────────────

pub const COMPANY_NAME: &str = "company_name";
pub const JOB_TITLE: &str = "job_title";
pub const JOB_URL: &str = "job_url";
pub const APPLICATION_DATE: &str = "application_date";
pub const CONTACT_PERSON: &str = "contact_person";
pub const CONTACT_EMAIL: &str = "contact_email";
pub const CONTACT_PHONE: &str = "contact_phone";

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationDraft {
    pub company_name: String,
    pub job_title: String,
    pub job_url: String,
    pub status: Status,
    pub application_date: String,
    pub salary_range: String,
    pub location: String,
    pub contact_person: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub notes: String,
}

impl ApplicationDraft {
    /// An empty form dated `today`, status `applied`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            company_name: String::new(),
            job_title: String::new(),
            job_url: String::new(),
            status: Status::Applied,
            application_date: today.format("%Y-%m-%d").to_string(),
            salary_range: String::new(),
            location: String::new(),
            contact_person: String::new(),
            contact_email: String::new(),
            contact_phone: String::new(),
            notes: String::new(),
        }
    }

    /// A form pre-filled from an existing record, for editing.
    pub fn from_record(record: &ApplicationRecord) -> Self {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            company_name: record.company_name.clone(),
            job_title: record.job_title.clone(),
            job_url: opt(&record.job_url),
            status: record.status,
            application_date: record.application_date.format("%Y-%m-%d").to_string(),
            salary_range: opt(&record.salary_range),
            location: opt(&record.location),
            contact_person: opt(&record.contact_person),
            contact_email: opt(&record.contact_email),
            contact_phone: opt(&record.contact_phone),
            notes: opt(&record.notes),
        }
    }

    /// Incremental check for one field. Fields without a rule yield "".
    pub fn validate_field(field: &str, value: &str) -> String {
        match field {
            COMPANY_NAME => validate::validate_company_name(value),
            JOB_TITLE => validate::validate_job_title(value),
            JOB_URL => validate::validate_url(value),
            APPLICATION_DATE => validate::validate_application_date(value),
            CONTACT_PERSON => validate::validate_contact_name(value),
            CONTACT_EMAIL => validate::validate_email(value),
            CONTACT_PHONE => validate::validate_phone(value),
            _ => String::new(),
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for (field, value) in [
            (COMPANY_NAME, &self.company_name),
            (JOB_TITLE, &self.job_title),
            (JOB_URL, &self.job_url),
            (APPLICATION_DATE, &self.application_date),
            (CONTACT_PERSON, &self.contact_person),
            (CONTACT_EMAIL, &self.contact_email),
            (CONTACT_PHONE, &self.contact_phone),
        ] {
            errors.set(field, Self::validate_field(field, value));
        }
        errors
    }

    /// Validate everything and, if clean, produce the request body. Empty
    /// optional fields become explicit nulls.
    pub fn into_payload(self) -> Result<ApplicationPayload, FieldErrors> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }
        let application_date =
            NaiveDate::parse_from_str(&self.application_date, "%Y-%m-%d").map_err(|_| {
                let mut e = FieldErrors::new();
                e.set(
                    APPLICATION_DATE,
                    validate::validate_application_date(&self.application_date),
                );
                e
            })?;
        let opt = |v: String| if v.is_empty() { None } else { Some(v) };
        Ok(ApplicationPayload {
            company_name: self.company_name,
            job_title: self.job_title,
            job_url: opt(self.job_url),
            status: self.status,
            application_date,
            salary_range: opt(self.salary_range),
            location: opt(self.location),
            contact_person: opt(self.contact_person),
            contact_email: opt(self.contact_email),
            contact_phone: opt(self.contact_phone),
            notes: opt(self.notes),
        })
    }
}

// ── Registration form ────────────────────────────────────────────────────────

pub const USERNAME: &str = "username";
pub const EMAIL: &str = "email";
pub const PASSWORD: &str = "password";
pub const PASSWORD2: &str = "password2";
pub const FIRST_NAME: &str = "first_name";
pub const LAST_NAME: &str = "last_name";
pub const MOBILE_NUMBER: &str = "mobile_number";

/// Registration body, sent as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationDraft {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
    pub first_name: String,
    pub last_name: String,
    pub mobile_number: String,
}

impl RegistrationDraft {
    /// Incremental check for `field`. The confirmation is compared against
    /// this draft's current password.
    pub fn validate_field(&self, field: &str, value: &str) -> String {
        match field {
            USERNAME => validate::validate_username(value),
            EMAIL => validate::validate_account_email(value),
            PASSWORD => validate::validate_password(value),
            PASSWORD2 => validate::validate_password_confirmation(value, &self.password),
            FIRST_NAME => validate::validate_person_name(value, "First name"),
            LAST_NAME => validate::validate_person_name(value, "Last name"),
            MOBILE_NUMBER => validate::validate_mobile_number(value),
            _ => String::new(),
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for (field, value) in [
            (FIRST_NAME, &self.first_name),
            (LAST_NAME, &self.last_name),
            (USERNAME, &self.username),
            (EMAIL, &self.email),
            (PASSWORD, &self.password),
            (PASSWORD2, &self.password2),
            (MOBILE_NUMBER, &self.mobile_number),
        ] {
            errors.set(field, self.validate_field(field, value));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn filled() -> ApplicationDraft {
        let mut d = ApplicationDraft::new(today());
        d.company_name = "Acme Corp".into();
        d.job_title = "Backend Engineer".into();
        d
    }

    #[test]
    fn new_draft_defaults() {
        let d = ApplicationDraft::new(today());
        assert_eq!(d.status, Status::Applied);
        assert_eq!(d.application_date, "2024-05-01");
    }

    #[test]
    fn empty_draft_blocks_submission() {
        let errors = ApplicationDraft::new(today()).validate();
        assert_eq!(errors.get(COMPANY_NAME), Some("Company name is required"));
        assert_eq!(errors.get(JOB_TITLE), Some("Job title is required"));
        assert_eq!(errors.get(CONTACT_PHONE), None);
    }

    #[test]
    fn present_optional_fields_are_checked() {
        let mut d = filled();
        d.contact_phone = "12345".into();
        d.contact_email = "nobody".into();
        let errors = d.clone().into_payload().unwrap_err();
        assert!(errors.get(CONTACT_PHONE).is_some());
        assert!(errors.get(CONTACT_EMAIL).is_some());
        assert_eq!(errors.iter().count(), 2);
    }

    #[test]
    fn payload_turns_blanks_into_nulls() {
        let mut d = filled();
        d.location = "Bangalore".into();
        let payload = d.into_payload().unwrap();
        assert_eq!(payload.location.as_deref(), Some("Bangalore"));
        assert_eq!(payload.notes, None);
        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(body["contact_email"], Value::Null);
    }

    #[test]
    fn incremental_matches_exhaustive() {
        let d = filled();
        let errors = d.validate();
        assert_eq!(
            errors.get(COMPANY_NAME).unwrap_or(""),
            ApplicationDraft::validate_field(COMPANY_NAME, &d.company_name)
        );
        assert_eq!(ApplicationDraft::validate_field("notes", "anything"), "");
    }

    #[test]
    fn draft_from_record_round_trips() {
        let rec: ApplicationRecord = serde_json::from_value(json!({
            "id": 3,
            "company_name": "Acme",
            "job_title": "Engineer",
            "status": "hr_round",
            "application_date": "2024-02-10",
            "contact_phone": "9876543210"
        }))
        .unwrap();
        let d = ApplicationDraft::from_record(&rec);
        assert_eq!(d.status, Status::HrRound);
        assert_eq!(d.contact_phone, "9876543210");
        assert_eq!(d.job_url, "");
        let payload = d.into_payload().unwrap();
        assert_eq!(payload.application_date, rec.application_date);
    }

    #[test]
    fn registration_requires_core_fields() {
        let errors = RegistrationDraft::default().validate();
        assert_eq!(errors.get(USERNAME), Some("Username is required"));
        assert_eq!(errors.get(EMAIL), Some("Email is required"));
        assert_eq!(errors.get(PASSWORD), Some("Password is required"));
        assert_eq!(errors.get(FIRST_NAME), None);
        assert_eq!(errors.get(PASSWORD2), None);
    }

    #[test]
    fn registration_confirmation_tracks_password() {
        let draft = RegistrationDraft {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "Secret123".into(),
            password2: "Secret124".into(),
            ..Default::default()
        };
        assert_eq!(
            draft.validate().get(PASSWORD2),
            Some(validate::PASSWORD_MISMATCH)
        );
        assert_eq!(draft.validate_field(PASSWORD2, "Secret123"), "");
    }

    #[test]
    fn server_errors_merge_with_local_ones() {
        let mut errors = FieldErrors::new();
        errors.set(PASSWORD, "Password is required".into());
        errors.merge_server(&json!({
            "username": ["A user with that username already exists."],
            "email": "Enter a valid email address."
        }));
        assert_eq!(
            errors.get(USERNAME),
            Some("A user with that username already exists.")
        );
        assert_eq!(errors.get(EMAIL), Some("Enter a valid email address."));
        assert_eq!(errors.get(PASSWORD), Some("Password is required"));

        errors.merge_server(&json!("not an object"));
        assert_eq!(errors.iter().count(), 3);
    }
}
