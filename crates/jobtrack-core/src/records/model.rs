use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Where an application currently stands. A flat label set: any status may
/// follow any other.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Applied,
    InterviewScheduled,
    TechnicalRound,
    HrRound,
    OfferReceived,
    Rejected,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Applied,
        Status::InterviewScheduled,
        Status::TechnicalRound,
        Status::HrRound,
        Status::OfferReceived,
        Status::Rejected,
    ];

    /// Wire value, as used in payloads and the `status` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Applied => "applied",
            Status::InterviewScheduled => "interview_scheduled",
            Status::TechnicalRound => "technical_round",
            Status::HrRound => "hr_round",
            Status::OfferReceived => "offer_received",
            Status::Rejected => "rejected",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Applied => "Applied",
            Status::InterviewScheduled => "Interview Scheduled",
            Status::TechnicalRound => "Technical Round",
            Status::HrRound => "HR Round",
            Status::OfferReceived => "Offer Received",
            Status::Rejected => "Rejected",
        }
    }

    pub fn is_interview(self) -> bool {
        matches!(
            self,
            Status::InterviewScheduled | Status::TechnicalRound | Status::HrRound
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status `{}`", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_owned()))
    }
}

/// A job application as the remote service owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    /// Opaque to the client; the service uses integers today.
    pub id: serde_json::Value,
    pub company_name: String,
    pub job_title: String,
    #[serde(default)]
    pub job_url: Option<String>,
    #[serde(default)]
    pub status: Status,
    pub application_date: NaiveDate,
    #[serde(default)]
    pub salary_range: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ApplicationRecord {
    /// The id as it appears in `applications/{id}/`.
    pub fn id_segment(&self) -> String {
        match &self.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Body of a create or update. Every optional field is serialized, with
/// `null` meaning "clear this field".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationPayload {
    pub company_name: String,
    pub job_title: String,
    pub job_url: Option<String>,
    pub status: Status,
    pub application_date: NaiveDate,
    pub salary_range: Option<String>,
    pub location: Option<String>,
    pub contact_person: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
}

/// Constraints for the next list fetch, applied by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub status: Option<Status>,
    pub search_term: Option<String>,
}

impl FilterCriteria {
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    /// Query pairs in `status`, `search` order. Absent or empty criteria are omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_owned()));
        }
        if let Some(term) = self.search_term.as_deref().filter(|t| !t.is_empty()) {
            pairs.push(("search", term.to_owned()));
        }
        pairs
    }
}

/// Counts over the full, unfiltered record set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub applied: u64,
    #[serde(default)]
    pub interview_scheduled: u64,
    #[serde(default)]
    pub technical_round: u64,
    #[serde(default)]
    pub hr_round: u64,
    #[serde(default)]
    pub offer_received: u64,
    #[serde(default)]
    pub rejected: u64,
}

impl StatisticsSnapshot {
    pub fn count(&self, status: Status) -> u64 {
        match status {
            Status::Applied => self.applied,
            Status::InterviewScheduled => self.interview_scheduled,
            Status::TechnicalRound => self.technical_round,
            Status::HrRound => self.hr_round,
            Status::OfferReceived => self.offer_received,
            Status::Rejected => self.rejected,
        }
    }

    pub fn by_status(&self) -> BTreeMap<Status, u64> {
        Status::ALL.into_iter().map(|s| (s, self.count(s))).collect()
    }

    /// Applications in any interview stage.
    pub fn interviews(&self) -> u64 {
        Status::ALL
            .into_iter()
            .filter(|s| s.is_interview())
            .map(|s| self.count(s))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_round_trips_through_str() {
        for status in Status::ALL {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
        assert!("ghosted".parse::<Status>().is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(Status::InterviewScheduled).unwrap(),
            json!("interview_scheduled")
        );
        assert_eq!(Status::HrRound.label(), "HR Round");
    }

    #[test]
    fn record_tolerates_missing_optionals() {
        let rec: ApplicationRecord = serde_json::from_value(json!({
            "id": 7,
            "company_name": "Acme",
            "job_title": "Engineer",
            "status": "rejected",
            "application_date": "2024-03-01",
            "location": null
        }))
        .unwrap();
        assert_eq!(rec.status, Status::Rejected);
        assert_eq!(rec.location, None);
        assert_eq!(rec.id_segment(), "7");
    }

    #[test]
    fn payload_serializes_absent_fields_as_null() {
        let payload = ApplicationPayload {
            company_name: "Acme".into(),
            job_title: "Engineer".into(),
            job_url: None,
            status: Status::Applied,
            application_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            salary_range: None,
            location: Some("Remote".into()),
            contact_person: None,
            contact_email: None,
            contact_phone: None,
            notes: None,
        };
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["job_url"], serde_json::Value::Null);
        assert!(v.as_object().unwrap().contains_key("notes"));
        assert_eq!(v["application_date"], json!("2024-03-01"));
    }

    #[test]
    fn filter_omits_absent_criteria() {
        assert!(FilterCriteria::default().query_pairs().is_empty());
        let f = FilterCriteria::default()
            .with_status(Status::Rejected)
            .with_search("acme");
        assert_eq!(
            f.query_pairs(),
            vec![("status", "rejected".to_owned()), ("search", "acme".to_owned())]
        );
        let f = FilterCriteria::default().with_search("");
        assert!(f.query_pairs().is_empty());
    }

    #[test]
    fn statistics_missing_counts_are_zero() {
        let s: StatisticsSnapshot =
            serde_json::from_value(json!({"total": 4, "applied": 1, "hr_round": 2, "technical_round": 1}))
                .unwrap();
        assert_eq!(s.count(Status::Rejected), 0);
        assert_eq!(s.interviews(), 3);
        assert_eq!(s.by_status().len(), 6);
        assert_eq!(s.by_status()[&Status::HrRound], 2);
    }
}
