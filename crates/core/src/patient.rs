//! Patient registration records.
//!
//! A patient record is written once at registration and never updated by any flow. Queue
//! entries and prescriptions reference it by [`RecordId`].

use crate::ClinicResult;
use chrono::{DateTime, Utc};
use klinik_types::NonEmptyText;
use klinik_uuid::RecordId;
use serde::{Deserialize, Serialize};

/// Raw registration form input, exactly as submitted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PatientForm {
    pub full_name: String,
    pub date_of_birth: String,
    pub contact_number: String,
    pub reason_for_visit: String,
}

/// Registration fields that passed the non-emptiness check.
///
/// No format checking is applied to the date of birth or contact number, and no duplicate
/// detection is performed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientDetails {
    pub full_name: NonEmptyText,
    pub date_of_birth: NonEmptyText,
    pub contact_number: NonEmptyText,
    pub reason_for_visit: NonEmptyText,
}

impl PatientForm {
    /// Validates required fields in form order, reporting the first missing one.
    pub fn validate(&self) -> ClinicResult<PatientDetails> {
        Ok(PatientDetails {
            full_name: NonEmptyText::required("full_name", &self.full_name)?,
            date_of_birth: NonEmptyText::required("date_of_birth", &self.date_of_birth)?,
            contact_number: NonEmptyText::required("contact_number", &self.contact_number)?,
            reason_for_visit: NonEmptyText::required("reason_for_visit", &self.reason_for_visit)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: RecordId,
    pub full_name: String,
    pub date_of_birth: String,
    pub contact_number: String,
    pub reason_for_visit: String,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    /// Builds a new record with a freshly issued identifier.
    pub fn create(details: PatientDetails, created_at: DateTime<Utc>) -> Self {
        Self {
            id: klinik_uuid::issue_identifier(),
            full_name: details.full_name.into_inner(),
            date_of_birth: details.date_of_birth.into_inner(),
            contact_number: details.contact_number.into_inner(),
            reason_for_visit: details.reason_for_visit.into_inner(),
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClinicError;
    use klinik_types::TextError;

    fn form() -> PatientForm {
        PatientForm {
            full_name: " Alice Tan ".into(),
            date_of_birth: "1990-04-02".into(),
            contact_number: "0812345678".into(),
            reason_for_visit: "Fever".into(),
        }
    }

    #[test]
    fn test_validate_trims_fields() {
        let details = form().validate().unwrap();
        assert_eq!(details.full_name.as_str(), "Alice Tan");
    }

    #[test]
    fn test_validate_reports_first_missing_field() {
        let mut f = form();
        f.contact_number = "   ".into();
        f.reason_for_visit.clear();

        let err = f.validate().unwrap_err();
        assert!(matches!(
            err,
            ClinicError::Validation(TextError::MissingField("contact_number"))
        ));
        assert!(err.is_validation());
    }

    #[test]
    fn test_create_issues_identifier() {
        let now = Utc::now();
        let a = Patient::create(form().validate().unwrap(), now);
        let b = Patient::create(form().validate().unwrap(), now);
        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at, now);
    }
}
