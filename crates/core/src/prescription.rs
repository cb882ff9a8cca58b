//! Doctor-authored prescriptions and their pharmacy lifecycle.

use crate::{ClinicError, ClinicResult};
use chrono::{DateTime, Utc};
use klinik_types::NonEmptyText;
use klinik_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `pending` until the pharmacy hands the medicines over. There is no way back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionStatus {
    Pending,
    Dispensed,
}

impl PrescriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Dispensed => "dispensed",
        }
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrescriptionStatus {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "dispensed" => Ok(Self::Dispensed),
            other => Err(ClinicError::InvalidInput(format!(
                "unknown prescription status '{other}'"
            ))),
        }
    }
}

/// One line of a prescription.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescribedMedicine {
    pub medicine_name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub duration: String,
}

impl PrescribedMedicine {
    fn is_blank(&self) -> bool {
        self.medicine_name.trim().is_empty()
    }
}

/// Prescription authoring input.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PrescriptionForm {
    pub patient_id: String,
    pub diagnosis: String,
    #[serde(default)]
    pub doctor_notes: Option<String>,
    #[serde(default)]
    pub medicines: Vec<PrescribedMedicine>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub diagnosis: String,
    pub doctor_notes: Option<String>,
    pub medicines: Vec<PrescribedMedicine>,
    pub status: PrescriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prescription {
    /// Validates the form and builds a `pending` prescription.
    ///
    /// Lines without a medicine name are dropped; an empty medicine list is allowed.
    /// Whether the referenced patient exists is checked by the caller against the store.
    pub fn from_form(form: PrescriptionForm, now: DateTime<Utc>) -> ClinicResult<Self> {
        let patient_id = RecordId::parse(form.patient_id.trim())?;
        let diagnosis = NonEmptyText::required("diagnosis", &form.diagnosis)?;

        let medicines = form
            .medicines
            .into_iter()
            .filter(|line| !line.is_blank())
            .map(|line| PrescribedMedicine {
                medicine_name: line.medicine_name.trim().to_string(),
                dosage: line.dosage.trim().to_string(),
                frequency: line.frequency.trim().to_string(),
                duration: line.duration.trim().to_string(),
            })
            .collect();

        Ok(Self {
            id: klinik_uuid::issue_identifier(),
            patient_id,
            diagnosis: diagnosis.into_inner(),
            doctor_notes: NonEmptyText::optional(form.doctor_notes).map(NonEmptyText::into_inner),
            medicines,
            status: PrescriptionStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }
}
