//! Patient self-registration.
//!
//! Registration is three writes in a fixed order:
//!
//! 1. issue the next queue number,
//! 2. insert the patient record,
//! 3. insert the patient's `waiting` queue entry.
//!
//! Validation happens before step 1, so an invalid form writes nothing. A sequence failure
//! aborts before any record is written. A failure at step 3 leaves the patient record in
//! place and is reported as [`ClinicError::PartialRegistration`]; nothing is rolled back.

use crate::config::CoreConfig;
use crate::patient::{Patient, PatientForm};
use crate::queue::QueueEntry;
use crate::store::{ClinicBackend, PatientStore, QueueStore, SequenceCounter, SequenceIssuer};
use crate::{ClinicError, ClinicResult};
use chrono::Utc;
use klinik_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What the registering patient is shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    pub patient_id: RecordId,
    pub queue_entry_id: RecordId,
    pub queue_number: u64,
    pub estimated_wait_time: u64,
}

#[derive(Clone)]
pub struct RegistrationService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn ClinicBackend>,
}

impl RegistrationService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn ClinicBackend>) -> Self {
        Self { cfg, store }
    }

    /// Registers a patient and places them at the back of the queue.
    ///
    /// # Errors
    ///
    /// - [`ClinicError::Validation`] naming the first empty field; nothing written.
    /// - [`ClinicError::SequenceUnavailable`] if no queue number could be issued; nothing written.
    /// - [`ClinicError::PartialRegistration`] if the patient was saved but the queue entry was not.
    /// - Any store error from the patient insert; nothing else written.
    pub fn register(&self, form: &PatientForm) -> ClinicResult<RegistrationReceipt> {
        let details = form.validate()?;

        let queue_number = self
            .store
            .issue_sequence_number(SequenceCounter::QueueNumber)?;

        let now = Utc::now();
        let patient = Patient::create(details, now);
        self.store.insert_patient(&patient)?;

        let entry = QueueEntry::create(patient.id, queue_number, self.cfg.minutes_per_slot(), now);
        if let Err(source) = self.store.insert_queue_entry(&entry) {
            tracing::error!(
                patient_id = %patient.id,
                queue_number,
                error = %source,
                "patient saved but queue entry was not"
            );
            return Err(ClinicError::PartialRegistration {
                patient_id: patient.id,
                source: Box::new(source),
            });
        }

        tracing::info!(patient_id = %patient.id, queue_number, "registered patient");
        Ok(RegistrationReceipt {
            patient_id: patient.id,
            queue_entry_id: entry.id,
            queue_number,
            estimated_wait_time: entry.estimated_wait_time,
        })
    }
}
