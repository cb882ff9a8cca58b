//! Prescription authoring and pharmacy dispensing.

use crate::prescription::{Prescription, PrescriptionForm, PrescriptionStatus};
use crate::store::{ClinicBackend, PatientStore, PrescriptionStore};
use crate::ClinicResult;
use chrono::Utc;
use klinik_uuid::RecordId;
use std::sync::Arc;

#[derive(Clone)]
pub struct PrescriptionService {
    store: Arc<dyn ClinicBackend>,
}

impl PrescriptionService {
    pub fn new(store: Arc<dyn ClinicBackend>) -> Self {
        Self { store }
    }

    /// Validates and stores a new `pending` prescription.
    ///
    /// # Errors
    ///
    /// - [`crate::ClinicError::Validation`] if the diagnosis is empty.
    /// - [`crate::ClinicError::Uuid`] if the patient id is not a canonical identifier.
    /// - [`crate::ClinicError::NotFound`] if no such patient exists.
    pub fn create(&self, form: PrescriptionForm) -> ClinicResult<Prescription> {
        let prescription = Prescription::from_form(form, Utc::now())?;
        self.store.get_patient(&prescription.patient_id)?;
        self.store.insert_prescription(&prescription)?;

        tracing::info!(
            prescription_id = %prescription.id,
            patient_id = %prescription.patient_id,
            lines = prescription.medicines.len(),
            "prescription created"
        );
        Ok(prescription)
    }

    /// Marks a prescription as handed over. Dispensing twice is not an error.
    pub fn dispense(&self, id: &RecordId) -> ClinicResult<()> {
        self.store
            .set_prescription_status(id, PrescriptionStatus::Dispensed, Utc::now())?;
        tracing::info!(prescription_id = %id, "prescription dispensed");
        Ok(())
    }

    /// The pharmacy worklist source: pending prescriptions, newest first.
    pub fn pending(&self) -> ClinicResult<Vec<Prescription>> {
        self.store
            .list_prescriptions_by_status(PrescriptionStatus::Pending)
    }

    pub fn dispensed(&self) -> ClinicResult<Vec<Prescription>> {
        self.store
            .list_prescriptions_by_status(PrescriptionStatus::Dispensed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::{Patient, PatientForm};
    use crate::prescription::PrescribedMedicine;
    use crate::services::testing::both_backends;
    use crate::ClinicError;

    fn seed_patient(store: &Arc<dyn ClinicBackend>) -> Patient {
        let form = PatientForm {
            full_name: "Citra Dewi".into(),
            date_of_birth: "1978-05-21".into(),
            contact_number: "0855555555".into(),
            reason_for_visit: "Sore throat".into(),
        };
        let patient = Patient::create(form.validate().unwrap(), Utc::now());
        store.insert_patient(&patient).unwrap();
        patient
    }

    fn form(patient_id: RecordId, medicines: Vec<PrescribedMedicine>) -> PrescriptionForm {
        PrescriptionForm {
            patient_id: patient_id.to_string(),
            diagnosis: "Pharyngitis".into(),
            doctor_notes: None,
            medicines,
        }
    }

    #[test]
    fn test_empty_prescription_moves_from_pending_to_dispensed() {
        for store in both_backends() {
            let service = PrescriptionService::new(store.clone());
            let patient = seed_patient(&store);

            let created = service.create(form(patient.id, Vec::new())).unwrap();
            assert_eq!(created.status, PrescriptionStatus::Pending);
            assert!(created.medicines.is_empty());
            assert_eq!(service.pending().unwrap(), vec![created.clone()]);

            service.dispense(&created.id).unwrap();
            assert!(service.pending().unwrap().is_empty());

            let dispensed = service.dispensed().unwrap();
            assert_eq!(dispensed.len(), 1);
            assert_eq!(dispensed[0].id, created.id);
            assert!(dispensed[0].updated_at >= created.updated_at);

            // Second dispense is indistinguishable from the first.
            service.dispense(&created.id).unwrap();
        }
    }

    #[test]
    fn test_blank_lines_are_not_persisted() {
        for store in both_backends() {
            let service = PrescriptionService::new(store.clone());
            let patient = seed_patient(&store);
            let lines = vec![
                PrescribedMedicine {
                    medicine_name: "Amoxicillin 250mg".into(),
                    dosage: "1 capsule".into(),
                    frequency: "3x daily".into(),
                    duration: "7 days".into(),
                },
                PrescribedMedicine::default(),
            ];

            let created = service.create(form(patient.id, lines)).unwrap();
            let stored = store.get_prescription(&created.id).unwrap();
            assert_eq!(stored.medicines.len(), 1);
            assert_eq!(stored.medicines[0].medicine_name, "Amoxicillin 250mg");
        }
    }

    #[test]
    fn test_unknown_patient_is_rejected_before_writing() {
        for store in both_backends() {
            let service = PrescriptionService::new(store.clone());
            let err = service.create(form(RecordId::new(), Vec::new())).unwrap_err();
            assert!(matches!(err, ClinicError::NotFound { kind: "patient", .. }));
            assert!(store.list_prescriptions().unwrap().is_empty());
        }
    }

    #[test]
    fn test_pending_is_newest_first() {
        for store in both_backends() {
            let service = PrescriptionService::new(store.clone());
            let patient = seed_patient(&store);
            let first = service.create(form(patient.id, Vec::new())).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
            let second = service.create(form(patient.id, Vec::new())).unwrap();

            let ids: Vec<RecordId> = service.pending().unwrap().into_iter().map(|p| p.id).collect();
            assert_eq!(ids, vec![second.id, first.id]);
        }
    }

    #[test]
    fn test_dispense_unknown_is_not_found() {
        for store in both_backends() {
            let service = PrescriptionService::new(store);
            assert!(matches!(
                service.dispense(&RecordId::new()),
                Err(ClinicError::NotFound { .. })
            ));
        }
    }
}
