//! Fetch-and-project for each screen.
//!
//! Each call re-reads the full relevant collections and re-joins them; nothing is cached.

use crate::config::CoreConfig;
use crate::patient::Patient;
use crate::prescription::PrescriptionStatus;
use crate::projection::{self, Dashboard, PrescriptionRow, QueueBoard};
use crate::store::{
    ChangeFeed, ClinicBackend, PatientStore, PrescriptionStore, QueueStore, StoreChange,
};
use crate::view_prefs::ViewPrefs;
use crate::ClinicResult;
use klinik_uuid::RecordId;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct ViewService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn ClinicBackend>,
}

impl ViewService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn ClinicBackend>) -> Self {
        Self { cfg, store }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn queue_board(&self) -> ClinicResult<QueueBoard> {
        let entries = self.store.list_active_queue()?;
        let patients = self.store.list_patients()?;
        Ok(projection::queue_board(
            &entries,
            &patients,
            self.cfg.minutes_per_slot(),
        ))
    }

    pub fn dashboard(&self, prefs: &ViewPrefs) -> ClinicResult<Dashboard> {
        let entries = self.store.list_queue_entries()?;
        let patients = self.store.list_patients()?;
        let prescriptions = self.store.list_prescriptions()?;
        Ok(projection::dashboard(&entries, &patients, &prescriptions, prefs))
    }

    pub fn pharmacy_worklist(&self) -> ClinicResult<Vec<PrescriptionRow>> {
        let pending = self
            .store
            .list_prescriptions_by_status(PrescriptionStatus::Pending)?;
        let patients = self.store.list_patients()?;
        Ok(projection::pharmacy_worklist(&pending, &patients))
    }

    /// Patients for the prescription authoring picker.
    pub fn patients(&self) -> ClinicResult<Vec<Patient>> {
        self.store.list_patients()
    }

    pub fn patient(&self, id: &RecordId) -> ClinicResult<Patient> {
        self.store.get_patient(id)
    }

    /// `None` when the backend cannot push changes.
    pub fn subscribe_changes(&self) -> Option<broadcast::Receiver<StoreChange>> {
        self.store.subscribe_changes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::PatientForm;
    use crate::queue::QueueStatus;
    use crate::services::testing::{both_backends, config};
    use crate::services::{QueueService, RegistrationService};

    fn form(name: &str) -> PatientForm {
        PatientForm {
            full_name: name.into(),
            date_of_birth: "1990-02-02".into(),
            contact_number: "0819999999".into(),
            reason_for_visit: "Fever".into(),
        }
    }

    #[test]
    fn test_alice_tan_end_to_end_board() {
        for store in both_backends() {
            let registration = RegistrationService::new(config(), store.clone());
            let queue = QueueService::new(config(), store.clone());
            let views = ViewService::new(config(), store.clone());

            registration.register(&form("Bob Lim")).unwrap();
            let before = registration.register(&form("Carol Ng")).unwrap().queue_number;

            let alice = registration.register(&form("Alice Tan")).unwrap();
            assert_eq!(alice.queue_number, before + 1);

            queue.approve(&alice.queue_entry_id).unwrap();

            let board = views.queue_board().unwrap();
            let examined: Vec<_> = board
                .rows
                .iter()
                .filter(|r| r.status_label == "Being Examined")
                .collect();
            assert_eq!(examined.len(), 1);
            assert_eq!(examined[0].patient_initials, "A.T.");
            assert_eq!(examined[0].estimated_wait, None);

            let waiting: Vec<_> = board
                .rows
                .iter()
                .filter(|r| r.status == QueueStatus::Waiting)
                .collect();
            assert_eq!(waiting.len(), 2);
            for row in waiting {
                assert_eq!(row.estimated_wait, Some(row.queue_number * 15));
            }
        }
    }

    #[test]
    fn test_dashboard_clear_is_view_only() {
        for store in both_backends() {
            let registration = RegistrationService::new(config(), store.clone());
            let views = ViewService::new(config(), store.clone());
            registration.register(&form("Alice Tan")).unwrap();

            let mut prefs = ViewPrefs::default();
            prefs.clear(chrono::Utc::now());
            assert!(views.dashboard(&prefs).unwrap().queue.is_empty());

            prefs.restore();
            assert_eq!(views.dashboard(&prefs).unwrap().queue.len(), 1);
            assert_eq!(store.list_queue_entries().unwrap().len(), 1);
        }
    }
}
