//! Application services.
//!
//! Each service holds an `Arc<dyn ClinicBackend>` (plus the `Arc<CoreConfig>` where it needs
//! timing or credentials) and performs one family of user actions. Services are synchronous;
//! async callers invoke them directly.
//!
//! [`ClinicServices`] bundles them for binaries that need the whole surface.

pub mod auth;
pub mod catalog;
pub mod orders;
pub mod prescriptions;
pub mod queue;
pub mod registration;
pub mod views;

pub use auth::AuthService;
pub use catalog::CatalogService;
pub use orders::MedicineOrderService;
pub use prescriptions::PrescriptionService;
pub use queue::QueueService;
pub use registration::{RegistrationReceipt, RegistrationService};
pub use views::ViewService;

use crate::backends::open_backend;
use crate::config::CoreConfig;
use crate::store::ClinicBackend;
use crate::ClinicResult;
use std::sync::Arc;

#[derive(Clone)]
pub struct ClinicServices {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn ClinicBackend>,
    pub registration: RegistrationService,
    pub queue: QueueService,
    pub prescriptions: PrescriptionService,
    pub catalog: CatalogService,
    pub orders: MedicineOrderService,
    pub auth: AuthService,
    pub views: ViewService,
}

impl ClinicServices {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn ClinicBackend>) -> Self {
        Self {
            registration: RegistrationService::new(cfg.clone(), store.clone()),
            queue: QueueService::new(cfg.clone(), store.clone()),
            prescriptions: PrescriptionService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            orders: MedicineOrderService::new(store.clone()),
            auth: AuthService::new(cfg.clone(), store.clone()),
            views: ViewService::new(cfg.clone(), store.clone()),
            cfg,
            store,
        }
    }

    /// Opens the configured backend and builds every service over it.
    pub fn open(cfg: Arc<CoreConfig>) -> ClinicResult<Self> {
        let store = open_backend(&cfg)?;
        Ok(Self::new(cfg, store))
    }

    pub fn config(&self) -> &Arc<CoreConfig> {
        &self.cfg
    }

    pub fn store(&self) -> &Arc<dyn ClinicBackend> {
        &self.store
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Backends for service tests.

    use crate::backends::{RelationalBackend, TreeBackend};
    use crate::config::CoreConfig;
    use crate::login::LoginAttempt;
    use crate::medicine::{Medicine, MedicineOrder, OrderStatus};
    use crate::patient::Patient;
    use crate::prescription::{Prescription, PrescriptionStatus};
    use crate::queue::{QueueEntry, QueueStatus};
    use crate::store::*;
    use crate::{ClinicError, ClinicResult};
    use chrono::{DateTime, Utc};
    use klinik_uuid::RecordId;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::broadcast;

    pub fn config() -> Arc<CoreConfig> {
        Arc::new(CoreConfig::default())
    }

    /// One of each backend, for tests that must hold on both.
    pub fn both_backends() -> Vec<Arc<dyn ClinicBackend>> {
        vec![
            Arc::new(RelationalBackend::open_in_memory().unwrap()),
            Arc::new(TreeBackend::in_memory()),
        ]
    }

    fn injected(what: &str) -> ClinicError {
        ClinicError::InvalidInput(format!("injected {what} failure"))
    }

    /// Wraps a tree backend and fails selected writes on demand.
    pub struct FaultyBackend {
        inner: TreeBackend,
        pub fail_sequence: AtomicBool,
        pub fail_queue_inserts: AtomicBool,
        pub fail_login_appends: AtomicBool,
        /// Renumbering writes allowed before `set_queue_number` starts failing.
        pub renumber_budget: AtomicUsize,
    }

    impl FaultyBackend {
        pub fn new() -> Self {
            Self {
                inner: TreeBackend::in_memory(),
                fail_sequence: AtomicBool::new(false),
                fail_queue_inserts: AtomicBool::new(false),
                fail_login_appends: AtomicBool::new(false),
                renumber_budget: AtomicUsize::new(usize::MAX),
            }
        }
    }

    impl SequenceIssuer for FaultyBackend {
        fn issue_sequence_number(&self, counter: SequenceCounter) -> ClinicResult<u64> {
            if self.fail_sequence.load(Ordering::SeqCst) {
                return Err(ClinicError::SequenceUnavailable {
                    counter: counter.name(),
                    reason: "injected".into(),
                });
            }
            self.inner.issue_sequence_number(counter)
        }
    }

    impl PatientStore for FaultyBackend {
        fn insert_patient(&self, patient: &Patient) -> ClinicResult<()> {
            self.inner.insert_patient(patient)
        }
        fn get_patient(&self, id: &RecordId) -> ClinicResult<Patient> {
            self.inner.get_patient(id)
        }
        fn list_patients(&self) -> ClinicResult<Vec<Patient>> {
            self.inner.list_patients()
        }
    }

    impl QueueStore for FaultyBackend {
        fn insert_queue_entry(&self, entry: &QueueEntry) -> ClinicResult<()> {
            if self.fail_queue_inserts.load(Ordering::SeqCst) {
                return Err(injected("queue insert"));
            }
            self.inner.insert_queue_entry(entry)
        }
        fn get_queue_entry(&self, id: &RecordId) -> ClinicResult<QueueEntry> {
            self.inner.get_queue_entry(id)
        }
        fn list_queue_entries(&self) -> ClinicResult<Vec<QueueEntry>> {
            self.inner.list_queue_entries()
        }
        fn set_queue_status(
            &self,
            id: &RecordId,
            status: QueueStatus,
            at: DateTime<Utc>,
        ) -> ClinicResult<()> {
            self.inner.set_queue_status(id, status, at)
        }
        fn set_queue_number(
            &self,
            id: &RecordId,
            queue_number: u64,
            estimated_wait_time: u64,
        ) -> ClinicResult<()> {
            let allowed = self
                .renumber_budget
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if !allowed {
                return Err(injected("renumber"));
            }
            self.inner
                .set_queue_number(id, queue_number, estimated_wait_time)
        }
        fn remove_queue_entry(&self, id: &RecordId) -> ClinicResult<bool> {
            self.inner.remove_queue_entry(id)
        }
    }

    impl PrescriptionStore for FaultyBackend {
        fn insert_prescription(&self, prescription: &Prescription) -> ClinicResult<()> {
            self.inner.insert_prescription(prescription)
        }
        fn get_prescription(&self, id: &RecordId) -> ClinicResult<Prescription> {
            self.inner.get_prescription(id)
        }
        fn list_prescriptions(&self) -> ClinicResult<Vec<Prescription>> {
            self.inner.list_prescriptions()
        }
        fn set_prescription_status(
            &self,
            id: &RecordId,
            status: PrescriptionStatus,
            at: DateTime<Utc>,
        ) -> ClinicResult<()> {
            self.inner.set_prescription_status(id, status, at)
        }
    }

    impl MedicineCatalog for FaultyBackend {
        fn upsert_medicine(&self, medicine: &Medicine) -> ClinicResult<()> {
            self.inner.upsert_medicine(medicine)
        }
        fn get_medicine(&self, id: &RecordId) -> ClinicResult<Medicine> {
            self.inner.get_medicine(id)
        }
        fn list_medicines(&self) -> ClinicResult<Vec<Medicine>> {
            self.inner.list_medicines()
        }
    }

    impl MedicineOrderStore for FaultyBackend {
        fn insert_order(&self, order: &MedicineOrder) -> ClinicResult<()> {
            self.inner.insert_order(order)
        }
        fn get_order(&self, id: &RecordId) -> ClinicResult<MedicineOrder> {
            self.inner.get_order(id)
        }
        fn list_orders(&self) -> ClinicResult<Vec<MedicineOrder>> {
            self.inner.list_orders()
        }
        fn set_order_status(
            &self,
            id: &RecordId,
            status: OrderStatus,
            at: DateTime<Utc>,
        ) -> ClinicResult<()> {
            self.inner.set_order_status(id, status, at)
        }
    }

    impl LoginAuditLog for FaultyBackend {
        fn append_login_attempt(&self, attempt: &LoginAttempt) -> ClinicResult<()> {
            if self.fail_login_appends.load(Ordering::SeqCst) {
                return Err(injected("audit"));
            }
            self.inner.append_login_attempt(attempt)
        }
        fn list_login_attempts(&self) -> ClinicResult<Vec<LoginAttempt>> {
            self.inner.list_login_attempts()
        }
    }

    impl ChangeFeed for FaultyBackend {
        fn subscribe_changes(&self) -> Option<broadcast::Receiver<StoreChange>> {
            None
        }
    }

    impl ClinicBackend for FaultyBackend {
        fn backend_name(&self) -> &'static str {
            "faulty"
        }
    }
}
