//! Storage contracts.
//!
//! One trait per entity store. Services depend only on these traits (through
//! [`ClinicBackend`]); each backend module provides a single type implementing all of them.
//!
//! Method names are distinct across traits so calls through `dyn ClinicBackend` are never
//! ambiguous.

use crate::constants::{ORDER_NUMBER_COUNTER, QUEUE_NUMBER_COUNTER};
use crate::login::LoginAttempt;
use crate::medicine::{Medicine, MedicineOrder, OrderStatus};
use crate::patient::Patient;
use crate::prescription::{Prescription, PrescriptionStatus};
use crate::queue::{estimated_wait, QueueEntry, QueueStatus};
use crate::{ClinicError, ClinicResult};
use chrono::{DateTime, Utc};
use klinik_uuid::RecordId;
use tokio::sync::broadcast;

/// Named monotonically increasing counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SequenceCounter {
    QueueNumber,
    OrderNumber,
}

impl SequenceCounter {
    pub fn name(&self) -> &'static str {
        match self {
            Self::QueueNumber => QUEUE_NUMBER_COUNTER,
            Self::OrderNumber => ORDER_NUMBER_COUNTER,
        }
    }
}

/// Atomic counter increment, delegated to the backing store.
///
/// Two concurrent callers never receive the same value for the same counter, including
/// callers in different processes sharing the same store. The first value issued is 1.
pub trait SequenceIssuer {
    /// # Errors
    ///
    /// Returns [`ClinicError::SequenceUnavailable`] if the increment did not commit.
    fn issue_sequence_number(&self, counter: SequenceCounter) -> ClinicResult<u64>;
}

pub trait PatientStore {
    fn insert_patient(&self, patient: &Patient) -> ClinicResult<()>;
    /// Returns [`ClinicError::NotFound`] for an unknown id.
    fn get_patient(&self, id: &RecordId) -> ClinicResult<Patient>;
    fn list_patients(&self) -> ClinicResult<Vec<Patient>>;
}

pub trait QueueStore {
    fn insert_queue_entry(&self, entry: &QueueEntry) -> ClinicResult<()>;
    fn get_queue_entry(&self, id: &RecordId) -> ClinicResult<QueueEntry>;

    /// Every entry regardless of status, in no particular order.
    fn list_queue_entries(&self) -> ClinicResult<Vec<QueueEntry>>;

    /// Writes `status` without checking the current one. Stamps `called_at` when moving to
    /// `being_examined` and `completed_at` when moving to `done`.
    fn set_queue_status(
        &self,
        id: &RecordId,
        status: QueueStatus,
        at: DateTime<Utc>,
    ) -> ClinicResult<()>;

    fn set_queue_number(
        &self,
        id: &RecordId,
        queue_number: u64,
        estimated_wait_time: u64,
    ) -> ClinicResult<()>;

    /// Deletes the entry without archiving it. Returns whether it existed.
    fn remove_queue_entry(&self, id: &RecordId) -> ClinicResult<bool>;

    /// Entries with status in {waiting, being_examined}, ascending by queue number.
    fn list_active_queue(&self) -> ClinicResult<Vec<QueueEntry>> {
        let mut entries: Vec<QueueEntry> = self
            .list_queue_entries()?
            .into_iter()
            .filter(|e| e.status.is_active())
            .collect();
        entries.sort_by_key(|e| e.queue_number);
        Ok(entries)
    }

    /// Assigns queue numbers `1..=N` in the given order, one write per entry.
    ///
    /// Not atomic: a failure after `k` writes leaves those `k` entries renumbered and is
    /// reported as [`ClinicError::PartialReorder`].
    fn reorder_queue(&self, ordered_ids: &[RecordId], minutes_per_slot: u32) -> ClinicResult<()> {
        let total = ordered_ids.len();
        for (index, id) in ordered_ids.iter().enumerate() {
            let queue_number = index as u64 + 1;
            if let Err(e) =
                self.set_queue_number(id, queue_number, estimated_wait(queue_number, minutes_per_slot))
            {
                return Err(ClinicError::PartialReorder {
                    renumbered: index,
                    total,
                    source: Box::new(e),
                });
            }
        }
        Ok(())
    }
}

pub trait PrescriptionStore {
    fn insert_prescription(&self, prescription: &Prescription) -> ClinicResult<()>;
    fn get_prescription(&self, id: &RecordId) -> ClinicResult<Prescription>;
    fn list_prescriptions(&self) -> ClinicResult<Vec<Prescription>>;
    fn set_prescription_status(
        &self,
        id: &RecordId,
        status: PrescriptionStatus,
        at: DateTime<Utc>,
    ) -> ClinicResult<()>;

    /// Prescriptions with `status`, newest first.
    fn list_prescriptions_by_status(
        &self,
        status: PrescriptionStatus,
    ) -> ClinicResult<Vec<Prescription>> {
        let mut out: Vec<Prescription> = self
            .list_prescriptions()?
            .into_iter()
            .filter(|p| p.status == status)
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}

/// Read-mostly medicine catalog.
pub trait MedicineCatalog {
    fn upsert_medicine(&self, medicine: &Medicine) -> ClinicResult<()>;
    fn get_medicine(&self, id: &RecordId) -> ClinicResult<Medicine>;
    fn list_medicines(&self) -> ClinicResult<Vec<Medicine>>;
}

pub trait MedicineOrderStore {
    fn insert_order(&self, order: &MedicineOrder) -> ClinicResult<()>;
    fn get_order(&self, id: &RecordId) -> ClinicResult<MedicineOrder>;
    fn list_orders(&self) -> ClinicResult<Vec<MedicineOrder>>;
    fn set_order_status(
        &self,
        id: &RecordId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> ClinicResult<()>;
}

pub trait LoginAuditLog {
    fn append_login_attempt(&self, attempt: &LoginAttempt) -> ClinicResult<()>;
    fn list_login_attempts(&self) -> ClinicResult<Vec<LoginAttempt>>;
}

/// A write landed somewhere under `path` (for example `queue_entries/<id>`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreChange {
    pub path: String,
}

impl StoreChange {
    /// First path segment, i.e. the collection written to.
    pub fn collection(&self) -> &str {
        self.path.split('/').next().unwrap_or_default()
    }
}

/// Push notifications of store writes, where the backend supports them.
pub trait ChangeFeed {
    /// `None` when the backend cannot push; callers fall back to polling.
    fn subscribe_changes(&self) -> Option<broadcast::Receiver<StoreChange>>;
}

/// Everything a deployment's storage must provide.
pub trait ClinicBackend:
    SequenceIssuer
    + PatientStore
    + QueueStore
    + PrescriptionStore
    + MedicineCatalog
    + MedicineOrderStore
    + LoginAuditLog
    + ChangeFeed
    + Send
    + Sync
{
    fn backend_name(&self) -> &'static str;
}
