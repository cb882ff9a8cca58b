//! Admin queue actions.
//!
//! None of these validate the entry's current status; the store accepts any transition.
//! Reordering writes one entry at a time and can interleave with concurrent cancels or
//! status changes.

use crate::config::CoreConfig;
use crate::queue::{MoveDirection, QueueEntry, QueueStatus};
use crate::store::{ClinicBackend, QueueStore};
use crate::{ClinicError, ClinicResult};
use chrono::Utc;
use klinik_uuid::RecordId;
use std::sync::Arc;

#[derive(Clone)]
pub struct QueueService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn ClinicBackend>,
}

impl QueueService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn ClinicBackend>) -> Self {
        Self { cfg, store }
    }

    /// The current queue: waiting and being-examined entries by ascending queue number.
    pub fn list_active(&self) -> ClinicResult<Vec<QueueEntry>> {
        self.store.list_active_queue()
    }

    /// Calls the patient in: `waiting` → `being_examined`.
    pub fn approve(&self, id: &RecordId) -> ClinicResult<()> {
        self.store
            .set_queue_status(id, QueueStatus::BeingExamined, Utc::now())?;
        tracing::info!(queue_entry_id = %id, "patient called in");
        Ok(())
    }

    pub fn mark_done(&self, id: &RecordId) -> ClinicResult<()> {
        self.store.set_queue_status(id, QueueStatus::Done, Utc::now())?;
        tracing::info!(queue_entry_id = %id, "visit completed");
        Ok(())
    }

    /// Deletes the entry outright. The patient record is kept.
    pub fn cancel(&self, id: &RecordId) -> ClinicResult<()> {
        if !self.store.remove_queue_entry(id)? {
            return Err(ClinicError::not_found("queue entry", id));
        }
        tracing::info!(queue_entry_id = %id, "queue entry cancelled");
        Ok(())
    }

    /// Assigns queue numbers `1..=N` in the given order.
    ///
    /// # Errors
    ///
    /// [`ClinicError::PartialReorder`] if a write fails partway; earlier writes stay.
    pub fn reorder(&self, ordered_ids: &[RecordId]) -> ClinicResult<()> {
        self.store
            .reorder_queue(ordered_ids, self.cfg.minutes_per_slot())?;
        tracing::info!(entries = ordered_ids.len(), "queue reordered");
        Ok(())
    }

    /// Swaps an entry with its neighbour in the active ordering, then renumbers the whole
    /// active queue. Moving the first entry up or the last entry down changes nothing.
    ///
    /// Returns the resulting order.
    pub fn move_entry(&self, id: &RecordId, direction: MoveDirection) -> ClinicResult<Vec<RecordId>> {
        let mut ids: Vec<RecordId> = self
            .store
            .list_active_queue()?
            .into_iter()
            .map(|e| e.id)
            .collect();

        let index = ids
            .iter()
            .position(|candidate| candidate == id)
            .ok_or_else(|| ClinicError::not_found("queue entry", id))?;

        let neighbour = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => Some(index + 1).filter(|&i| i < ids.len()),
        };
        let Some(neighbour) = neighbour else {
            return Ok(ids);
        };

        ids.swap(index, neighbour);
        self.reorder(&ids)?;
        Ok(ids)
    }
}
