//! Queue entries: one per active visit.

use crate::ClinicError;
use chrono::{DateTime, Utc};
use klinik_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Visit status of a queue entry.
///
/// The store accepts any transition; only the exposed actions (approve, mark done, cancel)
/// restrict what callers do in practice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Waiting,
    #[serde(alias = "examining")]
    BeingExamined,
    Done,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::BeingExamined => "being_examined",
            Self::Done => "done",
        }
    }

    /// Badge text shown on the queue board and dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Waiting => "Waiting",
            Self::BeingExamined => "Being Examined",
            Self::Done => "Done",
        }
    }

    /// Waiting and being-examined entries make up the current queue.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Done)
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "being_examined" | "examining" => Ok(Self::BeingExamined),
            "done" => Ok(Self::Done),
            other => Err(ClinicError::InvalidInput(format!(
                "unknown queue status '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub queue_number: u64,
    pub status: QueueStatus,
    /// Minutes, fixed at creation (and on reorder) as `queue_number * minutes_per_slot`.
    pub estimated_wait_time: u64,
    pub created_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Estimated wait for a given queue number.
pub fn estimated_wait(queue_number: u64, minutes_per_slot: u32) -> u64 {
    queue_number.saturating_mul(u64::from(minutes_per_slot))
}

impl QueueEntry {
    /// A fresh `waiting` entry for a just-registered patient.
    pub fn create(
        patient_id: RecordId,
        queue_number: u64,
        minutes_per_slot: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: klinik_uuid::issue_identifier(),
            patient_id,
            queue_number,
            status: QueueStatus::Waiting,
            estimated_wait_time: estimated_wait(queue_number, minutes_per_slot),
            created_at,
            called_at: None,
            completed_at: None,
        }
    }
}

/// Direction for swapping an entry with its neighbour in the active ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

impl FromStr for MoveDirection {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(ClinicError::InvalidInput(format!(
                "unknown direction '{other}' (expected 'up' or 'down')"
            ))),
        }
    }
}
