//! Read-only views over the stores.
//!
//! Every function here is pure: it takes already-fetched collections and returns the joined,
//! filtered view. Fetching and refresh scheduling live in [`crate::services::ViewService`]
//! and [`crate::refresh`].

use crate::constants::UNKNOWN_PATIENT_NAME;
use crate::patient::Patient;
use crate::prescription::{Prescription, PrescriptionStatus};
use crate::queue::{estimated_wait, QueueEntry, QueueStatus};
use crate::view_prefs::ViewPrefs;
use chrono::{DateTime, Utc};
use klinik_uuid::RecordId;
use serde::Serialize;
use std::collections::HashMap;

/// Initials for the public board, e.g. "Alice Tan" → "A.T.". Blank names give "?".
pub fn initials(full_name: &str) -> String {
    let letters: String = full_name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .map(|c| format!("{c}."))
        .collect();
    if letters.is_empty() {
        "?".to_string()
    } else {
        letters
    }
}

fn index_patients(patients: &[Patient]) -> HashMap<RecordId, &Patient> {
    patients.iter().map(|p| (p.id, p)).collect()
}

// ============================================================================
// PUBLIC QUEUE BOARD
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueueBoardRow {
    pub queue_entry_id: RecordId,
    pub queue_number: u64,
    pub patient_initials: String,
    pub status: QueueStatus,
    pub status_label: &'static str,
    /// Minutes; only shown while waiting.
    pub estimated_wait: Option<u64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QueueBoardSummary {
    pub waiting: usize,
    pub being_examined: usize,
    /// Estimated wait of the first waiting row, or 0 if nobody is waiting.
    pub next_wait: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QueueBoard {
    pub rows: Vec<QueueBoardRow>,
    pub summary: QueueBoardSummary,
}

/// The public board: every non-done entry by ascending queue number, identified only by
/// initials.
pub fn queue_board(entries: &[QueueEntry], patients: &[Patient], minutes_per_slot: u32) -> QueueBoard {
    let by_id = index_patients(patients);

    let mut active: Vec<&QueueEntry> = entries.iter().filter(|e| e.status.is_active()).collect();
    active.sort_by_key(|e| e.queue_number);

    let rows: Vec<QueueBoardRow> = active
        .into_iter()
        .map(|entry| QueueBoardRow {
            queue_entry_id: entry.id,
            queue_number: entry.queue_number,
            patient_initials: by_id
                .get(&entry.patient_id)
                .map_or_else(|| initials(""), |p| initials(&p.full_name)),
            status: entry.status,
            status_label: entry.status.label(),
            estimated_wait: (entry.status == QueueStatus::Waiting)
                .then(|| estimated_wait(entry.queue_number, minutes_per_slot)),
        })
        .collect();

    let summary = QueueBoardSummary {
        waiting: rows
            .iter()
            .filter(|r| r.status == QueueStatus::Waiting)
            .count(),
        being_examined: rows
            .iter()
            .filter(|r| r.status == QueueStatus::BeingExamined)
            .count(),
        next_wait: rows.iter().find_map(|r| r.estimated_wait).unwrap_or(0),
    };

    QueueBoard { rows, summary }
}

// ============================================================================
// ADMIN DASHBOARD
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DashboardRow {
    pub queue_entry_id: RecordId,
    pub queue_number: u64,
    pub status: QueueStatus,
    pub status_label: &'static str,
    /// `None` if the referenced patient record no longer exists.
    pub patient: Option<Patient>,
    pub created_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub waiting: usize,
    pub being_examined: usize,
    pub done: usize,
}

/// A prescription joined with the patient it was written for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PrescriptionRow {
    pub prescription: Prescription,
    pub patient_name: String,
    pub contact_number: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub queue: Vec<DashboardRow>,
    pub counts: StatusCounts,
    pub pending_prescriptions: Vec<PrescriptionRow>,
    pub dispensed_prescriptions: Vec<PrescriptionRow>,
}

/// The admin dashboard: all queue entries (done included) minus those hidden by `prefs`,
/// plus every prescription split by status, newest first.
pub fn dashboard(
    entries: &[QueueEntry],
    patients: &[Patient],
    prescriptions: &[Prescription],
    prefs: &ViewPrefs,
) -> Dashboard {
    let by_id = index_patients(patients);

    let mut visible: Vec<&QueueEntry> = entries.iter().filter(|e| !prefs.hides(e)).collect();
    visible.sort_by_key(|e| e.queue_number);

    let mut counts = StatusCounts::default();
    let queue: Vec<DashboardRow> = visible
        .into_iter()
        .map(|entry| {
            match entry.status {
                QueueStatus::Waiting => counts.waiting += 1,
                QueueStatus::BeingExamined => counts.being_examined += 1,
                QueueStatus::Done => counts.done += 1,
            }
            DashboardRow {
                queue_entry_id: entry.id,
                queue_number: entry.queue_number,
                status: entry.status,
                status_label: entry.status.label(),
                patient: by_id.get(&entry.patient_id).map(|p| (*p).clone()),
                created_at: entry.created_at,
                called_at: entry.called_at,
                completed_at: entry.completed_at,
            }
        })
        .collect();

    Dashboard {
        queue,
        counts,
        pending_prescriptions: prescription_rows(prescriptions, &by_id, PrescriptionStatus::Pending),
        dispensed_prescriptions: prescription_rows(
            prescriptions,
            &by_id,
            PrescriptionStatus::Dispensed,
        ),
    }
}

fn prescription_rows(
    prescriptions: &[Prescription],
    by_id: &HashMap<RecordId, &Patient>,
    status: PrescriptionStatus,
) -> Vec<PrescriptionRow> {
    let mut rows: Vec<PrescriptionRow> = prescriptions
        .iter()
        .filter(|p| p.status == status)
        .map(|p| {
            let patient = by_id.get(&p.patient_id);
            PrescriptionRow {
                prescription: p.clone(),
                patient_name: patient
                    .map_or_else(|| UNKNOWN_PATIENT_NAME.to_string(), |pt| pt.full_name.clone()),
                contact_number: patient.map(|pt| pt.contact_number.clone()),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.prescription.created_at.cmp(&a.prescription.created_at));
    rows
}

// ============================================================================
// PHARMACY WORKLIST
// ============================================================================

/// Pending prescriptions, newest first. Prescriptions whose patient is missing are kept
/// with a placeholder name.
pub fn pharmacy_worklist(prescriptions: &[Prescription], patients: &[Patient]) -> Vec<PrescriptionRow> {
    prescription_rows(prescriptions, &index_patients(patients), PrescriptionStatus::Pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::PatientForm;
    use chrono::Duration;

    fn patient(name: &str) -> Patient {
        let form = PatientForm {
            full_name: name.into(),
            date_of_birth: "1990-01-01".into(),
            contact_number: "0811000000".into(),
            reason_for_visit: "Fever".into(),
        };
        Patient::create(form.validate().unwrap(), Utc::now())
    }

    fn entry(patient: &Patient, number: u64, status: QueueStatus) -> QueueEntry {
        let mut e = QueueEntry::create(patient.id, number, 15, Utc::now());
        e.status = status;
        e
    }

    fn prescription(patient_id: RecordId, status: PrescriptionStatus, age_minutes: i64) -> Prescription {
        let at = Utc::now() - Duration::minutes(age_minutes);
        Prescription {
            id: RecordId::new(),
            patient_id,
            diagnosis: "Influenza".into(),
            doctor_notes: None,
            medicines: Vec::new(),
            status,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("Alice Tan"), "A.T.");
        assert_eq!(initials("  budi   santoso  "), "B.S.");
        assert_eq!(initials("Cher"), "C.");
        assert_eq!(initials("   "), "?");
    }

    #[test]
    fn test_board_shows_wait_only_for_waiting_rows() {
        let alice = patient("Alice Tan");
        let bob = patient("Bob Lim");
        let carol = patient("Carol Ng");
        let entries = vec![
            entry(&bob, 2, QueueStatus::Waiting),
            entry(&alice, 1, QueueStatus::BeingExamined),
            entry(&carol, 3, QueueStatus::Waiting),
        ];

        let board = queue_board(&entries, &[alice, bob, carol], 15);

        let examined: Vec<&QueueBoardRow> = board
            .rows
            .iter()
            .filter(|r| r.status_label == "Being Examined")
            .collect();
        assert_eq!(examined.len(), 1);
        assert_eq!(examined[0].patient_initials, "A.T.");
        assert_eq!(examined[0].estimated_wait, None);

        for row in board.rows.iter().filter(|r| r.status == QueueStatus::Waiting) {
            assert_eq!(row.estimated_wait, Some(row.queue_number * 15));
        }
        assert_eq!(
            board.rows.iter().map(|r| r.queue_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(
            board.summary,
            QueueBoardSummary {
                waiting: 2,
                being_examined: 1,
                next_wait: 30,
            }
        );
    }

    #[test]
    fn test_board_excludes_done_and_tolerates_missing_patient() {
        let alice = patient("Alice Tan");
        let ghost = patient("Nobody");
        let entries = vec![
            entry(&alice, 1, QueueStatus::Done),
            entry(&ghost, 2, QueueStatus::Waiting),
        ];

        let board = queue_board(&entries, &[alice], 15);
        assert_eq!(board.rows.len(), 1);
        assert_eq!(board.rows[0].patient_initials, "?");
        assert_eq!(board.summary.next_wait, 30);
    }

    #[test]
    fn test_empty_board_has_zero_next_wait() {
        assert_eq!(queue_board(&[], &[], 15), QueueBoard::default());
    }

    #[test]
    fn test_dashboard_counts_and_splits() {
        let alice = patient("Alice Tan");
        let bob = patient("Bob Lim");
        let entries = vec![
            entry(&alice, 1, QueueStatus::Done),
            entry(&bob, 2, QueueStatus::Waiting),
        ];
        let old = prescription(alice.id, PrescriptionStatus::Pending, 30);
        let new = prescription(bob.id, PrescriptionStatus::Pending, 1);
        let done = prescription(alice.id, PrescriptionStatus::Dispensed, 10);

        let view = dashboard(
            &entries,
            &[alice.clone(), bob],
            &[old.clone(), done.clone(), new.clone()],
            &ViewPrefs::default(),
        );

        assert_eq!(view.queue.len(), 2);
        assert_eq!(
            view.counts,
            StatusCounts {
                waiting: 1,
                being_examined: 0,
                done: 1,
            }
        );
        assert_eq!(view.queue[0].patient.as_ref(), Some(&alice));
        let pending: Vec<RecordId> = view
            .pending_prescriptions
            .iter()
            .map(|r| r.prescription.id)
            .collect();
        assert_eq!(pending, vec![new.id, old.id]);
        assert_eq!(view.dispensed_prescriptions.len(), 1);
        assert_eq!(view.dispensed_prescriptions[0].prescription.id, done.id);
    }

    #[test]
    fn test_dashboard_respects_cleared_view() {
        let alice = patient("Alice Tan");
        let mut early = entry(&alice, 1, QueueStatus::Waiting);
        early.created_at = Utc::now() - Duration::hours(1);
        let late = entry(&alice, 2, QueueStatus::Waiting);

        let prefs = ViewPrefs::hiding_before(Some(Utc::now() - Duration::minutes(30)));
        let view = dashboard(&[early, late.clone()], &[alice], &[], &prefs);

        assert_eq!(view.queue.len(), 1);
        assert_eq!(view.queue[0].queue_entry_id, late.id);
        assert_eq!(view.counts.waiting, 1);
    }

    #[test]
    fn test_worklist_keeps_orphaned_prescriptions() {
        let alice = patient("Alice Tan");
        let orphan = prescription(RecordId::new(), PrescriptionStatus::Pending, 0);
        let mine = prescription(alice.id, PrescriptionStatus::Pending, 5);
        let handed = prescription(alice.id, PrescriptionStatus::Dispensed, 2);

        let rows = pharmacy_worklist(&[mine.clone(), orphan.clone(), handed], &[alice.clone()]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].prescription.id, orphan.id);
        assert_eq!(rows[0].patient_name, UNKNOWN_PATIENT_NAME);
        assert_eq!(rows[0].contact_number, None);
        assert_eq!(rows[1].patient_name, "Alice Tan");
        assert_eq!(rows[1].contact_number.as_deref(), Some(alice.contact_number.as_str()));
    }
}
