//! Request and response bodies for the HTTP API.
//!
//! Identifiers travel as canonical 32-hex strings and timestamps as RFC 3339 strings. Each
//! response type has a `From` conversion from the core record or view it presents.

use chrono::{DateTime, Utc};
use klinik_core::login::LoginAttempt;
use klinik_core::medicine::{Medicine, MedicineOrder, OrderLine, OrderReceipt};
use klinik_core::patient::{Patient, PatientForm};
use klinik_core::prescription::{PrescribedMedicine, PrescriptionForm};
use klinik_core::projection::{
    Dashboard, DashboardRow, PrescriptionRow, QueueBoard, QueueBoardRow, StatusCounts,
};
use klinik_core::services::RegistrationReceipt;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

fn optional_timestamp(at: Option<DateTime<Utc>>) -> Option<String> {
    at.map(timestamp)
}

// ==== GENERAL ====

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SuccessRes {
    pub success: bool,
}

// ==== REGISTRATION & PATIENTS ====

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterReq {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub reason_for_visit: String,
}

impl From<RegisterReq> for PatientForm {
    fn from(req: RegisterReq) -> Self {
        PatientForm {
            full_name: req.full_name,
            date_of_birth: req.date_of_birth,
            contact_number: req.contact_number,
            reason_for_visit: req.reason_for_visit,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RegisterRes {
    pub patient_id: String,
    pub queue_entry_id: String,
    pub queue_number: u64,
    /// Minutes.
    pub estimated_wait_time: u64,
}

impl From<RegistrationReceipt> for RegisterRes {
    fn from(receipt: RegistrationReceipt) -> Self {
        Self {
            patient_id: receipt.patient_id.to_string(),
            queue_entry_id: receipt.queue_entry_id.to_string(),
            queue_number: receipt.queue_number,
            estimated_wait_time: receipt.estimated_wait_time,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: String,
    pub full_name: String,
    pub date_of_birth: String,
    pub contact_number: String,
    pub reason_for_visit: String,
    pub created_at: String,
}

impl From<Patient> for PatientRes {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id.to_string(),
            full_name: patient.full_name,
            date_of_birth: patient.date_of_birth,
            contact_number: patient.contact_number,
            reason_for_visit: patient.reason_for_visit,
            created_at: timestamp(patient.created_at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
}

// ==== QUEUE ====

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueueBoardRowRes {
    pub queue_entry_id: String,
    pub queue_number: u64,
    pub patient_initials: String,
    pub status: String,
    pub status_label: String,
    /// Minutes; only present while waiting.
    pub estimated_wait: Option<u64>,
}

impl From<QueueBoardRow> for QueueBoardRowRes {
    fn from(row: QueueBoardRow) -> Self {
        Self {
            queue_entry_id: row.queue_entry_id.to_string(),
            queue_number: row.queue_number,
            patient_initials: row.patient_initials,
            status: row.status.as_str().into(),
            status_label: row.status_label.into(),
            estimated_wait: row.estimated_wait,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueueBoardRes {
    pub rows: Vec<QueueBoardRowRes>,
    pub waiting: usize,
    pub being_examined: usize,
    pub next_wait: u64,
}

impl From<QueueBoard> for QueueBoardRes {
    fn from(board: QueueBoard) -> Self {
        Self {
            rows: board.rows.into_iter().map(Into::into).collect(),
            waiting: board.summary.waiting,
            being_examined: board.summary.being_examined,
            next_wait: board.summary.next_wait,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ReorderReq {
    /// Active queue entry ids in their new order.
    pub queue_entry_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct MoveReq {
    /// `up` or `down`.
    pub direction: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueueOrderRes {
    pub queue_entry_ids: Vec<String>,
}

// ==== DASHBOARD ====

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardRowRes {
    pub queue_entry_id: String,
    pub queue_number: u64,
    pub status: String,
    pub status_label: String,
    pub patient: Option<PatientRes>,
    pub created_at: String,
    pub called_at: Option<String>,
    pub completed_at: Option<String>,
}

impl From<DashboardRow> for DashboardRowRes {
    fn from(row: DashboardRow) -> Self {
        Self {
            queue_entry_id: row.queue_entry_id.to_string(),
            queue_number: row.queue_number,
            status: row.status.as_str().into(),
            status_label: row.status_label.into(),
            patient: row.patient.map(Into::into),
            created_at: timestamp(row.created_at),
            called_at: optional_timestamp(row.called_at),
            completed_at: optional_timestamp(row.completed_at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusCountsRes {
    pub waiting: usize,
    pub being_examined: usize,
    pub done: usize,
}

impl From<StatusCounts> for StatusCountsRes {
    fn from(counts: StatusCounts) -> Self {
        Self {
            waiting: counts.waiting,
            being_examined: counts.being_examined,
            done: counts.done,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardRes {
    pub queue: Vec<DashboardRowRes>,
    pub counts: StatusCountsRes,
    pub pending_prescriptions: Vec<PrescriptionRes>,
    pub dispensed_prescriptions: Vec<PrescriptionRes>,
}

impl From<Dashboard> for DashboardRes {
    fn from(dashboard: Dashboard) -> Self {
        Self {
            queue: dashboard.queue.into_iter().map(Into::into).collect(),
            counts: dashboard.counts.into(),
            pending_prescriptions: dashboard
                .pending_prescriptions
                .into_iter()
                .map(Into::into)
                .collect(),
            dispensed_prescriptions: dashboard
                .dispensed_prescriptions
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

// ==== PRESCRIPTIONS ====

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PrescribedMedicineDto {
    pub medicine_name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub duration: String,
}

impl From<PrescribedMedicineDto> for PrescribedMedicine {
    fn from(dto: PrescribedMedicineDto) -> Self {
        PrescribedMedicine {
            medicine_name: dto.medicine_name,
            dosage: dto.dosage,
            frequency: dto.frequency,
            duration: dto.duration,
        }
    }
}

impl From<PrescribedMedicine> for PrescribedMedicineDto {
    fn from(line: PrescribedMedicine) -> Self {
        Self {
            medicine_name: line.medicine_name,
            dosage: line.dosage,
            frequency: line.frequency,
            duration: line.duration,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreatePrescriptionReq {
    pub patient_id: String,
    pub diagnosis: String,
    #[serde(default)]
    pub doctor_notes: Option<String>,
    #[serde(default)]
    pub medicines: Vec<PrescribedMedicineDto>,
}

impl From<CreatePrescriptionReq> for PrescriptionForm {
    fn from(req: CreatePrescriptionReq) -> Self {
        PrescriptionForm {
            patient_id: req.patient_id,
            diagnosis: req.diagnosis,
            doctor_notes: req.doctor_notes,
            medicines: req.medicines.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreatePrescriptionRes {
    pub prescription_id: String,
}

/// A prescription joined with its patient's name and contact number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PrescriptionRes {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub contact_number: Option<String>,
    pub diagnosis: String,
    pub doctor_notes: Option<String>,
    pub medicines: Vec<PrescribedMedicineDto>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PrescriptionRow> for PrescriptionRes {
    fn from(row: PrescriptionRow) -> Self {
        let prescription = row.prescription;
        Self {
            id: prescription.id.to_string(),
            patient_id: prescription.patient_id.to_string(),
            patient_name: row.patient_name,
            contact_number: row.contact_number,
            diagnosis: prescription.diagnosis,
            doctor_notes: prescription.doctor_notes,
            medicines: prescription.medicines.into_iter().map(Into::into).collect(),
            status: prescription.status.as_str().into(),
            created_at: timestamp(prescription.created_at),
            updated_at: timestamp(prescription.updated_at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PharmacyRes {
    pub prescriptions: Vec<PrescriptionRes>,
}

// ==== MEDICINES & ORDERS ====

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MedicineRes {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: u64,
    pub in_stock: bool,
    pub stock: u32,
    pub description: Option<String>,
}

impl From<Medicine> for MedicineRes {
    fn from(medicine: Medicine) -> Self {
        Self {
            id: medicine.id.to_string(),
            name: medicine.name,
            category: medicine.category,
            price: medicine.price,
            in_stock: medicine.in_stock,
            stock: medicine.stock,
            description: medicine.description,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListMedicinesRes {
    pub medicines: Vec<MedicineRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoriesRes {
    pub categories: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderLineReq {
    pub medicine_id: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderReq {
    pub items: Vec<OrderLineReq>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRes {
    pub order_id: String,
    pub order_number: u64,
    pub total: u64,
}

impl From<OrderReceipt> for CreateOrderRes {
    fn from(receipt: OrderReceipt) -> Self {
        Self {
            order_id: receipt.order_id.to_string(),
            order_number: receipt.order_number,
            total: receipt.total,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderLineRes {
    pub medicine_id: String,
    pub medicine_name: String,
    pub unit_price: u64,
    pub quantity: u32,
}

impl From<OrderLine> for OrderLineRes {
    fn from(line: OrderLine) -> Self {
        Self {
            medicine_id: line.medicine_id.to_string(),
            medicine_name: line.medicine_name,
            unit_price: line.unit_price,
            quantity: line.quantity,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderRes {
    pub id: String,
    pub order_number: u64,
    pub items: Vec<OrderLineRes>,
    pub total: u64,
    pub status: String,
    pub created_at: String,
    pub collected_at: Option<String>,
}

impl From<MedicineOrder> for OrderRes {
    fn from(order: MedicineOrder) -> Self {
        Self {
            id: order.id.to_string(),
            order_number: order.order_number,
            items: order.items.into_iter().map(Into::into).collect(),
            total: order.total,
            status: order.status.as_str().into(),
            created_at: timestamp(order.created_at),
            collected_at: optional_timestamp(order.collected_at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListOrdersRes {
    pub orders: Vec<OrderRes>,
}

// ==== LOGIN ====

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoginRes {
    pub ok: bool,
    pub username: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoginAttemptRes {
    pub id: String,
    pub username: String,
    pub login_time: String,
    pub status: String,
}

impl From<LoginAttempt> for LoginAttemptRes {
    fn from(attempt: LoginAttempt) -> Self {
        Self {
            id: attempt.id.to_string(),
            username: attempt.username,
            login_time: timestamp(attempt.login_time),
            status: attempt.outcome.as_str().into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListLoginAttemptsRes {
    pub attempts: Vec<LoginAttemptRes>,
}
