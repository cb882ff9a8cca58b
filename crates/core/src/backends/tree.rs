//! Tree backend, built on [`TreeStore`].
//!
//! Layout: one top-level node per collection, records keyed by their id. Field names are
//! snake_case except the login log's `loginTime`; queue entries spell the examination status
//! `examining` and carry the patient's name alongside the patient id. Prescription records
//! written before `updated_at` existed are read back with `updated_at = created_at`.
//!
//! Counters are updated through [`TreeStore::transaction`], which serializes all writers in
//! this process. Every write is pushed to subscribers of [`ChangeFeed::subscribe_changes`].

use crate::constants::{
    COUNTERS_NODE, LOGINS_NODE, MEDICINES_NODE, ORDERS_NODE, PATIENTS_NODE, PRESCRIPTIONS_NODE,
    QUEUE_NODE,
};
use crate::login::{LoginAttempt, LoginOutcome};
use crate::medicine::{Medicine, MedicineOrder, OrderLine, OrderStatus};
use crate::patient::Patient;
use crate::prescription::{PrescribedMedicine, Prescription, PrescriptionStatus};
use crate::queue::{QueueEntry, QueueStatus};
use crate::store::{
    ChangeFeed, ClinicBackend, LoginAuditLog, MedicineCatalog, MedicineOrderStore, PatientStore,
    PrescriptionStore, QueueStore, SequenceCounter, SequenceIssuer, StoreChange,
};
use crate::tree_store::TreeStore;
use crate::{ClinicError, ClinicResult};
use chrono::{DateTime, Utc};
use klinik_uuid::RecordId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;
use tokio::sync::broadcast;

pub struct TreeBackend {
    store: TreeStore,
}

impl TreeBackend {
    pub fn new(store: TreeStore) -> Self {
        Self { store }
    }

    pub fn open(dir: &Path) -> ClinicResult<Self> {
        Ok(Self::new(TreeStore::open(dir)?))
    }

    pub fn in_memory() -> Self {
        Self::new(TreeStore::in_memory())
    }

    fn get_node<T: DeserializeOwned>(
        &self,
        collection: &str,
        kind: &'static str,
        id: &RecordId,
    ) -> ClinicResult<T> {
        let path = record_path(collection, id);
        match self.store.get(&path)? {
            Some(value) => decode(&path, value),
            None => Err(ClinicError::not_found(kind, id)),
        }
    }

    fn list_nodes<T: DeserializeOwned>(&self, collection: &str) -> ClinicResult<Vec<(RecordId, T)>> {
        self.store
            .children(collection)?
            .into_iter()
            .map(|(key, value)| {
                let path = format!("{collection}/{key}");
                Ok((RecordId::parse(&key)?, decode(&path, value)?))
            })
            .collect()
    }

    fn put_node<T: Serialize>(&self, collection: &str, id: &RecordId, node: &T) -> ClinicResult<()> {
        self.store.set(&record_path(collection, id), encode(node)?)
    }

    fn update_node(
        &self,
        collection: &str,
        kind: &'static str,
        id: &RecordId,
        fields: Map<String, Value>,
    ) -> ClinicResult<()> {
        if self.store.update(&record_path(collection, id), fields)? {
            Ok(())
        } else {
            Err(ClinicError::not_found(kind, id))
        }
    }
}

fn record_path(collection: &str, id: &RecordId) -> String {
    format!("{collection}/{id}")
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> ClinicResult<T> {
    serde_path_to_error::deserialize(value).map_err(|e| {
        ClinicError::Deserialization(format!("{path} at '{}': {}", e.path(), e.inner()))
    })
}

fn encode<T: Serialize>(node: &T) -> ClinicResult<Value> {
    serde_json::to_value(node).map_err(ClinicError::Serialization)
}

fn timestamp_value(at: &DateTime<Utc>) -> ClinicResult<Value> {
    encode(at)
}

// ============================================================================
// NODE SHAPES
// ============================================================================

#[derive(Serialize, Deserialize)]
struct PatientNode {
    full_name: String,
    date_of_birth: String,
    contact_number: String,
    reason_for_visit: String,
    created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum QueueStatusNode {
    Waiting,
    #[serde(alias = "being_examined")]
    Examining,
    Done,
}

impl From<QueueStatus> for QueueStatusNode {
    fn from(status: QueueStatus) -> Self {
        match status {
            QueueStatus::Waiting => Self::Waiting,
            QueueStatus::BeingExamined => Self::Examining,
            QueueStatus::Done => Self::Done,
        }
    }
}

impl From<QueueStatusNode> for QueueStatus {
    fn from(status: QueueStatusNode) -> Self {
        match status {
            QueueStatusNode::Waiting => Self::Waiting,
            QueueStatusNode::Examining => Self::BeingExamined,
            QueueStatusNode::Done => Self::Done,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct QueueNode {
    patient_id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    patient_name: Option<String>,
    queue_number: u64,
    status: QueueStatusNode,
    #[serde(default)]
    estimated_wait_time: u64,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    called_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
}

impl QueueNode {
    fn into_entry(self, id: RecordId) -> QueueEntry {
        QueueEntry {
            id,
            patient_id: self.patient_id,
            queue_number: self.queue_number,
            status: self.status.into(),
            estimated_wait_time: self.estimated_wait_time,
            created_at: self.created_at,
            called_at: self.called_at,
            completed_at: self.completed_at,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PrescriptionNode {
    patient_id: RecordId,
    diagnosis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    doctor_notes: Option<String>,
    #[serde(default)]
    prescribed_medicines: Vec<PrescribedMedicine>,
    status: PrescriptionStatus,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl PrescriptionNode {
    fn into_prescription(self, id: RecordId) -> Prescription {
        Prescription {
            id,
            patient_id: self.patient_id,
            diagnosis: self.diagnosis,
            doctor_notes: self.doctor_notes.filter(|n| !n.trim().is_empty()),
            medicines: self.prescribed_medicines,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at.unwrap_or(self.created_at),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct MedicineNode {
    name: String,
    category: String,
    price: u64,
    #[serde(default = "in_stock_default")]
    in_stock: bool,
    #[serde(default)]
    stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

fn in_stock_default() -> bool {
    true
}

#[derive(Serialize, Deserialize)]
struct OrderNode {
    order_number: u64,
    items: Vec<OrderLine>,
    total: u64,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    collected_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginNode {
    username: String,
    login_time: DateTime<Utc>,
    status: LoginOutcome,
}

// ============================================================================
// STORE IMPLEMENTATIONS
// ============================================================================

impl SequenceIssuer for TreeBackend {
    fn issue_sequence_number(&self, counter: SequenceCounter) -> ClinicResult<u64> {
        let unavailable = |reason: String| ClinicError::SequenceUnavailable {
            counter: counter.name(),
            reason,
        };

        let path = format!("{COUNTERS_NODE}/{}", counter.name());
        let committed = self
            .store
            .transaction(&path, |current| {
                let value = current.map_or(Some(0), Value::as_u64)?;
                Some(json!(value + 1))
            })
            .map_err(|e| unavailable(e.to_string()))?;

        committed
            .as_ref()
            .and_then(Value::as_u64)
            .ok_or_else(|| unavailable("stored counter is not a non-negative integer".into()))
    }
}

impl PatientStore for TreeBackend {
    fn insert_patient(&self, patient: &Patient) -> ClinicResult<()> {
        self.put_node(
            PATIENTS_NODE,
            &patient.id,
            &PatientNode {
                full_name: patient.full_name.clone(),
                date_of_birth: patient.date_of_birth.clone(),
                contact_number: patient.contact_number.clone(),
                reason_for_visit: patient.reason_for_visit.clone(),
                created_at: patient.created_at,
            },
        )
    }

    fn get_patient(&self, id: &RecordId) -> ClinicResult<Patient> {
        let node: PatientNode = self.get_node(PATIENTS_NODE, "patient", id)?;
        Ok(patient_from_node(*id, node))
    }

    fn list_patients(&self) -> ClinicResult<Vec<Patient>> {
        let mut out: Vec<Patient> = self
            .list_nodes::<PatientNode>(PATIENTS_NODE)?
            .into_iter()
            .map(|(id, node)| patient_from_node(id, node))
            .collect();
        out.sort_by_key(|p| p.created_at);
        Ok(out)
    }
}

fn patient_from_node(id: RecordId, node: PatientNode) -> Patient {
    Patient {
        id,
        full_name: node.full_name,
        date_of_birth: node.date_of_birth,
        contact_number: node.contact_number,
        reason_for_visit: node.reason_for_visit,
        created_at: node.created_at,
    }
}

impl QueueStore for TreeBackend {
    fn insert_queue_entry(&self, entry: &QueueEntry) -> ClinicResult<()> {
        let patient_name = match self.get_patient(&entry.patient_id) {
            Ok(patient) => Some(patient.full_name),
            Err(ClinicError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        self.put_node(
            QUEUE_NODE,
            &entry.id,
            &QueueNode {
                patient_id: entry.patient_id,
                patient_name,
                queue_number: entry.queue_number,
                status: entry.status.into(),
                estimated_wait_time: entry.estimated_wait_time,
                created_at: entry.created_at,
                called_at: entry.called_at,
                completed_at: entry.completed_at,
            },
        )
    }

    fn get_queue_entry(&self, id: &RecordId) -> ClinicResult<QueueEntry> {
        let node: QueueNode = self.get_node(QUEUE_NODE, "queue entry", id)?;
        Ok(node.into_entry(*id))
    }

    fn list_queue_entries(&self) -> ClinicResult<Vec<QueueEntry>> {
        Ok(self
            .list_nodes::<QueueNode>(QUEUE_NODE)?
            .into_iter()
            .map(|(id, node)| node.into_entry(id))
            .collect())
    }

    fn set_queue_status(
        &self,
        id: &RecordId,
        status: QueueStatus,
        at: DateTime<Utc>,
    ) -> ClinicResult<()> {
        let mut fields = Map::new();
        fields.insert("status".into(), encode(&QueueStatusNode::from(status))?);
        match status {
            QueueStatus::Waiting => {}
            QueueStatus::BeingExamined => {
                fields.insert("called_at".into(), timestamp_value(&at)?);
            }
            QueueStatus::Done => {
                fields.insert("completed_at".into(), timestamp_value(&at)?);
            }
        }
        self.update_node(QUEUE_NODE, "queue entry", id, fields)
    }

    fn set_queue_number(
        &self,
        id: &RecordId,
        queue_number: u64,
        estimated_wait_time: u64,
    ) -> ClinicResult<()> {
        let mut fields = Map::new();
        fields.insert("queue_number".into(), json!(queue_number));
        fields.insert("estimated_wait_time".into(), json!(estimated_wait_time));
        self.update_node(QUEUE_NODE, "queue entry", id, fields)
    }

    fn remove_queue_entry(&self, id: &RecordId) -> ClinicResult<bool> {
        self.store.remove(&record_path(QUEUE_NODE, id))
    }
}

impl PrescriptionStore for TreeBackend {
    fn insert_prescription(&self, prescription: &Prescription) -> ClinicResult<()> {
        self.put_node(
            PRESCRIPTIONS_NODE,
            &prescription.id,
            &PrescriptionNode {
                patient_id: prescription.patient_id,
                diagnosis: prescription.diagnosis.clone(),
                doctor_notes: prescription.doctor_notes.clone(),
                prescribed_medicines: prescription.medicines.clone(),
                status: prescription.status,
                created_at: prescription.created_at,
                updated_at: Some(prescription.updated_at),
            },
        )
    }

    fn get_prescription(&self, id: &RecordId) -> ClinicResult<Prescription> {
        let node: PrescriptionNode = self.get_node(PRESCRIPTIONS_NODE, "prescription", id)?;
        Ok(node.into_prescription(*id))
    }

    fn list_prescriptions(&self) -> ClinicResult<Vec<Prescription>> {
        let mut out: Vec<Prescription> = self
            .list_nodes::<PrescriptionNode>(PRESCRIPTIONS_NODE)?
            .into_iter()
            .map(|(id, node)| node.into_prescription(id))
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    fn set_prescription_status(
        &self,
        id: &RecordId,
        status: PrescriptionStatus,
        at: DateTime<Utc>,
    ) -> ClinicResult<()> {
        let mut fields = Map::new();
        fields.insert("status".into(), encode(&status)?);
        fields.insert("updated_at".into(), timestamp_value(&at)?);
        self.update_node(PRESCRIPTIONS_NODE, "prescription", id, fields)
    }
}

impl MedicineCatalog for TreeBackend {
    fn upsert_medicine(&self, medicine: &Medicine) -> ClinicResult<()> {
        self.put_node(
            MEDICINES_NODE,
            &medicine.id,
            &MedicineNode {
                name: medicine.name.clone(),
                category: medicine.category.clone(),
                price: medicine.price,
                in_stock: medicine.in_stock,
                stock: medicine.stock,
                description: medicine.description.clone(),
            },
        )
    }

    fn get_medicine(&self, id: &RecordId) -> ClinicResult<Medicine> {
        let node: MedicineNode = self.get_node(MEDICINES_NODE, "medicine", id)?;
        Ok(medicine_from_node(*id, node))
    }

    fn list_medicines(&self) -> ClinicResult<Vec<Medicine>> {
        let mut out: Vec<Medicine> = self
            .list_nodes::<MedicineNode>(MEDICINES_NODE)?
            .into_iter()
            .map(|(id, node)| medicine_from_node(id, node))
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

fn medicine_from_node(id: RecordId, node: MedicineNode) -> Medicine {
    Medicine {
        id,
        name: node.name,
        category: node.category,
        price: node.price,
        in_stock: node.in_stock,
        stock: node.stock,
        description: node.description,
    }
}

impl MedicineOrderStore for TreeBackend {
    fn insert_order(&self, order: &MedicineOrder) -> ClinicResult<()> {
        self.put_node(
            ORDERS_NODE,
            &order.id,
            &OrderNode {
                order_number: order.order_number,
                items: order.items.clone(),
                total: order.total,
                status: order.status,
                created_at: order.created_at,
                collected_at: order.collected_at,
            },
        )
    }

    fn get_order(&self, id: &RecordId) -> ClinicResult<MedicineOrder> {
        let node: OrderNode = self.get_node(ORDERS_NODE, "medicine order", id)?;
        Ok(order_from_node(*id, node))
    }

    fn list_orders(&self) -> ClinicResult<Vec<MedicineOrder>> {
        let mut out: Vec<MedicineOrder> = self
            .list_nodes::<OrderNode>(ORDERS_NODE)?
            .into_iter()
            .map(|(id, node)| order_from_node(id, node))
            .collect();
        out.sort_by_key(|o| o.order_number);
        Ok(out)
    }

    fn set_order_status(
        &self,
        id: &RecordId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> ClinicResult<()> {
        let mut fields = Map::new();
        fields.insert("status".into(), encode(&status)?);
        if status == OrderStatus::Collected {
            fields.insert("collected_at".into(), timestamp_value(&at)?);
        }
        self.update_node(ORDERS_NODE, "medicine order", id, fields)
    }
}

fn order_from_node(id: RecordId, node: OrderNode) -> MedicineOrder {
    MedicineOrder {
        id,
        order_number: node.order_number,
        items: node.items,
        total: node.total,
        status: node.status,
        created_at: node.created_at,
        collected_at: node.collected_at,
    }
}

impl LoginAuditLog for TreeBackend {
    fn append_login_attempt(&self, attempt: &LoginAttempt) -> ClinicResult<()> {
        self.put_node(
            LOGINS_NODE,
            &attempt.id,
            &LoginNode {
                username: attempt.username.clone(),
                login_time: attempt.login_time,
                status: attempt.outcome,
            },
        )
    }

    fn list_login_attempts(&self) -> ClinicResult<Vec<LoginAttempt>> {
        let mut out: Vec<LoginAttempt> = self
            .list_nodes::<LoginNode>(LOGINS_NODE)?
            .into_iter()
            .map(|(id, node)| LoginAttempt {
                id,
                username: node.username,
                login_time: node.login_time,
                outcome: node.status,
            })
            .collect();
        out.sort_by_key(|a| a.login_time);
        Ok(out)
    }
}

impl ChangeFeed for TreeBackend {
    fn subscribe_changes(&self) -> Option<broadcast::Receiver<StoreChange>> {
        Some(self.store.subscribe())
    }
}

impl ClinicBackend for TreeBackend {
    fn backend_name(&self) -> &'static str {
        "tree"
    }
}
