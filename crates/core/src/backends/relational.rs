//! Relational backend (SQLite via `rusqlite`).
//!
//! Tables use snake_case columns and foreign keys to `patients`. Identifiers are stored as
//! canonical 32-hex text, timestamps as fixed-width RFC 3339 text (nanosecond precision) so
//! that lexical order equals chronological order. Line items are JSON text columns.
//!
//! Counters live in the `counters` table and are incremented with a single upsert inside an
//! `IMMEDIATE` transaction, so independent connections (and processes) sharing one database
//! file never observe the same value.
//!
//! This backend cannot push change notifications; views poll it instead.

use crate::constants::DATABASE_BUSY_TIMEOUT_MS;
use crate::login::{LoginAttempt, LoginOutcome};
use crate::medicine::{Medicine, MedicineOrder, OrderLine, OrderStatus};
use crate::patient::Patient;
use crate::prescription::{PrescribedMedicine, Prescription, PrescriptionStatus};
use crate::queue::{QueueEntry, QueueStatus};
use crate::store::{
    ChangeFeed, ClinicBackend, LoginAuditLog, MedicineCatalog, MedicineOrderStore, PatientStore,
    PrescriptionStore, QueueStore, SequenceCounter, SequenceIssuer, StoreChange,
};
use crate::{ClinicError, ClinicResult};
use chrono::{DateTime, SecondsFormat, Utc};
use klinik_uuid::RecordId;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,
    contact_number TEXT NOT NULL,
    reason_for_visit TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS queue_entries (
    id TEXT PRIMARY KEY,
    patient_id TEXT REFERENCES patients(id),
    queue_number INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'waiting',
    estimated_wait_time INTEGER,
    created_at TEXT NOT NULL,
    called_at TEXT,
    completed_at TEXT
);

CREATE TABLE IF NOT EXISTS prescriptions (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    diagnosis TEXT NOT NULL,
    doctor_notes TEXT,
    prescribed_medicines TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS medicines (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    price INTEGER NOT NULL,
    in_stock INTEGER NOT NULL DEFAULT 1,
    stock INTEGER NOT NULL DEFAULT 0,
    description TEXT
);

CREATE TABLE IF NOT EXISTS medicine_orders (
    id TEXT PRIMARY KEY,
    order_number INTEGER NOT NULL,
    items TEXT NOT NULL,
    total INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    collected_at TEXT
);

CREATE TABLE IF NOT EXISTS admin_logins (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL,
    login_time TEXT NOT NULL,
    status TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS counters (
    name TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);
";

const NEXT_SEQUENCE_SQL: &str = "INSERT INTO counters (name, value) VALUES (?1, 1)
     ON CONFLICT(name) DO UPDATE SET value = value + 1
     RETURNING value";

pub struct RelationalBackend {
    conn: Mutex<Connection>,
}

impl RelationalBackend {
    /// Opens (creating if needed) the database file and applies the schema.
    pub fn open(path: &Path) -> ClinicResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> ClinicResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> ClinicResult<Self> {
        conn.busy_timeout(Duration::from_millis(DATABASE_BUSY_TIMEOUT_MS))?;
        // Writers append to the WAL instead of fsyncing a rollback journal on every commit.
        // In-memory databases report "memory" and keep their own journal.
        let journal_mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        tracing::debug!(%journal_mode, "relational backend opened");
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> ClinicResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| ClinicError::LockPoisoned)
    }
}

// ============================================================================
// COLUMN CONVERSIONS
// ============================================================================

fn ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(raw: &str) -> ClinicResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| ClinicError::InvalidTimestamp(format!("{raw}: {e}")))
}

fn parse_opt_ts(raw: Option<String>) -> ClinicResult<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_ts).transpose()
}

fn parse_id(raw: &str) -> ClinicResult<RecordId> {
    Ok(RecordId::parse(raw)?)
}

fn to_sql_int(value: u64) -> ClinicResult<i64> {
    i64::try_from(value)
        .map_err(|_| ClinicError::InvalidInput(format!("value {value} is too large to store")))
}

fn from_sql_int(value: i64) -> ClinicResult<u64> {
    u64::try_from(value)
        .map_err(|_| ClinicError::Deserialization(format!("negative stored value {value}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> ClinicResult<String> {
    serde_json::to_string(value).map_err(ClinicError::Serialization)
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> ClinicResult<T> {
    serde_json::from_str(raw).map_err(|e| ClinicError::Deserialization(e.to_string()))
}

fn ensure_changed(changed: usize, kind: &'static str, id: &RecordId) -> ClinicResult<()> {
    if changed == 0 {
        return Err(ClinicError::not_found(kind, id));
    }
    Ok(())
}

// ============================================================================
// ROW TYPES
// ============================================================================

const PATIENT_COLUMNS: &str =
    "id, full_name, date_of_birth, contact_number, reason_for_visit, created_at";

struct PatientRow {
    id: String,
    full_name: String,
    date_of_birth: String,
    contact_number: String,
    reason_for_visit: String,
    created_at: String,
}

fn read_patient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        full_name: row.get(1)?,
        date_of_birth: row.get(2)?,
        contact_number: row.get(3)?,
        reason_for_visit: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn patient_from_row(row: PatientRow) -> ClinicResult<Patient> {
    Ok(Patient {
        id: parse_id(&row.id)?,
        full_name: row.full_name,
        date_of_birth: row.date_of_birth,
        contact_number: row.contact_number,
        reason_for_visit: row.reason_for_visit,
        created_at: parse_ts(&row.created_at)?,
    })
}

const QUEUE_COLUMNS: &str = "id, patient_id, queue_number, status, estimated_wait_time, \
     created_at, called_at, completed_at";

struct QueueRow {
    id: String,
    patient_id: Option<String>,
    queue_number: i64,
    status: String,
    estimated_wait_time: Option<i64>,
    created_at: String,
    called_at: Option<String>,
    completed_at: Option<String>,
}

fn read_queue_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueRow> {
    Ok(QueueRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        queue_number: row.get(2)?,
        status: row.get(3)?,
        estimated_wait_time: row.get(4)?,
        created_at: row.get(5)?,
        called_at: row.get(6)?,
        completed_at: row.get(7)?,
    })
}

fn queue_entry_from_row(row: QueueRow) -> ClinicResult<QueueEntry> {
    let patient_id = row.patient_id.ok_or_else(|| {
        ClinicError::Deserialization(format!("queue entry {} has no patient_id", row.id))
    })?;
    Ok(QueueEntry {
        id: parse_id(&row.id)?,
        patient_id: parse_id(&patient_id)?,
        queue_number: from_sql_int(row.queue_number)?,
        status: row.status.parse()?,
        estimated_wait_time: from_sql_int(row.estimated_wait_time.unwrap_or(0))?,
        created_at: parse_ts(&row.created_at)?,
        called_at: parse_opt_ts(row.called_at)?,
        completed_at: parse_opt_ts(row.completed_at)?,
    })
}

const PRESCRIPTION_COLUMNS: &str = "id, patient_id, diagnosis, doctor_notes, \
     prescribed_medicines, status, created_at, updated_at";

struct PrescriptionRow {
    id: String,
    patient_id: String,
    diagnosis: String,
    doctor_notes: Option<String>,
    prescribed_medicines: String,
    status: String,
    created_at: String,
    updated_at: String,
}

fn read_prescription_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PrescriptionRow> {
    Ok(PrescriptionRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        diagnosis: row.get(2)?,
        doctor_notes: row.get(3)?,
        prescribed_medicines: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn prescription_from_row(row: PrescriptionRow) -> ClinicResult<Prescription> {
    Ok(Prescription {
        id: parse_id(&row.id)?,
        patient_id: parse_id(&row.patient_id)?,
        diagnosis: row.diagnosis,
        doctor_notes: row.doctor_notes,
        medicines: from_json::<Vec<PrescribedMedicine>>(&row.prescribed_medicines)?,
        status: row.status.parse()?,
        created_at: parse_ts(&row.created_at)?,
        updated_at: parse_ts(&row.updated_at)?,
    })
}

const MEDICINE_COLUMNS: &str = "id, name, category, price, in_stock, stock, description";

struct MedicineRow {
    id: String,
    name: String,
    category: String,
    price: i64,
    in_stock: bool,
    stock: u32,
    description: Option<String>,
}

fn read_medicine_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MedicineRow> {
    Ok(MedicineRow {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        price: row.get(3)?,
        in_stock: row.get(4)?,
        stock: row.get(5)?,
        description: row.get(6)?,
    })
}

fn medicine_from_row(row: MedicineRow) -> ClinicResult<Medicine> {
    Ok(Medicine {
        id: parse_id(&row.id)?,
        name: row.name,
        category: row.category,
        price: from_sql_int(row.price)?,
        in_stock: row.in_stock,
        stock: row.stock,
        description: row.description,
    })
}

const ORDER_COLUMNS: &str = "id, order_number, items, total, status, created_at, collected_at";

struct OrderRow {
    id: String,
    order_number: i64,
    items: String,
    total: i64,
    status: String,
    created_at: String,
    collected_at: Option<String>,
}

fn read_order_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OrderRow> {
    Ok(OrderRow {
        id: row.get(0)?,
        order_number: row.get(1)?,
        items: row.get(2)?,
        total: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
        collected_at: row.get(6)?,
    })
}

fn order_from_row(row: OrderRow) -> ClinicResult<MedicineOrder> {
    Ok(MedicineOrder {
        id: parse_id(&row.id)?,
        order_number: from_sql_int(row.order_number)?,
        items: from_json::<Vec<OrderLine>>(&row.items)?,
        total: from_sql_int(row.total)?,
        status: row.status.parse()?,
        created_at: parse_ts(&row.created_at)?,
        collected_at: parse_opt_ts(row.collected_at)?,
    })
}

// ============================================================================
// STORE IMPLEMENTATIONS
// ============================================================================

impl SequenceIssuer for RelationalBackend {
    fn issue_sequence_number(&self, counter: SequenceCounter) -> ClinicResult<u64> {
        let unavailable = |e: rusqlite::Error| ClinicError::SequenceUnavailable {
            counter: counter.name(),
            reason: e.to_string(),
        };

        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(unavailable)?;
        let value: i64 = tx
            .query_row(NEXT_SEQUENCE_SQL, params![counter.name()], |row| row.get(0))
            .map_err(unavailable)?;
        tx.commit().map_err(unavailable)?;

        from_sql_int(value)
    }
}

impl PatientStore for RelationalBackend {
    fn insert_patient(&self, patient: &Patient) -> ClinicResult<()> {
        self.conn()?.execute(
            "INSERT INTO patients (id, full_name, date_of_birth, contact_number, reason_for_visit, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                patient.id.to_string(),
                patient.full_name,
                patient.date_of_birth,
                patient.contact_number,
                patient.reason_for_visit,
                ts(&patient.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_patient(&self, id: &RecordId) -> ClinicResult<Patient> {
        let row = self
            .conn()?
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
                params![id.to_string()],
                read_patient_row,
            )
            .optional()?;
        match row {
            Some(row) => patient_from_row(row),
            None => Err(ClinicError::not_found("patient", id)),
        }
    }

    fn list_patients(&self) -> ClinicResult<Vec<Patient>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY created_at ASC"
        ))?;
        let rows = stmt
            .query_map([], read_patient_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(patient_from_row).collect()
    }
}

impl RelationalBackend {
    fn query_queue(&self, sql: &str) -> ClinicResult<Vec<QueueEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], read_queue_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(queue_entry_from_row).collect()
    }
}

impl QueueStore for RelationalBackend {
    fn insert_queue_entry(&self, entry: &QueueEntry) -> ClinicResult<()> {
        self.conn()?.execute(
            "INSERT INTO queue_entries (id, patient_id, queue_number, status, estimated_wait_time,
             created_at, called_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.id.to_string(),
                entry.patient_id.to_string(),
                to_sql_int(entry.queue_number)?,
                entry.status.as_str(),
                to_sql_int(entry.estimated_wait_time)?,
                ts(&entry.created_at),
                entry.called_at.as_ref().map(ts),
                entry.completed_at.as_ref().map(ts),
            ],
        )?;
        Ok(())
    }

    fn get_queue_entry(&self, id: &RecordId) -> ClinicResult<QueueEntry> {
        let row = self
            .conn()?
            .query_row(
                &format!("SELECT {QUEUE_COLUMNS} FROM queue_entries WHERE id = ?1"),
                params![id.to_string()],
                read_queue_row,
            )
            .optional()?;
        match row {
            Some(row) => queue_entry_from_row(row),
            None => Err(ClinicError::not_found("queue entry", id)),
        }
    }

    fn list_queue_entries(&self) -> ClinicResult<Vec<QueueEntry>> {
        self.query_queue(&format!(
            "SELECT {QUEUE_COLUMNS} FROM queue_entries ORDER BY queue_number ASC"
        ))
    }

    fn list_active_queue(&self) -> ClinicResult<Vec<QueueEntry>> {
        self.query_queue(&format!(
            "SELECT {QUEUE_COLUMNS} FROM queue_entries
             WHERE status IN ('waiting', 'being_examined')
             ORDER BY queue_number ASC"
        ))
    }

    fn set_queue_status(
        &self,
        id: &RecordId,
        status: QueueStatus,
        at: DateTime<Utc>,
    ) -> ClinicResult<()> {
        let (called_at, completed_at) = match status {
            QueueStatus::Waiting => (None, None),
            QueueStatus::BeingExamined => (Some(ts(&at)), None),
            QueueStatus::Done => (None, Some(ts(&at))),
        };
        let changed = self.conn()?.execute(
            "UPDATE queue_entries
             SET status = ?2,
                 called_at = COALESCE(?3, called_at),
                 completed_at = COALESCE(?4, completed_at)
             WHERE id = ?1",
            params![id.to_string(), status.as_str(), called_at, completed_at],
        )?;
        ensure_changed(changed, "queue entry", id)
    }

    fn set_queue_number(
        &self,
        id: &RecordId,
        queue_number: u64,
        estimated_wait_time: u64,
    ) -> ClinicResult<()> {
        let changed = self.conn()?.execute(
            "UPDATE queue_entries SET queue_number = ?2, estimated_wait_time = ?3 WHERE id = ?1",
            params![
                id.to_string(),
                to_sql_int(queue_number)?,
                to_sql_int(estimated_wait_time)?
            ],
        )?;
        ensure_changed(changed, "queue entry", id)
    }

    fn remove_queue_entry(&self, id: &RecordId) -> ClinicResult<bool> {
        let changed = self.conn()?.execute(
            "DELETE FROM queue_entries WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(changed > 0)
    }
}

impl RelationalBackend {
    fn query_prescriptions(
        &self,
        sql: &str,
        status: Option<PrescriptionStatus>,
    ) -> ClinicResult<Vec<Prescription>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = match status {
            Some(status) => stmt
                .query_map(params![status.as_str()], read_prescription_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt
                .query_map([], read_prescription_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        rows.into_iter().map(prescription_from_row).collect()
    }
}

impl PrescriptionStore for RelationalBackend {
    fn insert_prescription(&self, prescription: &Prescription) -> ClinicResult<()> {
        let medicines = to_json(&prescription.medicines)?;
        self.conn()?.execute(
            "INSERT INTO prescriptions (id, patient_id, diagnosis, doctor_notes,
             prescribed_medicines, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                prescription.id.to_string(),
                prescription.patient_id.to_string(),
                prescription.diagnosis,
                prescription.doctor_notes,
                medicines,
                prescription.status.as_str(),
                ts(&prescription.created_at),
                ts(&prescription.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_prescription(&self, id: &RecordId) -> ClinicResult<Prescription> {
        let row = self
            .conn()?
            .query_row(
                &format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = ?1"),
                params![id.to_string()],
                read_prescription_row,
            )
            .optional()?;
        match row {
            Some(row) => prescription_from_row(row),
            None => Err(ClinicError::not_found("prescription", id)),
        }
    }

    fn list_prescriptions(&self) -> ClinicResult<Vec<Prescription>> {
        self.query_prescriptions(
            &format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions ORDER BY created_at DESC"),
            None,
        )
    }

    fn list_prescriptions_by_status(
        &self,
        status: PrescriptionStatus,
    ) -> ClinicResult<Vec<Prescription>> {
        self.query_prescriptions(
            &format!(
                "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions
                 WHERE status = ?1 ORDER BY created_at DESC"
            ),
            Some(status),
        )
    }

    fn set_prescription_status(
        &self,
        id: &RecordId,
        status: PrescriptionStatus,
        at: DateTime<Utc>,
    ) -> ClinicResult<()> {
        let changed = self.conn()?.execute(
            "UPDATE prescriptions SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id.to_string(), status.as_str(), ts(&at)],
        )?;
        ensure_changed(changed, "prescription", id)
    }
}

impl MedicineCatalog for RelationalBackend {
    fn upsert_medicine(&self, medicine: &Medicine) -> ClinicResult<()> {
        self.conn()?.execute(
            "INSERT INTO medicines (id, name, category, price, in_stock, stock, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                price = excluded.price,
                in_stock = excluded.in_stock,
                stock = excluded.stock,
                description = excluded.description",
            params![
                medicine.id.to_string(),
                medicine.name,
                medicine.category,
                to_sql_int(medicine.price)?,
                medicine.in_stock,
                medicine.stock,
                medicine.description,
            ],
        )?;
        Ok(())
    }

    fn get_medicine(&self, id: &RecordId) -> ClinicResult<Medicine> {
        let row = self
            .conn()?
            .query_row(
                &format!("SELECT {MEDICINE_COLUMNS} FROM medicines WHERE id = ?1"),
                params![id.to_string()],
                read_medicine_row,
            )
            .optional()?;
        match row {
            Some(row) => medicine_from_row(row),
            None => Err(ClinicError::not_found("medicine", id)),
        }
    }

    fn list_medicines(&self) -> ClinicResult<Vec<Medicine>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines ORDER BY name ASC"
        ))?;
        let rows = stmt
            .query_map([], read_medicine_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(medicine_from_row).collect()
    }
}

impl MedicineOrderStore for RelationalBackend {
    fn insert_order(&self, order: &MedicineOrder) -> ClinicResult<()> {
        let items = to_json(&order.items)?;
        self.conn()?.execute(
            "INSERT INTO medicine_orders (id, order_number, items, total, status, created_at, collected_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                order.id.to_string(),
                to_sql_int(order.order_number)?,
                items,
                to_sql_int(order.total)?,
                order.status.as_str(),
                ts(&order.created_at),
                order.collected_at.as_ref().map(ts),
            ],
        )?;
        Ok(())
    }

    fn get_order(&self, id: &RecordId) -> ClinicResult<MedicineOrder> {
        let row = self
            .conn()?
            .query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM medicine_orders WHERE id = ?1"),
                params![id.to_string()],
                read_order_row,
            )
            .optional()?;
        match row {
            Some(row) => order_from_row(row),
            None => Err(ClinicError::not_found("medicine order", id)),
        }
    }

    fn list_orders(&self) -> ClinicResult<Vec<MedicineOrder>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ORDER_COLUMNS} FROM medicine_orders ORDER BY order_number ASC"
        ))?;
        let rows = stmt
            .query_map([], read_order_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(order_from_row).collect()
    }

    fn set_order_status(
        &self,
        id: &RecordId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> ClinicResult<()> {
        let collected_at = match status {
            OrderStatus::Collected => Some(ts(&at)),
            OrderStatus::Pending => None,
        };
        let changed = self.conn()?.execute(
            "UPDATE medicine_orders SET status = ?2, collected_at = COALESCE(?3, collected_at)
             WHERE id = ?1",
            params![id.to_string(), status.as_str(), collected_at],
        )?;
        ensure_changed(changed, "medicine order", id)
    }
}

impl LoginAuditLog for RelationalBackend {
    fn append_login_attempt(&self, attempt: &LoginAttempt) -> ClinicResult<()> {
        self.conn()?.execute(
            "INSERT INTO admin_logins (id, username, login_time, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                attempt.id.to_string(),
                attempt.username,
                ts(&attempt.login_time),
                attempt.outcome.as_str(),
            ],
        )?;
        Ok(())
    }

    fn list_login_attempts(&self) -> ClinicResult<Vec<LoginAttempt>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, login_time, status FROM admin_logins ORDER BY login_time ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, username, login_time, status)| {
                Ok(LoginAttempt {
                    id: parse_id(&id)?,
                    username,
                    login_time: parse_ts(&login_time)?,
                    outcome: status.parse::<LoginOutcome>()?,
                })
            })
            .collect()
    }
}

impl ChangeFeed for RelationalBackend {
    fn subscribe_changes(&self) -> Option<broadcast::Receiver<StoreChange>> {
        None
    }
}

impl ClinicBackend for RelationalBackend {
    fn backend_name(&self) -> &'static str {
        "relational"
    }
}
