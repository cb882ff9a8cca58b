//! Constants used throughout the Klinik core crate.
//!
//! Defaults, counter names and storage node names live here so both backends and the
//! binaries agree on them.

/// Minutes of estimated waiting time per queue slot.
pub const DEFAULT_MINUTES_PER_SLOT: u32 = 15;

/// Polling interval used for view refresh when the backend cannot push change notifications.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Default SQLite database file for the relational backend.
pub const DEFAULT_DATABASE_PATH: &str = "klinik.db";

/// Default snapshot directory for the tree backend.
pub const DEFAULT_DATA_DIR: &str = "clinic_data";

/// Literal admin credentials accepted when none are configured.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

/// Username recorded in the login audit log when the attempt carried none.
pub const UNKNOWN_USERNAME: &str = "unknown";

/// Placeholder shown when a record references a patient that cannot be found.
pub const UNKNOWN_PATIENT_NAME: &str = "Unknown patient";

/// Counter names for the sequence issuer.
pub const QUEUE_NUMBER_COUNTER: &str = "queue_number";
pub const ORDER_NUMBER_COUNTER: &str = "order_number";

/// Top-level node names of the tree backend (also the relational table names).
pub const PATIENTS_NODE: &str = "patients";
pub const QUEUE_NODE: &str = "queue_entries";
pub const PRESCRIPTIONS_NODE: &str = "prescriptions";
pub const MEDICINES_NODE: &str = "medicines";
pub const ORDERS_NODE: &str = "medicine_orders";
pub const LOGINS_NODE: &str = "admin_logins";
pub const COUNTERS_NODE: &str = "counters";

/// Buffered change notifications per subscriber before it starts lagging.
pub const CHANGE_FEED_CAPACITY: usize = 1024;

/// SQLite busy timeout before a locked counter increment is reported as unavailable.
pub const DATABASE_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Filename for client-local view preferences.
pub const VIEW_PREFS_FILENAME: &str = "view_prefs.yaml";
