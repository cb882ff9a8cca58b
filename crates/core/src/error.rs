use klinik_types::TextError;
use klinik_uuid::{RecordId, UuidError};

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    Validation(#[from] TextError),
    #[error("invalid identifier: {0}")]
    Uuid(#[from] UuidError),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("medicine order must contain at least one item")]
    EmptyCart,
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("sequence number unavailable for counter '{counter}': {reason}")]
    SequenceUnavailable {
        counter: &'static str,
        reason: String,
    },
    #[error(
        "patient {patient_id} was saved but the queue entry could not be created: {source}"
    )]
    PartialRegistration {
        patient_id: RecordId,
        #[source]
        source: Box<ClinicError>,
    },
    #[error("queue reorder stopped after renumbering {renumbered} of {total} entries: {source}")]
    PartialReorder {
        renumbered: usize,
        total: usize,
        #[source]
        source: Box<ClinicError>,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(String),
    #[error("invalid stored timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("failed to read store file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write store file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl ClinicError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// True for errors caused by the caller's input, where no write was attempted.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::Validation(_) | Self::Uuid(_) | Self::EmptyCart
        )
    }
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;
