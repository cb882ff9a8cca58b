//! Admin login audit records.

use crate::constants::UNKNOWN_USERNAME;
use crate::ClinicError;
use chrono::{DateTime, Utc};
use klinik_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginOutcome {
    Success,
    Failed,
}

impl LoginOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for LoginOutcome {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(ClinicError::InvalidInput(format!(
                "unknown login outcome '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttempt {
    pub id: RecordId,
    pub username: String,
    pub login_time: DateTime<Utc>,
    pub outcome: LoginOutcome,
}

impl LoginAttempt {
    pub fn record(username: &str, outcome: LoginOutcome, login_time: DateTime<Utc>) -> Self {
        let username = username.trim();
        Self {
            id: klinik_uuid::issue_identifier(),
            username: if username.is_empty() {
                UNKNOWN_USERNAME.to_string()
            } else {
                username.to_string()
            },
            login_time,
            outcome,
        }
    }
}
