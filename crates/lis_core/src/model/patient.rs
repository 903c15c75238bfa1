//! Patient domain model.
//!
//! # Responsibility
//! - Define the canonical patient record persisted in `patients`.
//! - Validate patient fields before any write.
//!
//! # Invariants
//! - `id` is assigned once at creation and never reused for another patient.
//! - `created_at` / `updated_at` are owned by storage, never by callers.
//! - `birth_date` has day granularity.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email regex"));

/// Opaque patient identifier (UUID v4 text for generated ids).
pub type PatientId = String;

/// Biological sex as recorded on the lab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    /// Parses storage representation; `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }
}

impl Display for Sex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical patient record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub sex: Sex,
    pub address: String,
    pub phone: String,
    pub email: String,
    /// Epoch milliseconds, assigned by storage.
    pub created_at: i64,
    /// Epoch milliseconds, bumped by storage on every update.
    pub updated_at: i64,
}

impl Patient {
    /// Creates a patient with empty contact fields and unset timestamps.
    pub fn new(
        id: impl Into<PatientId>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        birth_date: NaiveDate,
        sex: Sex,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            birth_date,
            sex,
            address: String::new(),
            phone: String::new(),
            email: String::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Validates write-side invariants.
    pub fn validate(&self) -> Result<(), PatientValidationError> {
        if self.id.trim().is_empty() {
            return Err(PatientValidationError::BlankId);
        }
        if !self.email.is_empty() && !EMAIL_RE.is_match(&self.email) {
            return Err(PatientValidationError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }
}

/// Patient write-side validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatientValidationError {
    BlankId,
    InvalidEmail(String),
}

impl Display for PatientValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankId => write!(f, "patient id must not be blank"),
            Self::InvalidEmail(value) => write!(f, "invalid patient email `{value}`"),
        }
    }
}

impl Error for PatientValidationError {}
