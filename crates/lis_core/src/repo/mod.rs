//! Store layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define transaction-scoped data access contracts for patients and orders.
//! - Isolate SQL details from service orchestration.
//! - Translate SQLite failures into semantic errors with operation context.
//!
//! # Invariants
//! - Stores never begin, commit or roll back transactions; callers pass one in.
//! - Write paths validate entities before SQL mutations.
//! - Semantic errors (`NotFound`, `DuplicateKey`, `ConstraintViolation`) always
//!   carry the entity and key they refer to.

use crate::db::DbError;
use crate::model::patient::PatientValidationError;
use crate::model::work_order::WorkOrderValidationError;
use rusqlite::{ffi, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod patient_repo;
pub mod work_order_repo;

pub(crate) const PATIENT_ENTITY: &str = "patient";
pub(crate) const WORK_ORDER_ENTITY: &str = "work_order";

pub type RepoResult<T> = Result<T, RepoError>;

/// Transport-neutral classification shared by store and service errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    DuplicateKey,
    ConstraintViolation,
    TransactionFailure,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::NotFound => "not_found",
            Self::DuplicateKey => "duplicate_key",
            Self::ConstraintViolation => "constraint_violation",
            Self::TransactionFailure => "transaction_failure",
            Self::Internal => "internal",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store-level error for patient and work order persistence.
#[derive(Debug)]
pub enum RepoError {
    InvalidPatient(PatientValidationError),
    InvalidWorkOrder(WorkOrderValidationError),
    NotFound {
        entity: &'static str,
        key: String,
    },
    DuplicateKey {
        entity: &'static str,
        key: String,
    },
    ConstraintViolation {
        entity: &'static str,
        key: String,
        detail: String,
    },
    /// Low-level storage failure with the operation and key it happened on.
    Db {
        op: &'static str,
        key: String,
        source: DbError,
    },
    InvalidData(String),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPatient(_) | Self::InvalidWorkOrder(_) => ErrorKind::InvalidRequest,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            Self::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            Self::Db { .. } | Self::InvalidData(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_found(entity: &'static str, key: &str) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPatient(err) => write!(f, "{err}"),
            Self::InvalidWorkOrder(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::DuplicateKey { entity, key } => write!(f, "{entity} already exists: {key}"),
            Self::ConstraintViolation {
                entity,
                key,
                detail,
            } => write!(f, "{entity} `{key}` violates a constraint: {detail}"),
            Self::Db { op, key, source } => write!(f, "{op} failed for `{key}`: {source}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidPatient(err) => Some(err),
            Self::InvalidWorkOrder(err) => Some(err),
            Self::Db { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<PatientValidationError> for RepoError {
    fn from(value: PatientValidationError) -> Self {
        Self::InvalidPatient(value)
    }
}

impl From<WorkOrderValidationError> for RepoError {
    fn from(value: WorkOrderValidationError) -> Self {
        Self::InvalidWorkOrder(value)
    }
}

/// Attaches operation context to raw SQLite results.
pub(crate) trait SqlContext<T> {
    fn context(self, op: &'static str, entity: &'static str, key: &str) -> RepoResult<T>;
}

impl<T> SqlContext<T> for Result<T, rusqlite::Error> {
    fn context(self, op: &'static str, entity: &'static str, key: &str) -> RepoResult<T> {
        self.map_err(|err| classify_sqlite_error(op, entity, key, err))
    }
}

fn classify_sqlite_error(
    op: &'static str,
    entity: &'static str,
    key: &str,
    err: rusqlite::Error,
) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            return match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                    RepoError::DuplicateKey {
                        entity,
                        key: key.to_string(),
                    }
                }
                _ => RepoError::ConstraintViolation {
                    entity,
                    key: key.to_string(),
                    detail: message.clone().unwrap_or_else(|| failure.to_string()),
                },
            };
        }
    }

    RepoError::Db {
        op,
        key: key.to_string(),
        source: DbError::Sqlite(err),
    }
}

/// Escapes `LIKE` wildcards so the needle matches literally with `ESCAPE '\'`.
pub(crate) fn like_contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
