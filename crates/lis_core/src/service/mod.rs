//! Transactional use-case services.
//!
//! # Responsibility
//! - Run each use case inside exactly one transaction on one acquired connection.
//! - Orchestrate store calls, identifier generation and response assembly.
//! - Keep transport layers decoupled from storage details.
//!
//! # Invariants
//! - Reads use a read-only deferred transaction; writes use an immediate one.
//! - Any error rolls back and is returned unchanged; commit failures surface
//!   as `TransactionFailure`.
//! - No connection or transaction outlives a single service call.

use crate::db::{Database, DbError};
use crate::repo::{ErrorKind, RepoError};
use log::{debug, error, info, warn};
use rusqlite::{Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub mod dto;
pub mod patient_service;
pub mod work_order_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Transaction lifecycle step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStage {
    Begin,
    Commit,
}

impl Display for TxStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Begin => f.write_str("begin"),
            Self::Commit => f.write_str("commit"),
        }
    }
}

/// Service-level error for patient and work order use cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Request rejected before touching storage.
    InvalidRequest(String),
    /// Store failure, preserved as the original cause.
    Repo(RepoError),
    /// A work order references a patient that cannot be resolved.
    ConstraintViolation(String),
    /// Connection, begin or commit failed.
    Transaction { stage: TxStage, source: DbError },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Repo(err) => err.kind(),
            Self::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            Self::Transaction { .. } => ErrorKind::TransactionFailure,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest(message) => write!(f, "invalid request: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::ConstraintViolation(message) => write!(f, "constraint violation: {message}"),
            Self::Transaction { stage, source } => {
                write!(f, "failed to {stage} transaction: {source}")
            }
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Transaction { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TxMode {
    ReadOnly,
    ReadWrite,
}

impl TxMode {
    fn behavior(self) -> TransactionBehavior {
        match self {
            Self::ReadOnly => TransactionBehavior::Deferred,
            Self::ReadWrite => TransactionBehavior::Immediate,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read_only",
            Self::ReadWrite => "read_write",
        }
    }
}

/// Runs `op` inside one transaction on a freshly acquired connection.
///
/// Commits when `op` succeeds. Rolls back and returns the original error
/// otherwise; a failed rollback is logged but never replaces that error.
pub(crate) fn run_in_transaction<T>(
    db: &Database,
    mode: TxMode,
    event: &'static str,
    op: impl FnOnce(&Transaction<'_>) -> ServiceResult<T>,
) -> ServiceResult<T> {
    let started_at = Instant::now();
    let begin_failed = |source: DbError| {
        error!(
            "event={} module=service status=error stage=begin mode={} error={}",
            event,
            mode.as_str(),
            source
        );
        ServiceError::Transaction {
            stage: TxStage::Begin,
            source,
        }
    };

    let mut conn = db.connect().map_err(begin_failed)?;
    if mode == TxMode::ReadOnly {
        conn.pragma_update(None, "query_only", true)
            .map_err(|err| begin_failed(err.into()))?;
    }
    let tx = conn
        .transaction_with_behavior(mode.behavior())
        .map_err(|err| begin_failed(err.into()))?;
    debug!(
        "event={} module=service status=start mode={}",
        event,
        mode.as_str()
    );

    match op(&tx) {
        Ok(value) => {
            tx.commit().map_err(|err| {
                error!(
                    "event={} module=service status=error stage=commit duration_ms={} error={}",
                    event,
                    started_at.elapsed().as_millis(),
                    err
                );
                ServiceError::Transaction {
                    stage: TxStage::Commit,
                    source: err.into(),
                }
            })?;
            info!(
                "event={} module=service status=ok mode={} duration_ms={}",
                event,
                mode.as_str(),
                started_at.elapsed().as_millis()
            );
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                warn!(
                    "event={} module=service status=rollback_failed error={}",
                    event, rollback_err
                );
            }
            warn!(
                "event={} module=service status=rollback mode={} duration_ms={} error_kind={}",
                event,
                mode.as_str(),
                started_at.elapsed().as_millis(),
                err.kind()
            );
            Err(err)
        }
    }
}

/// Rejects blank lookup keys before a transaction is opened.
pub(crate) fn require_key(field: &str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::InvalidRequest(format!(
            "{field} must not be blank"
        )));
    }
    Ok(())
}
