//! Patient use-case service.
//!
//! # Responsibility
//! - Provide transactional CRUD and search entry points for patients.
//! - Generate patient identifiers and map requests/responses.
//!
//! # Invariants
//! - One transaction per call; writes read the row back before commit so
//!   responses carry storage-assigned timestamps.
//! - Blank search queries are rejected before storage is touched; other
//!   queries reach the store unmodified.

use crate::db::Database;
use crate::repo::patient_repo::{PatientRepository, SqlitePatientRepository};
use crate::service::dto::{PatientRequest, PatientResponse};
use crate::service::{require_key, run_in_transaction, ServiceError, ServiceResult, TxMode};
use uuid::Uuid;

/// Transactional patient service.
pub struct PatientService<R: PatientRepository = SqlitePatientRepository> {
    db: Database,
    repo: R,
}

impl PatientService<SqlitePatientRepository> {
    /// Creates a service backed by the SQLite patient store.
    pub fn new(db: Database) -> Self {
        Self::with_repository(db, SqlitePatientRepository::new())
    }
}

impl<R: PatientRepository> PatientService<R> {
    /// Creates a service using the provided store implementation.
    pub fn with_repository(db: Database, repo: R) -> Self {
        Self { db, repo }
    }

    /// Registers a new patient under a freshly generated identifier.
    pub fn create(&self, request: &PatientRequest) -> ServiceResult<PatientResponse> {
        let patient = request.to_entity(Uuid::new_v4().to_string());

        run_in_transaction(&self.db, TxMode::ReadWrite, "patient_create", |tx| {
            self.repo.create(tx, &patient)?;
            let stored = self.repo.get_by_id(tx, &patient.id)?;
            Ok(stored.into())
        })
    }

    pub fn get_by_id(&self, id: &str) -> ServiceResult<PatientResponse> {
        require_key("patient id", id)?;
        run_in_transaction(&self.db, TxMode::ReadOnly, "patient_get", |tx| {
            Ok(self.repo.get_by_id(tx, id)?.into())
        })
    }

    /// Overwrites the mutable fields of an existing patient.
    pub fn update(&self, id: &str, request: &PatientRequest) -> ServiceResult<PatientResponse> {
        require_key("patient id", id)?;
        run_in_transaction(&self.db, TxMode::ReadWrite, "patient_update", |tx| {
            let mut patient = self.repo.get_by_id(tx, id)?;
            request.apply_to(&mut patient);
            self.repo.update(tx, &patient)?;
            Ok(self.repo.get_by_id(tx, id)?.into())
        })
    }

    pub fn delete(&self, id: &str) -> ServiceResult<()> {
        require_key("patient id", id)?;
        run_in_transaction(&self.db, TxMode::ReadWrite, "patient_delete", |tx| {
            self.repo.delete(tx, id)?;
            Ok(())
        })
    }

    /// Lists all patients ordered by first and last name.
    pub fn get_all(&self) -> ServiceResult<Vec<PatientResponse>> {
        run_in_transaction(&self.db, TxMode::ReadOnly, "patient_list", |tx| {
            let patients = self.repo.get_all(tx)?;
            Ok(patients.into_iter().map(PatientResponse::from).collect())
        })
    }

    /// Case-insensitive substring search over names, phone and email.
    ///
    /// Only the blank check trims; the query is matched as given.
    pub fn search(&self, query: &str) -> ServiceResult<Vec<PatientResponse>> {
        if query.trim().is_empty() {
            return Err(ServiceError::InvalidRequest(
                "search query must not be empty".to_string(),
            ));
        }

        run_in_transaction(&self.db, TxMode::ReadOnly, "patient_search", |tx| {
            let patients = self.repo.search(tx, query)?;
            Ok(patients.into_iter().map(PatientResponse::from).collect())
        })
    }
}
