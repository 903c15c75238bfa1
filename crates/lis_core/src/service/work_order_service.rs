//! Work order use-case service.
//!
//! # Responsibility
//! - Create, read, update and delete work orders together with their patient.
//! - Compose work order responses with the referenced patient in one snapshot.
//!
//! # Invariants
//! - Creating an order from a `WorkOrderRequest` always creates exactly one new
//!   patient in the same transaction.
//! - Single-order reads resolve the patient strictly: a dangling reference is
//!   a `ConstraintViolation` and fails the call.
//! - List reads resolve patients best-effort: a dangling reference yields a
//!   response without patient and a warning log line.

use crate::db::Database;
use crate::model::patient::Patient;
use crate::model::work_order::WorkOrder;
use crate::repo::patient_repo::{PatientRepository, SqlitePatientRepository};
use crate::repo::work_order_repo::{SqliteWorkOrderRepository, WorkOrderRepository};
use crate::repo::RepoError;
use crate::service::dto::{AttachWorkOrderRequest, WorkOrderRequest, WorkOrderResponse};
use crate::service::{require_key, run_in_transaction, ServiceError, ServiceResult, TxMode};
use log::warn;
use rusqlite::Transaction;
use uuid::Uuid;

/// Transactional work order service.
pub struct WorkOrderService<
    W: WorkOrderRepository = SqliteWorkOrderRepository,
    P: PatientRepository = SqlitePatientRepository,
> {
    db: Database,
    work_orders: W,
    patients: P,
}

impl WorkOrderService<SqliteWorkOrderRepository, SqlitePatientRepository> {
    /// Creates a service backed by the SQLite stores.
    pub fn new(db: Database) -> Self {
        Self::with_repositories(
            db,
            SqliteWorkOrderRepository::new(),
            SqlitePatientRepository::new(),
        )
    }
}

impl<W: WorkOrderRepository, P: PatientRepository> WorkOrderService<W, P> {
    /// Creates a service using the provided store implementations.
    pub fn with_repositories(db: Database, work_orders: W, patients: P) -> Self {
        Self {
            db,
            work_orders,
            patients,
        }
    }

    /// Creates the embedded patient and the order referencing it atomically.
    pub fn create(&self, request: &WorkOrderRequest) -> ServiceResult<WorkOrderResponse> {
        require_key("order number", &request.no_order)?;
        let patient = request.patient.to_entity(Uuid::new_v4().to_string());
        let work_order = request.to_entity(patient.id.clone());

        run_in_transaction(&self.db, TxMode::ReadWrite, "work_order_create", |tx| {
            self.patients.create(tx, &patient)?;
            self.work_orders.create(tx, &work_order)?;
            self.read_composed_strict(tx, &work_order.no_order)
        })
    }

    /// Creates an order that references an already registered patient.
    pub fn create_for_existing_patient(
        &self,
        request: &AttachWorkOrderRequest,
    ) -> ServiceResult<WorkOrderResponse> {
        require_key("order number", &request.no_order)?;
        require_key("patient id", &request.patient_id)?;
        let work_order = request.to_entity();

        run_in_transaction(&self.db, TxMode::ReadWrite, "work_order_attach", |tx| {
            self.resolve_patient_strict(tx, &work_order)?;
            self.work_orders.create(tx, &work_order)?;
            self.read_composed_strict(tx, &work_order.no_order)
        })
    }

    pub fn get_by_no_order(&self, no_order: &str) -> ServiceResult<WorkOrderResponse> {
        require_key("order number", no_order)?;
        run_in_transaction(&self.db, TxMode::ReadOnly, "work_order_get", |tx| {
            self.read_composed_strict(tx, no_order)
        })
    }

    /// Rewrites the patient's mutable fields, then the order and its test codes.
    pub fn update(
        &self,
        no_order: &str,
        request: &WorkOrderRequest,
    ) -> ServiceResult<WorkOrderResponse> {
        require_key("order number", no_order)?;
        run_in_transaction(&self.db, TxMode::ReadWrite, "work_order_update", |tx| {
            let mut work_order = self.work_orders.get_by_no_order(tx, no_order)?;
            let mut patient = self.resolve_patient_strict(tx, &work_order)?;

            request.patient.apply_to(&mut patient);
            self.patients.update(tx, &patient)?;

            request.apply_to(&mut work_order);
            self.work_orders.update(tx, &work_order)?;

            self.read_composed_strict(tx, no_order)
        })
    }

    /// Deletes the order and its test codes. The patient is kept.
    pub fn delete(&self, no_order: &str) -> ServiceResult<()> {
        require_key("order number", no_order)?;
        run_in_transaction(&self.db, TxMode::ReadWrite, "work_order_delete", |tx| {
            self.work_orders.delete(tx, no_order)?;
            Ok(())
        })
    }

    pub fn get_all(&self) -> ServiceResult<Vec<WorkOrderResponse>> {
        run_in_transaction(&self.db, TxMode::ReadOnly, "work_order_list", |tx| {
            let work_orders = self.work_orders.get_all(tx)?;
            Ok(self.compose_best_effort(tx, work_orders))
        })
    }

    pub fn get_by_doctor(&self, doctor: &str) -> ServiceResult<Vec<WorkOrderResponse>> {
        run_in_transaction(&self.db, TxMode::ReadOnly, "work_order_list_doctor", |tx| {
            let work_orders = self.work_orders.get_by_doctor(tx, doctor)?;
            Ok(self.compose_best_effort(tx, work_orders))
        })
    }

    pub fn get_by_analyst(&self, analyst: &str) -> ServiceResult<Vec<WorkOrderResponse>> {
        run_in_transaction(&self.db, TxMode::ReadOnly, "work_order_list_analyst", |tx| {
            let work_orders = self.work_orders.get_by_analyst(tx, analyst)?;
            Ok(self.compose_best_effort(tx, work_orders))
        })
    }

    fn read_composed_strict(
        &self,
        tx: &Transaction<'_>,
        no_order: &str,
    ) -> ServiceResult<WorkOrderResponse> {
        let work_order = self.work_orders.get_by_no_order(tx, no_order)?;
        let patient = self.resolve_patient_strict(tx, &work_order)?;
        Ok(WorkOrderResponse::compose(work_order, Some(patient)))
    }

    /// Resolves the referenced patient; a missing row is a consistency fault.
    fn resolve_patient_strict(
        &self,
        tx: &Transaction<'_>,
        work_order: &WorkOrder,
    ) -> ServiceResult<Patient> {
        match self.patients.get_by_id(tx, &work_order.patient_id) {
            Ok(patient) => Ok(patient),
            Err(RepoError::NotFound { key, .. }) => Err(ServiceError::ConstraintViolation(
                format!(
                    "work order `{}` references missing patient `{key}`",
                    work_order.no_order
                ),
            )),
            Err(other) => Err(other.into()),
        }
    }

    /// Composes each order with its patient, degrading to no patient on failure.
    fn compose_best_effort(
        &self,
        tx: &Transaction<'_>,
        work_orders: Vec<WorkOrder>,
    ) -> Vec<WorkOrderResponse> {
        work_orders
            .into_iter()
            .map(|work_order| {
                let patient = match self.patients.get_by_id(tx, &work_order.patient_id) {
                    Ok(patient) => Some(patient),
                    Err(err) => {
                        warn!(
                            "event=work_order_compose module=service status=degraded no_order={} error_kind={}",
                            work_order.no_order,
                            err.kind()
                        );
                        None
                    }
                };
                WorkOrderResponse::compose(work_order, patient)
            })
            .collect()
    }
}
