//! Core persistence and use-case logic for the laboratory information system.
//! This crate is the single source of truth for patient and work order invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use db::{open_db, open_db_in_memory, Database, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings};
pub use model::patient::{Patient, PatientId, PatientValidationError, Sex};
pub use model::work_order::{OrderNumber, WorkOrder, WorkOrderValidationError};
pub use repo::patient_repo::{PatientRepository, SqlitePatientRepository};
pub use repo::work_order_repo::{SqliteWorkOrderRepository, WorkOrderRepository};
pub use repo::{ErrorKind, RepoError, RepoResult};
pub use service::dto::{
    AttachWorkOrderRequest, PatientRequest, PatientResponse, WorkOrderRequest, WorkOrderResponse,
};
pub use service::patient_service::PatientService;
pub use service::work_order_service::WorkOrderService;
pub use service::{ServiceError, ServiceResult, TxStage};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
