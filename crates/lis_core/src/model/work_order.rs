//! Work order aggregate.
//!
//! # Responsibility
//! - Define a lab order and the ordered test codes it owns.
//!
//! # Invariants
//! - `no_order` is the caller-supplied natural key.
//! - `patient_id` references exactly one patient.
//! - `test_codes` keep insertion order; duplicates are allowed.

use crate::model::patient::PatientId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Natural key of a work order.
pub type OrderNumber = String;

/// Lab test order with its owned test-code list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub no_order: OrderNumber,
    pub patient_id: PatientId,
    /// Opaque test codes in insertion order.
    pub test_codes: Vec<String>,
    pub analyst: String,
    pub doctor: String,
}

impl WorkOrder {
    pub fn new(no_order: impl Into<OrderNumber>, patient_id: impl Into<PatientId>) -> Self {
        Self {
            no_order: no_order.into(),
            patient_id: patient_id.into(),
            test_codes: Vec::new(),
            analyst: String::new(),
            doctor: String::new(),
        }
    }

    /// Validates write-side invariants.
    pub fn validate(&self) -> Result<(), WorkOrderValidationError> {
        if self.no_order.trim().is_empty() {
            return Err(WorkOrderValidationError::BlankOrderNumber);
        }
        if self.patient_id.trim().is_empty() {
            return Err(WorkOrderValidationError::BlankPatientId);
        }
        if let Some(position) = self
            .test_codes
            .iter()
            .position(|code| code.trim().is_empty())
        {
            return Err(WorkOrderValidationError::BlankTestCode { position });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkOrderValidationError {
    BlankOrderNumber,
    BlankPatientId,
    BlankTestCode { position: usize },
}

impl Display for WorkOrderValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankOrderNumber => write!(f, "work order number must not be blank"),
            Self::BlankPatientId => write!(f, "work order patient id must not be blank"),
            Self::BlankTestCode { position } => {
                write!(f, "test code at position {position} must not be blank")
            }
        }
    }
}

impl Error for WorkOrderValidationError {}
